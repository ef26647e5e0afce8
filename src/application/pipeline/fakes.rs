//! In-memory collaborators for pipeline and aggregator tests.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use super::context::{RunSettings, SkipFlags, Timeouts, Toolbox};
use crate::domain::entities::{
    AddonSpec, ArtifactNamespace, Environment, InfraOutputs, RolloutCheck, TlsSecret, Topology,
    UiForward,
};
use crate::domain::ports::{
    ChartInstaller, ClusterControl, CommandSpec, Configurator, ForwardHandle, ForwardLauncher,
    ManualClock, NetworkProbe, PipelineEvent, PipelineEventSink, PlaybookRun, ProbeStatus,
    Provisioner, RemoteShell, SshAccess, VaultCipher,
};
use crate::error::{ShipwrightError, ShipwrightResult};
use crate::infrastructure::fs::LocalFs;

pub const RAW_KUBECONFIG: &str = "apiVersion: v1
kind: Config
clusters:
- cluster:
    certificate-authority-data: LS0tLS1CRUdJTi0tLS0t
    server: https://127.0.0.1:6443
  name: default
contexts:
- context:
    cluster: default
    user: default
  name: default
current-context: default
users:
- name: default
  user:
    client-certificate-data: Y2VydA==
    client-key-data: a2V5
";

#[derive(Default)]
pub struct FakeProvisioner {
    pub outputs: Mutex<InfraOutputs>,
    pub applies: AtomicU32,
    pub fail_apply: AtomicBool,
}

impl Provisioner for FakeProvisioner {
    fn apply(&self, _env: &Environment) -> ShipwrightResult<()> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(ShipwrightError::command_failed(
                "terraform apply -auto-approve",
                Some(1),
                "Error: quota exceeded",
            ));
        }
        Ok(())
    }

    fn outputs(&self, _env: &Environment) -> ShipwrightResult<InfraOutputs> {
        Ok(self.outputs.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeConfigurator {
    pub runs: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl Configurator for FakeConfigurator {
    fn run_playbook(&self, _env: &Environment, run: &PlaybookRun<'_>) -> ShipwrightResult<()> {
        assert!(run.vault_password_file.exists(), "vault must exist before playbooks");
        self.runs
            .lock()
            .unwrap()
            .push((run.playbook.to_string(), run.extra_vars.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCharts {
    pub calls: Mutex<Vec<String>>,
}

impl ChartInstaller for FakeCharts {
    fn add_repo(&self, name: &str, url: &str) -> ShipwrightResult<()> {
        self.calls.lock().unwrap().push(format!("repo add {} {}", name, url));
        Ok(())
    }

    fn update_repo(&self, name: &str) -> ShipwrightResult<()> {
        self.calls.lock().unwrap().push(format!("repo update {}", name));
        Err(ShipwrightError::command_failed("helm repo update", Some(1), "timeout"))
    }

    fn upgrade_install(&self, kubeconfig: &Path, addon: &AddonSpec) -> ShipwrightResult<()> {
        self.calls.lock().unwrap().push(format!(
            "install {} with {}",
            addon.release,
            kubeconfig.display()
        ));
        Ok(())
    }
}

pub struct FakeCluster {
    pub rollout_ready: AtomicBool,
    pub crds_ready: AtomicBool,
    pub accounts: Mutex<BTreeSet<String>>,
    pub secrets: Mutex<BTreeSet<String>>,
    pub secrets_created: AtomicU32,
    pub demoted: Mutex<Vec<String>>,
    pub applied: Mutex<Vec<String>>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self {
            rollout_ready: AtomicBool::new(true),
            crds_ready: AtomicBool::new(true),
            accounts: Mutex::default(),
            secrets: Mutex::default(),
            secrets_created: AtomicU32::new(0),
            demoted: Mutex::default(),
            applied: Mutex::default(),
        }
    }
}

impl ClusterControl for FakeCluster {
    fn nodes_listed(&self, _kubeconfig: &Path) -> ShipwrightResult<bool> {
        Ok(true)
    }

    fn selector_ready(&self, _: &Path, _: &str, _: &str) -> ShipwrightResult<bool> {
        Ok(self.rollout_ready.load(Ordering::SeqCst))
    }

    fn resource_type_ready(&self, _: &Path, _: &str) -> ShipwrightResult<bool> {
        Ok(self.crds_ready.load(Ordering::SeqCst))
    }

    fn service_account_exists(&self, _: &Path, ns: &str, name: &str) -> ShipwrightResult<bool> {
        Ok(self.accounts.lock().unwrap().contains(&format!("{}/{}", ns, name)))
    }

    fn create_service_account(&self, _: &Path, ns: &str, name: &str) -> ShipwrightResult<()> {
        self.accounts.lock().unwrap().insert(format!("{}/{}", ns, name));
        Ok(())
    }

    fn secret_exists(&self, _: &Path, ns: &str, name: &str) -> ShipwrightResult<bool> {
        Ok(self.secrets.lock().unwrap().contains(&format!("{}/{}", ns, name)))
    }

    fn create_self_signed_tls_secret(
        &self,
        _: &Path,
        ns: &str,
        name: &str,
        _common_name: &str,
    ) -> ShipwrightResult<()> {
        self.secrets_created.fetch_add(1, Ordering::SeqCst);
        self.secrets.lock().unwrap().insert(format!("{}/{}", ns, name));
        Ok(())
    }

    fn demote_storage_class(&self, _: &Path, name: &str) -> ShipwrightResult<bool> {
        self.demoted.lock().unwrap().push(name.to_string());
        Ok(false)
    }

    fn apply(&self, _kubeconfig: &Path, manifest: &str) -> ShipwrightResult<()> {
        self.applied.lock().unwrap().push(manifest.to_string());
        Ok(())
    }
}

/// Remote nodes that already carry a kubeconfig and no join secret
#[derive(Default)]
pub struct FakeRemote {
    pub scripts: Mutex<Vec<(Option<String>, String)>>,
}

impl RemoteShell for FakeRemote {
    fn capture(&self, access: &SshAccess, _host: &str, script: &str) -> ShipwrightResult<String> {
        self.scripts
            .lock()
            .unwrap()
            .push((access.jump.clone(), script.to_string()));
        if script.starts_with("test -s") {
            Ok("present\n".to_string())
        } else if script.starts_with("hostname -I") {
            Ok("10.0.0.5\n".to_string())
        } else {
            Ok(String::new())
        }
    }

    fn fetch(&self, _: &SshAccess, _: &str, _: &str, local_path: &Path) -> ShipwrightResult<()> {
        std::fs::write(local_path, RAW_KUBECONFIG)?;
        Ok(())
    }
}

pub struct PlainCipher;

impl VaultCipher for PlainCipher {
    fn can_decrypt(&self, _: &Path, _: &Path) -> bool {
        true
    }

    fn encrypt(&self, _: &Path, _: &Path) -> ShipwrightResult<()> {
        Ok(())
    }
}

pub struct LiveHandle;

impl ForwardHandle for LiveHandle {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn is_alive(&mut self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    pub spawned: Mutex<Vec<String>>,
    pub terminated: Mutex<Vec<String>>,
}

impl ForwardLauncher for FakeLauncher {
    fn terminate_matching(&self, pattern: &str) -> ShipwrightResult<usize> {
        self.terminated.lock().unwrap().push(pattern.to_string());
        Ok(0)
    }

    fn count_matching(&self, _pattern: &str) -> ShipwrightResult<usize> {
        Ok(0)
    }

    fn spawn(&self, spec: &CommandSpec, _log: &Path) -> ShipwrightResult<Box<dyn ForwardHandle>> {
        self.spawned.lock().unwrap().push(spec.command_line());
        Ok(Box::new(LiveHandle))
    }
}

#[derive(Default)]
pub struct FakeProbe {
    pub urls: Mutex<Vec<String>>,
}

impl NetworkProbe for FakeProbe {
    fn http_status(&self, url: &str, _timeout: Duration) -> ProbeStatus {
        self.urls.lock().unwrap().push(url.to_string());
        ProbeStatus::from_code(401)
    }

    fn tcp_reachable(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
        true
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineEventSink for RecordingSink {
    fn on_event(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A complete fake world rooted in a temporary directory.
pub struct World {
    pub dir: tempfile::TempDir,
    pub provisioner: Arc<FakeProvisioner>,
    pub configurator: Arc<FakeConfigurator>,
    pub charts: Arc<FakeCharts>,
    pub cluster: Arc<FakeCluster>,
    pub remote: Arc<FakeRemote>,
    pub launcher: Arc<FakeLauncher>,
    pub probe: Arc<FakeProbe>,
    pub clock: Arc<ManualClock>,
}

impl World {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("ansible")).unwrap();
        std::fs::write(dir.path().join("ansible/ansible.cfg"), "[defaults]\n").unwrap();
        std::fs::write(dir.path().join("hosts"), "127.0.0.1\tlocalhost\n").unwrap();

        let provisioner = FakeProvisioner::default();
        *provisioner.outputs.lock().unwrap() = InfraOutputs::from_pairs([
            ("master_public_ip", json!(["54.0.0.10"])),
            ("master_private_ip", json!("10.0.0.5")),
            ("nlb_dns_name", json!("nlb.example.com")),
            ("bastion_public_ip", json!("3.3.3.3")),
        ]);

        Self {
            dir,
            provisioner: Arc::new(provisioner),
            configurator: Arc::default(),
            charts: Arc::default(),
            cluster: Arc::default(),
            remote: Arc::default(),
            launcher: Arc::default(),
            probe: Arc::default(),
            clock: Arc::new(ManualClock::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root().join("state")
    }

    pub fn hosts_file(&self) -> PathBuf {
        self.root().join("hosts")
    }

    pub fn toolbox(&self) -> Toolbox {
        Toolbox {
            provisioner: self.provisioner.clone(),
            configurator: self.configurator.clone(),
            charts: self.charts.clone(),
            cluster: self.cluster.clone(),
            remote: self.remote.clone(),
            cipher: Arc::new(PlainCipher),
            launcher: self.launcher.clone(),
            probe: self.probe.clone(),
            fs: Arc::new(LocalFs::new()),
            clock: self.clock.clone(),
        }
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings {
            state_dir: self.state_dir(),
            hosts_file: self.hosts_file(),
            registration_namespace: "kube-system".to_string(),
            skip: SkipFlags::default(),
            cluster_token: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn environment(&self, name: &str, topology: Topology, tunnel_port: u16) -> Environment {
        let root_env = !topology.is_jump_mediated();
        Environment {
            name: name.to_string(),
            owns_jump_host: root_env,
            topology,
            tunnel_port,
            api_port: 6443,
            namespace: ArtifactNamespace::new(&self.state_dir(), name),
            terraform_dir: self.root().join("terraform").join(name),
            ansible_dir: self.root().join("ansible"),
            playbooks: vec!["all.yaml".into(), "init-cluster.yaml".into(), "worker.yml".into()],
            inventory: "inventory_aws_ec2.yml".to_string(),
            ssh_user: "ubuntu".to_string(),
            ssh_key: self.root().join("id_ed25519"),
            secret_key: "rke2_token".to_string(),
            hostnames: if root_env {
                vec!["rancher.local".into(), "argocd.local".into()]
            } else {
                Vec::new()
            },
            addons: vec![AddonSpec {
                release: "argocd".into(),
                chart: "argo/argo-cd".into(),
                namespace: "argocd".into(),
                repo_name: "argo".into(),
                repo_url: "https://argoproj.github.io/argo-helm".into(),
                values: Default::default(),
                values_files: Vec::new(),
                timeout: "10m".into(),
                pre_manifests: vec!["https://example.com/crds.yaml".into()],
                post_manifests: Vec::new(),
                service_account: Some("argocd-deployer".into()),
                rollout: Some(RolloutCheck {
                    namespace: "argocd".into(),
                    selector: "app.kubernetes.io/name=argocd-server".into(),
                }),
                extension_points: vec!["applications.argoproj.io".into()],
                tls_secret: Some(TlsSecret {
                    name: "tls-argocd-ingress".into(),
                    common_name: "argocd.local".into(),
                }),
                demote_storage_classes: vec!["local-path".into()],
            }],
            ui_forward: root_env.then(|| UiForward {
                namespace: "cattle-system".into(),
                service: "rancher".into(),
                local_port: 8443,
                remote_port: 443,
            }),
        }
    }

    pub fn hub(&self) -> Environment {
        self.environment("hub", Topology::Direct, 16443)
    }

    pub fn edge(&self, name: &str, port: u16) -> Environment {
        self.environment(
            name,
            Topology::JumpMediated {
                root: "hub".to_string(),
            },
            port,
        )
    }
}
