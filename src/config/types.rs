//! Configuration types
//!
//! Mirrors `shipwright.toml`. Every section is optional; a missing file or
//! section falls back to the built-in topology (one root environment `hub`
//! and two jump-mediated environments behind it).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENVIRONMENT: &str = "hub";

/// Certificate manager CRD bundle required by the Rancher chart
pub const CERT_MANAGER_CRDS_URL: &str =
    "https://github.com/cert-manager/cert-manager/releases/download/v1.13.0/cert-manager.crds.yaml";

/// How an environment's nodes are reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyKind {
    #[default]
    Direct,
    Jump,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment used when none is given on the command line
    pub default_environment: String,
    /// Root of every per-environment artifact namespace
    pub state_dir: PathBuf,
    pub hosts_file: PathBuf,
    /// Namespace on the root cluster that receives dependent registrations
    pub registration_namespace: String,
    pub skip: SkipConfig,
    pub timeouts: TimeoutsConfig,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    pub addons: BTreeMap<String, AddonConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_environment: DEFAULT_ENVIRONMENT.to_string(),
            state_dir: PathBuf::from(".shipwright"),
            hosts_file: PathBuf::from("/etc/hosts"),
            registration_namespace: "kube-system".to_string(),
            skip: SkipConfig::default(),
            timeouts: TimeoutsConfig::default(),
            environments: default_environments(),
            addons: default_addons(),
        }
    }
}

/// Phase opt-outs (also settable through `SHIPWRIGHT_SKIP_*`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub provision: bool,
    pub configure: bool,
    pub addons: bool,
    pub hosts: bool,
}

/// Waits and hard command limits, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Hard limit for long-running collaborators (terraform, ansible, helm)
    pub command: u64,
    /// Hard limit for short queries (kubectl get, ssh probes)
    pub query: u64,
    pub node_wait: u64,
    pub node_interval: u64,
    pub kubeconfig_wait: u64,
    pub kubeconfig_interval: u64,
    pub api_wait: u64,
    pub api_interval: u64,
    pub rollout_wait: u64,
    pub rollout_interval: u64,
    /// Wait between spawning a forwarder and probing it
    pub tunnel_grace: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            command: 1800,
            query: 30,
            node_wait: 300,
            node_interval: 10,
            kubeconfig_wait: 120,
            kubeconfig_interval: 5,
            api_wait: 300,
            api_interval: 10,
            rollout_wait: 300,
            rollout_interval: 10,
            tunnel_grace: 3,
        }
    }
}

/// One deployment target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub topology: TopologyKind,
    /// Root environment whose jump host this one is reached through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_root: Option<String>,
    #[serde(default)]
    pub owns_jump_host: bool,
    pub tunnel_port: u16,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Defaults to `terraform/<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_dir: Option<PathBuf>,
    #[serde(default = "default_ansible_dir")]
    pub ansible_dir: PathBuf,
    #[serde(default = "default_inventory")]
    pub inventory: String,
    #[serde(default = "default_playbooks")]
    pub playbooks: Vec<String>,
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    /// Defaults to `<terraform_dir>/k8s-key.pem`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
    /// Names of `[addons.*]` entries, installed in order
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_forward: Option<UiForwardConfig>,
}

impl EnvironmentConfig {
    pub fn direct(tunnel_port: u16) -> Self {
        Self {
            topology: TopologyKind::Direct,
            jump_root: None,
            owns_jump_host: false,
            tunnel_port,
            api_port: default_api_port(),
            terraform_dir: None,
            ansible_dir: default_ansible_dir(),
            inventory: default_inventory(),
            playbooks: default_playbooks(),
            ssh_user: default_ssh_user(),
            ssh_key: None,
            secret_key: default_secret_key(),
            hostnames: Vec::new(),
            addons: Vec::new(),
            ui_forward: None,
        }
    }

    pub fn jump(root: &str, tunnel_port: u16) -> Self {
        Self {
            topology: TopologyKind::Jump,
            jump_root: Some(root.to_string()),
            ..Self::direct(tunnel_port)
        }
    }
}

/// Long-lived port-forward for a cluster UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiForwardConfig {
    pub namespace: String,
    pub service: String,
    pub local_port: u16,
    pub remote_port: u16,
}

/// A chart-based add-on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonConfig {
    /// Defaults to the add-on's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    pub chart: String,
    pub namespace: String,
    pub repo_name: String,
    pub repo_url: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub values_files: Vec<PathBuf>,
    #[serde(default = "default_chart_timeout")]
    pub timeout: String,
    #[serde(default)]
    pub pre_manifests: Vec<String>,
    #[serde(default)]
    pub post_manifests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Label selector that must report a ready container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_selector: Option<String>,
    #[serde(default)]
    pub extension_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<TlsSecretConfig>,
    /// Storage classes whose default-class annotation is cleared
    #[serde(default)]
    pub demote_storage_classes: Vec<String>,
}

/// Self-signed ingress certificate, created once per cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSecretConfig {
    pub name: String,
    pub common_name: String,
}

impl AddonConfig {
    fn new(chart: &str, namespace: &str, repo_name: &str, repo_url: &str) -> Self {
        Self {
            release: None,
            chart: chart.to_string(),
            namespace: namespace.to_string(),
            repo_name: repo_name.to_string(),
            repo_url: repo_url.to_string(),
            values: BTreeMap::new(),
            values_files: Vec::new(),
            timeout: default_chart_timeout(),
            pre_manifests: Vec::new(),
            post_manifests: Vec::new(),
            service_account: None,
            rollout_selector: None,
            extension_points: Vec::new(),
            tls_secret: None,
            demote_storage_classes: Vec::new(),
        }
    }

    fn set(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

fn default_api_port() -> u16 {
    6443
}

fn default_ansible_dir() -> PathBuf {
    PathBuf::from("ansible")
}

fn default_inventory() -> String {
    "inventory_aws_ec2.yml".to_string()
}

fn default_playbooks() -> Vec<String> {
    ["all.yaml", "init-cluster.yaml", "worker.yml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ssh_user() -> String {
    "ubuntu".to_string()
}

fn default_secret_key() -> String {
    "rke2_token".to_string()
}

fn default_chart_timeout() -> String {
    "10m".to_string()
}

fn default_environments() -> BTreeMap<String, EnvironmentConfig> {
    let mut hub = EnvironmentConfig::direct(16443);
    hub.owns_jump_host = true;
    hub.hostnames = vec![
        "rancher.local".to_string(),
        "meo-stationery.local".to_string(),
        "argocd.local".to_string(),
    ];
    hub.addons = vec![
        "ebs-csi".to_string(),
        "rancher".to_string(),
        "argocd".to_string(),
    ];
    hub.ui_forward = Some(UiForwardConfig {
        namespace: "cattle-system".to_string(),
        service: "rancher".to_string(),
        local_port: 8443,
        remote_port: 443,
    });

    let mut east = EnvironmentConfig::jump(DEFAULT_ENVIRONMENT, 16444);
    east.addons = vec!["ebs-csi".to_string()];
    let mut west = EnvironmentConfig::jump(DEFAULT_ENVIRONMENT, 16445);
    west.addons = vec!["ebs-csi".to_string()];

    BTreeMap::from([
        (DEFAULT_ENVIRONMENT.to_string(), hub),
        ("edge-east".to_string(), east),
        ("edge-west".to_string(), west),
    ])
}

fn default_addons() -> BTreeMap<String, AddonConfig> {
    let mut ebs = AddonConfig::new(
        "aws-ebs-csi-driver/aws-ebs-csi-driver",
        "kube-system",
        "aws-ebs-csi-driver",
        "https://kubernetes-sigs.github.io/aws-ebs-csi-driver",
    )
    .set("controller.serviceAccount.create", "false")
    .set("controller.serviceAccount.name", "ebs-csi-controller-sa");
    ebs.service_account = Some("ebs-csi-controller-sa".to_string());
    ebs.rollout_selector = Some("app=ebs-csi-controller".to_string());
    ebs.demote_storage_classes = vec!["local-path".to_string()];

    let mut rancher = AddonConfig::new(
        "rancher-latest/rancher",
        "cattle-system",
        "rancher-latest",
        "https://releases.rancher.com/server-charts/latest",
    )
    .set("hostname", "rancher.local")
    .set("bootstrapPassword", "Admin123!")
    .set("ingress.ingressClassName", "nginx")
    .set("ingress.tls.source", "secret")
    .set("replicas", "1");
    rancher.timeout = "15m".to_string();
    rancher.pre_manifests = vec![CERT_MANAGER_CRDS_URL.to_string()];
    rancher.extension_points = vec!["certificates.cert-manager.io".to_string()];
    rancher.rollout_selector = Some("app=rancher".to_string());
    rancher.tls_secret = Some(TlsSecretConfig {
        name: "tls-rancher-ingress".to_string(),
        common_name: "rancher.local".to_string(),
    });

    let mut argocd = AddonConfig::new(
        "argo/argo-cd",
        "argocd",
        "argo",
        "https://argoproj.github.io/argo-helm",
    );
    argocd.rollout_selector = Some("app.kubernetes.io/name=argocd-server".to_string());
    argocd.values_files = vec![PathBuf::from("argocd/values-nodeselector.yaml")];
    argocd.post_manifests = vec![
        "argocd/be-application.yaml".to_string(),
        "argocd/data-application.yaml".to_string(),
    ];

    BTreeMap::from([
        ("ebs-csi".to_string(), ebs),
        ("rancher".to_string(), rancher),
        ("argocd".to_string(), argocd),
    ])
}
