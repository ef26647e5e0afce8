//! Environment entity - a resolved deployment target.
//!
//! An `Environment` is resolved once from configuration at pipeline start and
//! never mutated afterwards. Everything it writes to disk lives under its own
//! `ArtifactNamespace`, which is what keeps concurrent runs for different
//! environments apart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How the control plane of an environment is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// Nodes are reachable directly from the operator's machine
    Direct,
    /// Nodes are reachable only through the jump host owned by `root`
    JumpMediated { root: String },
}

impl Topology {
    pub fn is_jump_mediated(&self) -> bool {
        matches!(self, Topology::JumpMediated { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Direct => "direct",
            Topology::JumpMediated { .. } => "jump",
        }
    }
}

/// A chart-based add-on installed after the control plane is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonSpec {
    pub release: String,
    pub chart: String,
    pub namespace: String,
    pub repo_name: String,
    pub repo_url: String,
    /// `--set key=value` overrides, sorted for stable argument order
    pub values: BTreeMap<String, String>,
    pub values_files: Vec<PathBuf>,
    pub timeout: String,
    /// Manifests applied before the chart (e.g. CRD bundles)
    pub pre_manifests: Vec<String>,
    /// Manifests applied after the chart is ready
    pub post_manifests: Vec<String>,
    /// Service account created in `namespace` if absent
    pub service_account: Option<String>,
    pub rollout: Option<RolloutCheck>,
    /// Custom resource definitions that must become queryable
    pub extension_points: Vec<String>,
    /// Self-signed TLS secret created after the chart if absent
    pub tls_secret: Option<TlsSecret>,
    /// Storage classes that must stop being the cluster default
    pub demote_storage_classes: Vec<String>,
}

/// A self-signed certificate stored as a `kubernetes.io/tls` secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSecret {
    pub name: String,
    pub common_name: String,
}

/// A label selector that should report a ready container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutCheck {
    pub namespace: String,
    pub selector: String,
}

/// Long-lived port-forward that keeps a cluster UI reachable on localhost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiForward {
    pub namespace: String,
    pub service: String,
    pub local_port: u16,
    pub remote_port: u16,
}

/// A deployment target, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub topology: Topology,
    /// Whether this environment's provisioner creates the shared jump host
    pub owns_jump_host: bool,
    /// Statically assigned local port for the jump-host tunnel
    pub tunnel_port: u16,
    /// Control-plane API port on the remote nodes
    pub api_port: u16,
    pub namespace: ArtifactNamespace,
    pub terraform_dir: PathBuf,
    pub ansible_dir: PathBuf,
    pub playbooks: Vec<String>,
    /// Inventory file inside `ansible_dir`
    pub inventory: String,
    /// Login user on every node (and on the jump host)
    pub ssh_user: String,
    pub ssh_key: PathBuf,
    /// Key of the shared secret inside the vault payload
    pub secret_key: String,
    /// Ingress hostnames that should resolve to the primary node
    pub hostnames: Vec<String>,
    pub addons: Vec<AddonSpec>,
    pub ui_forward: Option<UiForward>,
}

impl Environment {
    /// Name of the root environment this one depends on, if any
    pub fn jump_host_ref(&self) -> Option<&str> {
        match &self.topology {
            Topology::Direct => None,
            Topology::JumpMediated { root } => Some(root),
        }
    }

    pub fn is_root(&self) -> bool {
        self.owns_jump_host
    }

    /// Name used for the tunnel's always-on service descriptor
    pub fn tunnel_service_name(&self) -> String {
        format!("shipwright-tunnel-{}", self.name)
    }
}

/// Per-environment directory holding every artifact Shipwright writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamespace {
    root: PathBuf,
}

impl ArtifactNamespace {
    /// Namespace for `environment` under `state_dir`
    pub fn new(state_dir: &Path, environment: &str) -> Self {
        Self {
            root: state_dir.join(environment),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Human-facing kubeconfig (external endpoint)
    pub fn durable_bundle(&self) -> PathBuf {
        self.root.join("kubeconfig.yaml")
    }

    /// Orchestrator-internal kubeconfig (loopback tunnel endpoint)
    pub fn tunnel_bundle(&self) -> PathBuf {
        self.root.join("kubeconfig.tunnel.yaml")
    }

    /// Kubeconfig as fetched from the control plane, before rewriting
    pub fn raw_bundle(&self) -> PathBuf {
        self.root.join("kubeconfig.raw.yaml")
    }

    pub fn vault_dir(&self) -> PathBuf {
        self.root.join("vault")
    }

    pub fn vault_password(&self) -> PathBuf {
        self.vault_dir().join(".vault_pass")
    }

    pub fn vault_payload(&self) -> PathBuf {
        self.vault_dir().join("secrets.yml")
    }

    pub fn vault_state(&self) -> PathBuf {
        self.vault_dir().join("vault-state.json")
    }

    pub fn vault_lock(&self) -> PathBuf {
        self.vault_dir().join("vault.lock")
    }

    pub fn tunnel_log(&self) -> PathBuf {
        self.root.join("tunnel.log")
    }

    pub fn service_descriptor(&self, service_name: &str) -> PathBuf {
        self.root.join(format!("{}.service", service_name))
    }

    pub fn hosts_remediation(&self) -> PathBuf {
        self.root.join("hosts-remediation.sh")
    }

    /// Fallback configurator config, synthesized when the project has none
    pub fn ansible_config(&self) -> PathBuf {
        self.root.join("ansible.cfg")
    }

    pub fn outputs(&self) -> PathBuf {
        self.root.join("outputs.json")
    }

    pub fn ui_forward_script(&self) -> PathBuf {
        self.root.join("ui-forward.sh")
    }

    pub fn ui_forward_log(&self) -> PathBuf {
        self.root.join("ui-forward.log")
    }

    pub fn registration_manifest(&self, dependent: &str) -> PathBuf {
        self.root.join(format!("registration-{}.yaml", dependent))
    }
}
