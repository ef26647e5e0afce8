//! External collaborator ports.
//!
//! Narrow interfaces to the tools the pipeline drives but does not own:
//! the provisioner, the configurator, the chart installer, the cluster
//! control utility, the remote shell and the vault cipher.

use std::path::{Path, PathBuf};

use crate::domain::entities::{AddonSpec, Environment, InfraOutputs};
use crate::error::ShipwrightResult;

/// How to log into cluster nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshAccess {
    pub user: String,
    pub identity: PathBuf,
    /// `user@host` of the jump host, for jump-mediated environments
    pub jump: Option<String>,
}

impl SshAccess {
    pub fn direct(user: impl Into<String>, identity: impl Into<PathBuf>) -> Self {
        Self {
            user: user.into(),
            identity: identity.into(),
            jump: None,
        }
    }

    pub fn via(mut self, jump_address: &str) -> Self {
        self.jump = Some(format!("{}@{}", self.user, jump_address));
        self
    }

    pub fn login(&self, host: &str) -> String {
        format!("{}@{}", self.user, host)
    }
}

/// Infrastructure provisioner (terraform)
pub trait Provisioner: Send + Sync {
    /// Create or converge the environment's resources
    fn apply(&self, env: &Environment) -> ShipwrightResult<()>;

    /// Read the output map of the last apply
    fn outputs(&self, env: &Environment) -> ShipwrightResult<InfraOutputs>;
}

/// Arguments for one configurator playbook run.
#[derive(Debug, Clone)]
pub struct PlaybookRun<'a> {
    pub playbook: &'a str,
    pub access: &'a SshAccess,
    pub config_file: &'a Path,
    pub vault_password_file: &'a Path,
    pub vault_payload_file: &'a Path,
    /// Extra `-e key=value` variables
    pub extra_vars: Vec<(String, String)>,
}

/// Configuration-management tool (ansible-playbook)
pub trait Configurator: Send + Sync {
    fn run_playbook(&self, env: &Environment, run: &PlaybookRun<'_>) -> ShipwrightResult<()>;
}

/// Chart installer (helm)
pub trait ChartInstaller: Send + Sync {
    fn add_repo(&self, name: &str, url: &str) -> ShipwrightResult<()>;

    /// Refresh one repository's index
    fn update_repo(&self, name: &str) -> ShipwrightResult<()>;

    fn upgrade_install(&self, kubeconfig: &Path, addon: &AddonSpec) -> ShipwrightResult<()>;
}

/// Cluster control utility (kubectl)
pub trait ClusterControl: Send + Sync {
    /// At least one node is listed
    fn nodes_listed(&self, kubeconfig: &Path) -> ShipwrightResult<bool>;

    /// The first pod matching `selector` reports a ready container
    fn selector_ready(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        selector: &str,
    ) -> ShipwrightResult<bool>;

    /// The custom resource definition is established and queryable
    fn resource_type_ready(&self, kubeconfig: &Path, crd: &str) -> ShipwrightResult<bool>;

    fn service_account_exists(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
    ) -> ShipwrightResult<bool>;

    fn create_service_account(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
    ) -> ShipwrightResult<()>;

    fn secret_exists(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
    ) -> ShipwrightResult<bool>;

    /// Create a `kubernetes.io/tls` secret holding a fresh self-signed
    /// certificate for `common_name`
    fn create_self_signed_tls_secret(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        name: &str,
        common_name: &str,
    ) -> ShipwrightResult<()>;

    /// Clear the default-class annotation; `false` when the class is absent
    fn demote_storage_class(&self, kubeconfig: &Path, name: &str) -> ShipwrightResult<bool>;

    /// `apply -f` for a local path or URL
    fn apply(&self, kubeconfig: &Path, manifest: &str) -> ShipwrightResult<()>;
}

/// Remote shell on cluster nodes (ssh/scp)
pub trait RemoteShell: Send + Sync {
    /// Run `script` on `host` and return its stdout
    fn capture(&self, access: &SshAccess, host: &str, script: &str) -> ShipwrightResult<String>;

    /// Copy a remote file to a local path
    fn fetch(
        &self,
        access: &SshAccess,
        host: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> ShipwrightResult<()>;
}

/// Header that marks an encrypted vault payload
pub const VAULT_HEADER: &str = "$ANSIBLE_VAULT;";

/// Symmetric cipher for vault payloads (ansible-vault)
pub trait VaultCipher: Send + Sync {
    /// Payload text is already in encrypted form
    fn is_encrypted(&self, payload: &str) -> bool {
        payload.trim_start().starts_with(VAULT_HEADER)
    }

    /// Decryption with `password_file` succeeds
    fn can_decrypt(&self, payload_file: &Path, password_file: &Path) -> bool;

    /// Encrypt `payload_file` in place
    fn encrypt(&self, payload_file: &Path, password_file: &Path) -> ShipwrightResult<()>;
}
