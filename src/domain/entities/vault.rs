//! Secret vault entity.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ArtifactNamespace;

/// Persisted bookkeeping for a vault (stored as `vault-state.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    /// Number of password/payload mismatch recoveries so far
    #[serde(default)]
    pub rotations: u64,
    /// RFC 3339 timestamp of the last rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rotated: Option<String>,
}

/// Password-protected storage for one shared secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVault {
    pub password_file: PathBuf,
    pub payload_file: PathBuf,
    pub state_file: PathBuf,
    pub lock_file: PathBuf,
}

impl SecretVault {
    pub fn in_namespace(namespace: &ArtifactNamespace) -> Self {
        Self {
            password_file: namespace.vault_password(),
            payload_file: namespace.vault_payload(),
            state_file: namespace.vault_state(),
            lock_file: namespace.vault_lock(),
        }
    }
}
