//! Domain Entities
//!
//! - `Environment` - a resolved deployment target and its artifact namespace
//! - `InfraOutputs` - the provisioner's output map
//! - `CredentialBundle` - a kubeconfig materialized for one audience
//! - `TunnelSession` - an established jump-host forwarding session
//! - `SecretVault` - password file, payload and rotation counter

mod credential;
mod environment;
mod outputs;
mod tunnel;
mod vault;

pub use credential::{BundleKind, CredentialBundle, TrustMode};
pub use environment::{
    AddonSpec, ArtifactNamespace, Environment, RolloutCheck, TlsSecret, Topology, UiForward,
};
pub use outputs::{InfraOutputs, JumpHost};
pub use tunnel::{TunnelHealth, TunnelSession};
pub use vault::{SecretVault, VaultState};
