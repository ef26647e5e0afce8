//! Credential bundle entity.

use crate::domain::value_objects::Endpoint;

/// How a bundle's client verifies the control-plane certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustMode {
    /// An embedded trust anchor is present
    Verify,
    /// Verification is explicitly disabled
    Skip,
}

/// Audience a bundle was materialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Persistent, human-facing, externally reachable endpoint
    Durable,
    /// Orchestrator-internal, loopback endpoint through the tunnel
    Ephemeral,
}

/// A kubeconfig document bound to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub kind: BundleKind,
    pub raw: Vec<u8>,
    pub endpoint: Endpoint,
    pub trust: TrustMode,
}

impl CredentialBundle {
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.raw).unwrap_or_default()
    }
}
