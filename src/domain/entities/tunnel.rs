//! Tunnel session entity.

use std::fmt;
use std::path::PathBuf;

use crate::domain::ports::ForwardHandle;

/// Last known health of a tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelHealth {
    Unknown,
    /// Process alive and the forwarded endpoint answered
    Healthy,
    /// Process alive but the probe failed or was ambiguous
    Degraded,
    /// Process exited
    Dead,
}

impl fmt::Display for TunnelHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TunnelHealth::Unknown => "unknown",
            TunnelHealth::Healthy => "healthy",
            TunnelHealth::Degraded => "degraded",
            TunnelHealth::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// A background forwarding process: local port → jump host → remote target.
///
/// Owned exclusively by the tunnel manager. The process is detached and keeps
/// running after Shipwright exits; dropping the session does not stop it.
pub struct TunnelSession {
    pub local_port: u16,
    pub remote_target: String,
    pub jump_host: String,
    pub log_path: PathBuf,
    pub health: TunnelHealth,
    pub handle: Box<dyn ForwardHandle>,
}

impl TunnelSession {
    pub fn local_url(&self) -> String {
        format!("https://127.0.0.1:{}", self.local_port)
    }

    pub fn is_usable(&self) -> bool {
        self.health != TunnelHealth::Dead
    }
}

impl fmt::Debug for TunnelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelSession")
            .field("local_port", &self.local_port)
            .field("remote_target", &self.remote_target)
            .field("jump_host", &self.jump_host)
            .field("log_path", &self.log_path)
            .field("health", &self.health)
            .field("pid", &self.handle.pid())
            .finish()
    }
}
