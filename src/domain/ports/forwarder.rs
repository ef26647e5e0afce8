//! Background forwarding processes and network probes.

use std::path::Path;
use std::time::Duration;

use super::command_runner::CommandSpec;
use crate::error::ShipwrightResult;

/// Handle to a detached background process.
///
/// Dropping the handle leaves the process running.
pub trait ForwardHandle: Send {
    fn pid(&self) -> Option<u32>;

    /// Process has not exited yet
    fn is_alive(&mut self) -> bool;
}

/// Starts and reaps long-lived forwarding processes.
pub trait ForwardLauncher: Send + Sync {
    /// Terminate every process whose full command line matches `pattern`.
    /// Returns how many were signalled.
    fn terminate_matching(&self, pattern: &str) -> ShipwrightResult<usize>;

    /// Number of live processes whose full command line matches `pattern`
    fn count_matching(&self, pattern: &str) -> ShipwrightResult<usize>;

    /// Spawn `spec` detached, appending stdout and stderr to `log`
    fn spawn(&self, spec: &CommandSpec, log: &Path) -> ShipwrightResult<Box<dyn ForwardHandle>>;
}

/// Classified answer of an HTTP status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// 2xx/3xx
    Ok(u16),
    /// 401/403: the server is alive but rejected anonymous access
    Unauthenticated(u16),
    /// Any other status code
    Unexpected(u16),
    /// No HTTP response at all
    Unreachable(String),
}

impl ProbeStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=399 => ProbeStatus::Ok(code),
            401 | 403 => ProbeStatus::Unauthenticated(code),
            other => ProbeStatus::Unexpected(other),
        }
    }

    /// The endpoint answered like a live control plane
    pub fn is_alive(&self) -> bool {
        matches!(self, ProbeStatus::Ok(_) | ProbeStatus::Unauthenticated(_))
    }

    pub fn describe(&self) -> String {
        match self {
            ProbeStatus::Ok(code) => format!("HTTP {}", code),
            ProbeStatus::Unauthenticated(code) => format!("HTTP {} (alive, unauthenticated)", code),
            ProbeStatus::Unexpected(code) => format!("unexpected HTTP {}", code),
            ProbeStatus::Unreachable(reason) => format!("unreachable: {}", reason),
        }
    }
}

/// Network reachability checks
pub trait NetworkProbe: Send + Sync {
    /// One bounded HTTPS GET; certificate verification is disabled
    fn http_status(&self, url: &str, timeout: Duration) -> ProbeStatus;

    /// A TCP connection to `host:port` can be opened
    fn tcp_reachable(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_counts_as_alive() {
        assert!(ProbeStatus::from_code(401).is_alive());
        assert!(ProbeStatus::from_code(403).is_alive());
        assert!(ProbeStatus::from_code(200).is_alive());
        assert!(!ProbeStatus::from_code(502).is_alive());
        assert!(!ProbeStatus::Unreachable("refused".into()).is_alive());
    }

    #[test]
    fn describe_distinguishes_auth_from_failure() {
        assert_eq!(
            ProbeStatus::from_code(401).describe(),
            "HTTP 401 (alive, unauthenticated)"
        );
        assert_eq!(ProbeStatus::from_code(500).describe(), "unexpected HTTP 500");
    }
}
