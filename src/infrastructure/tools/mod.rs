//! Adapters for the external deployment tools.
//!
//! Every adapter builds explicit argument vectors and runs them through a
//! `CommandRunner`. With `stream` set, long-running tools write their
//! progress to the terminal (stderr); otherwise output is captured.

mod ansible;
mod helm;
mod kubectl;
mod probe;
mod ssh;
mod terraform;

pub use ansible::{Ansible, AnsibleVault};
pub use helm::Helm;
pub use kubectl::Kubectl;
pub use probe::HttpProbe;
pub use ssh::{proxy_command, SshShell};
pub use terraform::Terraform;

use std::time::Duration;

/// Timeouts shared by the tool adapters.
#[derive(Debug, Clone, Copy)]
pub struct ToolLimits {
    /// terraform, ansible-playbook, helm upgrade
    pub long: Duration,
    /// kubectl get, ssh one-liners, repo operations
    pub short: Duration,
    pub stream: bool,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            long: Duration::from_secs(1800),
            short: Duration::from_secs(30),
            stream: false,
        }
    }
}
