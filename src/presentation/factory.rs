//! Toolbox Factory
//!
//! Wires the real infrastructure adapters into the pipeline's `Toolbox`.
//! This is the dependency injection point for the application.

use std::sync::Arc;
use std::time::Duration;

use crate::application::aggregator::ClusterRegistrar;
use crate::application::pipeline::Toolbox;
use crate::config::Config;
use crate::domain::ports::{CommandRunner, SystemClock};
use crate::infrastructure::{
    Ansible, AnsibleVault, Helm, HttpProbe, Kubectl, LocalFs, SshShell, SystemCommandRunner,
    SystemForwardLauncher, Terraform, ToolLimits,
};

/// Command limits derived from `[timeouts]`
pub fn tool_limits(config: &Config, stream: bool) -> ToolLimits {
    ToolLimits {
        long: Duration::from_secs(config.timeouts.command.max(1)),
        short: Duration::from_secs(config.timeouts.query.max(1)),
        stream,
    }
}

/// Create a toolbox backed by the local machine's tools.
///
/// `stream` sends long-running tool output to stderr instead of capturing it.
pub fn create_toolbox(config: &Config, stream: bool) -> Toolbox {
    let limits = tool_limits(config, stream);
    let runner: Arc<dyn CommandRunner> =
        Arc::new(SystemCommandRunner::new().with_default_timeout(limits.short));

    Toolbox {
        provisioner: Arc::new(Terraform::new(runner.clone(), limits)),
        configurator: Arc::new(Ansible::new(runner.clone(), limits)),
        charts: Arc::new(Helm::new(runner.clone(), limits)),
        cluster: Arc::new(Kubectl::new(runner.clone(), limits)),
        remote: Arc::new(SshShell::new(runner.clone(), limits)),
        cipher: Arc::new(AnsibleVault::new(runner.clone(), limits)),
        launcher: Arc::new(SystemForwardLauncher::new(runner)),
        probe: Arc::new(HttpProbe::new()),
        fs: Arc::new(LocalFs::new()),
        clock: Arc::new(SystemClock),
    }
}

/// Registrar that writes into root namespaces and applies with the toolbox's
/// cluster client
pub fn create_registrar(config: &Config, tools: &Toolbox) -> ClusterRegistrar {
    ClusterRegistrar::new(
        tools.fs.clone(),
        tools.cluster.clone(),
        config.registration_namespace.clone(),
    )
}
