//! UI port-forward
//!
//! Keeps a cluster UI service reachable on a local port. The forward runs
//! inside a small wrapper loop that restarts it whenever it drops, so the
//! UI stays up after this process exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::UiForward;
use crate::domain::ports::{
    Clock, CommandSpec, FileMode, FileSystem, ForwardHandle, ForwardLauncher,
};
use crate::error::ShipwrightResult;

/// Paths and credentials for one forward.
#[derive(Debug, Clone)]
pub struct UiForwardRequest<'a> {
    pub forward: &'a UiForward,
    pub kubeconfig: &'a Path,
    pub script_path: PathBuf,
    pub log_path: PathBuf,
}

impl UiForwardRequest<'_> {
    pub fn url(&self) -> String {
        format!("https://localhost:{}", self.forward.local_port)
    }
}

pub struct UiForwarder {
    launcher: Arc<dyn ForwardLauncher>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

impl UiForwarder {
    pub fn new(
        launcher: Arc<dyn ForwardLauncher>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        grace: Duration,
    ) -> Self {
        Self {
            launcher,
            fs,
            clock,
            grace,
        }
    }

    /// Replace any running forward for the same local port and start the
    /// wrapper loop. The returned handle has had `grace` to fail.
    pub fn start(&self, request: &UiForwardRequest<'_>) -> ShipwrightResult<Box<dyn ForwardHandle>> {
        let script_path = request.script_path.display().to_string();
        let mut stopped = self.launcher.terminate_matching(&script_path)?;
        stopped += self
            .launcher
            .terminate_matching(&port_forward_pattern(request.forward))?;
        if stopped > 0 {
            tracing::info!(port = request.forward.local_port, count = stopped, "stopped previous UI forward");
        }

        self.fs.write_if_changed(
            &request.script_path,
            &wrapper_script(request.forward, request.kubeconfig, &request.log_path),
            FileMode::Executable,
        )?;

        let spec = CommandSpec::new("/bin/sh").arg(script_path);
        let mut handle = self.launcher.spawn(&spec, &request.log_path)?;
        self.clock.sleep(self.grace);
        if !handle.is_alive() {
            tracing::warn!(log = %request.log_path.display(), "UI forward exited during grace period");
        }
        Ok(handle)
    }
}

/// Command-line prefix of the bare port-forward for this UI
pub fn port_forward_pattern(forward: &UiForward) -> String {
    format!(
        "kubectl port-forward -n {} svc/{} {}:",
        forward.namespace, forward.service, forward.local_port
    )
}

/// Shell loop restarting the port-forward every time it exits
pub fn wrapper_script(forward: &UiForward, kubeconfig: &Path, log: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         # Restarts the {service} port-forward whenever it drops.\n\
         export KUBECONFIG='{kubeconfig}'\n\
         while true; do\n\
         \x20 kubectl port-forward -n {ns} svc/{service} {local}:{remote} >> '{log}' 2>&1\n\
         \x20 echo \"$(date): port-forward for {service} exited, restarting in 5s\" >> '{log}'\n\
         \x20 sleep 5\n\
         done\n",
        service = forward.service,
        ns = forward.namespace,
        local = forward.local_port,
        remote = forward.remote_port,
        kubeconfig = kubeconfig.display(),
        log = log.display(),
    )
}
