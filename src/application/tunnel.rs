//! Jump-Host Tunnel Manager
//!
//! Establishes the background forwarding process that makes a
//! jump-mediated environment's control plane reachable on a loopback port:
//!
//! 1. terminate stale forwarders for the same local port and wait until
//!    they are gone, so the port is free again
//! 2. spawn one forwarder (local port → jump host → remote target)
//! 3. send its output to the environment's tunnel log
//! 4. after a grace period, probe once and classify the session
//!
//! There is no supervision during a run. Keeping the tunnel up across
//! reboots and crashes is the job of the service descriptor written by
//! [`TunnelManager::write_service_descriptor`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::{TunnelHealth, TunnelSession};
use crate::domain::ports::{
    Clock, CommandSpec, FileMode, FileSystem, ForwardLauncher, NetworkProbe, SshAccess,
};
use crate::domain::services::{ReadinessPoller, ReadinessProbe};
use crate::error::ShipwrightResult;

/// Timing knobs for session establishment.
#[derive(Debug, Clone, Copy)]
pub struct TunnelSettings {
    /// Wait after spawning before the health probe
    pub grace: Duration,
    pub probe_timeout: Duration,
    /// Log lines included in diagnostics
    pub log_tail: usize,
    /// How long terminated forwarders get to release the local port
    pub release_wait: Duration,
    pub release_interval: Duration,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(5),
            log_tail: 10,
            release_wait: Duration::from_secs(10),
            release_interval: Duration::from_millis(250),
        }
    }
}

/// One forwarding session to establish.
#[derive(Debug, Clone)]
pub struct TunnelRequest {
    pub environment: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
    pub jump_host: String,
    pub access: SshAccess,
    pub log_path: PathBuf,
}

impl TunnelRequest {
    /// Forwarder invocation. Argument order matters: the leading part is
    /// what [`stale_pattern`] matches.
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new("ssh")
            .arg("-N")
            .args(["-o", "ExitOnForwardFailure=yes"])
            .arg("-L")
            .arg(format!(
                "127.0.0.1:{}:{}:{}",
                self.local_port, self.remote_host, self.remote_port
            ))
            .arg("-i")
            .arg(self.access.identity.display().to_string())
            .args(["-o", "StrictHostKeyChecking=no"])
            .args(["-o", "ServerAliveInterval=30"])
            .args(["-o", "ServerAliveCountMax=3"])
            .arg(self.access.login(&self.jump_host))
    }
}

/// Command-line prefix shared by every forwarder bound to `local_port`
pub fn stale_pattern(local_port: u16) -> String {
    format!(
        "ssh -N -o ExitOnForwardFailure=yes -L 127.0.0.1:{}:",
        local_port
    )
}

pub struct TunnelManager {
    launcher: Arc<dyn ForwardLauncher>,
    probe: Arc<dyn NetworkProbe>,
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileSystem>,
    settings: TunnelSettings,
}

impl TunnelManager {
    pub fn new(
        launcher: Arc<dyn ForwardLauncher>,
        probe: Arc<dyn NetworkProbe>,
        clock: Arc<dyn Clock>,
        fs: Arc<dyn FileSystem>,
        settings: TunnelSettings,
    ) -> Self {
        Self {
            launcher,
            probe,
            clock,
            fs,
            settings,
        }
    }

    /// Replace any forwarder on `request.local_port` with a fresh one
    pub fn open(&self, request: &TunnelRequest) -> ShipwrightResult<TunnelSession> {
        let pattern = stale_pattern(request.local_port);
        let stale = self.launcher.terminate_matching(&pattern)?;
        if stale > 0 {
            tracing::info!(port = request.local_port, count = stale, "terminated stale forwarders");
            self.await_release(request.local_port, &pattern);
        }

        if let Some(parent) = request.log_path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        let spec = request.command();
        tracing::debug!(command = %spec, "spawning forwarder");
        let handle = self.launcher.spawn(&spec, &request.log_path)?;

        let mut session = TunnelSession {
            local_port: request.local_port,
            remote_target: format!("{}:{}", request.remote_host, request.remote_port),
            jump_host: request.jump_host.clone(),
            log_path: request.log_path.clone(),
            health: TunnelHealth::Unknown,
            handle,
        };

        self.clock.sleep(self.settings.grace);
        self.check(&mut session);
        Ok(session)
    }

    /// Wait until no process matches `pattern`. A forwarder that outlives
    /// the budget is reported and the new one is spawned anyway; its own
    /// bind failure then shows up in the diagnostics.
    fn await_release(&self, local_port: u16, pattern: &str) {
        let probe = ReadinessProbe::new(
            format!("release of 127.0.0.1:{}", local_port),
            self.settings.release_interval,
            self.settings.release_wait,
        );
        let readiness = ReadinessPoller::new(self.clock.clone())
            .poll(&probe, || Ok(self.launcher.count_matching(pattern)? == 0));
        if !readiness.is_ready() {
            tracing::warn!(
                port = local_port,
                waited = ?readiness.waited(),
                "stale forwarder still running"
            );
        }
    }

    /// Re-classify `session` with one liveness check and one probe
    pub fn check(&self, session: &mut TunnelSession) -> TunnelHealth {
        session.health = if !session.handle.is_alive() {
            TunnelHealth::Dead
        } else {
            let url = format!("{}/version", session.local_url());
            let status = self.probe.http_status(&url, self.settings.probe_timeout);
            tracing::debug!(port = session.local_port, status = %status.describe(), "tunnel probe");
            if status.is_alive() {
                TunnelHealth::Healthy
            } else {
                TunnelHealth::Degraded
            }
        };
        session.health
    }

    /// Liveness plus the tail of the forwarder log, for failure messages
    pub fn diagnostics(&self, session: &mut TunnelSession) -> String {
        let alive = session.handle.is_alive();
        let pid = session
            .handle
            .pid()
            .map_or_else(|| "?".to_string(), |p| p.to_string());
        let tail = self.log_tail(&session.log_path);
        let mut text = format!(
            "forwarder pid {} {}; log {}",
            pid,
            if alive { "running" } else { "exited" },
            session.log_path.display()
        );
        if tail.is_empty() {
            text.push_str(" (empty)");
        } else {
            text.push_str(":\n");
            text.push_str(&tail.join("\n"));
        }
        text
    }

    fn log_tail(&self, path: &Path) -> Vec<String> {
        let Ok(content) = self.fs.read(path) else {
            return Vec::new();
        };
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let skip = lines.len().saturating_sub(self.settings.log_tail);
        lines[skip..].iter().map(|l| format!("  {}", l)).collect()
    }

    /// Write the always-on unit that keeps this tunnel up outside of runs
    pub fn write_service_descriptor(
        &self,
        request: &TunnelRequest,
        path: &Path,
    ) -> ShipwrightResult<bool> {
        self.fs
            .write_if_changed(path, &service_descriptor(request), FileMode::Default)
    }
}

/// systemd unit restarting the forwarder whenever it exits
pub fn service_descriptor(request: &TunnelRequest) -> String {
    let spec = request.command();
    let exec = std::iter::once("/usr/bin/ssh".to_string())
        .chain(spec.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "[Unit]\n\
         Description=Shipwright tunnel for {env} (127.0.0.1:{port} -> {target} via {jump})\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         ExecStart={exec}\n\
         Restart=always\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        env = request.environment,
        port = request.local_port,
        target = format!("{}:{}", request.remote_host, request.remote_port),
        jump = request.jump_host,
        exec = exec,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ForwardHandle, ManualClock, ProbeStatus};
    use crate::infrastructure::fs::LocalFs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Simulated process table: (pid, command line, alive)
    #[derive(Default)]
    struct ProcessTable {
        procs: Mutex<Vec<(u32, String, bool)>>,
        exits_immediately: bool,
        /// Liveness checks a terminated process survives before it exits
        lingers_for: u32,
        lingering: Mutex<Vec<(u32, u32)>>,
        /// Set when a forwarder is spawned while a stale one still runs
        spawned_over_live: Mutex<bool>,
    }

    impl ProcessTable {
        fn live_matching(&self, pattern: &str) -> usize {
            self.procs
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, cmd, alive)| *alive && cmd.contains(pattern))
                .count()
        }
    }

    struct FakeHandle {
        pid: u32,
        table: Arc<ProcessTable>,
    }

    impl ForwardHandle for FakeHandle {
        fn pid(&self) -> Option<u32> {
            Some(self.pid)
        }

        fn is_alive(&mut self) -> bool {
            self.table
                .procs
                .lock()
                .unwrap()
                .iter()
                .any(|(pid, _, alive)| *pid == self.pid && *alive)
        }

    }

    struct FakeLauncher(Arc<ProcessTable>);

    impl ForwardLauncher for FakeLauncher {
        fn terminate_matching(&self, pattern: &str) -> ShipwrightResult<usize> {
            let mut procs = self.0.procs.lock().unwrap();
            let mut killed = 0;
            let mut lingering = self.0.lingering.lock().unwrap();
            for (pid, cmd, alive) in procs.iter_mut() {
                if *alive && cmd.contains(pattern) {
                    if self.0.lingers_for == 0 {
                        *alive = false;
                    } else {
                        lingering.push((*pid, self.0.lingers_for));
                    }
                    killed += 1;
                }
            }
            Ok(killed)
        }

        fn count_matching(&self, pattern: &str) -> ShipwrightResult<usize> {
            let mut procs = self.0.procs.lock().unwrap();
            let mut lingering = self.0.lingering.lock().unwrap();
            lingering.retain_mut(|(pid, left)| {
                if *left > 0 {
                    *left -= 1;
                    return true;
                }
                if let Some(entry) = procs.iter_mut().find(|(p, _, _)| p == pid) {
                    entry.2 = false;
                }
                false
            });
            Ok(procs
                .iter()
                .filter(|(_, cmd, alive)| *alive && cmd.contains(pattern))
                .count())
        }

        fn spawn(
            &self,
            spec: &CommandSpec,
            log: &Path,
        ) -> ShipwrightResult<Box<dyn ForwardHandle>> {
            std::fs::write(log, "bind [127.0.0.1]:16444: Address already in use\n").unwrap();
            let mut procs = self.0.procs.lock().unwrap();
            let command = spec.command_line();
            if procs.iter().any(|(_, cmd, alive)| *alive && *cmd == command) {
                *self.0.spawned_over_live.lock().unwrap() = true;
            }
            let pid = 1000 + procs.len() as u32;
            procs.push((pid, spec.command_line(), !self.0.exits_immediately));
            Ok(Box::new(FakeHandle {
                pid,
                table: self.0.clone(),
            }))
        }
    }

    struct FixedProbe(ProbeStatus);

    impl NetworkProbe for FixedProbe {
        fn http_status(&self, _url: &str, _timeout: Duration) -> ProbeStatus {
            self.0.clone()
        }

        fn tcp_reachable(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
            true
        }
    }

    fn request(dir: &Path) -> TunnelRequest {
        TunnelRequest {
            environment: "edge-east".to_string(),
            local_port: 16444,
            remote_host: "10.1.0.10".to_string(),
            remote_port: 6443,
            jump_host: "3.3.3.3".to_string(),
            access: SshAccess::direct("ubuntu", "/keys/k8s-key.pem"),
            log_path: dir.join("edge-east").join("tunnel.log"),
        }
    }

    fn manager(table: Arc<ProcessTable>, status: ProbeStatus) -> TunnelManager {
        TunnelManager::new(
            Arc::new(FakeLauncher(table)),
            Arc::new(FixedProbe(status)),
            Arc::new(ManualClock::new()),
            Arc::new(LocalFs::new()),
            TunnelSettings::default(),
        )
    }

    #[test]
    fn stale_forwarder_is_replaced_by_exactly_one() {
        let dir = tempdir().unwrap();
        let table = Arc::new(ProcessTable::default());
        let req = request(dir.path());
        table
            .procs
            .lock()
            .unwrap()
            .push((42, req.command().command_line(), true));

        let mgr = manager(table.clone(), ProbeStatus::Unauthenticated(401));
        let session = mgr.open(&req).unwrap();

        assert_eq!(table.live_matching(&stale_pattern(16444)), 1);
        assert_eq!(session.health, TunnelHealth::Healthy);
        assert_eq!(session.handle.pid(), Some(1001));
    }

    #[test]
    fn spawn_waits_until_terminated_forwarder_has_exited() {
        let dir = tempdir().unwrap();
        let table = Arc::new(ProcessTable {
            lingers_for: 3,
            ..Default::default()
        });
        let req = request(dir.path());
        table
            .procs
            .lock()
            .unwrap()
            .push((42, req.command().command_line(), true));

        let session = manager(table.clone(), ProbeStatus::Ok(200)).open(&req).unwrap();

        assert!(!*table.spawned_over_live.lock().unwrap());
        assert_eq!(table.live_matching(&stale_pattern(16444)), 1);
        assert_eq!(session.handle.pid(), Some(1001));
        assert_eq!(session.health, TunnelHealth::Healthy);
    }

    #[test]
    fn forwarders_on_other_ports_are_left_alone() {
        let dir = tempdir().unwrap();
        let table = Arc::new(ProcessTable::default());
        let mut other = request(dir.path());
        other.local_port = 16445;
        table
            .procs
            .lock()
            .unwrap()
            .push((7, other.command().command_line(), true));

        manager(table.clone(), ProbeStatus::Ok(200))
            .open(&request(dir.path()))
            .unwrap();

        assert_eq!(table.live_matching(&stale_pattern(16445)), 1);
        assert_eq!(table.live_matching(&stale_pattern(16444)), 1);
    }

    #[test]
    fn failed_probe_with_live_process_is_degraded() {
        let dir = tempdir().unwrap();
        let table = Arc::new(ProcessTable::default());
        let mgr = manager(table, ProbeStatus::Unreachable("connection reset".into()));
        let session = mgr.open(&request(dir.path())).unwrap();
        assert_eq!(session.health, TunnelHealth::Degraded);
        assert!(session.is_usable());
    }

    #[test]
    fn exited_process_is_dead_and_diagnostics_show_log() {
        let dir = tempdir().unwrap();
        let table = Arc::new(ProcessTable {
            exits_immediately: true,
            ..Default::default()
        });
        let mgr = manager(table, ProbeStatus::Ok(200));
        let mut session = mgr.open(&request(dir.path())).unwrap();

        assert_eq!(session.health, TunnelHealth::Dead);
        let text = mgr.diagnostics(&mut session);
        assert!(text.contains("exited"));
        assert!(text.contains("Address already in use"));
    }

    #[test]
    fn service_descriptor_restarts_always() {
        let unit = service_descriptor(&request(Path::new("/state")));
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains(
            "ExecStart=/usr/bin/ssh -N -o ExitOnForwardFailure=yes -L 127.0.0.1:16444:10.1.0.10:6443"
        ));
        assert!(unit.contains("ubuntu@3.3.3.3"));
    }
}
