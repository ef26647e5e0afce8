//! Detached forwarding processes.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use crate::domain::ports::{CommandRunner, CommandSpec, ForwardHandle, ForwardLauncher};
use crate::error::{ShipwrightError, ShipwrightResult};

/// Handle to a spawned child. Dropping it leaves the process running.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
}

impl ForwardHandle for ProcessHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Launches forwarders in their own process group and finds stale ones with
/// `pgrep -f`.
pub struct SystemForwardLauncher {
    runner: Arc<dyn CommandRunner>,
}

impl SystemForwardLauncher {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn matching_pids(&self, pattern: &str) -> ShipwrightResult<Vec<u32>> {
        let out = self
            .runner
            .run(&CommandSpec::new("pgrep").args(["-f", "--", pattern]))?;
        // pgrep exits 1 when nothing matches
        if !out.success() && out.code != Some(1) {
            return Err(ShipwrightError::command_failed(
                format!("pgrep -f -- {}", pattern),
                out.code,
                &out.stderr,
            ));
        }
        let own = std::process::id();
        Ok(out
            .stdout
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .filter(|pid| *pid != own)
            .collect())
    }
}

impl ForwardLauncher for SystemForwardLauncher {
    fn terminate_matching(&self, pattern: &str) -> ShipwrightResult<usize> {
        let pids = self.matching_pids(pattern)?;
        let mut signalled = 0;
        for pid in pids {
            let out = self
                .runner
                .run(&CommandSpec::new("kill").arg(pid.to_string()))?;
            if out.success() {
                tracing::debug!(pid, pattern, "terminated");
                signalled += 1;
            }
        }
        Ok(signalled)
    }

    fn count_matching(&self, pattern: &str) -> ShipwrightResult<usize> {
        Ok(self.matching_pids(pattern)?.len())
    }

    fn spawn(&self, spec: &CommandSpec, log: &Path) -> ShipwrightResult<Box<dyn ForwardHandle>> {
        if let Some(parent) = log.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let out = OpenOptions::new().create(true).append(true).open(log)?;
        let err = out.try_clone()?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err));
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group: an interrupt of this run must not reach it.
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| ShipwrightError::CommandSpawn {
            command: spec.command_line(),
            source,
        })?;
        tracing::info!(pid = child.id(), log = %log.display(), "spawned {}", spec.program);
        Ok(Box::new(ProcessHandle { child }))
    }
}
