//! Command runner backed by `std::process`.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::domain::ports::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::{ShipwrightError, ShipwrightResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs commands as child processes. A command past its timeout is killed.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    /// Applied when a `CommandSpec` carries no timeout of its own
    default_timeout: Option<Duration>,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    fn build(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if spec.inherit_output {
            // stdout stays clean for machine-readable output
            cmd.stdout(Stdio::from(std::io::stderr()))
                .stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        cmd
    }
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> Option<JoinHandle<String>> {
    reader.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> ShipwrightResult<CommandOutput> {
        let command = spec.command_line();
        tracing::debug!(%command, cwd = ?spec.cwd, "running");

        let mut child = Self::build(spec)
            .spawn()
            .map_err(|source| ShipwrightError::CommandSpawn {
                command: command.clone(),
                source,
            })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let timeout = spec.timeout.or(self.default_timeout);
        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    kill(&mut child);
                    tracing::warn!(%command, timeout_s = limit.as_secs(), "killed after timeout");
                    return Err(ShipwrightError::CommandTimedOut {
                        command,
                        timeout: limit,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = CommandOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        tracing::debug!(
            %command,
            code = ?output.code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        Ok(output)
    }
}
