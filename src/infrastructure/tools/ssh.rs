//! ssh / scp

use std::sync::Arc;

use crate::domain::ports::{CommandRunner, CommandSpec, RemoteShell, SshAccess};
use crate::error::ShipwrightResult;

use super::ToolLimits;

const HOST_KEY_OPTIONS: [&str; 4] = [
    "-o",
    "StrictHostKeyChecking=no",
    "-o",
    "UserKnownHostsFile=/dev/null",
];

/// `ProxyCommand` reaching the target through the access's jump host
pub fn proxy_command(access: &SshAccess) -> Option<String> {
    access.jump.as_ref().map(|jump| {
        format!(
            "ssh -i {} -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -W %h:%p {}",
            access.identity.display(),
            jump
        )
    })
}

pub struct SshShell {
    runner: Arc<dyn CommandRunner>,
    limits: ToolLimits,
}

impl SshShell {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: ToolLimits) -> Self {
        Self { runner, limits }
    }

    fn with_options(program: &str, access: &SshAccess) -> CommandSpec {
        let mut spec = CommandSpec::new(program)
            .arg("-i")
            .arg(access.identity.display().to_string())
            .args(HOST_KEY_OPTIONS)
            .args(["-o", "ConnectTimeout=10", "-o", "BatchMode=yes", "-o", "LogLevel=ERROR"]);
        if let Some(proxy) = proxy_command(access) {
            spec = spec.arg("-o").arg(format!("ProxyCommand={}", proxy));
        }
        spec
    }

    pub fn capture_command(access: &SshAccess, host: &str, script: &str) -> CommandSpec {
        Self::with_options("ssh", access)
            .arg(access.login(host))
            .arg(script)
    }

    pub fn fetch_command(
        access: &SshAccess,
        host: &str,
        remote_path: &str,
        local_path: &std::path::Path,
    ) -> CommandSpec {
        Self::with_options("scp", access)
            .arg(format!("{}:{}", access.login(host), remote_path))
            .arg(local_path.display().to_string())
    }
}

impl RemoteShell for SshShell {
    fn capture(&self, access: &SshAccess, host: &str, script: &str) -> ShipwrightResult<String> {
        let spec = Self::capture_command(access, host, script).timeout(self.limits.short);
        Ok(self.runner.run_checked(&spec)?.stdout)
    }

    fn fetch(
        &self,
        access: &SshAccess,
        host: &str,
        remote_path: &str,
        local_path: &std::path::Path,
    ) -> ShipwrightResult<()> {
        let spec =
            Self::fetch_command(access, host, remote_path, local_path).timeout(self.limits.short);
        self.runner.run_checked(&spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn direct_access_has_no_proxy() {
        let access = SshAccess::direct("ubuntu", "/keys/k.pem");
        let spec = SshShell::capture_command(&access, "54.0.0.1", "hostname");
        assert!(!spec.command_line().contains("ProxyCommand"));
        assert_eq!(spec.args.last().map(String::as_str), Some("hostname"));
        assert!(spec.args.contains(&"ubuntu@54.0.0.1".to_string()));
    }

    #[test]
    fn jump_access_proxies_through_jump_host_with_same_key() {
        let access = SshAccess::direct("ubuntu", "/keys/k.pem").via("3.3.3.3");
        let spec = SshShell::fetch_command(&access, "10.0.0.5", "/home/ubuntu/.kube/config", Path::new("/tmp/raw"));
        assert_eq!(spec.program, "scp");
        let proxy = spec
            .args
            .iter()
            .find(|a| a.starts_with("ProxyCommand="))
            .unwrap();
        assert!(proxy.contains("-i /keys/k.pem"));
        assert!(proxy.ends_with("-W %h:%p ubuntu@3.3.3.3"));
        assert!(spec.args.contains(&"ubuntu@10.0.0.5:/home/ubuntu/.kube/config".to_string()));
    }
}
