//! ansible-playbook and ansible-vault

use std::path::Path;
use std::sync::Arc;

use crate::domain::entities::Environment;
use crate::domain::ports::{CommandRunner, CommandSpec, Configurator, PlaybookRun, VaultCipher};
use crate::error::ShipwrightResult;

use super::ssh::proxy_command;
use super::ToolLimits;

pub struct Ansible {
    runner: Arc<dyn CommandRunner>,
    limits: ToolLimits,
}

impl Ansible {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: ToolLimits) -> Self {
        Self { runner, limits }
    }

    pub fn playbook_command(env: &Environment, run: &PlaybookRun<'_>) -> CommandSpec {
        let mut spec = CommandSpec::new("ansible-playbook")
            .arg("-i")
            .arg(env.ansible_dir.join(&env.inventory).display().to_string())
            .arg(run.playbook)
            .arg("-u")
            .arg(run.access.user.clone())
            .arg("--private-key")
            .arg(run.access.identity.display().to_string())
            .arg("--vault-password-file")
            .arg(run.vault_password_file.display().to_string())
            .arg("-e")
            .arg(format!("@{}", run.vault_payload_file.display()));
        for (key, value) in &run.extra_vars {
            spec = spec.arg("-e").arg(format!("{}={}", key, value));
        }
        if let Some(proxy) = proxy_command(run.access) {
            spec = spec.arg(format!("--ssh-common-args=-o ProxyCommand=\"{}\"", proxy));
        }
        spec.current_dir(&env.ansible_dir)
            .env("ANSIBLE_CONFIG", run.config_file.display().to_string())
            .env("ANSIBLE_HOST_KEY_CHECKING", "False")
    }
}

impl Configurator for Ansible {
    fn run_playbook(&self, env: &Environment, run: &PlaybookRun<'_>) -> ShipwrightResult<()> {
        let mut spec = Self::playbook_command(env, run).timeout(self.limits.long);
        if self.limits.stream {
            spec = spec.inherit_output();
        }
        self.runner.run_checked(&spec)?;
        Ok(())
    }
}

pub struct AnsibleVault {
    runner: Arc<dyn CommandRunner>,
    limits: ToolLimits,
}

impl AnsibleVault {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: ToolLimits) -> Self {
        Self { runner, limits }
    }

    fn command(action: &str, payload_file: &Path, password_file: &Path) -> CommandSpec {
        CommandSpec::new("ansible-vault")
            .arg(action)
            .arg("--vault-password-file")
            .arg(password_file.display().to_string())
            .arg(payload_file.display().to_string())
    }
}

impl VaultCipher for AnsibleVault {
    fn can_decrypt(&self, payload_file: &Path, password_file: &Path) -> bool {
        let spec = Self::command("view", payload_file, password_file).timeout(self.limits.short);
        match self.runner.run(&spec) {
            Ok(out) => out.success(),
            Err(e) => {
                tracing::debug!(error = %e, "ansible-vault view failed");
                false
            }
        }
    }

    fn encrypt(&self, payload_file: &Path, password_file: &Path) -> ShipwrightResult<()> {
        let spec = Self::command("encrypt", payload_file, password_file).timeout(self.limits.short);
        self.runner.run_checked(&spec)?;
        Ok(())
    }
}
