//! helm

use std::path::Path;
use std::sync::Arc;

use crate::domain::entities::AddonSpec;
use crate::domain::ports::{ChartInstaller, CommandRunner, CommandSpec};
use crate::error::ShipwrightResult;

use super::ToolLimits;

pub struct Helm {
    runner: Arc<dyn CommandRunner>,
    limits: ToolLimits,
}

impl Helm {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: ToolLimits) -> Self {
        Self { runner, limits }
    }

    /// `helm upgrade --install`; values files first, then `--set` overrides
    pub fn install_command(kubeconfig: &Path, addon: &AddonSpec) -> CommandSpec {
        let mut spec = CommandSpec::new("helm")
            .args(["upgrade", "--install"])
            .arg(addon.release.clone())
            .arg(addon.chart.clone())
            .arg("--namespace")
            .arg(addon.namespace.clone())
            .arg("--create-namespace")
            .arg("--kubeconfig")
            .arg(kubeconfig.display().to_string())
            .arg("--timeout")
            .arg(addon.timeout.clone());
        for file in &addon.values_files {
            spec = spec.arg("-f").arg(file.display().to_string());
        }
        for (key, value) in &addon.values {
            spec = spec.arg("--set").arg(format!("{}={}", key, value));
        }
        spec
    }
}

impl ChartInstaller for Helm {
    fn add_repo(&self, name: &str, url: &str) -> ShipwrightResult<()> {
        let spec = CommandSpec::new("helm")
            .args(["repo", "add", "--force-update", name, url])
            .timeout(self.limits.short);
        self.runner.run_checked(&spec)?;
        Ok(())
    }

    fn update_repo(&self, name: &str) -> ShipwrightResult<()> {
        let spec = CommandSpec::new("helm")
            .args(["repo", "update", name])
            .timeout(self.limits.short);
        self.runner.run_checked(&spec)?;
        Ok(())
    }

    fn upgrade_install(&self, kubeconfig: &Path, addon: &AddonSpec) -> ShipwrightResult<()> {
        let mut spec = Self::install_command(kubeconfig, addon).timeout(self.limits.long);
        if self.limits.stream {
            spec = spec.inherit_output();
        }
        self.runner.run_checked(&spec)?;
        Ok(())
    }
}
