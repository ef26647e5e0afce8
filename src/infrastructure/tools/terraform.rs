//! terraform

use std::sync::Arc;

use crate::domain::entities::{Environment, InfraOutputs};
use crate::domain::ports::{CommandRunner, CommandSpec, Provisioner};
use crate::error::{ShipwrightError, ShipwrightResult};

use super::ToolLimits;

pub struct Terraform {
    runner: Arc<dyn CommandRunner>,
    limits: ToolLimits,
}

impl Terraform {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: ToolLimits) -> Self {
        Self { runner, limits }
    }

    fn command(env: &Environment) -> CommandSpec {
        CommandSpec::new("terraform").arg(format!("-chdir={}", env.terraform_dir.display()))
    }

    fn ensure_dir(env: &Environment) -> ShipwrightResult<()> {
        if env.terraform_dir.is_dir() {
            Ok(())
        } else {
            Err(ShipwrightError::ConfigurationMissing {
                path: env.terraform_dir.clone(),
            })
        }
    }

    fn long(&self, spec: CommandSpec) -> CommandSpec {
        let spec = spec.timeout(self.limits.long);
        if self.limits.stream {
            spec.inherit_output()
        } else {
            spec
        }
    }
}

impl Provisioner for Terraform {
    fn apply(&self, env: &Environment) -> ShipwrightResult<()> {
        Self::ensure_dir(env)?;
        self.runner
            .run_checked(&self.long(Self::command(env).args(["init", "-input=false"])))?;
        self.runner.run_checked(
            &self.long(Self::command(env).args(["apply", "-auto-approve", "-input=false"])),
        )?;
        Ok(())
    }

    fn outputs(&self, env: &Environment) -> ShipwrightResult<InfraOutputs> {
        Self::ensure_dir(env)?;
        let out = self.runner.run_checked(
            &Self::command(env)
                .args(["output", "-json"])
                .timeout(self.limits.short),
        )?;
        InfraOutputs::from_provisioner_json(&out.stdout)
    }
}
