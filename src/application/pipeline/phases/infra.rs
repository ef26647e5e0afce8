//! Infrastructure phases: jump host lookup, provisioning and outputs.

use crate::application::pipeline::context::PipelineContext;
use crate::application::pipeline::phase::{Phase, PhaseStatus};
use crate::domain::entities::{ArtifactNamespace, InfraOutputs, JumpHost};
use crate::domain::ports::FileMode;
use crate::error::{ShipwrightError, ShipwrightResult};

/// Finds the root environment's jump host before anything else runs.
pub struct ResolveJumpHost;

impl Phase for ResolveJumpHost {
    fn name(&self) -> &'static str {
        "resolve-jump-host"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        if let Some(known) = &ctx.state.jump_host {
            ctx.step(format!("jump host {} (from {})", known.address, known.owner));
            return Ok(PhaseStatus::Done);
        }

        let root = ctx
            .env
            .jump_host_ref()
            .ok_or_else(|| ctx.missing_root_prerequisite())?
            .to_string();
        let path = ArtifactNamespace::new(&ctx.settings.state_dir, &root).outputs();
        if !ctx.tools.fs.exists(&path) {
            return Err(ctx.missing_root_prerequisite());
        }

        let outputs: InfraOutputs = serde_json::from_str(&ctx.tools.fs.read(&path)?)?;
        let address = outputs
            .jump_host()
            .ok_or_else(|| ctx.missing_root_prerequisite())?;
        ctx.step(format!("jump host {} (from {})", address, root));
        ctx.state.jump_host = Some(JumpHost {
            owner: root,
            address,
        });
        Ok(PhaseStatus::Done)
    }

    fn verify(&self, ctx: &PipelineContext<'_>) -> ShipwrightResult<()> {
        ctx.require_jump_host().map(|_| ())
    }
}

/// Converges the environment's infrastructure.
pub struct Provision;

impl Phase for Provision {
    fn name(&self) -> &'static str {
        "provision"
    }

    fn skip_reason(&self, ctx: &PipelineContext<'_>) -> Option<String> {
        ctx.settings
            .skip
            .provision
            .then(|| "provisioning disabled".to_string())
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        ctx.step(format!("terraform apply in {}", ctx.env.terraform_dir.display()));
        ctx.tools.provisioner.apply(ctx.env)?;
        Ok(PhaseStatus::Done)
    }
}

/// Reads and persists the provisioner outputs; picks the primary node.
pub struct ReadOutputs;

impl Phase for ReadOutputs {
    fn name(&self) -> &'static str {
        "read-outputs"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let outputs = ctx.tools.provisioner.outputs(ctx.env)?;

        let private = outputs.control_plane_private();
        let primary = if ctx.env.topology.is_jump_mediated() {
            match &private {
                Some(address) => address.clone(),
                None => outputs.control_plane_public()?,
            }
        } else {
            outputs.control_plane_public()?
        };
        ctx.step(format!("primary node {}", primary));

        let text = serde_json::to_string_pretty(&outputs)?;
        ctx.tools.fs.write_if_changed(
            &ctx.env.namespace.outputs(),
            &format!("{}\n", text),
            FileMode::Default,
        )?;

        let mut status = PhaseStatus::Done;
        if ctx.env.is_root() {
            match outputs.jump_host() {
                Some(address) => {
                    ctx.state.jump_host = Some(JumpHost {
                        owner: ctx.env.name.clone(),
                        address,
                    });
                }
                None => {
                    status = PhaseStatus::Degraded(
                        "no jump host address in outputs; dependent environments cannot run"
                            .to_string(),
                    );
                }
            }
        }

        ctx.state.primary_address = Some(primary);
        ctx.state.primary_private = private;
        ctx.state.outputs = Some(outputs);
        Ok(status)
    }

    fn verify(&self, ctx: &PipelineContext<'_>) -> ShipwrightResult<()> {
        ctx.primary().map(|_| ())
    }
}

/// Locates the configurator config, synthesizing a permissive one if the
/// project has none.
pub struct PrepareInventory;

impl Phase for PrepareInventory {
    fn name(&self) -> &'static str {
        "prepare-inventory"
    }

    fn fatal(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let project_cfg = ctx.env.ansible_dir.join("ansible.cfg");
        if ctx.tools.fs.exists(&project_cfg) {
            ctx.state.ansible_config = Some(project_cfg);
            return Ok(PhaseStatus::Done);
        }

        let inventory = ctx.env.ansible_dir.join(&ctx.env.inventory);
        if !ctx.tools.fs.exists(&inventory) {
            return Err(ShipwrightError::ConfigurationMissing { path: inventory });
        }

        let fallback = ctx.env.namespace.ansible_config();
        ctx.tools.fs.write_if_changed(
            &fallback,
            &default_ansible_config(&inventory.display().to_string()),
            FileMode::Default,
        )?;
        let reason = format!(
            "{} not found; using generated {}",
            project_cfg.display(),
            fallback.display()
        );
        ctx.warn(reason.clone());
        ctx.state.ansible_config = Some(fallback);
        Ok(PhaseStatus::Degraded(reason))
    }
}

fn default_ansible_config(inventory: &str) -> String {
    format!(
        "[defaults]\n\
         inventory = {}\n\
         host_key_checking = False\n\
         retry_files_enabled = False\n\
         interpreter_python = auto_silent\n\
         \n\
         [ssh_connection]\n\
         pipelining = True\n",
        inventory
    )
}
