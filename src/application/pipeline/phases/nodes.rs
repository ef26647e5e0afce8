//! Node phases: reachability, vault and configuration.

use crate::application::pipeline::context::PipelineContext;
use crate::application::pipeline::phase::{Phase, PhaseStatus};
use crate::application::vault::{LiveClusterSecret, VaultBootstrapper, VaultOutcome};
use crate::domain::entities::SecretVault;
use crate::domain::ports::PlaybookRun;
use crate::error::ShipwrightResult;

const SSH_PORT: u16 = 22;

/// Blocks until the root's jump host accepts SSH connections.
pub struct WaitJumpHost;

impl Phase for WaitJumpHost {
    fn name(&self) -> &'static str {
        "wait-jump-host"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let address = ctx.require_jump_host()?.address.clone();
        let what = format!("jump host {}:{}", address, SSH_PORT);
        let probe = ctx.settings.timeouts.nodes.probe(what.clone());
        let timeout = ctx.settings.timeouts.query;
        let net = ctx.tools.probe.clone();

        ctx.poller()
            .poll(&probe, || Ok(net.tcp_reachable(&address, SSH_PORT, timeout)))
            .into_result(&what)?;
        Ok(PhaseStatus::Done)
    }
}

/// Waits for the primary node's SSH port. A timeout only degrades the run:
/// the configurator retries connections on its own.
pub struct WaitNodes;

impl Phase for WaitNodes {
    fn name(&self) -> &'static str {
        "wait-nodes"
    }

    fn fatal(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let address = ctx.primary()?.to_string();
        let what = format!("primary node {}:{}", address, SSH_PORT);
        let probe = ctx.settings.timeouts.nodes.probe(what.clone());
        let timeout = ctx.settings.timeouts.query;
        let net = ctx.tools.probe.clone();

        let readiness = ctx
            .poller()
            .poll(&probe, || Ok(net.tcp_reachable(&address, SSH_PORT, timeout)));
        if readiness.is_ready() {
            Ok(PhaseStatus::Done)
        } else {
            Ok(PhaseStatus::Degraded(format!(
                "{} not reachable after {}s",
                what,
                readiness.waited().as_secs()
            )))
        }
    }
}

/// Makes the vault present and decryptable before the configurator needs it.
pub struct EnsureVault;

impl Phase for EnsureVault {
    fn name(&self) -> &'static str {
        "vault"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let vault = SecretVault::in_namespace(&ctx.env.namespace);
        let access = ctx.ssh_access()?;
        let source = LiveClusterSecret {
            remote: ctx.tools.remote.as_ref(),
            access: &access,
            host: ctx.state.primary_address.as_deref(),
            fallback: ctx.settings.cluster_token.as_deref(),
        };

        let outcome = VaultBootstrapper::new(ctx.tools.fs.clone(), ctx.tools.cipher.clone())
            .ensure_ready(&vault, &ctx.env.secret_key, &source)?;

        match outcome {
            VaultOutcome::Unchanged => ctx.step("vault ready"),
            VaultOutcome::Created { .. } => {
                ctx.step(format!("vault initialized in {}", ctx.env.namespace.vault_dir().display()))
            }
            VaultOutcome::Rotated { rotations } => ctx.warn(format!(
                "vault password did not open the payload; rotated (rotation #{})",
                rotations
            )),
        }
        ctx.state.vault = Some(outcome);
        Ok(PhaseStatus::Done)
    }

    fn verify(&self, ctx: &PipelineContext<'_>) -> ShipwrightResult<()> {
        let vault = SecretVault::in_namespace(&ctx.env.namespace);
        for path in [&vault.password_file, &vault.payload_file] {
            if !ctx.tools.fs.exists(path) {
                return Err(crate::error::ShipwrightError::ConfigurationMissing {
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Runs every playbook in order against the environment's nodes.
pub struct Configure;

impl Phase for Configure {
    fn name(&self) -> &'static str {
        "configure"
    }

    fn skip_reason(&self, ctx: &PipelineContext<'_>) -> Option<String> {
        if ctx.settings.skip.configure {
            Some("configuration disabled".to_string())
        } else if ctx.env.playbooks.is_empty() {
            Some("no playbooks configured".to_string())
        } else {
            None
        }
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let access = ctx.ssh_access()?;
        let primary = ctx.primary()?.to_string();

        if ctx.state.primary_private.is_none() {
            match ctx
                .tools
                .remote
                .capture(&access, &primary, "hostname -I | awk '{print $1}'")
            {
                Ok(out) if !out.trim().is_empty() => {
                    ctx.state.primary_private = Some(out.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "could not read primary private address"),
            }
        }

        let mut extra_vars = Vec::new();
        if let Some(nlb) = ctx.state.outputs.as_ref().and_then(|o| o.load_balancer()) {
            extra_vars.push(("nlb_dns".to_string(), nlb));
        }
        if let Some(ip) = &ctx.state.primary_private {
            extra_vars.push(("master_ip".to_string(), ip.clone()));
        }

        let config_file = ctx
            .state
            .ansible_config
            .clone()
            .unwrap_or_else(|| ctx.env.ansible_dir.join("ansible.cfg"));
        let vault = SecretVault::in_namespace(&ctx.env.namespace);

        for playbook in &ctx.env.playbooks {
            ctx.step(format!("ansible-playbook {}", playbook));
            let run = PlaybookRun {
                playbook,
                access: &access,
                config_file: &config_file,
                vault_password_file: &vault.password_file,
                vault_payload_file: &vault.payload_file,
                extra_vars: extra_vars.clone(),
            };
            ctx.tools.configurator.run_playbook(ctx.env, &run)?;
        }
        Ok(PhaseStatus::Done)
    }
}
