//! In-cluster phases: add-ons, hosts table and the UI forward.

use std::collections::BTreeSet;
use std::path::Path;

use crate::application::hosts::{HostsOutcome, HostsPatcher};
use crate::application::pipeline::context::PipelineContext;
use crate::application::pipeline::phase::{Phase, PhaseStatus};
use crate::application::ui_forward::{UiForwardRequest, UiForwarder};
use crate::domain::entities::AddonSpec;
use crate::domain::value_objects::HostsPatchSet;
use crate::error::ShipwrightResult;

/// Installs every configured add-on in order.
///
/// Per add-on: repository, pre-manifests, extension points, service
/// account, chart, rollout check, TLS secret, storage class demotion,
/// post-manifests. Readiness waits and missing local files degrade the
/// phase instead of failing it.
pub struct InstallAddons;

impl InstallAddons {
    fn install(
        ctx: &PipelineContext<'_>,
        addon: &AddonSpec,
        repos: &mut BTreeSet<String>,
    ) -> ShipwrightResult<Vec<String>> {
        let kubeconfig = ctx.kubeconfig()?;
        let charts = &ctx.tools.charts;
        let cluster = &ctx.tools.cluster;
        let rollout_budget = ctx.settings.timeouts.rollout;
        let poller = ctx.poller();
        let mut degraded = Vec::new();
        let mut soft = |reason: String| {
            ctx.warn(reason.clone());
            degraded.push(reason);
        };

        if repos.insert(addon.repo_name.clone()) {
            charts.add_repo(&addon.repo_name, &addon.repo_url)?;
            if let Err(e) = charts.update_repo(&addon.repo_name) {
                ctx.warn(format!("helm repo update {} failed: {}", addon.repo_name, e));
            }
        }

        for manifest in &addon.pre_manifests {
            if Self::local_file_missing(ctx, manifest) {
                soft(format!("{}: manifest {} not found, skipped", addon.release, manifest));
                continue;
            }
            ctx.step(format!("kubectl apply -f {}", manifest));
            cluster.apply(kubeconfig, manifest)?;
        }

        for crd in &addon.extension_points {
            let what = format!("resource type {}", crd);
            let readiness = poller.poll(&rollout_budget.probe(what.clone()), || {
                cluster.resource_type_ready(kubeconfig, crd)
            });
            if !readiness.is_ready() {
                soft(format!("{} not ready after {}s", what, readiness.waited().as_secs()));
            }
        }

        if let Some(account) = &addon.service_account {
            if !cluster.service_account_exists(kubeconfig, &addon.namespace, account)? {
                ctx.step(format!("service account {}/{}", addon.namespace, account));
                cluster.create_service_account(kubeconfig, &addon.namespace, account)?;
            }
        }

        let mut chart = addon.clone();
        chart.values_files.retain(|file| {
            let present = ctx.tools.fs.exists(file);
            if !present {
                soft(format!(
                    "{}: values file {} not found, installing without it",
                    addon.release,
                    file.display()
                ));
            }
            present
        });
        ctx.step(format!(
            "helm upgrade --install {} {} -n {}",
            addon.release, addon.chart, addon.namespace
        ));
        charts.upgrade_install(kubeconfig, &chart)?;

        if let Some(rollout) = &addon.rollout {
            let what = format!("{} pods ({})", addon.release, rollout.selector);
            let readiness = poller.poll(&rollout_budget.probe(what.clone()), || {
                cluster.selector_ready(kubeconfig, &rollout.namespace, &rollout.selector)
            });
            if !readiness.is_ready() {
                soft(format!("{} not ready after {}s", what, readiness.waited().as_secs()));
            }
        }

        if let Some(tls) = &addon.tls_secret {
            if !cluster.secret_exists(kubeconfig, &addon.namespace, &tls.name)? {
                ctx.step(format!("self-signed TLS secret {}/{}", addon.namespace, tls.name));
                cluster.create_self_signed_tls_secret(
                    kubeconfig,
                    &addon.namespace,
                    &tls.name,
                    &tls.common_name,
                )?;
            }
        }

        for class in &addon.demote_storage_classes {
            match cluster.demote_storage_class(kubeconfig, class) {
                Ok(true) => ctx.step(format!("storage class {} is no longer the default", class)),
                Ok(false) => tracing::debug!(class = %class, "storage class not present"),
                Err(e) => soft(format!("could not demote storage class {}: {}", class, e)),
            }
        }

        for manifest in &addon.post_manifests {
            if Self::local_file_missing(ctx, manifest) {
                soft(format!("{}: manifest {} not found, skipped", addon.release, manifest));
                continue;
            }
            ctx.step(format!("kubectl apply -f {}", manifest));
            cluster.apply(kubeconfig, manifest)?;
        }
        Ok(degraded)
    }

    /// URLs are left to kubectl; local paths must exist
    fn local_file_missing(ctx: &PipelineContext<'_>, manifest: &str) -> bool {
        !manifest.contains("://") && !ctx.tools.fs.exists(Path::new(manifest))
    }
}

impl Phase for InstallAddons {
    fn name(&self) -> &'static str {
        "install-addons"
    }

    fn skip_reason(&self, ctx: &PipelineContext<'_>) -> Option<String> {
        if ctx.settings.skip.addons {
            Some("add-ons disabled".to_string())
        } else if ctx.env.addons.is_empty() {
            Some("no add-ons configured".to_string())
        } else {
            None
        }
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let mut repos = BTreeSet::new();
        let mut degraded = Vec::new();
        for addon in &ctx.env.addons {
            degraded.extend(Self::install(ctx, addon, &mut repos)?);
        }
        if degraded.is_empty() {
            Ok(PhaseStatus::Done)
        } else {
            Ok(PhaseStatus::Degraded(degraded.join("; ")))
        }
    }
}

/// Points the environment's hostnames at its primary node.
pub struct PatchHosts;

impl Phase for PatchHosts {
    fn name(&self) -> &'static str {
        "patch-hosts"
    }

    fn fatal(&self) -> bool {
        false
    }

    fn skip_reason(&self, ctx: &PipelineContext<'_>) -> Option<String> {
        if ctx.settings.skip.hosts {
            Some("hosts patching disabled".to_string())
        } else if ctx.env.hostnames.is_empty() {
            Some("no hostnames configured".to_string())
        } else {
            None
        }
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let address = match ctx.require_outputs()?.control_plane_public() {
            Ok(public) => public,
            Err(_) => ctx.primary()?.to_string(),
        };
        let set = HostsPatchSet::new(ctx.env.hostnames.iter(), address);
        let patcher = HostsPatcher::new(ctx.tools.fs.clone(), ctx.settings.hosts_file.clone());
        let outcome = patcher.upsert(&set, &ctx.env.namespace.hosts_remediation())?;

        let status = match &outcome {
            HostsOutcome::Unchanged => PhaseStatus::Done,
            HostsOutcome::Updated => {
                ctx.step(format!("{} -> {}", patcher.hosts_path().display(), set.entry_line()));
                PhaseStatus::Done
            }
            HostsOutcome::RemediationRequired { script } => {
                let reason = format!(
                    "no permission to update {}; run: sudo sh {}",
                    patcher.hosts_path().display(),
                    script.display()
                );
                ctx.warn(reason.clone());
                PhaseStatus::Degraded(reason)
            }
        };
        ctx.state.hosts = Some(outcome);
        Ok(status)
    }
}

/// Starts the self-restarting UI port-forward.
pub struct StartUiForward;

impl Phase for StartUiForward {
    fn name(&self) -> &'static str {
        "ui-forward"
    }

    fn fatal(&self) -> bool {
        false
    }

    fn skip_reason(&self, ctx: &PipelineContext<'_>) -> Option<String> {
        ctx.env
            .ui_forward
            .is_none()
            .then(|| "no UI forward configured".to_string())
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let Some(forward) = &ctx.env.ui_forward else {
            return Ok(PhaseStatus::Done);
        };
        // The wrapper outlives this run, so it must not use the tunnel bundle.
        let kubeconfig = ctx
            .state
            .bundles
            .as_ref()
            .map(|b| b.durable.clone())
            .unwrap_or_else(|| ctx.env.namespace.durable_bundle());
        let request = UiForwardRequest {
            forward,
            kubeconfig: &kubeconfig,
            script_path: ctx.env.namespace.ui_forward_script(),
            log_path: ctx.env.namespace.ui_forward_log(),
        };

        let forwarder = UiForwarder::new(
            ctx.tools.launcher.clone(),
            ctx.tools.fs.clone(),
            ctx.tools.clock.clone(),
            ctx.settings.timeouts.tunnel_grace,
        );
        let mut handle = forwarder.start(&request)?;

        if handle.is_alive() {
            ctx.step(format!("{} UI at {}", forward.service, request.url()));
            ctx.state.ui_url = Some(request.url());
            Ok(PhaseStatus::Done)
        } else {
            Ok(PhaseStatus::Degraded(format!(
                "UI forward exited; see {}",
                request.log_path.display()
            )))
        }
    }
}
