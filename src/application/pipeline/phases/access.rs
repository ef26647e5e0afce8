//! Access phases: tunnel, credentials and control-plane readiness.

use crate::application::credentials::CredentialPublisher;
use crate::application::pipeline::context::PipelineContext;
use crate::application::pipeline::phase::{Phase, PhaseStatus};
use crate::application::tunnel::{TunnelManager, TunnelRequest, TunnelSettings};
use crate::domain::entities::TunnelHealth;
use crate::domain::ports::SshAccess;
use crate::domain::services::kubeconfig::first_server;
use crate::domain::value_objects::Endpoint;
use crate::error::{ShipwrightError, ShipwrightResult};

/// Forwards the control-plane port through the jump host to loopback.
pub struct OpenTunnel;

impl Phase for OpenTunnel {
    fn name(&self) -> &'static str {
        "open-tunnel"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let jump = ctx.require_jump_host()?.address.clone();
        let remote_host = match &ctx.state.primary_private {
            Some(private) => private.clone(),
            None => ctx.primary()?.to_string(),
        };
        let request = TunnelRequest {
            environment: ctx.env.name.clone(),
            local_port: ctx.env.tunnel_port,
            remote_host,
            remote_port: ctx.env.api_port,
            jump_host: jump,
            access: SshAccess::direct(ctx.env.ssh_user.clone(), ctx.env.ssh_key.clone()),
            log_path: ctx.env.namespace.tunnel_log(),
        };

        let manager = TunnelManager::new(
            ctx.tools.launcher.clone(),
            ctx.tools.probe.clone(),
            ctx.tools.clock.clone(),
            ctx.tools.fs.clone(),
            TunnelSettings {
                grace: ctx.settings.timeouts.tunnel_grace,
                probe_timeout: ctx.settings.timeouts.query,
                ..TunnelSettings::default()
            },
        );

        let descriptor = ctx
            .env
            .namespace
            .service_descriptor(&ctx.env.tunnel_service_name());
        if manager.write_service_descriptor(&request, &descriptor)? {
            ctx.step(format!("wrote tunnel service unit {}", descriptor.display()));
        }

        ctx.step(format!(
            "tunnel 127.0.0.1:{} -> {}:{} via {}",
            request.local_port, request.remote_host, request.remote_port, request.jump_host
        ));
        let mut session = manager.open(&request)?;

        let status = match session.health {
            TunnelHealth::Dead => {
                let message = manager.diagnostics(&mut session);
                return Err(ShipwrightError::TunnelDead {
                    port: request.local_port,
                    message,
                });
            }
            TunnelHealth::Healthy => PhaseStatus::Done,
            TunnelHealth::Degraded | TunnelHealth::Unknown => {
                let diagnostics = manager.diagnostics(&mut session);
                ctx.warn(format!(
                    "tunnel on port {} is up but the API did not answer yet",
                    request.local_port
                ));
                PhaseStatus::Degraded(diagnostics)
            }
        };
        ctx.state.tunnel = Some(session);
        Ok(status)
    }

    fn verify(&self, ctx: &PipelineContext<'_>) -> ShipwrightResult<()> {
        match &ctx.state.tunnel {
            Some(session) if session.is_usable() => Ok(()),
            _ => Err(ShipwrightError::TunnelDead {
                port: ctx.env.tunnel_port,
                message: "no tunnel session".to_string(),
            }),
        }
    }
}

/// Copies the control plane's kubeconfig and publishes both bundles.
pub struct FetchCredentials;

impl FetchCredentials {
    fn remote_path(user: &str) -> String {
        if user == "root" {
            "/root/.kube/config".to_string()
        } else {
            format!("/home/{}/.kube/config", user)
        }
    }
}

impl Phase for FetchCredentials {
    fn name(&self) -> &'static str {
        "fetch-credentials"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let access = ctx.ssh_access()?;
        let host = ctx.primary()?.to_string();
        let remote_path = Self::remote_path(&ctx.env.ssh_user);

        let what = format!("{} on {}", remote_path, host);
        let probe = ctx.settings.timeouts.kubeconfig.probe(what.clone());
        let check = format!("test -s {} && echo present", remote_path);
        let remote = ctx.tools.remote.clone();
        ctx.poller()
            .poll(&probe, || {
                remote
                    .capture(&access, &host, &check)
                    .map(|out| out.trim() == "present")
            })
            .into_result(&what)?;

        let raw = ctx.env.namespace.raw_bundle();
        ctx.tools.fs.create_dir_all(ctx.env.namespace.root())?;
        ctx.tools.remote.fetch(&access, &host, &remote_path, &raw)?;

        let outputs = ctx.require_outputs()?;
        let durable_host = match outputs.load_balancer() {
            Some(nlb) => nlb,
            None if ctx.env.topology.is_jump_mediated() => host.clone(),
            None => outputs.control_plane_public()?,
        };
        let durable = Endpoint::with_port(durable_host, ctx.env.api_port);
        let tunnel = ctx
            .env
            .topology
            .is_jump_mediated()
            .then(|| Endpoint::loopback(ctx.env.tunnel_port));

        let published = CredentialPublisher::new(ctx.tools.fs.clone()).publish(
            &ctx.env.namespace,
            &durable,
            tunnel.as_ref(),
        )?;
        ctx.tools.fs.remove(&raw)?;

        ctx.step(format!("kubeconfig {}", published.durable.display()));
        ctx.state.bundles = Some(published);
        Ok(PhaseStatus::Done)
    }

    fn verify(&self, ctx: &PipelineContext<'_>) -> ShipwrightResult<()> {
        let bundles = ctx
            .state
            .bundles
            .as_ref()
            .ok_or_else(|| ShipwrightError::ConfigurationMissing {
                path: ctx.env.namespace.durable_bundle(),
            })?;
        for path in std::iter::once(&bundles.durable).chain(bundles.ephemeral.iter()) {
            if !ctx.tools.fs.exists(path) {
                return Err(ShipwrightError::ConfigurationMissing { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// Waits until the API answers through the orchestrator bundle and lists
/// at least one node.
pub struct WaitControlPlane;

impl Phase for WaitControlPlane {
    fn name(&self) -> &'static str {
        "wait-control-plane"
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus> {
        let kubeconfig = ctx.kubeconfig()?.to_path_buf();
        let text = ctx.tools.fs.read(&kubeconfig)?;
        let server = first_server(&text).ok_or_else(|| ShipwrightError::InvalidCredentials {
            message: format!("{} has no cluster server", kubeconfig.display()),
        })?;

        let timeouts = ctx.settings.timeouts;
        let poller = ctx.poller();

        let url = format!("{}/version", server.trim_end_matches('/'));
        let what = format!("control plane {}", server);
        let net = ctx.tools.probe.clone();
        poller
            .poll(&timeouts.api.probe(what.clone()), || {
                let status = net.http_status(&url, timeouts.query);
                tracing::debug!(url = %url, status = %status.describe(), "api probe");
                Ok(status.is_alive())
            })
            .into_result(&what)?;

        let cluster = ctx.tools.cluster.clone();
        poller
            .poll(&timeouts.nodes.probe("cluster nodes"), || {
                cluster.nodes_listed(&kubeconfig)
            })
            .into_result("cluster nodes")?;

        ctx.step(format!("control plane ready at {}", server));
        Ok(PhaseStatus::Done)
    }
}
