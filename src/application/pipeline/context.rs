//! Pipeline context: resolved inputs, collaborators and shared state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::application::credentials::PublishedBundles;
use crate::application::hosts::HostsOutcome;
use crate::application::vault::VaultOutcome;
use crate::domain::entities::{Environment, InfraOutputs, JumpHost, TunnelSession};
use crate::domain::ports::{
    ChartInstaller, Clock, ClusterControl, Configurator, FileSystem, ForwardLauncher,
    NetworkProbe, PipelineEvent, PipelineEventSink, Provisioner, RemoteShell, SshAccess,
    VaultCipher,
};
use crate::domain::services::{ReadinessPoller, ReadinessProbe};
use crate::error::{ShipwrightError, ShipwrightResult};

/// Poll cadence and budget for one kind of wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl WaitBudget {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn probe(&self, what: impl Into<String>) -> ReadinessProbe {
        ReadinessProbe::new(what, self.interval, self.max_wait)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Single probe / quick query limit
    pub query: Duration,
    pub nodes: WaitBudget,
    pub kubeconfig: WaitBudget,
    pub api: WaitBudget,
    pub rollout: WaitBudget,
    pub tunnel_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(30),
            nodes: WaitBudget::new(Duration::from_secs(10), Duration::from_secs(300)),
            kubeconfig: WaitBudget::new(Duration::from_secs(5), Duration::from_secs(120)),
            api: WaitBudget::new(Duration::from_secs(10), Duration::from_secs(300)),
            rollout: WaitBudget::new(Duration::from_secs(10), Duration::from_secs(300)),
            tunnel_grace: Duration::from_secs(3),
        }
    }
}

/// Phase opt-outs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipFlags {
    pub provision: bool,
    pub configure: bool,
    pub addons: bool,
    pub hosts: bool,
}

/// Run-wide settings resolved from configuration and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub state_dir: PathBuf,
    pub hosts_file: PathBuf,
    pub registration_namespace: String,
    pub skip: SkipFlags,
    /// Explicit cluster secret, used when the live node has none
    pub cluster_token: Option<String>,
    pub timeouts: Timeouts,
}

/// Every external collaborator the phases talk to.
#[derive(Clone)]
pub struct Toolbox {
    pub provisioner: Arc<dyn Provisioner>,
    pub configurator: Arc<dyn Configurator>,
    pub charts: Arc<dyn ChartInstaller>,
    pub cluster: Arc<dyn ClusterControl>,
    pub remote: Arc<dyn RemoteShell>,
    pub cipher: Arc<dyn VaultCipher>,
    pub launcher: Arc<dyn ForwardLauncher>,
    pub probe: Arc<dyn NetworkProbe>,
    pub fs: Arc<dyn FileSystem>,
    pub clock: Arc<dyn Clock>,
}

/// Typed values phases hand to later phases.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub jump_host: Option<JumpHost>,
    pub outputs: Option<InfraOutputs>,
    /// Address used to log into the primary node
    pub primary_address: Option<String>,
    /// Cluster-internal address of the primary node
    pub primary_private: Option<String>,
    pub ansible_config: Option<PathBuf>,
    pub vault: Option<VaultOutcome>,
    pub tunnel: Option<TunnelSession>,
    pub bundles: Option<PublishedBundles>,
    pub hosts: Option<HostsOutcome>,
    pub ui_url: Option<String>,
}

pub struct PipelineContext<'a> {
    pub env: &'a Environment,
    pub settings: &'a RunSettings,
    pub tools: &'a Toolbox,
    pub events: &'a dyn PipelineEventSink,
    pub state: PipelineState,
}

impl<'a> PipelineContext<'a> {
    /// `jump_host` is the root's jump host when the caller already knows it
    pub fn new(
        env: &'a Environment,
        settings: &'a RunSettings,
        tools: &'a Toolbox,
        events: &'a dyn PipelineEventSink,
        jump_host: Option<JumpHost>,
    ) -> Self {
        Self {
            env,
            settings,
            tools,
            events,
            state: PipelineState {
                jump_host,
                ..PipelineState::default()
            },
        }
    }

    pub fn poller(&self) -> ReadinessPoller {
        ReadinessPoller::new(self.tools.clock.clone())
    }

    pub fn step(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(environment = %self.env.name, "{}", message);
        if self.events.wants_detailed_events() {
            self.events.on_event(PipelineEvent::Step { message });
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(environment = %self.env.name, "{}", message);
        self.events.on_event(PipelineEvent::Warning { message });
    }

    /// How to reach cluster nodes; jump-mediated access needs the jump host
    pub fn ssh_access(&self) -> ShipwrightResult<SshAccess> {
        let access = SshAccess::direct(self.env.ssh_user.clone(), self.env.ssh_key.clone());
        if !self.env.topology.is_jump_mediated() {
            return Ok(access);
        }
        let jump = self.require_jump_host()?;
        Ok(access.via(&jump.address))
    }

    pub fn require_jump_host(&self) -> ShipwrightResult<&JumpHost> {
        self.state
            .jump_host
            .as_ref()
            .ok_or_else(|| self.missing_root_prerequisite())
    }

    pub fn require_outputs(&self) -> ShipwrightResult<&InfraOutputs> {
        self.state
            .outputs
            .as_ref()
            .ok_or_else(|| ShipwrightError::MissingOutput {
                key: "provisioner outputs".to_string(),
            })
    }

    pub fn primary(&self) -> ShipwrightResult<&str> {
        self.state
            .primary_address
            .as_deref()
            .ok_or_else(|| ShipwrightError::MissingOutput {
                key: "primary node address".to_string(),
            })
    }

    /// Bundle the orchestrator's own kubectl/helm calls use
    pub fn kubeconfig(&self) -> ShipwrightResult<&Path> {
        self.state
            .bundles
            .as_ref()
            .map(|b| b.for_orchestrator().as_path())
            .ok_or_else(|| ShipwrightError::ConfigurationMissing {
                path: self.env.namespace.durable_bundle(),
            })
    }

    pub fn missing_root_prerequisite(&self) -> ShipwrightError {
        let root = self.env.jump_host_ref().unwrap_or("root");
        ShipwrightError::MissingPrerequisite {
            environment: self.env.name.clone(),
            requirement: format!("the jump host address of root environment '{}'", root),
            remediation: format!("shipwright {}", root),
        }
    }
}
