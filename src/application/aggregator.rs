//! Multi-environment aggregator
//!
//! Deploys every environment group: the root first, then its dependents in
//! order. Dependents never start unless the root completed and exposed its
//! jump host. After a dependent succeeds it is registered with the root's
//! cluster; registration problems are warnings only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use crate::application::pipeline::{Pipeline, PipelineContext, PipelineReport, RunSettings, Toolbox};
use crate::config::EnvironmentGroup;
use crate::domain::entities::{Environment, JumpHost};
use crate::domain::ports::{
    ClusterControl, FileMode, FileSystem, PipelineEvent, PipelineEventSink,
};
use crate::domain::services::kubeconfig::first_server;
use crate::error::{ShipwrightError, ShipwrightResult};

/// Label carried by every registration secret
pub const REGISTRATION_LABEL: &str = "shipwright.io/cluster-registration";

/// Runs one environment's pipeline.
pub trait EnvironmentRunner {
    fn run(&self, env: &Environment, jump_host: Option<JumpHost>) -> PipelineReport;
}

/// Runner backed by the built-in phase pipeline
pub struct PipelineRunner<'a> {
    pub settings: &'a RunSettings,
    pub tools: &'a Toolbox,
    pub events: &'a dyn PipelineEventSink,
}

impl EnvironmentRunner for PipelineRunner<'_> {
    fn run(&self, env: &Environment, jump_host: Option<JumpHost>) -> PipelineReport {
        let mut ctx = PipelineContext::new(env, self.settings, self.tools, self.events, jump_host);
        Pipeline::for_topology(&env.topology).run(&mut ctx)
    }
}

/// Outcome of an aggregate run.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub reports: Vec<PipelineReport>,
    /// Registration manifests applied to root clusters
    pub registrations: Vec<PathBuf>,
}

impl AggregateReport {
    pub fn exit_code(&self) -> i32 {
        if self.reports.iter().all(PipelineReport::succeeded) {
            0
        } else {
            1
        }
    }

    pub fn report(&self, environment: &str) -> Option<&PipelineReport> {
        self.reports.iter().find(|r| r.environment == environment)
    }
}

/// Writes and applies the secret that registers a dependent cluster with
/// its root.
pub struct ClusterRegistrar {
    fs: Arc<dyn FileSystem>,
    cluster: Arc<dyn ClusterControl>,
    namespace: String,
}

impl ClusterRegistrar {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cluster: Arc<dyn ClusterControl>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            cluster,
            namespace: namespace.into(),
        }
    }

    /// Register `dependent` (using its durable bundle) on the cluster behind
    /// `root_kubeconfig`. Returns the manifest path.
    pub fn register(
        &self,
        root: &Environment,
        root_kubeconfig: &Path,
        dependent: &Environment,
        dependent_bundle: &Path,
    ) -> ShipwrightResult<PathBuf> {
        let bundle = self.fs.read(dependent_bundle)?;
        let server = first_server(&bundle).ok_or_else(|| ShipwrightError::InvalidCredentials {
            message: format!("{} has no cluster server", dependent_bundle.display()),
        })?;

        let manifest = registration_manifest(&dependent.name, &self.namespace, &server, &bundle)?;
        let path = root.namespace.registration_manifest(&dependent.name);
        self.fs
            .write_if_changed(&path, &manifest, FileMode::Private)?;
        self.cluster
            .apply(root_kubeconfig, &path.display().to_string())?;
        tracing::info!(root = %root.name, dependent = %dependent.name, "registered cluster");
        Ok(path)
    }
}

/// Secret describing a dependent cluster to its root
pub fn registration_manifest(
    dependent: &str,
    namespace: &str,
    server: &str,
    kubeconfig: &str,
) -> ShipwrightResult<String> {
    let secret = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": format!("cluster-{}", dependent),
            "namespace": namespace,
            "labels": { REGISTRATION_LABEL: "true" },
        },
        "type": "Opaque",
        "stringData": {
            "name": dependent,
            "server": server,
            "kubeconfig": kubeconfig,
        },
    });
    Ok(serde_yaml_ng::to_string(&secret)?)
}

pub struct Aggregator<'a> {
    runner: &'a dyn EnvironmentRunner,
    registrar: Option<ClusterRegistrar>,
    events: &'a dyn PipelineEventSink,
}

impl<'a> Aggregator<'a> {
    pub fn new(runner: &'a dyn EnvironmentRunner, events: &'a dyn PipelineEventSink) -> Self {
        Self {
            runner,
            registrar: None,
            events,
        }
    }

    pub fn with_registrar(mut self, registrar: ClusterRegistrar) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn run(&self, groups: &[EnvironmentGroup]) -> AggregateReport {
        let mut aggregate = AggregateReport::default();

        for group in groups {
            let root = &group.root;
            let root_report = self.runner.run(root, None);

            let blocked = if !root_report.succeeded() {
                Some(format!("root environment '{}' failed", root.name))
            } else if root_report.jump_host.is_none() {
                Some(format!("root environment '{}' exposes no jump host", root.name))
            } else {
                None
            };

            if let Some(reason) = blocked {
                aggregate.reports.push(root_report);
                for dependent in &group.dependents {
                    tracing::warn!(environment = %dependent.name, %reason, "not started");
                    self.events.on_event(PipelineEvent::EnvironmentSkipped {
                        environment: dependent.name.clone(),
                        reason: reason.clone(),
                    });
                    aggregate
                        .reports
                        .push(PipelineReport::not_started(&dependent.name, reason.clone()));
                }
                continue;
            }

            let mut dependent_reports = Vec::with_capacity(group.dependents.len());
            for dependent in &group.dependents {
                let report = self.runner.run(dependent, root_report.jump_host.clone());
                if report.succeeded() {
                    if let Some(path) = self.register(root, &root_report, dependent, &report) {
                        aggregate.registrations.push(path);
                    }
                }
                dependent_reports.push(report);
            }
            aggregate.reports.push(root_report);
            aggregate.reports.extend(dependent_reports);
        }
        aggregate
    }

    fn register(
        &self,
        root: &Environment,
        root_report: &PipelineReport,
        dependent: &Environment,
        report: &PipelineReport,
    ) -> Option<PathBuf> {
        let registrar = self.registrar.as_ref()?;
        let root_kubeconfig = root_report.bundles.as_ref()?.for_orchestrator();
        let dependent_bundle = &report.bundles.as_ref()?.durable;

        match registrar.register(root, root_kubeconfig, dependent, dependent_bundle) {
            Ok(path) => Some(path),
            Err(e) => {
                let message = format!(
                    "could not register '{}' with '{}': {}",
                    dependent.name, root.name, e
                );
                tracing::warn!("{}", message);
                self.events.on_event(PipelineEvent::Warning { message });
                None
            }
        }
    }
}
