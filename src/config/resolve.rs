//! Resolution of configuration into domain environments
//!
//! Turns the declarative `[environments.*]` / `[addons.*]` tables into
//! immutable `Environment` values with absolute paths and a per-environment
//! artifact namespace.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::pipeline::{RunSettings, SkipFlags, Timeouts, WaitBudget};
use crate::domain::entities::{
    AddonSpec, ArtifactNamespace, Environment, RolloutCheck, TlsSecret, Topology, UiForward,
};
use crate::error::{ShipwrightError, ShipwrightResult};
use crate::infrastructure::fs::expand_home;

use super::env_validator::closest;
use super::types::{AddonConfig, Config, EnvironmentConfig, TopologyKind};

/// Name that selects every configured environment
pub const AGGREGATE_TARGET: &str = "all";

/// A root environment and the jump-mediated environments behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentGroup {
    pub root: Environment,
    pub dependents: Vec<Environment>,
}

/// What a single invocation deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(Environment),
    Aggregate(Vec<EnvironmentGroup>),
}

impl Config {
    /// Names accepted on the command line, including the aggregate value
    pub fn target_names(&self) -> Vec<&str> {
        self.environments
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(AGGREGATE_TARGET))
            .collect()
    }

    /// Reject configurations whose environments would share state
    pub fn validate(&self, file: &Path) -> ShipwrightResult<()> {
        let invalid = |message: String| ShipwrightError::InvalidConfig {
            file: file.to_path_buf(),
            message,
        };

        if self.environments.is_empty() {
            return Err(invalid("no environments defined".to_string()));
        }
        if self.environments.contains_key(AGGREGATE_TARGET) {
            return Err(invalid(format!(
                "'{}' is reserved and cannot name an environment",
                AGGREGATE_TARGET
            )));
        }

        let mut ports: BTreeMap<u16, &str> = BTreeMap::new();
        let mut dirs: BTreeMap<PathBuf, &str> = BTreeMap::new();
        for (name, env) in &self.environments {
            if let Some(other) = ports.insert(env.tunnel_port, name) {
                return Err(invalid(format!(
                    "environments '{}' and '{}' share tunnel port {}",
                    other, name, env.tunnel_port
                )));
            }
            if let Some(other) = dirs.insert(terraform_dir(name, env), name) {
                return Err(invalid(format!(
                    "environments '{}' and '{}' share a terraform directory",
                    other, name
                )));
            }

            match (env.topology, env.jump_root.as_deref()) {
                (TopologyKind::Jump, None) => {
                    return Err(invalid(format!(
                        "environment '{}' uses jump topology but names no jump_root",
                        name
                    )))
                }
                (TopologyKind::Jump, Some(root)) => match self.environments.get(root) {
                    Some(root_env) if root_env.owns_jump_host => {}
                    Some(_) => {
                        return Err(invalid(format!(
                            "jump_root '{}' of environment '{}' does not own a jump host",
                            root, name
                        )))
                    }
                    None => {
                        return Err(invalid(format!(
                            "jump_root '{}' of environment '{}' is not defined",
                            root, name
                        )))
                    }
                },
                (TopologyKind::Direct, Some(_)) => {
                    return Err(invalid(format!(
                        "environment '{}' sets jump_root but uses direct topology",
                        name
                    )))
                }
                (TopologyKind::Direct, None) => {}
            }

            for addon in &env.addons {
                if !self.addons.contains_key(addon) {
                    return Err(invalid(format!(
                        "environment '{}' references unknown addon '{}'",
                        name, addon
                    )));
                }
            }
        }
        Ok(())
    }

    /// Absolute state directory
    pub fn state_root(&self, base_dir: &Path) -> PathBuf {
        absolutize(base_dir, &self.state_dir)
    }

    /// Resolve one environment by name
    pub fn resolve(&self, name: &str, base_dir: &Path) -> ShipwrightResult<Environment> {
        let env = self
            .environments
            .get(name)
            .ok_or_else(|| self.unknown(name))?;

        let state_dir = self.state_root(base_dir);
        let terraform_dir = absolutize(base_dir, &terraform_dir(name, env));
        let ssh_key = match &env.ssh_key {
            Some(key) => absolutize(base_dir, key),
            None => terraform_dir.join("k8s-key.pem"),
        };
        let topology = match (env.topology, &env.jump_root) {
            (TopologyKind::Jump, Some(root)) => Topology::JumpMediated { root: root.clone() },
            _ => Topology::Direct,
        };

        let addons = env
            .addons
            .iter()
            .filter_map(|addon| {
                self.addons
                    .get(addon)
                    .map(|cfg| addon_spec(addon, cfg, base_dir))
            })
            .collect();

        Ok(Environment {
            name: name.to_string(),
            topology,
            owns_jump_host: env.owns_jump_host,
            tunnel_port: env.tunnel_port,
            api_port: env.api_port,
            namespace: ArtifactNamespace::new(&state_dir, name),
            terraform_dir,
            ansible_dir: absolutize(base_dir, &env.ansible_dir),
            playbooks: env.playbooks.clone(),
            inventory: env.inventory.clone(),
            ssh_user: env.ssh_user.clone(),
            ssh_key,
            secret_key: env.secret_key.clone(),
            hostnames: env.hostnames.clone(),
            addons,
            ui_forward: env.ui_forward.as_ref().map(|ui| UiForward {
                namespace: ui.namespace.clone(),
                service: ui.service.clone(),
                local_port: ui.local_port,
                remote_port: ui.remote_port,
            }),
        })
    }

    /// Run-wide settings for the pipeline
    pub fn run_settings(&self, base_dir: &Path, cluster_token: Option<String>) -> RunSettings {
        let t = &self.timeouts;
        let budget = |interval: u64, wait: u64| {
            WaitBudget::new(Duration::from_secs(interval.max(1)), Duration::from_secs(wait))
        };
        RunSettings {
            state_dir: self.state_root(base_dir),
            hosts_file: absolutize(base_dir, &self.hosts_file),
            registration_namespace: self.registration_namespace.clone(),
            skip: SkipFlags {
                provision: self.skip.provision,
                configure: self.skip.configure,
                addons: self.skip.addons,
                hosts: self.skip.hosts,
            },
            cluster_token,
            timeouts: Timeouts {
                query: Duration::from_secs(t.query),
                nodes: budget(t.node_interval, t.node_wait),
                kubeconfig: budget(t.kubeconfig_interval, t.kubeconfig_wait),
                api: budget(t.api_interval, t.api_wait),
                rollout: budget(t.rollout_interval, t.rollout_wait),
                tunnel_grace: Duration::from_secs(t.tunnel_grace),
            },
        }
    }

    /// Resolve a command-line target (`all` or one environment name)
    pub fn select(&self, target: &str, base_dir: &Path) -> ShipwrightResult<Selection> {
        if target != AGGREGATE_TARGET {
            return self.resolve(target, base_dir).map(Selection::Single);
        }

        let mut groups = Vec::new();
        for (name, env) in &self.environments {
            if env.topology == TopologyKind::Jump {
                continue;
            }
            let root = self.resolve(name, base_dir)?;
            let dependents = self
                .environments
                .iter()
                .filter(|(_, dep)| dep.jump_root.as_deref() == Some(name.as_str()))
                .map(|(dep_name, _)| self.resolve(dep_name, base_dir))
                .collect::<ShipwrightResult<Vec<_>>>()?;
            groups.push(EnvironmentGroup { root, dependents });
        }
        Ok(Selection::Aggregate(groups))
    }

    fn unknown(&self, name: &str) -> ShipwrightError {
        ShipwrightError::UnknownEnvironment {
            name: name.to_string(),
            suggestion: closest(name, &self.target_names()).map(str::to_string),
        }
    }
}

fn terraform_dir(name: &str, env: &EnvironmentConfig) -> PathBuf {
    env.terraform_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("terraform").join(name))
}

fn addon_spec(name: &str, cfg: &AddonConfig, base_dir: &Path) -> AddonSpec {
    AddonSpec {
        release: cfg.release.clone().unwrap_or_else(|| name.to_string()),
        chart: cfg.chart.clone(),
        namespace: cfg.namespace.clone(),
        repo_name: cfg.repo_name.clone(),
        repo_url: cfg.repo_url.clone(),
        values: cfg.values.clone(),
        values_files: cfg
            .values_files
            .iter()
            .map(|p| absolutize(base_dir, p))
            .collect(),
        timeout: cfg.timeout.clone(),
        pre_manifests: cfg
            .pre_manifests
            .iter()
            .map(|m| manifest_ref(base_dir, m))
            .collect(),
        post_manifests: cfg
            .post_manifests
            .iter()
            .map(|m| manifest_ref(base_dir, m))
            .collect(),
        service_account: cfg.service_account.clone(),
        rollout: cfg.rollout_selector.as_ref().map(|selector| RolloutCheck {
            namespace: cfg.namespace.clone(),
            selector: selector.clone(),
        }),
        extension_points: cfg.extension_points.clone(),
        tls_secret: cfg.tls_secret.as_ref().map(|tls| TlsSecret {
            name: tls.name.clone(),
            common_name: tls.common_name.clone(),
        }),
        demote_storage_classes: cfg.demote_storage_classes.clone(),
    }
}

/// URLs pass through; local manifest paths become absolute
fn manifest_ref(base_dir: &Path, manifest: &str) -> String {
    if manifest.contains("://") {
        manifest.to_string()
    } else {
        absolutize(base_dir, Path::new(manifest))
            .display()
            .to_string()
    }
}

fn absolutize(base_dir: &Path, path: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
