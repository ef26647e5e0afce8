//! Configuration loading
//!
//! Hierarchy, highest priority first:
//! 1. CLI flags (applied by the caller)
//! 2. Environment variables (`SHIPWRIGHT_*`)
//! 3. `shipwright.toml`
//! 4. Built-in defaults

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ShipwrightError, ShipwrightResult};

use super::env_validator::{levenshtein, EnvVarValidator};
use super::types::Config;

pub const ENV_STATE_DIR: &str = "SHIPWRIGHT_STATE_DIR";
pub const ENV_DEFAULT_ENVIRONMENT: &str = "SHIPWRIGHT_ENV";
pub const ENV_CLUSTER_TOKEN: &str = "SHIPWRIGHT_CLUSTER_TOKEN";
pub const ENV_SKIP_PROVISION: &str = "SHIPWRIGHT_SKIP_PROVISION";
pub const ENV_SKIP_CONFIGURE: &str = "SHIPWRIGHT_SKIP_CONFIGURE";
pub const ENV_SKIP_ADDONS: &str = "SHIPWRIGHT_SKIP_ADDONS";
pub const ENV_SKIP_HOSTS: &str = "SHIPWRIGHT_SKIP_HOSTS";

const FLAG_VALUES: &[&str] = &["1", "true", "yes", "on", "0", "false", "no", "off"];

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> ShipwrightResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ShipwrightError::ConfigurationMissing {
            path: path.to_path_buf(),
        },
        _ => ShipwrightError::Io(e),
    })?;
    parse_with_warnings(&content, path)
}

/// Parse `content` as if it had been read from `path`
pub fn parse_with_warnings(
    content: &str,
    path: &Path,
) -> ShipwrightResult<(Config, Vec<ConfigWarning>)> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| ShipwrightError::InvalidConfig {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load `path` if it exists, built-in defaults otherwise.
///
/// `explicit` marks a path the user named on the command line; a missing
/// explicit file is an error instead of a silent fallback.
pub fn load_or_default(
    path: &Path,
    explicit: bool,
) -> ShipwrightResult<(Config, Vec<ConfigWarning>)> {
    if !path.exists() && !explicit {
        tracing::debug!(path = %path.display(), "no config file, using built-in defaults");
        return Ok((with_env_overrides(Config::default()), Vec::new()));
    }
    let (config, warnings) = load_with_warnings(path)?;
    Ok((with_env_overrides(config), warnings))
}

/// Apply environment variable overrides (SHIPWRIGHT_* prefix)
pub fn with_env_overrides(mut config: Config) -> Config {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        if !dir.trim().is_empty() {
            config.state_dir = PathBuf::from(dir);
        }
    }

    if let Ok(name) = std::env::var(ENV_DEFAULT_ENVIRONMENT) {
        if !name.trim().is_empty() {
            config.default_environment = name.trim().to_string();
        }
    }

    let flags = [
        (ENV_SKIP_PROVISION, &mut config.skip.provision),
        (ENV_SKIP_CONFIGURE, &mut config.skip.configure),
        (ENV_SKIP_ADDONS, &mut config.skip.addons),
        (ENV_SKIP_HOSTS, &mut config.skip.hosts),
    ];
    for (var, slot) in flags {
        if let Ok(value) = std::env::var(var) {
            *slot = EnvVarValidator::new(var, FLAG_VALUES).parse(&value, parse_flag, *slot);
        }
    }

    config
}

/// Credential override for the vault payload (never read from the file)
pub fn cluster_token_override() -> Option<String> {
    std::env::var(ENV_CLUSTER_TOKEN)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// `1/true/yes/on` → true, `0/false/no/off` → false
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "default_environment",
        "state_dir",
        "hosts_file",
        "registration_namespace",
        "skip",
        "provision",
        "configure",
        "addons",
        "hosts",
        "timeouts",
        "command",
        "query",
        "node_wait",
        "node_interval",
        "kubeconfig_wait",
        "kubeconfig_interval",
        "api_wait",
        "api_interval",
        "rollout_wait",
        "rollout_interval",
        "tunnel_grace",
        "environments",
        "topology",
        "jump_root",
        "owns_jump_host",
        "tunnel_port",
        "api_port",
        "terraform_dir",
        "ansible_dir",
        "inventory",
        "playbooks",
        "ssh_user",
        "ssh_key",
        "secret_key",
        "hostnames",
        "ui_forward",
        "namespace",
        "service",
        "local_port",
        "remote_port",
        "release",
        "chart",
        "repo_name",
        "repo_url",
        "values",
        "values_files",
        "timeout",
        "pre_manifests",
        "post_manifests",
        "service_account",
        "rollout_selector",
        "tls_secret",
        "common_name",
        "demote_storage_classes",
        "extension_points",
    ];

    CANDIDATES
        .iter()
        .map(|candidate| (*candidate, levenshtein(unknown, candidate)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= 2)
        .map(|(candidate, _)| candidate.to_string())
}
