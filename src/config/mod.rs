//! Configuration module for Shipwright
//!
//! Implements the configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (SHIPWRIGHT_*)
//! 3. Project config (`shipwright.toml`)
//! 4. Built-in defaults (lowest priority)
//!
//! Configuration is loaded once per run and resolved into immutable
//! `Environment` values; nothing downstream reads it again.

mod env_validator;
mod loader;
mod resolve;
mod types;

pub use env_validator::{closest, levenshtein, EnvVarValidator};
pub use loader::{
    cluster_token_override, load_or_default, load_with_warnings, parse_flag, parse_with_warnings,
    with_env_overrides, ConfigWarning, ENV_CLUSTER_TOKEN, ENV_DEFAULT_ENVIRONMENT,
    ENV_SKIP_ADDONS, ENV_SKIP_CONFIGURE, ENV_SKIP_HOSTS, ENV_SKIP_PROVISION, ENV_STATE_DIR,
};
pub use resolve::{EnvironmentGroup, Selection, AGGREGATE_TARGET};
pub use types::{
    AddonConfig, Config, EnvironmentConfig, SkipConfig, TimeoutsConfig, TopologyKind,
    TlsSecretConfig, UiForwardConfig, CERT_MANAGER_CRDS_URL, DEFAULT_ENVIRONMENT,
};
