//! Error types for Shipwright
//!
//! Uses `thiserror` for library errors; `anyhow` is reserved for the binary edge.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Shipwright operations
pub type ShipwrightResult<T> = Result<T, ShipwrightError>;

/// How a failure is treated by the pipeline.
///
/// Fatal classes abort the pipeline with a non-zero exit. Recoverable classes
/// are handled inside the component that hit them and never reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required input file is absent (recovered with a permissive default)
    ConfigurationMissing,
    /// A readiness probe exhausted its budget
    DependencyUnready,
    /// An external collaborator failed, timed out or could not be spawned
    ExternalCommandFailure,
    /// The vault payload failed to decrypt (recovered by rotation)
    SecretIntegrityFailure,
    /// A protected shared resource could not be written
    PrivilegeDenied,
    /// Invalid input, missing prerequisite or local I/O problem
    Invalid,
}

/// Main error type for Shipwright operations
#[derive(Error, Debug)]
pub enum ShipwrightError {
    /// External command exited non-zero
    #[error("command failed: `{command}` (exit code {code}){}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        code: String,
        stderr: String,
    },

    /// External command exceeded its hard timeout and was killed
    #[error("command timed out after {}s and was killed: `{command}`", .timeout.as_secs())]
    CommandTimedOut { command: String, timeout: Duration },

    /// External command could not be started at all
    #[error("failed to start `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A readiness probe ran out of time
    #[error("{what} not ready after {}s{}", .waited.as_secs(), detail_suffix(.last_error))]
    DependencyUnready {
        what: String,
        waited: Duration,
        last_error: Option<String>,
    },

    /// A hard prerequisite (another environment, key material) is absent
    #[error("environment '{environment}' requires {requirement}; run `{remediation}` first")]
    MissingPrerequisite {
        environment: String,
        requirement: String,
        remediation: String,
    },

    /// A required input file is absent
    #[error("required file not found: {path}")]
    ConfigurationMissing { path: PathBuf },

    /// Write to a protected resource was refused
    #[error("permission denied writing {path}")]
    PrivilegeDenied { path: PathBuf },

    /// Vault payload could not be decrypted with the current password
    #[error("vault payload {payload} cannot be decrypted with {password_file}")]
    SecretIntegrity {
        payload: PathBuf,
        password_file: PathBuf,
    },

    /// Environment name not in the configured set
    #[error("unknown environment '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownEnvironment {
        name: String,
        suggestion: Option<String>,
    },

    /// Configuration file is malformed or inconsistent
    #[error("invalid configuration in {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },

    /// Provisioner output map lacks a required key
    #[error("provisioner output '{key}' is missing or empty")]
    MissingOutput { key: String },

    /// Credential bundle could not be rewritten
    #[error("invalid credential bundle: {message}")]
    InvalidCredentials { message: String },

    /// Tunnel process exited during establishment
    #[error("tunnel on 127.0.0.1:{port} is dead: {message}")]
    TunnelDead { port: u16, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ShipwrightError {
    /// Build a `CommandFailed` from a rendered command line and its exit status
    pub fn command_failed(command: impl Into<String>, code: Option<i32>, stderr: &str) -> Self {
        ShipwrightError::CommandFailed {
            command: command.into(),
            code: code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
            stderr: stderr.trim().to_string(),
        }
    }

    /// Map this error onto the pipeline's failure taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            ShipwrightError::CommandFailed { .. }
            | ShipwrightError::CommandTimedOut { .. }
            | ShipwrightError::CommandSpawn { .. }
            | ShipwrightError::TunnelDead { .. } => ErrorClass::ExternalCommandFailure,
            ShipwrightError::DependencyUnready { .. } => ErrorClass::DependencyUnready,
            ShipwrightError::ConfigurationMissing { .. } => ErrorClass::ConfigurationMissing,
            ShipwrightError::PrivilegeDenied { .. } => ErrorClass::PrivilegeDenied,
            ShipwrightError::SecretIntegrity { .. } => ErrorClass::SecretIntegrityFailure,
            ShipwrightError::MissingPrerequisite { .. }
            | ShipwrightError::UnknownEnvironment { .. }
            | ShipwrightError::InvalidConfig { .. }
            | ShipwrightError::MissingOutput { .. }
            | ShipwrightError::InvalidCredentials { .. }
            | ShipwrightError::Io(_)
            | ShipwrightError::Yaml(_)
            | ShipwrightError::Json(_)
            | ShipwrightError::Toml(_) => ErrorClass::Invalid,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", last_line(stderr))
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(" (last error: {})", d))
        .unwrap_or_default()
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(". Did you mean '{}'?", s))
        .unwrap_or_default()
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or(text)
        .trim()
}
