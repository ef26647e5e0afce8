//! CLI Argument Parsing
//!
//! This module defines the CLI interface using clap.
//!
//! ## Design Notes
//!
//! - One positional target: an environment name or `all`
//! - Global flags (--json, --color, --verbose) control output only

use std::path::PathBuf;

use clap::Parser;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// Shipwright - idempotent cluster deployment across environments
#[derive(Parser, Debug)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "Targets are the environment names in shipwright.toml, or 'all' to deploy every root and its dependents."
)]
pub struct Cli {
    /// Environment to deploy, or 'all' (default: $SHIPWRIGHT_ENV, then the configured default)
    pub environment: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory for per-environment artifacts
    #[arg(long, value_name = "PATH")]
    pub state_dir: Option<PathBuf>,

    /// Emit NDJSON events on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorWhen>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "shipwright.toml";

impl Cli {
    /// Config path plus whether the user named it explicitly
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }
}
