//! Presentation Layer
//!
//! This layer handles:
//! - CLI argument parsing (via clap)
//! - Wiring the pipeline with infrastructure dependencies
//! - Output formatting (console progress, text/JSON summary)
//!
//! ## Structure
//!
//! - `cli` - Command-line interface
//! - `factory` - Builds the `Toolbox` (dependency injection)
//! - `output` - Console event sink and summary rendering

pub mod cli;
pub mod factory;
pub mod output;

pub use cli::{Cli, ColorWhen, DEFAULT_CONFIG_FILE};
pub use factory::{create_registrar, create_toolbox};
pub use output::{render_summary, ConsoleEventSink, OutputFormat, OutputStyle};
