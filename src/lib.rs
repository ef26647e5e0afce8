//! Shipwright - idempotent cluster deployment orchestrator
//!
//! Shipwright drives a fixed sequence of phases (provision, configure,
//! credentials, add-ons, local access) for one environment, or for a root
//! environment and the jump-mediated environments behind it. Every phase is
//! safe to re-run; artifacts live in a per-environment namespace.
//!
//! ## Architecture
//!
//! - `domain` - Entities, value objects, pure services and ports
//! - `application` - Pipeline, phases and the components they drive
//! - `infrastructure` - Process, file system and tool adapters
//! - `config` - `shipwright.toml` loading and resolution
//! - `presentation` - CLI, wiring and output

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-exports for convenience
pub use application::{AggregateReport, Aggregator, Pipeline, PipelineReport};
pub use config::{Config, Selection};
pub use error::{ShipwrightError, ShipwrightResult};
