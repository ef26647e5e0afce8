//! Domain Layer
//!
//! The core of Shipwright: environment model, credential and hosts-table
//! rewriting, readiness polling, and the ports through which every external
//! collaborator is reached.
//!
//! ## Structure
//!
//! - `entities/` - Environment, credential bundles, tunnel sessions, vaults
//! - `value_objects/` - Immutable value types (Endpoint, SecretToken, HostsPatchSet)
//! - `services/` - Pure services (poller, kubeconfig rewriting, hosts table)
//! - `ports/` - Interface definitions for infrastructure
//!
//! ## Design Principles
//!
//! 1. **No direct I/O** - services work on strings and values; ports do the I/O
//! 2. **Injectable time** - every wait goes through the `Clock` port
//! 3. **Ports & Adapters** - all external tools sit behind trait-defined ports

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
