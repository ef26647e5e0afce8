//! Common test utilities for Shipwright CLI tests.
//!
//! This module provides:
//! - `TestEnv`: Isolated working directory, home and state directory
//! - Fixtures: Reusable configuration snippets

pub mod env;
pub mod fixtures;

#[allow(unused_imports)]
pub use env::*;
#[allow(unused_imports)]
pub use fixtures::*;
