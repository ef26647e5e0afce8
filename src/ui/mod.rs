//! Terminal detection, per-run output decisions and error formatting.

pub mod context;
pub mod error;
pub mod terminal;
