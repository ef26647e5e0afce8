//! Phase abstraction

use crate::error::ShipwrightResult;

use super::context::PipelineContext;

/// Result of a phase that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseStatus {
    Done,
    /// Finished, but a soft check did not pass
    Degraded(String),
}

/// One named, ordered step of the pipeline.
///
/// A fatal phase that returns `Err` stops the pipeline. A non-fatal one is
/// recorded as failed and the pipeline continues.
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    fn fatal(&self) -> bool {
        true
    }

    /// Precondition: `Some(reason)` skips the phase
    fn skip_reason(&self, _ctx: &PipelineContext<'_>) -> Option<String> {
        None
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> ShipwrightResult<PhaseStatus>;

    /// Postcondition, checked after a successful `run`
    fn verify(&self, _ctx: &PipelineContext<'_>) -> ShipwrightResult<()> {
        Ok(())
    }
}
