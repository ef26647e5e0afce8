//! Phase Pipeline
//!
//! Runs an ordered, topology-dependent list of phases for one environment.
//! Each phase checks its precondition, runs, then checks its postcondition.
//! Fatal failures stop the run; soft failures are recorded and the run
//! goes on.

pub mod context;
pub mod phase;
pub mod phases;
mod result;

#[cfg(test)]
pub(crate) mod fakes;

pub use context::{
    PipelineContext, PipelineState, RunSettings, SkipFlags, Timeouts, Toolbox, WaitBudget,
};
pub use phase::{Phase, PhaseStatus};
pub use result::{PhaseOutcome, PhaseRecord, PipelineReport};

use crate::application::hosts::HostsOutcome;
use crate::domain::entities::Topology;
use crate::domain::ports::PipelineEvent;

pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl Pipeline {
    pub fn new(phases: Vec<Box<dyn Phase>>) -> Self {
        Self { phases }
    }

    /// The built-in phase list for `topology`
    pub fn for_topology(topology: &Topology) -> Self {
        Self::new(phases::standard(topology))
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    /// Run every phase in order against `ctx`
    pub fn run(&self, ctx: &mut PipelineContext<'_>) -> PipelineReport {
        let env = ctx.env;
        let events = ctx.events;
        let clock = ctx.tools.clock.clone();
        let mut report = PipelineReport::new(&env.name);

        tracing::info!(environment = %env.name, topology = env.topology.as_str(), "pipeline started");
        events.on_event(PipelineEvent::Started {
            environment: env.name.clone(),
            topology: env.topology.as_str().to_string(),
            phase_count: self.phases.len(),
        });

        for (index, phase) in self.phases.iter().enumerate() {
            let name = phase.name();

            if let Some(reason) = phase.skip_reason(ctx) {
                tracing::info!(phase = name, %reason, "phase skipped");
                events.on_event(PipelineEvent::PhaseSkipped {
                    index,
                    name: name.to_string(),
                    reason: reason.clone(),
                });
                report.phases.push(PhaseRecord {
                    name,
                    outcome: PhaseOutcome::Skipped(reason),
                    elapsed: std::time::Duration::ZERO,
                });
                continue;
            }

            events.on_event(PipelineEvent::PhaseStarted {
                index,
                name: name.to_string(),
            });
            let started = clock.now();
            let result = phase
                .run(ctx)
                .and_then(|status| phase.verify(ctx).map(|()| status));
            let elapsed = clock.now().saturating_duration_since(started);

            let outcome = match result {
                Ok(PhaseStatus::Done) => {
                    tracing::info!(phase = name, elapsed_ms = elapsed.as_millis() as u64, "phase completed");
                    events.on_event(PipelineEvent::PhaseCompleted {
                        index,
                        name: name.to_string(),
                        elapsed,
                    });
                    PhaseOutcome::Completed
                }
                Ok(PhaseStatus::Degraded(reason)) => {
                    tracing::warn!(phase = name, %reason, "phase degraded");
                    events.on_event(PipelineEvent::PhaseDegraded {
                        index,
                        name: name.to_string(),
                        reason: reason.clone(),
                    });
                    PhaseOutcome::Degraded(reason)
                }
                Err(error) => {
                    let fatal = phase.fatal();
                    if fatal {
                        tracing::error!(phase = name, class = ?error.class(), %error, "phase failed");
                    } else {
                        tracing::warn!(phase = name, %error, "non-fatal phase failed");
                    }
                    events.on_event(PipelineEvent::PhaseFailed {
                        index,
                        name: name.to_string(),
                        error: error.to_string(),
                        fatal,
                    });
                    PhaseOutcome::Failed {
                        error: error.to_string(),
                        fatal,
                    }
                }
            };

            let stop = matches!(outcome, PhaseOutcome::Failed { fatal: true, .. });
            report.phases.push(PhaseRecord {
                name,
                outcome,
                elapsed,
            });
            if stop {
                break;
            }
        }

        report.jump_host = ctx.state.jump_host.clone();
        report.bundles = ctx.state.bundles.clone();
        report.ui_url = ctx.state.ui_url.clone();
        if let Some(HostsOutcome::RemediationRequired { script }) = &ctx.state.hosts {
            report.hosts_remediation = Some(script.clone());
        }

        events.on_event(PipelineEvent::Finished {
            environment: env.name.clone(),
            exit_code: report.exit_code(),
            degraded_count: report.degraded_count(),
        });
        report
    }
}
