//! Pipeline report

use std::path::PathBuf;
use std::time::Duration;

use crate::application::credentials::PublishedBundles;
use crate::domain::entities::JumpHost;

/// What happened to one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Skipped(String),
    Degraded(String),
    Failed { error: String, fatal: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRecord {
    pub name: &'static str,
    pub outcome: PhaseOutcome,
    pub elapsed: Duration,
}

/// Outcome of one environment's pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub environment: String,
    pub phases: Vec<PhaseRecord>,
    /// Jump host this environment owns (roots) or used (dependents)
    pub jump_host: Option<JumpHost>,
    pub bundles: Option<PublishedBundles>,
    pub hosts_remediation: Option<PathBuf>,
    pub ui_url: Option<String>,
}

impl PipelineReport {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            ..Self::default()
        }
    }

    /// Report for an environment that was never started
    pub fn not_started(environment: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut report = Self::new(environment);
        report.phases.push(PhaseRecord {
            name: "start",
            outcome: PhaseOutcome::Failed {
                error: reason.into(),
                fatal: true,
            },
            elapsed: Duration::ZERO,
        });
        report
    }

    pub fn fatal_failure(&self) -> Option<&PhaseRecord> {
        self.phases
            .iter()
            .find(|p| matches!(p.outcome, PhaseOutcome::Failed { fatal: true, .. }))
    }

    /// Completed, possibly degraded
    pub fn succeeded(&self) -> bool {
        self.fatal_failure().is_none()
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// Phases that were degraded or failed non-fatally
    pub fn degraded_count(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| {
                matches!(
                    p.outcome,
                    PhaseOutcome::Degraded(_) | PhaseOutcome::Failed { fatal: false, .. }
                )
            })
            .count()
    }

    /// Whether the named phase's action was attempted
    pub fn ran(&self, name: &str) -> bool {
        self.phases
            .iter()
            .any(|p| p.name == name && !matches!(p.outcome, PhaseOutcome::Skipped(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &'static str, outcome: PhaseOutcome) -> PhaseRecord {
        PhaseRecord {
            name,
            outcome,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn degraded_run_still_exits_zero() {
        let mut report = PipelineReport::new("hub");
        report.phases.push(record("provision", PhaseOutcome::Completed));
        report.phases.push(record(
            "patch-hosts",
            PhaseOutcome::Failed {
                error: "x".into(),
                fatal: false,
            },
        ));
        report
            .phases
            .push(record("install-addons", PhaseOutcome::Degraded("slow".into())));

        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.degraded_count(), 2);
    }

    #[test]
    fn fatal_failure_exits_one() {
        let mut report = PipelineReport::new("hub");
        report.phases.push(record(
            "provision",
            PhaseOutcome::Failed {
                error: "boom".into(),
                fatal: true,
            },
        ));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.fatal_failure().unwrap().name, "provision");
    }

    #[test]
    fn not_started_counts_as_failure() {
        let report = PipelineReport::not_started("edge-east", "root failed");
        assert!(!report.succeeded());
        assert!(!report.ran("provision"));
    }
}
