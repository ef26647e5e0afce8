//! Output Rendering
//!
//! Human-readable progress on stderr (`ConsoleEventSink`) and the final
//! summary on stdout, in text or NDJSON form.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::style::{Color, Stylize};

use crate::application::pipeline::{PhaseOutcome, PipelineReport};
use crate::domain::ports::{PipelineEvent, PipelineEventSink};

/// Output format for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// NDJSON for scripting
    Json,
}

/// Terminal styling decisions, made once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStyle {
    pub color: bool,
    pub unicode: bool,
    pub verbose: u8,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            color: false,
            unicode: true,
            verbose: 0,
        }
    }
}

/// Icons for output rendering
struct Icons {
    check: &'static str,
    cross: &'static str,
    warn: &'static str,
    progress: &'static str,
    skip: &'static str,
    arrow: &'static str,
}

impl Icons {
    fn unicode() -> Self {
        Self {
            check: "✓",
            cross: "✗",
            warn: "⚠",
            progress: "●",
            skip: "○",
            arrow: "↳",
        }
    }

    fn ascii() -> Self {
        Self {
            check: "[OK]",
            cross: "[FAIL]",
            warn: "[WARN]",
            progress: "[..]",
            skip: "[ ]",
            arrow: "->",
        }
    }
}

mod colors {
    use super::Color;

    pub const SUCCESS: Color = Color::Green;
    pub const ERROR: Color = Color::Red;
    pub const WARNING: Color = Color::Yellow;
    pub const INFO: Color = Color::Cyan;
    pub const DIM: Color = Color::DarkGrey;
}

impl OutputStyle {
    fn icons(&self) -> Icons {
        if self.unicode {
            Icons::unicode()
        } else {
            Icons::ascii()
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            format!("{}", text.with(color))
        } else {
            text.to_string()
        }
    }
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Event sink that prints one line per event to stderr
pub struct ConsoleEventSink {
    style: OutputStyle,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleEventSink {
    pub fn stderr(style: OutputStyle) -> Self {
        Self::with_writer(style, io::stderr())
    }

    pub fn with_writer<W: Write + Send + 'static>(style: OutputStyle, writer: W) -> Self {
        Self {
            style,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn line(&self, event: PipelineEvent) -> Option<String> {
        let s = &self.style;
        let icons = s.icons();
        let line = match event {
            PipelineEvent::Started {
                environment,
                topology,
                phase_count,
            } => format!(
                "{} Deploying {} ({}, {} phases)",
                s.paint(icons.progress, colors::INFO),
                environment,
                topology,
                phase_count
            ),
            PipelineEvent::PhaseStarted { index, name } => {
                if s.verbose == 0 {
                    return None;
                }
                format!("  {} [{}] {}", s.paint(icons.skip, colors::DIM), index + 1, name)
            }
            PipelineEvent::PhaseCompleted { name, elapsed, .. } => format!(
                "  {} {} {}",
                s.paint(icons.check, colors::SUCCESS),
                name,
                s.paint(&seconds(elapsed), colors::DIM)
            ),
            PipelineEvent::PhaseSkipped { name, reason, .. } => format!(
                "  {} {}",
                s.paint(icons.skip, colors::DIM),
                s.paint(&format!("{} skipped: {}", name, reason), colors::DIM)
            ),
            PipelineEvent::PhaseDegraded { name, reason, .. } => format!(
                "  {} {}: {}",
                s.paint(icons.warn, colors::WARNING),
                name,
                reason
            ),
            PipelineEvent::PhaseFailed {
                name, error, fatal, ..
            } => {
                let (icon, color) = if fatal {
                    (icons.cross, colors::ERROR)
                } else {
                    (icons.warn, colors::WARNING)
                };
                format!("  {} {} failed: {}", s.paint(icon, color), name, error)
            }
            PipelineEvent::Step { message } => {
                format!("    {} {}", s.paint(icons.arrow, colors::DIM), message)
            }
            PipelineEvent::Warning { message } => {
                format!("    {} {}", s.paint(icons.warn, colors::WARNING), message)
            }
            PipelineEvent::Finished {
                environment,
                exit_code,
                degraded_count,
            } => match (exit_code, degraded_count) {
                (0, 0) => format!(
                    "{} {} deployed",
                    s.paint(icons.check, colors::SUCCESS),
                    environment
                ),
                (0, n) => format!(
                    "{} {} deployed with {} degraded phase(s)",
                    s.paint(icons.warn, colors::WARNING),
                    environment,
                    n
                ),
                _ => format!("{} {} failed", s.paint(icons.cross, colors::ERROR), environment),
            },
            PipelineEvent::EnvironmentSkipped {
                environment,
                reason,
            } => format!(
                "{} {} not started: {}",
                s.paint(icons.skip, colors::WARNING),
                environment,
                reason
            ),
        };
        Some(line)
    }
}

impl PipelineEventSink for ConsoleEventSink {
    fn on_event(&self, event: PipelineEvent) {
        let Some(line) = self.line(event) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

/// Render the end-of-run summary for one or more environments
pub fn render_summary(
    out: &mut dyn Write,
    format: OutputFormat,
    style: OutputStyle,
    reports: &[PipelineReport],
    registrations: &[PathBuf],
) -> io::Result<()> {
    match format {
        OutputFormat::Text => render_text(out, style, reports, registrations),
        OutputFormat::Json => render_json(out, reports, registrations),
    }
}

fn render_text(
    out: &mut dyn Write,
    style: OutputStyle,
    reports: &[PipelineReport],
    registrations: &[PathBuf],
) -> io::Result<()> {
    let icons = style.icons();
    let failed = reports.iter().any(|r| !r.succeeded());
    let degraded = reports.iter().any(|r| r.degraded_count() > 0);

    writeln!(out)?;
    if failed {
        writeln!(out, "{} Deploy Failed", style.paint(icons.cross, colors::ERROR))?;
    } else if degraded {
        writeln!(
            out,
            "{} Deploy Complete (degraded)",
            style.paint(icons.warn, colors::WARNING)
        )?;
    } else {
        writeln!(out, "{} Deploy Complete", style.paint(icons.check, colors::SUCCESS))?;
    }
    writeln!(out)?;

    let width = reports
        .iter()
        .map(|r| r.environment.len())
        .max()
        .unwrap_or(0);
    for report in reports {
        let status = match report.fatal_failure() {
            Some(record) => {
                let error = match &record.outcome {
                    PhaseOutcome::Failed { error, .. } => error.as_str(),
                    _ => "",
                };
                format!("failed at {}: {}", record.name, error)
            }
            None if report.degraded_count() > 0 => {
                format!("completed, {} degraded", report.degraded_count())
            }
            None => "completed".to_string(),
        };
        writeln!(out, "  {:<width$}  {}", report.environment, status, width = width)?;
    }

    for report in reports.iter().filter(|r| r.succeeded()) {
        let mut lines = Vec::new();
        if let Some(bundles) = &report.bundles {
            lines.push(format!("export KUBECONFIG={}", bundles.durable.display()));
        }
        if let Some(url) = &report.ui_url {
            lines.push(format!("UI: {}", url));
        }
        if let Some(script) = &report.hosts_remediation {
            lines.push(format!(
                "hosts file not updated; run: sudo sh {}",
                script.display()
            ));
        }
        if lines.is_empty() {
            continue;
        }
        writeln!(out)?;
        writeln!(out, "  {}:", report.environment)?;
        for line in lines {
            writeln!(out, "    {}", line)?;
        }
    }

    if !registrations.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Registered ({}):", registrations.len())?;
        for path in registrations {
            writeln!(out, "    {} {}", icons.arrow, path.display())?;
        }
    }
    Ok(())
}

fn render_json(
    out: &mut dyn Write,
    reports: &[PipelineReport],
    registrations: &[PathBuf],
) -> io::Result<()> {
    let environments: Vec<serde_json::Value> = reports
        .iter()
        .map(|r| {
            serde_json::json!({
                "environment": r.environment,
                "success": r.succeeded(),
                "degraded": r.degraded_count(),
                "failed_phase": r.fatal_failure().map(|p| p.name),
                "kubeconfig": r.bundles.as_ref().map(|b| b.durable.display().to_string()),
                "ui_url": r.ui_url,
                "hosts_remediation": r.hosts_remediation.as_ref().map(|p| p.display().to_string()),
            })
        })
        .collect();
    let summary = serde_json::json!({
        "event": "summary",
        "success": reports.iter().all(PipelineReport::succeeded),
        "environments": environments,
        "registrations": registrations.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
    });
    writeln!(out, "{}", summary)
}
