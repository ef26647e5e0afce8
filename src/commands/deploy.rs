use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use shipwright::application::{Aggregator, EnvironmentRunner, PipelineRunner};
use shipwright::config::{self, Selection};
use shipwright::domain::ports::{PipelineEvent, PipelineEventSink};
use shipwright::infrastructure::JsonEventSink;
use shipwright::presentation::{
    create_registrar, create_toolbox, render_summary, Cli, ConsoleEventSink,
};

use crate::ui::context::UiContext;

/// Deploy the selected environment (or every group for `all`).
///
/// Returns the process exit code: 0 when every environment completed,
/// possibly degraded; 1 otherwise.
pub fn cmd_deploy(cli: &Cli, ui: &UiContext) -> Result<i32> {
    let (config_path, explicit) = cli.config_path();
    let (mut config, warnings) = config::load_or_default(&config_path, explicit)?;
    if let Some(dir) = &cli.state_dir {
        config.state_dir = std::env::current_dir()
            .context("cannot determine working directory")?
            .join(dir);
    }
    config.validate(&config_path)?;

    let events: Box<dyn PipelineEventSink> = if ui.json {
        Box::new(JsonEventSink::stdout())
    } else {
        Box::new(ConsoleEventSink::stderr(ui.style()))
    };
    for warning in &warnings {
        events.on_event(PipelineEvent::Warning {
            message: warning.to_string(),
        });
    }

    let base_dir = base_dir(&config_path)?;
    let target = cli
        .environment
        .clone()
        .unwrap_or_else(|| config.default_environment.clone());
    let selection = config.select(&target, &base_dir)?;
    tracing::info!(target = %target, base_dir = %base_dir.display(), "deploying");

    let settings = config.run_settings(&base_dir, config::cluster_token_override());
    let tools = create_toolbox(&config, ui.stream_tools);
    let runner = PipelineRunner {
        settings: &settings,
        tools: &tools,
        events: events.as_ref(),
    };

    let (reports, registrations, exit_code) = match selection {
        Selection::Single(env) => {
            let report = runner.run(&env, None);
            let code = report.exit_code();
            (vec![report], Vec::new(), code)
        }
        Selection::Aggregate(groups) => {
            let aggregate = Aggregator::new(&runner, events.as_ref())
                .with_registrar(create_registrar(&config, &tools))
                .run(&groups);
            let code = aggregate.exit_code();
            (aggregate.reports, aggregate.registrations, code)
        }
    };

    let mut out = std::io::stdout().lock();
    render_summary(&mut out, ui.format(), ui.style(), &reports, &registrations)
        .context("failed to write summary")?;
    Ok(exit_code)
}

/// Relative paths in the configuration are resolved against the directory
/// holding the configuration file
fn base_dir(config_path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    Ok(match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd,
    })
}
