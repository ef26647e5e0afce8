use crossterm::style::Stylize;
use shipwright::ShipwrightError;

use crate::ui::context::UiContext;

/// One-line hint for errors the operator can fix locally
fn fix_hint(err: &ShipwrightError) -> Option<String> {
    match err {
        ShipwrightError::ConfigurationMissing { path } => Some(format!(
            "create {} or drop --config to use the built-in environments",
            path.display()
        )),
        ShipwrightError::UnknownEnvironment { .. } => {
            Some("pass an environment from shipwright.toml, or 'all'".to_string())
        }
        ShipwrightError::InvalidConfig { .. } => {
            Some("fix the configuration file and run again".to_string())
        }
        _ => None,
    }
}

pub fn format_error(err: &anyhow::Error, ui: &UiContext) -> String {
    if ui.json {
        return serde_json::json!({
            "event": "error",
            "message": format!("{:#}", err),
        })
        .to_string();
    }

    let label = if ui.color {
        format!("{}", "error:".red().bold())
    } else {
        "error:".to_string()
    };
    let mut out = format!("{} {:#}", label, err);
    if let Some(hint) = err.downcast_ref::<ShipwrightError>().and_then(fix_hint) {
        out.push_str(&format!("\n  hint: {}", hint));
    }
    out
}
