//! `testnode config`: print the effective configuration.

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::output::json;

/// Print the loaded configuration as YAML, or as JSON with `--json`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn run(app: &AppContext) -> Result<()> {
    if app.is_json() {
        let value = serde_json::json!({
            "path": app.config_path,
            "config": app.config,
        });
        println!("{}", json::format_value(&value)?);
        return Ok(());
    }

    let yaml = serde_yaml::to_string(&app.config).context("YAML serialization failed")?;
    app.output
        .kv("# source:", &app.config_path.display().to_string());
    print!("{yaml}");
    Ok(())
}
