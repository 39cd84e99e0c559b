use std::path::PathBuf;
use std::time::Duration;

use deckfill_core::config::LoadOptions;
use deckfill_render::sweep_expired;
use serde_json::json;

use crate::commands::{load_config, runtime, CommandResult};

const COMMAND: &str = "cleanup";

/// Deletes generated files older than the retention window from the output
/// directory. `retention_secs` overrides the configured window.
pub fn run(retention_secs: Option<u64>, config_path: Option<PathBuf>) -> CommandResult {
    let options = LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    };
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let retention = Duration::from_secs(retention_secs.unwrap_or(config.cleanup.retention_secs));
    match runtime.block_on(sweep_expired(&config.output.dir, retention)) {
        Ok(report) => {
            let message = format!(
                "removed {} expired file(s) from {}, kept {}",
                report.removed.len(),
                config.output.dir.display(),
                report.kept
            );
            CommandResult::success_with(COMMAND, message, Some(json!(report)))
        }
        Err(error) => CommandResult::failure(
            COMMAND,
            error.error_class(),
            format!("cleanup of `{}` failed: {error}", config.output.dir.display()),
            7,
        ),
    }
}
