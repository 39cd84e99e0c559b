use std::path::PathBuf;

use deckfill_core::config::LoadOptions;
use deckfill_core::deck::fixtures::proposal_template;
use deckfill_core::{FillerSettings, TemplateVariant};
use serde_json::json;
use tracing::info;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "sample";

/// Writes built-in templates for every variant, laid out the way the filler
/// expects them. Existing files are left alone unless `force` is set.
pub fn run(dir: Option<PathBuf>, force: bool, config_path: Option<PathBuf>) -> CommandResult {
    let options = LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    };
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let mut settings = FillerSettings::from_config(&config);
    if let Some(dir) = dir {
        settings.templates_dir = dir;
    }

    let mut written = Vec::new();
    let mut skipped = Vec::new();
    for variant in TemplateVariant::ALL {
        let path = settings.template_path(variant);
        if path.exists() && !force {
            skipped.push(path);
            continue;
        }

        let template = settings.template(variant);
        if let Err(error) = proposal_template(variant, &template.layout).write(&path) {
            return CommandResult::failure(
                COMMAND,
                "io",
                format!("could not write sample template `{}`: {error}", path.display()),
                7,
            );
        }
        info!(event_name = "cli.sample.written", variant = %variant, path = %path.display(), "sample template written");
        written.push(path);
    }

    let message = format!(
        "{} sample template(s) written to {} ({} already present)",
        written.len(),
        settings.templates_dir.display(),
        skipped.len()
    );
    CommandResult::success_with(COMMAND, message, Some(json!({ "written": written, "skipped": skipped })))
}
