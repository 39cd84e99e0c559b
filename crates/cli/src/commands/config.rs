use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use deckfill_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

/// Prints every effective setting with the layer it came from.
pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let options = LoadOptions {
        config_path: config_path.clone(),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult { exit_code: 2, output: format!("config validation failed: {error}") }
        }
    };

    let file_path = resolve_config_path(config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value) in effective_values(&config) {
        let source = field_source(key, file_doc.as_ref(), file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("templates.dir", config.templates.dir.display().to_string()),
        ("templates.short_file", config.templates.short_file.clone()),
        ("templates.long_file", config.templates.long_file.clone()),
        ("output.dir", config.output.dir.display().to_string()),
        ("output.filename_prefix", config.output.filename_prefix.clone()),
        ("pricing.base", config.pricing.base.to_string()),
        ("pricing.hr", config.pricing.hr.to_string()),
        ("pricing.employee", config.pricing.employee.to_string()),
        ("pricing.on_premise", config.pricing.on_premise.to_string()),
        ("filler.mode", format!("{:?}", config.filler.mode)),
        ("filler.strategy", format!("{:?}", config.filler.strategy)),
        ("filler.normalize_fonts", config.filler.normalize_fonts.to_string()),
        ("filler.primary_font", config.filler.primary_font.clone()),
        ("layout.pricing_table_ordinal", config.layout.pricing_table_ordinal.to_string()),
        ("layout.quantity_column", config.layout.quantity_column.to_string()),
        ("layout.price_column", config.layout.price_column.to_string()),
        ("layout.unit_label", config.layout.unit_label.clone()),
        ("layout.summary_marker", config.layout.summary_marker.clone()),
        ("layout.company_placeholder", config.layout.company_placeholder.clone()),
        ("pdf.enabled", config.pdf.enabled.to_string()),
        ("pdf.binary", config.pdf.binary.clone()),
        ("pdf.timeout_secs", config.pdf.timeout_secs.to_string()),
        ("cleanup.retention_secs", config.cleanup.retention_secs.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
    ]
}

/// `templates.short_file` reads from `DECKFILL_TEMPLATES_SHORT_FILE`.
fn env_key(key_path: &str) -> String {
    format!("DECKFILL_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn alias_env_key(key_path: &str) -> Option<&'static str> {
    match key_path {
        "logging.level" => Some("DECKFILL_LOG_LEVEL"),
        "logging.format" => Some("DECKFILL_LOG_FORMAT"),
        _ => None,
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(key_path: &str, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let primary = env_key(key_path);
    if env::var_os(&primary).is_some() {
        return format!("env ({primary})");
    }
    if let Some(alias) = alias_env_key(key_path) {
        if env::var_os(alias).is_some() {
            return format!("env ({alias})");
        }
    }

    if let Some(doc) = file_doc {
        if contains_path(doc, key_path) {
            let file_path = file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
