use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fill::{FillMode, SubstitutionStrategy, DEFAULT_PRIMARY_FONT};
use crate::layout::TemplateLayout;
use crate::pricing::PriceModel;

pub const DEFAULT_CONFIG_FILE: &str = "deckfill.toml";
pub const NESTED_CONFIG_FILE: &str = "config/deckfill.toml";

/// Upper bound for a configured unit price, in rubles.
pub const MAX_UNIT_PRICE: u64 = 1_000_000_000_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub templates: TemplatesConfig,
    pub output: OutputConfig,
    pub pricing: PriceModel,
    pub filler: FillerConfig,
    pub layout: LayoutConfig,
    pub pdf: PdfConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TemplatesConfig {
    pub dir: PathBuf,
    pub short_file: String,
    pub long_file: String,
}

#[derive(Clone, Debug)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub filename_prefix: String,
}

#[derive(Clone, Debug)]
pub struct FillerConfig {
    pub mode: FillMode,
    pub strategy: SubstitutionStrategy,
    pub normalize_fonts: bool,
    pub primary_font: String,
}

/// Overrides for the built-in template layout. Row keywords stay built in.
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    pub pricing_table_ordinal: usize,
    pub quantity_column: usize,
    pub price_column: usize,
    pub unit_label: String,
    pub summary_marker: String,
    pub company_placeholder: String,
}

#[derive(Clone, Debug)]
pub struct PdfConfig {
    pub enabled: bool,
    pub binary: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CleanupConfig {
    /// Age after which generated files are deleted.
    pub retention_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub templates_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub fill_mode: Option<FillMode>,
    pub strategy: Option<SubstitutionStrategy>,
    pub pdf_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let layout = TemplateLayout::kedo();
        Self {
            templates: TemplatesConfig {
                dir: PathBuf::from("templates"),
                short_file: "kedo_short.pptx".to_string(),
                long_file: "kedo_long.pptx".to_string(),
            },
            output: OutputConfig {
                dir: PathBuf::from("output"),
                filename_prefix: "КП".to_string(),
            },
            pricing: PriceModel::default(),
            filler: FillerConfig {
                mode: FillMode::Lenient,
                strategy: SubstitutionStrategy::FirstMatch,
                normalize_fonts: true,
                primary_font: DEFAULT_PRIMARY_FONT.to_string(),
            },
            layout: LayoutConfig {
                pricing_table_ordinal: layout.pricing_table_ordinal,
                quantity_column: layout.quantity_column,
                price_column: layout.price_column,
                unit_label: layout.unit_label,
                summary_marker: layout.summary_marker,
                company_placeholder: layout.company_placeholder,
            },
            pdf: PdfConfig { enabled: false, binary: "libreoffice".to_string(), timeout_secs: 60 },
            cleanup: CleanupConfig { retention_secs: 3600 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LayoutConfig {
    /// Copies the configured positions and labels onto `layout`.
    pub fn apply_to(&self, layout: TemplateLayout) -> TemplateLayout {
        TemplateLayout {
            pricing_table_ordinal: self.pricing_table_ordinal,
            quantity_column: self.quantity_column,
            price_column: self.price_column,
            unit_label: self.unit_label.clone(),
            summary_marker: self.summary_marker.clone(),
            company_placeholder: self.company_placeholder.clone(),
            ..layout
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for FillMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::Validation(format!(
                "unsupported fill mode `{other}` (expected lenient|strict)"
            ))),
        }
    }
}

impl std::str::FromStr for SubstitutionStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_match" => Ok(Self::FirstMatch),
            "global" => Ok(Self::Global),
            other => Err(ConfigError::Validation(format!(
                "unsupported substitution strategy `{other}` (expected first_match|global)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(templates) = patch.templates {
            if let Some(dir) = templates.dir {
                self.templates.dir = dir;
            }
            if let Some(short_file) = templates.short_file {
                self.templates.short_file = short_file;
            }
            if let Some(long_file) = templates.long_file {
                self.templates.long_file = long_file;
            }
        }

        if let Some(output) = patch.output {
            if let Some(dir) = output.dir {
                self.output.dir = dir;
            }
            if let Some(filename_prefix) = output.filename_prefix {
                self.output.filename_prefix = filename_prefix;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(base) = pricing.base {
                self.pricing.base = base;
            }
            if let Some(hr) = pricing.hr {
                self.pricing.hr = hr;
            }
            if let Some(employee) = pricing.employee {
                self.pricing.employee = employee;
            }
            if let Some(on_premise) = pricing.on_premise {
                self.pricing.on_premise = on_premise;
            }
        }

        if let Some(filler) = patch.filler {
            if let Some(mode) = filler.mode {
                self.filler.mode = mode;
            }
            if let Some(strategy) = filler.strategy {
                self.filler.strategy = strategy;
            }
            if let Some(normalize_fonts) = filler.normalize_fonts {
                self.filler.normalize_fonts = normalize_fonts;
            }
            if let Some(primary_font) = filler.primary_font {
                self.filler.primary_font = primary_font;
            }
        }

        if let Some(layout) = patch.layout {
            if let Some(ordinal) = layout.pricing_table_ordinal {
                self.layout.pricing_table_ordinal = ordinal;
            }
            if let Some(quantity_column) = layout.quantity_column {
                self.layout.quantity_column = quantity_column;
            }
            if let Some(price_column) = layout.price_column {
                self.layout.price_column = price_column;
            }
            if let Some(unit_label) = layout.unit_label {
                self.layout.unit_label = unit_label;
            }
            if let Some(summary_marker) = layout.summary_marker {
                self.layout.summary_marker = summary_marker;
            }
            if let Some(company_placeholder) = layout.company_placeholder {
                self.layout.company_placeholder = company_placeholder;
            }
        }

        if let Some(pdf) = patch.pdf {
            if let Some(enabled) = pdf.enabled {
                self.pdf.enabled = enabled;
            }
            if let Some(binary) = pdf.binary {
                self.pdf.binary = binary;
            }
            if let Some(timeout_secs) = pdf.timeout_secs {
                self.pdf.timeout_secs = timeout_secs;
            }
        }

        if let Some(cleanup) = patch.cleanup {
            if let Some(retention_secs) = cleanup.retention_secs {
                self.cleanup.retention_secs = retention_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DECKFILL_TEMPLATES_DIR") {
            self.templates.dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("DECKFILL_TEMPLATES_SHORT_FILE") {
            self.templates.short_file = value;
        }
        if let Some(value) = read_env("DECKFILL_TEMPLATES_LONG_FILE") {
            self.templates.long_file = value;
        }

        if let Some(value) = read_env("DECKFILL_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("DECKFILL_OUTPUT_FILENAME_PREFIX") {
            self.output.filename_prefix = value;
        }

        if let Some(value) = read_env("DECKFILL_PRICING_BASE") {
            self.pricing.base = parse_decimal("DECKFILL_PRICING_BASE", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_PRICING_HR") {
            self.pricing.hr = parse_decimal("DECKFILL_PRICING_HR", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_PRICING_EMPLOYEE") {
            self.pricing.employee = parse_decimal("DECKFILL_PRICING_EMPLOYEE", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_PRICING_ON_PREMISE") {
            self.pricing.on_premise = parse_decimal("DECKFILL_PRICING_ON_PREMISE", &value)?;
        }

        if let Some(value) = read_env("DECKFILL_FILLER_MODE") {
            self.filler.mode = value.parse()?;
        }
        if let Some(value) = read_env("DECKFILL_FILLER_STRATEGY") {
            self.filler.strategy = value.parse()?;
        }
        if let Some(value) = read_env("DECKFILL_FILLER_NORMALIZE_FONTS") {
            self.filler.normalize_fonts = parse_bool("DECKFILL_FILLER_NORMALIZE_FONTS", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_FILLER_PRIMARY_FONT") {
            self.filler.primary_font = value;
        }

        if let Some(value) = read_env("DECKFILL_LAYOUT_PRICING_TABLE_ORDINAL") {
            self.layout.pricing_table_ordinal =
                parse_usize("DECKFILL_LAYOUT_PRICING_TABLE_ORDINAL", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_LAYOUT_QUANTITY_COLUMN") {
            self.layout.quantity_column = parse_usize("DECKFILL_LAYOUT_QUANTITY_COLUMN", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_LAYOUT_PRICE_COLUMN") {
            self.layout.price_column = parse_usize("DECKFILL_LAYOUT_PRICE_COLUMN", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_LAYOUT_UNIT_LABEL") {
            self.layout.unit_label = value;
        }
        if let Some(value) = read_env("DECKFILL_LAYOUT_SUMMARY_MARKER") {
            self.layout.summary_marker = value;
        }
        if let Some(value) = read_env("DECKFILL_LAYOUT_COMPANY_PLACEHOLDER") {
            self.layout.company_placeholder = value;
        }

        if let Some(value) = read_env("DECKFILL_PDF_ENABLED") {
            self.pdf.enabled = parse_bool("DECKFILL_PDF_ENABLED", &value)?;
        }
        if let Some(value) = read_env("DECKFILL_PDF_BINARY") {
            self.pdf.binary = value;
        }
        if let Some(value) = read_env("DECKFILL_PDF_TIMEOUT_SECS") {
            self.pdf.timeout_secs = parse_u64("DECKFILL_PDF_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DECKFILL_CLEANUP_RETENTION_SECS") {
            self.cleanup.retention_secs = parse_u64("DECKFILL_CLEANUP_RETENTION_SECS", &value)?;
        }

        let log_level =
            read_env("DECKFILL_LOGGING_LEVEL").or_else(|| read_env("DECKFILL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DECKFILL_LOGGING_FORMAT").or_else(|| read_env("DECKFILL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(templates_dir) = overrides.templates_dir {
            self.templates.dir = templates_dir;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output.dir = output_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(fill_mode) = overrides.fill_mode {
            self.filler.mode = fill_mode;
        }
        if let Some(strategy) = overrides.strategy {
            self.filler.strategy = strategy;
        }
        if let Some(pdf_enabled) = overrides.pdf_enabled {
            self.pdf.enabled = pdf_enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_templates(&self.templates)?;
        validate_output(&self.output)?;
        validate_pricing(&self.pricing)?;
        validate_filler(&self.filler)?;
        validate_layout(&self.layout)?;
        validate_pdf(&self.pdf)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `AppConfig::load` would read for `explicit_path`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_templates(templates: &TemplatesConfig) -> Result<(), ConfigError> {
    for (key, file) in
        [("templates.short_file", &templates.short_file), ("templates.long_file", &templates.long_file)]
    {
        if file.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
        if !file.to_ascii_lowercase().ends_with(".pptx") {
            return Err(ConfigError::Validation(format!(
                "{key} must name a .pptx file (got `{file}`)"
            )));
        }
    }
    Ok(())
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("output.dir must not be empty".to_string()));
    }
    if output.filename_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(
            "output.filename_prefix must not contain path separators".to_string(),
        ));
    }
    Ok(())
}

fn validate_pricing(pricing: &PriceModel) -> Result<(), ConfigError> {
    let prices = [
        ("pricing.base", pricing.base),
        ("pricing.hr", pricing.hr),
        ("pricing.employee", pricing.employee),
        ("pricing.on_premise", pricing.on_premise),
    ];
    for (key, price) in prices {
        if price.is_sign_negative() {
            return Err(ConfigError::Validation(format!("{key} must not be negative")));
        }
        if !price.fract().is_zero() {
            return Err(ConfigError::Validation(format!(
                "{key} must be a whole number of rubles (got {price})"
            )));
        }
        if price > Decimal::from(MAX_UNIT_PRICE) {
            return Err(ConfigError::Validation(format!(
                "{key} must not exceed {MAX_UNIT_PRICE} (got {price})"
            )));
        }
    }
    Ok(())
}

fn validate_filler(filler: &FillerConfig) -> Result<(), ConfigError> {
    if filler.normalize_fonts && filler.primary_font.trim().is_empty() {
        return Err(ConfigError::Validation(
            "filler.primary_font is required when filler.normalize_fonts is true".to_string(),
        ));
    }
    Ok(())
}

fn validate_layout(layout: &LayoutConfig) -> Result<(), ConfigError> {
    if layout.pricing_table_ordinal == 0 {
        return Err(ConfigError::Validation(
            "layout.pricing_table_ordinal is 1-based and must be greater than zero".to_string(),
        ));
    }
    if layout.quantity_column == layout.price_column {
        return Err(ConfigError::Validation(
            "layout.quantity_column and layout.price_column must differ".to_string(),
        ));
    }
    if layout.summary_marker.trim().is_empty() {
        return Err(ConfigError::Validation("layout.summary_marker must not be empty".to_string()));
    }
    if layout.company_placeholder.trim().is_empty() {
        return Err(ConfigError::Validation(
            "layout.company_placeholder must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_pdf(pdf: &PdfConfig) -> Result<(), ConfigError> {
    if pdf.timeout_secs == 0 || pdf.timeout_secs > 600 {
        return Err(ConfigError::Validation("pdf.timeout_secs must be in range 1..=600".to_string()));
    }
    if pdf.enabled && pdf.binary.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pdf.binary is required when pdf.enabled is true".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    templates: Option<TemplatesPatch>,
    output: Option<OutputPatch>,
    pricing: Option<PricingPatch>,
    filler: Option<FillerPatch>,
    layout: Option<LayoutPatch>,
    pdf: Option<PdfPatch>,
    cleanup: Option<CleanupPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplatesPatch {
    dir: Option<PathBuf>,
    short_file: Option<String>,
    long_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputPatch {
    dir: Option<PathBuf>,
    filename_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    base: Option<Decimal>,
    hr: Option<Decimal>,
    employee: Option<Decimal>,
    on_premise: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct FillerPatch {
    mode: Option<FillMode>,
    strategy: Option<SubstitutionStrategy>,
    normalize_fonts: Option<bool>,
    primary_font: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutPatch {
    pricing_table_ordinal: Option<usize>,
    quantity_column: Option<usize>,
    price_column: Option<usize>,
    unit_label: Option<String>,
    summary_marker: Option<String>,
    company_placeholder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfPatch {
    enabled: Option<bool>,
    binary: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CleanupPatch {
    retention_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
