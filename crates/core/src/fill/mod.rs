//! The template filler: opens a variant's template, runs the fill passes in
//! order and saves the result under a fresh name in the output directory.

pub mod fonts;
pub mod placeholder;
pub mod summary;
pub mod table;

use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::deck::Presentation;
use crate::domain::request::{ProposalRequest, COMPANY_NAME_KEY};
use crate::domain::variant::TemplateVariant;
use crate::errors::{FillError, PlaceholderKind};
use crate::layout::TemplateLayout;
use crate::money::format_money;
use crate::naming::output_file_name;
use crate::pricing::{PriceBreakdown, PriceModel};

pub use table::MalformedRow;

pub const DEFAULT_PRIMARY_FONT: &str = "Montserrat";

/// What happens when a template location cannot be found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Log, record a warning and keep going.
    #[default]
    Lenient,
    /// Fail the fill.
    Strict,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionStrategy {
    /// Company placeholder, first slide, first matching shape.
    #[default]
    FirstMatch,
    /// `{{KEY}}` / `{KEY}` everywhere.
    Global,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingPolicy {
    pub normalize_fonts: bool,
    pub primary_font: String,
}

impl Default for FormattingPolicy {
    fn default() -> Self {
        Self { normalize_fonts: true, primary_font: DEFAULT_PRIMARY_FONT.to_string() }
    }
}

impl FormattingPolicy {
    /// Family every written run receives, if normalization is on.
    pub fn font_family(&self) -> Option<&str> {
        self.normalize_fonts.then_some(self.primary_font.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantTemplate {
    pub file_name: String,
    pub layout: TemplateLayout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FillerSettings {
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub filename_prefix: String,
    pub short: VariantTemplate,
    pub long: VariantTemplate,
    pub prices: PriceModel,
    pub formatting: FormattingPolicy,
    pub strategy: SubstitutionStrategy,
    pub mode: FillMode,
}

impl Default for FillerSettings {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            output_dir: PathBuf::from("output"),
            filename_prefix: "КП".to_string(),
            short: VariantTemplate {
                file_name: "kedo_short.pptx".to_string(),
                layout: TemplateLayout::for_variant(TemplateVariant::Short),
            },
            long: VariantTemplate {
                file_name: "kedo_long.pptx".to_string(),
                layout: TemplateLayout::for_variant(TemplateVariant::Long),
            },
            prices: PriceModel::default(),
            formatting: FormattingPolicy::default(),
            strategy: SubstitutionStrategy::default(),
            mode: FillMode::default(),
        }
    }
}

impl FillerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let layout = |variant| config.layout.apply_to(TemplateLayout::for_variant(variant));
        Self {
            templates_dir: config.templates.dir.clone(),
            output_dir: config.output.dir.clone(),
            filename_prefix: config.output.filename_prefix.clone(),
            short: VariantTemplate {
                file_name: config.templates.short_file.clone(),
                layout: layout(TemplateVariant::Short),
            },
            long: VariantTemplate {
                file_name: config.templates.long_file.clone(),
                layout: layout(TemplateVariant::Long),
            },
            prices: config.pricing.clone(),
            formatting: FormattingPolicy {
                normalize_fonts: config.filler.normalize_fonts,
                primary_font: config.filler.primary_font.clone(),
            },
            strategy: config.filler.strategy,
            mode: config.filler.mode,
        }
    }

    pub fn template(&self, variant: TemplateVariant) -> &VariantTemplate {
        match variant {
            TemplateVariant::Short => &self.short,
            TemplateVariant::Long => &self.long,
        }
    }

    pub fn template_path(&self, variant: TemplateVariant) -> PathBuf {
        self.templates_dir.join(&self.template(variant).file_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillWarning {
    PlaceholderNotMatched { placeholder: PlaceholderKind },
    MalformedRow(MalformedRow),
}

/// What a fill did, for logs and the CLI's JSON outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub variant: TemplateVariant,
    pub breakdown: PriceBreakdown,
    /// Total written to the table and the summary; zero when the pricing
    /// table was not filled.
    pub grand_total: Decimal,
    pub formatted_total: String,
    pub runs_normalized: usize,
    pub company_substituted: bool,
    pub placeholders_replaced: usize,
    pub table_filled: bool,
    pub rows_written: usize,
    pub summary_updated: bool,
    pub warnings: Vec<FillWarning>,
}

impl FillReport {
    fn new(variant: TemplateVariant, breakdown: PriceBreakdown) -> Self {
        Self {
            variant,
            breakdown,
            grand_total: Decimal::ZERO,
            formatted_total: format_money(Decimal::ZERO),
            runs_normalized: 0,
            company_substituted: false,
            placeholders_replaced: 0,
            table_filled: false,
            rows_written: 0,
            summary_updated: false,
            warnings: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FillOutcome {
    pub output_path: PathBuf,
    pub report: FillReport,
}

/// Holds only configuration; each fill works on its own in-memory copy of the
/// template, so one filler can serve concurrent requests.
#[derive(Clone, Debug)]
pub struct TemplateFiller {
    settings: FillerSettings,
}

impl TemplateFiller {
    pub fn new(settings: FillerSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(FillerSettings::from_config(config))
    }

    pub fn settings(&self) -> &FillerSettings {
        &self.settings
    }

    pub fn fill(
        &self,
        variant: TemplateVariant,
        request: &ProposalRequest,
    ) -> Result<FillOutcome, FillError> {
        self.fill_at(variant, request, Local::now().naive_local())
    }

    /// Same as [`TemplateFiller::fill`] with an explicit clock reading, which
    /// names the output file and dates `CURRENT_DATE`.
    pub fn fill_at(
        &self,
        variant: TemplateVariant,
        request: &ProposalRequest,
        now: NaiveDateTime,
    ) -> Result<FillOutcome, FillError> {
        request.validate()?;

        let path = self.settings.template_path(variant);
        if !path.is_file() {
            warn!(
                event_name = "fill.template.missing",
                variant = %variant,
                path = %path.display(),
                "template file not found"
            );
            return Err(FillError::TemplateNotFound { variant, path });
        }

        info!(
            event_name = "fill.started",
            variant = %variant,
            company = %request.company_name,
            template = %path.display(),
            "filling proposal template"
        );

        let mut presentation = Presentation::open(&path)?;
        let report = self.fill_presentation(&mut presentation, variant, request, now.date())?;

        let file_name =
            output_file_name(&self.settings.filename_prefix, &request.company_name, now);
        let output_path = self.settings.output_dir.join(file_name);
        presentation.save(&output_path)?;

        info!(
            event_name = "fill.completed",
            variant = %variant,
            company = %request.company_name,
            output = %output_path.display(),
            grand_total = %report.formatted_total,
            warnings = report.warnings.len(),
            "proposal written"
        );
        Ok(FillOutcome { output_path, report })
    }

    /// Runs the four passes on an already opened presentation.
    pub fn fill_presentation(
        &self,
        presentation: &mut Presentation,
        variant: TemplateVariant,
        request: &ProposalRequest,
        today: NaiveDate,
    ) -> Result<FillReport, FillError> {
        let layout = &self.settings.template(variant).layout;
        let family = self.settings.formatting.font_family();
        let breakdown = self.settings.prices.breakdown(request)?;
        let mut report = FillReport::new(variant, breakdown.clone());

        if let Some(family) = family {
            report.runs_normalized = fonts::normalize_fonts(presentation, family);
        }

        match self.settings.strategy {
            SubstitutionStrategy::FirstMatch => {
                report.company_substituted = placeholder::replace_company_name(
                    presentation,
                    &layout.company_placeholder,
                    &request.company_name,
                    family,
                );
                if !report.company_substituted {
                    self.note_mismatch(&mut report, PlaceholderKind::CompanyName)?;
                }
            }
            SubstitutionStrategy::Global => {
                let values = request.placeholders(today);
                let replaced = placeholder::replace_placeholders(presentation, &values, family);
                report.placeholders_replaced = replaced.total();
                report.company_substituted = replaced.count(COMPANY_NAME_KEY) > 0;
                if report.placeholders_replaced == 0 {
                    self.note_mismatch(&mut report, PlaceholderKind::GlobalPlaceholders)?;
                }
            }
        }

        let table = table::fill_pricing_table(presentation, layout, &breakdown, family);
        report.table_filled = table.filled();
        report.rows_written = table.rows_written;
        report.warnings.extend(table.malformed.into_iter().map(FillWarning::MalformedRow));
        if report.table_filled {
            report.grand_total = breakdown.grand_total;
            report.formatted_total = format_money(breakdown.grand_total);
        } else {
            self.note_mismatch(&mut report, PlaceholderKind::PricingTable)?;
        }

        report.summary_updated = summary::update_price_summary(
            presentation,
            &layout.summary_marker,
            &report.formatted_total,
            family,
        );
        if !report.summary_updated {
            self.note_mismatch(&mut report, PlaceholderKind::PriceSummary)?;
        }

        Ok(report)
    }

    fn note_mismatch(
        &self,
        report: &mut FillReport,
        placeholder: PlaceholderKind,
    ) -> Result<(), FillError> {
        if self.settings.mode == FillMode::Strict {
            return Err(FillError::PlaceholderNotMatched(placeholder));
        }

        warn!(
            event_name = "fill.placeholder.not_matched",
            variant = %report.variant,
            placeholder = %placeholder,
            "template location not found, continuing"
        );
        report.warnings.push(FillWarning::PlaceholderNotMatched { placeholder });
        Ok(())
    }
}
