use std::fs;
use std::path::PathBuf;

use clap::Args;
use deckfill_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use deckfill_core::fill::FillMode;
use deckfill_core::{FillError, ProposalRequest, TemplateFiller, TemplateVariant};
use deckfill_render::PdfRenderer;
use serde_json::json;
use tracing::warn;

use crate::commands::{load_config, runtime, CommandResult};

const COMMAND: &str = "fill";

#[derive(Debug, Clone, Default, Args)]
pub struct FillArgs {
    #[arg(long, help = "Template variant: short or long")]
    pub variant: Option<TemplateVariant>,
    #[arg(long, conflicts_with = "company", help = "Read the proposal request from a JSON file")]
    pub request: Option<PathBuf>,
    #[arg(long, help = "Client company name")]
    pub company: Option<String>,
    #[arg(long)]
    pub contact_person: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub employees_count: Option<u32>,
    #[arg(long)]
    pub service_type: Option<String>,
    #[arg(long)]
    pub implementation_period: Option<String>,
    #[arg(long)]
    pub additional_services: Option<String>,
    #[arg(long)]
    pub total_budget: Option<u64>,
    #[arg(long, default_value_t = 0)]
    pub hr_licenses: u32,
    #[arg(long, default_value_t = 0)]
    pub employee_licenses: u32,
    #[arg(long, help = "Include on-premise hosting")]
    pub on_premises: bool,
    #[arg(long, help = "Also render a PDF next to the presentation")]
    pub pdf: bool,
    #[arg(long, help = "Fail when a template location is missing instead of warning")]
    pub strict: bool,
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long, help = "Config file path (defaults to deckfill.toml or config/deckfill.toml)")]
    pub config: Option<PathBuf>,
}

impl FillArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                templates_dir: self.templates_dir.clone(),
                output_dir: self.output_dir.clone(),
                fill_mode: self.strict.then_some(FillMode::Strict),
                pdf_enabled: self.pdf.then_some(true),
                ..ConfigOverrides::default()
            },
        }
    }

    fn proposal_request(&self) -> Result<ProposalRequest, String> {
        if let Some(path) = &self.request {
            let raw = fs::read_to_string(path)
                .map_err(|error| format!("could not read request `{}`: {error}", path.display()))?;
            return serde_json::from_str(&raw)
                .map_err(|error| format!("could not parse request `{}`: {error}", path.display()));
        }

        let company = self
            .company
            .clone()
            .ok_or_else(|| "either --request or --company is required".to_string())?;
        Ok(ProposalRequest {
            contact_person: self.contact_person.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            employees_count: self.employees_count,
            service_type: self.service_type.clone(),
            implementation_period: self.implementation_period.clone(),
            additional_services: self.additional_services.clone(),
            total_budget: self.total_budget,
            hr_licenses: self.hr_licenses,
            employee_licenses: self.employee_licenses,
            on_premises: self.on_premises,
            ..ProposalRequest::new(company)
        })
    }
}

pub fn run(args: FillArgs) -> CommandResult {
    let config = match load_config(COMMAND, args.load_options()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let variant = args.variant.unwrap_or(TemplateVariant::Short);
    let request = match args.proposal_request() {
        Ok(request) => request,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_request", message, 4),
    };

    let filler = TemplateFiller::from_config(&config);
    let outcome = match filler.fill(variant, &request) {
        Ok(outcome) => outcome,
        Err(error) => return fill_failure(&error),
    };

    let pdf = if config.pdf.enabled { Some(render_pdf(&config, &outcome.output_path)) } else { None };

    let mut details = json!({
        "variant": variant,
        "output_path": outcome.output_path,
        "grand_total": outcome.report.formatted_total,
        "report": outcome.report,
    });
    if let Some(pdf) = &pdf {
        details["pdf"] = match pdf {
            Ok(path) => json!({ "status": "ok", "path": path }),
            Err((error_class, message)) => {
                json!({ "status": "error", "error_class": error_class, "message": message })
            }
        };
    }

    let message = format!(
        "proposal for `{}` written to {} (total {})",
        request.company_name,
        outcome.output_path.display(),
        outcome.report.formatted_total
    );
    CommandResult::success_with(COMMAND, message, Some(details))
}

fn fill_failure(error: &FillError) -> CommandResult {
    let exit_code = match error {
        FillError::Domain(_) => 4,
        FillError::TemplateNotFound { .. } => 5,
        FillError::PlaceholderNotMatched(_) => 6,
        FillError::Deck(_) => 7,
    };
    CommandResult::failure(
        COMMAND,
        error.error_class(),
        format!("{} ({error})", error.user_message()),
        exit_code,
    )
}

/// PDF failures never fail the fill; they are reported next to the output.
fn render_pdf(
    config: &AppConfig,
    input: &std::path::Path,
) -> Result<PathBuf, (&'static str, String)> {
    let runtime = runtime(COMMAND).map_err(|_| ("runtime_init", "async runtime unavailable".to_string()))?;
    let renderer = PdfRenderer::from_config(&config.pdf);

    runtime.block_on(renderer.convert(input)).map_err(|error| {
        warn!(
            event_name = "cli.fill.pdf_failed",
            input = %input.display(),
            error = %error,
            "pdf rendering failed, presentation kept"
        );
        (error.error_class(), error.to_string())
    })
}
