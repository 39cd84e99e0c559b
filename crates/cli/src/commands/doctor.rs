use std::path::PathBuf;

use deckfill_core::config::{AppConfig, LoadOptions};
use deckfill_core::{FillerSettings, Presentation, TemplateVariant};
use deckfill_render::PdfRenderer;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exits with 1 when any check failed.
pub fn run(json_output: bool, config_path: Option<PathBuf>) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = u8::from(report.overall_status == CheckStatus::Fail);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();
    let options = LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    };

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let settings = FillerSettings::from_config(&config);
            checks.push(check_template(&settings, TemplateVariant::Short));
            checks.push(check_template(&settings, TemplateVariant::Long));
            checks.push(check_pdf_binary(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["template_short", "template_long", "pdf_binary"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// A template is ready when it opens and has a table at the pricing ordinal.
fn check_template(settings: &FillerSettings, variant: TemplateVariant) -> DoctorCheck {
    let name = match variant {
        TemplateVariant::Short => "template_short",
        TemplateVariant::Long => "template_long",
    };
    let path = settings.template_path(variant);
    let ordinal = settings.template(variant).layout.pricing_table_ordinal;

    if !path.is_file() {
        return DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("`{}` does not exist (run `deckfill sample` to create one)", path.display()),
        };
    }

    match Presentation::open(&path) {
        Ok(presentation) => {
            let tables = presentation.table_count();
            if tables >= ordinal {
                DoctorCheck {
                    name,
                    status: CheckStatus::Pass,
                    details: format!(
                        "`{}` has {} slides and {tables} tables",
                        path.display(),
                        presentation.slide_count()
                    ),
                }
            } else {
                DoctorCheck {
                    name,
                    status: CheckStatus::Fail,
                    details: format!(
                        "`{}` has {tables} tables; the pricing table is expected at position {ordinal}",
                        path.display()
                    ),
                }
            }
        }
        Err(error) => DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("`{}` could not be opened: {error}", path.display()),
        },
    }
}

fn check_pdf_binary(config: &AppConfig) -> DoctorCheck {
    if !config.pdf.enabled {
        return DoctorCheck {
            name: "pdf_binary",
            status: CheckStatus::Skipped,
            details: "pdf rendering is disabled".to_string(),
        };
    }

    let renderer = PdfRenderer::from_config(&config.pdf);
    match renderer.resolve_binary() {
        Ok(path) => DoctorCheck {
            name: "pdf_binary",
            status: CheckStatus::Pass,
            details: format!("using `{}`", path.display()),
        },
        Err(error) => {
            DoctorCheck { name: "pdf_binary", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
