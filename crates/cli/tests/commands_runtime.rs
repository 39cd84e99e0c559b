use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use deckfill_cli::commands::fill::FillArgs;
use deckfill_cli::commands::{cleanup, config, doctor, fill, sample};
use deckfill_core::Presentation;
use serde_json::Value;
use tempfile::TempDir;

fn dirs_env(root: &Path) -> (String, String) {
    (
        root.join("templates").to_string_lossy().into_owned(),
        root.join("output").to_string_lossy().into_owned(),
    )
}

#[test]
fn sample_then_fill_writes_priced_proposal() {
    let root = TempDir::new().expect("tempdir");
    let (templates, output) = dirs_env(root.path());

    with_env(&[("DECKFILL_TEMPLATES_DIR", &templates), ("DECKFILL_OUTPUT_DIR", &output)], || {
        let sampled = sample::run(None, false, None);
        assert_eq!(sampled.exit_code, 0, "{}", sampled.output);
        assert!(root.path().join("templates/kedo_short.pptx").is_file());
        assert!(root.path().join("templates/kedo_long.pptx").is_file());

        let result = fill::run(FillArgs {
            company: Some("ООО Ромашка".to_string()),
            hr_licenses: 2,
            employee_licenses: 50,
            ..FillArgs::default()
        });
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "fill");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["grand_total"], "95 000 ₽");
        assert_eq!(payload["details"]["report"]["table_filled"], true);
        assert!(payload["details"].get("pdf").is_none(), "pdf is disabled by default");

        let output_path = payload["details"]["output_path"].as_str().expect("output path");
        let file_name = Path::new(output_path).file_name().and_then(|name| name.to_str());
        assert!(file_name.is_some_and(|name| name.starts_with("КП_ООО Ромашка_")));

        let filled = Presentation::open(Path::new(output_path)).expect("open filled deck");
        let texts: Vec<String> =
            filled.slides().iter().flat_map(|slide| slide.text_shape_texts()).collect();
        assert!(texts.iter().any(|text| text.contains("ООО Ромашка")));
        assert!(texts.iter().any(|text| text.contains("95 000 ₽")));
    });
}

#[test]
fn fill_reads_request_file_for_long_variant() {
    let root = TempDir::new().expect("tempdir");
    let (templates, output) = dirs_env(root.path());
    let request = root.path().join("request.json");
    fs::write(
        &request,
        r#"{"company_name":"АО Вектор","email":"sales@vector.ru","hr_licenses":1,"employee_licenses":10,"on_premises":true}"#,
    )
    .expect("write request");

    with_env(&[("DECKFILL_TEMPLATES_DIR", &templates), ("DECKFILL_OUTPUT_DIR", &output)], || {
        assert_eq!(sample::run(None, false, None).exit_code, 0);

        let result = fill::run(FillArgs {
            variant: Some("long".parse().expect("variant")),
            request: Some(request.clone()),
            ..FillArgs::default()
        });
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["details"]["variant"], "long");
        assert_eq!(payload["details"]["grand_total"], "640 000 ₽");
    });
}

#[test]
fn fill_without_template_reports_template_not_found() {
    let root = TempDir::new().expect("tempdir");
    let (templates, output) = dirs_env(root.path());

    with_env(&[("DECKFILL_TEMPLATES_DIR", &templates), ("DECKFILL_OUTPUT_DIR", &output)], || {
        let result = fill::run(FillArgs {
            company: Some("ООО Ромашка".to_string()),
            ..FillArgs::default()
        });
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "template_not_found");
        assert!(!root.path().join("output").exists(), "nothing may be written");
    });
}

#[test]
fn fill_rejects_invalid_requests() {
    let root = TempDir::new().expect("tempdir");
    let (templates, output) = dirs_env(root.path());

    with_env(&[("DECKFILL_TEMPLATES_DIR", &templates), ("DECKFILL_OUTPUT_DIR", &output)], || {
        assert_eq!(sample::run(None, false, None).exit_code, 0);

        let missing_company = fill::run(FillArgs::default());
        assert_eq!(missing_company.exit_code, 4);
        assert_eq!(parse_payload(&missing_company.output)["error_class"], "invalid_request");

        let bad_email = fill::run(FillArgs {
            company: Some("ООО Ромашка".to_string()),
            email: Some("not-an-email".to_string()),
            ..FillArgs::default()
        });
        assert_eq!(bad_email.exit_code, 4);
        assert_eq!(parse_payload(&bad_email.output)["error_class"], "invalid_request");
    });
}

#[test]
fn fill_reports_config_failure() {
    with_env(&[("DECKFILL_PRICING_BASE", "not-a-number")], || {
        let result = fill::run(FillArgs {
            company: Some("ООО Ромашка".to_string()),
            ..FillArgs::default()
        });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn sample_keeps_existing_templates_unless_forced() {
    let root = TempDir::new().expect("tempdir");
    let target = root.path().join("custom");

    with_env(&[], || {
        assert_eq!(sample::run(Some(target.clone()), false, None).exit_code, 0);
        let short = target.join("kedo_short.pptx");
        fs::write(&short, b"hand-edited").expect("overwrite");

        let again = sample::run(Some(target.clone()), false, None);
        assert_eq!(parse_payload(&again.output)["details"]["skipped"].as_array().map(Vec::len), Some(2));
        assert_eq!(fs::read(&short).expect("read"), b"hand-edited");

        assert_eq!(sample::run(Some(target.clone()), true, None).exit_code, 0);
        assert!(Presentation::open(&short).is_ok());
    });
}

#[test]
fn config_reports_value_sources() {
    let root = TempDir::new().expect("tempdir");
    let config_path = root.path().join("deckfill.toml");
    fs::write(&config_path, "[pricing]\nbase = 20000\n\n[output]\nfilename_prefix = \"Offer\"\n")
        .expect("write config");

    with_env(&[("DECKFILL_OUTPUT_FILENAME_PREFIX", "КП")], || {
        let result = config::run(Some(config_path.clone()));
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let output = result.output;
        assert!(output.starts_with("effective config (source precedence: env > file > default):"));
        assert!(output.contains(&format!(
            "- pricing.base = 20000 (source: file ({}))",
            config_path.display()
        )));
        assert!(output.contains(
            "- output.filename_prefix = КП (source: env (DECKFILL_OUTPUT_FILENAME_PREFIX))"
        ));
        assert!(output.contains("- pdf.enabled = false (source: default)"));
    });
}

#[test]
fn config_with_missing_file_fails() {
    let root = TempDir::new().expect("tempdir");
    with_env(&[], || {
        let result = config::run(Some(root.path().join("absent.toml")));
        assert_eq!(result.exit_code, 2);
        assert!(result.output.starts_with("config validation failed"));
    });
}

#[test]
fn doctor_json_reports_template_readiness() {
    let root = TempDir::new().expect("tempdir");
    let (templates, output) = dirs_env(root.path());

    with_env(&[("DECKFILL_TEMPLATES_DIR", &templates), ("DECKFILL_OUTPUT_DIR", &output)], || {
        let missing = doctor::run(true, None);
        assert_eq!(missing.exit_code, 1);
        let payload = parse_payload(&missing.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(check_status(&payload, "template_short"), "fail");
        assert_eq!(check_status(&payload, "pdf_binary"), "skipped");

        assert_eq!(sample::run(None, false, None).exit_code, 0);

        let ready = doctor::run(true, None);
        assert_eq!(ready.exit_code, 0, "{}", ready.output);
        let payload = parse_payload(&ready.output);
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(check_status(&payload, "config_validation"), "pass");
        assert_eq!(check_status(&payload, "template_long"), "pass");
    });
}

#[test]
fn doctor_flags_missing_pdf_converter() {
    with_env(
        &[("DECKFILL_PDF_ENABLED", "true"), ("DECKFILL_PDF_BINARY", "deckfill-no-such-office")],
        || {
            let result = doctor::run(false, None);
            assert_eq!(result.exit_code, 1);
            assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
            assert!(result.output.contains("- [fail] pdf_binary:"));
        },
    );
}

#[test]
fn cleanup_sweeps_expired_outputs() {
    let root = TempDir::new().expect("tempdir");
    let (_, output) = dirs_env(root.path());
    fs::create_dir_all(&output).expect("mkdir");
    fs::write(root.path().join("output/КП_old.pptx"), b"old").expect("write");

    with_env(&[("DECKFILL_OUTPUT_DIR", &output)], || {
        let kept = cleanup::run(None, None);
        assert_eq!(kept.exit_code, 0, "{}", kept.output);
        assert_eq!(parse_payload(&kept.output)["details"]["kept"], 1);

        let swept = cleanup::run(Some(0), None);
        assert_eq!(swept.exit_code, 0);
        assert_eq!(parse_payload(&swept.output)["details"]["removed"].as_array().map(Vec::len), Some(1));
        assert!(!root.path().join("output/КП_old.pptx").exists());
    });
}

fn check_status(payload: &Value, name: &str) -> String {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or("missing")
        .to_string()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DECKFILL_TEMPLATES_DIR",
        "DECKFILL_TEMPLATES_SHORT_FILE",
        "DECKFILL_TEMPLATES_LONG_FILE",
        "DECKFILL_OUTPUT_DIR",
        "DECKFILL_OUTPUT_FILENAME_PREFIX",
        "DECKFILL_PRICING_BASE",
        "DECKFILL_PRICING_HR",
        "DECKFILL_PRICING_EMPLOYEE",
        "DECKFILL_PRICING_ON_PREMISE",
        "DECKFILL_FILLER_MODE",
        "DECKFILL_FILLER_STRATEGY",
        "DECKFILL_FILLER_NORMALIZE_FONTS",
        "DECKFILL_FILLER_PRIMARY_FONT",
        "DECKFILL_LAYOUT_PRICING_TABLE_ORDINAL",
        "DECKFILL_LAYOUT_QUANTITY_COLUMN",
        "DECKFILL_LAYOUT_PRICE_COLUMN",
        "DECKFILL_LAYOUT_UNIT_LABEL",
        "DECKFILL_LAYOUT_SUMMARY_MARKER",
        "DECKFILL_LAYOUT_COMPANY_PLACEHOLDER",
        "DECKFILL_PDF_ENABLED",
        "DECKFILL_PDF_BINARY",
        "DECKFILL_PDF_TIMEOUT_SECS",
        "DECKFILL_CLEANUP_RETENTION_SECS",
        "DECKFILL_LOGGING_LEVEL",
        "DECKFILL_LOGGING_FORMAT",
        "DECKFILL_LOG_LEVEL",
        "DECKFILL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
