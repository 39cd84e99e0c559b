use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use deckfill_core::config::PdfConfig;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::RenderError;

/// Converts documents to PDF with a headless office suite
/// (`<binary> --headless --convert-to pdf --outdir <dir> <input>`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfRenderer {
    binary: String,
    timeout: Duration,
}

impl PdfRenderer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self { binary: binary.into(), timeout }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new(config.binary.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Full path of the converter, looked up on PATH unless already a path.
    pub fn resolve_binary(&self) -> Result<PathBuf, RenderError> {
        which::which(&self.binary).map_err(|_| RenderError::BinaryNotFound(self.binary.clone()))
    }

    /// Writes `<stem>.pdf` next to `input` and returns its path.
    ///
    /// The child process is killed if the timeout elapses.
    pub async fn convert(&self, input: &Path) -> Result<PathBuf, RenderError> {
        let binary = self.resolve_binary()?;
        let out_dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = input.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
        let expected = out_dir.join(format!("{stem}.pdf"));

        debug!(
            event_name = "render.pdf.started",
            binary = %binary.display(),
            input = %input.display(),
            "starting pdf conversion"
        );

        let mut command = Command::new(&binary);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    event_name = "render.pdf.timeout",
                    input = %input.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "pdf conversion timed out, converter killed"
                );
                return Err(RenderError::Timeout { secs: self.timeout.as_secs() });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                event_name = "render.pdf.failed",
                status = ?output.status.code(),
                stderr = %stderr,
                "pdf converter failed"
            );
            return Err(RenderError::Failed { status: output.status.code(), stderr });
        }

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(RenderError::MissingOutput(expected));
        }

        info!(event_name = "render.pdf.completed", output = %expected.display(), "pdf written");
        Ok(expected)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::PdfRenderer;
    use crate::RenderError;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn input(dir: &Path) -> PathBuf {
        let path = dir.join("КП_Альфа_05032026_1430.pptx");
        fs::write(&path, b"pptx").expect("write input");
        path
    }

    fn renderer(binary: &Path, timeout: Duration) -> PdfRenderer {
        PdfRenderer::new(binary.to_string_lossy(), timeout)
    }

    #[tokio::test]
    async fn converter_output_path_is_returned() {
        let dir = TempDir::new().expect("tempdir");
        let binary = script(
            dir.path(),
            "fake-office",
            r#"name=$(basename "$6"); printf '%%PDF-1.4' > "$5/${name%.*}.pdf""#,
        );
        let input = input(dir.path());

        let pdf = renderer(&binary, Duration::from_secs(10)).convert(&input).await.expect("convert");

        assert_eq!(pdf, dir.path().join("КП_Альфа_05032026_1430.pdf"));
        assert_eq!(fs::read(&pdf).expect("read pdf"), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = TempDir::new().expect("tempdir");
        let binary = script(dir.path(), "broken-office", "echo 'source file could not be loaded' >&2\nexit 3");

        let error = renderer(&binary, Duration::from_secs(10))
            .convert(&input(dir.path()))
            .await
            .expect_err("conversion should fail");

        assert!(matches!(
            error,
            RenderError::Failed { status: Some(3), ref stderr } if stderr.contains("could not be loaded")
        ));
    }

    #[tokio::test]
    async fn success_without_output_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let binary = script(dir.path(), "silent-office", "exit 0");

        let error = renderer(&binary, Duration::from_secs(10))
            .convert(&input(dir.path()))
            .await
            .expect_err("missing output");

        assert!(matches!(error, RenderError::MissingOutput(_)));
    }

    #[tokio::test]
    async fn slow_converter_times_out() {
        let dir = TempDir::new().expect("tempdir");
        let binary = script(dir.path(), "slow-office", "sleep 5");

        let error = renderer(&binary, Duration::from_millis(200))
            .convert(&input(dir.path()))
            .await
            .expect_err("timeout");

        assert!(matches!(error, RenderError::Timeout { .. }));
        assert_eq!(error.error_class(), "pdf_timeout");
    }

    #[tokio::test]
    async fn unknown_binary_is_reported() {
        let dir = TempDir::new().expect("tempdir");
        let error = PdfRenderer::new("deckfill-no-such-office", Duration::from_secs(1))
            .convert(&input(dir.path()))
            .await
            .expect_err("missing binary");

        assert!(matches!(error, RenderError::BinaryNotFound(ref name) if name == "deckfill-no-such-office"));
    }
}
