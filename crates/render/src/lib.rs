//! Collaborators that run outside the filler: PDF conversion through an
//! office suite process, and removal of generated files.

pub mod cleanup;
pub mod pdf;

use std::path::PathBuf;

use thiserror::Error;

pub use cleanup::{schedule_removal, sweep_expired, SweepReport};
pub use pdf::PdfRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("converter binary `{0}` was not found on PATH")]
    BinaryNotFound(String),
    #[error("conversion did not finish within {secs}s")]
    Timeout { secs: u64 },
    #[error("converter exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("converter reported success but `{}` was not produced", .0.display())]
    MissingOutput(PathBuf),
    #[error("render I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BinaryNotFound(_) => "pdf_binary_missing",
            Self::Timeout { .. } => "pdf_timeout",
            Self::Failed { .. } | Self::MissingOutput(_) => "pdf_conversion_failed",
            Self::Io(_) => "io",
        }
    }
}
