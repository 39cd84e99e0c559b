//! PPTX document model: package I/O, slide shape views and run formatting.

pub mod fixtures;
pub mod package;
pub mod shapes;
pub mod style;
pub mod xml;

use std::path::PathBuf;

use thiserror::Error;

pub use package::Presentation;
pub use shapes::{Cell, ParagraphMut, Row, RunMut, Slide, Table, TextShape};
pub use style::RunStyle;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("could not read presentation `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("presentation I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("presentation archive is invalid: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("malformed XML in `{part}`: {message}")]
    Xml { part: String, message: String },
    #[error("presentation part is missing: {0}")]
    MissingPart(String),
}
