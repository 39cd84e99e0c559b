use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::deck::DeckError;
use crate::domain::variant::TemplateVariant;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid proposal request: {0}")]
    InvalidRequest(String),
    #[error("unknown template variant `{0}` (expected `short` or `long`)")]
    UnknownVariant(String),
    #[error("price for {0} is too large to compute")]
    PriceOverflow(String),
}

/// The four template locations the filler writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    CompanyName,
    GlobalPlaceholders,
    PricingTable,
    PriceSummary,
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CompanyName => "company name placeholder",
            Self::GlobalPlaceholders => "global placeholders",
            Self::PricingTable => "pricing table",
            Self::PriceSummary => "price summary",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum FillError {
    #[error("template for `{variant}` variant not found at {}", path.display())]
    TemplateNotFound { variant: TemplateVariant, path: PathBuf },
    #[error("template has no {0} to fill")]
    PlaceholderNotMatched(PlaceholderKind),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Deck(#[from] DeckError),
}

impl FillError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::PlaceholderNotMatched(_) => "placeholder_not_matched",
            Self::Domain(_) => "invalid_request",
            Self::Deck(_) => "template_unreadable",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => {
                "The proposal template is missing. Check the templates directory."
            }
            Self::PlaceholderNotMatched(_) => {
                "The template does not match the expected layout. Check the template version."
            }
            Self::Domain(_) => "The request could not be processed. Check inputs and try again.",
            Self::Deck(_) => "The proposal file could not be read or written.",
        }
    }
}
