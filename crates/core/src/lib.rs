pub mod config;
pub mod deck;
pub mod domain;
pub mod errors;
pub mod fill;
pub mod layout;
pub mod money;
pub mod naming;
pub mod pricing;

pub use deck::{DeckError, Presentation, RunStyle};
pub use domain::request::ProposalRequest;
pub use domain::variant::TemplateVariant;
pub use errors::{DomainError, FillError, PlaceholderKind};
pub use fill::{
    FillMode, FillOutcome, FillReport, FillWarning, FillerSettings, FormattingPolicy,
    SubstitutionStrategy, TemplateFiller,
};
pub use layout::{RowRole, TemplateLayout};
pub use money::format_money;
pub use pricing::{LineItem, PriceBreakdown, PriceModel};
