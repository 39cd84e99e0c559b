//! Where things live inside a proposal template.
//!
//! The filler finds its targets by position and keyword, not by any marker
//! embedded in the deck. All of those assumptions are collected here so a
//! template change means editing one descriptor, not the filling code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::variant::TemplateVariant;

/// Bumped whenever the default layout stops matching previously shipped templates.
pub const LAYOUT_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRole {
    Base,
    HrLicense,
    EmployeeLicense,
    OnPremise,
    Total,
}

impl fmt::Display for RowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Base => "base",
            Self::HrLicense => "hr license",
            Self::EmployeeLicense => "employee license",
            Self::OnPremise => "on-premise",
            Self::Total => "total",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRule {
    pub role: RowRole,
    /// Lower-case substrings; any one of them present in the row signature matches.
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLayout {
    pub version: u32,
    /// 1-based position of the pricing table among all tables, counting slides
    /// in order and shapes within each slide in order.
    pub pricing_table_ordinal: usize,
    /// 0-based column receiving `"<quantity> <unit_label>"`.
    pub quantity_column: usize,
    /// 0-based column receiving the line total (or the grand total on the total row).
    pub price_column: usize,
    /// Evaluated in order; the first rule with a matching keyword wins.
    pub row_rules: Vec<RowRule>,
    pub unit_label: String,
    /// Text identifying the shape that carries the price summary line.
    pub summary_marker: String,
    /// Literal replaced by the company name on the title slide.
    pub company_placeholder: String,
}

impl TemplateLayout {
    /// Layout of the KEDO proposal decks.
    pub fn kedo() -> Self {
        Self {
            version: LAYOUT_VERSION,
            pricing_table_ordinal: 3,
            quantity_column: 2,
            price_column: 4,
            row_rules: vec![
                rule(RowRole::Base, &["базовая", "basic"]),
                rule(RowRole::HrLicense, &["кадровик", "recruiter"]),
                rule(RowRole::EmployeeLicense, &["сотрудник", "employee"]),
                rule(RowRole::OnPremise, &["on-premise"]),
                rule(RowRole::Total, &["итог", "total"]),
            ],
            unit_label: "шт".to_string(),
            summary_marker: "Стоимость HRlink на 12 месяцев".to_string(),
            company_placeholder: "Название".to_string(),
        }
    }

    pub fn for_variant(variant: TemplateVariant) -> Self {
        match variant {
            TemplateVariant::Short | TemplateVariant::Long => Self::kedo(),
        }
    }

    pub fn classify(&self, signature: &str) -> Option<RowRole> {
        self.row_rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|keyword| signature.contains(keyword.as_str())))
            .map(|rule| rule.role)
    }
}

fn rule(role: RowRole, keywords: &[&str]) -> RowRule {
    RowRule { role, keywords: keywords.iter().map(|keyword| keyword.to_string()).collect() }
}

/// Trimmed cell texts joined by single spaces, lower-cased.
pub fn row_signature<S: AsRef<str>>(cells: &[S]) -> String {
    cells.iter().map(|cell| cell.as_ref().trim()).collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{row_signature, RowRole, TemplateLayout};

    #[test]
    fn signature_trims_joins_and_lowercases() {
        assert_eq!(row_signature(&[" 1 ", "Базовая Лицензия", ""]), "1 базовая лицензия ");
    }

    #[test]
    fn classifies_rows_by_first_matching_rule() {
        let layout = TemplateLayout::kedo();

        assert_eq!(layout.classify("1 базовая лицензия 0 шт"), Some(RowRole::Base));
        assert_eq!(layout.classify("лицензия кадровика"), Some(RowRole::HrLicense));
        assert_eq!(layout.classify("лицензии сотрудников"), Some(RowRole::EmployeeLicense));
        assert_eq!(layout.classify("размещение on-premise"), Some(RowRole::OnPremise));
        assert_eq!(layout.classify("итоговая стоимость"), Some(RowRole::Total));
        assert_eq!(layout.classify("наименование количество сумма"), None);
    }

    #[test]
    fn earlier_rules_shadow_later_ones() {
        let layout = TemplateLayout::kedo();
        assert_eq!(layout.classify("итого по базовая части"), Some(RowRole::Base));
    }
}
