use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::request::ProposalRequest;
use crate::errors::DomainError;
use crate::layout::RowRole;

/// Unit prices per line item, in rubles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceModel {
    pub base: Decimal,
    pub hr: Decimal,
    pub employee: Decimal,
    pub on_premise: Decimal,
}

impl Default for PriceModel {
    fn default() -> Self {
        Self {
            base: Decimal::from(15_000),
            hr: Decimal::from(15_000),
            employee: Decimal::from(1_000),
            on_premise: Decimal::from(600_000),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub role: RowRole,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Line items and their sum, computed once per request and written to both the
/// pricing table and the summary line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items: Vec<LineItem>,
    pub grand_total: Decimal,
}

impl PriceModel {
    pub fn unit_price(&self, role: RowRole) -> Option<Decimal> {
        match role {
            RowRole::Base => Some(self.base),
            RowRole::HrLicense => Some(self.hr),
            RowRole::EmployeeLicense => Some(self.employee),
            RowRole::OnPremise => Some(self.on_premise),
            RowRole::Total => None,
        }
    }

    /// Computes line totals and their sum. Line totals are rounded to whole
    /// rubles first, so the grand total always equals the sum of the table rows.
    pub fn breakdown(&self, request: &ProposalRequest) -> Result<PriceBreakdown, DomainError> {
        let quantities = [
            (RowRole::Base, 1),
            (RowRole::HrLicense, request.hr_licenses),
            (RowRole::EmployeeLicense, request.employee_licenses),
            (RowRole::OnPremise, u32::from(request.on_premises)),
        ];

        let mut items = Vec::with_capacity(quantities.len());
        for (role, quantity) in quantities {
            let Some(unit_price) = self.unit_price(role) else {
                continue;
            };
            let line_total = unit_price
                .checked_mul(Decimal::from(quantity))
                .ok_or_else(|| DomainError::PriceOverflow(role.to_string()))?
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            items.push(LineItem { role, quantity, unit_price, line_total });
        }

        let grand_total = items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.line_total)
                .ok_or_else(|| DomainError::PriceOverflow("grand total".to_owned()))
        })?;

        Ok(PriceBreakdown { items, grand_total })
    }
}

impl PriceBreakdown {
    pub fn item(&self, role: RowRole) -> Option<&LineItem> {
        self.items.iter().find(|item| item.role == role)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::PriceModel;
    use crate::domain::request::ProposalRequest;
    use crate::errors::DomainError;
    use crate::layout::RowRole;

    fn request(on_premises: bool) -> ProposalRequest {
        ProposalRequest {
            hr_licenses: 2,
            employee_licenses: 50,
            on_premises,
            ..ProposalRequest::new("ООО Ромашка")
        }
    }

    #[test]
    fn short_scenario_totals_ninety_five_thousand() {
        let breakdown = PriceModel::default().breakdown(&request(false)).expect("breakdown");

        let totals: Vec<(RowRole, Decimal)> =
            breakdown.items.iter().map(|item| (item.role, item.line_total)).collect();
        assert_eq!(
            totals,
            vec![
                (RowRole::Base, Decimal::from(15_000)),
                (RowRole::HrLicense, Decimal::from(30_000)),
                (RowRole::EmployeeLicense, Decimal::from(50_000)),
                (RowRole::OnPremise, Decimal::ZERO),
            ]
        );
        assert_eq!(breakdown.grand_total, Decimal::from(95_000));
    }

    #[test]
    fn on_premise_flag_adds_lump_sum() {
        let breakdown = PriceModel::default().breakdown(&request(true)).expect("breakdown");

        let on_premise = breakdown.item(RowRole::OnPremise).expect("on-premise line");
        assert_eq!(on_premise.quantity, 1);
        assert_eq!(on_premise.line_total, Decimal::from(600_000));
        assert_eq!(breakdown.grand_total, Decimal::from(695_000));
    }

    #[test]
    fn grand_total_is_sum_of_line_totals() {
        let model = PriceModel { employee: Decimal::new(99_950, 2), ..PriceModel::default() };
        let breakdown = model.breakdown(&request(true)).expect("breakdown");

        let sum: Decimal = breakdown.items.iter().map(|item| item.line_total).sum();
        assert_eq!(breakdown.grand_total, sum);
        assert!(breakdown.item(RowRole::Total).is_none());
    }

    #[test]
    fn half_ruble_prices_round_per_line_before_summing() {
        let model = PriceModel {
            base: Decimal::new(5, 1),
            hr: Decimal::new(5, 1),
            employee: Decimal::ZERO,
            on_premise: Decimal::ZERO,
        };
        let request = ProposalRequest { hr_licenses: 1, ..ProposalRequest::new("ООО Ромашка") };
        let breakdown = model.breakdown(&request).expect("breakdown");

        assert_eq!(breakdown.item(RowRole::Base).expect("base").line_total, Decimal::ONE);
        assert_eq!(breakdown.item(RowRole::HrLicense).expect("hr").line_total, Decimal::ONE);
        assert_eq!(breakdown.grand_total, Decimal::from(2));
    }

    #[test]
    fn overflowing_line_total_is_an_error() {
        let model = PriceModel {
            hr: Decimal::from_i128_with_scale(10_i128.pow(25), 0),
            ..PriceModel::default()
        };
        let request = ProposalRequest { hr_licenses: 100_000, ..ProposalRequest::new("ООО Ромашка") };

        let error = model.breakdown(&request).expect_err("overflow");
        assert!(matches!(error, DomainError::PriceOverflow(ref item) if item == "hr license"));
    }
}
