use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::money::format_money;

static PHONE_PATTERN: OnceLock<Regex> = OnceLock::new();
static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn phone_pattern() -> &'static Regex {
    PHONE_PATTERN.get_or_init(|| Regex::new(r"^[\d\s\-+()]+$").expect("valid regex"))
}

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
    })
}

/// Global placeholder key carrying the client company name.
pub const COMPANY_NAME_KEY: &str = "COMPANY_NAME";

/// Everything collected for one commercial proposal.
///
/// Only `company_name` and the pricing inputs drive the positional template
/// fill; the contact and project fields feed global `{{KEY}}` placeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalRequest {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub employees_count: Option<u32>,
    pub service_type: Option<String>,
    pub implementation_period: Option<String>,
    pub additional_services: Option<String>,
    pub total_budget: Option<u64>,
    pub hr_licenses: u32,
    pub employee_licenses: u32,
    pub on_premises: bool,
}

impl ProposalRequest {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self { company_name: company_name.into(), ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.company_name.trim().is_empty() {
            return Err(invalid("company_name must not be empty"));
        }
        if let Some(phone) = self.phone.as_deref() {
            if !phone_pattern().is_match(phone.trim()) {
                return Err(invalid("phone may only contain digits, spaces, `-`, `+`, `(` and `)`"));
            }
        }
        if let Some(email) = self.email.as_deref() {
            if !email_pattern().is_match(email.trim()) {
                return Err(invalid("email must look like `name@domain.tld`"));
            }
        }
        if self.employees_count == Some(0) {
            return Err(invalid("employees_count must be greater than zero"));
        }
        if self.total_budget == Some(0) {
            return Err(invalid("total_budget must be greater than zero"));
        }
        Ok(())
    }

    /// Values for global placeholder substitution, keyed by placeholder name.
    /// Absent fields map to empty strings so their placeholders are cleared.
    pub fn placeholders(&self, today: NaiveDate) -> BTreeMap<String, String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let number = |value: Option<u32>| value.map(|n| n.to_string()).unwrap_or_default();

        BTreeMap::from([
            (COMPANY_NAME_KEY.to_string(), self.company_name.clone()),
            ("CONTACT_PERSON".to_string(), text(&self.contact_person)),
            ("PHONE".to_string(), text(&self.phone)),
            ("EMAIL".to_string(), text(&self.email)),
            ("EMPLOYEES_COUNT".to_string(), number(self.employees_count)),
            ("SERVICE_TYPE".to_string(), text(&self.service_type)),
            ("IMPLEMENTATION_PERIOD".to_string(), text(&self.implementation_period)),
            ("ADDITIONAL_SERVICES".to_string(), text(&self.additional_services)),
            (
                "TOTAL_BUDGET".to_string(),
                self.total_budget.map(|budget| format_money(Decimal::from(budget))).unwrap_or_default(),
            ),
            ("CURRENT_DATE".to_string(), today.format("%d.%m.%Y").to_string()),
        ])
    }
}

fn invalid(message: &str) -> DomainError {
    DomainError::InvalidRequest(message.to_string())
}
