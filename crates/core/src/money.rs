use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_GLYPH: char = '₽';

static MONEY_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Matches an amount as `format_money` writes it (digits and spaces followed by
/// the currency glyph), so a previously written amount can be found again.
pub fn money_pattern() -> &'static Regex {
    MONEY_PATTERN.get_or_init(|| Regex::new(r"\d[\d\s]*₽").expect("valid regex"))
}

/// Formats an amount as whole rubles grouped by thousands: `1 234 567 ₽`.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped} {CURRENCY_GLYPH}")
}
