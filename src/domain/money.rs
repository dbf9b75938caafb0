use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Money is an exact base-10 decimal. Binary floating point never touches a balance.
pub type Amount = Decimal;

/// Format an amount for display.
/// Trailing zeros are dropped, but at least two fractional digits are kept.
/// Example: 200 -> "200.00", 0.015 -> "0.015", -12.5 -> "-12.50"
pub fn format_amount(amount: Amount) -> String {
    let normalized = amount.normalize();
    if normalized.scale() < 2 {
        format!("{:.2}", normalized)
    } else {
        normalized.to_string()
    }
}

/// Parse user input into a non-negative amount.
/// Example: "50.00" -> 50.00, "0.015" -> 0.015, "100" -> 100
pub fn parse_amount(input: &str) -> Result<Amount, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }

    let amount = Decimal::from_str(input).map_err(|_| AmountError::InvalidFormat(input.into()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }

    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,

    #[error("invalid money format: '{0}'")]
    InvalidFormat(String),

    #[error("amount must be greater than or equal to 0, got {0}")]
    Negative(Amount),
}
