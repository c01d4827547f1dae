//! Decimal values carried by send and offer intents.
//!
//! The ledger stores every column as a string, but nothing between the
//! client and the table should treat money as free text or, worse, as a
//! float. Values are parsed into [`rust_decimal::Decimal`] at the edges and
//! rendered back in normalized form, so `"10"`, `"10.0"` and `"10.00"`
//! produce the same key column.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest currency code accepted in an [`AssetAmount`].
pub const MAX_CURRENCY_CODE_LEN: usize = 12;

/// Errors raised while parsing wire-format values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("invalid amount '{0}': not a decimal number")]
    InvalidAmount(String),

    #[error("invalid amount '{0}': must be positive")]
    NonPositiveAmount(String),

    #[error("invalid asset amount '{value}': {reason}")]
    InvalidAsset { value: String, reason: &'static str },
}

/// A strictly positive decimal amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO).then_some(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| ValueError::InvalidAmount(s.to_string()))?;
        Self::new(value).ok_or_else(|| ValueError::NonPositiveAmount(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// A positive amount of a named asset, written `<value><CODE>` on the wire
/// (`"10XRP"`, `"5USD"`). Whitespace between the two parts is tolerated on
/// input and dropped on output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetAmount {
    amount: Amount,
    currency: String,
}

impl AssetAmount {
    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl FromStr for AssetAmount {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ValueError::InvalidAsset {
            value: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .ok_or_else(|| invalid("missing currency code"))?;
        let (number, code) = trimmed.split_at(split);
        let code = code.trim();

        if number.is_empty() {
            return Err(invalid("missing numeric value"));
        }
        let mut chars = code.chars();
        let (first, second) = (chars.next(), chars.next());
        if !first.is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(invalid("currency code must start with a letter"));
        }
        // `1e5XRP` would otherwise read as 1 of `E5XRP`.
        if matches!(first, Some('e' | 'E'))
            && second.is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            return Err(invalid("exponent notation is not accepted"));
        }
        if code.is_empty()
            || code.len() > MAX_CURRENCY_CODE_LEN
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid("currency code must be 1-12 ASCII letters or digits"));
        }

        let value = Decimal::from_str(number).map_err(|_| invalid("not a decimal number"))?;
        let amount = Amount::new(value).ok_or_else(|| invalid("value must be positive"))?;

        Ok(Self {
            amount,
            currency: code.to_ascii_uppercase(),
        })
    }
}

impl fmt::Display for AssetAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.currency)
    }
}
