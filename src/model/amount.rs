//! Amount type for non-negative monetary values.
//!
//! The sign of a movement is carried by its `Kind`, never by the number, so an `Amount` can never
//! be negative. Parsing is available in two flavors: `FromStr`, which reports why a string is not
//! an amount, and `Amount::parse`, which falls back to zero and records that it did so.

use crate::model::Parsed;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// The currency symbol users may type before or after the number.
const EURO: char = '€';

/// Represents a non-negative amount of money.
///
/// Equality and ordering are numeric, so `50.0` and `50.00` are the same amount.
///
/// ```
/// # use finanzas_sync::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("1,250.50 €").unwrap();
/// assert_eq!(a.to_string(), "1250.50");
/// assert!(Amount::from_str("-5").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);
    /// The largest amount. Sums and doubling stop here instead of overflowing.
    pub const MAX: Amount = Amount(Decimal::MAX);

    /// Returns `None` when `value` is negative.
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_zero() {
            // Drops the sign of a negative zero.
            Some(Self(value.abs()))
        } else if value.is_sign_negative() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Parses `s`, using zero when it is not a valid amount.
    pub fn parse(s: &str) -> Parsed<Amount> {
        match Amount::from_str(s) {
            Ok(amount) => Parsed::exact(amount),
            Err(_) => Parsed::fallback(Amount::ZERO),
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// One of two equal shares.
    pub fn half(&self) -> Amount {
        self.split(2)
    }

    /// Undoes `half`. Saturates at `Amount::MAX`.
    pub fn double(&self) -> Amount {
        Amount(self.0.checked_mul(Decimal::TWO).unwrap_or(Decimal::MAX))
    }

    /// One of `parts` equal shares. Splitting into zero parts leaves the amount unchanged.
    pub fn split(&self, parts: u32) -> Amount {
        if parts == 0 {
            return *self;
        }
        Amount(self.0 / Decimal::from(parts))
    }

    /// The amount rounded to cents.
    pub fn cents(&self) -> Decimal {
        self.0.round_dp(2)
    }

    /// Formats the amount for people, e.g. `1,250.50 €`.
    pub fn display_euros(&self) -> String {
        format!(
            "{} {EURO}",
            format_num::format_num!(",.2", self.0.to_f64().unwrap_or_default())
        )
    }
}

/// The reasons a string is not an `Amount`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmountError {
    #[error("An empty string is not an amount")]
    Empty,

    #[error("Amounts cannot be negative, got '{0}'")]
    Negative(String),

    #[error("Unable to parse '{0}' as an amount")]
    Invalid(String, #[source] rust_decimal::Error),

    #[error("Misplaced separator in '{0}'")]
    Separator(String),
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_symbol = trimmed
            .strip_prefix(EURO)
            .or_else(|| trimmed.strip_suffix(EURO))
            .unwrap_or(trimmed)
            .trim();

        if without_symbol.is_empty() {
            return Err(AmountError::Empty);
        }

        let plain = strip_thousands(without_symbol)
            .ok_or_else(|| AmountError::Separator(s.to_string()))?;

        let value =
            Decimal::from_str(&plain).map_err(|e| AmountError::Invalid(s.to_string(), e))?;
        Amount::new(value).ok_or_else(|| AmountError::Negative(s.to_string()))
    }
}

/// Removes thousands commas from `s`. Commas are only read as thousands separators when a decimal
/// point is also present and they split the integer part into groups of three digits, so "12,50"
/// and "1,2.5" are rejected rather than guessed at. Underscores are never accepted.
fn strip_thousands(s: &str) -> Option<String> {
    if s.contains('_') {
        return None;
    }
    if !s.contains(',') {
        return Some(s.to_string());
    }
    let (integer, fraction) = s.split_once('.')?;
    let unsigned = integer.trim_start_matches(['+', '-']);
    let sign = &integer[..integer.len() - unsigned.len()];
    let mut groups = unsigned.split(',');
    let first = groups.next()?;
    let all_digits = |g: &str| g.chars().all(|c| c.is_ascii_digit());
    if first.is_empty() || first.len() > 3 || !all_digits(first) {
        return None;
    }
    let mut plain = format!("{sign}{first}");
    for group in groups {
        if group.len() != 3 || !all_digits(group) {
            return None;
        }
        plain.push_str(group);
    }
    if fraction.contains(',') {
        return None;
    }
    Some(format!("{plain}.{fraction}"))
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    /// Saturates at `Amount::MAX`.
    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
