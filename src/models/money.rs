//! Money type for representing baht amounts
//!
//! Internally stores amounts in satang (i64) to avoid floating-point precision
//! issues. Rate arithmetic rounds half away from zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Represents a monetary amount stored as satang (hundredths of a baht)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from satang
    ///
    /// # Examples
    /// ```
    /// use taxbox::models::Money;
    /// let amount = Money::from_satang(1050); // ฿10.50
    /// assert_eq!(amount.baht(), 10);
    /// ```
    pub const fn from_satang(satang: i64) -> Self {
        Self(satang)
    }

    /// Create a Money amount from whole baht and satang
    pub const fn from_baht_satang(baht: i64, satang: i64) -> Self {
        Self(baht * 100 + satang)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in satang
    pub const fn satang(&self) -> i64 {
        self.0
    }

    /// Get the whole baht portion (truncated toward zero)
    pub const fn baht(&self) -> i64 {
        self.0 / 100
    }

    /// Get the satang portion (0-99)
    pub const fn satang_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Amount as a floating-point number of baht, for spreadsheet cells
    pub fn as_baht_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiply by `numerator / denominator`, rounding half away from zero
    pub fn mul_ratio(&self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::zero();
        }
        let num = self.0 as i128 * numerator as i128;
        let den = denominator as i128;
        let magnitude = (num.abs() + den.abs() / 2) / den.abs();
        let sign = num.signum() * den.signum();
        Self((magnitude * sign) as i64)
    }

    /// Parse a money amount from a string
    ///
    /// Accepts formats: "10.50", "-10.50", "฿1,234.50", "THB 10", "10"
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let original = s;
        let s = s.trim();

        let (negative, s) = if let Some(stripped) = s.strip_prefix('-') {
            (true, stripped.trim_start())
        } else {
            (false, s)
        };

        let s = s
            .strip_prefix('฿')
            .or_else(|| s.strip_prefix("THB"))
            .unwrap_or(s)
            .trim();
        let s: String = s.chars().filter(|c| *c != ',').collect();

        if s.is_empty() {
            return Err(MoneyParseError::InvalidFormat(original.to_string()));
        }

        let invalid = || MoneyParseError::InvalidFormat(original.to_string());

        let satang = match s.split_once('.') {
            Some((whole, frac)) => {
                if frac.contains('.') || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit())
                {
                    return Err(invalid());
                }
                let whole: i64 = if whole.is_empty() {
                    0
                } else {
                    whole.parse().map_err(|_| invalid())?
                };
                let frac_value: i64 = match frac.len() {
                    0 => 0,
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    _ => frac.parse().map_err(|_| invalid())?,
                };
                whole
                    .checked_mul(100)
                    .and_then(|w| w.checked_add(frac_value))
                    .ok_or_else(invalid)?
            }
            None => s
                .parse::<i64>()
                .map_err(|_| invalid())?
                .checked_mul(100)
                .ok_or_else(invalid)?,
        };

        if satang < 0 {
            return Err(invalid());
        }

        Ok(Self(if negative { -satang } else { satang }))
    }

    /// Plain decimal form without symbol or grouping, e.g. "1234.50"
    pub fn to_plain_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.baht().abs(), self.satang_part())
    }

    /// Format with a currency symbol and thousands separators
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            symbol,
            group_thousands(self.baht().unsigned_abs()),
            self.satang_part()
        )
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_with_symbol("฿"))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid money format: {}", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_satang() {
        let m = Money::from_satang(1050);
        assert_eq!(m.satang(), 1050);
        assert_eq!(m.baht(), 10);
        assert_eq!(m.satang_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_satang(1050)), "฿10.50");
        assert_eq!(format!("{}", Money::zero()), "฿0.00");
        assert_eq!(format!("{}", Money::from_satang(-1050)), "-฿10.50");
        assert_eq!(format!("{}", Money::from_satang(123_456_789)), "฿1,234,567.89");
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(Money::from_satang(123_450).to_plain_string(), "1234.50");
        assert_eq!(Money::from_satang(-5).to_plain_string(), "-0.05");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_satang(1000);
        let b = Money::from_satang(500);

        assert_eq!((a + b).satang(), 1500);
        assert_eq!((a - b).satang(), 500);
        assert_eq!((-a).satang(), -1000);
    }

    #[test]
    fn test_mul_ratio_rounds_half_away_from_zero() {
        // 107.00 * 7/107 = 7.00 exactly
        assert_eq!(Money::from_satang(10_700).mul_ratio(7, 107).satang(), 700);
        // 0.15 * 1/2 = 0.075 -> 0.08
        assert_eq!(Money::from_satang(15).mul_ratio(1, 2).satang(), 8);
        assert_eq!(Money::from_satang(-15).mul_ratio(1, 2).satang(), -8);
        assert_eq!(Money::from_satang(100).mul_ratio(1, 0), Money::zero());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("10.50").unwrap().satang(), 1050);
        assert_eq!(Money::parse("฿1,070.00").unwrap().satang(), 107_000);
        assert_eq!(Money::parse("THB 25").unwrap().satang(), 2500);
        assert_eq!(Money::parse("-10.50").unwrap().satang(), -1050);
        assert_eq!(Money::parse("10.5").unwrap().satang(), 1050);
        assert_eq!(Money::parse("0.05").unwrap().satang(), 5);
        assert!(Money::parse("").is_err());
        assert!(Money::parse("1.234").is_err());
        assert!(Money::parse("abc").is_err());
    }

    #[test]
    fn test_parse_rejects_amounts_too_large_for_satang() {
        assert!(matches!(
            Money::parse("99999999999999999"),
            Err(MoneyParseError::InvalidFormat(_))
        ));
        assert_eq!(
            Money::parse("92233720368547758.07").unwrap().satang(),
            i64::MAX
        );
        assert!(Money::parse("92233720368547758.08").is_err());
        assert!(Money::parse("92233720368547759").is_err());
    }

    #[test]
    fn test_sum() {
        let total: Money = vec![
            Money::from_satang(100),
            Money::from_satang(200),
            Money::from_satang(300),
        ]
        .into_iter()
        .sum();
        assert_eq!(total.satang(), 600);
    }

    #[test]
    fn test_serialization() {
        let m = Money::from_satang(1050);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "1050");
    }
}
