//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Stored order documents carry decimal numbers:                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A draft that adds and removes lines hundreds of times drifts.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (agorot / cents)                     │
//! │    Decimal → Money happens ONCE, at the document boundary              │
//! │    Every sum, delta and VAT derivation is exact integer math           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Policy
//! Every rounding step in the system goes through [`round_div`]:
//! **round half away from zero** on the minor unit. VAT derivation,
//! decimal parsing and tax calculation all share it, so totals are
//! reproducible no matter which path produced a price.
//!
//! ## Usage
//! ```rust
//! use orderdesk_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let doubled = price * 2;            // 21.98
//! let total = price + Money::from_cents(500); // 15.99
//! assert_eq!(total.cents(), 1599);
//! assert_eq!(doubled.cents(), 2198);
//!
//! // Only at the document boundary:
//! assert_eq!(Money::from_major_str("0.59"), Some(Money::from_cents(59)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: running-total deltas can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// Variation.price ──┬──► PricePair (resolved) ──► OrderLineItem.unit_price
///                   │                                   │
/// Override.price ───┘                                   ▼
///                                         OrderDraft running totals
///                                                       │
///                                                       ▼
///                                     Order.total_before_tax / total_with_tax
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal string in major units ("12.5", "-0.59", "3").
    ///
    /// Digits past the second decimal place are rounded half away from
    /// zero. Returns `None` for anything that is not a plain decimal
    /// number or that overflows.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_str("12.5"), Some(Money::from_cents(1250)));
    /// assert_eq!(Money::from_major_str("0.125"), Some(Money::from_cents(13)));
    /// assert_eq!(Money::from_major_str("abc"), None);
    /// ```
    pub fn from_major_str(input: &str) -> Option<Self> {
        let s = input.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };

        let frac = frac.as_bytes();
        let digit = |i: usize| frac.get(i).map(|b| i64::from(b - b'0')).unwrap_or(0);
        let mut minor = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            minor += 1;
        }

        let magnitude = whole.checked_mul(100)?.checked_add(minor)?;
        Some(Money(if negative { -magnitude } else { magnitude }))
    }

    /// Converts a decimal number in major units into Money.
    ///
    /// Goes through the shortest round-trip decimal representation of the
    /// float, so `0.285` becomes 29 minor units rather than 28.
    pub fn from_major_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Self::from_major_str(&value.to_string())
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).major(), 10);
    /// assert_eq!(Money::from_cents(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value as a decimal number in major units.
    ///
    /// Only used when writing documents for the portals, which store
    /// decimal numbers.
    #[inline]
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates the tax owed on a tax-exclusive amount.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    /// use orderdesk_core::types::TaxRate;
    ///
    /// let net = Money::from_cents(85);
    /// let vat = net.calculate_tax(TaxRate::from_bps(1800));
    /// // 0.85 × 18% = 0.153 → 0.15
    /// assert_eq!(vat.cents(), 15);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps amount * bps clear of overflow
        let tax = round_div(self.0 as i128 * rate.bps() as i128, 10_000);
        Money(tax as i64)
    }

    /// Adds tax on top of a tax-exclusive amount.
    #[inline]
    pub fn with_tax(&self, rate: TaxRate) -> Money {
        *self + self.calculate_tax(rate)
    }

    /// Derives the tax-exclusive amount from a tax-inclusive one.
    ///
    /// `before = round(with / (1 + rate))`, computed as
    /// `with × 10000 / (10000 + bps)` on integers.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    /// use orderdesk_core::types::TaxRate;
    ///
    /// let vat = TaxRate::from_bps(1800);
    /// assert_eq!(Money::from_cents(100).tax_exclusive(vat).cents(), 85);
    /// assert_eq!(Money::from_cents(59).tax_exclusive(vat).cents(), 50);
    /// ```
    pub fn tax_exclusive(&self, rate: TaxRate) -> Money {
        let divisor = 10_000 + rate.bps() as i128;
        Money(round_div(self.0 as i128 * 10_000, divisor) as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Integer division rounding half away from zero.
///
/// `denominator` must be positive.
pub fn round_div(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering ("12.34"). Currency symbols are the portals' job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_from_major_str() {
        assert_eq!(Money::from_major_str("1"), Some(Money::from_cents(100)));
        assert_eq!(Money::from_major_str("1.5"), Some(Money::from_cents(150)));
        assert_eq!(Money::from_major_str(" 0.59 "), Some(Money::from_cents(59)));
        assert_eq!(Money::from_major_str(".5"), Some(Money::from_cents(50)));
        assert_eq!(Money::from_major_str("-2.345"), Some(Money::from_cents(-235)));
        assert_eq!(Money::from_major_str("2.344"), Some(Money::from_cents(234)));

        assert_eq!(Money::from_major_str(""), None);
        assert_eq!(Money::from_major_str("."), None);
        assert_eq!(Money::from_major_str("1,50"), None);
        assert_eq!(Money::from_major_str("1e3"), None);
    }

    #[test]
    fn test_from_major_f64_avoids_binary_drift() {
        // 0.285 * 100.0 == 28.499999999999996 in binary floating point
        assert_eq!(Money::from_major_f64(0.285), Some(Money::from_cents(29)));
        assert_eq!(Money::from_major_f64(1.0), Some(Money::from_cents(100)));
        assert_eq!(Money::from_major_f64(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_major_f64(f64::NAN), None);
        assert_eq!(Money::from_major_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_round_div_half_away_from_zero() {
        assert_eq!(round_div(5, 10), 1);
        assert_eq!(round_div(4, 10), 0);
        assert_eq!(round_div(-5, 10), -1);
        assert_eq!(round_div(-4, 10), 0);
        assert_eq!(round_div(15, 10), 2);
        assert_eq!(round_div(25, 10), 3);
    }

    #[test]
    fn test_vat_round_trip_on_catalog_prices() {
        let vat = TaxRate::from_bps(1800);
        let net = Money::from_cents(85);
        assert_eq!(net.with_tax(vat), Money::from_cents(100));
        assert_eq!(Money::from_cents(100).tax_exclusive(vat), net);
    }

    #[test]
    fn test_tax_exclusive_rounding() {
        let vat = TaxRate::from_bps(1800);
        // 10.00 / 1.18 = 8.4745... → 8.47
        assert_eq!(Money::from_cents(1000).tax_exclusive(vat).cents(), 847);
        // 0.01 / 1.18 = 0.0084... → 0.01
        assert_eq!(Money::from_cents(1).tax_exclusive(vat).cents(), 1);
        assert_eq!(Money::zero().tax_exclusive(vat), Money::zero());
        assert_eq!(Money::from_cents(500).tax_exclusive(TaxRate::zero()).cents(), 500);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }
}
