//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A GST split in floating point:                                         │
//! │    ₹333.33 × 9% = 29.9997 (CGST) + 29.9997 (SGST)                       │
//! │    Rounded per component vs rounded once → invoices disagree by 1p      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    33333 paise × 900 bps → 3000 paise per component, always           │
//! │    Every total is a sum of already-rounded integers, so it reconciles   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tradelink_core::money::Money;
//!
//! let price = Money::from_paise(10_000); // ₹100.00
//! let line = price.multiply_quantity(2); // ₹200.00
//! assert_eq!(line.paise(), 20_000);
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

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts and round-off can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_paise ──► LineItem.unit_price ──► LineItem.line_total    │
/// │                                                       │                 │
/// │                              GstBreakdown::compute ◄──┘                 │
/// │                                       │                                 │
/// │  Order.subtotal / tax / total ◄───────┤                                 │
/// │  Invoice.grand_total / balance ◄──────┘                                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tradelink_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates the tax on this amount at `rate`, rounding half up to the paisa.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 is half of the 10000 divisor, so x.5 paise rounds up.
    ///
    /// ## Example
    /// ```rust
    /// use tradelink_core::money::Money;
    /// use tradelink_core::types::TaxRate;
    ///
    /// let line = Money::from_paise(20_000);   // ₹200.00
    /// let cgst = TaxRate::from_bps(900);      // 9%
    /// assert_eq!(line.calculate_tax(cgst).paise(), 1_800);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_paise(tax as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rupee rendering. Localised formatting is a client concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}₹{}.{:02}", sign, abs / 100, abs % 100)
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
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise_and_rupees() {
        assert_eq!(Money::from_paise(1099).paise(), 1099);
        assert_eq!(Money::from_rupees(100).paise(), 10_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_paise(1099)), "₹10.99");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_tax_nine_percent_of_two_hundred() {
        let line = Money::from_rupees(200);
        assert_eq!(line.calculate_tax(TaxRate::from_bps(900)).paise(), 1_800);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 50 paise at 9% = 4.5 paise → 5
        assert_eq!(Money::from_paise(50).calculate_tax(TaxRate::from_bps(900)).paise(), 5);
        // 49 paise at 9% = 4.41 paise → 4
        assert_eq!(Money::from_paise(49).calculate_tax(TaxRate::from_bps(900)).paise(), 4);
    }

    #[test]
    fn test_tax_on_large_amounts_does_not_overflow() {
        let huge = Money::from_paise(i64::MAX / 2);
        let tax = huge.calculate_tax(TaxRate::from_bps(2800));
        assert!(tax > Money::zero());
    }
}
