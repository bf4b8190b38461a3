//! # Money Module
//!
//! Integer-cents money and basis-point tax rates.
//!
//! ## Where Floats Are Allowed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSIDE THE ENGINE            │  AT THE STORAGE BOUNDARY                │
//! │                               │                                         │
//! │  Money(i64) cents             │  JSON number / REAL column              │
//! │  subtotal = Σ price × qty     │  150.5  ◄── to_decimal()                │
//! │  tax = (cents×bps+5000)/1e4   │  150.5  ──► from_decimal() → 15050¢     │
//! │  total = subtotal + tax       │                                         │
//! │                               │  Only whole cents ever cross.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store files and mirror documents hold prices as decimal major units so
//! other tools reading the same schema see `55.0`, not `5500`. Reading a
//! decimal back rounds to the nearest cent, so the representation is exact
//! for anything the engine itself wrote.
//!
//! ## Usage
//! ```rust
//! use stockbook_core::money::{Money, TaxRate};
//!
//! let price = Money::from_cents(5_000);           // 50.00
//! let subtotal = price.multiply_quantity(3);      // 150.00
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(700));
//! assert_eq!((subtotal + tax).cents(), 16_050);   // 160.50
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in cents.
///
/// Serializes as a decimal number of major units (see module docs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 50).cents(), 1050);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts a decimal amount of major units, rounding to the nearest cent.
    ///
    /// Returns `None` for NaN, infinities and values outside the i64 cent
    /// range. Only document and column decoding should need this.
    ///
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(10.5), Some(Money::from_cents(1050)));
    /// assert_eq!(Money::from_decimal(0.07), Some(Money::from_cents(7)));
    /// assert_eq!(Money::from_decimal(f64::NAN), None);
    /// ```
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the amount as decimal major units (`1050` cents → `10.5`).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Calculates tax, rounding half up to the cent.
    ///
    /// Integer math throughout: `(amount × bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use stockbook_core::money::{Money, TaxRate};
    ///
    /// let tax = Money::from_cents(15_000).calculate_tax(TaxRate::from_bps(700));
    /// assert_eq!(tax.cents(), 1_050);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 so large subtotals cannot overflow before the division
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// Arithmetic saturates at the i64 cent range instead of wrapping or
// panicking. Validated prices keep real sales far below it.

/// Plain `10.50` formatting for logs and the CLI. No currency symbol: the
/// engine does not know which currency the shop uses.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        f.pad(&format!("{}{}.{:02}", sign, self.major().abs(), self.minor()))
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::from_decimal(amount)
            .ok_or_else(|| de::Error::custom(format!("invalid monetary amount: {amount}")))
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%, so 700 bps = 7%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (`7.0` → 700 bps).
    ///
    /// Negative or non-finite input yields a zero rate.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return TaxRate(0);
        }
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// For display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
