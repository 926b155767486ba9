//! Fixed-point decimal newtypes for prices, quantities and money.
//!
//! Every monetary quantity in the simulation is an exact `rust_decimal::Decimal`;
//! binary floating point never appears on a money or quantity field. Per §3 of
//! the specification: quantities and prices carry 8 fractional digits, money
//! (cash, P&L, margin) carries 2. Intermediate arithmetic is done at full
//! `Decimal` precision; rounding to the canonical scale happens only at the
//! newtype constructors, i.e. at the persistence/construction boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

const QUANTITY_SCALE: u32 = 8;
const PRICE_SCALE: u32 = 8;
const MONEY_SCALE: u32 = 2;

macro_rules! decimal_newtype {
    ($name:ident, $scale:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Decimal);

        impl $name {
            pub const ZERO: $name = $name(Decimal::ZERO);

            /// Construct from a raw decimal, rounding to this type's canonical scale.
            pub fn new(value: Decimal) -> Self {
                Self(value.round_dp($scale))
            }

            pub fn as_decimal(&self) -> Decimal {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn is_positive(&self) -> bool {
                self.0.is_sign_positive() && !self.0.is_zero()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for Decimal {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: Self) -> Self {
                $name::new(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: Self) -> Self {
                $name::new(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> Self {
                $name::new(-self.0)
            }
        }
    };
}

decimal_newtype!(Price, PRICE_SCALE, "A market price, 8 fractional digits.");
decimal_newtype!(Quantity, QUANTITY_SCALE, "A position/order quantity, 8 fractional digits.");
decimal_newtype!(Money, MONEY_SCALE, "A monetary amount (cash, P&L, margin), 2 fractional digits.");

impl Mul<Price> for Quantity {
    type Output = Money;
    fn mul(self, rhs: Price) -> Money {
        Money::new(self.0 * rhs.0)
    }
}

impl Mul<Quantity> for Price {
    type Output = Money;
    fn mul(self, rhs: Quantity) -> Money {
        Money::new(self.0 * rhs.0)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;
    fn div(self, rhs: Decimal) -> Money {
        Money::new(self.0 / rhs)
    }
}

impl Quantity {
    pub fn must_be_positive(self) -> Result<Self, crate::errors::DomainError> {
        if self.0 <= Decimal::ZERO {
            Err(crate::errors::DomainError::InvalidQuantity(self.0))
        } else {
            Ok(self)
        }
    }
}
