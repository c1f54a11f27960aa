//! On-chain amount handling.
//!
//! Amounts that mirror contract arithmetic are kept as integer [`Wei`]. Values
//! shown to people (ETH as a float, USD) are derived from it and never fed back.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Add;

/// Number of wei in one ETH.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// An integer amount in the smallest on-chain unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    /// Converts a decimal ETH amount to wei, truncating anything below one wei.
    ///
    /// Returns `None` for negative amounts or amounts that do not fit in `u128`.
    pub fn from_eth(eth: Decimal) -> Option<Wei> {
        if eth.is_sign_negative() && !eth.is_zero() {
            return None;
        }
        eth.checked_mul(Decimal::from(WEI_PER_ETH as u64))
            .map(|wei| wei.trunc())
            .and_then(|wei| wei.to_u128())
            .map(Wei)
    }

    /// Parses a base-10 wei string as delivered by explorer APIs.
    pub fn parse(value: &str) -> Option<Wei> {
        value.trim().parse::<u128>().ok().map(Wei)
    }

    /// Remainder left after splitting this amount evenly into `parts`.
    ///
    /// `None` when `parts` is zero.
    pub fn dust(self, parts: u32) -> Option<Wei> {
        self.0.checked_rem(u128::from(parts)).map(Wei)
    }

    /// Floating-point ETH, for display and USD conversion only.
    pub fn to_eth_f64(self) -> f64 {
        self.0 as f64 / WEI_PER_ETH as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Wei {
    type Output = Wei;

    fn add(self, rhs: Wei) -> Wei {
        Wei(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Wei {
    fn sum<I: Iterator<Item = Wei>>(iter: I) -> Wei {
        iter.fold(Wei::ZERO, |acc, w| acc + w)
    }
}

impl Display for Wei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
