//! Simulates how a donation is split evenly among beneficiaries.
use crate::core::units::Wei;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DonationError {
    #[error("beneficiary count must be at least 1")]
    InvalidBeneficiaryCount,
    #[error("donation amount must be positive, got {0} ETH")]
    InvalidDonationAmount(Decimal),
    #[error("donation amount {0} ETH does not fit in wei")]
    AmountOverflow(Decimal),
}

/// The result of splitting one donation.
///
/// `dust_wei` is what stays in the pool when the contract divides the wei
/// amount with integer division.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationSplit {
    pub donation_eth: Decimal,
    pub donation_usd: f64,
    pub beneficiary_count: u32,
    pub share_eth: f64,
    pub share_usd: f64,
    pub dust_wei: Wei,
}

pub fn simulate_donation(
    donation_eth: Decimal,
    eth_price: f64,
    beneficiary_count: u32,
) -> Result<DonationSplit, DonationError> {
    if beneficiary_count == 0 {
        return Err(DonationError::InvalidBeneficiaryCount);
    }
    if donation_eth <= Decimal::ZERO {
        return Err(DonationError::InvalidDonationAmount(donation_eth));
    }

    let donation_wei =
        Wei::from_eth(donation_eth).ok_or(DonationError::AmountOverflow(donation_eth))?;
    let dust_wei = donation_wei
        .dust(beneficiary_count)
        .ok_or(DonationError::InvalidBeneficiaryCount)?;

    let eth = donation_eth.to_f64().unwrap_or_default();
    let donation_usd = eth * eth_price;
    let parts = f64::from(beneficiary_count);

    Ok(DonationSplit {
        donation_eth,
        donation_usd,
        beneficiary_count,
        share_eth: eth / parts,
        share_usd: donation_usd / parts,
        dust_wei,
    })
}
