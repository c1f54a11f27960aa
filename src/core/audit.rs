//! Aggregates classified transactions into an audit summary and the supporting breakdowns.
use crate::core::transaction::{Transaction, TransactionClass};
use crate::core::units::Wei;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Totals over one audit run. Recomputed every run, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditSummary {
    pub total_transactions: usize,
    pub successful: usize,
    pub failed: usize,
    pub zero_value_calls: usize,
    pub donations: usize,
    pub unique_donors: usize,
    pub total_donated_wei: Wei,
    pub total_donated_eth: f64,
    pub total_donated_usd: f64,
    pub withdrawals: usize,
    pub total_withdrawn_eth: f64,
    pub eth_price_usd: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonorTotal {
    pub address: String,
    pub total_eth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub count: usize,
}

/// Computes the audit summary.
///
/// `transactions` are top-level rows, `internal` are internal traces; both are
/// expected to be classified already. The price is passed in so the result only
/// depends on its inputs.
pub fn summarize(
    transactions: &[Transaction],
    internal: &[Transaction],
    eth_price: f64,
) -> AuditSummary {
    let donations: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.class == TransactionClass::Donation)
        .collect();

    let unique_donors = donations
        .iter()
        .map(|tx| tx.from.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_donated_wei: Wei = donations.iter().map(|tx| tx.value_wei).sum();
    let total_donated_eth: f64 = donations.iter().map(|tx| tx.value_eth).sum();

    let failed = transactions.iter().filter(|tx| tx.is_error).count();
    let payouts = payouts(internal);

    AuditSummary {
        total_transactions: transactions.len(),
        successful: transactions.len() - failed,
        failed,
        zero_value_calls: transactions
            .iter()
            .filter(|tx| tx.class == TransactionClass::CallZeroValue)
            .count(),
        donations: donations.len(),
        unique_donors,
        total_donated_wei,
        total_donated_eth,
        total_donated_usd: total_donated_eth * eth_price,
        withdrawals: payouts.len(),
        total_withdrawn_eth: payouts.iter().map(|tx| tx.value_eth).sum(),
        eth_price_usd: eth_price,
    }
}

/// Internal traces that paid value out of the contract.
pub fn payouts(internal: &[Transaction]) -> Vec<&Transaction> {
    internal
        .iter()
        .filter(|tx| tx.class == TransactionClass::Withdrawal)
        .collect()
}

/// Donors ranked by total ETH contributed, largest first. Ties keep address order.
pub fn top_donors(transactions: &[Transaction], limit: usize) -> Vec<DonorTotal> {
    let mut totals: HashMap<&str, Wei> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.class == TransactionClass::Donation)
    {
        let entry = totals.entry(tx.from.as_str()).or_default();
        *entry = *entry + tx.value_wei;
    }

    let mut ranked: Vec<(&str, Wei)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(address, wei)| DonorTotal {
            address: address.to_string(),
            total_eth: wei.to_eth_f64(),
        })
        .collect()
}

/// Interactions per UTC calendar day, oldest first. Days without activity are omitted.
pub fn daily_activity(transactions: &[Transaction]) -> Vec<DailyActivity> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for tx in transactions {
        *per_day.entry(tx.timestamp.date_naive()).or_default() += 1;
    }
    per_day
        .into_iter()
        .map(|(date, count)| DailyActivity { date, count })
        .collect()
}

/// One step of the running donation total.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeDonation {
    pub timestamp: DateTime<Utc>,
    pub value_eth: f64,
    pub cumulative_wei: Wei,
    pub cumulative_usd: f64,
}

/// Running total of donations in time order, valued at `eth_price`.
pub fn cumulative_donations(transactions: &[Transaction], eth_price: f64) -> Vec<CumulativeDonation> {
    let mut donations: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.class == TransactionClass::Donation)
        .collect();
    donations.sort_by_key(|tx| tx.timestamp);

    let mut running = Wei::ZERO;
    donations
        .into_iter()
        .map(|tx| {
            running = running + tx.value_wei;
            CumulativeDonation {
                timestamp: tx.timestamp,
                value_eth: tx.value_eth,
                cumulative_wei: running,
                cumulative_usd: running.to_eth_f64() * eth_price,
            }
        })
        .collect()
}

pub fn block_range(transactions: &[Transaction]) -> Option<(u64, u64)> {
    let min = transactions.iter().map(|tx| tx.block_number).min()?;
    let max = transactions.iter().map(|tx| tx.block_number).max()?;
    Some((min, max))
}

pub fn time_range(transactions: &[Transaction]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let min = transactions.iter().map(|tx| tx.timestamp).min()?;
    let max = transactions.iter().map(|tx| tx.timestamp).max()?;
    Some((min, max))
}

/// The `n` newest rows, newest first.
pub fn recent<'a, I>(transactions: I, n: usize) -> Vec<&'a Transaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut rows: Vec<&Transaction> = transactions.into_iter().collect();
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    rows.truncate(n);
    rows
}
