//! Explorer rows and their classification.
use crate::core::units::Wei;
use alloy_primitives::hex::{self, FromHexError};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid address {input}: {source}")]
pub struct AddressError {
    input: String,
    #[source]
    source: FromHexError,
}

/// A 20-byte account address with its lower-case `0x` hex form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    inner: alloy_primitives::Address,
    hex: String,
}

impl Address {
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    pub fn as_alloy(&self) -> alloy_primitives::Address {
        self.inner
    }

    /// True when `other` parses to the same address, whatever its letter case.
    pub fn matches(&self, other: &str) -> bool {
        other
            .trim()
            .parse::<alloy_primitives::Address>()
            .is_ok_and(|addr| addr == self.inner)
    }

    /// Shortened label such as `0x1234...abcd`.
    pub fn short(&self, left: usize, right: usize) -> String {
        short_addr(&self.hex, left, right)
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(inner: alloy_primitives::Address) -> Self {
        Address {
            inner,
            hex: hex::encode_prefixed(inner.as_slice()),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<alloy_primitives::Address>()
            .map(Address::from)
            .map_err(|source| AddressError {
                input: s.to_string(),
                source,
            })
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Shortens an address for table labels. Short or empty strings are returned as-is.
pub fn short_addr(addr: &str, left: usize, right: usize) -> String {
    if addr.len() < left + right + 3 || !addr.is_ascii() {
        return addr.to_string();
    }
    format!("{}...{}", &addr[..left], &addr[addr.len() - right..])
}

/// One row of a `txlist` or `txlistinternal` response, kept as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    pub hash: String,
    pub time_stamp: String,
    pub block_number: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub gas_used: String,
    pub is_error: String,
}

fn text_field(row: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

impl RawTransaction {
    /// Reads one explorer row. Fields may arrive as strings or numbers; missing or
    /// null fields become empty and later parse as zero. `None` for non-object rows.
    pub fn from_json(row: &Value) -> Option<Self> {
        let row = row.as_object()?;
        let field = |key: &str| text_field(row, key).unwrap_or_default();
        Some(RawTransaction {
            hash: field("hash"),
            time_stamp: field("timeStamp"),
            block_number: field("blockNumber"),
            from: field("from"),
            to: text_field(row, "to"),
            value: field("value"),
            gas_used: field("gasUsed"),
            is_error: field("isError"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Normal,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionClass {
    Donation,
    Withdrawal,
    CallZeroValue,
    Failed,
    /// An internal trace that is not a payout from the contract.
    Unrelated,
}

impl TransactionClass {
    /// Short label used in terminal tables.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionClass::Donation => "DONATION",
            TransactionClass::Withdrawal => "WITHDRAW",
            TransactionClass::CallZeroValue => "CALL(0ETH)",
            TransactionClass::Failed => "FAILED",
            TransactionClass::Unrelated => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    pub value_wei: Wei,
    pub value_eth: f64,
    pub gas_used: u64,
    pub is_incoming: bool,
    pub is_error: bool,
    pub kind: TransactionKind,
    pub class: TransactionClass,
}

impl Transaction {
    pub fn has_value(&self) -> bool {
        !self.value_wei.is_zero()
    }

    /// `None` for contract creations, which have no recipient.
    pub fn recipient(&self) -> Option<&str> {
        if self.to.is_empty() {
            None
        } else {
            Some(&self.to)
        }
    }
}

fn parse_u64(value: &str) -> u64 {
    value.trim().parse().unwrap_or(0)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    let secs = value.trim().parse::<i64>().unwrap_or(0);
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn augment(raw: &RawTransaction, contract: &Address, kind: TransactionKind) -> Transaction {
    let value_wei = Wei::parse(&raw.value).unwrap_or_default();
    let to = raw.to.as_deref().unwrap_or_default().trim().to_ascii_lowercase();
    Transaction {
        hash: raw.hash.clone(),
        timestamp: parse_timestamp(&raw.time_stamp),
        block_number: parse_u64(&raw.block_number),
        from: raw.from.trim().to_ascii_lowercase(),
        is_incoming: contract.matches(&to),
        to,
        value_wei,
        value_eth: value_wei.to_eth_f64(),
        gas_used: parse_u64(&raw.gas_used),
        is_error: parse_u64(&raw.is_error) == 1,
        kind,
        class: TransactionClass::CallZeroValue,
    }
}

/// Class of a top-level transaction. The first matching rule wins.
pub fn class_of(is_error: bool, is_incoming: bool, has_value: bool) -> TransactionClass {
    if is_error {
        TransactionClass::Failed
    } else if is_incoming && has_value {
        TransactionClass::Donation
    } else if has_value {
        TransactionClass::Withdrawal
    } else {
        TransactionClass::CallZeroValue
    }
}

/// Classifies a top-level transaction sent to or from `contract`.
pub fn classify(raw: &RawTransaction, contract: &Address) -> Transaction {
    let mut tx = augment(raw, contract, TransactionKind::Normal);
    tx.class = class_of(tx.is_error, tx.is_incoming, tx.has_value());
    tx
}

/// Classifies an internal value transfer.
///
/// Only transfers leaving the contract with value count as withdrawals. A payout
/// loop inside one external call shows up as several of these under the same hash.
pub fn classify_internal(raw: &RawTransaction, contract: &Address) -> Transaction {
    let mut tx = augment(raw, contract, TransactionKind::Internal);
    tx.class = if tx.is_error {
        TransactionClass::Failed
    } else if contract.matches(&tx.from) && tx.has_value() {
        TransactionClass::Withdrawal
    } else {
        TransactionClass::Unrelated
    };
    tx
}
