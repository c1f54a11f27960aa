//! File outputs: the latest-price snapshot and the audit CSV.
use crate::core::config::Network;
use crate::core::{PricePoint, PriceSnapshot, Transaction, TransactionClass};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const PRICE_SNAPSHOT_FILE: &str = "latest_prices.json";
pub const AUDIT_CSV_FILE: &str = "audit_export.csv";

pub fn write_price_snapshot(path: &Path, point: &PricePoint) -> Result<()> {
    let json = serde_json::to_string_pretty(&PriceSnapshot::from(point))
        .context("Failed to serialize price snapshot")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write price snapshot to {}", path.display()))?;
    debug!("Wrote price snapshot to {}", path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct AuditCsvRow<'a> {
    hash: &'a str,
    timestamp: String,
    from: &'a str,
    to: &'a str,
    value_eth: f64,
    is_error: bool,
    gas_used: u64,
    block_num: u64,
    value_usd: f64,
    direction: &'static str,
    tx_type: &'static str,
    explorer_url: String,
}

fn tx_type(tx: &Transaction) -> &'static str {
    match tx.class {
        TransactionClass::Donation => "DONATION",
        TransactionClass::Withdrawal => "WITHDRAWAL",
        TransactionClass::CallZeroValue => "CALL_0_ETH",
        TransactionClass::Failed => "FAILED",
        TransactionClass::Unrelated => "INTERNAL",
    }
}

fn row<'a>(
    tx: &'a Transaction,
    eth_price: f64,
    network: Network,
    direction: &'static str,
    tx_type: &'static str,
) -> AuditCsvRow<'a> {
    AuditCsvRow {
        hash: &tx.hash,
        timestamp: tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        from: &tx.from,
        to: &tx.to,
        value_eth: tx.value_eth,
        is_error: tx.is_error,
        gas_used: tx.gas_used,
        block_num: tx.block_number,
        value_usd: tx.value_eth * eth_price,
        direction,
        tx_type,
        explorer_url: format!("{}{}", network.explorer_tx_url(), tx.hash),
    }
}

/// Writes every top-level transaction followed by the internal payouts.
///
/// Returns the number of data rows written.
pub fn write_audit_csv(
    path: &Path,
    transactions: &[Transaction],
    internal: &[Transaction],
    eth_price: f64,
    network: Network,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    let mut written = 0;
    for tx in transactions {
        let direction = if tx.is_incoming { "INCOMING" } else { "OUTGOING" };
        writer.serialize(row(tx, eth_price, network, direction, tx_type(tx)))?;
        written += 1;
    }
    for tx in internal
        .iter()
        .filter(|tx| tx.class == TransactionClass::Withdrawal)
    {
        writer.serialize(row(tx, eth_price, network, "OUTGOING", "WITHDRAWAL_INTERNAL"))?;
        written += 1;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write CSV file {}", path.display()))?;
    debug!(rows = written, "Exported audit CSV to {}", path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Address, RawTransaction, classify, classify_internal};
    use tempfile::TempDir;

    const CONTRACT: &str = "0x00000000000000000000000000000000000000aa";
    const DONOR: &str = "0x00000000000000000000000000000000000000d1";

    fn raw(hash: &str, from: &str, to: &str, value: &str, is_error: &str) -> RawTransaction {
        RawTransaction {
            hash: hash.to_string(),
            time_stamp: "1712000000".to_string(),
            block_number: "5000000".to_string(),
            from: from.to_string(),
            to: Some(to.to_string()),
            value: value.to_string(),
            gas_used: "42000".to_string(),
            is_error: is_error.to_string(),
        }
    }

    #[test]
    fn test_writes_price_snapshot() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(PRICE_SNAPSHOT_FILE);
        let point = PricePoint {
            eth_usd: 2500.5,
            eth_change_24h: 1.0,
            btc_usd: 61000.0,
            btc_change_24h: 2.0,
            observed_at: "2024-04-01T10:00:00Z".parse()?,
        };

        write_price_snapshot(&path, &point)?;

        let snapshot: PriceSnapshot = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(snapshot, PriceSnapshot::from(&point));
        Ok(())
    }

    #[test]
    fn test_exports_normal_rows_and_payouts() -> Result<()> {
        let contract: Address = CONTRACT.parse()?;
        let transactions = vec![
            classify(&raw("0x01", DONOR, CONTRACT, "100000000000000000", "0"), &contract),
            classify(&raw("0x02", DONOR, CONTRACT, "0", "0"), &contract),
            classify(&raw("0x03", DONOR, CONTRACT, "5", "1"), &contract),
        ];
        let internal = vec![
            classify_internal(&raw("0x04", CONTRACT, DONOR, "20000000000000000", "0"), &contract),
            classify_internal(&raw("0x05", DONOR, CONTRACT, "1", "0"), &contract),
        ];

        let dir = TempDir::new()?;
        let path = dir.path().join(AUDIT_CSV_FILE);
        let written = write_audit_csv(&path, &transactions, &internal, 2000.0, Network::Sepolia)?;
        assert_eq!(written, 4);

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "hash", "timestamp", "from", "to", "value_eth", "is_error", "gas_used",
                "block_num", "value_usd", "direction", "tx_type", "explorer_url"
            ]
        );

        let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
        assert_eq!(records.len(), 4);
        assert_eq!(&records[0][10], "DONATION");
        assert_eq!(&records[0][9], "INCOMING");
        assert_eq!(records[0][8].parse::<f64>()?, 200.0);
        assert_eq!(&records[0][11], "https://sepolia.etherscan.io/tx/0x01");
        assert_eq!(&records[1][10], "CALL_0_ETH");
        assert_eq!(&records[2][10], "FAILED");
        assert_eq!(&records[3][10], "WITHDRAWAL_INTERNAL");
        assert_eq!(&records[3][9], "OUTGOING");
        assert_eq!(&records[3][1], "2024-04-01 19:33:20");
        Ok(())
    }
}
