use super::{export, ui};
use crate::core::audit::{self, AuditSummary, CumulativeDonation, DailyActivity, DonorTotal};
use crate::core::config::{AppConfig, Network};
use crate::core::price::eth_price_or_fallback;
use crate::core::transaction::{RawTransaction, classify, classify_internal, short_addr};
use crate::core::{Address, PriceProvider, Transaction, TransactionClass, TransactionSource};
use anyhow::Result;
use comfy_table::{Cell, Color};
use tracing::{info, warn};

const TOP_DONORS: usize = 8;
const RECENT_HASHES: usize = 6;

impl AuditSummary {
    pub fn display_as_table(&self, contract: &Address, network: Network) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

        let rows: Vec<(&str, String)> = vec![
            ("Contract", contract.short(8, 6)),
            ("Network", network.to_string()),
            ("ETH Price", format!("{} USD", ui::usd(self.eth_price_usd))),
            ("Total Transactions", self.total_transactions.to_string()),
            ("Successful", self.successful.to_string()),
            ("Failed", self.failed.to_string()),
            ("Contract Calls (0 ETH)", self.zero_value_calls.to_string()),
            ("Donations Received", self.donations.to_string()),
            ("Unique Donors", self.unique_donors.to_string()),
            ("Total Donated (ETH)", format!("{:.6} ETH", self.total_donated_eth)),
            ("Total Donated (USD)", ui::usd(self.total_donated_usd)),
            ("Withdrawals", self.withdrawals.to_string()),
            ("Total Withdrawn (ETH)", format!("{:.6} ETH", self.total_withdrawn_eth)),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), ui::number_cell(value)]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Allowance Center - Audit Summary", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output
    }
}

/// Block and time ranges, the newest rows, recent hashes and recent payout traces.
pub fn render_chain_contents(
    transactions: &[Transaction],
    internal: &[Transaction],
    max_rows: usize,
) -> String {
    let (Some((first_block, last_block)), Some((first_time, last_time))) = (
        audit::block_range(transactions),
        audit::time_range(transactions),
    ) else {
        return "No blockchain contents available.".to_string();
    };

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Chain Contents (Latest Transactions)", ui::StyleType::Title)
    );
    output.push_str(&format!("Blocks covered: {first_block} -> {last_block}\n"));
    output.push_str(&format!(
        "Time range:     {} -> {}\n\n",
        first_time.format("%Y-%m-%d %H:%M:%S"),
        last_time.format("%Y-%m-%d %H:%M:%S")
    ));

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Block"),
        ui::header_cell("Time"),
        ui::header_cell("Type"),
        ui::header_cell("Value (ETH)"),
        ui::header_cell("Gas"),
        ui::header_cell("From"),
        ui::header_cell("To"),
    ]);

    let recent = audit::recent(transactions, max_rows);
    for tx in &recent {
        let type_cell = match tx.class {
            TransactionClass::Failed => Cell::new(tx.class.label()).fg(Color::Red),
            TransactionClass::Donation => Cell::new(tx.class.label()).fg(Color::Green),
            _ => Cell::new(tx.class.label()),
        };
        table.add_row(vec![
            ui::number_cell(tx.block_number.to_string()),
            Cell::new(tx.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            type_cell,
            ui::number_cell(format!("{:.6}", tx.value_eth)),
            ui::number_cell(tx.gas_used.to_string()),
            Cell::new(short_addr(&tx.from, 6, 4)),
            Cell::new(short_addr(tx.recipient().unwrap_or("<create>"), 6, 4)),
        ]);
    }
    output.push_str(&table.to_string());

    output.push_str("\n\nRecent tx hashes:");
    for tx in recent.iter().take(RECENT_HASHES) {
        output.push_str(&format!("\n  - {}", tx.hash));
    }

    let payouts = audit::recent(audit::payouts(internal), RECENT_HASHES);
    if !payouts.is_empty() {
        output.push_str("\nRecent withdrawal traces:");
        for tx in payouts {
            output.push_str(&format!(
                "\n  - {}  {:.6} ETH  -> {}",
                tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
                tx.value_eth,
                short_addr(&tx.to, 6, 4)
            ));
        }
    }
    output
}

pub fn render_top_donors(donors: &[DonorTotal]) -> String {
    if donors.is_empty() {
        return ui::style_text("No donor ranking yet.", ui::StyleType::Subtle);
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Donor"),
        ui::header_cell("ETH Donated"),
    ]);
    for (rank, donor) in donors.iter().enumerate() {
        table.add_row(vec![
            ui::number_cell((rank + 1).to_string()),
            Cell::new(short_addr(&donor.address, 6, 4)),
            ui::number_cell(format!("{:.4}", donor.total_eth)),
        ]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text("Top Donors by ETH Contributed", ui::StyleType::Title),
        table
    )
}

pub fn render_daily_activity(days: &[DailyActivity]) -> String {
    if days.is_empty() {
        return ui::style_text("No daily interaction data.", ui::StyleType::Subtle);
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Transactions")]);
    for day in days {
        table.add_row(vec![
            Cell::new(day.date.format("%Y-%m-%d").to_string()),
            ui::number_cell(day.count.to_string()),
        ]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text("Daily Contract Interactions", ui::StyleType::Title),
        table
    )
}

pub fn render_cumulative_donations(steps: &[CumulativeDonation]) -> String {
    if steps.is_empty() {
        return ui::style_text("No cumulative donation value yet.", ui::StyleType::Subtle);
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("Donation (ETH)"),
        ui::header_cell("Raised (ETH)"),
        ui::header_cell("Raised (USD)"),
    ]);
    for step in steps {
        table.add_row(vec![
            Cell::new(step.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            ui::number_cell(format!("{:.6}", step.value_eth)),
            ui::number_cell(format!("{:.6}", step.cumulative_wei.to_eth_f64())),
            ui::number_cell(ui::usd(step.cumulative_usd)),
        ]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text("Cumulative USD Raised", ui::StyleType::Title),
        table
    )
}

/// Gas per transaction in block order, failed rows in red.
pub fn render_gas_usage(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return ui::style_text("No gas data.", ui::StyleType::Subtle);
    }
    let mut rows: Vec<&Transaction> = transactions.iter().collect();
    rows.sort_by_key(|tx| tx.block_number);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Block"),
        ui::header_cell("Gas Used"),
        ui::header_cell("Status"),
    ]);
    for tx in rows {
        let status = if tx.is_error {
            Cell::new("FAILED").fg(Color::Red)
        } else {
            Cell::new("OK")
        };
        table.add_row(vec![
            ui::number_cell(tx.block_number.to_string()),
            ui::number_cell(ui::with_thousands(tx.gas_used as f64, 0)),
            status,
        ]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text("Gas Used by Transaction", ui::StyleType::Title),
        table
    )
}

fn rows_or_empty(result: Result<Vec<RawTransaction>>, what: &str) -> Vec<RawTransaction> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "Fetching {what} failed");
        println!(
            "{}",
            ui::style_text(&format!("Could not fetch {what}: {e}"), ui::StyleType::Error)
        );
        Vec::new()
    })
}

/// Everything an audit run produced, kept for callers that want more than the console output.
#[derive(Debug)]
pub struct AuditOutcome {
    pub summary: AuditSummary,
    pub transactions: Vec<Transaction>,
    pub internal: Vec<Transaction>,
    pub exported_rows: usize,
}

pub async fn run(
    config: &AppConfig,
    price_provider: &(dyn PriceProvider + Send + Sync),
    source: &(dyn TransactionSource + Send + Sync),
) -> Result<Option<AuditOutcome>> {
    let auditor = &config.auditor;
    let contract = auditor.contract()?;
    if auditor.api_key.trim().is_empty() {
        warn!("auditor.api_key is empty; the explorer will likely reject requests");
    }

    let pb = ui::new_spinner("Fetching live ETH price...");
    let (eth_price, live) = eth_price_or_fallback(price_provider, auditor.fallback_eth_price).await;
    pb.set_message(format!("Fetching transactions for {}...", contract.short(8, 6)));
    let raw = rows_or_empty(source.fetch_transactions(&contract).await, "transactions");
    let raw_internal = rows_or_empty(
        source.fetch_internal_transactions(&contract).await,
        "internal transactions",
    );
    pb.finish_and_clear();

    if live {
        println!("Live ETH Price: {}", ui::usd(eth_price));
    } else {
        println!(
            "{}",
            ui::style_text(
                &format!("Could not fetch live price. Using {} fallback.", ui::usd(eth_price)),
                ui::StyleType::Warning
            )
        );
    }

    let transactions: Vec<Transaction> = raw.iter().map(|r| classify(r, &contract)).collect();
    let internal: Vec<Transaction> = raw_internal
        .iter()
        .map(|r| classify_internal(r, &contract))
        .collect();
    info!(
        transactions = transactions.len(),
        internal = internal.len(),
        "Classified contract history"
    );

    if transactions.is_empty() {
        println!("\nNo transactions yet. Interact with the contract first, then re-run.");
        return Ok(None);
    }

    let summary = audit::summarize(&transactions, &internal, eth_price);
    println!("\n{}", summary.display_as_table(&contract, auditor.network));
    println!(
        "\n{}",
        render_chain_contents(&transactions, &internal, auditor.recent_rows)
    );
    println!(
        "\n{}",
        render_top_donors(&audit::top_donors(&transactions, TOP_DONORS))
    );
    println!(
        "\n{}",
        render_cumulative_donations(&audit::cumulative_donations(&transactions, eth_price))
    );
    println!(
        "\n{}",
        render_daily_activity(&audit::daily_activity(&transactions))
    );
    println!("\n{}", render_gas_usage(&transactions));

    let csv_path = config.output_path(export::AUDIT_CSV_FILE);
    let exported_rows =
        export::write_audit_csv(&csv_path, &transactions, &internal, eth_price, auditor.network)?;
    println!("\nAudit CSV exported to: {}", csv_path.display());

    Ok(Some(AuditOutcome {
        summary,
        transactions,
        internal,
        exported_rows,
    }))
}
