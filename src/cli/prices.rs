use super::{export, ui};
use crate::core::config::AppConfig;
use crate::core::donation::{DonationSplit, simulate_donation};
use crate::core::history::PriceHistory;
use crate::core::{PricePoint, PriceProvider};
use anyhow::Result;
use comfy_table::{Cell, Color};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 24h moves larger than this (in percent) trigger a volatility warning.
pub const VOLATILITY_THRESHOLD_PCT: f64 = 5.0;

const WIDTH: usize = 55;

/// Arrow and signed percentage, e.g. `↑ +1.25%`. A flat market shows `→ 0.00%`.
fn change_label(change: f64) -> String {
    if change > 0.0 {
        format!("↑ {change:+.2}%")
    } else if change < 0.0 {
        format!("↓ {change:.2}%")
    } else {
        "→ 0.00%".to_string()
    }
}

/// Formats one round of prices together with the donation simulation.
pub fn render_price_update(point: &PricePoint, split: &DonationSplit) -> String {
    let rule = ui::rule('─', WIDTH);
    let mut out = String::new();

    out.push_str(&format!("\n{rule}\n"));
    out.push_str(&format!(
        "  {}   |   Live Crypto Prices\n",
        point.observed_at.format("%H:%M:%S")
    ));
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!(
        "  ETH/USD:  {:>11}  {} (24h)\n",
        ui::usd(point.eth_usd),
        change_label(point.eth_change_24h)
    ));
    out.push_str(&format!(
        "  BTC/USD:  {:>11}  {} (24h)\n",
        ui::usd(point.btc_usd),
        change_label(point.btc_change_24h)
    ));
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!(
        "  Donation Simulation ({} ETH -> {} beneficiaries):\n",
        split.donation_eth.normalize(),
        split.beneficiary_count
    ));
    out.push_str(&format!(
        "     Total USD value:         {:>10}\n",
        ui::usd(split.donation_usd)
    ));
    out.push_str(&format!(
        "     Each beneficiary gets:   {:>10}  ({:.6} ETH)\n",
        ui::usd(split.share_usd),
        split.share_eth
    ));
    out.push_str(&format!(
        "     Dust (stays in pool):    {:>6} Wei\n",
        split.dust_wei
    ));
    out.push_str(&rule);

    if point.eth_change_24h.abs() > VOLATILITY_THRESHOLD_PCT {
        out.push('\n');
        out.push_str(&ui::style_text(
            &format!(
                "  HIGH VOLATILITY: ETH moved {:.1}% in 24h.",
                point.eth_change_24h.abs()
            ),
            ui::StyleType::Warning,
        ));
        out.push_str("\n      Consider USDC conversion at donation time for stability.");
    }

    out
}

/// Formats the collected history: each observation, the donation's USD value at
/// that time and its gain or loss against the value locked at the first observation.
pub fn render_history(history: &PriceHistory, donation_eth: Decimal) -> String {
    if history.len() < 2 {
        return ui::style_text(
            "Need at least 2 data points to show price history.",
            ui::StyleType::Subtle,
        );
    }

    let donation = donation_eth.to_f64().unwrap_or_default();
    let locked = history.first().map_or(0.0, |p| p.eth_usd * donation);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("ETH/USD"),
        ui::header_cell("24h"),
        ui::header_cell(&format!("{} ETH in USD", donation_eth.normalize())),
        ui::header_cell("vs USDC lock"),
    ]);

    for point in history.iter() {
        let value = point.eth_usd * donation;
        let diff = value - locked;
        let diff_cell = if diff >= 0.0 {
            Cell::new(format!("+{}", ui::usd(diff))).fg(Color::Green)
        } else {
            Cell::new(ui::usd(diff)).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(point.observed_at.format("%H:%M:%S").to_string()),
            ui::number_cell(ui::usd(point.eth_usd)),
            ui::change_cell(point.eth_change_24h),
            ui::number_cell(ui::usd(value)),
            diff_cell,
        ]);
    }

    let average = history.average_eth_usd().unwrap_or_default();
    let mut out = format!(
        "{}\n\n",
        ui::style_text("ETH Price History", ui::StyleType::Title)
    );
    out.push_str(&table.to_string());
    out.push_str(&format!(
        "\n\nAverage ETH/USD: {} (±5% band {} - {})",
        ui::style_text(&ui::usd(average), ui::StyleType::TotalValue),
        ui::usd(average * 0.95),
        ui::usd(average * 1.05)
    ));
    out.push_str(&format!(
        "\nUSDC locked at first observation: {}",
        ui::style_text(&ui::usd(locked), ui::StyleType::TotalLabel)
    ));
    out
}

/// Fetches once and simulates the donation. `None` when the round failed.
async fn poll_once(
    config: &AppConfig,
    provider: &(dyn PriceProvider + Send + Sync),
) -> Option<(PricePoint, DonationSplit)> {
    let point = match provider.fetch_prices().await {
        Ok(point) => point,
        Err(e) => {
            warn!(error = %e, "Price fetch failed");
            println!(
                "{}",
                ui::style_text(&format!("Price fetch failed: {e}"), ui::StyleType::Error)
            );
            return None;
        }
    };

    match simulate_donation(
        config.poller.donation_eth,
        point.eth_usd,
        config.poller.beneficiaries,
    ) {
        Ok(split) => Some((point, split)),
        Err(e) => {
            warn!(error = %e, "Donation simulation failed");
            println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            None
        }
    }
}

/// Single check: fetch, simulate and print once.
pub async fn run_single(
    config: &AppConfig,
    provider: &(dyn PriceProvider + Send + Sync),
) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices...");
    let round = poll_once(config, provider).await;
    pb.finish_and_clear();

    match round {
        Some((point, split)) => println!("{}", render_price_update(&point, &split)),
        None => println!("Could not fetch prices. Check internet connection."),
    }
    println!(
        "\n{}",
        ui::style_text(
            "Tip: run `allowance prices --live` for continuous tracking.",
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

/// Polls for `poller.iterations` rounds, or until `shutdown` resolves.
///
/// Every successful round is printed, appended to the history and written to the
/// price snapshot file.
pub async fn poll_prices<F>(
    config: &AppConfig,
    provider: &(dyn PriceProvider + Send + Sync),
    shutdown: F,
) -> Result<PriceHistory>
where
    F: Future<Output = ()>,
{
    let mut history = PriceHistory::new(config.poller.max_history_points);
    let interval = Duration::from_secs(config.poller.poll_interval_secs);
    let snapshot_path = config.output_path(export::PRICE_SNAPSHOT_FILE);
    let iterations = config.poller.iterations;
    tokio::pin!(shutdown);

    for i in 0..iterations {
        debug!(round = i + 1, iterations, "Polling prices");
        let round = tokio::select! {
            biased;
            _ = &mut shutdown => {
                println!("\nStopped by user.");
                break;
            }
            round = poll_once(config, provider) => round,
        };

        if let Some((point, split)) = round {
            println!("{}", render_price_update(&point, &split));
            if let Err(e) = export::write_price_snapshot(&snapshot_path, &point) {
                warn!(error = %e, "Could not save price snapshot");
            }
            history.push(point);
        }

        if i + 1 < iterations {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    println!("\nStopped by user.");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    Ok(history)
}

/// Live mode: poll until done or interrupted, then show the collected history.
pub async fn run_live(
    config: &AppConfig,
    provider: &(dyn PriceProvider + Send + Sync),
) -> Result<()> {
    let poller = &config.poller;
    println!(
        "\n{}",
        ui::style_text("Allowance Center - Live Price Feed Tracker", ui::StyleType::Title)
    );
    println!(
        "   Polling every {}s for {} iterations",
        poller.poll_interval_secs, poller.iterations
    );
    println!(
        "   Simulating: {} ETH donation -> {} beneficiaries",
        poller.donation_eth.normalize(),
        poller.beneficiaries
    );
    println!("   Press Ctrl+C to stop early");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    };
    let history = poll_prices(config, provider, shutdown).await?;
    info!(points = history.len(), "Live tracking finished");

    if !history.is_empty() {
        println!("\n{}", render_history(&history, poller.donation_eth));
    }
    Ok(())
}
