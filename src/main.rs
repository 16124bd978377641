mod config;
mod control;
mod display;
mod market_data;
mod metrics;
mod state;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use config::Config;
use control::run_precision_control;
use display::run_display;
use market_data::adapters::bitfinex::run_bitfinex_adapter;
use market_data::book_worker::run_book_worker;
use state::book::Book;

/// Main adapter→worker channel buffer.
/// Sized to absorb WebSocket bursts without back-pressuring the adapter.
const ADAPTER_CHANNEL_BUFFER: usize = 4_096;

/// Control-plane commands are rare; a small buffer is plenty.
const COMMAND_CHANNEL_BUFFER: usize = 8;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = Config::from_env()?;
    metrics::prometheus::init_metrics_server(cfg.metrics_port);

    info!(
        symbol = %cfg.symbol,
        precision = %cfg.precision,
        frequency = %cfg.frequency,
        "orderbook-engine starting"
    );

    let (event_tx, event_rx) = mpsc::channel(ADAPTER_CHANNEL_BUFFER);
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
    let (book_tx, book_rx) = watch::channel(Book::new());

    let adapter_handle = tokio::spawn(run_bitfinex_adapter(cfg.clone(), event_tx, cmd_rx));
    let worker_handle = tokio::spawn(run_book_worker(event_rx, book_tx));
    tokio::spawn(run_display(
        book_rx,
        cfg.display_depth,
        Duration::from_millis(cfg.display_interval_ms),
    ));
    tokio::spawn(run_precision_control(cfg.precision, cmd_tx));

    tokio::select! {
        res = adapter_handle => {
            match res {
                Ok(Ok(())) => warn!("feed adapter exited"),
                Ok(Err(err)) => warn!(error = %err, "feed adapter returned error"),
                Err(err) => warn!(error = %err, "feed adapter task panicked"),
            }
        }
        res = worker_handle => {
            match res {
                Ok(Ok(())) => warn!("book worker exited"),
                Ok(Err(err)) => warn!(error = %err, "book worker returned error"),
                Err(err) => warn!(error = %err, "book worker task panicked"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
