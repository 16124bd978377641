use anyhow::{Context, Result};

use crate::market_data::types::{Frequency, Precision};

const DEFAULT_WS_URL: &str = "wss://api-pub.bitfinex.com/ws/2";
const DEFAULT_SYMBOL: &str = "tBTCUSD";

/// Engine configuration, environment-driven.
#[derive(Debug, Clone)]
pub struct Config {
    pub ws_url: String,
    pub symbol: String,
    /// Initial aggregation level; the control task can change it at runtime.
    pub precision: Precision,
    pub frequency: Frequency,
    pub display_depth: usize,
    pub display_interval_ms: u64,
    pub metrics_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();

        let precision = match std::env::var("BOOK_PRECISION") {
            Ok(raw) => {
                let level: u8 = raw
                    .parse()
                    .with_context(|| format!("BOOK_PRECISION must be an integer, got {raw}"))?;
                Precision::new(level)
                    .with_context(|| format!("BOOK_PRECISION must be 0..=4, got {level}"))?
            }
            Err(_) => Precision::default(),
        };

        let frequency = match std::env::var("BOOK_FREQUENCY") {
            Ok(raw) => Frequency::from_param(&raw)
                .with_context(|| format!("BOOK_FREQUENCY must be F0 or F1, got {raw}"))?,
            Err(_) => Frequency::default(),
        };

        Ok(Self {
            ws_url: std::env::var("BITFINEX_WS_URL")
                .unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
            symbol: std::env::var("BOOK_SYMBOL").unwrap_or_else(|_| DEFAULT_SYMBOL.to_string()),
            precision,
            frequency,
            display_depth: parse_or("DISPLAY_DEPTH", 10)?,
            display_interval_ms: parse_or("DISPLAY_INTERVAL_MS", 1_000)?,
            metrics_port: parse_or("METRICS_PORT", 9000)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw}")),
        Err(_) => Ok(default),
    }
}
