use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::market_data::backoff::ReconnectBackoff;
use crate::market_data::parser::{ParsedFrame, parse_frame};
use crate::market_data::types::{FeedCommand, FeedEvent, Precision, UpdateBatch};
use crate::metrics::prometheus as prom;

/// Bitfinex configuration flag: append a sequence number to every data frame.
const SEQ_ALL_FLAG: u32 = 65_536;

#[derive(Debug, Serialize)]
struct ConfMsg {
    event: &'static str,
    flags: u32,
}

#[derive(Debug, Serialize)]
struct SubscribeMsg<'a> {
    event: &'static str,
    channel: &'static str,
    symbol: &'a str,
    prec: String,
    freq: &'static str,
}

/// Subscription lifecycle. `Streaming` begins at the `subscribed` ack, which
/// is also the moment the book owner is told to start from empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Disconnected,
    Connected,
    Streaming,
}

enum SessionEnd {
    /// Precision change requested: reconnect immediately, no backoff.
    Resubscribe(Precision),
    /// The book owner went away; nothing left to feed.
    ChannelClosed,
}

/// Owns the WebSocket transport to the Bitfinex book channel.
///
/// Decoded batches go out through `tx`; `cmd_rx` carries control-plane
/// commands. Every (re)subscription emits [`FeedEvent::Reset`] before the
/// first batch of the new stream. Transport failures reconnect forever with
/// jittered exponential backoff.
pub async fn run_bitfinex_adapter(
    cfg: Config,
    tx: mpsc::Sender<FeedEvent>,
    mut cmd_rx: mpsc::Receiver<FeedCommand>,
) -> Result<()> {
    let mut precision = cfg.precision;
    let mut state = ConnState::Disconnected;
    let mut backoff = ReconnectBackoff::default();

    loop {
        match run_session(&cfg, precision, &tx, &mut cmd_rx, &mut state, &mut backoff).await {
            Ok(SessionEnd::Resubscribe(next)) => {
                info!(precision = %next, "resubscribing at new precision");
                precision = next;
                state = ConnState::Disconnected;
                backoff.reset();
            }
            Ok(SessionEnd::ChannelClosed) => {
                info!("event channel closed, feed adapter shutting down");
                return Ok(());
            }
            Err(err) => {
                prom::record_reconnect();
                state = ConnState::Disconnected;
                let delay = backoff.next_delay();
                warn!(
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "feed session ended, reconnecting"
                );
                sleep(delay).await;
            }
        }
    }
}

async fn run_session(
    cfg: &Config,
    precision: Precision,
    tx: &mpsc::Sender<FeedEvent>,
    cmd_rx: &mut mpsc::Receiver<FeedCommand>,
    state: &mut ConnState,
    backoff: &mut ReconnectBackoff,
) -> Result<SessionEnd> {
    let (mut ws, _) = connect_async(cfg.ws_url.as_str())
        .await
        .context("websocket connect")?;
    *state = ConnState::Connected;
    info!(url = %cfg.ws_url, symbol = %cfg.symbol, precision = %precision, "connected");

    let conf = serde_json::to_string(&ConfMsg {
        event: "conf",
        flags: SEQ_ALL_FLAG,
    })?;
    ws.send(Message::Text(conf)).await?;

    let subscribe = serde_json::to_string(&SubscribeMsg {
        event: "subscribe",
        channel: "book",
        symbol: &cfg.symbol,
        prec: precision.to_string(),
        freq: cfg.frequency.as_param(),
    })?;
    ws.send(Message::Text(subscribe)).await?;

    // Fallback identifier for frames without a trailing sequence number
    // (anything sent before the conf ack). Kept in step with server
    // sequences so the two sources stay monotonic together.
    let mut last_update_id: u64 = 0;
    let mut commands_open = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if commands_open => match cmd {
                Some(FeedCommand::Resubscribe { precision }) => {
                    let _ = ws.close(None).await;
                    return Ok(SessionEnd::Resubscribe(precision));
                }
                None => commands_open = false,
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                    Ok(ParsedFrame::Event(event)) => match event.event.as_str() {
                        "subscribed" => {
                            *state = ConnState::Streaming;
                            backoff.reset();
                            info!(
                                chan_id = event.chan_id,
                                channel = event.channel.as_deref().unwrap_or(""),
                                symbol = event.symbol.as_deref().unwrap_or(""),
                                prec = event.prec.as_deref().unwrap_or(""),
                                freq = event.freq.as_deref().unwrap_or(""),
                                "subscribed, starting from an empty book"
                            );
                            if tx.send(FeedEvent::Reset).await.is_err() {
                                return Ok(SessionEnd::ChannelClosed);
                            }
                        }
                        "error" => {
                            bail!("feed error {:?}: {:?}", event.code, event.msg)
                        }
                        other => debug!(event = %other, "control event"),
                    },
                    Ok(ParsedFrame::Heartbeat { .. }) => {
                        prom::record_feed_frame("heartbeat");
                    }
                    Ok(ParsedFrame::Levels { entries, seq }) => {
                        prom::record_feed_frame("levels");
                        if *state != ConnState::Streaming {
                            debug!("level frame before subscription ack, dropping");
                            continue;
                        }
                        let update_id = seq.unwrap_or(last_update_id + 1);
                        last_update_id = update_id;
                        let batch = UpdateBatch { update_id, entries };
                        if tx.send(FeedEvent::Batch(batch)).await.is_err() {
                            return Ok(SessionEnd::ChannelClosed);
                        }
                    }
                    Ok(ParsedFrame::Unknown) => debug!(frame = %text, "unrecognized frame"),
                    Err(err) => warn!(error = %err, "undecodable frame"),
                },
                Some(Ok(Message::Ping(payload))) => ws.send(Message::Pong(payload)).await?,
                Some(Ok(Message::Close(_))) | None => bail!("server closed the connection"),
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("websocket read"),
            },
        }
    }
}
