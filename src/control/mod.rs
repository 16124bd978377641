use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::market_data::types::{FeedCommand, Precision};

/// Line-oriented stdin control for the aggregation level: `+` coarsens the
/// book one step, `-` refines it, clamped to P0..=P4. Each change issues a
/// [`FeedCommand::Resubscribe`]; the adapter tears the transport down and
/// the fresh stream starts from an empty book.
///
/// EOF ends the task without taking the engine down.
pub async fn run_precision_control(
    initial: Precision,
    cmd_tx: mpsc::Sender<FeedCommand>,
) -> anyhow::Result<()> {
    let mut precision = initial;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let next = match line.trim() {
            "+" => precision.coarser(),
            "-" => precision.finer(),
            "" => continue,
            other => {
                warn!(input = %other, "unrecognized control input, use + or -");
                continue;
            }
        };

        match next {
            Some(next) => {
                precision = next;
                info!(precision = %precision, "precision change requested");
                if cmd_tx
                    .send(FeedCommand::Resubscribe { precision })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            None => info!(precision = %precision, "already at the precision limit"),
        }
    }

    info!("control input closed");
    Ok(())
}
