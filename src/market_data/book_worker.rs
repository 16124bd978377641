use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::market_data::types::FeedEvent;
use crate::metrics::prometheus as prom;
use crate::state::book::Book;
use crate::state::merge::{RejectReason, merge};

/// Single owner of the live [`Book`].
///
/// Drains the adapter channel strictly in arrival order and applies `merge`
/// one batch at a time, publishing each accepted result over the watch
/// channel. Staleness and malformed entries are local conditions: nothing
/// here ever aborts the stream.
pub async fn run_book_worker(
    mut rx: mpsc::Receiver<FeedEvent>,
    book_tx: watch::Sender<Book>,
) -> anyhow::Result<()> {
    let mut book = Book::new();

    while let Some(event) = rx.recv().await {
        match event {
            FeedEvent::Reset => {
                info!("subscription (re)started, replacing book with an empty one");
                book = Book::new();
                prom::record_book_reset();
                book_tx.send_replace(book.clone());
            }
            FeedEvent::Batch(batch) => {
                let started = Instant::now();
                match merge(&book, &batch) {
                    Ok(outcome) => {
                        prom::record_merge_latency_us(started.elapsed().as_micros() as f64);
                        prom::record_batch_applied();
                        if outcome.dropped_entries > 0 {
                            prom::record_dropped_entries(outcome.dropped_entries);
                            warn!(
                                update_id = batch.update_id,
                                dropped = outcome.dropped_entries,
                                "dropped malformed entries from batch"
                            );
                        }
                        book = outcome.book;
                        prom::record_book_levels(book.bid_levels(), book.ask_levels());
                        debug!(
                            update_id = batch.update_id,
                            bid_levels = book.bid_levels(),
                            ask_levels = book.ask_levels(),
                            "batch applied"
                        );
                        book_tx.send_replace(book.clone());
                    }
                    Err(RejectReason::Stale { last, got }) => {
                        prom::record_stale_batch();
                        debug!(last, got, "rejected stale batch");
                    }
                }
            }
        }
    }

    info!("feed channel closed, book worker shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::types::{RawLevelUpdate, UpdateBatch};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn batch(update_id: u64, entries: Vec<(Decimal, i64, Decimal)>) -> FeedEvent {
        FeedEvent::Batch(UpdateBatch {
            update_id,
            entries: entries
                .into_iter()
                .map(|(price, count, amount)| RawLevelUpdate {
                    price,
                    count,
                    amount,
                })
                .collect(),
        })
    }

    #[tokio::test]
    async fn applies_batches_in_order_and_ignores_stale_ones() {
        let (tx, rx) = mpsc::channel(16);
        let (book_tx, book_rx) = watch::channel(Book::new());
        let worker = tokio::spawn(run_book_worker(rx, book_tx));

        tx.send(FeedEvent::Reset).await.unwrap();
        tx.send(batch(1, vec![(dec!(100), 1, dec!(5))])).await.unwrap();
        // stale: same id, tries to remove the level
        tx.send(batch(1, vec![(dec!(100), 1, dec!(0))])).await.unwrap();
        tx.send(batch(2, vec![(dec!(101), 1, dec!(-2))])).await.unwrap();
        drop(tx);
        worker.await.unwrap().unwrap();

        let book = book_rx.borrow().clone();
        assert_eq!(book.bid_size(dec!(100)), Some(dec!(5)));
        assert_eq!(book.ask_size(dec!(101)), Some(dec!(2)));
        assert_eq!(book.last_update_id(), Some(2));
    }

    #[tokio::test]
    async fn reset_publishes_an_empty_book() {
        let (tx, rx) = mpsc::channel(16);
        let (book_tx, book_rx) = watch::channel(Book::new());
        let worker = tokio::spawn(run_book_worker(rx, book_tx));

        tx.send(batch(9, vec![(dec!(100), 1, dec!(5))])).await.unwrap();
        tx.send(FeedEvent::Reset).await.unwrap();
        drop(tx);
        worker.await.unwrap().unwrap();

        let book = book_rx.borrow().clone();
        assert!(book.is_empty());
        assert_eq!(book.last_update_id(), None);
    }

    #[tokio::test]
    async fn book_survives_a_batch_of_only_malformed_entries() {
        let (tx, rx) = mpsc::channel(16);
        let (book_tx, book_rx) = watch::channel(Book::new());
        let worker = tokio::spawn(run_book_worker(rx, book_tx));

        tx.send(batch(1, vec![(dec!(100), 1, dec!(5))])).await.unwrap();
        tx.send(batch(2, vec![(dec!(0), 0, dec!(1))])).await.unwrap();
        drop(tx);
        worker.await.unwrap().unwrap();

        let book = book_rx.borrow().clone();
        assert_eq!(book.bid_size(dec!(100)), Some(dec!(5)));
        // the batch itself was accepted, only its entries were dropped
        assert_eq!(book.last_update_id(), Some(2));
    }
}
