use std::cmp::Ordering;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::market_data::types::UpdateBatch;
use crate::state::book::Book;

/// Why a whole batch was rejected.
///
/// Individual malformed entries never reject a batch; they are skipped and
/// counted in [`MergeOutcome::dropped_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("stale batch: update_id {got} does not advance last_update_id {last}")]
    Stale { last: u64, got: u64 },
}

/// Result of an accepted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub book: Book,
    /// Malformed entries skipped while applying the batch.
    pub dropped_entries: usize,
}

/// Applies `batch` to `current`, producing the next book state.
///
/// Pure: reads its inputs, returns a new [`Book`], touches nothing else.
/// The owning worker decides what to do with the result; see
/// `market_data::book_worker`.
///
/// Rules, per entry in batch order (a later entry for the same price wins):
/// - an entry with zero/negative price or zero count is malformed: skipped
///   and counted, the rest of the batch still applies;
/// - `amount > 0` writes a bid, `amount < 0` writes an ask, at size
///   `|amount|`; either write evicts a stale level on the opposite side;
/// - `amount == 0` removes the price from whichever side holds it.
///
/// A batch whose `update_id` does not strictly advance the book's
/// `last_update_id` is rejected wholesale and the book is left untouched.
pub fn merge(current: &Book, batch: &UpdateBatch) -> Result<MergeOutcome, RejectReason> {
    if let Some(last) = current.last_update_id() {
        if batch.update_id <= last {
            return Err(RejectReason::Stale {
                last,
                got: batch.update_id,
            });
        }
    }

    let mut book = current.clone();
    let mut dropped_entries = 0;

    for entry in &batch.entries {
        if entry.price <= Decimal::ZERO || entry.count == 0 {
            dropped_entries += 1;
            continue;
        }

        // Sizes are magnitudes; the sign only classifies the side.
        match entry.amount.cmp(&Decimal::ZERO) {
            Ordering::Greater => book.set_bid(entry.price, entry.amount),
            Ordering::Less => book.set_ask(entry.price, entry.amount.abs()),
            Ordering::Equal => book.remove_level(entry.price),
        }
    }

    book.set_last_update_id(batch.update_id);
    Ok(MergeOutcome {
        book,
        dropped_entries,
    })
}
