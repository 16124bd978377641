use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::state::book::Book;

/// Thin log-based rendition of the order-book screen: a periodic
/// top-of-book summary at info level and a depth ladder at debug level.
/// Reads whatever book is latest at each tick; intermediate states that
/// came and went between ticks are deliberately skipped.
pub async fn run_display(
    mut book_rx: watch::Receiver<Book>,
    depth: usize,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match book_rx.has_changed() {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => {
                info!("book channel closed, display shutting down");
                return Ok(());
            }
        }
        let book = book_rx.borrow_and_update().clone();
        render(&book, depth);
    }
}

fn render(book: &Book, depth: usize) {
    if book.is_empty() {
        info!(update_id = book.last_update_id(), "book empty");
        return;
    }

    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => info!(
            best_bid = %format_price(bid.price),
            bid_size = %bid.size,
            best_ask = %format_price(ask.price),
            ask_size = %ask.size,
            mid = %book.mid_price().unwrap_or_default(),
            spread = %book.spread().unwrap_or_default(),
            bid_levels = book.bid_levels(),
            ask_levels = book.ask_levels(),
            "book"
        ),
        _ => info!(
            bid_levels = book.bid_levels(),
            ask_levels = book.ask_levels(),
            update_id = book.last_update_id(),
            "book one-sided"
        ),
    }

    let bids = book.top_bids(depth);
    let asks = book.top_asks(depth);
    for row in 0..bids.len().max(asks.len()) {
        let left = bids
            .get(row)
            .map(|l| format!("{} {}", l.size, format_price(l.price)))
            .unwrap_or_default();
        let right = asks
            .get(row)
            .map(|l| format!("{} {}", format_price(l.price), l.size))
            .unwrap_or_default();
        debug!("{left:>26} | {right:<26}");
    }
}

/// Formats a price with thousands separators: `1234567.5` -> `1,234,567.5`.
pub fn format_price(price: Decimal) -> String {
    let text = price.to_string();
    let (number, fraction) = match text.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (text.as_str(), None),
    };
    let (sign, digits) = number
        .strip_prefix('-')
        .map_or(("", number), |rest| ("-", rest));

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn groups_integer_digits_in_threes() {
        assert_eq!(format_price(dec!(0)), "0");
        assert_eq!(format_price(dec!(100)), "100");
        assert_eq!(format_price(dec!(1234)), "1,234");
        assert_eq!(format_price(dec!(41698)), "41,698");
        assert_eq!(format_price(dec!(1234567)), "1,234,567");
    }

    #[test]
    fn fraction_is_left_ungrouped() {
        assert_eq!(format_price(dec!(1234567.5)), "1,234,567.5");
        assert_eq!(format_price(dec!(0.123456)), "0.123456");
    }

    #[test]
    fn sign_stays_in_front_of_the_first_group() {
        assert_eq!(format_price(dec!(-1234.5)), "-1,234.5");
    }
}
