use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus HTTP exporter on the given port.
/// After this call, any metrics recorded via the `metrics` crate
/// macros (counter!, gauge!, histogram!) are automatically exported
/// at /metrics.
pub fn init_metrics_server(port: u16) {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .expect("failed to start Prometheus metrics server");
}

// ── Feed adapter metrics ─────────────────────────────────────────

pub fn record_feed_frame(kind: &str) {
    counter!("feed_frames_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_reconnect() {
    counter!("feed_reconnects_total").increment(1);
}

// ── Book maintenance metrics ─────────────────────────────────────

pub fn record_batch_applied() {
    counter!("orderbook_batches_applied_total").increment(1);
}

pub fn record_stale_batch() {
    counter!("orderbook_batches_stale_total").increment(1);
}

/// Malformed entries skipped while applying batches. The book drops them
/// silently, so losing data must at least be visible here.
pub fn record_dropped_entries(count: usize) {
    counter!("orderbook_entries_dropped_total").increment(count as u64);
}

pub fn record_book_reset() {
    counter!("orderbook_resets_total").increment(1);
}

/// Time spent inside a single merge call.
pub fn record_merge_latency_us(latency_us: f64) {
    histogram!("orderbook_merge_latency_us").record(latency_us);
}

pub fn record_book_levels(bids: usize, asks: usize) {
    gauge!("orderbook_bid_levels").set(bids as f64);
    gauge!("orderbook_ask_levels").set(asks as f64);
}
