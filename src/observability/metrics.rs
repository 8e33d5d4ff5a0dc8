//! Metrics collection.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.
//!
//! # Metrics
//! - `stream_http_requests_total` (counter): completed requests by method, status
//! - `stream_http_request_duration_seconds` (histogram): time until the body is copied
//! - `stream_http_transfer_bytes_total` (counter): bytes copied, by bounded side
//! - `stream_http_timeouts_total` (counter): deadline expiries, by kind

use std::time::Instant;

use crate::stream::TransferSide;

/// Record a request that produced a response head.
pub fn record_request(method: &str, status: u16, started: Instant) {
    let method = method.to_string();
    let status = status.to_string();

    metrics::counter!(
        "stream_http_requests_total",
        "method" => method.clone(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!("stream_http_request_duration_seconds", "method" => method)
        .record(started.elapsed().as_secs_f64());
}

/// Record bytes moved by a copy.
pub fn record_transfer(side: TransferSide, bytes: u64) {
    metrics::counter!("stream_http_transfer_bytes_total", "side" => side.as_str()).increment(bytes);
}

/// Record a deadline expiry. `kind` is `"watchdog"` or `"chunk"`.
pub fn record_timeout(kind: &'static str) {
    metrics::counter!("stream_http_timeouts_total", "kind" => kind).increment(1);
}
