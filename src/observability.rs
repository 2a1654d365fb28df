use std::net::SocketAddr;

// ── Booking metrics (request-driven) ────────────────────────────

/// Counter: booking attempts. Labels: outcome.
pub const BOOKING_ATTEMPTS_TOTAL: &str = "innkeep_booking_attempts_total";

/// Histogram: booking attempt latency in seconds, claim wait included.
pub const BOOKING_DURATION_SECONDS: &str = "innkeep_booking_duration_seconds";

/// Counter: cancellation requests. Labels: outcome.
pub const CANCELLATIONS_TOTAL: &str = "innkeep_cancellations_total";

// ── Background work ─────────────────────────────────────────────

/// Counter: expired claims removed by the reaper.
pub const CLAIMS_REAPED_TOTAL: &str = "innkeep_claims_reaped_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "innkeep_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "innkeep_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
/// A failed install is logged and the service keeps running without an endpoint.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::warn!("failed to install Prometheus metrics exporter: {e}"),
    }
}
