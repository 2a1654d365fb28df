use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::store::{StoreError, WalStore};

const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Drop every claim whose TTL has run out. Returns how many were removed.
pub async fn reap_once(engine: &Engine) -> Result<usize, StoreError> {
    let reaped = engine
        .store()
        .purge_expired_claims(engine.now(), engine.config().claim_ttl_ms)
        .await?;
    if reaped > 0 {
        metrics::counter!(crate::observability::CLAIMS_REAPED_TOTAL).increment(reaped as u64);
        info!("reaped {reaped} expired claims");
    }
    Ok(reaped)
}

/// Background task that periodically cleans up expired claims.
/// Acquisition already ignores stale claims; this only bounds memory.
pub async fn run_reaper(engine: Arc<Engine>) {
    let mut interval = tokio::time::interval(engine.config().reaper_interval());
    loop {
        interval.tick().await;
        if let Err(e) = reap_once(&engine).await {
            debug!("reaper pass failed: {e}");
        }
    }
}

/// Compact the log once it has grown by `threshold` appends. Returns whether it did.
pub async fn compact_once(store: &WalStore, threshold: u64) -> Result<bool, StoreError> {
    let appends = store.appends_since_compact().await;
    if appends < threshold {
        return Ok(false);
    }
    store.compact().await?;
    info!("compacted WAL after {appends} appends, {} reservations kept", store.reservation_count());
    Ok(true)
}

pub async fn run_compactor(store: Arc<WalStore>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = compact_once(&store, threshold).await {
            warn!("compaction failed: {e}");
        }
    }
}
