use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{error, warn};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

use super::{InMemoryStore, ReservationStore, StoreError};

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
    #[cfg(test)]
    FailNextSync,
}

type Pending = Vec<(Event, oneshot::Sender<io::Result<()>>)>;

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Drain every Append already queued behind it.
/// 3. One fsync for the whole batch, then answer every sender.
///
/// A failed batch is truncated off the log before its callers hear about it.
/// If even that fails, the writer is poisoned and refuses every later write.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    let mut poisoned = false;
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other, poisoned);
                continue;
            }
        };
        let mut batch: Pending = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut wal, &batch, &mut poisoned);
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        for (_, tx) in batch {
            let r = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = tx.send(r);
        }

        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd, poisoned);
        }
    }
}

fn poisoned_error() -> io::Error {
    io::Error::other("WAL refuses writes after an unrecoverable write failure")
}

fn flush_batch(wal: &mut Wal, batch: &Pending, poisoned: &mut bool) -> io::Result<()> {
    if *poisoned {
        return Err(poisoned_error());
    }
    let start = wal.synced_len()?;
    let result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event))
        .and_then(|()| wal.flush_sync());
    if let Err(e) = &result {
        warn!("WAL flush failed, rolling back {} records: {e}", batch.len());
        if let Err(rollback) = wal.rollback_to(start) {
            error!("WAL rollback failed, refusing further writes: {rollback}");
            *poisoned = true;
        }
    }
    result
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand, poisoned: bool) {
    match cmd {
        WalCommand::Compact { response, .. } if poisoned => {
            let _ = response.send(Err(poisoned_error()));
        }
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        #[cfg(test)]
        WalCommand::FailNextSync => wal.fail_next_sync(),
        WalCommand::Append { .. } => {}
    }
}

/// Reservation store that survives restarts.
///
/// State lives in an [`InMemoryStore`]; every reservation change is logged
/// before it is applied. Claims are never logged: after a restart no attempt
/// is in flight, so there is nothing to protect.
pub struct WalStore {
    inner: InMemoryStore,
    wal_tx: mpsc::Sender<WalCommand>,
    /// Appends share it. Status changes and compaction take it exclusively, so a
    /// version check and its log write are atomic and a snapshot never misses a
    /// record already handed to the writer.
    log_lock: RwLock<()>,
}

impl WalStore {
    /// Replay the log at `path` and start its writer task. Must run inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let replay = Wal::replay(path)?;
        if replay.discarded_tail {
            warn!("discarded torn tail of {}", path.display());
        }
        let inner = InMemoryStore::new();
        for event in &replay.events {
            inner.apply_event(event);
        }

        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            inner,
            wal_tx,
            log_lock: RwLock::new(()),
        })
    }

    pub fn reservation_count(&self) -> usize {
        self.inner.reservation_count()
    }

    async fn wal_append(&self, event: Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append { event, response: tx })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    /// Rewrite the log as one record per reservation, in its current state.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let _guard = self.log_lock.write().await;
        let events = self
            .inner
            .snapshot()
            .into_iter()
            .map(|reservation| Event::ReservationCreated { reservation })
            .collect();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    /// Make the next group commit fail after its bytes reached the file.
    #[cfg(test)]
    async fn fail_next_sync(&self) {
        let _ = self.wal_tx.send(WalCommand::FailNextSync).await;
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

#[async_trait]
impl ReservationStore for WalStore {
    async fn read_all_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        self.inner.read_all_reservations().await
    }

    async fn read_room_reservations(&self, room_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        self.inner.read_room_reservations(room_id).await
    }

    async fn get_reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        self.inner.get_reservation(id).await
    }

    async fn append_reservation(&self, reservation: Reservation) -> Result<(), StoreError> {
        if self.inner.contains_reservation(&reservation.id) {
            return Err(StoreError::AlreadyExists(reservation.id));
        }
        let _guard = self.log_lock.read().await;
        self.wal_append(Event::ReservationCreated {
            reservation: reservation.clone(),
        })
        .await?;
        self.inner.insert(reservation)
    }

    async fn update_reservation_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
        expected_version: u64,
    ) -> Result<Reservation, StoreError> {
        let _guard = self.log_lock.write().await;
        let current = self.inner.check_version(id, expected_version)?;
        self.wal_append(Event::ReservationStatusChanged {
            id,
            room_id: current.room_id,
            status,
            version: expected_version + 1,
        })
        .await?;
        self.inner.set_status(id, status, expected_version)
    }

    async fn try_acquire_claim(
        &self,
        key: &ClaimKey,
        holder: &str,
        now: Ms,
        ttl: Ms,
    ) -> Result<bool, StoreError> {
        self.inner.try_acquire_claim(key, holder, now, ttl).await
    }

    async fn release_claim(&self, key: &ClaimKey) -> Result<(), StoreError> {
        self.inner.release_claim(key).await
    }

    async fn peek_claim(&self, key: &ClaimKey) -> Result<Option<Claim>, StoreError> {
        self.inner.peek_claim(key).await
    }

    async fn purge_expired_claims(&self, now: Ms, ttl: Ms) -> Result<usize, StoreError> {
        self.inner.purge_expired_claims(now, ttl).await
    }
}
