mod durable;
mod memory;

pub use durable::WalStore;
pub use memory::InMemoryStore;

use async_trait::async_trait;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    VersionConflict { id: Ulid, expected: u64, actual: u64 },
    WalError(String),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "reservation not found: {id}"),
            StoreError::AlreadyExists(id) => write!(f, "reservation already exists: {id}"),
            StoreError::VersionConflict { id, expected, actual } => write!(
                f,
                "reservation {id} changed concurrently: expected version {expected}, found {actual}"
            ),
            StoreError::WalError(e) => write!(f, "WAL error: {e}"),
            StoreError::Unavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence collaborator for reservations and booking claims.
///
/// Reservations are append-only; only their status (and version) ever changes.
/// Claims are ephemeral: implementations must make `try_acquire_claim` atomic
/// with respect to every other claim on the same room, and must treat a claim
/// whose age reached `ttl` as absent.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn read_all_reservations(&self) -> Result<Vec<Reservation>, StoreError>;

    async fn read_room_reservations(&self, room_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        let mut all = self.read_all_reservations().await?;
        all.retain(|r| r.room_id == room_id);
        Ok(all)
    }

    async fn get_reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .read_all_reservations()
            .await?
            .into_iter()
            .find(|r| r.id == id))
    }

    async fn append_reservation(&self, reservation: Reservation) -> Result<(), StoreError>;

    /// Set `status` if the stored version still equals `expected_version`.
    /// Bumps the version by one and returns the updated record.
    async fn update_reservation_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
        expected_version: u64,
    ) -> Result<Reservation, StoreError>;

    /// Returns `false` if a live claim contending with `key` exists.
    async fn try_acquire_claim(
        &self,
        key: &ClaimKey,
        holder: &str,
        now: Ms,
        ttl: Ms,
    ) -> Result<bool, StoreError>;

    async fn release_claim(&self, key: &ClaimKey) -> Result<(), StoreError>;

    async fn peek_claim(&self, key: &ClaimKey) -> Result<Option<Claim>, StoreError>;

    /// Drop every claim older than `ttl`. Returns how many were removed.
    async fn purge_expired_claims(&self, now: Ms, ttl: Ms) -> Result<usize, StoreError>;
}
