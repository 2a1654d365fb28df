use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::{ReservationStore, StoreError};

pub struct InMemoryStore {
    reservations: DashMap<Ulid, Reservation>,
    /// Room → reservation ids, in insertion order.
    by_room: DashMap<Ulid, Vec<Ulid>>,
    /// Room → claims held on it. The per-room entry lock makes acquisition atomic.
    claims: DashMap<Ulid, Vec<Claim>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            reservations: DashMap::new(),
            by_room: DashMap::new(),
            claims: DashMap::new(),
        }
    }

    // ── Reservations ─────────────────────────────────────────

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn contains_reservation(&self, id: &Ulid) -> bool {
        self.reservations.contains_key(id)
    }

    pub fn snapshot(&self) -> Vec<Reservation> {
        let mut all: Vec<Reservation> =
            self.reservations.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        all
    }

    pub fn room_snapshot(&self, room_id: &Ulid) -> Vec<Reservation> {
        let Some(ids) = self.by_room.get(room_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.reservations.get(id).map(|e| e.value().clone()))
            .collect()
    }

    pub(super) fn insert(&self, reservation: Reservation) -> Result<(), StoreError> {
        match self.reservations.entry(reservation.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(reservation.id)),
            Entry::Vacant(slot) => {
                self.by_room
                    .entry(reservation.room_id)
                    .or_default()
                    .push(reservation.id);
                slot.insert(reservation);
                Ok(())
            }
        }
    }

    /// Check the version without writing. Used by the durable store before logging.
    pub(super) fn check_version(
        &self,
        id: Ulid,
        expected_version: u64,
    ) -> Result<Reservation, StoreError> {
        let entry = self.reservations.get(&id).ok_or(StoreError::NotFound(id))?;
        let current = entry.value();
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: current.version,
            });
        }
        Ok(current.clone())
    }

    pub(super) fn set_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
        expected_version: u64,
    ) -> Result<Reservation, StoreError> {
        let mut entry = self.reservations.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let current = entry.value_mut();
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: current.version,
            });
        }
        current.status = status;
        current.version += 1;
        Ok(current.clone())
    }

    // ── Event application ────────────────────────────────────

    /// Replay one WAL record. Replays are trusted, so conflicts are skipped.
    pub fn apply_event(&self, event: &Event) {
        match event {
            Event::ReservationCreated { reservation } => {
                let _ = self.insert(reservation.clone());
            }
            Event::ReservationStatusChanged {
                id, status, version, ..
            } => {
                if let Some(mut entry) = self.reservations.get_mut(id) {
                    entry.status = *status;
                    entry.version = *version;
                }
            }
        }
    }

    // ── Claims ───────────────────────────────────────────────

    pub fn claim_count(&self) -> usize {
        self.claims.iter().map(|e| e.value().len()).sum()
    }

    fn acquire(&self, key: &ClaimKey, holder: &str, now: Ms, ttl: Ms) -> bool {
        let mut slot = self.claims.entry(key.room_id).or_default();
        slot.retain(|c| c.is_live(now, ttl));
        if slot.iter().any(|c| c.key.contends_with(key)) {
            return false;
        }
        slot.push(Claim {
            key: *key,
            holder: holder.to_string(),
            acquired_at: now,
        });
        true
    }

    fn release(&self, key: &ClaimKey) {
        if let Some(mut slot) = self.claims.get_mut(&key.room_id) {
            slot.retain(|c| c.key != *key);
        }
        self.claims.remove_if(&key.room_id, |_, v| v.is_empty());
    }

    fn peek(&self, key: &ClaimKey) -> Option<Claim> {
        self.claims
            .get(&key.room_id)
            .and_then(|slot| slot.iter().find(|c| c.key == *key).cloned())
    }

    fn purge(&self, now: Ms, ttl: Ms) -> usize {
        let mut purged = 0;
        for mut slot in self.claims.iter_mut() {
            let before = slot.len();
            slot.retain(|c| c.is_live(now, ttl));
            purged += before - slot.len();
        }
        self.claims.retain(|_, v| !v.is_empty());
        purged
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn read_all_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.snapshot())
    }

    async fn read_room_reservations(&self, room_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.room_snapshot(&room_id))
    }

    async fn get_reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        Ok(self.reservations.get(&id).map(|e| e.value().clone()))
    }

    async fn append_reservation(&self, reservation: Reservation) -> Result<(), StoreError> {
        self.insert(reservation)
    }

    async fn update_reservation_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
        expected_version: u64,
    ) -> Result<Reservation, StoreError> {
        self.set_status(id, status, expected_version)
    }

    async fn try_acquire_claim(
        &self,
        key: &ClaimKey,
        holder: &str,
        now: Ms,
        ttl: Ms,
    ) -> Result<bool, StoreError> {
        Ok(self.acquire(key, holder, now, ttl))
    }

    async fn release_claim(&self, key: &ClaimKey) -> Result<(), StoreError> {
        self.release(key);
        Ok(())
    }

    async fn peek_claim(&self, key: &ClaimKey) -> Result<Option<Claim>, StoreError> {
        Ok(self.peek(key))
    }

    async fn purge_expired_claims(&self, now: Ms, ttl: Ms) -> Result<usize, StoreError> {
        Ok(self.purge(now, ttl))
    }
}
