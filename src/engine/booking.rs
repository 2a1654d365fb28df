use std::time::Instant;

use tracing::{debug, info, warn, Instrument};
use ulid::Ulid;

use crate::model::*;

use super::conflict::{check_no_conflict, total_price, validate_request};
use super::{BookingError, Engine};

/// Steps of one booking attempt. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Validating,
    ClaimAcquired,
    Reconfirming,
    Committed,
    Rejected,
}

impl BookingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPhase::Validating => "validating",
            BookingPhase::ClaimAcquired => "claim_acquired",
            BookingPhase::Reconfirming => "reconfirming",
            BookingPhase::Committed => "committed",
            BookingPhase::Rejected => "rejected",
        }
    }
}

impl Engine {
    /// Book a room for the signed-in user.
    pub async fn book(
        &self,
        user: Option<&User>,
        room_id: Ulid,
        check_in: Ms,
        check_out: Ms,
        guests: u32,
    ) -> Result<Reservation, BookingError> {
        let req = BookingRequest::for_user(user, room_id, check_in, check_out, guests)?;
        self.attempt_booking(req).await
    }

    /// Run one booking attempt to completion.
    ///
    /// At most one of several concurrent attempts on overlapping dates of the
    /// same room commits; the others get `RoomBeingBooked` or `DatesUnavailable`.
    /// A rejected attempt leaves the store untouched, and every claim taken is
    /// released before returning (or after the grace period on success).
    pub async fn attempt_booking(&self, req: BookingRequest) -> Result<Reservation, BookingError> {
        let span = tracing::info_span!("attempt_booking", room = %req.room_id, user = %req.user_id);
        let started = Instant::now();
        let result = self.run_attempt(&req).instrument(span).await;

        let outcome = match &result {
            Ok(_) => BookingPhase::Committed.as_str(),
            Err(e) => e.kind(),
        };
        metrics::counter!(crate::observability::BOOKING_ATTEMPTS_TOTAL, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(crate::observability::BOOKING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn run_attempt(&self, req: &BookingRequest) -> Result<Reservation, BookingError> {
        debug!(phase = BookingPhase::Validating.as_str());
        let room = validate_request(req, &self.inventory)?;
        let key = req.claim_key();
        let total = total_price(&key.span, room.price_per_night)?;
        let existing = self.store.read_room_reservations(key.room_id).await?;
        check_no_conflict(&existing, &key).inspect_err(|_| {
            debug!(phase = BookingPhase::Rejected.as_str(), "dates already taken");
        })?;

        let now = self.clock.now_ms();
        if !self
            .store
            .try_acquire_claim(&key, &req.user_id, now, self.config.claim_ttl_ms)
            .await?
        {
            debug!(phase = BookingPhase::Rejected.as_str(), "claim held by another attempt");
            return Err(BookingError::RoomBeingBooked { room_id: key.room_id });
        }
        debug!(phase = BookingPhase::ClaimAcquired.as_str(), acquired_at = now);

        let result = self.commit_under_claim(req, &room, &key, total).await;
        match &result {
            Ok(_) => self.release_after_grace(key).await,
            Err(e) => {
                debug!(phase = BookingPhase::Rejected.as_str(), "{e}");
                self.release_claim(&key).await;
            }
        }
        result
    }

    async fn commit_under_claim(
        &self,
        req: &BookingRequest,
        room: &Room,
        key: &ClaimKey,
        total_price: Money,
    ) -> Result<Reservation, BookingError> {
        debug!(phase = BookingPhase::Reconfirming.as_str());
        let current = self.store.read_room_reservations(key.room_id).await?;
        check_no_conflict(&current, key)?;

        let reservation = Reservation {
            id: Ulid::new(),
            user_id: req.user_id.clone(),
            room_id: room.id,
            check_in: req.check_in,
            check_out: req.check_out,
            guests: req.guests,
            total_price,
            status: ReservationStatus::Confirmed,
            created_at: self.clock.now_ms(),
            version: 1,
        };
        self.store.append_reservation(reservation.clone()).await?;

        info!(
            phase = BookingPhase::Committed.as_str(),
            reservation = %reservation.id,
            room = %room.number,
            nights = key.span.nights(),
            total = reservation.total_price,
            "reservation confirmed"
        );
        self.notify.send(&Event::ReservationCreated {
            reservation: reservation.clone(),
        });
        Ok(reservation)
    }

    /// Drop the claim now. A failed release is logged; the TTL still frees the key.
    async fn release_claim(&self, key: &ClaimKey) {
        if let Err(e) = self.store.release_claim(key).await {
            warn!("claim release failed, will expire by TTL: {e}");
        }
    }

    /// Keep the claim for the grace period to absorb trailing duplicate submits.
    async fn release_after_grace(&self, key: ClaimKey) {
        if self.config.claim_grace_ms == 0 {
            self.release_claim(&key).await;
            return;
        }
        let store = self.store.clone();
        let grace = self.config.grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(e) = store.release_claim(&key).await {
                warn!("claim release failed, will expire by TTL: {e}");
            }
        });
    }
}
