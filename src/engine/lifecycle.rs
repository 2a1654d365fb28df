use tracing::{debug, info};
use ulid::Ulid;

use crate::model::*;
use crate::store::StoreError;

use super::{CancellationError, Engine};

const MAX_STATUS_RETRIES: usize = 3;

/// The single cancellation rule. `None` means the reservation may be cancelled:
/// it must be confirmed, and check-in must be strictly more than `cutoff` away.
pub fn cancellation_block(
    reservation: &Reservation,
    now: Ms,
    cutoff: Ms,
) -> Option<CancellationError> {
    if reservation.status != ReservationStatus::Confirmed {
        return Some(CancellationError::NotCancellable {
            id: reservation.id,
            status: reservation.status,
        });
    }
    let until_check_in = reservation.check_in - now;
    if until_check_in <= cutoff {
        return Some(CancellationError::TooLateToCancel {
            id: reservation.id,
            until_check_in,
        });
    }
    None
}

impl Engine {
    /// Whether the UI should offer the cancel action. Uses exactly the rule and
    /// cutoff that [`Engine::cancel`] enforces.
    pub fn can_cancel(&self, reservation: &Reservation, now: Ms) -> bool {
        cancellation_block(reservation, now, self.config.cancellation_cutoff_ms).is_none()
    }

    /// Mark a confirmed reservation cancelled. The record is kept; its version is bumped.
    pub async fn cancel(&self, reservation_id: Ulid) -> Result<Reservation, CancellationError> {
        let result = self.try_cancel(reservation_id).await;
        let outcome = match &result {
            Ok(_) => "cancelled",
            Err(e) => e.kind(),
        };
        metrics::counter!(crate::observability::CANCELLATIONS_TOTAL, "outcome" => outcome)
            .increment(1);
        result
    }

    async fn try_cancel(&self, id: Ulid) -> Result<Reservation, CancellationError> {
        let mut current = self
            .store
            .get_reservation(id)
            .await?
            .ok_or(CancellationError::NotFound(id))?;

        let mut last_conflict = None;
        for _ in 0..MAX_STATUS_RETRIES {
            let now = self.clock.now_ms();
            let cutoff = self.config.cancellation_cutoff_ms;
            if let Some(err) = cancellation_block(&current, now, cutoff) {
                return Err(err);
            }
            match self
                .store
                .update_reservation_status(id, ReservationStatus::Cancelled, current.version)
                .await
            {
                Ok(updated) => {
                    info!(reservation = %id, room = %updated.room_id, "reservation cancelled");
                    self.notify.send(&Event::ReservationStatusChanged {
                        id,
                        room_id: updated.room_id,
                        status: updated.status,
                        version: updated.version,
                    });
                    return Ok(updated);
                }
                Err(conflict @ StoreError::VersionConflict { .. }) => {
                    debug!(reservation = %id, "changed concurrently, re-checking");
                    last_conflict = Some(conflict);
                    current = self
                        .store
                        .get_reservation(id)
                        .await?
                        .ok_or(CancellationError::NotFound(id))?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        // Only reachable after MAX_STATUS_RETRIES conflicts, so always Some.
        Err(CancellationError::Store(last_conflict.unwrap_or_else(|| {
            StoreError::Unavailable("status update retries exhausted".into())
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::CANCELLATION_CUTOFF_MS;

    fn can_cancel(reservation: &Reservation, now: Ms) -> bool {
        cancellation_block(reservation, now, CANCELLATION_CUTOFF_MS).is_none()
    }

    const NOW: Ms = 1_723_680_000_000;

    fn reservation(check_in: Ms, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Ulid::new(),
            user_id: "u1".into(),
            room_id: Ulid::new(),
            check_in,
            check_out: check_in + 2 * DAY_MS,
            guests: 2,
            total_price: 178,
            status,
            created_at: 0,
            version: 1,
        }
    }

    #[test]
    fn cutoff_boundary() {
        let exactly = reservation(NOW + 24 * HOUR_MS, ReservationStatus::Confirmed);
        assert!(!can_cancel(&exactly, NOW));
        assert!(matches!(
            cancellation_block(&exactly, NOW, CANCELLATION_CUTOFF_MS),
            Some(CancellationError::TooLateToCancel { until_check_in, .. })
                if until_check_in == 24 * HOUR_MS
        ));

        // 24.01 h
        let just_after = reservation(NOW + 24 * HOUR_MS + 36_000, ReservationStatus::Confirmed);
        assert!(can_cancel(&just_after, NOW));
    }

    #[test]
    fn past_check_in_is_too_late() {
        let r = reservation(NOW - DAY_MS, ReservationStatus::Confirmed);
        assert!(!can_cancel(&r, NOW));
    }

    #[test]
    fn only_confirmed_can_be_cancelled() {
        for status in [ReservationStatus::Pending, ReservationStatus::Cancelled] {
            let r = reservation(NOW + 10 * DAY_MS, status);
            assert!(!can_cancel(&r, NOW));
            assert!(matches!(
                cancellation_block(&r, NOW, CANCELLATION_CUTOFF_MS),
                Some(CancellationError::NotCancellable { .. })
            ));
        }
    }

    #[test]
    fn status_checked_before_cutoff() {
        let r = reservation(NOW + HOUR_MS, ReservationStatus::Cancelled);
        assert!(matches!(
            cancellation_block(&r, NOW, CANCELLATION_CUTOFF_MS),
            Some(CancellationError::NotCancellable { .. })
        ));
    }
}
