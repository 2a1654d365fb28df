use ulid::Ulid;

use crate::model::*;
use crate::store::StoreError;

use super::Engine;

impl ReservationView {
    /// Which tab a reservation belongs to at `now`, if any.
    pub fn of(reservation: &Reservation, now: Ms) -> Option<Self> {
        match reservation.status {
            ReservationStatus::Cancelled => Some(ReservationView::Cancelled),
            ReservationStatus::Confirmed if reservation.check_out >= now => {
                Some(ReservationView::Active)
            }
            ReservationStatus::Confirmed => Some(ReservationView::Past),
            ReservationStatus::Pending => None,
        }
    }
}

impl Engine {
    pub async fn get_reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        self.store.get_reservation(id).await
    }

    /// A user's reservations for one tab, soonest check-in first.
    /// `can_cancel` is only ever set on active reservations.
    pub async fn reservations_for(
        &self,
        user_id: &str,
        view: ReservationView,
        now: Ms,
    ) -> Result<Vec<ReservationInfo>, StoreError> {
        let mut mine: Vec<Reservation> = self
            .store
            .read_all_reservations()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id && ReservationView::of(r, now) == Some(view))
            .collect();
        mine.sort_by_key(|r| (r.check_in, r.id));

        Ok(mine
            .into_iter()
            .map(|reservation| ReservationInfo {
                room_number: self.inventory.get(&reservation.room_id).map(|room| room.number),
                can_cancel: view == ReservationView::Active && self.can_cancel(&reservation, now),
                reservation,
            })
            .collect())
    }
}
