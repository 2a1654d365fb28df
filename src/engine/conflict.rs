use ulid::Ulid;

use crate::catalog::Inventory;
use crate::limits::*;
use crate::model::*;

use super::availability::first_conflict;
use super::{BookingError, ValidationError};

impl BookingRequest {
    /// Build a request for the signed-in user. Booking is refused without one.
    pub fn for_user(
        user: Option<&User>,
        room_id: Ulid,
        check_in: Ms,
        check_out: Ms,
        guests: u32,
    ) -> Result<Self, ValidationError> {
        let user = user.ok_or(ValidationError::NotSignedIn)?;
        Ok(Self {
            user_id: user.id.clone(),
            room_id,
            check_in,
            check_out,
            guests,
        })
    }

    pub fn claim_key(&self) -> ClaimKey {
        ClaimKey::new(self.room_id, self.check_in, self.check_out)
    }
}

fn validate_stay(check_in: Ms, check_out: Ms) -> Result<Span, ValidationError> {
    if check_out <= check_in {
        return Err(ValidationError::CheckOutNotAfterCheckIn { check_in, check_out });
    }
    if check_in < MIN_VALID_TIMESTAMP_MS || check_out > MAX_VALID_TIMESTAMP_MS {
        return Err(ValidationError::LimitExceeded("date out of range"));
    }
    let span = Span::new(check_in, check_out);
    if span.duration_ms() > MAX_STAY_MS {
        return Err(ValidationError::LimitExceeded("stay too long"));
    }
    Ok(span)
}

/// Shape checks on a booking request. Returns the room being booked.
pub fn validate_request(
    req: &BookingRequest,
    inventory: &Inventory,
) -> Result<Room, ValidationError> {
    if req.user_id.is_empty() {
        return Err(ValidationError::NotSignedIn);
    }
    if req.user_id.len() > MAX_USER_ID_LEN {
        return Err(ValidationError::LimitExceeded("user id too long"));
    }
    validate_stay(req.check_in, req.check_out)?;
    if !(MIN_GUESTS..=MAX_GUESTS).contains(&req.guests) {
        return Err(ValidationError::GuestsOutOfRange(req.guests));
    }
    inventory
        .get(&req.room_id)
        .ok_or(ValidationError::UnknownRoom(req.room_id))
}

/// Reject with `DatesUnavailable` if a non-cancelled reservation overlaps the stay.
pub(crate) fn check_no_conflict(
    reservations: &[Reservation],
    key: &ClaimKey,
) -> Result<(), BookingError> {
    match first_conflict(reservations, key.room_id, &key.span) {
        Some(existing) => Err(BookingError::DatesUnavailable {
            room_id: key.room_id,
            conflicting: Some(existing.id),
        }),
        None => Ok(()),
    }
}

/// nights × nightly price, nights rounded up.
pub fn total_price(span: &Span, price_per_night: Money) -> Result<Money, ValidationError> {
    span.nights()
        .checked_mul(price_per_night)
        .ok_or(ValidationError::LimitExceeded("price overflow"))
}
