use ulid::Ulid;

use crate::model::{Ms, ReservationStatus};
use crate::store::StoreError;

/// Bad form input. Always recoverable at the field level; nothing was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    CheckOutNotAfterCheckIn { check_in: Ms, check_out: Ms },
    GuestsOutOfRange(u32),
    UnknownRoom(Ulid),
    NotSignedIn,
    LimitExceeded(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::CheckOutNotAfterCheckIn { .. } => {
                write!(f, "check-out date must be after check-in date")
            }
            ValidationError::GuestsOutOfRange(n) => write!(
                f,
                "guest count {n} out of range {}..={}",
                crate::limits::MIN_GUESTS,
                crate::limits::MAX_GUESTS
            ),
            ValidationError::UnknownRoom(id) => write!(f, "unknown room: {id}"),
            ValidationError::NotSignedIn => write!(f, "sign in to make a reservation"),
            ValidationError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Why a booking attempt was rejected. Each kind maps to a different corrective
/// action in the UI: fix the form, pick other dates, or retry / pick another room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    Invalid(ValidationError),
    /// A committed reservation already covers part of the requested stay.
    DatesUnavailable { room_id: Ulid, conflicting: Option<Ulid> },
    /// Another attempt holds a live claim on this room for overlapping dates.
    RoomBeingBooked { room_id: Ulid },
    Store(StoreError),
}

impl BookingError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Invalid(_) => "invalid",
            BookingError::DatesUnavailable { .. } => "dates_unavailable",
            BookingError::RoomBeingBooked { .. } => "room_being_booked",
            BookingError::Store(_) => "store_error",
        }
    }
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Invalid(e) => write!(f, "invalid booking: {e}"),
            BookingError::DatesUnavailable { room_id, .. } => {
                write!(f, "room {room_id} is no longer available for these dates")
            }
            BookingError::RoomBeingBooked { room_id } => {
                write!(f, "room {room_id} is being booked by someone else right now")
            }
            BookingError::Store(e) => write!(f, "booking failed: {e}"),
        }
    }
}

impl std::error::Error for BookingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookingError::Invalid(e) => Some(e),
            BookingError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for BookingError {
    fn from(e: ValidationError) -> Self {
        BookingError::Invalid(e)
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        BookingError::Store(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationError {
    NotFound(Ulid),
    NotCancellable { id: Ulid, status: ReservationStatus },
    /// Check-in is within the cutoff window.
    TooLateToCancel { id: Ulid, until_check_in: Ms },
    Store(StoreError),
}

impl CancellationError {
    pub fn kind(&self) -> &'static str {
        match self {
            CancellationError::NotFound(_) => "not_found",
            CancellationError::NotCancellable { .. } => "not_cancellable",
            CancellationError::TooLateToCancel { .. } => "too_late",
            CancellationError::Store(_) => "store_error",
        }
    }
}

impl std::fmt::Display for CancellationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationError::NotFound(id) => write!(f, "reservation not found: {id}"),
            CancellationError::NotCancellable { id, status } => {
                write!(f, "reservation {id} is {} and cannot be cancelled", status.as_str())
            }
            CancellationError::TooLateToCancel { id, until_check_in } => write!(
                f,
                "reservation {id} can no longer be cancelled: check-in is {:.1} hours away",
                *until_check_in as f64 / crate::model::HOUR_MS as f64
            ),
            CancellationError::Store(e) => write!(f, "cancellation failed: {e}"),
        }
    }
}

impl std::error::Error for CancellationError {}

impl From<StoreError> for CancellationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => CancellationError::NotFound(id),
            other => CancellationError::Store(other),
        }
    }
}
