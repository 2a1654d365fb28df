use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Whole currency units. Nightly prices and totals are integral.
pub type Money = u64;

pub const HOUR_MS: Ms = 3_600_000;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// `a < d && b > c`: touching boundaries do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Number of nights billed for a stay, rounding partial days up.
    pub fn nights(&self) -> u64 {
        let whole = self.duration_ms().div_euclid(DAY_MS);
        let partial = self.duration_ms().rem_euclid(DAY_MS) > 0;
        (whole + Ms::from(partial)) as u64
    }
}

// ── Inventory ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomCategory {
    Basic,
    Premium,
    Vip,
}

impl RoomCategory {
    pub fn title(&self) -> &'static str {
        match self {
            RoomCategory::Basic => "Basic Room",
            RoomCategory::Premium => "Premium Room",
            RoomCategory::Vip => "VIP Suite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    /// Display number, e.g. "201".
    pub number: String,
    pub category: RoomCategory,
    pub price_per_night: Money,
    pub amenities: Vec<String>,
    pub is_available: bool,
    /// Bumped by exactly 1 on every state change.
    pub version: u64,
}

// ── Reservations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub user_id: String,
    pub room_id: Ulid,
    pub check_in: Ms,
    pub check_out: Ms,
    pub guests: u32,
    pub total_price: Money,
    pub status: ReservationStatus,
    pub created_at: Ms,
    pub version: u64,
}

impl Reservation {
    pub fn span(&self) -> Span {
        Span::new(self.check_in, self.check_out)
    }

    /// Cancelled reservations never occupy a room.
    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }
}

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// Booking form input after parsing, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub user_id: String,
    pub room_id: Ulid,
    pub check_in: Ms,
    pub check_out: Ms,
    pub guests: u32,
}

// ── Claims ───────────────────────────────────────────────────────

/// Key of a booking claim: one room, one requested stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimKey {
    pub room_id: Ulid,
    pub span: Span,
}

impl ClaimKey {
    pub fn new(room_id: Ulid, check_in: Ms, check_out: Ms) -> Self {
        Self {
            room_id,
            span: Span::new(check_in, check_out),
        }
    }

    /// Two claims contend when they target the same room with overlapping stays.
    pub fn contends_with(&self, other: &ClaimKey) -> bool {
        self.room_id == other.room_id && self.span.overlaps(&other.span)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub key: ClaimKey,
    pub holder: String,
    pub acquired_at: Ms,
}

impl Claim {
    /// A claim whose age reached the TTL is treated exactly like a released one.
    pub fn is_live(&self, now: Ms, ttl: Ms) -> bool {
        now - self.acquired_at < ttl
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        reservation: Reservation,
    },
    ReservationStatusChanged {
        id: Ulid,
        room_id: Ulid,
        status: ReservationStatus,
        version: u64,
    },
}

impl Event {
    pub fn room_id(&self) -> Ulid {
        match self {
            Event::ReservationCreated { reservation } => reservation.room_id,
            Event::ReservationStatusChanged { room_id, .. } => *room_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Tabs of the reservation-management view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationView {
    Active,
    Past,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub reservation: Reservation,
    pub room_number: Option<String>,
    pub can_cancel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // back-to-back
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn nights_round_up() {
        assert_eq!(Span::new(0, 3 * DAY_MS).nights(), 3);
        assert_eq!(Span::new(0, DAY_MS + 1).nights(), 2);
        assert_eq!(Span::new(0, HOUR_MS).nights(), 1);
    }

    #[test]
    fn claim_contention() {
        let room = Ulid::new();
        let a = ClaimKey::new(room, 0, 4 * DAY_MS);
        let b = ClaimKey::new(room, 2 * DAY_MS, 6 * DAY_MS);
        let c = ClaimKey::new(room, 4 * DAY_MS, 6 * DAY_MS);
        let other_room = ClaimKey::new(Ulid::new(), 0, 4 * DAY_MS);
        assert!(a.contends_with(&a));
        assert!(a.contends_with(&b));
        assert!(!a.contends_with(&c));
        assert!(!a.contends_with(&other_room));
    }

    #[test]
    fn claim_expiry_is_strict() {
        let claim = Claim {
            key: ClaimKey::new(Ulid::new(), 0, DAY_MS),
            holder: "u1".into(),
            acquired_at: 1_000,
        };
        assert!(claim.is_live(10_999, 10_000));
        assert!(!claim.is_live(11_000, 10_000));
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationCreated {
            reservation: Reservation {
                id: Ulid::new(),
                user_id: "u1".into(),
                room_id: Ulid::new(),
                check_in: 0,
                check_out: DAY_MS,
                guests: 2,
                total_price: 89,
                status: ReservationStatus::Confirmed,
                created_at: 0,
                version: 1,
            },
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
