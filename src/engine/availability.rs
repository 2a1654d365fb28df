use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate};
use ulid::Ulid;

use crate::model::*;
use crate::store::StoreError;

use super::Engine;

// ── Pure availability functions ──────────────────────────────────

/// Non-cancelled reservations on `room_id`.
fn active_on_room<'a>(
    reservations: &'a [Reservation],
    room_id: Ulid,
) -> impl Iterator<Item = &'a Reservation> + 'a {
    reservations
        .iter()
        .filter(move |r| r.room_id == room_id && r.is_active())
}

/// First non-cancelled reservation on the room overlapping `span`.
pub fn first_conflict<'a>(
    reservations: &'a [Reservation],
    room_id: Ulid,
    span: &Span,
) -> Option<&'a Reservation> {
    active_on_room(reservations, room_id).find(|r| r.span().overlaps(span))
}

/// True iff no non-cancelled reservation on the room overlaps `span`.
/// Back-to-back stays (check-out day = next check-in day) do not conflict.
pub fn is_available(reservations: &[Reservation], room_id: Ulid, span: &Span) -> bool {
    first_conflict(reservations, room_id, span).is_none()
}

/// UTC calendar day containing `t`.
pub fn day_of(t: Ms) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(t).map(|dt| dt.date_naive())
}

/// Every calendar day touched by a non-cancelled reservation on the room,
/// check-in and check-out days included. Ascending, no duplicates.
pub fn blocked_dates(reservations: &[Reservation], room_id: Ulid) -> Vec<NaiveDate> {
    let mut days = BTreeSet::new();
    for r in active_on_room(reservations, room_id) {
        let mut cursor = r.check_in;
        while cursor <= r.check_out {
            if let Some(day) = day_of(cursor) {
                days.insert(day);
            }
            cursor += DAY_MS;
        }
    }
    days.into_iter().collect()
}

/// Rooms holding a non-cancelled reservation that checks out after `as_of`.
pub fn occupied_rooms(reservations: &[Reservation], as_of: Ms) -> HashSet<Ulid> {
    reservations
        .iter()
        .filter(|r| r.is_active() && r.check_out > as_of)
        .map(|r| r.room_id)
        .collect()
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// `base` minus `to_remove`. Both inputs must be sorted and disjoint.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < b.end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < b.end {
            result.push(Span::new(current_start, b.end));
        }
    }

    result
}

// ── Engine queries ───────────────────────────────────────────────

impl Engine {
    /// Calendar days to disable in the date picker for `room_id`.
    pub async fn blocked_dates(&self, room_id: Ulid) -> Result<Vec<NaiveDate>, StoreError> {
        let reservations = self.store.read_room_reservations(room_id).await?;
        Ok(blocked_dates(&reservations, room_id))
    }

    /// Fine-grained check for one stay. An empty or inverted range is never available.
    pub async fn is_available(
        &self,
        room_id: Ulid,
        check_in: Ms,
        check_out: Ms,
    ) -> Result<bool, StoreError> {
        if check_out <= check_in {
            return Ok(false);
        }
        let reservations = self.store.read_room_reservations(room_id).await?;
        Ok(is_available(&reservations, room_id, &Span::new(check_in, check_out)))
    }

    /// Coarse list for the room dropdown: a room drops out while any
    /// non-cancelled reservation on it still has its check-out ahead of `as_of`.
    pub async fn list_available_rooms(&self, as_of: Ms) -> Result<Vec<Room>, StoreError> {
        let reservations = self.store.read_all_reservations().await?;
        let occupied = occupied_rooms(&reservations, as_of);
        Ok(self
            .inventory
            .rooms()
            .into_iter()
            .filter(|room| !occupied.contains(&room.id))
            .collect())
    }

    /// Parts of `window` where the room is free, for suggesting other dates.
    pub async fn free_ranges(&self, room_id: Ulid, window: Span) -> Result<Vec<Span>, StoreError> {
        let reservations = self.store.read_room_reservations(room_id).await?;
        let mut taken: Vec<Span> = active_on_room(&reservations, room_id)
            .map(Reservation::span)
            .filter(|s| s.overlaps(&window))
            .collect();
        taken.sort_by_key(|s| s.start);
        let taken = merge_overlapping(&taken);
        Ok(subtract_intervals(&[window], &taken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: Ms = DAY_MS;

    fn reservation(
        room_id: Ulid,
        check_in: Ms,
        check_out: Ms,
        status: ReservationStatus,
    ) -> Reservation {
        Reservation {
            id: Ulid::new(),
            user_id: "guest".into(),
            room_id,
            check_in,
            check_out,
            guests: 1,
            total_price: 0,
            status,
            created_at: 0,
            version: 1,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ms(y: i32, m: u32, d: u32) -> Ms {
        date(y, m, d).and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis()
    }

    #[test]
    fn disjoint_range_is_available() {
        let room = Ulid::new();
        let rs = vec![
            reservation(room, 0, 2 * D, ReservationStatus::Confirmed),
            reservation(room, 5 * D, 7 * D, ReservationStatus::Confirmed),
        ];
        assert!(is_available(&rs, room, &Span::new(2 * D, 5 * D)));
        assert!(is_available(&rs, room, &Span::new(8 * D, 9 * D)));
        assert!(!is_available(&rs, room, &Span::new(D, 3 * D)));
        assert!(!is_available(&rs, room, &Span::new(4 * D, 8 * D)));
        // Enclosing range
        assert!(!is_available(&rs, room, &Span::new(0, 10 * D)));
    }

    #[test]
    fn back_to_back_is_not_a_conflict() {
        let room = Ulid::new();
        let rs = vec![reservation(
            room,
            ms(2024, 8, 1),
            ms(2024, 8, 5),
            ReservationStatus::Confirmed,
        )];
        assert!(is_available(&rs, room, &Span::new(ms(2024, 8, 5), ms(2024, 8, 9))));
        assert!(is_available(&rs, room, &Span::new(ms(2024, 7, 28), ms(2024, 8, 1))));
    }

    #[test]
    fn first_conflict_names_the_blocking_reservation() {
        let room = Ulid::new();
        let rs = vec![
            reservation(room, ms(2024, 8, 1), ms(2024, 8, 3), ReservationStatus::Cancelled),
            reservation(room, ms(2024, 8, 2), ms(2024, 8, 6), ReservationStatus::Confirmed),
            reservation(room, ms(2024, 8, 6), ms(2024, 8, 9), ReservationStatus::Confirmed),
        ];
        let span = Span::new(ms(2024, 8, 1), ms(2024, 8, 4));
        assert_eq!(first_conflict(&rs, room, &span).map(|r| r.id), Some(rs[1].id));
        assert!(first_conflict(&rs, Ulid::new(), &span).is_none());
    }

    #[test]
    fn cancelled_and_other_rooms_ignored() {
        let room = Ulid::new();
        let rs = vec![
            reservation(room, 0, 4 * D, ReservationStatus::Cancelled),
            reservation(Ulid::new(), 0, 4 * D, ReservationStatus::Confirmed),
        ];
        assert!(is_available(&rs, room, &Span::new(D, 2 * D)));
        // Pending still occupies the room.
        let rs = vec![reservation(room, 0, 4 * D, ReservationStatus::Pending)];
        assert!(!is_available(&rs, room, &Span::new(D, 2 * D)));
    }

    #[test]
    fn blocked_dates_inclusive_sorted_dedup() {
        let room = Ulid::new();
        let rs = vec![
            reservation(room, ms(2024, 8, 15), ms(2024, 8, 18), ReservationStatus::Confirmed),
            reservation(room, ms(2024, 8, 10), ms(2024, 8, 12), ReservationStatus::Confirmed),
            // Touches the first one's check-out day
            reservation(room, ms(2024, 8, 18), ms(2024, 8, 19), ReservationStatus::Confirmed),
            reservation(room, ms(2024, 9, 1), ms(2024, 9, 3), ReservationStatus::Cancelled),
        ];
        let days = blocked_dates(&rs, room);
        assert_eq!(
            days,
            vec![
                date(2024, 8, 10),
                date(2024, 8, 11),
                date(2024, 8, 12),
                date(2024, 8, 15),
                date(2024, 8, 16),
                date(2024, 8, 17),
                date(2024, 8, 18),
                date(2024, 8, 19),
            ]
        );
        assert!(blocked_dates(&rs, Ulid::new()).is_empty());
    }

    #[test]
    fn blocked_dates_stop_before_checkout_instant() {
        // Noon check-in, 10:00 check-out: whole-day steps from noon skip the check-out day.
        let room = Ulid::new();
        let check_in = ms(2024, 8, 1) + 12 * HOUR_MS;
        let check_out = ms(2024, 8, 3) + 10 * HOUR_MS;
        let rs = vec![reservation(room, check_in, check_out, ReservationStatus::Confirmed)];
        assert_eq!(blocked_dates(&rs, room), vec![date(2024, 8, 1), date(2024, 8, 2)]);
    }

    #[test]
    fn occupied_uses_checkout_only() {
        let room = Ulid::new();
        let rs = vec![reservation(room, 10 * D, 12 * D, ReservationStatus::Confirmed)];
        // Before, during: occupied. At or after check-out: free.
        assert!(occupied_rooms(&rs, 0).contains(&room));
        assert!(occupied_rooms(&rs, 11 * D).contains(&room));
        assert!(!occupied_rooms(&rs, 12 * D).contains(&room));
        let rs = vec![reservation(room, 10 * D, 12 * D, ReservationStatus::Cancelled)];
        assert!(occupied_rooms(&rs, 0).is_empty());
    }

    // ── merge / subtract ─────────────────────────────────

    #[test]
    fn merge_adjacent_and_overlapping() {
        let merged = merge_overlapping(&[
            Span::new(0, 10),
            Span::new(10, 20),
            Span::new(15, 30),
            Span::new(40, 50),
        ]);
        assert_eq!(merged, vec![Span::new(0, 30), Span::new(40, 50)]);
    }

    #[test]
    fn subtract_no_overlap() {
        let base = vec![Span::new(100, 200), Span::new(300, 400)];
        let remove = vec![Span::new(200, 300)];
        assert_eq!(subtract_intervals(&base, &remove), base);
    }

    #[test]
    fn subtract_full_overlap() {
        let result = subtract_intervals(&[Span::new(100, 200)], &[Span::new(50, 250)]);
        assert!(result.is_empty());
    }

    #[test]
    fn subtract_middle_punch() {
        let result = subtract_intervals(&[Span::new(100, 300)], &[Span::new(150, 200)]);
        assert_eq!(result, vec![Span::new(100, 150), Span::new(200, 300)]);
    }

    #[test]
    fn subtract_multiple_punches() {
        let remove = vec![Span::new(100, 200), Span::new(400, 500), Span::new(800, 900)];
        let result = subtract_intervals(&[Span::new(0, 1000)], &remove);
        assert_eq!(
            result,
            vec![
                Span::new(0, 100),
                Span::new(200, 400),
                Span::new(500, 800),
                Span::new(900, 1000)
            ]
        );
    }
}
