use std::io;
use std::path::Path;

use dashmap::DashMap;
use serde::Deserialize;
use ulid::Ulid;

use crate::limits::MAX_ROOMS;
use crate::model::*;

/// Authoritative list of rooms. Read-mostly: the booking flow never mutates it.
#[derive(Debug, Default)]
pub struct Inventory {
    rooms: DashMap<Ulid, Room>,
}

/// On-disk catalog entry. Ids are derived from the room number when absent.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: Option<Ulid>,
    number: String,
    category: RoomCategory,
    price_per_night: Money,
    #[serde(default)]
    amenities: Vec<String>,
}

/// Stable id for a seeded room, so fixtures survive restarts.
pub fn room_id_for_number(number: &str) -> Ulid {
    let n = number.bytes().fold(0u128, |acc, b| (acc << 8) | u128::from(b));
    Ulid::from_parts(0, n)
}

fn amenities(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let inv = Self::new();
        for room in rooms {
            inv.rooms.insert(room.id, room);
        }
        inv
    }

    /// The hotel's standard inventory: floors 1–3, basic to VIP. Each category
    /// shares a base amenity list; rooms differ in view and extras.
    pub fn with_default_rooms() -> Self {
        const BASIC: &[&str] = &["WiFi", "TV", "Private Bathroom", "Air Conditioning"];
        const PREMIUM: &[&str] = &["WiFi", "Smart TV", "Private Bathroom", "Air Conditioning"];
        const VIP: &[&str] = &[
            "WiFi",
            "Smart TV",
            "Luxury Bathroom",
            "Climate Control",
            "Premium Minibar",
        ];
        const VIP_SUITE: &[&str] =
            &["Jacuzzi", "Living Area", "Concierge Service", "Butler Service"];

        let mut rooms = Vec::new();
        let basic: [(&str, Money, &[&str]); 6] = [
            ("101", 89, &[]),
            ("102", 89, &[]),
            ("103", 89, &[]),
            ("104", 89, &[]),
            ("105", 95, &["Work Desk"]),
            ("106", 89, &[]),
        ];
        for (number, price, extras) in basic {
            let list = [BASIC, extras].concat();
            rooms.push((number, RoomCategory::Basic, price, amenities(&list)));
        }
        let premium: [(&str, Money, &str, &str, &[&str]); 7] = [
            ("201", 149, "Minibar", "Ocean View", &[]),
            ("202", 149, "Minibar", "Ocean View", &[]),
            ("203", 149, "Minibar", "Ocean View", &[]),
            ("204", 159, "Minibar", "City View", &["Balcony"]),
            ("205", 149, "Minibar", "Ocean View", &[]),
            ("206", 165, "Premium Minibar", "Ocean View", &["Spa Bath"]),
            ("207", 149, "Minibar", "Garden View", &[]),
        ];
        for (number, price, minibar, view, extras) in premium {
            let list = [PREMIUM, &[minibar, view, "Room Service"], extras].concat();
            rooms.push((number, RoomCategory::Premium, price, amenities(&list)));
        }
        let vip: [(&str, Money, &str, &[&str]); 6] = [
            ("301", 299, "Ocean View", &[]),
            ("302", 299, "Ocean View", &[]),
            ("303", 349, "Panoramic View", &["Private Terrace"]),
            ("304", 325, "Ocean View", &["Dining Area"]),
            ("305", 399, "Penthouse View", &["Private Kitchen", "Wine Cellar"]),
            ("306", 299, "Garden View", &[]),
        ];
        for (number, price, view, extras) in vip {
            let list = [VIP, &[view], VIP_SUITE, extras].concat();
            rooms.push((number, RoomCategory::Vip, price, amenities(&list)));
        }

        Self::from_rooms(rooms.into_iter().map(|(number, category, price, amenities)| Room {
            id: room_id_for_number(number),
            number: number.to_string(),
            category,
            price_per_night: price,
            amenities,
            is_available: true,
            version: 1,
        }))
    }

    /// Parse a JSON array of catalog entries.
    pub fn from_json(json: &str) -> io::Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if entries.len() > MAX_ROOMS {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "too many rooms"));
        }
        Ok(Self::from_rooms(entries.into_iter().map(|e| Room {
            id: e.id.unwrap_or_else(|| room_id_for_number(&e.number)),
            number: e.number,
            category: e.category,
            price_per_night: e.price_per_night,
            amenities: e.amenities,
            is_available: true,
            version: 1,
        })))
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: &Ulid) -> Option<Room> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn find_by_number(&self, number: &str) -> Option<Room> {
        self.rooms
            .iter()
            .find(|e| e.value().number == number)
            .map(|e| e.value().clone())
    }

    /// All rooms, ordered by display number.
    pub fn rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        rooms
    }

    /// Flip the out-of-service flag. Returns the updated room, or `None` if unknown.
    pub fn set_room_availability(&self, id: &Ulid, is_available: bool) -> Option<Room> {
        let mut entry = self.rooms.get_mut(id)?;
        let room = entry.value_mut();
        if room.is_available != is_available {
            room.is_available = is_available;
            room.version += 1;
        }
        Some(room.clone())
    }
}
