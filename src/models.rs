use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Hotel as returned by the hotel service. The listing endpoint omits rooms,
// the detail endpoint nests them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub location: String,
    pub description: String,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    pub amenities: Vec<String>,
    pub rooms: Vec<Room>,
}

impl Hotel {
    // Summary reference used to start a detail fetch
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub price_per_night: f64,
    pub capacity: u32,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
}

// Date/guest query, also the body of the availability request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateQuery {
    pub check_in: String,
    pub check_out: String,
    pub guests: u32,
}

impl Default for DateQuery {
    fn default() -> Self {
        Self {
            check_in: String::new(),
            check_out: String::new(),
            guests: 1,
        }
    }
}

impl DateQuery {
    pub fn new(check_in: impl Into<String>, check_out: impl Into<String>, guests: u32) -> Self {
        Self {
            check_in: check_in.into(),
            check_out: check_out.into(),
            guests,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AvailabilityResponse {
    pub available: Vec<Room>,
}

// Room ids available for the query they were computed against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityResult {
    pub query: DateQuery,
    pub room_ids: BTreeSet<String>,
}

impl AvailabilityResult {
    pub fn new(query: DateQuery, rooms: &[Room]) -> Self {
        Self {
            query,
            room_ids: rooms.iter().map(|room| room.id.clone()).collect(),
        }
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.room_ids.contains(room_id)
    }

    pub fn is_valid_for(&self, query: &DateQuery) -> bool {
        &self.query == query
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    pub hotel_id: String,
    pub room_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub check_in: String,
    pub check_out: String,
    pub guests: u32,
    // Placeholder; the service computes the real price
    pub total_price: f64,
    pub status: String,
}

// Service echo of a booking. `total_price` is the authoritative price and
// must be present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookingConfirmation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub hotel_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    pub total_price: f64,
    #[serde(default)]
    pub status: Option<String>,
}
