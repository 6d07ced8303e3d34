// Booking flow controller
// Drives room loading, availability checks and booking for one selected
// hotel. Every transition publishes an immutable snapshot for the
// presentation layer.

use crate::models::{AvailabilityResult, BookingRequest, DateQuery, Hotel, Room};
use crate::service::{ApiError, GuestProfile, HotelService};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const LOAD_ROOMS_FAILED: &str = "Failed to load rooms";
pub const AVAILABILITY_FAILED: &str = "Failed to check availability";
pub const BOOKING_FAILED: &str = "Booking failed";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    LoadingRoomDetail,
    RoomsLoaded,
    CheckingAvailability,
    AvailabilityKnown,
    Booking,
    BookingConfirmed(String),
    BookingFailed(String),
    LoadError(String),
}

impl FlowState {
    // States in which a fresh availability result may be booked against
    pub fn allows_booking(&self) -> bool {
        matches!(
            self,
            FlowState::AvailabilityKnown
                | FlowState::BookingConfirmed(_)
                | FlowState::BookingFailed(_)
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            FlowState::LoadingRoomDetail | FlowState::CheckingAvailability | FlowState::Booking
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid {field}: {message}")]
    ValidationError {
        field: &'static str,
        message: String,
    },

    // Operation called outside its precondition. Points at a presentation
    // bug, never shown to the user.
    #[error("Logic error: {0}")]
    LogicError(String),

    #[error("Superseded by a newer request")]
    Superseded,
}

fn invalid(field: &'static str, message: &str) -> FlowError {
    FlowError::ValidationError {
        field,
        message: message.to_string(),
    }
}

fn parse_date(value: &str, field: &'static str, label: &str) -> Result<NaiveDate, FlowError> {
    if value.trim().is_empty() {
        return Err(invalid(field, &format!("{} date is required", label)));
    }
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| invalid(field, &format!("{} must be a date in YYYY-MM-DD format", label)))
}

// Checks a query is submittable: both dates present and well formed,
// check-out strictly after check-in, at least one guest.
pub fn validate_query(query: &DateQuery) -> Result<(NaiveDate, NaiveDate), FlowError> {
    let check_in = parse_date(&query.check_in, "check_in", "Check-in")?;
    let check_out = parse_date(&query.check_out, "check_out", "Check-out")?;

    if check_out <= check_in {
        return Err(invalid("check_out", "Check-out must be after check-in"));
    }
    if query.guests < 1 {
        return Err(invalid("guests", "At least one guest is required"));
    }

    Ok((check_in, check_out))
}

// What the presentation layer renders after each transition
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub hotel: Option<Hotel>,
    pub rooms: Vec<Room>,
    pub query: DateQuery,
    pub available: BTreeSet<String>,
    pub message: String,
}

impl FlowSnapshot {
    pub fn can_book(&self, room_id: &str) -> bool {
        self.state.allows_booking() && self.available.contains(room_id)
    }
}

struct FlowInner {
    hotel: Option<Hotel>,
    rooms: Vec<Room>,
    query: DateQuery,
    availability: Option<AvailabilityResult>,
    state: FlowState,
    message: String,
    // Bumped on every hotel selection
    hotel_token: u64,
    // Bumped on hotel selection, query change and each availability check
    query_token: u64,
}

impl FlowInner {
    fn new() -> Self {
        Self {
            hotel: None,
            rooms: Vec::new(),
            query: DateQuery::default(),
            availability: None,
            state: FlowState::Idle,
            message: String::new(),
            hotel_token: 0,
            query_token: 0,
        }
    }

    fn snapshot(&self) -> FlowSnapshot {
        let available = match &self.availability {
            Some(availability) if availability.is_valid_for(&self.query) => {
                availability.room_ids.clone()
            }
            _ => BTreeSet::new(),
        };

        FlowSnapshot {
            state: self.state.clone(),
            hotel: self.hotel.clone(),
            rooms: self.rooms.clone(),
            query: self.query.clone(),
            available,
            message: self.message.clone(),
        }
    }

    // Returns true when the query actually changed
    fn apply_query(&mut self, query: DateQuery) -> bool {
        if self.query == query {
            return false;
        }

        self.query = query;
        self.query_token += 1;
        if self.availability.take().is_some() {
            debug!("availability invalidated by query change");
        }
        if self.state.allows_booking() || self.state == FlowState::CheckingAvailability {
            self.state = FlowState::RoomsLoaded;
        }
        true
    }

    fn settle(&mut self, state: fn(String) -> FlowState, message: String) {
        self.message = message.clone();
        self.state = state(message);
    }
}

pub struct BookingFlowController<S: HotelService> {
    service: Arc<S>,
    guest: GuestProfile,
    inner: Mutex<FlowInner>,
    snapshots: watch::Sender<FlowSnapshot>,
}

impl<S: HotelService> BookingFlowController<S> {
    pub fn new(service: Arc<S>, guest: GuestProfile) -> Self {
        let inner = FlowInner::new();
        let (snapshots, _) = watch::channel(inner.snapshot());
        Self {
            service,
            guest,
            inner: Mutex::new(inner),
            snapshots,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn state(&self) -> FlowState {
        self.inner.lock().state.clone()
    }

    fn publish(&self, inner: &FlowInner) {
        self.snapshots.send_replace(inner.snapshot());
    }

    fn logic_error(&self, reason: impl Into<String>) -> FlowError {
        let reason = reason.into();
        warn!(%reason, "flow operation called outside its precondition");
        FlowError::LogicError(reason)
    }

    // Starts viewing a hotel: resets the query and loads its rooms. A late
    // response for an earlier selection is dropped.
    pub async fn select_hotel(&self, hotel: &Hotel) -> Result<FlowState, FlowError> {
        let token = {
            let mut inner = self.inner.lock();
            inner.hotel_token += 1;
            inner.query_token += 1;
            inner.hotel = Some(hotel.clone());
            inner.rooms.clear();
            inner.query = DateQuery::default();
            inner.availability = None;
            inner.message.clear();
            inner.state = FlowState::LoadingRoomDetail;
            self.publish(&inner);
            inner.hotel_token
        };

        info!(hotel_id = %hotel.id, token, "loading room detail");
        let result = self.service.hotel_detail(&hotel.id).await;

        let mut inner = self.inner.lock();
        if inner.hotel_token != token {
            debug!(hotel_id = %hotel.id, token, "discarding stale room detail");
            return Err(FlowError::Superseded);
        }

        match result {
            Ok(mut detail) => {
                inner.rooms = std::mem::take(&mut detail.rooms);
                inner.hotel = Some(detail);
                inner.state = FlowState::RoomsLoaded;
                debug!(hotel_id = %hotel.id, rooms = inner.rooms.len(), "rooms loaded");
                self.publish(&inner);
                Ok(inner.state.clone())
            }
            Err(err) => {
                warn!(hotel_id = %hotel.id, error = %err, "failed to load rooms");
                inner.rooms.clear();
                inner.settle(FlowState::LoadError, LOAD_ROOMS_FAILED.to_string());
                self.publish(&inner);
                Err(err.into())
            }
        }
    }

    // Leaves the current hotel; anything still in flight is discarded
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let hotel_token = inner.hotel_token + 1;
        let query_token = inner.query_token + 1;
        *inner = FlowInner::new();
        inner.hotel_token = hotel_token;
        inner.query_token = query_token;
        self.publish(&inner);
    }

    pub fn set_query(&self, query: DateQuery) {
        let mut inner = self.inner.lock();
        if inner.apply_query(query) {
            self.publish(&inner);
        }
    }

    pub fn set_check_in(&self, check_in: impl Into<String>) {
        let check_in = check_in.into();
        self.update_query(|query| query.check_in = check_in);
    }

    pub fn set_check_out(&self, check_out: impl Into<String>) {
        let check_out = check_out.into();
        self.update_query(|query| query.check_out = check_out);
    }

    pub fn set_guests(&self, guests: u32) {
        self.update_query(|query| query.guests = guests);
    }

    fn update_query(&self, edit: impl FnOnce(&mut DateQuery)) {
        let mut inner = self.inner.lock();
        let mut query = inner.query.clone();
        edit(&mut query);
        if inner.apply_query(query) {
            self.publish(&inner);
        }
    }

    pub async fn check_availability(&self, query: DateQuery) -> Result<FlowState, FlowError> {
        let (hotel_id, query, token) = {
            let mut inner = self.inner.lock();
            let hotel_id = match &inner.hotel {
                Some(hotel) => hotel.id.clone(),
                None => return Err(self.logic_error("no hotel selected")),
            };
            match inner.state {
                FlowState::LoadingRoomDetail => {
                    return Err(self.logic_error("rooms are still loading"))
                }
                FlowState::Booking => return Err(self.logic_error("a booking is in progress")),
                _ => {}
            }

            inner.apply_query(query);
            if let Err(err) = validate_query(&inner.query) {
                if let FlowError::ValidationError { message, .. } = &err {
                    inner.message = message.clone();
                }
                debug!(error = %err, "availability query rejected");
                self.publish(&inner);
                return Err(err);
            }

            inner.query_token += 1;
            inner.availability = None;
            inner.message.clear();
            inner.state = FlowState::CheckingAvailability;
            self.publish(&inner);
            (hotel_id, inner.query.clone(), inner.query_token)
        };

        info!(%hotel_id, ?query, "checking availability");
        let result = self.service.availability(&hotel_id, &query).await;

        let mut inner = self.inner.lock();
        if inner.query_token != token {
            debug!(%hotel_id, token, "discarding stale availability");
            return Err(FlowError::Superseded);
        }

        match result {
            Ok(rooms) => {
                let availability = AvailabilityResult::new(query, &rooms);
                debug!(%hotel_id, available = availability.room_ids.len(), "availability known");
                inner.availability = Some(availability);
                inner.state = FlowState::AvailabilityKnown;
                self.publish(&inner);
                Ok(inner.state.clone())
            }
            Err(err) => {
                warn!(%hotel_id, error = %err, "availability check failed");
                inner.availability = None;
                inner.settle(FlowState::LoadError, err.user_message(AVAILABILITY_FAILED));
                self.publish(&inner);
                Err(err.into())
            }
        }
    }

    // Books a room from the current availability result. The total price is
    // left at zero; the service prices the booking.
    pub async fn book_room(&self, room: &Room) -> Result<FlowState, FlowError> {
        let (request, token) = {
            let mut inner = self.inner.lock();
            if inner.state == FlowState::Booking {
                return Err(self.logic_error("a booking is already in progress"));
            }
            if !inner.state.allows_booking() {
                return Err(self.logic_error(format!(
                    "cannot book while in state {:?}",
                    inner.state
                )));
            }

            let availability = match inner.availability.as_ref() {
                Some(availability) if availability.is_valid_for(&inner.query) => availability,
                _ => return Err(self.logic_error("availability is missing or stale")),
            };
            if !availability.contains(&room.id) {
                return Err(self.logic_error(format!(
                    "room {} is not available for the current dates",
                    room.id
                )));
            }
            let hotel_id = match &inner.hotel {
                Some(hotel) => hotel.id.clone(),
                None => return Err(self.logic_error("no hotel selected")),
            };

            let request = BookingRequest {
                hotel_id,
                room_id: room.id.clone(),
                guest_name: self.guest.name.clone(),
                guest_email: self.guest.email.clone(),
                check_in: inner.query.check_in.clone(),
                check_out: inner.query.check_out.clone(),
                guests: inner.query.guests,
                total_price: 0.0,
                status: "confirmed".to_string(),
            };

            inner.message.clear();
            inner.state = FlowState::Booking;
            self.publish(&inner);
            (request, inner.hotel_token)
        };

        info!(
            hotel_id = %request.hotel_id,
            room_id = %request.room_id,
            check_in = %request.check_in,
            check_out = %request.check_out,
            "submitting booking"
        );
        let result = self.service.book(&request).await;

        let mut inner = self.inner.lock();
        if inner.hotel_token != token {
            warn!(
                room_id = %request.room_id,
                "booking resolved after the hotel changed, discarding"
            );
            return Err(FlowError::Superseded);
        }

        match result {
            Ok(confirmation) => {
                let message = format!("Booking confirmed. Total {}", confirmation.total_price);
                if let Some(availability) = inner.availability.as_mut() {
                    availability.room_ids.remove(&request.room_id);
                }
                info!(
                    room_id = %request.room_id,
                    total_price = confirmation.total_price,
                    "booking confirmed"
                );
                inner.settle(FlowState::BookingConfirmed, message);
                self.publish(&inner);
                Ok(inner.state.clone())
            }
            Err(err) => {
                warn!(room_id = %request.room_id, error = %err, "booking failed");
                inner.settle(FlowState::BookingFailed, err.user_message(BOOKING_FAILED));
                self.publish(&inner);
                Err(err.into())
            }
        }
    }
}
