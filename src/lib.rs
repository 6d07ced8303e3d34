// Client library for the StayFinder hotel service

pub mod catalog;
pub mod flow;
pub mod models;
pub mod service;

// Re-export key types for convenience
pub use catalog::{CatalogState, HotelCatalog};
pub use flow::{validate_query, BookingFlowController, FlowError, FlowSnapshot, FlowState};
pub use models::{
    AvailabilityResult, BookingConfirmation, BookingRequest, DateQuery, Hotel, Room,
};
pub use service::{
    ApiError, ClientConfig, ClientError, GuestProfile, HotelService, HttpHotelService,
};
