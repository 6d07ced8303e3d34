// Hotel catalog
// Listing screen state: the hotel summaries plus sample-data seeding

use crate::models::Hotel;
use crate::service::HotelService;
use std::sync::Arc;
use tracing::{info, warn};

pub const LOAD_HOTELS_FAILED: &str = "Failed to load hotels";
pub const SEED_FAILED: &str = "Failed to add sample data";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub hotels: Vec<Hotel>,
    pub loading: bool,
    pub seeding: bool,
    pub error: String,
}

impl CatalogState {
    // Seeding is only offered once loading finished with nothing to show
    pub fn needs_seed(&self) -> bool {
        !self.loading && self.hotels.is_empty()
    }
}

pub struct HotelCatalog<S: HotelService> {
    service: Arc<S>,
    state: CatalogState,
}

impl<S: HotelService> HotelCatalog<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            state: CatalogState::default(),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    // Refreshes the list. The previous list is kept when the call fails.
    pub async fn load_hotels(&mut self) -> &CatalogState {
        self.state.loading = true;
        match self.service.list_hotels().await {
            Ok(hotels) => {
                info!(count = hotels.len(), "hotels loaded");
                self.state.hotels = hotels;
                self.state.error.clear();
            }
            Err(err) => {
                warn!(error = %err, "failed to load hotels");
                self.state.error = LOAD_HOTELS_FAILED.to_string();
            }
        }
        self.state.loading = false;
        &self.state
    }

    pub async fn seed(&mut self) -> &CatalogState {
        self.state.seeding = true;
        match self.service.seed().await {
            Ok(()) => {
                info!("sample data added");
                self.load_hotels().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to add sample data");
                self.state.error = SEED_FAILED.to_string();
            }
        }
        self.state.seeding = false;
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mock_server::MockServer;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_empty_catalog_needs_seed() {
        let server = Arc::new(MockServer::new());
        let mut catalog = HotelCatalog::new(server.clone());

        let state = catalog.load_hotels().await;
        assert!(state.hotels.is_empty());
        assert!(state.error.is_empty());
        assert!(!state.loading);
        assert!(state.needs_seed());
    }

    #[tokio::test]
    async fn test_seed_then_reload() {
        let server = Arc::new(MockServer::new());
        let mut catalog = HotelCatalog::new(server.clone());

        let state = catalog.seed().await;
        assert_eq!(state.hotels.len(), 2);
        assert!(!state.seeding);
        assert!(!state.needs_seed());
        assert!(state.hotels.iter().all(|hotel| hotel.rooms.is_empty()));
        assert_eq!(server.seed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(server.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_list() {
        let server = Arc::new(MockServer::new());
        server.add_hotel("h1", vec![]).await;
        let mut catalog = HotelCatalog::new(server.clone());
        catalog.load_hotels().await;

        server.fail_next_requests(1);
        let state = catalog.load_hotels().await;
        assert_eq!(state.error, LOAD_HOTELS_FAILED);
        assert_eq!(state.hotels.len(), 1);

        catalog.load_hotels().await;
        assert!(catalog.state().error.is_empty());
        assert_eq!(catalog.state().hotels[0].id, "h1");
    }

    #[tokio::test]
    async fn test_seed_failure_sets_error() {
        let server = Arc::new(MockServer::new());
        let mut catalog = HotelCatalog::new(server.clone());
        server.fail_next_requests(1);

        let state = catalog.seed().await;
        assert_eq!(state.error, SEED_FAILED);
        assert!(!state.seeding);
        assert_eq!(server.list_calls.load(Ordering::SeqCst), 0);
    }
}
