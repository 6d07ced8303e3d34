// Hotel service client
// Typed seam to the remote hotel service plus its reqwest implementation

use crate::models::{
    AvailabilityResponse, BookingConfirmation, BookingRequest, DateQuery, Hotel, Room,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// Errors returned by hotel service calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Service error: {status_code} - {}", .detail.as_deref().unwrap_or("no detail"))]
    ServiceError {
        status_code: u16,
        detail: Option<String>,
    },
}

impl ApiError {
    // Text shown to the user: the service's own detail when it sent one
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::ServiceError {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

// Identity sent with bookings. No account system exists, so these are fixed
// per client.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestProfile {
    pub name: String,
    pub email: String,
}

impl Default for GuestProfile {
    fn default() -> Self {
        Self {
            name: "Guest".to_string(),
            email: "guest@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub guest: GuestProfile,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            guest: GuestProfile::default(),
        }
    }
}

impl ClientConfig {
    // Reads STAYFINDER_* variables, falling back to defaults
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("STAYFINDER_BACKEND_URL") {
            if base_url.trim().is_empty() {
                return Err(ClientError::ConfigError(
                    "STAYFINDER_BACKEND_URL must not be empty".to_string(),
                ));
            }
            config.base_url = base_url.trim().to_string();
        }

        if let Some(timeout) = lookup("STAYFINDER_TIMEOUT_MS") {
            config.timeout_ms = timeout.trim().parse().map_err(|_| {
                ClientError::ConfigError(format!("invalid STAYFINDER_TIMEOUT_MS: {}", timeout))
            })?;
        }

        if let Some(name) = lookup("STAYFINDER_GUEST_NAME") {
            config.guest.name = name;
        }
        if let Some(email) = lookup("STAYFINDER_GUEST_EMAIL") {
            config.guest.email = email;
        }

        Ok(config)
    }
}

// Operations offered by the remote hotel service
#[async_trait]
pub trait HotelService: Send + Sync + 'static {
    // GET /hotels
    async fn list_hotels(&self) -> Result<Vec<Hotel>, ApiError>;

    // POST /seed
    async fn seed(&self) -> Result<(), ApiError>;

    // GET /hotels/{id}, rooms included
    async fn hotel_detail(&self, hotel_id: &str) -> Result<Hotel, ApiError>;

    // POST /availability/{id}
    async fn availability(
        &self,
        hotel_id: &str,
        query: &DateQuery,
    ) -> Result<Vec<Room>, ApiError>;

    // POST /book
    async fn book(&self, request: &BookingRequest) -> Result<BookingConfirmation, ApiError>;
}

pub struct HttpHotelService {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpHotelService {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| self.send_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = status.as_u16(), error = %e, "failed to read error body");
                String::new()
            }
        };
        let detail = extract_detail(&body);
        warn!(status = status.as_u16(), ?detail, "hotel service returned an error");
        Err(ApiError::ServiceError {
            status_code: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_ms)
            } else {
                ApiError::NetworkError(format!("invalid response body: {}", e))
            }
        })
    }
}

// Pulls `detail` out of an error body. Validation errors carry a structured
// detail, which is rendered as JSON. A blank detail counts as none.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) if detail.trim().is_empty() => None,
        serde_json::Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl HotelService for HttpHotelService {
    async fn list_hotels(&self) -> Result<Vec<Hotel>, ApiError> {
        debug!("listing hotels");
        let response = self.send(self.client.get(self.url("/hotels"))).await?;
        self.decode(response).await
    }

    async fn seed(&self) -> Result<(), ApiError> {
        debug!("seeding sample data");
        self.send(self.client.post(self.url("/seed"))).await?;
        Ok(())
    }

    async fn hotel_detail(&self, hotel_id: &str) -> Result<Hotel, ApiError> {
        debug!(hotel_id, "fetching hotel detail");
        let path = format!("/hotels/{}", hotel_id);
        let response = self.send(self.client.get(self.url(&path))).await?;
        self.decode(response).await
    }

    async fn availability(
        &self,
        hotel_id: &str,
        query: &DateQuery,
    ) -> Result<Vec<Room>, ApiError> {
        debug!(hotel_id, ?query, "checking availability");
        let path = format!("/availability/{}", hotel_id);
        let response = self
            .send(self.client.post(self.url(&path)).json(query))
            .await?;
        let body: AvailabilityResponse = self.decode(response).await?;
        Ok(body.available)
    }

    async fn book(&self, request: &BookingRequest) -> Result<BookingConfirmation, ApiError> {
        debug!(
            hotel_id = %request.hotel_id,
            room_id = %request.room_id,
            "submitting booking"
        );
        let response = self
            .send(self.client.post(self.url("/book")).json(request))
            .await?;
        self.decode(response).await
    }
}
