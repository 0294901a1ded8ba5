//! Place lookup: forward geocoding of addresses and place-name autocomplete.
//!
//! The rest of the crate only talks to the [`Geocoder`] and [`PlacesProvider`]
//! traits; [`google::GoogleClient`] is the HTTP implementation.

pub mod autocomplete;
pub mod geocode;
pub mod google;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use autocomplete::{AutocompleteSession, QueryTicket};
pub use geocode::{resolve_address, MapPin, MapState, Viewport};

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("places API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("places API returned {status}: {message}")]
    Api { status: String, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Rectangle the autocomplete results are biased toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationBias {
    pub low: Coordinate,
    pub high: Coordinate,
}

/// Rough bounding box of Japan.
pub const JAPAN_BIAS: LocationBias = LocationBias {
    low: Coordinate::new(24.396308, 122.93457),
    high: Coordinate::new(45.551483, 139.769018),
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub coordinate: Coordinate,
    pub formatted_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub place_id: String,
    pub full_text: String,
}

/// The fixed field set fetched when a suggestion is picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub phone_number: Option<String>,
    pub opening_hours: Vec<String>,
}

pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, PlacesError>;
}

pub trait PlacesProvider: Send + Sync {
    fn autocomplete(
        &self,
        query: &str,
        session_token: &str,
        bias: &LocationBias,
    ) -> Result<Vec<Suggestion>, PlacesError>;

    fn place_details(&self, place_id: &str, session_token: &str) -> Result<PlaceDetails, PlacesError>;
}
