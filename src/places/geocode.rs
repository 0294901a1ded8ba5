use serde::Serialize;
use tracing::{info, warn};

use crate::places::{Coordinate, Geocoder};

/// Span used when centering the map on a resolved address.
pub const FALLBACK_SPAN_DEGREES: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPin {
    pub coordinate: Coordinate,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Viewport {
    pub fn centered(center: Coordinate) -> Self {
        Self {
            center,
            latitude_delta: FALLBACK_SPAN_DEGREES,
            longitude_delta: FALLBACK_SPAN_DEGREES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapState {
    pub pin: Option<MapPin>,
    pub viewport: Option<Viewport>,
}

/// Looks the address up once and pins the first hit. Any failure leaves the
/// previous pin and viewport as they were; returns whether the map moved.
pub fn resolve_address(geocoder: &dyn Geocoder, address: &str, map: &mut MapState) -> bool {
    let address = address.trim();
    if address.is_empty() {
        warn!("Address search skipped: empty address");
        return false;
    }

    let results = match geocoder.geocode(address) {
        Ok(results) => results,
        Err(e) => {
            warn!("Address search failed for '{}': {}", address, e);
            return false;
        }
    };

    let Some(first) = results.into_iter().next() else {
        warn!("Address search for '{}' returned no results", address);
        return false;
    };

    info!(
        "Pinned '{}' at {}, {}",
        first.formatted_address, first.coordinate.latitude, first.coordinate.longitude
    );
    map.viewport = Some(Viewport::centered(first.coordinate));
    map.pin = Some(MapPin {
        coordinate: first.coordinate,
        title: first.formatted_address,
    });
    true
}
