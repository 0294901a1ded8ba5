//! Google Geocoding and Places (New) over HTTPS.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::places::{
    Coordinate, GeocodeResult, Geocoder, LocationBias, PlaceDetails, PlacesError, PlacesProvider,
    Suggestion,
};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const PLACES_URL: &str = "https://places.googleapis.com/v1";
const DETAILS_FIELD_MASK: &str = "displayName,formattedAddress,nationalPhoneNumber,regularOpeningHours";

#[derive(Debug, Clone)]
pub struct GoogleClient {
    client: Client,
    api_key: String,
    language: String,
}

impl GoogleClient {
    pub fn new(api_key: Option<&str>) -> Result<Self, PlacesError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(PlacesError::MissingApiKey)?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            language: "ja".to_string(),
        })
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, PlacesError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>() {
                Ok(envelope) => envelope.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
            };
            return Err(PlacesError::Api {
                status: status.as_u16().to_string(),
                message,
            });
        }
        Ok(response.json::<T>()?)
    }
}

impl Geocoder for GoogleClient {
    fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, PlacesError> {
        debug!("Geocoding '{}'", address);
        let response = self
            .client
            .get(GEOCODE_URL)
            .query(&[
                ("address", address),
                ("key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()?;
        parse_geocode(Self::handle_response(response)?)
    }
}

impl PlacesProvider for GoogleClient {
    fn autocomplete(
        &self,
        query: &str,
        session_token: &str,
        bias: &LocationBias,
    ) -> Result<Vec<Suggestion>, PlacesError> {
        debug!("Autocomplete '{}'", query);
        let body = json!({
            "input": query,
            "sessionToken": session_token,
            "languageCode": self.language,
            "locationBias": { "rectangle": RectangleBody::from(bias) },
        });
        let response = self
            .client
            .post(format!("{}/places:autocomplete", PLACES_URL))
            .header("X-Goog-Api-Key", &self.api_key)
            .json(&body)
            .send()?;
        Ok(parse_autocomplete(Self::handle_response(response)?))
    }

    fn place_details(&self, place_id: &str, session_token: &str) -> Result<PlaceDetails, PlacesError> {
        debug!("Place details '{}'", place_id);
        let response = self
            .client
            .get(format!("{}/places/{}", PLACES_URL, place_id))
            .query(&[("sessionToken", session_token), ("languageCode", self.language.as_str())])
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .send()?;
        Ok(parse_details(Self::handle_response(response)?))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct LatLngBody {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct RectangleBody {
    low: LatLngBody,
    high: LatLngBody,
}

impl From<&LocationBias> for RectangleBody {
    fn from(bias: &LocationBias) -> Self {
        let point = |c: Coordinate| LatLngBody {
            latitude: c.latitude,
            longitude: c.longitude,
        };
        Self {
            low: point(bias.low),
            high: point(bias.high),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn parse_geocode(body: GeocodeResponse) -> Result<Vec<GeocodeResult>, PlacesError> {
    if body.status != "OK" && body.status != "ZERO_RESULTS" {
        return Err(PlacesError::Api {
            status: body.status,
            message: body.error_message.unwrap_or_default(),
        });
    }
    Ok(body
        .results
        .into_iter()
        .map(|entry| GeocodeResult {
            coordinate: Coordinate::new(entry.geometry.location.lat, entry.geometry.location.lng),
            formatted_address: entry.formatted_address,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutocompleteResponse {
    #[serde(default)]
    suggestions: Vec<SuggestionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionEntry {
    place_prediction: Option<PlacePrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePrediction {
    place_id: String,
    text: LocalizedText,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

// Query predictions (no place id) can't be selected, so they are skipped.
fn parse_autocomplete(body: AutocompleteResponse) -> Vec<Suggestion> {
    body.suggestions
        .into_iter()
        .filter_map(|s| s.place_prediction)
        .map(|p| Suggestion {
            place_id: p.place_id,
            full_text: p.text.text,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsResponse {
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    national_phone_number: Option<String>,
    regular_opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpeningHours {
    #[serde(default)]
    weekday_descriptions: Vec<String>,
}

fn parse_details(body: DetailsResponse) -> PlaceDetails {
    PlaceDetails {
        name: body.display_name.map(|n| n.text),
        formatted_address: body.formatted_address,
        phone_number: body.national_phone_number,
        opening_hours: body
            .regular_opening_hours
            .map(|h| h.weekday_descriptions)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::JAPAN_BIAS;

    #[test]
    fn test_missing_key_is_rejected() {
        assert!(matches!(GoogleClient::new(None), Err(PlacesError::MissingApiKey)));
        assert!(matches!(GoogleClient::new(Some("  ")), Err(PlacesError::MissingApiKey)));
    }

    #[test]
    fn test_parse_geocode() {
        let body: GeocodeResponse = serde_json::from_value(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "1 Infinite Loop, Cupertino, CA 95014, USA",
                "geometry": { "location": { "lat": 37.3318, "lng": -122.0312 } }
            }]
        }))
        .unwrap();
        let results = parse_geocode(body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].coordinate, Coordinate::new(37.3318, -122.0312));
    }

    #[test]
    fn test_parse_geocode_errors() {
        let empty: GeocodeResponse =
            serde_json::from_value(json!({ "status": "ZERO_RESULTS", "results": [] })).unwrap();
        assert!(parse_geocode(empty).unwrap().is_empty());

        let denied: GeocodeResponse = serde_json::from_value(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }))
        .unwrap();
        match parse_geocode(denied) {
            Err(PlacesError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_autocomplete_skips_query_predictions() {
        let body: AutocompleteResponse = serde_json::from_value(json!({
            "suggestions": [
                { "placePrediction": {
                    "placeId": "ChIJ1",
                    "text": { "text": "Sushi A, Ginza, Tokyo" },
                    "structuredFormat": { "mainText": { "text": "Sushi A" } }
                } },
                { "queryPrediction": { "text": { "text": "sushi near me" } } }
            ]
        }))
        .unwrap();
        let suggestions = parse_autocomplete(body);
        assert_eq!(suggestions, vec![Suggestion {
            place_id: "ChIJ1".into(),
            full_text: "Sushi A, Ginza, Tokyo".into(),
        }]);

        let empty: AutocompleteResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parse_autocomplete(empty).is_empty());
    }

    #[test]
    fn test_parse_details() {
        let body: DetailsResponse = serde_json::from_value(json!({
            "displayName": { "text": "Ramen B", "languageCode": "ja" },
            "formattedAddress": "2-2 Shibuya, Tokyo",
            "regularOpeningHours": { "weekdayDescriptions": ["Monday: 11:00 – 22:00"] }
        }))
        .unwrap();
        let details = parse_details(body);
        assert_eq!(details.name.as_deref(), Some("Ramen B"));
        assert_eq!(details.phone_number, None);
        assert_eq!(details.opening_hours.len(), 1);
    }

    #[test]
    fn test_location_bias_body() {
        let value = serde_json::to_value(RectangleBody::from(&JAPAN_BIAS)).unwrap();
        assert_eq!(value["low"]["latitude"], json!(24.396308));
        assert_eq!(value["high"]["longitude"], json!(139.769018));
    }
}
