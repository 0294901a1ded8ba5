use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::StoreDetail;
use crate::places::{LocationBias, PlaceDetails, PlacesError, PlacesProvider, Suggestion, JAPAN_BIAS};

/// Identifies one issued autocomplete request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTicket {
    pub generation: u64,
    pub query: String,
    pub session_token: String,
    pub bias: LocationBias,
}

/// Suggestion list of the store search screen.
///
/// Every query bumps a generation counter; a result is only applied when its
/// ticket is still the newest one, so a slow early response can't overwrite
/// a later one.
#[derive(Debug, Clone)]
pub struct AutocompleteSession {
    session_token: String,
    generation: u64,
    bias: LocationBias,
    suggestions: Vec<Suggestion>,
}

impl Default for AutocompleteSession {
    fn default() -> Self {
        Self::new(JAPAN_BIAS)
    }
}

impl AutocompleteSession {
    pub fn new(bias: LocationBias) -> Self {
        Self {
            session_token: new_token(),
            generation: 0,
            bias,
            suggestions: Vec::new(),
        }
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn bias(&self) -> &LocationBias {
        &self.bias
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Starts a query. An empty query clears the list and issues nothing.
    pub fn begin(&mut self, query: &str) -> Option<QueryTicket> {
        self.generation += 1;
        if query.is_empty() {
            self.suggestions.clear();
            return None;
        }
        Some(QueryTicket {
            generation: self.generation,
            query: query.to_string(),
            session_token: self.session_token.clone(),
            bias: self.bias,
        })
    }

    pub fn is_current(&self, ticket: &QueryTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Applies a finished request. Returns false when the ticket was stale.
    pub fn complete(
        &mut self,
        ticket: &QueryTicket,
        result: Result<Vec<Suggestion>, PlacesError>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!("Dropping stale autocomplete result for '{}'", ticket.query);
            return false;
        }
        match result {
            Ok(suggestions) => self.suggestions = suggestions,
            Err(e) => {
                warn!("Autocomplete error: {}", e);
                self.suggestions.clear();
            }
        }
        true
    }

    /// Runs a query synchronously against the provider.
    pub fn search(&mut self, provider: &dyn PlacesProvider, query: &str) -> &[Suggestion] {
        if let Some(ticket) = self.begin(query) {
            let result = provider.autocomplete(&ticket.query, &ticket.session_token, &ticket.bias);
            self.complete(&ticket, result);
        }
        &self.suggestions
    }

    /// Fetches details for a picked suggestion. The details call closes the
    /// billing session, so a new token is started afterwards either way.
    pub fn select(
        &mut self,
        provider: &dyn PlacesProvider,
        suggestion: &Suggestion,
    ) -> Result<PlaceDetails, PlacesError> {
        let result = provider.place_details(&suggestion.place_id, &self.session_token);
        self.end_session();
        result
    }

    pub fn end_session(&mut self) {
        self.session_token = new_token();
        self.generation += 1;
        self.suggestions.clear();
    }
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

impl PlaceDetails {
    /// Copies the fetched fields into a form; absent fields leave it as is.
    pub fn apply_to(&self, detail: &mut StoreDetail) {
        if let Some(name) = &self.name {
            detail.store_name = name.clone();
        }
        if let Some(address) = &self.formatted_address {
            detail.address = address.clone();
        }
        if let Some(phone) = &self.phone_number {
            detail.phone_number = phone.clone();
        }
        if !self.opening_hours.is_empty() {
            detail.business_hours = self.opening_hours.join("\n");
        }
        info!("Filled store details from place '{}'", detail.store_name);
    }
}
