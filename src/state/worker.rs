use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, info};

use crate::places::{
    GeocodeResult, Geocoder, PlaceDetails, PlacesError, PlacesProvider, QueryTicket, Suggestion,
};

#[derive(Debug, Clone)]
pub enum LookupRequest {
    Autocomplete(QueryTicket),
    Details { place_id: String, session_token: String },
    Geocode { address: String },
}

#[derive(Debug)]
pub enum LookupResponse {
    Suggestions {
        ticket: QueryTicket,
        result: Result<Vec<Suggestion>, PlacesError>,
    },
    Details {
        place_id: String,
        result: Result<PlaceDetails, PlacesError>,
    },
    Geocoded {
        address: String,
        result: Result<Vec<GeocodeResult>, PlacesError>,
    },
}

/// Runs place lookups off the calling thread.
///
/// Requests are fire-and-forget; responses come back on [`LookupWorker::responses`]
/// in completion order, which may differ from submission order. Callers match
/// them against their current ticket.
pub struct LookupWorker {
    tx: Option<Sender<LookupRequest>>,
    rx: Receiver<LookupResponse>,
    handles: Vec<JoinHandle<()>>,
}

impl LookupWorker {
    pub fn spawn<P>(provider: Arc<P>, num_workers: usize) -> Self
    where
        P: Geocoder + PlacesProvider + 'static,
    {
        let (req_tx, req_rx) = bounded::<LookupRequest>(64);
        let (resp_tx, resp_rx) = unbounded::<LookupResponse>();

        let mut handles = Vec::new();
        for i in 0..num_workers.max(1) {
            let rx = req_rx.clone();
            let tx = resp_tx.clone();
            let provider = provider.clone();
            handles.push(thread::spawn(move || {
                debug!("Lookup worker {} started", i);
                for request in rx {
                    let response = run(provider.as_ref(), request);
                    if tx.send(response).is_err() {
                        break;
                    }
                }
                debug!("Lookup worker {} finished", i);
            }));
        }
        info!("Started {} lookup worker(s)", handles.len());

        Self {
            tx: Some(req_tx),
            rx: resp_rx,
            handles,
        }
    }

    /// Queues a request; false once the workers are gone.
    pub fn submit(&self, request: LookupRequest) -> bool {
        match &self.tx {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    pub fn responses(&self) -> &Receiver<LookupResponse> {
        &self.rx
    }

    /// Stops accepting requests and waits for in-flight ones to finish.
    pub fn shutdown(&mut self) {
        self.tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for LookupWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<P: Geocoder + PlacesProvider + ?Sized>(provider: &P, request: LookupRequest) -> LookupResponse {
    match request {
        LookupRequest::Autocomplete(ticket) => {
            let result = provider.autocomplete(&ticket.query, &ticket.session_token, &ticket.bias);
            LookupResponse::Suggestions { ticket, result }
        }
        LookupRequest::Details { place_id, session_token } => {
            let result = provider.place_details(&place_id, &session_token);
            LookupResponse::Details { place_id, result }
        }
        LookupRequest::Geocode { address } => {
            let result = provider.geocode(&address);
            LookupResponse::Geocoded { address, result }
        }
    }
}
