//! Screen state held as plain values, changed only through actions.
//!
//! A [`StateStore`] wraps a [`Reducer`] and bumps a revision number whenever an
//! action changes the state; subscribers receive that revision over a channel
//! and re-render from [`StateStore::state`].

pub mod editor;
pub mod home;
pub mod worker;

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::debug;

pub use editor::{EditorPhoto, EditorState};
pub use home::{HomeAction, HomeController, HomeState};
pub use worker::{LookupRequest, LookupResponse, LookupWorker};

pub trait Reducer {
    type Action;

    /// Applies the action; returns whether anything changed.
    fn reduce(&mut self, action: Self::Action) -> bool;
}

pub struct StateStore<S> {
    state: S,
    revision: u64,
    subscribers: Vec<Sender<u64>>,
}

impl<S: Reducer> StateStore<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self) -> Receiver<u64> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn dispatch(&mut self, action: S::Action) -> bool {
        if !self.state.reduce(action) {
            return false;
        }
        self.revision += 1;
        let revision = self.revision;
        // Dropped receivers unsubscribe.
        self.subscribers.retain(|tx| tx.send(revision).is_ok());
        debug!("State revision {} ({} subscribers)", revision, self.subscribers.len());
        true
    }
}
