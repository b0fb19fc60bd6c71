//! Dashboard state cell
//!
//! Holds the latest view model produced by a load together with the load
//! status. Results are applied only when their ticket is still current, so
//! a slow load can never overwrite a newer one.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::generation::{LoadGeneration, LoadTicket};

/// Status of the most recent load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum LoadStatus {
    /// Nothing loaded yet
    Idle,
    /// A load is in flight
    Loading,
    /// The view model is current
    Ready,
    /// The last load failed with a user-visible message
    Failed(String),
}

impl LoadStatus {
    /// User-visible error message, if the last load failed
    pub fn error(&self) -> Option<&str> {
        match self {
            LoadStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    status: LoadStatus,
    data: T,
    applied: Option<LoadTicket>,
}

/// Shared state of a dashboard-like view
///
/// Clones share the state.
#[derive(Debug, Clone)]
pub struct DashboardState<T> {
    generation: LoadGeneration,
    inner: Arc<RwLock<Inner<T>>>,
    status_tx: Arc<watch::Sender<LoadStatus>>,
}

impl<T: Clone + Default> Default for DashboardState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Default> DashboardState<T> {
    /// Create an idle state holding the default view model
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(LoadStatus::Idle);
        Self {
            generation: LoadGeneration::new(),
            inner: Arc::new(RwLock::new(Inner {
                status: LoadStatus::Idle,
                data: T::default(),
                applied: None,
            })),
            status_tx: Arc::new(status_tx),
        }
    }

    /// Start a load; the previous view model stays visible until it settles
    pub fn begin(&self) -> LoadTicket {
        let ticket = self.generation.begin();
        self.set_status(LoadStatus::Loading);
        tracing::debug!(generation = ticket.generation(), "load started");
        ticket
    }

    /// Apply the outcome of a load
    ///
    /// A failure resets the view model to its default. Returns `false` and
    /// leaves the state untouched when `ticket` is stale.
    pub fn finish(&self, ticket: LoadTicket, outcome: Result<T, String>) -> bool {
        let status = {
            let mut inner = self.inner.write();

            // Checked under the write lock so two finishing loads cannot interleave
            if !self.generation.is_current(ticket) {
                tracing::debug!(
                    generation = ticket.generation(),
                    latest = self.generation.latest(),
                    "discarding stale load"
                );
                return false;
            }

            match outcome {
                Ok(data) => {
                    inner.data = data;
                    inner.status = LoadStatus::Ready;
                }
                Err(message) => {
                    inner.data = T::default();
                    inner.status = LoadStatus::Failed(message);
                }
            }
            inner.applied = Some(ticket);
            inner.status.clone()
        };

        self.status_tx.send_replace(status);
        true
    }

    /// Copy of the current view model
    pub fn snapshot(&self) -> T {
        self.inner.read().data.clone()
    }

    /// Current load status
    pub fn status(&self) -> LoadStatus {
        self.inner.read().status.clone()
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        self.inner.read().status == LoadStatus::Loading
    }

    /// Ticket of the load whose result is on display
    pub fn applied_ticket(&self) -> Option<LoadTicket> {
        self.inner.read().applied
    }

    /// Watch status transitions
    pub fn subscribe(&self) -> watch::Receiver<LoadStatus> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, status: LoadStatus) {
        self.inner.write().status = status.clone();
        self.status_tx.send_replace(status);
    }
}
