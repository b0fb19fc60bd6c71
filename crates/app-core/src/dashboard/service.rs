//! Dashboard loading
//!
//! [`DashboardService`] fetches the four dashboard sources concurrently and
//! waits for all of them to settle. A failed source is logged and replaced
//! by an empty collection; only the failure of all four is an error.

use std::sync::Arc;

use app_state::{DashboardState, LoadStatus, LoadTicket};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_client::{Book, Borrowing, LibraryClient, User};
use thiserror::Error;

use super::{reduce, DashboardConfig, DashboardView};

/// Message shown when no dashboard source could be loaded
pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to load dashboard data. Please check your connection and try again.";

/// Errors that can occur while loading the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// Every source failed
    #[error("{0}")]
    Unavailable(String),

    /// A newer load started before this one settled
    #[error("Dashboard load {generation} was superseded")]
    Superseded {
        /// Generation of the discarded load
        generation: u64,
    },
}

/// Result type for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// The four record collections behind the dashboard
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Every book
    async fn books(&self) -> lms_client::Result<Vec<Book>>;

    /// Every user
    async fn users(&self) -> lms_client::Result<Vec<User>>;

    /// Every borrowing record
    async fn borrowings(&self) -> lms_client::Result<Vec<Borrowing>>;

    /// Borrowings the backend considers overdue
    async fn overdue_borrowings(&self) -> lms_client::Result<Vec<Borrowing>>;
}

#[async_trait]
impl DashboardSource for LibraryClient {
    async fn books(&self) -> lms_client::Result<Vec<Book>> {
        self.list_books().await
    }

    async fn users(&self) -> lms_client::Result<Vec<User>> {
        self.list_users().await
    }

    async fn borrowings(&self) -> lms_client::Result<Vec<Borrowing>> {
        self.list_borrowings().await
    }

    async fn overdue_borrowings(&self) -> lms_client::Result<Vec<Borrowing>> {
        self.list_overdue_borrowings().await
    }
}

/// Loads the dashboard and keeps the latest view in a [`DashboardState`]
pub struct DashboardService<S> {
    source: Arc<S>,
    config: DashboardConfig,
    state: DashboardState<DashboardView>,
}

impl<S> Clone for DashboardService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S: DashboardSource> DashboardService<S> {
    /// Create a service with the default configuration
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, DashboardConfig::default())
    }

    /// Create a service with a custom configuration
    pub fn with_config(source: Arc<S>, config: DashboardConfig) -> Self {
        Self { source, config, state: DashboardState::new() }
    }

    /// Shared state read by the presentation layer
    pub fn state(&self) -> &DashboardState<DashboardView> {
        &self.state
    }

    /// Current view model
    pub fn snapshot(&self) -> DashboardView {
        self.state.snapshot()
    }

    /// Status of the latest load
    pub fn status(&self) -> LoadStatus {
        self.state.status()
    }

    /// Configuration in use
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Load the dashboard
    ///
    /// On total failure the state is set to [`LoadStatus::Failed`] and the
    /// view is reset to its empty baseline.
    pub async fn load(&self) -> Result<DashboardView> {
        self.load_at(Utc::now()).await
    }

    /// Load the dashboard again after a failure
    pub async fn reload(&self) -> Result<DashboardView> {
        tracing::info!("reloading dashboard");
        self.load().await
    }

    /// Load the dashboard, computing due dates against `now`
    pub async fn load_at(&self, now: DateTime<Utc>) -> Result<DashboardView> {
        let ticket = self.state.begin();
        let generation = ticket.generation();

        let (books, users, borrowings, overdue) = tokio::join!(
            self.source.books(),
            self.source.users(),
            self.source.borrowings(),
            self.source.overdue_borrowings(),
        );

        let all_failed =
            books.is_err() && users.is_err() && borrowings.is_err() && overdue.is_err();

        let books = settle("books", generation, books);
        let users = settle("users", generation, users);
        let borrowings = settle("borrowings", generation, borrowings);
        let overdue = settle("overdue", generation, overdue);

        if all_failed {
            tracing::error!(generation, "every dashboard source failed");
            return self.apply(ticket, Err(LOAD_FAILED_MESSAGE.to_string()));
        }

        let view = reduce(&books, &users, &borrowings, &overdue, now, &self.config);

        tracing::info!(
            generation,
            books = view.stats.total_books,
            users = view.stats.total_users,
            borrowed = view.stats.books_borrowed,
            overdue = view.stats.overdue_books,
            "dashboard loaded"
        );

        self.apply(ticket, Ok(view))
    }

    fn apply(
        &self,
        ticket: LoadTicket,
        outcome: std::result::Result<DashboardView, String>,
    ) -> Result<DashboardView> {
        let result = outcome.clone().map_err(DashboardError::Unavailable);

        if self.state.finish(ticket, outcome) {
            result
        } else {
            Err(DashboardError::Superseded { generation: ticket.generation() })
        }
    }
}

/// A failed source becomes an empty collection
fn settle<T>(
    source: &'static str,
    generation: u64,
    result: lms_client::Result<Vec<T>>,
) -> Vec<T> {
    result.unwrap_or_else(|err| {
        tracing::warn!(source, generation, error = %err, "dashboard source failed");
        Vec::new()
    })
}
