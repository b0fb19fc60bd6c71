//! Library Management System client
//!
//! This crate provides the Rust client for the library backend, including
//! the REST transport, entity types, every remote catalog/borrowing
//! operation, and the persisted login session.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod rest;
pub mod session;
pub mod types;

pub use api::LibraryClient;
pub use rest::{RestClient, RestClientConfig, RestError, RestRequest, RetryConfig};
pub use types::{Book, Borrowing, BorrowingStatus, EntityId, Role, User};

/// Result type for library client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for library client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend or transport error
    #[error("{0}")]
    Rest(#[from] RestError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation needs a logged-in user
    #[error("User not authenticated")]
    NotAuthenticated,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Message suitable for showing to the user
    ///
    /// Backend errors surface the backend's own text.
    pub fn user_message(&self) -> String {
        match self {
            Error::Rest(err) => err.message().to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status of a backend error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rest(err) => Some(err.status()),
            _ => None,
        }
    }
}
