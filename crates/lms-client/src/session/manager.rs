//! Session Manager
//!
//! Owns the two persisted session values, the auth token and the cached
//! user profile. They are read once when the manager is restored and
//! written together on login and logout; no other code writes them.
//!
//! # Example
//!
//! ```rust,no_run
//! use lms_client::session::SessionManager;
//! use lms_client::{LibraryClient, RestClientConfig};
//! use storage::{KvConfig, KvStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = KvStore::new(KvConfig::new("library_session.db"))?;
//!     let client = LibraryClient::new(RestClientConfig::default())?;
//!
//!     let mut manager = SessionManager::restore(&store)?;
//!     if manager.current().is_none() {
//!         manager.login(&client, "ada", "secret").await?;
//!     }
//!     manager.attach(&client).await;
//!     Ok(())
//! }
//! ```

use chrono::Utc;
use storage::{KvError, KvStore, ScopedStore};
use thiserror::Error;

use crate::api::LibraryClient;
use crate::session::{is_token_expired, Session, UserProfile};

/// Store key of the bearer token
pub const TOKEN_KEY: &str = "authToken";

/// Store key of the serialized user profile
pub const USER_KEY: &str = "userData";

const SESSION_SCOPE: &str = "session";

/// Errors that can occur during session manager operations
#[derive(Debug, Error)]
pub enum SessionManagerError {
    /// Session store error
    #[error("Session store error: {0}")]
    Store(#[from] KvError),

    /// Backend rejected the login or could not be reached
    #[error("{0}")]
    Client(#[from] crate::Error),

    /// The backend answered without a token
    #[error("Login response did not include a token")]
    MissingToken,
}

/// Result type for session manager operations
pub type Result<T> = std::result::Result<T, SessionManagerError>;

/// Persisted login session
pub struct SessionManager {
    store: ScopedStore,
    current: Option<Session>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("user", &self.current.as_ref().map(|s| &s.user.username))
            .finish()
    }
}

impl SessionManager {
    /// Read the session store once and build the manager
    ///
    /// A session is restored only when both the token and the profile are
    /// present and readable. A half-written or unreadable pair is cleared.
    pub fn restore(kv: &KvStore) -> Result<Self> {
        let store = kv.scoped(SESSION_SCOPE);

        let token = store.get::<String>(TOKEN_KEY);
        let user = store.get::<UserProfile>(USER_KEY);

        let current = match (token, user) {
            (Ok(Some(token)), Ok(Some(user))) => {
                tracing::info!(username = %user.username, "restored session");
                Some(Session { token, user })
            }
            (Ok(None), Ok(None)) => None,
            (token, user) => {
                if let Err(e) = &token {
                    tracing::warn!(error = %e, "unreadable auth token in session store");
                }
                if let Err(e) = &user {
                    tracing::warn!(error = %e, "unreadable user profile in session store");
                }
                tracing::warn!("discarding incomplete session");
                store.remove_many(&[TOKEN_KEY, USER_KEY])?;
                None
            }
        };

        Ok(Self { store, current })
    }

    /// The current session, if logged in
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Whether the stored token has passed its expiry claim
    pub fn is_expired(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| is_token_expired(&s.token, Utc::now()))
    }

    /// Push the current token (or its absence) into the client
    pub async fn attach(&self, client: &LibraryClient) {
        client
            .set_token(self.current.as_ref().map(|s| s.token.clone()))
            .await;
    }

    /// Log in against the backend and persist the session
    ///
    /// The role is normalized to lower case before it is stored.
    pub async fn login(
        &mut self,
        client: &LibraryClient,
        username: &str,
        password: &str,
    ) -> Result<&Session> {
        let response = client.login(username, password).await?;

        if response.token.trim().is_empty() {
            return Err(SessionManagerError::MissingToken);
        }

        let mut user = UserProfile::from_user(&response.user);
        if response.user.role.is_none() {
            if let Some(role) = response.role {
                user.role = role;
            }
        }

        self.store.set(TOKEN_KEY, &response.token)?;
        self.store.set(USER_KEY, &user)?;
        self.store.flush()?;

        client.set_token(Some(response.token.clone())).await;
        tracing::info!(username = %user.username, role = %user.role, "logged in");

        Ok(self.current.insert(Session { token: response.token, user }))
    }

    /// Clear both persisted values and the client token
    pub async fn logout(&mut self, client: &LibraryClient) -> Result<()> {
        self.store.remove_many(&[TOKEN_KEY, USER_KEY])?;
        self.store.flush()?;
        client.set_token(None).await;

        if let Some(session) = self.current.take() {
            tracing::info!(username = %session.user.username, "logged out");
        }

        Ok(())
    }
}
