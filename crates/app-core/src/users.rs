//! User directory
//!
//! The administration list of accounts with search, role filter and sort,
//! plus a per-user flag telling whether they currently hold any books.

use std::cmp::Ordering;
use std::collections::HashMap;

use lms_client::types::UserUpdate;
use lms_client::{EntityId, LibraryClient, Role, User};
use serde::{Deserialize, Serialize};

use crate::catalog::text_order;

/// Message shown when the account list cannot be loaded
pub const LOAD_USERS_FAILED_MESSAGE: &str = "Failed to load users. Please check your connection.";

/// Errors that can occur in the user directory
#[derive(Debug, thiserror::Error)]
pub enum UserDirectoryError {
    /// The account list could not be loaded
    #[error("{message}")]
    LoadFailed {
        /// User-visible message
        message: String,
        /// Underlying client error
        #[source]
        source: lms_client::Error,
    },

    /// Backend error on an update or delete
    #[error(transparent)]
    Client(#[from] lms_client::Error),
}

/// Result type for user directory operations
pub type Result<T> = std::result::Result<T, UserDirectoryError>;

/// Role filter of the directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleFilter {
    /// Every account
    #[default]
    All,
    /// Accounts with exactly this role
    Only(Role),
}

/// Directory sort orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSort {
    /// Username, A to Z
    #[default]
    Name,
    /// Email, A to Z
    Email,
    /// Role, A to Z
    Role,
    /// Account creation, newest first
    JoinDate,
}

/// Search, role and sort settings of the directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring of username, email or names
    pub search: String,
    /// Role filter
    pub role: RoleFilter,
    /// Sort order
    pub sort: UserSort,
}

impl UserFilter {
    /// Set the search text
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Set the role filter
    pub fn with_role(mut self, role: RoleFilter) -> Self {
        self.role = role;
        self
    }

    /// Set the sort order
    pub fn with_sort(mut self, sort: UserSort) -> Self {
        self.sort = sort;
        self
    }

    /// Whether a user passes the search and role filters
    pub fn matches(&self, user: &User) -> bool {
        let needle = self.search.to_lowercase();
        let contains = |field: &Option<String>| {
            field.as_deref().is_some_and(|v| v.to_lowercase().contains(&needle))
        };

        let matches_search = contains(&user.username)
            || contains(&user.email)
            || contains(&user.first_name)
            || contains(&user.last_name)
            || needle.is_empty();

        let matches_role = match self.role {
            RoleFilter::All => true,
            RoleFilter::Only(role) => user.role == Some(role),
        };

        matches_search && matches_role
    }

    /// Filtered and sorted copy of `users`
    pub fn apply(&self, users: &[User]) -> Vec<User> {
        let mut filtered: Vec<User> = users.iter().filter(|u| self.matches(u)).cloned().collect();
        filtered.sort_by(|a, b| self.compare(a, b));
        filtered
    }

    fn compare(&self, a: &User, b: &User) -> Ordering {
        match self.sort {
            UserSort::Name => text_order(a.username.as_deref(), b.username.as_deref()),
            UserSort::Email => text_order(a.email.as_deref(), b.email.as_deref()),
            UserSort::Role => text_order(a.role.map(|r| r.as_str()), b.role.map(|r| r.as_str())),
            UserSort::JoinDate => b.created_at.cmp(&a.created_at),
        }
    }
}

/// Loaded directory: accounts plus who currently holds books
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryListing {
    /// Every account, in backend order
    pub users: Vec<User>,
    /// Whether each account has an open loan
    pub has_borrowed: HashMap<EntityId, bool>,
}

impl DirectoryListing {
    /// Whether the account has an open loan; unknown accounts have none
    pub fn has_borrowed(&self, user_id: EntityId) -> bool {
        self.has_borrowed.get(&user_id).copied().unwrap_or(false)
    }

    /// Accounts passing `filter`, sorted
    pub fn view(&self, filter: &UserFilter) -> Vec<User> {
        filter.apply(&self.users)
    }
}

/// Account administration
#[derive(Debug, Clone)]
pub struct UserDirectory {
    client: LibraryClient,
}

impl UserDirectory {
    /// Create a new user directory
    pub fn new(client: LibraryClient) -> Self {
        Self { client }
    }

    /// Load every account and check each one's open loans
    ///
    /// Loans are checked one account at a time; a failed check counts as
    /// no open loans.
    pub async fn load(&self) -> Result<DirectoryListing> {
        let users = self.client.list_users().await.map_err(|source| {
            tracing::warn!(error = %source, "failed to load users");
            UserDirectoryError::LoadFailed {
                message: LOAD_USERS_FAILED_MESSAGE.to_string(),
                source,
            }
        })?;

        let mut has_borrowed = HashMap::with_capacity(users.len());
        for user in &users {
            let borrowed = match self.client.list_user_active_borrowings(user.id).await {
                Ok(borrowings) => !borrowings.is_empty(),
                Err(err) => {
                    tracing::warn!(user_id = user.id, error = %err, "failed to check borrowings");
                    false
                }
            };
            has_borrowed.insert(user.id, borrowed);
        }

        tracing::debug!(users = users.len(), "user directory loaded");
        Ok(DirectoryListing { users, has_borrowed })
    }

    /// Update an account
    pub async fn update(&self, id: EntityId, update: &UserUpdate) -> Result<User> {
        let user = self.client.update_user(id, update).await?;
        tracing::info!(user_id = id, "user updated");
        Ok(user)
    }

    /// Delete an account
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        self.client.delete_user(id).await?;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}
