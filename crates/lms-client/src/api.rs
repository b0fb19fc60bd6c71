//! Remote catalog and borrowing operations
//!
//! [`LibraryClient`] wraps [`RestClient`] with one method per backend
//! operation. Reads are retried on network errors; mutations are sent once.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::rest::{RestClient, RestClientConfig, RestError, RestRequest, FALLBACK_ERROR_MESSAGE};
use crate::types::{
    Book, BookInput, Borrowing, CanBorrow, EntityId, LoginRequest, LoginResponse,
    RegisterRequest, User, UserUpdate,
};
use crate::Result;

/// Client for the library backend
///
/// Cloning is cheap; clones share the bearer token.
#[derive(Debug, Clone)]
pub struct LibraryClient {
    rest: RestClient,
    token: Arc<RwLock<Option<String>>>,
}

impl LibraryClient {
    /// Create a client from configuration
    pub fn new(config: RestClientConfig) -> Result<Self> {
        Ok(Self::from_rest(RestClient::new(config)?))
    }

    /// Wrap an existing REST client
    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest, token: Arc::new(RwLock::new(None)) }
    }

    /// Set or clear the bearer token attached to every request
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Current bearer token
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Underlying REST client
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    async fn authorize(&self, request: RestRequest) -> RestRequest {
        match self.token.read().await.as_deref() {
            Some(token) => request.bearer(token),
            None => request,
        }
    }

    async fn read<T>(&self, request: RestRequest) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let request = self.authorize(request).await;
        Ok(self.rest.send_with_retry(request).await?.data)
    }

    /// Read a list, dropping records that do not decode instead of the whole list
    async fn read_list<T>(&self, request: RestRequest) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = request.path.clone();
        let records: Vec<serde_json::Value> = self.read(request).await?;
        Ok(decode_records(&path, records))
    }

    async fn write<T>(&self, request: RestRequest, fallback: &str) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let request = self.authorize(request).await;
        self.rest
            .send(request)
            .await
            .map(|response| response.data)
            .map_err(|err| with_fallback(err, fallback).into())
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Exchange credentials for a token and the account profile
    ///
    /// This does not store the token; see [`crate::session::SessionManager::login`].
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let request = RestRequest::post("/auth/login").json_body(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;

        self.rest
            .send(request)
            .await
            .map(|response| response.data)
            .map_err(|err| with_fallback(err, "Login failed").into())
    }

    /// Create a new account
    pub async fn register(&self, payload: &RegisterRequest) -> Result<serde_json::Value> {
        let request = RestRequest::post("/auth/register").json_body(payload)?;
        self.write(request, "Registration failed").await
    }

    // -------------------------------------------------------------------------
    // Books
    // -------------------------------------------------------------------------

    /// List every book
    pub async fn list_books(&self) -> Result<Vec<Book>> {
        self.read_list(RestRequest::get("/books")).await
    }

    /// List books with at least one copy on the shelf
    pub async fn list_available_books(&self) -> Result<Vec<Book>> {
        self.read_list(RestRequest::get("/books/available")).await
    }

    /// Server-side book search
    pub async fn search_books(&self, query: &str) -> Result<Vec<Book>> {
        self.read_list(RestRequest::get("/books/search").param("q", query)).await
    }

    /// Fetch one book
    pub async fn get_book(&self, id: EntityId) -> Result<Book> {
        self.read(RestRequest::get(format!("/books/{}", id))).await
    }

    /// Create a book
    pub async fn create_book(&self, book: &BookInput) -> Result<Book> {
        let request = RestRequest::post("/books").json_body(book)?;
        self.write(request, FALLBACK_ERROR_MESSAGE).await
    }

    /// Replace a book's fields
    pub async fn update_book(&self, id: EntityId, book: &BookInput) -> Result<Book> {
        let request = RestRequest::put(format!("/books/{}", id)).json_body(book)?;
        self.write(request, FALLBACK_ERROR_MESSAGE).await
    }

    /// Delete a book
    pub async fn delete_book(&self, id: EntityId) -> Result<()> {
        let request = self.authorize(RestRequest::delete(format!("/books/{}", id))).await;
        self.rest.send_empty(request).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// List every account
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.read_list(RestRequest::get("/users")).await
    }

    /// Fetch one account
    pub async fn get_user(&self, id: EntityId) -> Result<User> {
        self.read(RestRequest::get(format!("/users/{}", id))).await
    }

    /// Update an account
    pub async fn update_user(&self, id: EntityId, update: &UserUpdate) -> Result<User> {
        let request = RestRequest::put(format!("/users/{}", id)).json_body(update)?;
        self.write(request, FALLBACK_ERROR_MESSAGE).await
    }

    /// Delete an account
    pub async fn delete_user(&self, id: EntityId) -> Result<()> {
        let request = self.authorize(RestRequest::delete(format!("/users/{}", id))).await;
        self.rest.send_empty(request).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Borrowings
    // -------------------------------------------------------------------------

    /// List every borrowing record
    pub async fn list_borrowings(&self) -> Result<Vec<Borrowing>> {
        self.read_list(RestRequest::get("/borrowings")).await
    }

    /// List one user's borrowing history
    pub async fn list_user_borrowings(&self, user_id: EntityId) -> Result<Vec<Borrowing>> {
        self.read_list(RestRequest::get(format!("/borrowings/user/{}", user_id))).await
    }

    /// List one user's open borrowings
    pub async fn list_user_active_borrowings(&self, user_id: EntityId) -> Result<Vec<Borrowing>> {
        self.read_list(RestRequest::get(format!("/borrowings/user/{}/active", user_id)))
            .await
    }

    /// Ask the backend whether a user may borrow another book
    pub async fn can_user_borrow(&self, user_id: EntityId) -> Result<CanBorrow> {
        let request = self
            .authorize(RestRequest::get(format!("/borrowings/user/{}/can-borrow", user_id)))
            .await;

        self.rest
            .send_with_retry(request)
            .await
            .map(|response| response.data)
            .map_err(|err| with_fallback(err, "Failed to check borrowing eligibility").into())
    }

    /// Check out a book for a user
    pub async fn borrow_book(&self, user_id: EntityId, book_id: EntityId) -> Result<Borrowing> {
        let request = RestRequest::post("/borrowings/borrow")
            .param("userId", user_id.to_string())
            .param("bookId", book_id.to_string());
        self.write(request, "Failed to borrow book").await
    }

    /// Check a borrowed book back in
    pub async fn return_book(&self, borrowing_id: EntityId) -> Result<Borrowing> {
        let request = RestRequest::post(format!("/borrowings/return/{}", borrowing_id));
        self.write(request, "Failed to return book").await
    }

    /// List borrowings the backend considers overdue
    pub async fn list_overdue_borrowings(&self) -> Result<Vec<Borrowing>> {
        self.read_list(RestRequest::get("/borrowings/overdue")).await
    }

    /// Fetch one borrowing record
    pub async fn get_borrowing(&self, id: EntityId) -> Result<Borrowing> {
        self.read(RestRequest::get(format!("/borrowings/{}", id))).await
    }
}

fn decode_records<T>(path: &str, records: Vec<serde_json::Value>) -> Vec<T>
where
    T: DeserializeOwned,
{
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(path, error = %e, "dropping malformed record");
                None
            }
        })
        .collect()
}

/// Give a body-less error an operation-specific message
fn with_fallback(err: RestError, fallback: &str) -> RestError {
    if err.has_empty_body() {
        RestError::new(err.status(), err.error().to_string(), fallback)
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_fallback_replaces_generic_message() {
        let err = with_fallback(RestError::from_body(500, ""), "Failed to borrow book");
        assert_eq!(err.message(), "Failed to borrow book");
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_with_fallback_keeps_backend_text() {
        let err = with_fallback(RestError::from_body(400, "Book unavailable"), "Failed to borrow book");
        assert_eq!(err.message(), "Book unavailable");
    }

    #[test]
    fn test_with_fallback_keeps_backend_text_matching_generic_message() {
        let err = with_fallback(RestError::from_body(409, "API request failed"), "Failed to borrow book");
        assert_eq!(err.message(), "API request failed");
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn test_decode_records_skips_malformed_entries() {
        let records = vec![
            serde_json::json!({"id": 1, "title": "Dune"}),
            serde_json::json!({"title": "No id"}),
            serde_json::json!({"id": "3", "publishedYear": "1982"}),
            serde_json::json!("not an object"),
        ];

        let books: Vec<Book> = decode_records("/books", records);
        let ids: Vec<EntityId> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(books[1].published_year, Some(1982));
    }

    #[tokio::test]
    async fn test_token_is_shared_between_clones() {
        let client = LibraryClient::new(RestClientConfig::new("http://localhost:1")).unwrap();
        let clone = client.clone();

        client.set_token(Some("abc".to_string())).await;
        assert_eq!(clone.token().await, Some("abc".to_string()));

        clone.set_token(None).await;
        assert!(client.token().await.is_none());
    }
}
