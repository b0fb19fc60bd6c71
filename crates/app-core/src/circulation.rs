//! Student circulation desk
//!
//! What a student sees on their panel: the books they can borrow, what they
//! currently hold, their history, and whether they may borrow more. Borrow
//! and return actions are checked locally first and reload the desk on
//! success. Failures go back to the caller only; they never affect the
//! dashboard.

use lms_client::{Book, Borrowing, BorrowingStatus, EntityId, LibraryClient};
use serde::{Deserialize, Serialize};

use app_state::SessionContext;

use crate::catalog::BookFilter;

/// Errors that can occur at the circulation desk
#[derive(Debug, thiserror::Error)]
pub enum CirculationError {
    /// Nobody is logged in
    #[error("Please log in to borrow books")]
    NotAuthenticated,

    /// The student may not borrow more books right now
    #[error("You cannot borrow more books. Please return your current books first.")]
    LimitReached,

    /// No copy of the book is on the shelf
    #[error("This book is not available right now")]
    Unavailable,

    /// The student already holds a copy of the book
    #[error("You have already borrowed this book")]
    AlreadyHolding,

    /// Backend error
    #[error(transparent)]
    Client(#[from] lms_client::Error),
}

impl CirculationError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            CirculationError::Client(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result type for circulation operations
pub type Result<T> = std::result::Result<T, CirculationError>;

const ACTIVE_STATUSES: [BorrowingStatus; 3] =
    [BorrowingStatus::Borrowed, BorrowingStatus::Active, BorrowingStatus::Pending];

const HISTORY_STATUSES: [BorrowingStatus; 3] =
    [BorrowingStatus::Returned, BorrowingStatus::Completed, BorrowingStatus::Overdue];

/// Backend messages after which the student is treated as unable to borrow
const REFUSAL_MARKERS: [&str; 2] = ["already borrowed", "cannot borrow"];

/// Everything on the student panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskSnapshot {
    /// Books with a copy on the shelf
    pub available_books: Vec<Book>,
    /// Loans the student currently holds
    pub borrowed: Vec<Borrowing>,
    /// Finished loans
    pub history: Vec<Borrowing>,
    /// Whether the student may borrow another book
    pub can_borrow_more: bool,
}

impl Default for DeskSnapshot {
    fn default() -> Self {
        Self {
            available_books: Vec::new(),
            borrowed: Vec::new(),
            history: Vec::new(),
            can_borrow_more: true,
        }
    }
}

impl DeskSnapshot {
    /// Whether the student currently holds a copy of `book_id`
    pub fn holds_book(&self, book_id: EntityId) -> bool {
        self.borrowed.iter().any(|b| b.book_id == Some(book_id))
    }

    /// Available books passing `filter`, sorted
    pub fn browse(&self, filter: &BookFilter) -> Vec<Book> {
        filter.apply(&self.available_books)
    }
}

/// Borrow and return workflows of one student
#[derive(Debug, Clone)]
pub struct StudentDesk {
    client: LibraryClient,
    snapshot: DeskSnapshot,
}

impl StudentDesk {
    /// Create an empty desk
    pub fn new(client: LibraryClient) -> Self {
        Self { client, snapshot: DeskSnapshot::default() }
    }

    /// Last loaded panel contents
    pub fn snapshot(&self) -> &DeskSnapshot {
        &self.snapshot
    }

    /// Load the panel for the logged-in student
    ///
    /// The four sources are fetched concurrently. A failed source shows as
    /// empty; a failed eligibility check allows borrowing.
    pub async fn load(&mut self, session: &SessionContext) -> Result<&DeskSnapshot> {
        let user_id = session.user_id().ok_or(CirculationError::NotAuthenticated)?;

        let (books, active, all, eligibility) = tokio::join!(
            self.client.list_available_books(),
            self.client.list_user_active_borrowings(user_id),
            self.client.list_user_borrowings(user_id),
            self.client.can_user_borrow(user_id),
        );

        let books = degrade("available books", books);
        let active = degrade("active borrowings", active);
        let all = degrade("user borrowings", all);
        let can_borrow_more = eligibility.map(|e| e.can_borrow).unwrap_or_else(|err| {
            tracing::warn!(user_id, error = %err, "borrowing eligibility check failed");
            true
        });

        let borrowed = if active.is_empty() {
            all.iter().filter(|b| b.has_status(&ACTIVE_STATUSES)).cloned().collect()
        } else {
            active
        };
        let history = all.into_iter().filter(|b| b.has_status(&HISTORY_STATUSES)).collect();

        self.snapshot = DeskSnapshot { available_books: books, borrowed, history, can_borrow_more };
        tracing::debug!(
            user_id,
            borrowed = self.snapshot.borrowed.len(),
            can_borrow_more,
            "student desk loaded"
        );

        Ok(&self.snapshot)
    }

    /// Borrow a book for the logged-in student, then reload
    pub async fn borrow(&mut self, session: &SessionContext, book_id: EntityId) -> Result<Borrowing> {
        let user_id = session.user_id().ok_or(CirculationError::NotAuthenticated)?;

        if !self.snapshot.can_borrow_more {
            return Err(CirculationError::LimitReached);
        }
        if self
            .snapshot
            .available_books
            .iter()
            .any(|b| b.id == book_id && b.available_copies == Some(0))
        {
            return Err(CirculationError::Unavailable);
        }
        if self.snapshot.holds_book(book_id) {
            return Err(CirculationError::AlreadyHolding);
        }

        let borrowing = match self.client.borrow_book(user_id, book_id).await {
            Ok(borrowing) => borrowing,
            Err(err) => {
                let message = err.user_message();
                if REFUSAL_MARKERS.iter().any(|m| message.contains(m)) {
                    self.snapshot.can_borrow_more = false;
                }
                tracing::warn!(user_id, book_id, error = %message, "borrow failed");
                return Err(err.into());
            }
        };

        tracing::info!(user_id, book_id, borrowing_id = borrowing.id, "book borrowed");
        self.load(session).await?;
        Ok(borrowing)
    }

    /// Return a borrowed book, then reload
    pub async fn return_book(
        &mut self,
        session: &SessionContext,
        borrowing_id: EntityId,
    ) -> Result<Borrowing> {
        session.require_authenticated().map_err(|_| CirculationError::NotAuthenticated)?;

        let borrowing = self.client.return_book(borrowing_id).await.map_err(|err| {
            tracing::warn!(borrowing_id, error = %err.user_message(), "return failed");
            CirculationError::from(err)
        })?;

        tracing::info!(borrowing_id, "book returned");
        self.load(session).await?;
        Ok(borrowing)
    }
}

fn degrade<T>(source: &'static str, result: lms_client::Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        tracing::warn!(source, error = %err, "student desk source failed");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_client::session::{Session, UserProfile};
    use lms_client::{RestClientConfig, RetryConfig, Role};
    use std::time::Duration;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LibraryClient {
        let config = RestClientConfig::new(server.uri())
            .with_retry(RetryConfig::new(1).with_initial_delay(Duration::from_millis(5)));
        LibraryClient::new(config).unwrap()
    }

    fn student() -> SessionContext {
        SessionContext::new(Session {
            token: "tok".into(),
            user: UserProfile {
                id: 7,
                username: "zoe".into(),
                email: None,
                first_name: None,
                last_name: None,
                role: Role::Student,
            },
        })
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn desk_with_history(server: &MockServer) -> StudentDesk {
        mount_json(
            server,
            "/books/available",
            json!([
                { "id": 1, "title": "Dune", "availableCopies": 2 },
                { "id": 2, "title": "Akira", "availableCopies": 0 }
            ]),
        )
        .await;
        mount_json(server, "/borrowings/user/7/active", json!([])).await;
        mount_json(
            server,
            "/borrowings/user/7",
            json!([
                { "id": 10, "bookId": 3, "status": "BORROWED" },
                { "id": 11, "bookId": 4, "status": "PENDING" },
                { "id": 12, "bookId": 5, "status": "RETURNED" },
                { "id": 13, "bookId": 6, "status": "OVERDUE" },
                { "id": 14, "bookId": 6, "status": "LOST" }
            ]),
        )
        .await;

        let client = client_for(server);
        StudentDesk::new(client)
    }

    #[tokio::test]
    async fn test_load_splits_active_and_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/borrowings/user/7/can-borrow"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let mut desk = desk_with_history(&server).await;

        let snapshot = desk.load(&student()).await.unwrap();

        let borrowed: Vec<_> = snapshot.borrowed.iter().map(|b| b.id).collect();
        let history: Vec<_> = snapshot.history.iter().map(|b| b.id).collect();
        assert_eq!(borrowed, vec![10, 11]);
        assert_eq!(history, vec![12, 13]);
        assert!(snapshot.can_borrow_more);
        assert_eq!(snapshot.available_books.len(), 2);
    }

    #[tokio::test]
    async fn test_load_prefers_active_endpoint() {
        let server = MockServer::start().await;
        mount_json(&server, "/books/available", json!([])).await;
        mount_json(
            &server,
            "/borrowings/user/7/active",
            json!([{ "id": 20, "bookId": 9, "status": "ACTIVE" }]),
        )
        .await;
        mount_json(&server, "/borrowings/user/7", json!([{ "id": 10, "status": "BORROWED" }])).await;
        mount_json(&server, "/borrowings/user/7/can-borrow", json!({ "canBorrow": false })).await;

        let client = client_for(&server);
        let mut desk = StudentDesk::new(client);
        let snapshot = desk.load(&student()).await.unwrap();

        assert_eq!(snapshot.borrowed.len(), 1);
        assert_eq!(snapshot.borrowed[0].id, 20);
        assert!(!snapshot.can_borrow_more);
        assert!(snapshot.holds_book(9));
    }

    #[tokio::test]
    async fn test_anonymous_session_is_refused() {
        let client = LibraryClient::new(RestClientConfig::new("http://127.0.0.1:9")).unwrap();
        let mut desk = StudentDesk::new(client);
        let anonymous = SessionContext::anonymous();

        assert!(matches!(desk.load(&anonymous).await, Err(CirculationError::NotAuthenticated)));
        let err = desk.borrow(&anonymous, 1).await.unwrap_err();
        assert_eq!(err.user_message(), "Please log in to borrow books");
    }

    #[tokio::test]
    async fn test_local_checks_run_before_backend() {
        let server = MockServer::start().await;
        mount_json(&server, "/borrowings/user/7/can-borrow", json!({ "canBorrow": true })).await;
        let mut desk = desk_with_history(&server).await;
        desk.load(&student()).await.unwrap();

        assert!(matches!(desk.borrow(&student(), 2).await, Err(CirculationError::Unavailable)));
        assert!(matches!(desk.borrow(&student(), 3).await, Err(CirculationError::AlreadyHolding)));

        desk.snapshot.can_borrow_more = false;
        assert!(matches!(desk.borrow(&student(), 1).await, Err(CirculationError::LimitReached)));
    }

    #[tokio::test]
    async fn test_refusal_message_blocks_further_borrowing() {
        let server = MockServer::start().await;
        mount_json(&server, "/borrowings/user/7/can-borrow", json!({ "canBorrow": true })).await;
        Mock::given(method("POST"))
            .and(path("/borrowings/borrow"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("User cannot borrow more than 3 books"),
            )
            .mount(&server)
            .await;
        let mut desk = desk_with_history(&server).await;
        desk.load(&student()).await.unwrap();

        let err = desk.borrow(&student(), 1).await.unwrap_err();

        assert_eq!(err.user_message(), "User cannot borrow more than 3 books");
        assert!(!desk.snapshot().can_borrow_more);
    }

    #[tokio::test]
    async fn test_borrow_success_reloads() {
        let server = MockServer::start().await;
        mount_json(&server, "/borrowings/user/7/can-borrow", json!({ "canBorrow": true })).await;
        Mock::given(method("POST"))
            .and(path("/borrowings/borrow"))
            .and(query_param("userId", "7"))
            .and(query_param("bookId", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": 30, "bookId": 1, "status": "BORROWED" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        let mut desk = desk_with_history(&server).await;
        desk.load(&student()).await.unwrap();

        let borrowing = desk.borrow(&student(), 1).await.unwrap();
        assert_eq!(borrowing.id, 30);

        let requests = server.received_requests().await.unwrap();
        let loads = requests.iter().filter(|r| r.url.path() == "/books/available").count();
        assert_eq!(loads, 2);
    }

    #[tokio::test]
    async fn test_return_failure_uses_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/borrowings/return/10"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut desk = StudentDesk::new(client);

        let err = desk.return_book(&student(), 10).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to return book");
    }
}
