//! Librarian dashboard
//!
//! The dashboard is built in two steps. [`DashboardService`] fetches the
//! four record collections (books, users, borrowings, overdue borrowings)
//! concurrently and tolerates any of them failing. [`reduce`] then turns
//! whatever arrived into a [`DashboardView`]:
//!
//! - headline counts ([`DashboardStats`])
//! - the category distribution ([`CategorySlice`])
//! - the most urgent open loans and overdue loans
//! - a borrow histogram for the current year ([`MonthlyActivity`])
//! - the recent borrow/return feed ([`ActivityEntry`])
//!
//! [`reduce`] is pure: the same records and the same `now` always give the
//! same view.
//!
//! # Example
//!
//! ```rust
//! use app_core::dashboard::{reduce, DashboardConfig};
//! use chrono::Utc;
//! use lms_client::Book;
//!
//! let books = vec![Book { id: 1, category: Some("Fiction".to_string()), ..Default::default() }];
//! let view = reduce(&books, &[], &[], &[], Utc::now(), &DashboardConfig::default());
//!
//! assert_eq!(view.stats.total_books, 1);
//! assert_eq!(view.category_data[0].category, "Fiction");
//! assert_eq!(view.category_data[0].percentage, "100.0");
//! ```

mod activity;
mod borrowings;
mod categories;
mod service;

pub use activity::{activity_log, ActivityEntry, ActivityKind, MonthlyActivity};
pub use borrowings::{
    borrowed_books, due_status, overdue_list, BorrowedBookEntry, DueStatus, OverdueEntry,
};
pub use categories::{category_breakdown, CategorySlice, OTHER_LABEL};
pub use service::{DashboardError, DashboardService, DashboardSource, LOAD_FAILED_MESSAGE};

#[cfg(test)]
pub use service::MockDashboardSource;

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use lms_client::{Book, Borrowing, EntityId, User};
use serde::{Deserialize, Serialize};

/// Categories tracked individually on the dashboard
pub const DEFAULT_MAIN_CATEGORIES: [&str; 3] = ["fiction", "non-fiction", "manga"];

/// Maximum entries in each dashboard list
pub const DEFAULT_LIST_LIMIT: usize = 8;

const DAY_MS: i64 = 86_400_000;

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Recognized categories, in display order; anything else is "Other"
    pub main_categories: Vec<String>,
    /// Length cap of the borrowed, overdue and activity lists
    pub list_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            main_categories: DEFAULT_MAIN_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl DashboardConfig {
    /// Replace the recognized categories
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.main_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set the list length cap
    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }
}

/// Headline counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Books in the catalog
    pub total_books: usize,
    /// Registered users
    pub total_users: usize,
    /// Open loans (`BORROWED` with no return date)
    pub books_borrowed: usize,
    /// Loans the backend reports as overdue
    pub overdue_books: usize,
}

/// Everything the dashboard displays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Headline counts
    pub stats: DashboardStats,
    /// Category distribution
    pub category_data: Vec<CategorySlice>,
    /// Most urgent open loans
    pub borrowed_books: Vec<BorrowedBookEntry>,
    /// Most overdue loans
    pub overdue_list: Vec<OverdueEntry>,
    /// Borrows per month of the current year
    pub monthly_activity: MonthlyActivity,
    /// Recent borrow and return events
    pub activity_log: Vec<ActivityEntry>,
}

/// Reduce the four record collections into the dashboard view
///
/// A source that failed to load is passed as an empty slice.
pub fn reduce(
    books: &[Book],
    users: &[User],
    borrowings: &[Borrowing],
    overdue: &[Borrowing],
    now: DateTime<Utc>,
    config: &DashboardConfig,
) -> DashboardView {
    let lookup = Lookup::new(books, users);

    let stats = DashboardStats {
        total_books: books.len(),
        total_users: users.len(),
        books_borrowed: borrowings.iter().filter(|b| b.is_active()).count(),
        overdue_books: overdue.len(),
    };

    DashboardView {
        stats,
        category_data: category_breakdown(books, &config.main_categories),
        borrowed_books: borrowed_books(borrowings, &lookup, now, config.list_limit),
        overdue_list: overdue_list(overdue, &lookup, now, config.list_limit),
        monthly_activity: MonthlyActivity::from_borrowings(borrowings, now.year()),
        activity_log: activity_log(borrowings, &lookup, config.list_limit),
    }
}

/// Id-indexed view of the books and users of one reduction pass
///
/// When ids repeat, the first record wins.
#[derive(Debug, Default)]
pub struct Lookup<'a> {
    books: HashMap<EntityId, &'a Book>,
    users: HashMap<EntityId, &'a User>,
}

impl<'a> Lookup<'a> {
    /// Index the given records
    pub fn new(books: &'a [Book], users: &'a [User]) -> Self {
        let mut lookup = Self::default();
        for book in books {
            lookup.books.entry(book.id).or_insert(book);
        }
        for user in users {
            lookup.users.entry(user.id).or_insert(user);
        }
        lookup
    }

    /// Book by optional id
    pub fn book(&self, id: Option<EntityId>) -> Option<&'a Book> {
        id.and_then(|id| self.books.get(&id).copied())
    }

    /// User by optional id
    pub fn user(&self, id: Option<EntityId>) -> Option<&'a User> {
        id.and_then(|id| self.users.get(&id).copied())
    }
}

/// The value if present and not blank
pub(crate) fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Milliseconds to days, rounded up
pub(crate) fn ceil_days(ms: i64) -> i64 {
    -((-ms).div_euclid(DAY_MS))
}

/// Ascending order of optional timestamps, missing ones last
pub(crate) fn cmp_missing_last(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use lms_client::{Book, Borrowing, BorrowingStatus, EntityId, User};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    pub fn book(id: EntityId, title: &str, category: Option<&str>) -> Book {
        Book {
            id,
            title: Some(title.to_string()),
            category: category.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn user(id: EntityId, username: &str) -> User {
        User {
            id,
            username: Some(username.to_string()),
            email: Some(format!("{}@example.edu", username)),
            ..Default::default()
        }
    }

    pub fn loan(id: EntityId, user_id: EntityId, book_id: EntityId, due_in_days: i64) -> Borrowing {
        Borrowing {
            id,
            user_id: Some(user_id),
            book_id: Some(book_id),
            borrow_date: Some(now() - Duration::days(14)),
            due_date: Some(now() + Duration::days(due_in_days)),
            status: Some(BorrowingStatus::Borrowed),
            ..Default::default()
        }
    }
}
