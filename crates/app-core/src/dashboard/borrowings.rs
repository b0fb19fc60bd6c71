//! Open and overdue loan projections
//!
//! The open-loan list is derived locally from all borrowings and recomputes
//! overdue state from the due date. The overdue list is taken as-is from the
//! backend's overdue collection. The two may disagree and are shown
//! independently.

use chrono::{DateTime, Utc};
use lms_client::{Borrowing, BorrowingStatus, EntityId};
use serde::{Deserialize, Serialize};

use super::{ceil_days, cmp_missing_last, present, Lookup};

const UNKNOWN_BOOK: &str = "Unknown Book";
const UNKNOWN_USER: &str = "Unknown User";
const UNKNOWN_OVERDUE_USER: &str = "Unknown";
const NOT_AVAILABLE: &str = "N/A";

/// An open loan enriched with book and borrower details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowedBookEntry {
    /// Borrowing id
    pub id: EntityId,
    /// Borrowed book
    pub book_id: Option<EntityId>,
    /// Book title or `Unknown Book`
    pub book_title: String,
    /// Borrower
    pub user_id: Option<EntityId>,
    /// Borrower username or `Unknown User`
    pub username: String,
    /// Borrower email or `N/A`
    pub user_email: String,
    /// Borrower phone or `N/A`
    pub user_phone: String,
    /// Student number, else the account id, else `N/A`
    pub user_student_id: String,
    /// Borrower given name or `Unknown`
    pub user_first_name: String,
    /// Borrower family name or `User`
    pub user_last_name: String,
    /// When the book was checked out
    pub borrow_date: Option<DateTime<Utc>>,
    /// When the book is due back
    pub due_date: Option<DateTime<Utc>>,
    /// Due date strictly before now
    pub is_overdue: bool,
    /// Days until due, negative when overdue; `None` without a due date
    pub days_until_due: Option<i64>,
    /// Status as reported by the backend
    pub status: Option<BorrowingStatus>,
}

/// A loan from the backend's overdue collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueEntry {
    /// Borrowing id
    pub id: EntityId,
    /// Borrowed book
    pub book_id: Option<EntityId>,
    /// Book title or `Unknown Book`
    pub book_title: String,
    /// Borrower
    pub user_id: Option<EntityId>,
    /// Borrower username or `Unknown`
    pub username: String,
    /// Borrower email or `N/A`
    pub user_email: String,
    /// When the book was checked out
    pub borrow_date: Option<DateTime<Utc>>,
    /// When the book was due back
    pub due_date: Option<DateTime<Utc>>,
    /// Days past due; `None` without a due date
    pub days_overdue: Option<i64>,
}

/// Open loans sorted by due date, soonest first, at most `limit`
pub fn borrowed_books(
    borrowings: &[Borrowing],
    lookup: &Lookup<'_>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<BorrowedBookEntry> {
    let mut active: Vec<&Borrowing> = borrowings.iter().filter(|b| b.is_active()).collect();
    active.sort_by(|a, b| cmp_missing_last(a.due_date, b.due_date));

    active
        .into_iter()
        .take(limit)
        .map(|borrowing| {
            let user = lookup.user(borrowing.user_id);
            let book = lookup.book(borrowing.book_id);

            let is_overdue = borrowing.due_date.is_some_and(|due| due < now);
            let days_until_due = borrowing.due_date.map(|due| {
                let days = ceil_days((due - now).num_milliseconds());
                if is_overdue {
                    -days.abs()
                } else {
                    days
                }
            });

            let student_id = user
                .and_then(|u| present(u.student_id.as_ref()).map(str::to_string))
                .or_else(|| user.map(|u| u.id.to_string()))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());

            BorrowedBookEntry {
                id: borrowing.id,
                book_id: borrowing.book_id,
                book_title: present(borrowing.book_title.as_ref())
                    .or_else(|| book.and_then(|b| present(b.title.as_ref())))
                    .unwrap_or(UNKNOWN_BOOK)
                    .to_string(),
                user_id: borrowing.user_id,
                username: present(borrowing.username.as_ref())
                    .or_else(|| user.and_then(|u| present(u.username.as_ref())))
                    .unwrap_or(UNKNOWN_USER)
                    .to_string(),
                user_email: user_field(user.and_then(|u| u.email.as_ref()), NOT_AVAILABLE),
                user_phone: user_field(user.and_then(|u| u.phone.as_ref()), NOT_AVAILABLE),
                user_student_id: student_id,
                user_first_name: user_field(user.and_then(|u| u.first_name.as_ref()), "Unknown"),
                user_last_name: user_field(user.and_then(|u| u.last_name.as_ref()), "User"),
                borrow_date: borrowing.borrow_date,
                due_date: borrowing.due_date,
                is_overdue,
                days_until_due,
                status: borrowing.status.clone(),
            }
        })
        .collect()
}

/// Backend-reported overdue loans sorted by due date, oldest first, at most `limit`
pub fn overdue_list(
    overdue: &[Borrowing],
    lookup: &Lookup<'_>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<OverdueEntry> {
    let mut sorted: Vec<&Borrowing> = overdue.iter().collect();
    sorted.sort_by(|a, b| cmp_missing_last(a.due_date, b.due_date));

    sorted
        .into_iter()
        .take(limit)
        .map(|borrowing| {
            let user = lookup.user(borrowing.user_id);
            let book = lookup.book(borrowing.book_id);

            OverdueEntry {
                id: borrowing.id,
                book_id: borrowing.book_id,
                book_title: present(borrowing.book_title.as_ref())
                    .or_else(|| book.and_then(|b| present(b.title.as_ref())))
                    .unwrap_or(UNKNOWN_BOOK)
                    .to_string(),
                user_id: borrowing.user_id,
                username: present(borrowing.username.as_ref())
                    .or_else(|| user.and_then(|u| present(u.username.as_ref())))
                    .unwrap_or(UNKNOWN_OVERDUE_USER)
                    .to_string(),
                user_email: user_field(user.and_then(|u| u.email.as_ref()), NOT_AVAILABLE),
                borrow_date: borrowing.borrow_date,
                due_date: borrowing.due_date,
                days_overdue: borrowing
                    .due_date
                    .map(|due| ceil_days((now - due).num_milliseconds())),
            }
        })
        .collect()
}

fn user_field(value: Option<&String>, sentinel: &str) -> String {
    present(value).unwrap_or(sentinel).to_string()
}

/// Urgency of an open loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "camelCase")]
pub enum DueStatus {
    /// Past due by this many days
    Overdue(u64),
    /// Due today
    DueToday,
    /// Due tomorrow
    DueTomorrow,
    /// Due within three days
    DueSoon(i64),
    /// Due later
    DueIn(i64),
}

impl DueStatus {
    /// Whether the loan needs attention (overdue or due within three days)
    pub fn is_urgent(&self) -> bool {
        !matches!(self, DueStatus::DueIn(_))
    }
}

impl std::fmt::Display for DueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DueStatus::Overdue(days) => write!(f, "Overdue by {} days", days),
            DueStatus::DueToday => f.write_str("Due today"),
            DueStatus::DueTomorrow => f.write_str("Due tomorrow"),
            DueStatus::DueSoon(days) | DueStatus::DueIn(days) => write!(f, "Due in {} days", days),
        }
    }
}

/// Urgency of an entry; `None` when it has no due date
pub fn due_status(entry: &BorrowedBookEntry) -> Option<DueStatus> {
    let days = entry.days_until_due?;
    Some(if entry.is_overdue {
        DueStatus::Overdue(days.unsigned_abs())
    } else {
        match days {
            0 => DueStatus::DueToday,
            1 => DueStatus::DueTomorrow,
            d if d <= 3 => DueStatus::DueSoon(d),
            d => DueStatus::DueIn(d),
        }
    })
}
