//! Monthly borrow histogram and the recent activity feed

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Utc};
use lms_client::{Borrowing, EntityId};
use serde::{Deserialize, Serialize};

use super::{present, Lookup};

/// Borrow events per calendar month of one year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    /// Year the buckets cover
    pub year: i32,
    /// January through December
    pub counts: [u32; 12],
}

impl MonthlyActivity {
    /// Count borrowings by the month of their borrow date
    ///
    /// Records borrowed in other years, or without a borrow date, are not
    /// counted.
    pub fn from_borrowings(borrowings: &[Borrowing], year: i32) -> Self {
        let mut counts = [0u32; 12];
        for date in borrowings.iter().filter_map(|b| b.borrow_date) {
            if date.year() == year {
                counts[date.month0() as usize] += 1;
            }
        }
        Self { year, counts }
    }

    /// Largest bucket, at least 1, for scaling a bar chart
    pub fn max_for_scale(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0).max(1)
    }

    /// Sum of all buckets
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Kind of a feed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    /// A book was checked out
    Borrow,
    /// A book was brought back
    Return,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Borrow => f.write_str("Borrow"),
            ActivityKind::Return => f.write_str("Return"),
        }
    }
}

/// One event of the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Borrowing id
    pub id: EntityId,
    /// Borrow or return
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Book title or `Unknown Book`
    pub title: String,
    /// Username or `Unknown User`
    pub user: String,
    /// When the event happened
    pub date: Option<DateTime<Utc>>,
}

/// Most recent borrow and return events, newest first, at most `limit`
pub fn activity_log(
    borrowings: &[Borrowing],
    lookup: &Lookup<'_>,
    limit: usize,
) -> Vec<ActivityEntry> {
    let mut recent: Vec<&Borrowing> = borrowings.iter().collect();
    recent.sort_by(|a, b| match (event_time(a), event_time(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    recent
        .into_iter()
        .take(limit)
        .map(|borrowing| {
            let (kind, date) = if borrowing.is_returned() {
                (ActivityKind::Return, borrowing.return_date.or(borrowing.updated_at))
            } else {
                (ActivityKind::Borrow, borrowing.borrow_date)
            };

            let book = lookup.book(borrowing.book_id);
            let user = lookup.user(borrowing.user_id);

            ActivityEntry {
                id: borrowing.id,
                kind,
                title: book
                    .and_then(|b| present(b.title.as_ref()))
                    .or_else(|| present(borrowing.book_title.as_ref()))
                    .unwrap_or("Unknown Book")
                    .to_string(),
                user: user
                    .and_then(|u| present(u.username.as_ref()))
                    .or_else(|| present(borrowing.username.as_ref()))
                    .unwrap_or("Unknown User")
                    .to_string(),
                date,
            }
        })
        .collect()
}

/// Ordering timestamp of a record: borrowed, else returned, else created
fn event_time(borrowing: &Borrowing) -> Option<DateTime<Utc>> {
    borrowing
        .borrow_date
        .or(borrowing.return_date)
        .or(borrowing.created_at)
}
