//! Library entity types
//!
//! Records owned by the backend. Every field other than the identifier is
//! optional because the backend omits fields freely; consumers resolve
//! missing values at their own boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Backend identifier for books, users and borrowings
pub type EntityId = i64;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Identifier
    #[serde(deserialize_with = "lenient::id")]
    pub id: EntityId,
    /// Title
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    /// Author
    #[serde(default, deserialize_with = "lenient::string")]
    pub author: Option<String>,
    /// ISBN
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::string")]
    pub isbn: Option<String>,
    /// Free-text category, compared case-insensitively
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: Option<String>,
    /// Year of publication
    #[serde(default, deserialize_with = "lenient::int")]
    pub published_year: Option<i32>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::string")]
    pub description: Option<String>,
    /// Number of copies owned
    #[serde(default, deserialize_with = "lenient::int")]
    pub total_copies: Option<i32>,
    /// Number of copies on the shelf
    #[serde(default, deserialize_with = "lenient::int")]
    pub available_copies: Option<i32>,
    /// Average rating, 0 to 5
    #[serde(default, deserialize_with = "lenient::float")]
    pub rating: Option<f64>,
}

impl Book {
    /// Whether at least one copy can be borrowed
    pub fn is_available(&self) -> bool {
        self.available_copies.unwrap_or(0) > 0
    }
}

/// Account role
///
/// Parsed case-insensitively; serialized in lower case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator
    Admin,
    /// Librarian
    Librarian,
    /// Student
    Student,
}

impl Role {
    /// Parse a role name, accepting any case and the long form `administrator`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Some(Role::Admin),
            "librarian" => Some(Role::Librarian),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Lower-case role name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Student => "student",
        }
    }

    /// Whether the role may use the librarian dashboard and administration views
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Librarian)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Role::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown role: {}", raw)))
    }
}

/// A library account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier
    #[serde(deserialize_with = "lenient::id")]
    pub id: EntityId,
    /// Login name
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: Option<String>,
    /// Email address
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: Option<String>,
    /// Phone number
    #[serde(default, deserialize_with = "lenient::string")]
    pub phone: Option<String>,
    /// Given name
    #[serde(default, deserialize_with = "lenient::string")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default, deserialize_with = "lenient::string")]
    pub last_name: Option<String>,
    /// Institutional student number
    #[serde(default, deserialize_with = "lenient::string")]
    pub student_id: Option<String>,
    /// Role; unknown role names become `None`
    #[serde(default, deserialize_with = "lenient::role")]
    pub role: Option<Role>,
    /// Account creation time
    #[serde(default, with = "flexible_date")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Borrowing status as reported by the backend
///
/// The backend does not enforce a closed set, so unknown markers are kept
/// verbatim in [`BorrowingStatus::Other`]. Markers match exactly in upper
/// case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BorrowingStatus {
    /// `BORROWED`, the active marker
    Borrowed,
    /// `RETURNED`
    Returned,
    /// `OVERDUE`
    Overdue,
    /// `PENDING`
    Pending,
    /// `ACTIVE`
    Active,
    /// `COMPLETED`
    Completed,
    /// Any other marker
    Other(String),
}

impl BorrowingStatus {
    /// Wire marker
    pub fn as_str(&self) -> &str {
        match self {
            BorrowingStatus::Borrowed => "BORROWED",
            BorrowingStatus::Returned => "RETURNED",
            BorrowingStatus::Overdue => "OVERDUE",
            BorrowingStatus::Pending => "PENDING",
            BorrowingStatus::Active => "ACTIVE",
            BorrowingStatus::Completed => "COMPLETED",
            BorrowingStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for BorrowingStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "BORROWED" => BorrowingStatus::Borrowed,
            "RETURNED" => BorrowingStatus::Returned,
            "OVERDUE" => BorrowingStatus::Overdue,
            "PENDING" => BorrowingStatus::Pending,
            "ACTIVE" => BorrowingStatus::Active,
            "COMPLETED" => BorrowingStatus::Completed,
            _ => BorrowingStatus::Other(raw),
        }
    }
}

impl From<&str> for BorrowingStatus {
    fn from(raw: &str) -> Self {
        BorrowingStatus::from(raw.to_string())
    }
}

impl From<BorrowingStatus> for String {
    fn from(status: BorrowingStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loan of one book to one user
///
/// Decoded through [`BorrowingRecord`] so that a malformed field never
/// rejects the record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "BorrowingRecord")]
pub struct Borrowing {
    /// Identifier
    pub id: EntityId,
    /// Borrower
    pub user_id: Option<EntityId>,
    /// Borrowed book
    pub book_id: Option<EntityId>,
    /// Denormalized book title, when the backend includes it
    pub book_title: Option<String>,
    /// Denormalized borrower name, when the backend includes it
    pub username: Option<String>,
    /// When the book was checked out
    #[serde(serialize_with = "flexible_date::serialize")]
    pub borrow_date: Option<DateTime<Utc>>,
    /// When the book must be back
    #[serde(serialize_with = "flexible_date::serialize")]
    pub due_date: Option<DateTime<Utc>>,
    /// When the book came back
    #[serde(serialize_with = "flexible_date::serialize")]
    pub return_date: Option<DateTime<Utc>>,
    /// The backend sent a return date, even one that could not be parsed
    #[serde(skip)]
    pub return_recorded: bool,
    /// Record creation time
    #[serde(serialize_with = "flexible_date::serialize")]
    pub created_at: Option<DateTime<Utc>>,
    /// Record update time
    #[serde(serialize_with = "flexible_date::serialize")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Status marker
    pub status: Option<BorrowingStatus>,
}

impl Borrowing {
    /// Whether any return date is on record
    pub fn has_return_date(&self) -> bool {
        self.return_date.is_some() || self.return_recorded
    }

    /// Currently checked out: status is `BORROWED` and no return date is recorded
    pub fn is_active(&self) -> bool {
        self.status == Some(BorrowingStatus::Borrowed) && !self.has_return_date()
    }

    /// Whether the record describes a completed return
    pub fn is_returned(&self) -> bool {
        self.status == Some(BorrowingStatus::Returned) || self.has_return_date()
    }

    /// Whether the status marker is one of `statuses`
    pub fn has_status(&self, statuses: &[BorrowingStatus]) -> bool {
        self.status.as_ref().is_some_and(|s| statuses.contains(s))
    }
}

/// Wire shape of a borrowing
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BorrowingRecord {
    #[serde(deserialize_with = "lenient::id")]
    id: EntityId,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    user_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    book_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient::string")]
    book_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    username: Option<String>,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    borrow_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    return_date: Option<Value>,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::string")]
    status: Option<String>,
}

impl From<BorrowingRecord> for Borrowing {
    fn from(record: BorrowingRecord) -> Self {
        let return_recorded = record.return_date.as_ref().is_some_and(flexible_date::is_recorded);
        Self {
            id: record.id,
            user_id: record.user_id,
            book_id: record.book_id,
            book_title: record.book_title,
            username: record.username,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            return_date: record.return_date.as_ref().and_then(flexible_date::from_value),
            return_recorded,
            created_at: record.created_at,
            updated_at: record.updated_at,
            status: record.status.map(BorrowingStatus::from),
        }
    }
}

/// Credentials sent to `/auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

/// Response of `/auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for later requests
    pub token: String,
    /// The authenticated account
    pub user: User,
    /// Role echoed at top level by some backend versions
    #[serde(default, deserialize_with = "lenient::role")]
    pub role: Option<Role>,
}

/// Payload of `/auth/register`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Book fields sent on create and update
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    /// Identifier, set on update only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// ISBN
    pub isbn: String,
    /// Category
    pub category: String,
    /// Year of publication
    pub published_year: i32,
    /// Description
    pub description: String,
    /// Number of copies owned
    pub total_copies: i32,
    /// Number of copies on the shelf
    pub available_copies: i32,
    /// Rating, only sent on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// User fields sent on update
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    /// Login name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Role, sent in upper case as the backend stores it
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "upper_role")]
    pub role: Option<Role>,
}

fn upper_role<S>(role: &Option<Role>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match role {
        Some(role) => serializer.serialize_str(&role.as_str().to_uppercase()),
        None => serializer.serialize_none(),
    }
}

/// Response of the borrowing eligibility check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanBorrow {
    /// Whether the user may borrow another book
    #[serde(default = "default_can_borrow")]
    pub can_borrow: bool,
    /// Explanation when borrowing is refused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn default_can_borrow() -> bool {
    true
}

impl Default for CanBorrow {
    fn default() -> Self {
        Self { can_borrow: true, reason: None }
    }
}

/// Lenient deserializers for fields the backend types inconsistently
///
/// A value of the wrong type reads as `None` instead of failing the record.
/// Only a missing or unusable identifier rejects it.
mod lenient {
    use super::{EntityId, Role};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn integer(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Required identifier, as a number or a numeric string
    pub fn id<'de, D>(deserializer: D) -> Result<EntityId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        integer(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", value)))
    }

    /// Optional identifier, as a number or a numeric string
    pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(integer))
    }

    /// Counts and years, as a number or a numeric string
    pub fn int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(integer)
            .and_then(|n| i32::try_from(n).ok()))
    }

    /// Decimal values, as a number or a numeric string
    pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Accept a string or a number; anything else becomes `None`
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Accept any role spelling; unknown roles become `None`
    pub fn role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Role::parse(&s),
            _ => None,
        })
    }
}

/// Timestamp (de)serialization tolerant of every format the backend emits
///
/// Accepted: RFC 3339, naive date-time (read as UTC), plain dates (UTC
/// midnight), epoch milliseconds and `[y, m, d, h, min, s]` arrays.
/// Anything else reads as `None` rather than failing the whole record.
pub mod flexible_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    /// Parse a timestamp string
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        // Offsets without a colon, e.g. `+0000`
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(dt.with_timezone(&Utc));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    fn from_parts(parts: &[Value]) -> Option<DateTime<Utc>> {
        let nums: Vec<i64> = parts.iter().map(|p| p.as_i64()).collect::<Option<_>>()?;
        let get = |i: usize| nums.get(i).copied().unwrap_or(0);
        if nums.len() < 3 {
            return None;
        }
        NaiveDate::from_ymd_opt(get(0) as i32, get(1) as u32, get(2) as u32)?
            .and_hms_opt(get(3) as u32, get(4) as u32, get(5) as u32)
            .map(|naive| naive.and_utc())
    }

    /// Read a timestamp from any accepted JSON shape
    pub fn from_value(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => parse(s),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            Value::Array(parts) => from_parts(parts),
            _ => None,
        }
    }

    /// Whether the backend sent a value at all, parseable or not
    pub fn is_recorded(value: &Value) -> bool {
        match value {
            Value::Null | Value::Bool(false) => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    /// Deserialize an optional timestamp
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(from_value))
    }

    /// Serialize an optional timestamp as RFC 3339
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use serde_json::json;

    #[test]
    fn test_book_with_missing_fields() {
        let book: Book = serde_json::from_value(json!({"id": 3, "title": "Dune"})).unwrap();
        assert_eq!(book.id, 3);
        assert_eq!(book.title.as_deref(), Some("Dune"));
        assert!(book.category.is_none());
        assert!(!book.is_available());
    }

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("Administrator"), Some(Role::Admin));
        assert_eq!(Role::parse(" librarian "), Some(Role::Librarian));
        assert_eq!(Role::parse("janitor"), None);
        assert!(Role::Librarian.is_staff());
        assert!(!Role::Student.is_staff());
    }

    #[test]
    fn test_user_lenient_fields() {
        let user: User = serde_json::from_value(json!({
            "id": 9,
            "username": "grace",
            "phone": 5551234,
            "studentId": "S-77",
            "role": "SUPERVISOR"
        }))
        .unwrap();

        assert_eq!(user.phone.as_deref(), Some("5551234"));
        assert_eq!(user.student_id.as_deref(), Some("S-77"));
        assert!(user.role.is_none());
    }

    #[test]
    fn test_user_role_serializes_lowercase() {
        let user = User { id: 1, role: Some(Role::Librarian), ..Default::default() };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "librarian");
    }

    #[test]
    fn test_borrowing_status_is_open_set() {
        let b: Borrowing = serde_json::from_value(json!({"id": 1, "status": "LOST"})).unwrap();
        assert_eq!(b.status, Some(BorrowingStatus::Other("LOST".to_string())));

        let b: Borrowing = serde_json::from_value(json!({"id": 2, "status": "borrowed"})).unwrap();
        assert_eq!(b.status, Some(BorrowingStatus::Other("borrowed".to_string())));
        assert!(!b.is_active());
    }

    #[test]
    fn test_borrowing_active_predicate() {
        let mut b: Borrowing = serde_json::from_value(json!({
            "id": 4,
            "status": "BORROWED",
            "dueDate": "2024-03-01"
        }))
        .unwrap();
        assert!(b.is_active());
        assert!(!b.is_returned());

        b.return_date = Some(Utc::now());
        assert!(!b.is_active());
        assert!(b.is_returned());
    }

    #[test]
    fn test_flexible_dates() {
        let date = flexible_date::parse("2024-03-01").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        let naive = flexible_date::parse("2024-03-01T10:30:00").unwrap();
        assert_eq!(naive.hour(), 10);

        let fractional = flexible_date::parse("2024-03-01T10:30:00.123456").unwrap();
        assert_eq!(fractional.minute(), 30);

        let zoned = flexible_date::parse("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(zoned.hour(), 8);

        assert!(flexible_date::parse("next tuesday").is_none());
        assert!(flexible_date::parse("").is_none());
    }

    #[test]
    fn test_malformed_dates_do_not_fail_record() {
        let b: Borrowing = serde_json::from_value(json!({
            "id": 5,
            "borrowDate": [2024, 2, 10],
            "dueDate": "garbage",
            "returnDate": null,
            "createdAt": 1_700_000_000_000_i64
        }))
        .unwrap();

        assert_eq!(b.borrow_date.unwrap().month(), 2);
        assert!(b.due_date.is_none());
        assert!(b.return_date.is_none());
        assert!(b.created_at.is_some());
    }

    #[test]
    fn test_offset_without_colon() {
        let date = flexible_date::parse("2024-06-01T10:00:00.000+0000").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());

        let shifted = flexible_date::parse("2024-06-01T10:00:00+0200").unwrap();
        assert_eq!(shifted.hour(), 8);
    }

    #[test]
    fn test_unreadable_return_date_still_counts_as_returned() {
        let b: Borrowing = serde_json::from_value(json!({
            "id": 6,
            "status": "BORROWED",
            "returnDate": "01/06/2024 10:00"
        }))
        .unwrap();

        assert!(b.return_date.is_none());
        assert!(b.return_recorded);
        assert!(!b.is_active());
        assert!(b.is_returned());

        let blank: Borrowing =
            serde_json::from_value(json!({"id": 7, "status": "BORROWED", "returnDate": "  "})).unwrap();
        assert!(!blank.return_recorded);
        assert!(blank.is_active());
    }

    #[test]
    fn test_borrowing_serializes_without_return_flag() {
        let b: Borrowing = serde_json::from_value(json!({
            "id": 8,
            "userId": "3",
            "returnDate": "2024-06-01T10:00:00.000+0000"
        }))
        .unwrap();
        assert_eq!(b.user_id, Some(3));

        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["userId"], 3);
        assert!(value["returnDate"].is_string());
        assert!(value.get("returnRecorded").is_none());
    }

    #[test]
    fn test_scalars_decode_leniently() {
        let book: Book = serde_json::from_value(json!({
            "id": "12",
            "title": "Neuromancer",
            "publishedYear": "1984",
            "totalCopies": 3.0,
            "availableCopies": "many",
            "rating": "4.5"
        }))
        .unwrap();

        assert_eq!(book.id, 12);
        assert_eq!(book.published_year, Some(1984));
        assert_eq!(book.total_copies, Some(3));
        assert!(book.available_copies.is_none());
        assert_eq!(book.rating, Some(4.5));

        let user: User = serde_json::from_value(json!({"id": "4", "username": 1001})).unwrap();
        assert_eq!(user.id, 4);
        assert_eq!(user.username.as_deref(), Some("1001"));
    }

    #[test]
    fn test_record_without_usable_id_is_rejected() {
        assert!(serde_json::from_value::<Book>(json!({"title": "No id"})).is_err());
        assert!(serde_json::from_value::<User>(json!({"id": "abc"})).is_err());
        assert!(serde_json::from_value::<Borrowing>(json!({"id": null})).is_err());
    }

    #[test]
    fn test_can_borrow_defaults_to_true() {
        let parsed: CanBorrow = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.can_borrow);
    }

    #[test]
    fn test_user_update_sends_upper_case_role() {
        let update = UserUpdate { role: Some(Role::Student), ..Default::default() };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({"role": "STUDENT"}));
    }
}
