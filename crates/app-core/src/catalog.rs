//! Book catalog
//!
//! Client-side filtering and sorting of the catalog, the book form with its
//! validation rules, and [`CatalogService`] for catalog reads and edits.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{Datelike, Utc};
use lms_client::types::BookInput;
use lms_client::{Book, EntityId, LibraryClient};
use serde::{Deserialize, Serialize};

/// Category value that disables the category filter
pub const ALL_CATEGORIES: &str = "all";

/// Category preselected in the book form
pub const DEFAULT_CATEGORY: &str = "fiction";

/// Errors that can occur during catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The book form is invalid; nothing was sent
    #[error("{0}")]
    Validation(String),

    /// Backend error
    #[error(transparent)]
    Client(#[from] lms_client::Error),
}

impl CatalogError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Validation(message) => message.clone(),
            CatalogError::Client(err) => err.user_message(),
        }
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog sort orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookSort {
    /// Title, A to Z
    #[default]
    Title,
    /// Author, A to Z
    Author,
    /// Publication year, newest first
    Year,
    /// Rating, best first
    Rating,
}

/// Search, category and sort settings of a catalog view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookFilter {
    /// Case-insensitive substring of title, author or category
    pub search: String,
    /// Category to show, or `all`
    pub category: String,
    /// Sort order
    pub sort: BookSort,
}

impl Default for BookFilter {
    fn default() -> Self {
        Self { search: String::new(), category: ALL_CATEGORIES.to_string(), sort: BookSort::Title }
    }
}

impl BookFilter {
    /// Set the search text
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the sort order
    pub fn with_sort(mut self, sort: BookSort) -> Self {
        self.sort = sort;
        self
    }

    /// Whether a book passes the search and category filters
    pub fn matches(&self, book: &Book) -> bool {
        let needle = self.search.to_lowercase();
        let contains = |field: &Option<String>| {
            field.as_deref().is_some_and(|v| v.to_lowercase().contains(&needle))
        };

        let matches_search = needle.is_empty()
            || contains(&book.title)
            || contains(&book.author)
            || contains(&book.category);

        let matches_category = self.category.eq_ignore_ascii_case(ALL_CATEGORIES)
            || book
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == self.category.to_lowercase());

        matches_search && matches_category
    }

    /// Filtered and sorted copy of `books`
    pub fn apply(&self, books: &[Book]) -> Vec<Book> {
        let mut filtered: Vec<Book> = books.iter().filter(|b| self.matches(b)).cloned().collect();
        filtered.sort_by(|a, b| self.compare(a, b));
        filtered
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        match self.sort {
            BookSort::Title => text_order(a.title.as_deref(), b.title.as_deref()),
            BookSort::Author => text_order(a.author.as_deref(), b.author.as_deref()),
            BookSort::Year => b.published_year.unwrap_or(0).cmp(&a.published_year.unwrap_or(0)),
            BookSort::Rating => b
                .rating
                .unwrap_or(0.0)
                .partial_cmp(&a.rating.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal),
        }
    }
}

/// Case-insensitive text order, missing values as empty text
pub(crate) fn text_order(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.unwrap_or_default();
    let b = b.unwrap_or_default();
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Distinct categories of the catalog, lower case and sorted
pub fn distinct_categories(books: &[Book]) -> Vec<String> {
    books
        .iter()
        .filter_map(|b| b.category.as_deref())
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Contents of the add/edit book form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    /// Title (required)
    pub title: String,
    /// Author (required)
    pub author: String,
    /// ISBN
    pub isbn: String,
    /// Category
    pub category: String,
    /// Year of publication
    pub published_year: i32,
    /// Blurb
    pub description: String,
    /// Copies owned
    pub total_copies: i32,
    /// Copies on the shelf; ignored for new books
    pub available_copies: i32,
}

impl Default for BookDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            isbn: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            published_year: Utc::now().year(),
            description: String::new(),
            total_copies: 1,
            available_copies: 1,
        }
    }
}

impl BookDraft {
    /// Prefill the form from an existing book
    pub fn from_book(book: &Book) -> Self {
        let defaults = Self::default();
        Self {
            title: book.title.clone().unwrap_or_default(),
            author: book.author.clone().unwrap_or_default(),
            isbn: book.isbn.clone().unwrap_or_default(),
            category: book
                .category
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(defaults.category),
            published_year: book.published_year.unwrap_or(defaults.published_year),
            description: book.description.clone().unwrap_or_default(),
            total_copies: book.total_copies.unwrap_or(defaults.total_copies),
            available_copies: book.available_copies.unwrap_or(defaults.available_copies),
        }
    }

    /// Check the rules shared by new and edited books
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.author.trim().is_empty() {
            return Err(CatalogError::Validation("Title and author are required".to_string()));
        }
        if self.total_copies < 0 {
            return Err(CatalogError::Validation("Total copies cannot be negative".to_string()));
        }
        Ok(())
    }

    /// Payload for a new book: every copy is available and the rating starts at 0
    pub fn to_new_book(&self) -> Result<BookInput> {
        self.validate()?;
        Ok(self.payload(None, self.total_copies, Some(0.0)))
    }

    /// Payload for an edited book
    pub fn to_update(&self, id: EntityId) -> Result<BookInput> {
        self.validate()?;
        if self.available_copies < 0 || self.available_copies > self.total_copies {
            return Err(CatalogError::Validation(
                "Available copies must be between 0 and the total number of copies".to_string(),
            ));
        }
        Ok(self.payload(Some(id), self.available_copies, None))
    }

    fn payload(&self, id: Option<EntityId>, available: i32, rating: Option<f64>) -> BookInput {
        BookInput {
            id,
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            category: self.category.clone(),
            published_year: self.published_year,
            description: self.description.clone(),
            total_copies: self.total_copies,
            available_copies: available,
            rating,
        }
    }
}

/// Catalog reads and edits
#[derive(Debug, Clone)]
pub struct CatalogService {
    client: LibraryClient,
}

impl CatalogService {
    /// Create a new catalog service
    pub fn new(client: LibraryClient) -> Self {
        Self { client }
    }

    /// Every book
    pub async fn list(&self) -> Result<Vec<Book>> {
        Ok(self.client.list_books().await?)
    }

    /// Books with a copy on the shelf
    pub async fn available(&self) -> Result<Vec<Book>> {
        Ok(self.client.list_available_books().await?)
    }

    /// Server-side search
    pub async fn search(&self, query: &str) -> Result<Vec<Book>> {
        Ok(self.client.search_books(query).await?)
    }

    /// One book
    pub async fn get(&self, id: EntityId) -> Result<Book> {
        Ok(self.client.get_book(id).await?)
    }

    /// Add a book to the catalog
    pub async fn create(&self, draft: &BookDraft) -> Result<Book> {
        let payload = draft.to_new_book()?;
        let book = self.client.create_book(&payload).await?;
        tracing::info!(book_id = book.id, title = %payload.title, "book added");
        Ok(book)
    }

    /// Save an edited book
    pub async fn update(&self, id: EntityId, draft: &BookDraft) -> Result<Book> {
        let payload = draft.to_update(id)?;
        let book = self.client.update_book(id, &payload).await?;
        tracing::info!(book_id = id, "book updated");
        Ok(book)
    }

    /// Remove a book from the catalog
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        self.client.delete_book(id).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_client::RestClientConfig;

    fn book(id: EntityId, title: &str, author: &str, category: &str, year: i32, rating: f64) -> Book {
        Book {
            id,
            title: Some(title.into()),
            author: Some(author.into()),
            category: Some(category.into()),
            published_year: Some(year),
            rating: Some(rating),
            ..Default::default()
        }
    }

    fn shelf() -> Vec<Book> {
        vec![
            book(1, "dune", "Herbert", "Fiction", 1965, 4.5),
            book(2, "Akira", "Otomo", "manga", 1982, 4.8),
            book(3, "Cosmos", "Sagan", "non-fiction", 1980, 4.7),
            Book { id: 4, title: Some("Untitled".into()), ..Default::default() },
        ]
    }

    fn ids(books: &[Book]) -> Vec<EntityId> {
        books.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_default_filter_sorts_by_title() {
        assert_eq!(ids(&BookFilter::default().apply(&shelf())), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_search_matches_title_author_category() {
        let books = shelf();
        assert_eq!(ids(&BookFilter::default().with_search("HERB").apply(&books)), vec![1]);
        assert_eq!(ids(&BookFilter::default().with_search("fic").apply(&books)), vec![3, 1]);
        assert!(BookFilter::default().with_search("zzz").apply(&books).is_empty());
    }

    #[test]
    fn test_category_filter() {
        let books = shelf();
        assert_eq!(ids(&BookFilter::default().with_category("FICTION").apply(&books)), vec![1]);
        assert_eq!(BookFilter::default().with_category("all").apply(&books).len(), 4);
    }

    #[test]
    fn test_numeric_sorts_are_descending() {
        let books = shelf();
        let by_year = BookFilter::default().with_sort(BookSort::Year).apply(&books);
        assert_eq!(ids(&by_year), vec![2, 3, 1, 4]);

        let by_rating = BookFilter::default().with_sort(BookSort::Rating).apply(&books);
        assert_eq!(ids(&by_rating), vec![2, 3, 1, 4]);

        let by_author = BookFilter::default().with_sort(BookSort::Author).apply(&books);
        assert_eq!(ids(&by_author), vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_distinct_categories() {
        assert_eq!(distinct_categories(&shelf()), vec!["fiction", "manga", "non-fiction"]);
    }

    #[test]
    fn test_new_book_payload() {
        let draft = BookDraft {
            title: "  Dune ".into(),
            author: "Herbert".into(),
            total_copies: 4,
            available_copies: 1,
            ..Default::default()
        };

        let payload = draft.to_new_book().unwrap();
        assert_eq!(payload.title, "Dune");
        assert_eq!(payload.available_copies, 4);
        assert_eq!(payload.rating, Some(0.0));
        assert_eq!(payload.category, "fiction");
        assert!(payload.id.is_none());
    }

    #[test]
    fn test_draft_requires_title_and_author() {
        let draft = BookDraft { title: "Dune".into(), author: "   ".into(), ..Default::default() };
        let err = draft.to_new_book().unwrap_err();
        assert_eq!(err.user_message(), "Title and author are required");
    }

    #[test]
    fn test_update_checks_available_copies() {
        let mut draft = BookDraft::from_book(&shelf()[0]);
        draft.total_copies = 2;
        draft.available_copies = 3;
        assert!(matches!(draft.to_update(1), Err(CatalogError::Validation(_))));

        draft.available_copies = 2;
        let payload = draft.to_update(1).unwrap();
        assert_eq!(payload.id, Some(1));
        assert_eq!(payload.category, "Fiction");
        assert_eq!(payload.published_year, 1965);
        assert!(payload.rating.is_none());
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_sent() {
        // Nothing listens on this port; validation must fail first
        let client = LibraryClient::new(RestClientConfig::new("http://127.0.0.1:9")).unwrap();
        let service = CatalogService::new(client);

        let err = service.create(&BookDraft::default()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
