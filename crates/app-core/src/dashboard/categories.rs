//! Category distribution

use lms_client::Book;
use serde::{Deserialize, Serialize};

/// Label of the catch-all bucket
pub const OTHER_LABEL: &str = "Other";

const UNCATEGORIZED: &str = "uncategorized";

/// One bucket of the category distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySlice {
    /// Display label, first letter capitalized
    pub category: String,
    /// Books in the bucket
    pub count: usize,
    /// Share of all books with one decimal, `"0"` when there are no books
    pub percentage: String,
}

/// Count books per recognized category plus an "Other" bucket
///
/// Categories match case-insensitively after trimming. Buckets are listed
/// in the order of `main_categories`, followed by "Other"; empty buckets
/// are left out.
pub fn category_breakdown(books: &[Book], main_categories: &[String]) -> Vec<CategorySlice> {
    let recognized: Vec<String> =
        main_categories.iter().map(|c| c.trim().to_lowercase()).collect();

    let mut counts = vec![0usize; recognized.len()];
    let mut other = 0usize;

    for book in books {
        let category = book
            .category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        match recognized.iter().position(|r| *r == category) {
            Some(index) => counts[index] += 1,
            None => other += 1,
        }
    }

    let total = books.len();
    recognized
        .iter()
        .zip(counts)
        .map(|(label, count)| (capitalize(label), count))
        .chain(std::iter::once((OTHER_LABEL.to_string(), other)))
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| CategorySlice {
            category,
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

/// `count / total` as a percentage with one decimal, halves rounded up
fn percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return "0".to_string();
    }
    let tenths = (count as u128 * 2000 + total as u128) / (2 * total as u128);
    format!("{}.{}", tenths / 10, tenths % 10)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
