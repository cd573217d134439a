//! Filter predicates evaluated by the store against catalog entries.

use crate::models::CatalogEntry;

/// One case-insensitive substring test against a catalog entry.
///
/// Needles are lowercased on construction so evaluation only lowercases the
/// haystack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookCondition {
    TitleContains(String),
    IsbnContains(String),
    PublisherNameContains(String),
    /// Matches first names or last names of any credited contributor.
    ContributorNameContains(String),
}

impl BookCondition {
    pub fn title_contains(needle: &str) -> Self {
        Self::TitleContains(needle.to_lowercase())
    }

    pub fn isbn_contains(needle: &str) -> Self {
        Self::IsbnContains(needle.to_lowercase())
    }

    pub fn publisher_name_contains(needle: &str) -> Self {
        Self::PublisherNameContains(needle.to_lowercase())
    }

    pub fn contributor_name_contains(needle: &str) -> Self {
        Self::ContributorNameContains(needle.to_lowercase())
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::TitleContains(needle) => contains_ci(&entry.book.title, needle),
            Self::IsbnContains(needle) => contains_ci(&entry.book.isbn, needle),
            Self::PublisherNameContains(needle) => contains_ci(&entry.publisher.name, needle),
            Self::ContributorNameContains(needle) => entry.contributors.iter().any(|credit| {
                contains_ci(&credit.contributor.first_names, needle)
                    || contains_ci(&credit.contributor.last_names, needle)
            }),
        }
    }
}

/// Disjunction of conditions: an entry matches when any condition does.
/// An empty filter matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    conditions: Vec<BookCondition>,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alternative to the disjunction.
    pub fn or(mut self, condition: BookCondition) -> Self {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
        self
    }

    pub fn conditions(&self) -> &[BookCondition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.conditions.iter().any(|c| c.matches(entry))
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
