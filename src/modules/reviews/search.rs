//! Book search: a free-text query plus the fields to look in.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bookrev_db::models::CatalogEntry;
use bookrev_db::repository::{BookRepository, StoreResult};
use bookrev_db::{BookCondition, BookFilter};
use serde::{Deserialize, Serialize};

use super::forms::{ValidationError, ValidationErrors};
use crate::utils::{non_blank, split_list};

pub const SEARCH_PROMPT: &str = "Please enter a search term and select search criteria";

/// A book field the query may be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSelector {
    Title,
    Isbn,
    Publisher,
    Contributor,
}

impl FieldSelector {
    pub const ALL: [FieldSelector; 4] = [
        Self::Title,
        Self::Isbn,
        Self::Publisher,
        Self::Contributor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Isbn => "isbn",
            Self::Publisher => "publisher",
            Self::Contributor => "contributor",
        }
    }

    fn condition(self, needle: &str) -> BookCondition {
        match self {
            Self::Title => BookCondition::title_contains(needle),
            Self::Isbn => BookCondition::isbn_contains(needle),
            Self::Publisher => BookCondition::publisher_name_contains(needle),
            Self::Contributor => BookCondition::contributor_name_contains(needle),
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Select a valid choice. {0} is not one of the available choices.")]
pub struct UnknownSelector(pub String);

impl FromStr for FieldSelector {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|selector| selector.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSelector(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    Predicate(BookFilter),
    /// Nothing to search for; the caller should prompt instead of listing.
    NoSearchRequested,
}

/// Turn a query and selected fields into a disjunctive book filter.
pub fn build_search_filter(query: &str, fields: &BTreeSet<FieldSelector>) -> SearchFilter {
    let query = query.trim();
    if query.is_empty() || fields.is_empty() {
        return SearchFilter::NoSearchRequested;
    }

    let filter = fields
        .iter()
        .fold(BookFilter::new(), |filter, field| filter.or(field.condition(query)));
    SearchFilter::Predicate(filter)
}

/// Matching catalog entries, one per book, in book order.
pub async fn run_search<R>(repo: &R, filter: &BookFilter) -> StoreResult<Vec<CatalogEntry>>
where
    R: BookRepository + ?Sized,
{
    let entries = repo.find_catalog_entries(filter).await?;
    tracing::debug!(
        conditions = filter.conditions().len(),
        results = entries.len(),
        "search evaluated"
    );
    Ok(entries)
}

/// Raw query parameters of a search request.
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    pub search: Option<String>,
    /// Comma-separated field selectors.
    pub search_book_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub fields: BTreeSet<FieldSelector>,
}

impl SearchForm {
    /// Collect decoded query pairs. `search_book_by` may repeat, as a set of
    /// checkboxes submits it, and each value may itself be a comma list. The
    /// last `search` wins. Other keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "search" => form.search = Some(value),
                "search_book_by" => match form.search_book_by.as_mut() {
                    Some(selected) => {
                        selected.push(',');
                        selected.push_str(&value);
                    }
                    None => form.search_book_by = Some(value),
                },
                _ => {}
            }
        }
        form
    }

    pub fn clean(self) -> Result<SearchRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = BTreeSet::new();

        for raw in split_list(self.search_book_by.as_deref().unwrap_or_default()) {
            match raw.parse::<FieldSelector>() {
                Ok(field) => {
                    fields.insert(field);
                }
                Err(unknown) => {
                    errors.push(ValidationError::field("search_book_by", unknown.to_string()))
                }
            }
        }

        let query = non_blank(self.search).unwrap_or_default();
        errors.finish(|| SearchRequest { query, fields })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Results {
        query: String,
        fields: BTreeSet<FieldSelector>,
        results: Vec<CatalogEntry>,
    },
    Prompt {
        message: &'static str,
    },
}

/// Run a cleaned search request end to end.
pub async fn search<R>(repo: &R, request: SearchRequest) -> StoreResult<SearchOutcome>
where
    R: BookRepository + ?Sized,
{
    match build_search_filter(&request.query, &request.fields) {
        SearchFilter::NoSearchRequested => Ok(SearchOutcome::Prompt {
            message: SEARCH_PROMPT,
        }),
        SearchFilter::Predicate(filter) => {
            let results = run_search(repo, &filter).await?;
            Ok(SearchOutcome::Results {
                query: request.query,
                fields: request.fields,
                results,
            })
        }
    }
}
