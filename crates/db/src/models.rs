use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(PublisherId);
entity_id!(ContributorId);
entity_id!(BookId);
entity_id!(BookContributorId);
entity_id!(ReviewId);
entity_id!(UserId);

pub const PUBLISHER_NAME_MAX: usize = 50;
pub const CONTRIBUTOR_NAME_MAX: usize = 50;
pub const BOOK_TITLE_MAX: usize = 70;
pub const ISBN_MAX: usize = 20;
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

/// A company that publishes books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: PublisherId,
    pub name: String,
    pub website: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPublisher {
    pub name: String,
    pub website: String,
    pub email: String,
}

/// A person credited on a book: author, co-author or editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: ContributorId,
    pub first_names: String,
    pub last_names: String,
    pub email: String,
}

impl Contributor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContributor {
    pub first_names: String,
    pub last_names: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub publication_date: Date,
    pub isbn: String,
    pub publisher_id: PublisherId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub publication_date: Date,
    pub isbn: String,
    pub publisher_id: PublisherId,
}

/// Role a contributor played on a book. Variant order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionRole {
    Author,
    CoAuthor,
    Editor,
}

impl ContributionRole {
    pub const ALL: [ContributionRole; 3] = [Self::Author, Self::CoAuthor, Self::Editor];

    pub fn code(self) -> &'static str {
        match self {
            Self::Author => "AUTHOR",
            Self::CoAuthor => "CO_AUTHOR",
            Self::Editor => "EDITOR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::CoAuthor => "Co-Author",
            Self::Editor => "Editor",
        }
    }
}

impl fmt::Display for ContributionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contribution role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ContributionRole {
    type Err = UnknownRole;

    /// Accepts either the stored code (`CO_AUTHOR`) or the display label
    /// (`Co-Author`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| {
                role.code().eq_ignore_ascii_case(trimmed)
                    || role.label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Link between a book and one of its contributors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookContributor {
    pub id: BookContributorId,
    pub book_id: BookId,
    pub contributor_id: ContributorId,
    pub role: ContributionRole,
}

/// Account that writes reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub creator_id: UserId,
    pub content: String,
    pub rating: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub date_edited: OffsetDateTime,
}

/// Review to insert. Timestamps default to the current time; the CSV
/// importer supplies historical ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub book_id: BookId,
    pub creator_id: UserId,
    pub content: String,
    pub rating: u8,
    pub date_created: Option<OffsetDateTime>,
    pub date_edited: Option<OffsetDateTime>,
}

/// A contributor together with the role they played on one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credit {
    #[serde(flatten)]
    pub contributor: Contributor,
    pub role: ContributionRole,
}

/// A book with its publisher and contributors already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub book: Book,
    pub publisher: Publisher,
    pub contributors: Vec<Credit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_code_and_label() {
        assert_eq!("CO_AUTHOR".parse(), Ok(ContributionRole::CoAuthor));
        assert_eq!("Co-Author".parse(), Ok(ContributionRole::CoAuthor));
        assert_eq!(" editor ".parse(), Ok(ContributionRole::Editor));
        assert!("illustrator".parse::<ContributionRole>().is_err());
    }

    #[test]
    fn role_serializes_as_code() {
        let json = serde_json::to_string(&ContributionRole::CoAuthor).unwrap();
        assert_eq!(json, "\"CO_AUTHOR\"");
    }

    #[test]
    fn contributor_full_name() {
        let contributor = Contributor {
            id: ContributorId(1),
            first_names: "Joanne".into(),
            last_names: "Rowling".into(),
            email: "jk@example.com".into(),
        };
        assert_eq!(contributor.full_name(), "Joanne Rowling");
    }
}
