//! Response shapes of the reviews API.

use bookrev_db::models::{Book, BookId, CatalogEntry, Publisher, PublisherId, Review, ReviewId, User};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use super::rating::Rating;

#[derive(Debug, Clone, Serialize)]
pub struct PublisherRef {
    pub id: PublisherId,
    pub name: String,
}

impl From<&Publisher> for PublisherRef {
    fn from(publisher: &Publisher) -> Self {
        Self {
            id: publisher.id,
            name: publisher.name.clone(),
        }
    }
}

/// One row of the book list.
#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub publication_date: Date,
    pub publisher: PublisherRef,
    pub rating: Rating,
    pub number_of_reviews: usize,
}

impl BookSummary {
    pub fn new(book: &Book, publisher: &Publisher, ratings: &[u8]) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            publication_date: book.publication_date,
            publisher: publisher.into(),
            rating: super::rating::average_rating(ratings),
            number_of_reviews: ratings.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub book_id: BookId,
    pub creator: String,
    pub creator_email: String,
    pub content: String,
    pub rating: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub date_edited: OffsetDateTime,
}

impl ReviewView {
    pub fn new(review: Review, creator: &User) -> Self {
        Self {
            id: review.id,
            book_id: review.book_id,
            creator: creator.username.clone(),
            creator_email: creator.email.clone(),
            content: review.content,
            rating: review.rating,
            date_created: review.date_created,
            date_edited: review.date_edited,
        }
    }
}

/// A book with everything the detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub rating: Rating,
    pub reviews: Vec<ReviewView>,
}
