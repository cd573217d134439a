//! Catalog reads and review submission on top of the repository traits.

use std::collections::BTreeMap;

use bookrev_db::models::{BookId, NewReview, NewUser, Review};
use bookrev_db::repository::{
    BookRepository, Catalog, ReviewRepository, StoreResult, UserRepository,
};

use super::forms::ReviewSubmission;
use super::models::{BookDetail, BookSummary, ReviewView};
use super::rating::average_rating;

/// Every book with its publisher, average rating and review count.
pub async fn book_summaries<R>(repo: &R) -> StoreResult<Vec<BookSummary>>
where
    R: Catalog + ?Sized,
{
    let mut ratings: BTreeMap<BookId, Vec<u8>> = BTreeMap::new();
    for review in repo.list_reviews().await? {
        ratings.entry(review.book_id).or_default().push(review.rating);
    }

    let entries = repo.list_catalog_entries().await?;
    Ok(entries
        .iter()
        .map(|entry| {
            let book_ratings = ratings.get(&entry.book.id).map(Vec::as_slice).unwrap_or(&[]);
            BookSummary::new(&entry.book, &entry.publisher, book_ratings)
        })
        .collect())
}

/// One book with its catalog data and reviews, newest first.
pub async fn book_detail<R>(repo: &R, id: BookId) -> StoreResult<BookDetail>
where
    R: Catalog + ?Sized,
{
    let entry = repo.get_catalog_entry(id).await?;
    let reviews = repo.reviews_for_book(id).await?;
    let ratings: Vec<u8> = reviews.iter().map(|r| r.rating).collect();

    let mut views = Vec::with_capacity(reviews.len());
    for review in reviews {
        let creator = repo.get_user(review.creator_id).await?;
        views.push(ReviewView::new(review, &creator));
    }

    Ok(BookDetail {
        entry,
        rating: average_rating(&ratings),
        reviews: views,
    })
}

/// Store a review of `book` by the submitting user, creating the user on
/// first contact. A second review by the same user is a unique violation.
pub async fn submit_review<R>(
    repo: &R,
    book: BookId,
    submission: ReviewSubmission,
) -> StoreResult<Review>
where
    R: Catalog + ?Sized,
{
    repo.get_book(book).await?;

    let (creator, created) = repo
        .get_or_create_user(NewUser {
            username: submission.creator_name,
            email: submission.creator_email,
        })
        .await?;
    if created {
        tracing::info!(user_id = %creator.id, "user created for review");
    }

    let review = repo
        .create_review(NewReview {
            book_id: book,
            creator_id: creator.id,
            content: submission.content,
            rating: submission.rating,
            date_created: None,
            date_edited: None,
        })
        .await?;
    tracing::info!(book_id = %book, review_id = %review.id, "review stored");
    Ok(review)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::reviews::rating::Rating;
    use bookrev_db::models::{NewBook, NewPublisher};
    use bookrev_db::repository::PublisherRepository;
    use bookrev_db::{MemoryStore, StoreError};
    use time::macros::date;

    async fn store_with_book() -> (MemoryStore, BookId) {
        let store = MemoryStore::new();
        let publisher = store
            .create_publisher(NewPublisher {
                name: "Packt Publishing".into(),
                website: "https://www.packtpub.com".into(),
                email: "info@packtpub.com".into(),
            })
            .await
            .unwrap();
        let book = store
            .create_book(NewBook {
                title: "Advanced Deep Learning with Keras".into(),
                publication_date: date!(2018 - 10 - 31),
                isbn: "9781788629416".into(),
                publisher_id: publisher.id,
            })
            .await
            .unwrap();
        (store, book.id)
    }

    fn submission(email: &str, rating: u8) -> ReviewSubmission {
        ReviewSubmission {
            rating,
            content: "Worth reading".into(),
            creator_email: email.into(),
            creator_name: email.into(),
        }
    }

    #[tokio::test]
    async fn unreviewed_book_is_unrated() {
        let (store, _) = store_with_book().await;
        let summaries = book_summaries(&store).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].rating, Rating::Unrated);
        assert_eq!(summaries[0].number_of_reviews, 0);
    }

    #[tokio::test]
    async fn reviews_feed_rating_and_detail() {
        let (store, book) = store_with_book().await;
        submit_review(&store, book, submission("a@example.com", 4))
            .await
            .unwrap();
        submit_review(&store, book, submission("b@example.com", 5))
            .await
            .unwrap();

        let summaries = book_summaries(&store).await.unwrap();
        assert_eq!(summaries[0].rating, Rating::Average(4.5));
        assert_eq!(summaries[0].number_of_reviews, 2);

        let detail = book_detail(&store, book).await.unwrap();
        assert_eq!(detail.rating, Rating::Average(4.5));
        assert_eq!(detail.reviews.len(), 2);
        assert_eq!(detail.entry.publisher.name, "Packt Publishing");
    }

    #[tokio::test]
    async fn second_review_by_same_user_conflicts() {
        let (store, book) = store_with_book().await;
        submit_review(&store, book, submission("a@example.com", 4))
            .await
            .unwrap();
        let err = submit_review(&store, book, submission("a@example.com", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let (store, _) = store_with_book().await;
        let err = book_detail(&store, BookId(999)).await.unwrap_err();
        assert!(err.is_not_found());
        let err = submit_review(&store, BookId(999), submission("a@example.com", 3))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
