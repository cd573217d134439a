//! One repository trait per entity. Callers depend on these traits, never on
//! a concrete store.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::*;
use crate::query::BookFilter;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PublisherRepository: Send + Sync {
    async fn create_publisher(&self, new: NewPublisher) -> StoreResult<Publisher>;

    async fn get_publisher(&self, id: PublisherId) -> StoreResult<Publisher>;

    async fn update_publisher(&self, id: PublisherId, new: NewPublisher)
        -> StoreResult<Publisher>;

    /// Deletes the publisher together with its books.
    async fn delete_publisher(&self, id: PublisherId) -> StoreResult<()>;

    /// All publishers ordered by name.
    async fn list_publishers(&self) -> StoreResult<Vec<Publisher>>;

    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>>;
}

#[async_trait]
pub trait ContributorRepository: Send + Sync {
    async fn create_contributor(&self, new: NewContributor) -> StoreResult<Contributor>;

    async fn get_contributor(&self, id: ContributorId) -> StoreResult<Contributor>;

    /// All contributors ordered by last names, then first names.
    async fn list_contributors(&self) -> StoreResult<Vec<Contributor>>;

    async fn find_contributor_by_email(&self, email: &str) -> StoreResult<Option<Contributor>>;

    /// Exact match on every attribute.
    async fn find_contributor(&self, new: &NewContributor) -> StoreResult<Option<Contributor>>;

    /// Credit `contributor` on `book` with `role`. The triple is unique.
    async fn link_contributor(
        &self,
        book: BookId,
        contributor: ContributorId,
        role: ContributionRole,
    ) -> StoreResult<BookContributor>;

    async fn list_book_contributors(&self) -> StoreResult<Vec<BookContributor>>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create_book(&self, new: NewBook) -> StoreResult<Book>;

    async fn get_book(&self, id: BookId) -> StoreResult<Book>;

    /// Deletes the book with its contributor links and reviews.
    async fn delete_book(&self, id: BookId) -> StoreResult<()>;

    /// All books ordered by publication date (newest first), then title.
    async fn list_books(&self) -> StoreResult<Vec<Book>>;

    async fn find_book_by_title(&self, title: &str) -> StoreResult<Option<Book>>;

    async fn get_catalog_entry(&self, id: BookId) -> StoreResult<CatalogEntry>;

    /// Every catalog entry matching `filter`, each book at most once, in book
    /// order.
    async fn find_catalog_entries(&self, filter: &BookFilter) -> StoreResult<Vec<CatalogEntry>>;

    /// Every catalog entry in book order.
    async fn list_catalog_entries(&self) -> StoreResult<Vec<CatalogEntry>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Returns the user with `email`, creating one from `new` when absent.
    /// The flag is true when a user was created.
    ///
    /// Stores that can check and insert atomically should override this.
    async fn get_or_create_user(&self, new: NewUser) -> StoreResult<(User, bool)> {
        if let Some(existing) = self.find_user_by_email(&new.email).await? {
            return Ok((existing, false));
        }
        let email = new.email.clone();
        match self.create_user(new).await {
            Ok(user) => Ok((user, true)),
            // Another caller inserted the same email between lookup and insert.
            Err(err @ StoreError::UniqueViolation { .. }) => {
                match self.find_user_by_email(&email).await? {
                    Some(existing) => Ok((existing, false)),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Fails with a unique violation when the creator already reviewed the
    /// book, and with `Invalid` when the rating lies outside 1..=5.
    async fn create_review(&self, new: NewReview) -> StoreResult<Review>;

    async fn update_review(&self, id: ReviewId, content: String, rating: u8)
        -> StoreResult<Review>;

    /// Reviews of one book, newest first.
    async fn reviews_for_book(&self, book: BookId) -> StoreResult<Vec<Review>>;

    async fn find_review(&self, book: BookId, creator: UserId) -> StoreResult<Option<Review>>;

    /// All reviews, newest first.
    async fn list_reviews(&self) -> StoreResult<Vec<Review>>;
}

/// Everything the application needs from storage.
pub trait Catalog:
    PublisherRepository + ContributorRepository + BookRepository + UserRepository + ReviewRepository
{
}

impl<T> Catalog for T where
    T: PublisherRepository
        + ContributorRepository
        + BookRepository
        + UserRepository
        + ReviewRepository
{
}
