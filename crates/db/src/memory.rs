use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::*;
use crate::query::BookFilter;
use crate::repository::*;

#[derive(Default)]
struct Tables {
    publishers: BTreeMap<PublisherId, Publisher>,
    contributors: BTreeMap<ContributorId, Contributor>,
    books: BTreeMap<BookId, Book>,
    book_contributors: BTreeMap<BookContributorId, BookContributor>,
    users: BTreeMap<UserId, User>,
    reviews: BTreeMap<ReviewId, Review>,
    last_id: u64,
}

impl Tables {
    /// Ids are unique across tables, which keeps them unambiguous in logs.
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn publisher(&self, id: PublisherId) -> StoreResult<&Publisher> {
        self.publishers
            .get(&id)
            .ok_or_else(|| StoreError::not_found("publisher", id))
    }

    fn book(&self, id: BookId) -> StoreResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| StoreError::not_found("book", id))
    }

    fn sorted_books(&self) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.books.values().collect();
        books.sort_by(|a, b| {
            b.publication_date
                .cmp(&a.publication_date)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        books
    }

    fn catalog_entry(&self, book: &Book) -> StoreResult<CatalogEntry> {
        let publisher = self.publisher(book.publisher_id)?.clone();
        let mut contributors: Vec<Credit> = self
            .book_contributors
            .values()
            .filter(|link| link.book_id == book.id)
            .filter_map(|link| {
                self.contributors.get(&link.contributor_id).map(|c| Credit {
                    contributor: c.clone(),
                    role: link.role,
                })
            })
            .collect();
        contributors.sort_by(|a, b| {
            a.role
                .cmp(&b.role)
                .then_with(|| a.contributor.last_names.cmp(&b.contributor.last_names))
        });

        Ok(CatalogEntry {
            book: book.clone(),
            publisher,
            contributors,
        })
    }

    fn insert_user(&mut self, new: NewUser) -> StoreResult<User> {
        if new.email.trim().is_empty() {
            return Err(StoreError::invalid("user", "email must not be empty"));
        }
        if self.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::UniqueViolation {
                constraint: "user_email_unique",
                detail: format!("email {} already registered", new.email),
            });
        }
        let id = UserId(self.next_id());
        let user = User {
            id,
            username: new.username,
            email: new.email,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn remove_book(&mut self, id: BookId) {
        self.books.remove(&id);
        self.book_contributors.retain(|_, link| link.book_id != id);
        self.reviews.retain(|_, review| review.book_id != id);
    }
}

fn sort_reviews(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| {
        b.date_created
            .cmp(&a.date_created)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn check_publisher(new: &NewPublisher) -> StoreResult<()> {
    if new.name.trim().is_empty() {
        return Err(StoreError::invalid("publisher", "name must not be empty"));
    }
    if new.name.chars().count() > PUBLISHER_NAME_MAX {
        return Err(StoreError::invalid(
            "publisher",
            format!("name exceeds {} characters", PUBLISHER_NAME_MAX),
        ));
    }
    Ok(())
}

fn check_rating(rating: u8) -> StoreResult<()> {
    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
        return Err(StoreError::invalid(
            "review",
            format!(
                "rating must be between {} and {}, got {}",
                RATING_MIN, RATING_MAX, rating
            ),
        ));
    }
    Ok(())
}

/// In-process store guarded by a single `RwLock`. Cloning shares the tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row counts per entity, keyed by entity name.
    pub async fn counts(&self) -> BTreeMap<&'static str, usize> {
        let tables = self.tables.read().await;
        BTreeMap::from([
            ("publishers", tables.publishers.len()),
            ("contributors", tables.contributors.len()),
            ("books", tables.books.len()),
            ("book_contributors", tables.book_contributors.len()),
            ("users", tables.users.len()),
            ("reviews", tables.reviews.len()),
        ])
    }
}

#[async_trait]
impl PublisherRepository for MemoryStore {
    async fn create_publisher(&self, new: NewPublisher) -> StoreResult<Publisher> {
        check_publisher(&new)?;
        let mut tables = self.tables.write().await;
        let id = PublisherId(tables.next_id());
        let publisher = Publisher {
            id,
            name: new.name,
            website: new.website,
            email: new.email,
        };
        tables.publishers.insert(id, publisher.clone());
        tracing::debug!(publisher_id = %id, "publisher created");
        Ok(publisher)
    }

    async fn get_publisher(&self, id: PublisherId) -> StoreResult<Publisher> {
        self.tables.read().await.publisher(id).cloned()
    }

    async fn update_publisher(
        &self,
        id: PublisherId,
        new: NewPublisher,
    ) -> StoreResult<Publisher> {
        check_publisher(&new)?;
        let mut tables = self.tables.write().await;
        let publisher = tables
            .publishers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("publisher", id))?;
        publisher.name = new.name;
        publisher.website = new.website;
        publisher.email = new.email;
        Ok(publisher.clone())
    }

    async fn delete_publisher(&self, id: PublisherId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.publishers.remove(&id).is_none() {
            return Err(StoreError::not_found("publisher", id));
        }
        let orphaned: Vec<BookId> = tables
            .books
            .values()
            .filter(|book| book.publisher_id == id)
            .map(|book| book.id)
            .collect();
        for book in orphaned {
            tables.remove_book(book);
        }
        Ok(())
    }

    async fn list_publishers(&self) -> StoreResult<Vec<Publisher>> {
        let tables = self.tables.read().await;
        let mut publishers: Vec<Publisher> = tables.publishers.values().cloned().collect();
        publishers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(publishers)
    }

    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>> {
        let tables = self.tables.read().await;
        Ok(tables.publishers.values().find(|p| p.name == name).cloned())
    }
}

#[async_trait]
impl ContributorRepository for MemoryStore {
    async fn create_contributor(&self, new: NewContributor) -> StoreResult<Contributor> {
        if new.last_names.trim().is_empty() {
            return Err(StoreError::invalid("contributor", "last names must not be empty"));
        }
        let mut tables = self.tables.write().await;
        let id = ContributorId(tables.next_id());
        let contributor = Contributor {
            id,
            first_names: new.first_names,
            last_names: new.last_names,
            email: new.email,
        };
        tables.contributors.insert(id, contributor.clone());
        Ok(contributor)
    }

    async fn get_contributor(&self, id: ContributorId) -> StoreResult<Contributor> {
        self.tables
            .read()
            .await
            .contributors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("contributor", id))
    }

    async fn list_contributors(&self) -> StoreResult<Vec<Contributor>> {
        let tables = self.tables.read().await;
        let mut contributors: Vec<Contributor> = tables.contributors.values().cloned().collect();
        contributors.sort_by(|a, b| {
            a.last_names
                .cmp(&b.last_names)
                .then_with(|| a.first_names.cmp(&b.first_names))
        });
        Ok(contributors)
    }

    async fn find_contributor_by_email(&self, email: &str) -> StoreResult<Option<Contributor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contributors
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn find_contributor(&self, new: &NewContributor) -> StoreResult<Option<Contributor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contributors
            .values()
            .find(|c| {
                c.first_names == new.first_names
                    && c.last_names == new.last_names
                    && c.email == new.email
            })
            .cloned())
    }

    async fn link_contributor(
        &self,
        book: BookId,
        contributor: ContributorId,
        role: ContributionRole,
    ) -> StoreResult<BookContributor> {
        let mut tables = self.tables.write().await;
        tables.book(book)?;
        if !tables.contributors.contains_key(&contributor) {
            return Err(StoreError::not_found("contributor", contributor));
        }
        let duplicate = tables.book_contributors.values().any(|link| {
            link.book_id == book && link.contributor_id == contributor && link.role == role
        });
        if duplicate {
            return Err(StoreError::UniqueViolation {
                constraint: "unique_book_contributor_role",
                detail: format!("contributor {} is already {} of book {}", contributor, role, book),
            });
        }
        let id = BookContributorId(tables.next_id());
        let link = BookContributor {
            id,
            book_id: book,
            contributor_id: contributor,
            role,
        };
        tables.book_contributors.insert(id, link.clone());
        Ok(link)
    }

    async fn list_book_contributors(&self) -> StoreResult<Vec<BookContributor>> {
        let tables = self.tables.read().await;
        Ok(tables.book_contributors.values().cloned().collect())
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn create_book(&self, new: NewBook) -> StoreResult<Book> {
        if new.title.trim().is_empty() {
            return Err(StoreError::invalid("book", "title must not be empty"));
        }
        if new.isbn.trim().is_empty() {
            return Err(StoreError::invalid("book", "isbn must not be empty"));
        }
        let mut tables = self.tables.write().await;
        tables.publisher(new.publisher_id)?;
        if tables.books.values().any(|b| b.isbn == new.isbn) {
            return Err(StoreError::UniqueViolation {
                constraint: "book_isbn_unique",
                detail: format!("isbn {} already exists", new.isbn),
            });
        }
        let id = BookId(tables.next_id());
        let book = Book {
            id,
            title: new.title,
            publication_date: new.publication_date,
            isbn: new.isbn,
            publisher_id: new.publisher_id,
        };
        tables.books.insert(id, book.clone());
        tracing::debug!(book_id = %id, "book created");
        Ok(book)
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Book> {
        self.tables.read().await.book(id).cloned()
    }

    async fn delete_book(&self, id: BookId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.book(id)?;
        tables.remove_book(id);
        Ok(())
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_books().into_iter().cloned().collect())
    }

    async fn find_book_by_title(&self, title: &str) -> StoreResult<Option<Book>> {
        let tables = self.tables.read().await;
        Ok(tables.books.values().find(|b| b.title == title).cloned())
    }

    async fn get_catalog_entry(&self, id: BookId) -> StoreResult<CatalogEntry> {
        let tables = self.tables.read().await;
        let book = tables.book(id)?;
        tables.catalog_entry(book)
    }

    async fn find_catalog_entries(&self, filter: &BookFilter) -> StoreResult<Vec<CatalogEntry>> {
        let tables = self.tables.read().await;
        let mut matches = Vec::new();
        // Iterating books rather than contributor links yields each book once.
        for book in tables.sorted_books() {
            let entry = tables.catalog_entry(book)?;
            if filter.matches(&entry) {
                matches.push(entry);
            }
        }
        Ok(matches)
    }

    async fn list_catalog_entries(&self) -> StoreResult<Vec<CatalogEntry>> {
        let tables = self.tables.read().await;
        tables
            .sorted_books()
            .into_iter()
            .map(|book| tables.catalog_entry(book))
            .collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        self.tables.write().await.insert_user(new)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    /// Lookup and insert share one write lock.
    async fn get_or_create_user(&self, new: NewUser) -> StoreResult<(User, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.users.values().find(|u| u.email == new.email) {
            return Ok((existing.clone(), false));
        }
        Ok((tables.insert_user(new)?, true))
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn create_review(&self, new: NewReview) -> StoreResult<Review> {
        check_rating(new.rating)?;
        let mut tables = self.tables.write().await;
        tables.book(new.book_id)?;
        if !tables.users.contains_key(&new.creator_id) {
            return Err(StoreError::not_found("user", new.creator_id));
        }
        let duplicate = tables
            .reviews
            .values()
            .any(|r| r.book_id == new.book_id && r.creator_id == new.creator_id);
        if duplicate {
            return Err(StoreError::UniqueViolation {
                constraint: "unique_book_creator",
                detail: format!(
                    "user {} already reviewed book {}",
                    new.creator_id, new.book_id
                ),
            });
        }

        let now = OffsetDateTime::now_utc();
        let date_created = new.date_created.unwrap_or(now);
        let id = ReviewId(tables.next_id());
        let review = Review {
            id,
            book_id: new.book_id,
            creator_id: new.creator_id,
            content: new.content,
            rating: new.rating,
            date_created,
            date_edited: new.date_edited.unwrap_or(date_created),
        };
        tables.reviews.insert(id, review.clone());
        tracing::debug!(review_id = %id, book_id = %review.book_id, "review created");
        Ok(review)
    }

    async fn update_review(
        &self,
        id: ReviewId,
        content: String,
        rating: u8,
    ) -> StoreResult<Review> {
        check_rating(rating)?;
        let mut tables = self.tables.write().await;
        let review = tables
            .reviews
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("review", id))?;
        review.content = content;
        review.rating = rating;
        review.date_edited = OffsetDateTime::now_utc();
        Ok(review.clone())
    }

    async fn reviews_for_book(&self, book: BookId) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read().await;
        tables.book(book)?;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.book_id == book)
            .cloned()
            .collect();
        sort_reviews(&mut reviews);
        Ok(reviews)
    }

    async fn find_review(&self, book: BookId, creator: UserId) -> StoreResult<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .find(|r| r.book_id == book && r.creator_id == creator)
            .cloned())
    }

    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables.reviews.values().cloned().collect();
        sort_reviews(&mut reviews);
        Ok(reviews)
    }
}
