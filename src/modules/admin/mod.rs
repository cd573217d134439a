//! Read-only administration listings.
//!
//! Titles come from [`AdminSettings`], loaded once at startup and owned by
//! the module.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use bookrev_db::models::{BookId, PublisherId, ReviewId};
use bookrev_db::repository::{
    BookRepository, Catalog, ContributorRepository, PublisherRepository, ReviewRepository,
    StoreResult, UserRepository,
};
use bookrev_db::{BookCondition, BookFilter};
use bookrev_http::error::AppError;
use bookrev_kernel::settings::AdminSettings;
use bookrev_kernel::{InitCtx, Module};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::modules::reviews::routes::SharedCatalog;
use crate::utils::non_blank;

#[derive(Clone)]
struct AdminState {
    settings: Arc<AdminSettings>,
    catalog: SharedCatalog,
}

pub struct AdminModule {
    state: AdminState,
}

impl AdminModule {
    pub fn new(settings: AdminSettings, catalog: SharedCatalog) -> Self {
        Self {
            state: AdminState {
                settings: Arc::new(settings),
                catalog,
            },
        }
    }
}

#[async_trait]
impl Module for AdminModule {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            site_title = %self.state.settings.site_title,
            "admin module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/books", get(list_books))
            .route("/reviews", get(list_reviews))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        let listing = |summary: &str| {
            json!({
                "get": {
                    "summary": summary,
                    "tags": ["Admin"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "application/json": { "schema": { "type": "object" } } }
                        }
                    }
                }
            })
        };
        let mut books = listing("Admin book list");
        books["get"]["parameters"] = json!([
            { "name": "q", "in": "query", "required": false, "schema": { "type": "string" },
              "description": "Substring of title, ISBN or publisher name" },
            { "name": "publisher", "in": "query", "required": false,
              "schema": { "type": "integer" } },
            { "name": "year", "in": "query", "required": false,
              "schema": { "type": "integer" }, "description": "Publication year" }
        ]);

        Some(json!({
            "paths": {
                "/": listing("Admin index"),
                "/books": books,
                "/reviews": listing("Admin review list")
            }
        }))
    }
}

pub fn create_module(settings: AdminSettings, catalog: SharedCatalog) -> Arc<dyn Module> {
    Arc::new(AdminModule::new(settings, catalog))
}

#[derive(Debug, Serialize)]
pub struct AdminIndex {
    pub site_title: String,
    pub site_header: String,
    pub index_title: String,
    pub models: Vec<ModelCount>,
}

#[derive(Debug, Serialize)]
pub struct ModelCount {
    pub name: &'static str,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub publisher: Option<u64>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct BookRow {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub publisher: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub book: String,
    pub creator: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub title: String,
    pub count: usize,
    pub rows: Vec<T>,
}

async fn registered_counts<R: Catalog + ?Sized>(repo: &R) -> StoreResult<Vec<ModelCount>> {
    Ok(vec![
        ModelCount {
            name: "Books",
            count: repo.list_books().await?.len(),
        },
        ModelCount {
            name: "Contributors",
            count: repo.list_contributors().await?.len(),
        },
        ModelCount {
            name: "Reviews",
            count: repo.list_reviews().await?.len(),
        },
        ModelCount {
            name: "Book contributors",
            count: repo.list_book_contributors().await?.len(),
        },
        ModelCount {
            name: "Publishers",
            count: repo.list_publishers().await?.len(),
        },
    ])
}

async fn index(State(state): State<AdminState>) -> Result<Json<AdminIndex>, AppError> {
    let models = registered_counts(state.catalog.as_ref()).await?;
    Ok(Json(AdminIndex {
        site_title: state.settings.site_title.clone(),
        site_header: state.settings.site_header.clone(),
        index_title: state.settings.index_title.clone(),
        models,
    }))
}

/// Book rows matching the admin search box and filters.
pub async fn book_rows<R: Catalog + ?Sized>(
    repo: &R,
    query: BookListQuery,
) -> StoreResult<Vec<BookRow>> {
    let entries = match non_blank(query.q) {
        Some(needle) => {
            let filter = BookFilter::new()
                .or(BookCondition::title_contains(&needle))
                .or(BookCondition::isbn_contains(&needle))
                .or(BookCondition::publisher_name_contains(&needle));
            repo.find_catalog_entries(&filter).await?
        }
        None => repo.list_catalog_entries().await?,
    };

    let publisher = query.publisher.map(PublisherId);
    Ok(entries
        .into_iter()
        .filter(|entry| publisher.map_or(true, |id| entry.book.publisher_id == id))
        .filter(|entry| {
            query
                .year
                .map_or(true, |year| entry.book.publication_date.year() == year)
        })
        .map(|entry| BookRow {
            id: entry.book.id,
            title: entry.book.title,
            isbn: entry.book.isbn,
            publisher: entry.publisher.name,
        })
        .collect())
}

async fn list_books(
    State(state): State<AdminState>,
    query: Result<Query<BookListQuery>, QueryRejection>,
) -> Result<Json<Listing<BookRow>>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let rows = book_rows(state.catalog.as_ref(), query).await?;
    Ok(Json(Listing {
        title: format!("Select book to change | {}", state.settings.site_title),
        count: rows.len(),
        rows,
    }))
}

/// Every review with its book title and creator name, newest first.
pub async fn review_rows<R: Catalog + ?Sized>(repo: &R) -> StoreResult<Vec<ReviewRow>> {
    let reviews = repo.list_reviews().await?;
    let mut rows = Vec::with_capacity(reviews.len());
    for review in reviews {
        let book = repo.get_book(review.book_id).await?;
        let creator = repo.get_user(review.creator_id).await?;
        rows.push(ReviewRow {
            id: review.id,
            book: book.title,
            creator: creator.username,
            content: review.content,
        });
    }
    Ok(rows)
}

async fn list_reviews(
    State(state): State<AdminState>,
) -> Result<Json<Listing<ReviewRow>>, AppError> {
    let rows = review_rows(state.catalog.as_ref()).await?;
    Ok(Json(Listing {
        title: format!("Select review to change | {}", state.settings.site_title),
        count: rows.len(),
        rows,
    }))
}
