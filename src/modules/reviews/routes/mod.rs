//! HTTP handlers of the reviews module.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use bookrev_db::models::{BookId, Publisher, PublisherId, Review};
use bookrev_db::repository::{Catalog, PublisherRepository};
use bookrev_http::error::AppError;

use super::catalog;
use super::forms::{
    ConfirmedOrder, NewsletterForm, NewsletterSignup, OrderConfirmationForm, OrderForm,
    OrderTotal, PublisherForm, ReviewForm,
};
use super::models::{BookDetail, BookSummary};
use super::search::{self, SearchForm, SearchOutcome};

pub type SharedCatalog = Arc<dyn Catalog>;

type ApiResult<T> = Result<T, AppError>;

pub fn router(catalog: SharedCatalog) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/books", get(list_books))
        .route("/books/{id}", get(get_book))
        .route("/books/{id}/reviews", post(create_review))
        .route("/search", get(search_books))
        .route("/newsletter", post(newsletter))
        .route("/orders", post(order))
        .route("/order-confirmation", post(order_confirmation))
        .route("/publishers", post(create_publisher))
        .route("/publishers/{id}", put(update_publisher))
        .with_state(catalog)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn path_id(path: Result<Path<u64>, PathRejection>) -> ApiResult<u64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn health_check() -> &'static str {
    "reviews module is healthy"
}

async fn list_books(State(catalog): State<SharedCatalog>) -> ApiResult<Json<Vec<BookSummary>>> {
    Ok(Json(catalog::book_summaries(catalog.as_ref()).await?))
}

async fn get_book(
    State(catalog): State<SharedCatalog>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<BookDetail>> {
    let id = BookId(path_id(id)?);
    Ok(Json(catalog::book_detail(catalog.as_ref(), id).await?))
}

async fn create_review(
    State(catalog): State<SharedCatalog>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ReviewForm>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let id = BookId(path_id(id)?);
    let submission = body(payload)?.clean()?;
    let review = catalog::submit_review(catalog.as_ref(), id, submission).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn search_books(
    State(catalog): State<SharedCatalog>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<SearchOutcome>> {
    let Query(pairs) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let request = SearchForm::from_pairs(pairs).clean()?;
    Ok(Json(search::search(catalog.as_ref(), request).await?))
}

async fn newsletter(
    payload: Result<Json<NewsletterForm>, JsonRejection>,
) -> ApiResult<Json<NewsletterSignup>> {
    let signup = body(payload)?.clean()?;
    tracing::info!(
        signup = signup.signup,
        has_email = signup.email.is_some(),
        "newsletter form accepted"
    );
    Ok(Json(signup))
}

async fn order(payload: Result<Json<OrderForm>, JsonRejection>) -> ApiResult<Json<OrderTotal>> {
    let total = body(payload)?.clean()?;
    tracing::info!(total = total.total_sum, "order accepted");
    Ok(Json(total))
}

async fn order_confirmation(
    payload: Result<Json<OrderConfirmationForm>, JsonRejection>,
) -> ApiResult<Json<ConfirmedOrder>> {
    let confirmed = body(payload)?.clean()?;
    tracing::info!(quantity = confirmed.quantity, "order confirmed");
    Ok(Json(confirmed))
}

async fn create_publisher(
    State(catalog): State<SharedCatalog>,
    payload: Result<Json<PublisherForm>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Publisher>)> {
    let new = body(payload)?.clean()?;
    let publisher = catalog.create_publisher(new).await?;
    tracing::info!(publisher_id = %publisher.id, "publisher created");
    Ok((StatusCode::CREATED, Json(publisher)))
}

async fn update_publisher(
    State(catalog): State<SharedCatalog>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<PublisherForm>, JsonRejection>,
) -> ApiResult<Json<Publisher>> {
    let id = PublisherId(path_id(id)?);
    let new = body(payload)?.clean()?;
    let publisher = catalog.update_publisher(id, new).await?;
    tracing::info!(publisher_id = %publisher.id, "publisher updated");
    Ok(Json(publisher))
}
