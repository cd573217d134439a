use std::path::PathBuf;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use bookrev_app::build_registry;
use bookrev_db::MemoryStore;
use bookrev_kernel::{settings::Settings, InitCtx};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let mut settings = Settings::default();
    settings.database.seed_csv =
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample.csv"));

    let registry = build_registry(MemoryStore::new(), &settings);
    registry
        .init_all(&InitCtx {
            settings: &settings,
        })
        .await
        .unwrap();
    bookrev_http::build_router(&registry, &settings)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

async fn book_id(app: &Router, title: &str) -> u64 {
    let (_, books) = get(app, "/api/reviews/books").await;
    books
        .as_array()
        .unwrap()
        .iter()
        .find(|book| book["title"] == title)
        .and_then(|book| book["id"].as_u64())
        .unwrap()
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::get("/api/reviews/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn book_list_carries_ratings() {
    let app = app().await;
    let (status, books) = get(&app, "/api/reviews/books").await;
    assert_eq!(status, StatusCode::OK);

    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 4);
    // Newest first.
    assert_eq!(books[0]["title"], "Programming Rust");

    let keras = books
        .iter()
        .find(|b| b["title"] == "Advanced Deep Learning with Keras")
        .unwrap();
    assert_eq!(keras["rating"], 3.5);
    assert_eq!(keras["number_of_reviews"], 2);

    let potter = books
        .iter()
        .find(|b| b["isbn"] == "9780747532699")
        .unwrap();
    assert!(potter["rating"].is_null());
    assert_eq!(potter["number_of_reviews"], 0);
}

#[tokio::test]
async fn book_detail_and_missing_book() {
    let app = app().await;
    let id = book_id(&app, "Web Development with Django").await;

    let (status, detail) = get(&app, &format!("/api/reviews/books/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["publisher"]["name"], "Packt Publishing");
    assert_eq!(detail["contributors"].as_array().unwrap().len(), 2);
    assert_eq!(detail["reviews"][0]["creator_email"], "reader@example.com");
    assert_eq!(detail["rating"], 5.0);

    let (status, body) = get(&app, "/api/reviews/books/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = get(&app, "/api/reviews/books/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn search_matches_any_selected_field() {
    let app = app().await;

    let (status, body) = get(
        &app,
        "/api/reviews/search?search=packt&search_book_by=publisher",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "results");
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let (_, body) = get(
        &app,
        "/api/reviews/search?search=ROWLING&search_book_by=title,contributor",
    )
    .await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["isbn"], "9780747532699");

    let (status, body) = get(
        &app,
        "/api/reviews/search?search=rowling&search_book_by=title&search_book_by=contributor",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fields"], json!(["title", "contributor"]));
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let (_, body) = get(&app, "/api/reviews/search?search=rust&search_book_by=isbn").await;
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_without_term_prompts() {
    let app = app().await;
    for uri in [
        "/api/reviews/search",
        "/api/reviews/search?search=%20%20&search_book_by=title",
        "/api/reviews/search?search=rust",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "prompt");
        assert_eq!(
            body["message"],
            "Please enter a search term and select search criteria"
        );
    }
}

#[tokio::test]
async fn search_rejects_unknown_field() {
    let app = app().await;
    let (status, body) = get(&app, "/api/reviews/search?search=rust&search_book_by=genre").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "search_book_by");
}

#[tokio::test]
async fn order_total_is_capped() {
    let app = app().await;

    let (status, body) = post(&app, "/api/reviews/orders", json!({"item_a": 50, "item_b": 50})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sum"], 100);

    let (status, body) = post(&app, "/api/reviews/orders", json!({"item_a": 60, "item_b": 50})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["details"][0]["field"].is_null());
    assert_eq!(
        body["error"]["details"][0]["error"],
        "The total quantity of Item A (60) and Item B (50) is 110, which exceeds the maximum allowed total of 100."
    );

    let (status, body) = post(&app, "/api/reviews/orders", json!({"item_b": 5})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "item_a");
}

#[tokio::test]
async fn newsletter_and_confirmation_rules() {
    let app = app().await;

    let (status, body) = post(&app, "/api/reviews/newsletter", json!({"signup": true})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "email");

    let (status, _) = post(
        &app,
        "/api/reviews/newsletter",
        json!({"signup": true, "email": "reader@example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/api/reviews/order-confirmation",
        json!({"quantity": 1, "email": "reader@example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"]["details"][0]["error"],
        "please check the box before providing an email"
    );

    let (status, body) = post(
        &app,
        "/api/reviews/order-confirmation",
        json!({"quantity": 1, "signup": true, "email": "reader@example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 1);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app().await;
    let response = app
        .oneshot(
            Request::post("/api/reviews/orders")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_once_per_user() {
    let app = app().await;
    let id = book_id(&app, "Programming Rust").await;
    let uri = format!("/api/reviews/books/{id}/reviews");
    let review = json!({
        "rating": 4,
        "content": "Solid reference",
        "creator_email": "newcomer@example.com"
    });

    let (status, body) = post(&app, &uri, review.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rating"], 4);

    let (status, body) = post(&app, &uri, review).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"][0]["constraint"], "unique_book_creator");

    let (status, _) = post(
        &app,
        &uri,
        json!({"rating": 9, "creator_email": "other@example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &app,
        "/api/reviews/books/999999/reviews",
        json!({"rating": 3, "creator_email": "other@example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publisher_create_and_update() {
    let app = app().await;

    let (status, body) = post(
        &app,
        "/api/reviews/publishers",
        json!({"name": "", "website": "nope", "email": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);

    let (status, created) = post(
        &app,
        "/api/reviews/publishers",
        json!({
            "name": "No Starch Press",
            "website": "https://nostarch.com",
            "email": "info@nostarch.com"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_u64().unwrap();

    let update = json!({
        "name": "No Starch",
        "website": "https://nostarch.com",
        "email": "info@nostarch.com"
    });
    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/reviews/publishers/{id}"),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "No Starch");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/reviews/publishers/999999",
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_listings() {
    let app = app().await;

    let (status, index) = get(&app, "/api/admin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(index["site_title"], "BookRev Admin");
    assert_eq!(index["index_title"], "BookRev Site Administration");
    let books = index["models"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "Books")
        .unwrap();
    assert_eq!(books["count"], 4);

    let (status, listing) = get(&app, "/api/admin/books?q=packt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 2);

    let (_, listing) = get(&app, "/api/admin/reviews").await;
    assert_eq!(listing["count"], 4);
    assert!(listing["rows"][0]["book"].is_string());
}

#[tokio::test]
async fn openapi_document_is_merged() {
    let app = app().await;
    let (status, doc) = get(&app, "/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/reviews/search"]["get"].is_object());
    assert!(doc["paths"]["/api/admin/books"]["get"].is_object());
    assert!(doc["components"]["schemas"]["ErrorResponse"].is_object());
}
