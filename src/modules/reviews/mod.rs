//! Reviews module: the book catalog, reviews and ratings, search, and the
//! newsletter and order forms.

pub mod catalog;
pub mod forms;
pub mod models;
pub mod rating;
pub mod routes;
pub mod search;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookrev_kernel::{InitCtx, Module};
use serde_json::{json, Value};

use routes::SharedCatalog;

pub struct ReviewsModule {
    catalog: SharedCatalog,
}

impl ReviewsModule {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "reviews module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

pub fn create_module(catalog: SharedCatalog) -> Arc<dyn Module> {
    Arc::new(ReviewsModule::new(catalog))
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> Value {
    json_response(
        description,
        json!({ "$ref": "#/components/schemas/ErrorResponse" }),
    )
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn form_post(summary: &str, input: &str, output: &str, created: bool) -> Value {
    let status = if created { "201" } else { "200" };
    let mut item = json!({
        "post": {
            "summary": summary,
            "tags": ["Reviews"],
            "requestBody": {
                "required": true,
                "content": { "application/json": { "schema": schema_ref(input) } }
            },
            "responses": {
                "400": error_response("Malformed body"),
                "422": error_response("Validation failed")
            }
        }
    });
    item["post"]["responses"][status] = json_response("Accepted", schema_ref(output));
    item
}

fn id_parameter(description: &str) -> Value {
    json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": "integer", "format": "int64" }
    }])
}

fn openapi_fragment() -> Value {
    let mut create_review = form_post("Review a book", "ReviewForm", "Review", true);
    create_review["post"]["parameters"] = id_parameter("Book id");
    create_review["post"]["responses"]["404"] = error_response("Book not found");
    create_review["post"]["responses"]["409"] =
        error_response("The creator already reviewed this book");

    let mut update_publisher = form_post("Update a publisher", "PublisherForm", "Publisher", false);
    update_publisher["put"] = update_publisher["post"].take();
    if let Some(item) = update_publisher.as_object_mut() {
        item.remove("post");
    }
    update_publisher["put"]["parameters"] = id_parameter("Publisher id");
    update_publisher["put"]["responses"]["404"] = error_response("Publisher not found");

    json!({
        "paths": {
            "/health": {
                "get": {
                    "summary": "Reviews health check",
                    "tags": ["Reviews"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            },
            "/books": {
                "get": {
                    "summary": "List books with their average rating",
                    "tags": ["Reviews"],
                    "responses": {
                        "200": json_response(
                            "Every book, newest first",
                            json!({ "type": "array", "items": schema_ref("BookSummary") })
                        )
                    }
                }
            },
            "/books/{id}": {
                "get": {
                    "summary": "Book detail with reviews",
                    "tags": ["Reviews"],
                    "parameters": id_parameter("Book id"),
                    "responses": {
                        "200": json_response("The book", schema_ref("BookDetail")),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/books/{id}/reviews": create_review,
            "/search": {
                "get": {
                    "summary": "Search books",
                    "tags": ["Reviews"],
                    "parameters": [
                        {
                            "name": "search",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string" }
                        },
                        {
                            "name": "search_book_by",
                            "in": "query",
                            "required": false,
                            "description": "Fields to search: title, isbn, publisher, contributor. Repeat the parameter or give a comma-separated list",
                            "style": "form",
                            "explode": true,
                            "schema": { "type": "array", "items": { "type": "string" } }
                        }
                    ],
                    "responses": {
                        "200": json_response("Results or a prompt", schema_ref("SearchOutcome")),
                        "422": error_response("Unknown search field")
                    }
                }
            },
            "/newsletter": form_post("Newsletter signup", "NewsletterForm", "NewsletterForm", false),
            "/orders": form_post("Order two items", "OrderForm", "OrderTotal", false),
            "/order-confirmation": form_post(
                "Confirm an order",
                "OrderConfirmationForm",
                "OrderConfirmation",
                false
            ),
            "/publishers": form_post("Create a publisher", "PublisherForm", "Publisher", true),
            "/publishers/{id}": update_publisher
        },
        "components": {
            "schemas": {
                "Publisher": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "name": { "type": "string", "maxLength": 50 },
                        "website": { "type": "string", "format": "uri" },
                        "email": { "type": "string", "format": "email" }
                    },
                    "required": ["id", "name", "website", "email"]
                },
                "PublisherForm": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "maxLength": 50 },
                        "website": { "type": "string", "format": "uri" },
                        "email": { "type": "string", "format": "email" }
                    },
                    "required": ["name", "website", "email"]
                },
                "BookSummary": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "isbn": { "type": "string" },
                        "publication_date": { "type": "string", "format": "date" },
                        "publisher": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "integer" },
                                "name": { "type": "string" }
                            }
                        },
                        "rating": { "type": "number", "nullable": true },
                        "number_of_reviews": { "type": "integer" }
                    }
                },
                "BookDetail": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "isbn": { "type": "string" },
                        "publication_date": { "type": "string", "format": "date" },
                        "publisher": schema_ref("Publisher"),
                        "contributors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "integer" },
                                    "first_names": { "type": "string" },
                                    "last_names": { "type": "string" },
                                    "email": { "type": "string" },
                                    "role": { "type": "string", "enum": ["AUTHOR", "CO_AUTHOR", "EDITOR"] }
                                }
                            }
                        },
                        "rating": { "type": "number", "nullable": true },
                        "reviews": { "type": "array", "items": schema_ref("Review") }
                    }
                },
                "Review": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "book_id": { "type": "integer" },
                        "content": { "type": "string" },
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "date_created": { "type": "string", "format": "date-time" },
                        "date_edited": { "type": "string", "format": "date-time" }
                    }
                },
                "ReviewForm": {
                    "type": "object",
                    "properties": {
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "content": { "type": "string" },
                        "creator_email": { "type": "string", "format": "email" },
                        "creator_name": { "type": "string" }
                    },
                    "required": ["rating", "creator_email"]
                },
                "SearchOutcome": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string", "enum": ["results", "prompt"] },
                        "query": { "type": "string" },
                        "fields": { "type": "array", "items": { "type": "string" } },
                        "results": { "type": "array", "items": schema_ref("BookDetail") },
                        "message": { "type": "string" }
                    },
                    "required": ["status"]
                },
                "NewsletterForm": {
                    "type": "object",
                    "properties": {
                        "signup": { "type": "boolean" },
                        "email": { "type": "string", "format": "email", "nullable": true }
                    }
                },
                "OrderForm": {
                    "type": "object",
                    "properties": {
                        "item_a": { "type": "integer", "minimum": 0, "maximum": 100 },
                        "item_b": { "type": "integer", "minimum": 0, "maximum": 100 }
                    },
                    "required": ["item_a", "item_b"]
                },
                "OrderTotal": {
                    "type": "object",
                    "properties": {
                        "item_a": { "type": "integer" },
                        "item_b": { "type": "integer" },
                        "total_sum": { "type": "integer", "maximum": 100 }
                    }
                },
                "OrderConfirmationForm": {
                    "type": "object",
                    "properties": {
                        "quantity": { "type": "integer", "minimum": 0, "maximum": 100 },
                        "signup": { "type": "boolean" },
                        "email": { "type": "string", "format": "email", "nullable": true }
                    },
                    "required": ["quantity"]
                },
                "OrderConfirmation": {
                    "type": "object",
                    "properties": {
                        "quantity": { "type": "integer" },
                        "email": { "type": "string", "nullable": true }
                    }
                }
            }
        }
    })
}
