pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod validation;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use axum::Router;
use once_cell::sync::OnceCell;
use serde_json::json;
use shelf_kernel::{InitCtx, Migration, Module};

pub use error::{BookError, FieldError};
pub use models::{Book, BookForm};
pub use service::BookService;

use routes::BooksState;

/// Book catalog module: listing, CRUD pages and the admin view.
#[derive(Default)]
pub struct BooksModule {
    state: OnceCell<BooksState>,
}

impl BooksModule {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let state = BooksState {
            service: BookService::new(ctx.db.clone()),
            renderer: Arc::new(crate::views::renderer()?),
        };
        self.state
            .set(state)
            .map_err(|_| anyhow!("books module initialized twice"))?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> anyhow::Result<Router> {
        let state = self
            .state
            .get()
            .cloned()
            .context("books module routes requested before init")?;
        Ok(routes::router(state))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_book",
            up: repository::MIGRATION_CREATE_BOOK,
        }]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let html = |description: &str| {
            json!({
                "description": description,
                "content": { "text/html": { "schema": { "type": "string" } } }
            })
        };
        let redirect = json!({ "description": "Redirect to the listing" });
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        }]);
        let form_body = json!({
            "required": true,
            "content": {
                "application/x-www-form-urlencoded": {
                    "schema": { "$ref": "#/components/schemas/BookForm" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "Book listing with an empty new-book form",
                        "tags": ["Books"],
                        "responses": { "200": html("Listing page") }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": form_body,
                        "responses": {
                            "303": redirect,
                            "200": html("Listing page with validation errors")
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Listing with the book loaded into the form",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": { "200": html("Listing page") }
                    },
                    "put": {
                        "summary": "Update a book at the submitted version",
                        "description": "Sent as POST with _method=put from HTML forms.",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "requestBody": form_body,
                        "responses": {
                            "303": redirect,
                            "200": html("Listing page with an error message")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "description": "Sent as POST with _method=delete from HTML forms.",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "303": redirect,
                            "200": html("Listing page with an error message")
                        }
                    }
                },
                "/admin": {
                    "get": {
                        "summary": "Administrator view of the listing",
                        "tags": ["Books"],
                        "responses": {
                            "200": html("Admin page"),
                            "403": html("Access denied")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookForm": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": 30 },
                            "author": { "type": "string", "maxLength": 20 },
                            "newBook": { "type": "boolean" },
                            "version": { "type": "integer", "format": "int64" }
                        },
                        "required": ["title", "author"]
                    }
                }
            }
        }))
    }
}
