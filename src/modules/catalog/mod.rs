pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

pub use error::CatalogError;
pub use service::CatalogService;

/// Book catalog: listing, detail, and admin-gated create/update/delete
pub struct CatalogModule;

impl CatalogModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CatalogModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for CatalogModule {
    fn name(&self) -> &'static str {
        "catalog"
    }

    // Catalog paths (/api/book, /api/add_book) sit directly under /api
    fn mount_path(&self) -> String {
        "/api".to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            admin_tokens = ctx.settings.auth.admin_tokens.len(),
            "catalog module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(CatalogService::new(ctx.db.clone(), ctx.gate.clone()))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = json!({
            "description": "Error",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let message_response = json!({
            "description": "OK",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Message" }
                }
            }
        });
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let form_body = json!({
            "required": true,
            "content": {
                "application/x-www-form-urlencoded": {
                    "schema": { "$ref": "#/components/schemas/BookForm" }
                }
            }
        });
        let admin = json!([{ "bearerAuth": [] }]);

        Some(json!({
            "paths": {
                "/book": {
                    "get": {
                        "summary": "List reviewed books by average rating",
                        "tags": ["Catalog"],
                        "responses": {
                            "200": {
                                "description": "Books with at least one review, best rated first",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error_response
                        }
                    }
                },
                "/book/{id}": {
                    "get": {
                        "summary": "Get a book with its genres",
                        "tags": ["Catalog"],
                        "parameters": [id_param],
                        "responses": {
                            "200": {
                                "description": "Book detail",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookDetail" }
                                    }
                                }
                            },
                            "404": error_response,
                            "500": error_response
                        }
                    }
                },
                "/add_book": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Catalog"],
                        "security": admin,
                        "requestBody": form_body,
                        "responses": {
                            "201": {
                                "description": "Created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookCreated" }
                                    }
                                }
                            },
                            "400": error_response,
                            "403": error_response,
                            "500": error_response
                        }
                    }
                },
                "/book/{id}/update": {
                    "put": {
                        "summary": "Replace a book's title, author, and genres",
                        "tags": ["Catalog"],
                        "security": admin,
                        "parameters": [id_param],
                        "requestBody": form_body,
                        "responses": {
                            "200": message_response,
                            "400": error_response,
                            "403": error_response,
                            "500": error_response
                        }
                    }
                },
                "/book/{id}/delete": {
                    "delete": {
                        "summary": "Delete a book and its genre links",
                        "tags": ["Catalog"],
                        "security": admin,
                        "parameters": [id_param],
                        "responses": {
                            "200": message_response,
                            "403": error_response,
                            "500": error_response
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "bookID": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "average_rating": { "type": ["number", "null"] }
                        },
                        "required": ["bookID", "title", "author", "average_rating"]
                    },
                    "BookDetail": {
                        "allOf": [
                            { "$ref": "#/components/schemas/Book" },
                            {
                                "type": "object",
                                "properties": {
                                    "genres": { "type": "array", "items": { "type": "string" } }
                                },
                                "required": ["genres"]
                            }
                        ]
                    },
                    "BookForm": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genres": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["title", "author"]
                    },
                    "BookCreated": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "bookID": { "type": "integer", "format": "int64" }
                        },
                        "required": ["message", "bookID"]
                    },
                    "Message": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                        "required": ["message"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        // No FK cascade: deleting a book removes its genre links explicitly
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    bookID INTEGER PRIMARY KEY AUTOINCREMENT,
                    title  TEXT NOT NULL CHECK (title <> ''),
                    author TEXT NOT NULL CHECK (author <> '')
                );
                CREATE TABLE IF NOT EXISTS reviews (
                    reviewID INTEGER PRIMARY KEY AUTOINCREMENT,
                    book     INTEGER NOT NULL,
                    rating   REAL NOT NULL,
                    reviewer TEXT,
                    body     TEXT
                );
                CREATE INDEX IF NOT EXISTS reviews_book ON reviews (book);
                CREATE TABLE IF NOT EXISTS book_genre (
                    book  INTEGER NOT NULL,
                    genre TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS book_genre_book ON book_genre (book);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module stopped");
        Ok(())
    }
}

/// Create a new instance of the catalog module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CatalogModule::new())
}
