pub mod models;
pub mod routes;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use shelf_db::Db;
use shelf_kernel::{InitCtx, Migration, Module};

use store::BookStore;

/// Schema for the books table and its full-text index. Triggers keep the
/// FTS vector (id, title, author, publication year) in sync with the base
/// table, so store operations stay single-statement.
pub const BOOKS_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id               TEXT PRIMARY KEY,
    cover_url        TEXT NOT NULL,
    isbn             TEXT NOT NULL,
    title            TEXT NOT NULL,
    author           TEXT NOT NULL,
    publication_year TEXT NOT NULL,
    created_at       INTEGER NOT NULL,
    updated_at       INTEGER,
    deleted_at       INTEGER
);

CREATE VIRTUAL TABLE IF NOT EXISTS books_fts USING fts5(book_id UNINDEXED, search_vector);

CREATE TRIGGER IF NOT EXISTS books_fts_insert AFTER INSERT ON books BEGIN
    INSERT INTO books_fts (book_id, search_vector)
    VALUES (new.id, new.id || ' ' || new.title || ' ' || new.author || ' ' || new.publication_year);
END;

CREATE TRIGGER IF NOT EXISTS books_fts_update
AFTER UPDATE OF title, author, publication_year ON books BEGIN
    UPDATE books_fts
    SET search_vector = new.id || ' ' || new.title || ' ' || new.author || ' ' || new.publication_year
    WHERE book_id = new.id;
END;
"#;

/// Books module: CRUD over the book catalog.
pub struct BooksModule {
    store: BookStore,
}

impl BooksModule {
    pub fn new(db: Db) -> Self {
        Self {
            store: BookStore::new(db),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: BOOKS_MIGRATION,
        }]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/book": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Created" },
                            "400": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer" } },
                            { "name": "pageSize", "in": "query", "schema": { "type": "integer" } },
                            { "name": "search", "in": "query", "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Page of books plus total page count",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "books": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/Book" }
                                                },
                                                "totalPage": { "type": "integer" }
                                            }
                                        }
                                    }
                                }
                            },
                            "404": { "description": "No books matched" }
                        }
                    }
                },
                "/book/{id}": {
                    "get": {
                        "summary": "Get a book by id",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "book": { "$ref": "#/components/schemas/Book" }
                                            }
                                        }
                                    }
                                }
                            },
                            "400": { "description": "Malformed id" },
                            "404": { "description": "Book not found" }
                        }
                    },
                    "put": {
                        "summary": "Update a book by id",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }
                        ],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "204": { "description": "Updated" },
                            "400": { "description": "Validation error" },
                            "404": { "description": "Book not found" }
                        }
                    },
                    "delete": {
                        "summary": "Soft-delete a book by id",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }
                        ],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "400": { "description": "Malformed id" },
                            "404": { "description": "Book not found" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "coverUrl": { "type": "string", "format": "uri" },
                            "isbn": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "publicationYear": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" },
                            "deletedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "coverUrl", "isbn", "title", "author", "publicationYear", "createdAt"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "coverUrl": { "type": "string", "format": "uri" },
                            "isbn": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "publicationYear": { "type": "string" }
                        },
                        "required": ["coverUrl", "isbn", "title", "author", "publicationYear"]
                    }
                }
            }
        }))
    }
}

/// Create a new instance of the books module.
pub fn create_module(db: Db) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(db))
}
