//! Entity store for authors, books and the authorship join

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::{DatabaseConfig, StoreBackend},
    error::{AppError, AppResult},
    models::{Author, Book, BookFields},
};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Persistence operations over the catalog.
///
/// Lookups return `Ok(None)` (or `Ok(false)` for deletes) when the id is
/// absent; callers decide which error that becomes. Searches are
/// case-insensitive substring matches. Every implementation refuses an
/// author delete that would leave a book without authors, and a book delete
/// while the book has several authors, with [`AppError::DeleteConflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;

    async fn list_authors(&self) -> AppResult<Vec<Author>>;
    async fn search_authors(&self, name: &str) -> AppResult<Vec<Author>>;
    async fn get_author(&self, id: i64) -> AppResult<Option<Author>>;
    async fn create_author(&self, full_name: &str) -> AppResult<Author>;
    async fn update_author(&self, author: &Author) -> AppResult<Option<Author>>;
    async fn delete_author(&self, id: i64) -> AppResult<bool>;

    async fn list_books(&self) -> AppResult<Vec<Book>>;
    async fn search_books(&self, title: &str) -> AppResult<Vec<Book>>;
    async fn books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>>;
    async fn search_books_by_author(&self, author_id: i64, title: &str) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i64) -> AppResult<Option<Book>>;
    /// Insert a book linked to a single existing author
    async fn create_book(&self, author_id: i64, fields: &BookFields) -> AppResult<Book>;
    async fn update_book(&self, id: i64, fields: &BookFields) -> AppResult<Option<Book>>;
    async fn delete_book(&self, id: i64) -> AppResult<bool>;
    /// Link an author to a book; linking twice is a no-op
    async fn add_author_to_book(&self, book_id: i64, author_id: i64) -> AppResult<Option<Book>>;
}

/// Shared handle on the configured store
pub type Repository = Arc<dyn CatalogStore>;

/// Build the store selected by configuration, running migrations for PostgreSQL
pub async fn connect(config: &DatabaseConfig) -> AppResult<Repository> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory catalog store, data will not survive a restart");
            Ok(Arc::new(MemoryCatalogStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .connect(&config.url)
                .await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
            tracing::info!("Database migrations completed");

            Ok(Arc::new(PgCatalogStore::new(pool)))
        }
    }
}

