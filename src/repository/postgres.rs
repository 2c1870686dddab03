//! PostgreSQL catalog store

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, BookFields, Language},
};

const BOOK_COLUMNS: &str = "b.id, b.title, b.year, b.isbn, b.language";

/// Book row without its authors
#[derive(Debug, FromRow)]
struct BookRow {
    id: i64,
    title: String,
    year: i32,
    isbn: i64,
    language: String,
}

/// Build an ILIKE pattern matching `query` anywhere, with wildcards escaped
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<Postgres>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Attach authors to book rows, keeping row order
    async fn with_authors(&self, rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, (i64, i64, String)>(
            r#"
            SELECT ba.book_id, a.id, a.full_name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.id
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut authors_by_book: HashMap<i64, Vec<Author>> = HashMap::new();
        for (book_id, id, full_name) in links {
            authors_by_book
                .entry(book_id)
                .or_default()
                .push(Author { id, full_name });
        }

        rows.into_iter()
            .map(|row| {
                let language = row
                    .language
                    .parse::<Language>()
                    .map_err(AppError::Internal)?;
                Ok(Book {
                    authors: authors_by_book.remove(&row.id).unwrap_or_default(),
                    id: row.id,
                    title: row.title,
                    year: row.year,
                    isbn: row.isbn,
                    language,
                })
            })
            .collect()
    }

    async fn book_rows(
        &self,
        filter: &str,
        author_id: Option<i64>,
        title: Option<&str>,
    ) -> AppResult<Vec<Book>> {
        let query = format!(
            "SELECT DISTINCT {} FROM books b LEFT JOIN book_authors ba ON ba.book_id = b.id {} ORDER BY b.id",
            BOOK_COLUMNS, filter
        );
        let mut builder = sqlx::query_as::<_, BookRow>(&query);
        if let Some(author_id) = author_id {
            builder = builder.bind(author_id);
        }
        if let Some(title) = title {
            builder = builder.bind(like_pattern(title));
        }
        let rows = builder.fetch_all(&self.pool).await?;
        self.with_authors(rows).await
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, Author>("SELECT id, full_name FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn search_authors(&self, name: &str) -> AppResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, Author>(
            r#"SELECT id, full_name FROM authors WHERE full_name ILIKE $1 ESCAPE '\' ORDER BY id"#,
        )
        .bind(like_pattern(name))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_author(&self, id: i64) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, Author>("SELECT id, full_name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_author(&self, full_name: &str) -> AppResult<Author> {
        let row = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (full_name) VALUES ($1) RETURNING id, full_name",
        )
        .bind(full_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_author(&self, author: &Author) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, Author>(
            "UPDATE authors SET full_name = $2 WHERE id = $1 RETURNING id, full_name",
        )
        .bind(author.id)
        .bind(&author.full_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_author(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Lock the author's books so a concurrent unlink cannot slip between check and delete
        sqlx::query(
            r#"
            SELECT b.id FROM books b
            JOIN book_authors ba ON ba.book_id = b.id
            WHERE ba.author_id = $1
            FOR UPDATE OF b
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let stranded: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT ba.book_id FROM book_authors ba
            WHERE ba.author_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM book_authors other
                  WHERE other.book_id = ba.book_id AND other.author_id <> $1
              )
            ORDER BY ba.book_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !stranded.is_empty() {
            tx.rollback().await?;
            return Err(AppError::DeleteConflict(format!(
                "Author {} is the only author of book(s) {:?}",
                id, stranded
            )));
        }

        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.book_rows("", None, None).await
    }

    async fn search_books(&self, title: &str) -> AppResult<Vec<Book>> {
        self.book_rows(r#"WHERE b.title ILIKE $1 ESCAPE '\'"#, None, Some(title))
            .await
    }

    async fn books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        self.book_rows("WHERE ba.author_id = $1", Some(author_id), None)
            .await
    }

    async fn search_books_by_author(&self, author_id: i64, title: &str) -> AppResult<Vec<Book>> {
        self.book_rows(
            r#"WHERE ba.author_id = $1 AND b.title ILIKE $2 ESCAPE '\'"#,
            Some(author_id),
            Some(title),
        )
        .await
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(
            "SELECT id, title, year, isbn, language FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_authors(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_book(&self, author_id: i64, fields: &BookFields) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, year, isbn, language)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(fields.year)
        .bind(fields.isbn)
        .bind(fields.language.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
            .bind(id)
            .bind(author_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::AuthorNotFound(author_id)
                } else {
                    AppError::Database(e)
                }
            })?;

        tx.commit().await?;

        self.get_book(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", id)))
    }

    async fn update_book(&self, id: i64, fields: &BookFields) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books SET title = $2, year = $3, isbn = $4, language = $5
            WHERE id = $1
            RETURNING id, title, year, isbn, language
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(fields.year)
        .bind(fields.isbn)
        .bind(fields.language.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_authors(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Blocks new links to this book until commit
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        let authors: i64 =
            sqlx::query_scalar("SELECT count(*) FROM book_authors WHERE book_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if authors > 1 {
            tx.rollback().await?;
            return Err(AppError::DeleteConflict(format!(
                "Book {} has {} authors",
                id, authors
            )));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_author_to_book(&self, book_id: i64, author_id: i64) -> AppResult<Option<Book>> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO book_authors (book_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(author_id)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => self.get_book(book_id).await,
            Err(e) if is_foreign_key_violation(&e) => {
                if self.get_book(book_id).await?.is_none() {
                    Ok(None)
                } else {
                    Err(AppError::AuthorNotFound(author_id))
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
