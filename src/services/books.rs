//! Book management service

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookDto},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All books, or those whose title contains `query`
    pub async fn list(&self, query: Option<&str>) -> AppResult<Vec<Book>> {
        match query {
            Some(title) => self.repository.search_books(title).await,
            None => self.repository.list_books().await,
        }
    }

    pub async fn get(&self, id: i64) -> AppResult<Book> {
        self.repository
            .get_book(id)
            .await?
            .ok_or(AppError::BookNotFound(id))
    }

    /// Create a book written by `author_id`.
    /// Fields are validated before the author is looked up.
    pub async fn create(&self, author_id: i64, book: BookDto) -> AppResult<Book> {
        let fields = book.into_fields()?;

        if self.repository.get_author(author_id).await?.is_none() {
            return Err(AppError::AuthorNotFound(author_id));
        }

        let created = self.repository.create_book(author_id, &fields).await?;
        tracing::info!("Created book id={} for author id={}", created.id, author_id);
        Ok(created)
    }

    /// Replace title, year, ISBN and language; authors are left untouched
    pub async fn update(&self, id: i64, book: BookDto) -> AppResult<Book> {
        if book.id != Some(id) {
            return Err(AppError::BadRequest(format!(
                "Book id {:?} does not match path id {}",
                book.id, id
            )));
        }
        let fields = book.into_fields()?;

        let updated = self
            .repository
            .update_book(id, &fields)
            .await?
            .ok_or(AppError::BookNotFound(id))?;
        tracing::info!("Updated book id={}", id);
        Ok(updated)
    }

    /// Delete a book; books with several authors must be unlinked first
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let book = self.get(id).await?;

        if book.authors.len() > 1 {
            tracing::warn!(
                "Refusing to delete book id={}: it has {} authors",
                id,
                book.authors.len()
            );
            return Err(AppError::BadRequest(format!(
                "Book {} has {} authors and cannot be deleted",
                id,
                book.authors.len()
            )));
        }

        if !self.repository.delete_book(id).await? {
            return Err(AppError::BookNotFound(id));
        }
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }

    /// Link an existing author to an existing book
    pub async fn add_author(&self, book_id: i64, author_id: i64) -> AppResult<Book> {
        let book = self.get(book_id).await?;
        if self.repository.get_author(author_id).await?.is_none() {
            return Err(AppError::AuthorNotFound(author_id));
        }
        if book.has_author(author_id) {
            return Ok(book);
        }

        let updated = self
            .repository
            .add_author_to_book(book_id, author_id)
            .await?
            .ok_or(AppError::BookNotFound(book_id))?;
        tracing::info!("Linked author id={} to book id={}", author_id, book_id);
        Ok(updated)
    }
}
