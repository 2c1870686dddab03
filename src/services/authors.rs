//! Author management service

use crate::{
    error::{AppError, AppResult},
    models::{Author, AuthorDto, Book},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All authors, or those whose name contains `query`
    pub async fn list(&self, query: Option<&str>) -> AppResult<Vec<Author>> {
        match query {
            Some(name) => self.repository.search_authors(name).await,
            None => self.repository.list_authors().await,
        }
    }

    pub async fn get(&self, id: i64) -> AppResult<Author> {
        self.repository
            .get_author(id)
            .await?
            .ok_or(AppError::AuthorNotFound(id))
    }

    /// Create an author; the payload id is ignored
    pub async fn create(&self, author: &AuthorDto) -> AppResult<Author> {
        let name = author
            .normalized_name()
            .ok_or_else(|| AppError::BadRequest("Author name must not be blank".to_string()))?;

        let created = self.repository.create_author(name).await?;
        tracing::info!("Created author id={}", created.id);
        Ok(created)
    }

    /// Replace the mutable fields of an existing author
    pub async fn update(&self, id: i64, author: &AuthorDto) -> AppResult<Author> {
        if author.id != Some(id) {
            return Err(AppError::BadRequest(format!(
                "Author id {:?} does not match path id {}",
                author.id, id
            )));
        }
        let name = author
            .normalized_name()
            .ok_or_else(|| AppError::BadRequest("Author name must not be blank".to_string()))?;

        let updated = self
            .repository
            .update_author(&Author {
                id,
                full_name: name.to_string(),
            })
            .await?
            .ok_or(AppError::AuthorNotFound(id))?;
        tracing::info!("Updated author id={}", id);
        Ok(updated)
    }

    /// Delete an author unless it is the last author of one of its books
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.get(id).await?;

        let books = self.repository.books_by_author(id).await?;
        if let Some(book) = books.iter().find(|b| b.remaining_authors_without(id) == 0) {
            tracing::warn!(
                "Refusing to delete author id={}: sole author of book id={}",
                id,
                book.id
            );
            return Err(AppError::BadRequest(format!(
                "Author {} is the only author of book {}",
                id, book.id
            )));
        }

        if !self.repository.delete_author(id).await? {
            return Err(AppError::AuthorNotFound(id));
        }
        tracing::info!("Deleted author id={}", id);
        Ok(())
    }

    /// Books written by an author, optionally filtered by title
    pub async fn books(&self, id: i64, query: Option<&str>) -> AppResult<Vec<Book>> {
        self.get(id).await?;

        match query {
            Some(title) => self.repository.search_books_by_author(id, title).await,
            None => self.repository.books_by_author(id).await,
        }
    }
}
