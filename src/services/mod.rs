//! Business logic services

pub mod authors;
pub mod books;

use crate::{error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub authors: authors::AuthorsService,
    pub books: books::BooksService,
    repository: Repository,
}

impl Services {
    /// Create all services over the given store
    pub fn new(repository: Repository) -> Self {
        Self {
            authors: authors::AuthorsService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            repository,
        }
    }

    /// Check the store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
