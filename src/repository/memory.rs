//! In-memory catalog store

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, BookFields},
};

#[derive(Debug, Default)]
struct CatalogData {
    authors: BTreeMap<i64, String>,
    books: BTreeMap<i64, BookFields>,
    /// (book_id, author_id)
    links: BTreeSet<(i64, i64)>,
    last_author_id: i64,
    last_book_id: i64,
}

impl CatalogData {
    fn author(&self, id: i64) -> Option<Author> {
        self.authors.get(&id).map(|full_name| Author {
            id,
            full_name: full_name.clone(),
        })
    }

    fn author_ids_of(&self, book_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.links
            .range((book_id, i64::MIN)..=(book_id, i64::MAX))
            .map(|&(_, author_id)| author_id)
    }

    fn book(&self, id: i64) -> Option<Book> {
        let fields = self.books.get(&id)?;
        Some(Book {
            id,
            title: fields.title.clone(),
            year: fields.year,
            isbn: fields.isbn,
            language: fields.language,
            authors: self
                .author_ids_of(id)
                .filter_map(|author_id| self.author(author_id))
                .collect(),
        })
    }

    fn books_where(&self, mut keep: impl FnMut(i64, &BookFields) -> bool) -> Vec<Book> {
        self.books
            .iter()
            .filter(|(id, fields)| keep(**id, *fields))
            .filter_map(|(id, _)| self.book(*id))
            .collect()
    }

    fn is_linked(&self, book_id: i64, author_id: i64) -> bool {
        self.links.contains(&(book_id, author_id))
    }

    /// Books for which `author_id` is the only author
    fn sole_authored_books(&self, author_id: i64) -> Vec<i64> {
        self.books
            .keys()
            .copied()
            .filter(|&book_id| self.is_linked(book_id, author_id))
            .filter(|&book_id| self.author_ids_of(book_id).all(|id| id == author_id))
            .collect()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Catalog store kept in process memory, used by tests and local runs
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    data: Arc<RwLock<CatalogData>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let data = self.data.read().await;
        Ok(data.authors.keys().filter_map(|&id| data.author(id)).collect())
    }

    async fn search_authors(&self, name: &str) -> AppResult<Vec<Author>> {
        let data = self.data.read().await;
        Ok(data
            .authors
            .iter()
            .filter(|(_, full_name)| contains_ignore_case(full_name, name))
            .filter_map(|(&id, _)| data.author(id))
            .collect())
    }

    async fn get_author(&self, id: i64) -> AppResult<Option<Author>> {
        Ok(self.data.read().await.author(id))
    }

    async fn create_author(&self, full_name: &str) -> AppResult<Author> {
        let mut data = self.data.write().await;
        data.last_author_id += 1;
        let id = data.last_author_id;
        data.authors.insert(id, full_name.to_string());
        Ok(Author {
            id,
            full_name: full_name.to_string(),
        })
    }

    async fn update_author(&self, author: &Author) -> AppResult<Option<Author>> {
        let mut data = self.data.write().await;
        match data.authors.get_mut(&author.id) {
            Some(full_name) => {
                *full_name = author.full_name.clone();
                Ok(Some(author.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_author(&self, id: i64) -> AppResult<bool> {
        let mut data = self.data.write().await;
        if !data.authors.contains_key(&id) {
            return Ok(false);
        }

        let stranded = data.sole_authored_books(id);
        if !stranded.is_empty() {
            return Err(AppError::DeleteConflict(format!(
                "Author {} is the only author of book(s) {:?}",
                id, stranded
            )));
        }

        data.authors.remove(&id);
        data.links.retain(|&(_, author_id)| author_id != id);
        Ok(true)
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.data.read().await.books_where(|_, _| true))
    }

    async fn search_books(&self, title: &str) -> AppResult<Vec<Book>> {
        let data = self.data.read().await;
        Ok(data.books_where(|_, fields| contains_ignore_case(&fields.title, title)))
    }

    async fn books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let data = self.data.read().await;
        Ok(data.books_where(|book_id, _| data.is_linked(book_id, author_id)))
    }

    async fn search_books_by_author(&self, author_id: i64, title: &str) -> AppResult<Vec<Book>> {
        let data = self.data.read().await;
        Ok(data.books_where(|book_id, fields| {
            data.is_linked(book_id, author_id) && contains_ignore_case(&fields.title, title)
        }))
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.data.read().await.book(id))
    }

    async fn create_book(&self, author_id: i64, fields: &BookFields) -> AppResult<Book> {
        let mut data = self.data.write().await;
        if !data.authors.contains_key(&author_id) {
            return Err(AppError::AuthorNotFound(author_id));
        }

        data.last_book_id += 1;
        let id = data.last_book_id;
        data.books.insert(id, fields.clone());
        data.links.insert((id, author_id));

        data.book(id)
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", id)))
    }

    async fn update_book(&self, id: i64, fields: &BookFields) -> AppResult<Option<Book>> {
        let mut data = self.data.write().await;
        match data.books.get_mut(&id) {
            Some(stored) => *stored = fields.clone(),
            None => return Ok(None),
        }
        Ok(data.book(id))
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&id) {
            return Ok(false);
        }
        let authors = data.author_ids_of(id).count();
        if authors > 1 {
            return Err(AppError::DeleteConflict(format!(
                "Book {} has {} authors",
                id, authors
            )));
        }
        data.books.remove(&id);
        data.links.retain(|&(book_id, _)| book_id != id);
        Ok(true)
    }

    async fn add_author_to_book(&self, book_id: i64, author_id: i64) -> AppResult<Option<Book>> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&book_id) {
            return Ok(None);
        }
        if !data.authors.contains_key(&author_id) {
            return Err(AppError::AuthorNotFound(author_id));
        }
        data.links.insert((book_id, author_id));
        Ok(data.book(book_id))
    }
}
