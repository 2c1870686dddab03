//! Book model, its wire representation and field validation

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDto},
        enums::Language,
    },
};

pub const MIN_YEAR: i32 = -9999;
pub const MAX_YEAR: i32 = 9999;
/// Smallest 10-digit ISBN
pub const MIN_ISBN: i64 = 1_000_000_000;
/// Largest 13-digit ISBN
pub const MAX_ISBN: i64 = 9_999_999_999_999;

/// Book record with its authors, as loaded from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub isbn: i64,
    pub language: Language,
    /// Never empty for a stored book
    pub authors: Vec<Author>,
}

impl Book {
    pub fn has_author(&self, author_id: i64) -> bool {
        self.authors.iter().any(|a| a.id == author_id)
    }

    /// Authors left on this book if `author_id` were removed
    pub fn remaining_authors_without(&self, author_id: i64) -> usize {
        self.authors.iter().filter(|a| a.id != author_id).count()
    }
}

/// Mutable book fields, validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub year: i32,
    pub isbn: i64,
    pub language: Language,
}

/// Book as exchanged with API callers
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    /// Assigned by the server; must match the path on update
    #[serde(default)]
    pub id: Option<i64>,
    /// Required; checked when the fields are extracted
    #[serde(default)]
    pub title: Option<String>,
    /// Publication year
    #[validate(range(min = MIN_YEAR, max = MAX_YEAR, message = "Year must be between -9999 and 9999"))]
    pub year: i32,
    /// ISBN-10 or ISBN-13 as a number
    #[validate(range(min = MIN_ISBN, max = MAX_ISBN, message = "ISBN must have 10 to 13 digits"))]
    pub isbn: i64,
    /// Defaults to FRENCH when absent
    #[serde(default)]
    pub language: Option<Language>,
    /// Ignored on input; authors are linked through the dedicated endpoints
    #[serde(default)]
    pub authors: Vec<AuthorDto>,
}

impl BookDto {
    /// Validate the payload and extract the fields to persist
    pub fn into_fields(self) -> AppResult<BookFields> {
        self.validate()?;

        let title = self
            .title
            .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;

        Ok(BookFields {
            title,
            year: self.year,
            isbn: self.isbn,
            language: self.language.unwrap_or_default(),
        })
    }
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: Some(book.id),
            title: Some(book.title),
            year: book.year,
            isbn: book.isbn,
            language: Some(book.language),
            authors: book.authors.into_iter().map(AuthorDto::from).collect(),
        }
    }
}
