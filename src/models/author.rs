//! Author model and its wire representation

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Author record as persisted
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Author {
    pub id: i64,
    pub full_name: String,
}

/// Author as exchanged with API callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    /// Assigned by the server; ignored on creation
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub full_name: String,
}

impl AuthorDto {
    /// Trimmed name, or `None` when nothing but whitespace was sent
    pub fn normalized_name(&self) -> Option<&str> {
        let name = self.full_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self {
            id: Some(author.id),
            full_name: author.full_name,
        }
    }
}
