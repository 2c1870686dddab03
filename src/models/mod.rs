//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod enums;

// Re-export commonly used types
pub use author::{Author, AuthorDto};
pub use book::{Book, BookDto, BookFields};
pub use enums::Language;
