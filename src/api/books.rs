//! Book endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{AuthorDto, BookDto},
};

use super::{ApiJson, ApiPath, ApiQuery, SearchQuery};

/// List books, optionally filtered by title
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("q" = Option<String>, Query, description = "Substring of the book title")
    ),
    responses(
        (status = 200, description = "List of books", body = Vec<BookDto>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<BookDto>>> {
    let books = state.services.books.list(query.q.as_deref()).await?;
    Ok(Json(books.into_iter().map(BookDto::from).collect()))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDto),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<BookDto>> {
    let book = state.services.books.get(id).await?;
    Ok(Json(book.into()))
}

/// Create a book written by the author in the path
#[utoipa::path(
    post,
    path = "/authors/{id}/books",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Author ID")
    ),
    request_body = BookDto,
    responses(
        (status = 201, description = "Book created", body = BookDto),
        (status = 400, description = "Invalid book fields", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    ApiPath(author_id): ApiPath<i64>,
    ApiJson(book): ApiJson<BookDto>,
) -> AppResult<(StatusCode, Json<BookDto>)> {
    let created = state.services.books.create(author_id, book).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = BookDto,
    responses(
        (status = 200, description = "Book updated", body = BookDto),
        (status = 400, description = "Body id does not match path or invalid fields", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(book): ApiJson<BookDto>,
) -> AppResult<Json<BookDto>> {
    let updated = state.services.books.update(id, book).await?;
    Ok(Json(updated.into()))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Book has more than one author", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add an author to a book
#[utoipa::path(
    put,
    path = "/books/{id}/authors",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body(content = AuthorDto, description = "Author to link; only `id` is read"),
    responses(
        (status = 200, description = "Book with the author linked", body = BookDto),
        (status = 400, description = "Missing author id", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_author_to_book(
    State(state): State<crate::AppState>,
    ApiPath(book_id): ApiPath<i64>,
    ApiJson(author): ApiJson<AuthorDto>,
) -> AppResult<Json<BookDto>> {
    let author_id = author
        .id
        .ok_or_else(|| AppError::BadRequest("Author id is required".to_string()))?;
    let book = state.services.books.add_author(book_id, author_id).await?;
    Ok(Json(book.into()))
}
