//! Author endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{AuthorDto, BookDto},
};

use super::{ApiJson, ApiPath, ApiQuery, SearchQuery};

/// List authors, optionally filtered by name
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    params(
        ("q" = Option<String>, Query, description = "Substring of the author's name")
    ),
    responses(
        (status = 200, description = "List of authors", body = Vec<AuthorDto>)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<AuthorDto>>> {
    let authors = state.services.authors.list(query.q.as_deref()).await?;
    Ok(Json(authors.into_iter().map(AuthorDto::from).collect()))
}

/// Get author by ID
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i64, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author details", body = AuthorDto),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<AuthorDto>> {
    let author = state.services.authors.get(id).await?;
    Ok(Json(author.into()))
}

/// Create a new author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    request_body = AuthorDto,
    responses(
        (status = 201, description = "Author created", body = AuthorDto),
        (status = 400, description = "Blank name", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    ApiJson(author): ApiJson<AuthorDto>,
) -> AppResult<(StatusCode, Json<AuthorDto>)> {
    let created = state.services.authors.create(&author).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update an existing author
#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i64, Path, description = "Author ID")
    ),
    request_body = AuthorDto,
    responses(
        (status = 200, description = "Author updated", body = AuthorDto),
        (status = 400, description = "Body id does not match path", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(author): ApiJson<AuthorDto>,
) -> AppResult<Json<AuthorDto>> {
    let updated = state.services.authors.update(id, &author).await?;
    Ok(Json(updated.into()))
}

/// Delete an author
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i64, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 400, description = "Author is the only author of a book", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.services.authors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the books of an author, optionally filtered by title
#[utoipa::path(
    get,
    path = "/authors/{id}/books",
    tag = "authors",
    params(
        ("id" = i64, Path, description = "Author ID"),
        ("q" = Option<String>, Query, description = "Substring of the book title")
    ),
    responses(
        (status = 200, description = "Books of the author", body = Vec<BookDto>),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_author_books(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<BookDto>>> {
    let books = state.services.authors.books(id, query.q.as_deref()).await?;
    Ok(Json(books.into_iter().map(BookDto::from).collect()))
}
