//! Router tests over the in-memory catalog store.
//!
//! Requests go through the full axum router with tower::ServiceExt, no TCP
//! listener needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use library_server::{api, repository::MemoryCatalogStore, AppConfig, AppState};

fn app() -> Router {
    let state = AppState::new(AppConfig::default(), Arc::new(MemoryCatalogStore::new()));
    api::create_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_author(app: &Router, name: &str) -> i64 {
    let (status, body) = send(app, Method::POST, "/authors", Some(json!({ "fullName": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("No author ID")
}

fn book_payload(title: &str, year: i64, isbn: i64) -> Value {
    json!({ "title": title, "year": year, "isbn": isbn })
}

async fn create_book(app: &Router, author_id: i64, title: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/authors/{}/books", author_id),
        Some(book_payload(title, 1954, 9780261103573)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("No book ID")
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_author_crud() {
    let app = app();
    let id = create_author(&app, "J. R. R. Tolkien").await;

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id, "fullName": "J. R. R. Tolkien" }));

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/authors/{}", id),
        Some(json!({ "id": id, "fullName": "John Ronald Reuel Tolkien" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fullName"], "John Ronald Reuel Tolkien");

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id, "fullName": "John Ronald Reuel Tolkien" }));
}

#[tokio::test]
async fn test_create_author_blank_name() {
    let app = app();
    let (status, _) = send(&app, Method::POST, "/authors", Some(json!({ "fullName": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/authors", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/authors", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/authors")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_author_errors() {
    let app = app();
    let id = create_author(&app, "Mary Shelley").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/authors/{}", id),
        Some(json!({ "id": id + 1, "fullName": "Mary Wollstonecraft Shelley" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/authors/999",
        Some(json!({ "id": 999, "fullName": "Nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_author_blank_name() {
    let app = app();
    let id = create_author(&app, "Mary Shelley").await;
    let uri = format!("/authors/{}", id);

    let blank = json!({ "id": id, "fullName": "  " });
    let (status, body) = send(&app, Method::PUT, &uri, Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["fullName"], "Mary Shelley");
}

#[tokio::test]
async fn test_unparsable_path_id_is_json_bad_request() {
    let app = app();
    for (method, uri) in [
        (Method::GET, "/authors/abc"),
        (Method::DELETE, "/authors/abc"),
        (Method::GET, "/authors/abc/books"),
        (Method::GET, "/books/1.5"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(
            response.headers()["content-type"],
            "application/json",
            "{}",
            uri
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], 5);
        assert_eq!(body["error"], "BadValue");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_list_authors_with_query() {
    let app = app();
    create_author(&app, "Isaac Asimov").await;
    create_author(&app, "Arthur C. Clarke").await;

    let (status, body) = send(&app, Method::GET, "/authors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/authors?q=asimov", None).await;
    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["fullName"], "Isaac Asimov");

    let (status, body) = send(&app, Method::GET, "/authors?q=herbert", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_get_missing_author() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/authors/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchAuthor");
}

#[tokio::test]
async fn test_delete_author_without_books() {
    let app = app();
    let id = create_author(&app, "Frank Herbert").await;

    let (status, body) = send(&app, Method::DELETE, &format!("/authors/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, &format!("/authors/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/authors/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_sole_author_refused() {
    let app = app();
    let author_id = create_author(&app, "J. R. R. Tolkien").await;
    let book_id = create_book(&app, author_id, "The Lord of the Rings").await;

    let (status, _) = send(&app, Method::DELETE, &format!("/authors/{}", author_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, &format!("/authors/{}", author_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, &format!("/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authors"][0]["id"], author_id);
}

#[tokio::test]
async fn test_delete_co_author_allowed() {
    let app = app();
    let pratchett = create_author(&app, "Terry Pratchett").await;
    let gaiman = create_author(&app, "Neil Gaiman").await;
    let book_id = create_book(&app, pratchett, "Good Omens").await;
    send(
        &app,
        Method::PUT,
        &format!("/books/{}/authors", book_id),
        Some(json!({ "id": gaiman })),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &format!("/authors/{}", gaiman), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, &format!("/books/{}", book_id), None).await;
    assert_eq!(body["authors"], json!([{ "id": pratchett, "fullName": "Terry Pratchett" }]));
}

#[tokio::test]
async fn test_author_books() {
    let app = app();
    let author_id = create_author(&app, "Ursula K. Le Guin").await;
    create_book(&app, author_id, "A Wizard of Earthsea").await;
    create_book(&app, author_id, "The Left Hand of Darkness").await;
    let other = create_author(&app, "Octavia E. Butler").await;
    create_book(&app, other, "Kindred").await;

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}/books", author_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/authors/{}/books?q=earthsea", author_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "A Wizard of Earthsea");

    let (status, _) = send(&app, Method::GET, "/authors/999/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_book_isbn_bounds() {
    let app = app();
    let author_id = create_author(&app, "Jorge Luis Borges").await;
    let uri = format!("/authors/{}/books", author_id);

    let (status, _) = send(&app, Method::POST, &uri, Some(book_payload("Ficciones", 1944, 999_999_999))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::POST, &uri, Some(book_payload("Ficciones", 1944, 1_000_000_000))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isbn"], 1_000_000_000i64);
    assert_eq!(body["language"], "FRENCH");
    assert_eq!(body["authors"], json!([{ "id": author_id, "fullName": "Jorge Luis Borges" }]));

    let (status, _) = send(&app, Method::POST, &uri, Some(book_payload("Ficciones", 1944, 10_000_000_000_000))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_book_year_bounds() {
    let app = app();
    let author_id = create_author(&app, "H. G. Wells").await;
    let uri = format!("/authors/{}/books", author_id);

    let (status, _) = send(&app, Method::POST, &uri, Some(book_payload("The Time Machine", 10000, 9780451528551))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::POST, &uri, Some(book_payload("The Time Machine", 9999, 9780451528551))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["year"], 9999);

    let (status, _) = send(&app, Method::POST, &uri, Some(book_payload("The Time Machine", -9999, 9780451528551))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_book_other_validation() {
    let app = app();
    let author_id = create_author(&app, "Victor Hugo").await;
    let uri = format!("/authors/{}/books", author_id);

    let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "year": 1862, "isbn": 9782253096337i64 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "title": "Les Misérables", "year": 1862, "isbn": 9782253096337i64, "language": "spanish" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "title": "Les Misérables", "year": 1862, "isbn": 9782253096337i64, "language": "english" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["language"], "ENGLISH");

    let (status, _) = send(
        &app,
        Method::POST,
        "/authors/999/books",
        Some(book_payload("Les Misérables", 1862, 9782253096337)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_books_with_query() {
    let app = app();
    let author_id = create_author(&app, "Douglas Adams").await;
    create_book(&app, author_id, "The Hitchhiker's Guide to the Galaxy").await;
    create_book(&app, author_id, "Dirk Gently's Holistic Detective Agency").await;

    let (status, body) = send(&app, Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/books?q=galaxy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/books/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_book() {
    let app = app();
    let author_id = create_author(&app, "Albert Camus").await;
    let book_id = create_book(&app, author_id, "L'Etranger").await;
    let uri = format!("/books/{}", book_id);

    let mut payload = book_payload("L'Étranger", 1942, 9782070360024);
    payload["id"] = json!(book_id + 1);
    let (status, _) = send(&app, Method::PUT, &uri, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    payload["id"] = json!(book_id);
    let (status, body) = send(&app, Method::PUT, &uri, Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "L'Étranger");
    assert_eq!(body["year"], 1942);
    assert_eq!(body["authors"].as_array().unwrap().len(), 1);

    let mut missing = book_payload("Ghost", 1942, 9782070360024);
    missing["id"] = json!(999);
    let (status, _) = send(&app, Method::PUT, "/books/999", Some(missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_book_validates_fields() {
    let app = app();
    let author_id = create_author(&app, "Albert Camus").await;
    let book_id = create_book(&app, author_id, "La Peste").await;
    let uri = format!("/books/{}", book_id);

    let mut bad_isbn = book_payload("La Peste", 1947, 5);
    bad_isbn["id"] = json!(book_id);
    let mut bad_year = book_payload("La Peste", 10000, 9782070360422);
    bad_year["id"] = json!(book_id);
    let no_title = json!({ "id": book_id, "title": null, "year": 1947, "isbn": 9782070360422i64 });

    for payload in [bad_isbn, bad_year, no_title] {
        let (status, body) = send(&app, Method::PUT, &uri, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadValue");
    }

    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["title"], "La Peste");
    assert_eq!(body["year"], 1954);
    assert_eq!(body["isbn"], 9780261103573i64);
}

#[tokio::test]
async fn test_delete_book() {
    let app = app();
    let pratchett = create_author(&app, "Terry Pratchett").await;
    let gaiman = create_author(&app, "Neil Gaiman").await;
    let solo = create_book(&app, pratchett, "Mort").await;
    let shared = create_book(&app, pratchett, "Good Omens").await;
    send(
        &app,
        Method::PUT,
        &format!("/books/{}/authors", shared),
        Some(json!({ "id": gaiman })),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{}", solo), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/books/{}", solo), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{}", shared), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(&app, Method::GET, &format!("/books/{}", shared), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authors"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::DELETE, "/books/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_author_to_book_is_idempotent() {
    let app = app();
    let first = create_author(&app, "Terry Pratchett").await;
    let second = create_author(&app, "Neil Gaiman").await;
    let book_id = create_book(&app, first, "Good Omens").await;
    let uri = format!("/books/{}/authors", book_id);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "id": second }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authors"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "id": second }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_author_to_book_errors() {
    let app = app();
    let author_id = create_author(&app, "Terry Pratchett").await;
    let book_id = create_book(&app, author_id, "Guards! Guards!").await;

    let (status, _) = send(&app, Method::PUT, "/books/999/authors", Some(json!({ "id": author_id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/books/{}/authors", book_id),
        Some(json!({ "id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/books/{}/authors", book_id),
        Some(json!({ "fullName": "No Id" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
