//! HTTP handlers for the books module.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use shelf_db::StoreError;
use shelf_http::error::AppError;

use super::models::{
    Book, CreateBookRequest, GetBookResponse, ListBooksQuery, ListBooksResponse, NewBook,
};
use super::store::BookStore;

/// Build the books router. The store handle is baked in as router state.
pub fn router(store: BookStore) -> Router {
    Router::new()
        .route("/book", post(create_book))
        .route("/books", get(list_books))
        .route(
            "/book/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

async fn create_book(
    State(store): State<BookStore>,
    body: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(body) = body.map_err(|err| AppError::bad_request(err.body_text()))?;
    body.validate()?;

    store
        .create(NewBook {
            id: Uuid::new_v4().to_string(),
            cover_url: body.cover_url,
            isbn: body.isbn,
            title: body.title,
            author: body.author,
            publication_year: body.publication_year,
        })
        .await
        .map_err(store_error)?;

    Ok(StatusCode::CREATED)
}

async fn list_books(
    State(store): State<BookStore>,
    query: Result<Query<ListBooksQuery>, QueryRejection>,
) -> Result<Json<ListBooksResponse>, AppError> {
    let Query(query) = query.map_err(|err| AppError::bad_request(err.body_text()))?;

    let page = query.page();
    let page_size = query.page_size();
    let search = query.search.filter(|term| !term.is_empty());

    let (books, total) = store
        .list(page, page_size, search)
        .await
        .map_err(store_error)?;

    // Integer division; a partial trailing page is not counted.
    let total_page = total / i64::from(page_size);

    Ok(Json(ListBooksResponse { books, total_page }))
}

async fn get_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
) -> Result<Json<GetBookResponse>, AppError> {
    validate_book_id(&id)?;

    let book: Book = store.get(id).await.map_err(store_error)?;

    Ok(Json(GetBookResponse { book }))
}

async fn update_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
    body: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    validate_book_id(&id)?;

    let Json(body) = body.map_err(|err| AppError::bad_request(err.body_text()))?;
    body.validate()?;

    store
        .update(id, body.title, body.author, body.publication_year)
        .await
        .map_err(store_error)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    validate_book_id(&id)?;

    store.soft_delete(id).await.map_err(store_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Book ids are UUID v4 strings.
fn validate_book_id(id: &str) -> Result<(), AppError> {
    let parsed =
        Uuid::parse_str(id).map_err(|_| AppError::bad_request("id must be a UUID v4 string"))?;

    if parsed.get_version() != Some(uuid::Version::Random) {
        return Err(AppError::bad_request("id must be a UUID v4 string"));
    }

    Ok(())
}

fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::not_found("book not found"),
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::modules::books::BOOKS_MIGRATION;
    use shelf_db::Db;

    fn test_router() -> Router {
        let db = Db::open_in_memory().unwrap();
        db.apply_migrations(&[("books", "001_init", BOOKS_MIGRATION)])
            .unwrap();
        router(BookStore::new(db))
    }

    fn book_body(title: &str, author: &str, year: &str) -> Value {
        json!({
            "coverUrl": "https://covers.example.com/book.jpg",
            "isbn": "9780306406157",
            "title": title,
            "author": author,
            "publicationYear": year,
        })
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_one(app: &Router, title: &str, author: &str, year: &str) {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/book", &book_body(title, author, year)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    async fn first_book_id(app: &Router) -> String {
        let response = app.clone().oneshot(get_request("/books")).await.unwrap();
        let body = response_json(response).await;
        body["books"][0]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_returns_201_with_empty_body() {
        let app = test_router();
        let response = app
            .oneshot(json_request(
                "POST",
                "/book",
                &book_body("Dune", "Frank Herbert", "1965"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_invalid_isbn() {
        let app = test_router();
        let mut body = book_body("Dune", "Frank Herbert", "1965");
        body["isbn"] = json!("1234567890");

        let response = app.oneshot(json_request("POST", "/book", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "isbn");
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let app = test_router();
        let request = Request::builder()
            .method("POST")
            .uri("/book")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_empty_store_is_404() {
        let app = test_router();
        let response = app.oneshot(get_request("/books")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_paginates_with_integer_division_total() {
        let app = test_router();
        create_one(&app, "Dune", "Frank Herbert", "1965").await;
        create_one(&app, "Hyperion", "Dan Simmons", "1989").await;
        create_one(&app, "Solaris", "Stanislaw Lem", "1961").await;

        let response = app
            .clone()
            .oneshot(get_request("/books?page=1&pageSize=2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["books"].as_array().unwrap().len(), 2);
        // 3 rows / pageSize 2 under-counts by design.
        assert_eq!(body["totalPage"], 1);
    }

    #[tokio::test]
    async fn list_with_invalid_query_types_is_400() {
        let app = test_router();
        let response = app
            .oneshot(get_request("/books?page=abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_search_filters_books() {
        let app = test_router();
        create_one(&app, "Dune", "Frank Herbert", "1965").await;
        create_one(&app, "Hyperion", "Dan Simmons", "1989").await;

        let response = app
            .clone()
            .oneshot(get_request("/books?search=simmons"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["books"].as_array().unwrap().len(), 1);
        assert_eq!(body["books"][0]["title"], "Hyperion");

        let response = app
            .oneshot(get_request("/books?search=tolkien"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_by_id_round_trips_supplied_fields() {
        let app = test_router();
        create_one(&app, "Dune", "Frank Herbert", "1965").await;
        let id = first_book_id(&app).await;

        let response = app
            .oneshot(get_request(&format!("/book/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["book"]["id"], id.as_str());
        assert_eq!(body["book"]["title"], "Dune");
        assert_eq!(body["book"]["author"], "Frank Herbert");
        assert_eq!(body["book"]["publicationYear"], "1965");
        assert_eq!(body["book"]["isbn"], "9780306406157");
        assert_eq!(body["book"]["coverUrl"], "https://covers.example.com/book.jpg");
        assert!(body["book"]["createdAt"].is_string());
        assert!(body["book"].get("deletedAt").is_none());
    }

    #[tokio::test]
    async fn get_with_malformed_id_is_400() {
        let app = test_router();
        let response = app.oneshot(get_request("/book/not-a-uuid")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_unknown_id_is_404() {
        let app = test_router();
        let id = Uuid::new_v4();
        let response = app
            .oneshot(get_request(&format!("/book/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_changes_mutable_fields_only() {
        let app = test_router();
        create_one(&app, "Dune", "Frank Herbert", "1965").await;
        let id = first_book_id(&app).await;

        let mut body = book_body("Dune Messiah", "Frank Herbert", "1969");
        body["coverUrl"] = json!("https://covers.example.com/other.jpg");

        let response = app
            .clone()
            .oneshot(json_request("PUT", &format!("/book/{id}"), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(get_request(&format!("/book/{id}")))
            .await
            .unwrap();
        let body = response_json(response).await;
        assert_eq!(body["book"]["title"], "Dune Messiah");
        assert_eq!(body["book"]["publicationYear"], "1969");
        // The request carried a new cover URL, but the field is immutable.
        assert_eq!(body["book"]["coverUrl"], "https://covers.example.com/book.jpg");
        assert!(body["book"]["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn update_unknown_id_is_404() {
        let app = test_router();
        let id = Uuid::new_v4();
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/book/{id}"),
                &book_body("T", "A", "1999"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_soft_deletes_and_repeats_as_404() {
        let app = test_router();
        create_one(&app, "Dune", "Frank Herbert", "1965").await;
        let id = first_book_id(&app).await;

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/book/{id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(get_request(&format!("/book/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let delete_again = Request::builder()
            .method("DELETE")
            .uri(format!("/book/{id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(delete_again).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
