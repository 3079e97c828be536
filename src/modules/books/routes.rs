//! HTTP handlers for the books module.

use std::error::Error;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use shelf_db::SharedStore;
use shelf_http::{AppError, Envelope};

use super::models::{Book, NewBook};
use super::repo::{self, CatalogError, ErrorKind};

/// Routes mounted under `/api/books`.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", post(create_book))
        .route("/health", get(check_health))
        .route("/{id}", delete(delete_book))
        .with_state(store)
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err.kind() {
            ErrorKind::Connectivity => {
                let detail = err.source().map(|source| source.to_string());
                AppError::unavailable(err.to_string(), detail)
            }
            ErrorKind::Precondition => AppError::bad_request(err.to_string()),
            ErrorKind::Transaction | ErrorKind::Statement => AppError::Internal(err.into()),
        }
    }
}

/// Run a blocking store call off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Internal(anyhow::Error::new(err).context("store task failed")))?;
    Ok(outcome?)
}

async fn check_health(State(store): State<SharedStore>) -> Result<Json<Envelope<Book>>, AppError> {
    run_blocking(move || repo::check_health(store.as_ref())).await?;
    Ok(Json(Envelope::success(Vec::new(), StatusCode::OK)))
}

async fn create_book(
    State(store): State<SharedStore>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Book>>), AppError> {
    let Json(new_book) = payload.map_err(|rejection| {
        AppError::bad_request_with("invalid book payload", rejection.body_text())
    })?;

    let mut book = Book::from(new_book);
    let book = run_blocking(move || {
        repo::create_book(store.as_ref(), &mut book)?;
        Ok(book)
    })
    .await?;

    tracing::info!(module = "books", book_id = book.id, "book created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(vec![book], StatusCode::CREATED)),
    ))
}

async fn delete_book(
    State(store): State<SharedStore>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<Book>>, AppError> {
    let Path(id) = id.map_err(|rejection| {
        AppError::bad_request_with("invalid book id", rejection.body_text())
    })?;

    let book = Book {
        id,
        ..Book::default()
    };
    run_blocking(move || repo::delete_book(store.as_ref(), &book)).await?;

    tracing::info!(module = "books", book_id = id, "book deleted");
    Ok(Json(Envelope::success(Vec::new(), StatusCode::OK)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, response::Response};
    use shelf_db::mock::{Call, MockStore};
    use shelf_db::Store;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn sqlite_store() -> SharedStore {
        let store = shelf_db::connect(":memory:").unwrap();
        store.execute(repo::BOOKS_TABLE, &[]).unwrap();
        store
    }

    fn post_book(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete_request(id: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(format!("/{id}"))
            .body(Body::empty())
            .unwrap()
    }

    fn health_request() -> Request<Body> {
        Request::builder().uri("/health").body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const MORT: &str = r#"{
        "author": "Terry Pratchett",
        "title": "Mort",
        "description": "Mort is a fantasy novel by British writer Terry Pratchett.",
        "isbn": "9780552144292"
    }"#;

    #[tokio::test]
    async fn create_returns_persisted_book_in_envelope() {
        let app = router(sqlite_store());

        let response = app.oneshot(post_book(MORT)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["status"], "Created");
        assert_eq!(json["total_count"], 1);
        assert_eq!(json["books"][0]["id"], 1);
        assert_eq!(json["books"][0]["title"], "Mort");
        assert_eq!(json["books"][0]["isbn"], "9780552144292");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn malformed_payload_is_a_bad_request_envelope() {
        let app = router(sqlite_store());

        let response = app
            .oneshot(post_book(r#"{"title": "Mort"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["status"], "Bad Request");
        assert_eq!(json["error"]["msg"], "invalid book payload");
        assert!(json["error"]["body"].is_string());
    }

    #[tokio::test]
    async fn statement_failure_maps_to_internal_error() {
        let store = Arc::new(MockStore::new().fail_statements("constraint violation"));
        let app = router(store.clone());

        let response = app.oneshot(post_book(MORT)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["status"], "Internal Server Error");
        assert!(json["error"]["msg"].is_string());
        assert_eq!(store.count(|c| *c == Call::Rollback), 1);
    }

    #[tokio::test]
    async fn delete_existing_book_succeeds() {
        let store = sqlite_store();
        let app = router(store.clone());

        let response = app.clone().oneshot(post_book(MORT)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(delete_request("1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "OK");
        assert_eq!(json["total_count"], 0);
        assert!(store.query("SELECT id FROM books", &[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_with_zero_id_is_rejected_without_store_calls() {
        let store = Arc::new(MockStore::new());
        let app = router(store.clone());

        let response = app.oneshot(delete_request("0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"]["msg"], "cannot delete book with ID of 0");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_with_non_numeric_id_is_rejected() {
        let app = router(Arc::new(MockStore::new()));

        let response = app.oneshot(delete_request("mort")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"]["msg"], "invalid book id");
    }

    #[tokio::test]
    async fn health_reports_ok_when_probe_succeeds() {
        let store = Arc::new(MockStore::new());
        let app = router(store.clone());

        let response = app.oneshot(health_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "OK");
        assert_eq!(store.calls(), vec![Call::Ping]);
    }

    #[tokio::test]
    async fn health_reports_unavailable_when_probe_fails() {
        let app = router(Arc::new(MockStore::new().fail_ping("connection refused")));

        let response = app.oneshot(health_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(response).await;
        assert_eq!(json["status"], "Service Unavailable");
        assert_eq!(json["error"]["msg"], "store health check failed");
        assert_eq!(
            json["error"]["body"],
            "store unavailable: connection refused"
        );
    }
}
