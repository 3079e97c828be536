//! Uniform response envelope for success and failure responses.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Error section of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>, body: Option<String>) -> Self {
        Self {
            msg: msg.into(),
            body,
        }
    }
}

/// Response wrapper carrying zero or more books plus status and error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub books: Vec<T>,
    pub total_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub request_time: OffsetDateTime,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    /// Build an envelope stamped with the current time.
    pub fn new(
        books: Vec<T>,
        total_count: usize,
        status: impl Into<String>,
        error: Option<ErrorBody>,
    ) -> Self {
        Self {
            books,
            total_count,
            request_time: OffsetDateTime::now_utc(),
            status: status.into(),
            error,
        }
    }

    pub fn success(books: Vec<T>, status: StatusCode) -> Self {
        let total = books.len();
        Self::new(books, total, status_text(status), None)
    }

    pub fn failure(status: StatusCode, error: ErrorBody) -> Self {
        Self::new(Vec::new(), 0, status_text(status), Some(error))
    }
}

/// Canonical reason phrase (`"OK"`, `"Service Unavailable"`, ...).
pub fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_error_and_counts_books() {
        let envelope = Envelope::success(vec![json!({"id": 1})], StatusCode::CREATED);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["total_count"], 1);
        assert_eq!(value["status"], "Created");
        assert_eq!(value["books"][0]["id"], 1);
        assert!(value.get("error").is_none());
        assert!(value["request_time"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn failure_omits_books_and_optional_body() {
        let envelope: Envelope =
            Envelope::failure(StatusCode::BAD_REQUEST, ErrorBody::new("bad id", None));
        let value = serde_json::to_value(&envelope).unwrap();

        assert!(value.get("books").is_none());
        assert_eq!(value["total_count"], 0);
        assert_eq!(value["status"], "Bad Request");
        assert_eq!(value["error"], json!({"msg": "bad id"}));
    }

    #[test]
    fn explicit_builder_keeps_given_total() {
        let envelope = Envelope::new(
            Vec::<serde_json::Value>::new(),
            7,
            "OK",
            Some(ErrorBody::new("partial", Some("detail".to_string()))),
        );
        assert_eq!(envelope.total_count, 7);
        assert_eq!(envelope.error.unwrap().body.as_deref(), Some("detail"));
    }
}
