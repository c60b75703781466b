//! Response envelope helpers.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::fmt::Display;

pub const NOT_FOUND_BODY: &str = r#"{"found": false}"#;

const JSON: &str = "application/json";
const CSV: &str = "text/csv; charset=utf-8";

/// Respond with an already-encoded JSON body.
pub fn json(status: StatusCode, body: impl Into<Body>) -> Response {
    (status, [(header::CONTENT_TYPE, JSON)], body.into()).into_response()
}

/// `{"error": "<message>"}` with the given status.
pub fn error(status: StatusCode, message: impl Display) -> Response {
    json(status, error_body(message))
}

pub fn error_body(message: impl Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

/// Empty result set: 404 `{"found": false}`.
pub fn not_found() -> Response {
    json(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// CSV body sent as a download named `<filename>.csv`.
pub fn csv_attachment(filename: &str, body: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}.csv\"", filename.replace('"', ""));
    let mut response = (StatusCode::OK, [(header::CONTENT_TYPE, CSV)], body).into_response();
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => tracing::warn!("dropping content-disposition for {}: {}", filename, e),
    }
    response
}
