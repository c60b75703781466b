//! Handler shared by every configured endpoint.

use crate::service::Endpoint;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use std::sync::Arc;

/// Run one request through `endpoint`. Path captures are matched by the router
/// but only the query string and body feed the request values.
pub async fn call_endpoint(
    endpoint: Arc<Endpoint>,
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    tracing::info!("{} {}", method, uri);
    endpoint.handle(&state.db, headers, &uri, &body).await
}
