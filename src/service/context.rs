//! Per-request value set and template accessors.

use crate::config::Conf;
use crate::error::AppError;
use crate::service::Endpoint;
use crate::sql::Helpers;
use axum::http::HeaderMap;
use serde_json::Value;

/// Merged request values for one call of an endpoint. Dropped once the
/// response is built.
#[derive(Debug)]
pub struct RequestContext<'a> {
    endpoint: &'a Endpoint,
    values: Conf,
    headers: HeaderMap,
    path: String,
}

impl<'a> RequestContext<'a> {
    pub fn new(endpoint: &'a Endpoint, values: Value, headers: HeaderMap, path: impl Into<String>) -> Self {
        RequestContext {
            endpoint,
            values: Conf::new(values),
            headers,
            path: path.into(),
        }
    }

    pub fn endpoint(&self) -> &'a Endpoint {
        self.endpoint
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// String value at a path expression; empty when absent or unresolvable.
    pub fn param(&self, name: &str) -> String {
        self.values.get_string(name, "")
    }

    pub fn flag(&self, name: &str) -> bool {
        self.values.get_bool(name, false)
    }

    pub fn header(&self, name: &str) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Render the endpoint's statement for this request.
    pub fn sql(&self) -> Result<String, AppError> {
        self.endpoint.sql(self)
    }
}

impl Helpers for RequestContext<'_> {
    fn param(&self, name: &str) -> String {
        RequestContext::param(self, name)
    }

    fn flag(&self, name: &str) -> bool {
        RequestContext::flag(self, name)
    }

    fn header(&self, name: &str) -> String {
        RequestContext::header(self, name)
    }
}
