//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure while evaluating a path expression against a value tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("{segment} is not array ({found})")]
    NotAnArray { segment: String, found: &'static str },
    #[error("index {index} out of range {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cannot parse '{value}' as {target}")]
    Parse { value: String, target: &'static str },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("api url is not set")]
    MissingUrl,
    #[error("sql is not configured")]
    MissingSql,
    #[error("db.url is not set")]
    MissingDbUrl,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid sql type {0}")]
    InvalidSqlType(String),
    #[error("invalid output type {0}")]
    InvalidOutputType(String),
    #[error("template {name}: {message}")]
    Template { name: String, message: String },
    #[error("unsupported config format {0}")]
    UnsupportedFormat(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("env {0} not specified")]
    EnvNotSet(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Parameter validation failures, reported to the client as 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("param {0} is required")]
    ParamRequired(String),
    #[error("param {0} is invalid")]
    ParamInvalid(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("render: {0}")]
    Render(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Encoding(#[from] csv::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Render(_) | AppError::Db(_) | AppError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        crate::response::error(self.status(), &self)
    }
}
