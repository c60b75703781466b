//! sqlgate: configuration-driven SQL-to-REST gateway for PostgreSQL.
//!
//! Each entry of the `api` config list becomes one HTTP route bound to a SQL
//! template. Requests are merged into a value tree, validated, rendered to SQL,
//! executed, and encoded as JSON, a single JSON object, CSV, or a statement
//! summary.

pub mod case;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod output;
pub mod path;
pub mod response;
pub mod routes;
pub mod server;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_env, load_file, Conf, DbConfig, ServerConfig};
pub use db::Database;
pub use error::{AppError, ConfigError, PathError, ValidationError};
pub use routes::{api_routes, common_routes};
pub use server::{app, load_endpoints, run, run_until, shutdown_signal, ServerError};
pub use service::{Endpoint, RequestContext};
pub use sql::SqlFormat;
pub use state::AppState;
