//! Process lifecycle: load config, register endpoints, serve, drain, close.

use crate::config::{Conf, DbConfig, ServerConfig};
use crate::db::Database;
use crate::error::{AppError, ConfigError};
use crate::routes::{api_routes, common_routes};
use crate::service::Endpoint;
use crate::sql::SqlFormat;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use std::future::Future;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("server task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Build every entry of the `api` list. The first invalid entry aborts.
pub fn load_endpoints(conf: &Conf, format: SqlFormat) -> Result<Vec<Endpoint>, ConfigError> {
    let mut endpoints = Vec::new();
    for (i, item) in conf.iter("api")?.enumerate() {
        let endpoint = Endpoint::new(&item?, format).map_err(|e| {
            tracing::error!("api[{}]: {}", i, e);
            e
        })?;
        tracing::info!("deploy api {} {}", endpoint.method(), endpoint.url());
        endpoints.push(endpoint);
    }
    Ok(endpoints)
}

/// Full router: common routes plus one route per endpoint, with a request
/// body cap.
pub fn app(state: AppState, endpoints: Vec<Endpoint>, server: &ServerConfig) -> Result<Router, ConfigError> {
    Ok(common_routes(state.clone())
        .merge(api_routes(state, endpoints)?)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server.body_limit_bytes)))
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn run(conf: Conf) -> Result<(), ServerError> {
    run_until(conf, shutdown_signal()).await
}

/// Serve until `signal` resolves, then give in-flight requests the configured
/// grace period and close the pool.
pub async fn run_until<F>(conf: Conf, signal: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = ServerConfig::from_conf(&conf)?;
    let db_config = DbConfig::from_conf(&conf)?;
    let endpoints = load_endpoints(&conf, SqlFormat::from_config(&db_config))?;

    let db = Database::connect(&db_config).await?;
    let app = app(AppState::new(db.clone()), endpoints, &server)?;

    let listener = TcpListener::bind(server.addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let (draining_tx, draining_rx) = tokio::sync::oneshot::channel::<()>();
    let mut handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                let _ = draining_tx.send(());
            })
            .await
    });

    let served = tokio::select! {
        res = &mut handle => Some(res),
        _ = draining_rx => None,
    };
    let result = match served {
        Some(res) => res?.map_err(ServerError::from),
        None => {
            tracing::info!("shutting down, waiting up to {:?}", server.graceful_timeout);
            match tokio::time::timeout(server.graceful_timeout, &mut handle).await {
                Ok(res) => res?.map_err(ServerError::from),
                Err(_) => {
                    tracing::warn!("graceful timeout elapsed, dropping open connections");
                    handle.abort();
                    Ok(())
                }
            }
        }
    };

    db.close().await;
    tracing::info!("server stopped");
    result
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_endpoints_builds_each_entry() {
        let conf = Conf::new(json!({
            "api": [
                { "url": "/a", "sql": "select 1" },
                { "url": "/b", "method": "post", "sql_type": "update", "sql": "delete from t" },
            ]
        }));
        let endpoints = load_endpoints(&conf, SqlFormat::default()).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].url(), "/b");
    }

    #[test]
    fn load_endpoints_stops_at_first_error() {
        let conf = Conf::new(json!({
            "api": [{ "url": "/a", "sql": "select 1" }, { "url": "/b" }]
        }));
        assert!(matches!(load_endpoints(&conf, SqlFormat::default()), Err(ConfigError::MissingSql)));
    }

    #[test]
    fn api_must_be_a_list() {
        let conf = Conf::new(json!({ "api": { "url": "/a" } }));
        assert!(matches!(load_endpoints(&conf, SqlFormat::default()), Err(ConfigError::Path(_))));
    }
}
