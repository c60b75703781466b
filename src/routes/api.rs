//! One route per configured endpoint.

use crate::error::ConfigError;
use crate::handlers::call_endpoint;
use crate::routes::common::RESERVED_PATHS;
use crate::service::Endpoint;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    routing::{on, MethodFilter},
    Router,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Route shape with capture names erased: `/users/:id` and `/users/:uid`
/// occupy the same slot in the router.
fn shape(route: &str) -> String {
    route
        .split('/')
        .map(|seg| if seg.starts_with(':') { ":" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn api_routes(state: AppState, endpoints: Vec<Endpoint>) -> Result<Router, ConfigError> {
    let mut router = Router::new();
    let mut routes: HashMap<String, String> = HashMap::new();
    let mut bound: HashSet<(Method, String)> = HashSet::new();

    for endpoint in endpoints {
        let path = endpoint.route_path();
        if RESERVED_PATHS.contains(&path.as_str()) {
            return Err(ConfigError::InvalidConfig(format!("api url {} is reserved", path)));
        }
        let key = shape(&path);
        match routes.get(&key) {
            Some(existing) if *existing != path => {
                return Err(ConfigError::InvalidConfig(format!(
                    "api url {} conflicts with {}",
                    path, existing
                )))
            }
            Some(_) => {}
            None => {
                routes.insert(key.clone(), path.clone());
            }
        }
        if !bound.insert((endpoint.method().clone(), key)) {
            return Err(ConfigError::InvalidConfig(format!(
                "duplicate api {} {}",
                endpoint.method(),
                path
            )));
        }
        let filter = MethodFilter::try_from(endpoint.method().clone())
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        let endpoint = Arc::new(endpoint);
        let handler = move |state: State<AppState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            call_endpoint(endpoint.clone(), state, method, uri, headers, body)
        };
        router = router.route(&path, on(filter, handler));
    }
    Ok(router.with_state(state))
}
