//! Typed server and database settings read from the config tree.

use crate::config::Conf;
use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3424;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub graceful_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub fn from_conf(conf: &Conf) -> Result<Self, ConfigError> {
        let port = conf.get_int("port", DEFAULT_PORT as i32);
        let port = u16::try_from(port)
            .map_err(|_| ConfigError::InvalidConfig(format!("port {} out of range", port)))?;
        let graceful = conf.get_long("graceful_timeout_seconds", 10).max(0) as u64;
        let limit = conf.get_long("body_limit_bytes", DEFAULT_BODY_LIMIT as i64).max(0) as usize;
        Ok(ServerConfig {
            host: conf.get_string("host", "0.0.0.0"),
            port,
            graceful_timeout: Duration::from_secs(graceful),
            body_limit_bytes: limit,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pool limits and SQL post-processing switches under `db.*`.
#[derive(Clone, Debug, PartialEq)]
pub struct DbConfig {
    pub url: String,
    pub max_open_conn: u32,
    pub max_idle_conn: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
    pub replace_newline_with_space: bool,
    pub remove_empty_line: bool,
}

impl DbConfig {
    pub fn from_conf(conf: &Conf) -> Result<Self, ConfigError> {
        let url = conf.get_string("db.url", "");
        if url.is_empty() {
            return Err(ConfigError::MissingDbUrl);
        }
        let count = |expr: &str, default: i32| conf.get_int(expr, default).max(1) as u32;
        let secs = |expr: &str, default: i64, unit: u64| {
            Duration::from_secs((conf.get_long(expr, default).max(0) as u64).saturating_mul(unit))
        };
        Ok(DbConfig {
            url,
            max_open_conn: count("db.max_open_conn", 3),
            max_idle_conn: count("db.max_idle_conn", 3),
            max_lifetime: secs("db.max_lifetime_minute", 5, 60),
            acquire_timeout: secs("db.acquire_timeout_seconds", 5, 1),
            replace_newline_with_space: conf.get_bool("db.replace_newline_with_space", false),
            remove_empty_line: conf.get_bool("db.remove_empty_line", true),
        })
    }

    /// The URL with any password replaced by `****`, for logs.
    pub fn masked_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return "****".into();
        };
        let (authority, tail) = match rest.find('/') {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };
        match authority.rsplit_once('@') {
            Some((userinfo, host)) => {
                let user = userinfo.split(':').next().unwrap_or("");
                format!("{}://{}:****@{}{}", scheme, user, host, tail)
            }
            None => self.url.clone(),
        }
    }
}
