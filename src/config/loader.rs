//! Load a configuration file (TOML or JSON) into a [`Conf`] tree.

use crate::config::Conf;
use crate::error::ConfigError;
use serde_json::Value;
use std::path::Path;

/// Load the file named by environment variable `env`. Unset or empty is
/// [`ConfigError::EnvNotSet`].
pub async fn load_env(env: &str) -> Result<Conf, ConfigError> {
    match std::env::var(env) {
        Ok(file) if !file.is_empty() => load_file(&file).await,
        _ => Err(ConfigError::EnvNotSet(env.to_string())),
    }
}

/// Load by extension: `.toml` or `.json`.
pub async fn load_file(file: impl AsRef<Path>) -> Result<Conf, ConfigError> {
    let file = file.as_ref();
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parse: fn(&str) -> Result<Value, ConfigError> = match ext {
        "toml" => parse_toml,
        "json" => parse_json,
        _ => return Err(ConfigError::UnsupportedFormat(file.display().to_string())),
    };
    tracing::info!("load config {}", file.display());
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
    Ok(Conf::new(parse(&text)?))
}

pub fn parse_toml(text: &str) -> Result<Value, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))
}

pub fn parse_json(text: &str) -> Result<Value, ConfigError> {
    let v: Value = serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
    if !v.is_object() {
        return Err(ConfigError::Load("config root must be an object".into()));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML: &str = r#"
port = 8080

[db]
url = "postgres://u:p@localhost/app"

[[api]]
url = "/users"
params = ["id required pattern:^\\d+$"]
sql = "select * from users where id = {{ Param \"id\" }}"
"#;

    #[tokio::test]
    async fn loads_toml_by_extension() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        f.write_all(TOML.as_bytes()).unwrap();
        let conf = load_file(f.path()).await.unwrap();
        assert_eq!(conf.get_int("port", 0), 8080);
        assert_eq!(conf.get_string("api[0].url", ""), "/users");
        assert_eq!(conf.get_string("api[0].params[0]", ""), r"id required pattern:^\d+$");
    }

    #[tokio::test]
    async fn loads_json_by_extension() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        f.write_all(br#"{"db": {"url": "postgres://x"}, "api": []}"#).unwrap();
        let conf = load_file(f.path()).await.unwrap();
        assert_eq!(conf.get_string("db.url", ""), "postgres://x");
    }

    #[tokio::test]
    async fn rejects_unknown_extension() {
        let err = load_file("settings.yaml").await.unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn loads_file_named_by_env() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        f.write_all(br#"{"port": 9090}"#).unwrap();
        std::env::set_var("SQLGATE_TEST_CONFIG_SET", f.path());
        let conf = load_env("SQLGATE_TEST_CONFIG_SET").await.unwrap();
        assert_eq!(conf.get_int("port", 0), 9090);
    }

    #[tokio::test]
    async fn unset_env_is_reported() {
        std::env::remove_var("SQLGATE_TEST_CONFIG_UNSET");
        let err = load_env("SQLGATE_TEST_CONFIG_UNSET").await.unwrap_err();
        assert!(matches!(err, ConfigError::EnvNotSet(ref name) if name == "SQLGATE_TEST_CONFIG_UNSET"));

        std::env::set_var("SQLGATE_TEST_CONFIG_EMPTY", "");
        let err = load_env("SQLGATE_TEST_CONFIG_EMPTY").await.unwrap_err();
        assert!(matches!(err, ConfigError::EnvNotSet(_)));
    }

    #[test]
    fn json_root_must_be_object() {
        assert!(parse_json("[1, 2]").is_err());
    }
}
