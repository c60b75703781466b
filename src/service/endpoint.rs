//! Endpoint definitions built from the `api` config list, and the request
//! pipeline that runs them.

use crate::case::NameCase;
use crate::config::Conf;
use crate::db::Database;
use crate::error::{AppError, ConfigError, ValidationError};
use crate::output::{CsvOutput, ExecOutput, ListOutput, Output, SingleOutput};
use crate::path;
use crate::service::validation::ParamSpec;
use crate::service::RequestContext;
use crate::sql::{SqlFormat, Template};
use axum::{
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::MethodFilter,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlKind {
    Query,
    Update,
}

impl FromStr for SqlKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(SqlKind::Query),
            "update" => Ok(SqlKind::Update),
            other => Err(ConfigError::InvalidSqlType(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    List,
    Single,
    Csv,
}

impl FromStr for OutputKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(OutputKind::List),
            "single" => Ok(OutputKind::Single),
            "csv" => Ok(OutputKind::Csv),
            other => Err(ConfigError::InvalidOutputType(other.to_string())),
        }
    }
}

/// One configured route. Immutable once built and shared by every request.
#[derive(Debug)]
pub struct Endpoint {
    url: String,
    method: Method,
    template: Template,
    format: SqlFormat,
    sql_kind: SqlKind,
    output_kind: OutputKind,
    output_map: HashMap<String, String>,
    csv_map: HashMap<String, String>,
    name_case: NameCase,
    csv_name_case: NameCase,
    params: Vec<ParamSpec>,
    param_defaults: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(conf: &Conf, format: SqlFormat) -> Result<Self, ConfigError> {
        let url = conf.get_string("url", "");
        if url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        check_url(&url)?;
        let method_name = conf.get_string("method", "GET").to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .ok()
            .filter(|m| MethodFilter::try_from(m.clone()).is_ok())
            .ok_or_else(|| ConfigError::InvalidConfig(format!("invalid method {}", method_name)))?;

        let sql = conf.get_string("sql", "");
        if sql.is_empty() {
            return Err(ConfigError::MissingSql);
        }
        let template = Template::compile(&format!("{}{}", method, url), &sql)?;

        Ok(Endpoint {
            output_kind: conf.get_string("output_type", "list").parse()?,
            sql_kind: conf.get_string("sql_type", "query").parse()?,
            name_case: conf.get_string("output_converter", "lowercamel").parse()?,
            csv_name_case: conf.get_string("output_converter_csv", "screamingsnake").parse()?,
            params: parse_params(conf)?,
            param_defaults: parse_defaults(conf)?,
            output_map: parse_field_map(conf, "output_map")?,
            csv_map: parse_field_map(conf, "output_map_csv")?,
            url,
            method,
            template,
            format,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The url with `{name}` placeholders written as router captures.
    pub fn route_path(&self) -> String {
        self.url.replace('{', ":").replace('}', "")
    }

    pub fn sql_kind(&self) -> SqlKind {
        self.sql_kind
    }

    pub fn output_kind(&self) -> OutputKind {
        self.output_kind
    }

    pub fn output_map(&self) -> &HashMap<String, String> {
        &self.output_map
    }

    pub fn csv_map(&self) -> &HashMap<String, String> {
        &self.csv_map
    }

    pub fn name_case(&self) -> NameCase {
        self.name_case
    }

    pub fn csv_name_case(&self) -> NameCase {
        self.csv_name_case
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Merge defaults, then the JSON body, then the query string; later
    /// sources win key by key.
    pub fn context(&self, headers: HeaderMap, uri: &Uri, body: &[u8]) -> Result<RequestContext<'_>, AppError> {
        let mut values: Map<String, Value> = self
            .param_defaults
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        if !body.iter().all(u8::is_ascii_whitespace) {
            match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(fields)) => values.extend(fields),
                Ok(other) => {
                    return Err(AppError::BadRequest(format!(
                        "request body must be a JSON object, got {}",
                        path::kind_name(&other)
                    )))
                }
                Err(e) => return Err(AppError::BadRequest(format!("invalid request body: {}", e))),
            }
        }

        if let Some(query) = uri.query() {
            let pairs = parse_query(query).map_err(|e| AppError::BadRequest(format!("invalid query: {}", e)))?;
            values.extend(pairs.into_iter().map(|(k, v)| (k, Value::String(v))));
        }

        Ok(RequestContext::new(self, Value::Object(values), headers, uri.path()))
    }

    /// Run every param's validators in order; the first failure wins.
    pub fn validate(&self, ctx: &RequestContext<'_>) -> Result<(), ValidationError> {
        for param in &self.params {
            param.validate(&ctx.param(&param.name))?;
        }
        Ok(())
    }

    pub fn sql(&self, ctx: &RequestContext<'_>) -> Result<String, AppError> {
        let sql = self.format.apply(self.template.render(ctx)?);
        tracing::debug!("{}: {}", self.template.name(), sql);
        Ok(sql)
    }

    /// Encoder for this request. Statements always report a summary; queries
    /// switch to CSV when the `csv` flag is set.
    pub fn output<'c>(&self, ctx: &'c RequestContext<'c>) -> Box<dyn Output + 'c> {
        if self.sql_kind == SqlKind::Update {
            return Box::new(ExecOutput::new(ctx));
        }
        let kind = if ctx.flag("csv") { OutputKind::Csv } else { self.output_kind };
        match kind {
            OutputKind::List => Box::new(ListOutput::new(ctx)),
            OutputKind::Single => Box::new(SingleOutput::new(ctx)),
            OutputKind::Csv => Box::new(CsvOutput::new(ctx)),
        }
    }

    pub async fn handle(&self, db: &Database, headers: HeaderMap, uri: &Uri, body: &[u8]) -> Response {
        let ctx = match self.context(headers, uri, body) {
            Ok(ctx) => ctx,
            Err(e) => return e.into_response(),
        };
        if let Err(e) = self.validate(&ctx) {
            tracing::info!("{} {}: {}", self.method, uri, e);
            return AppError::from(e).into_response();
        }
        let mut output = self.output(&ctx);
        match self.sql_kind {
            SqlKind::Query => db.query(output.as_mut()).await,
            SqlKind::Update => db.exec(output.as_mut()).await,
        }
    }
}

/// Literal segments may not carry router syntax; a capture is a whole segment
/// `{name}` with a non-empty identifier.
fn check_url(url: &str) -> Result<(), ConfigError> {
    let invalid = |why: &str| Err(ConfigError::InvalidConfig(format!("api url {}: {}", url, why)));
    if !url.starts_with('/') {
        return invalid("must start with /");
    }
    for segment in url[1..].split('/') {
        if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return invalid("placeholder needs a name");
            }
        } else if segment.contains(['{', '}', ':', '*']) {
            return invalid("use {name} for path captures");
        }
    }
    Ok(())
}

fn parse_params(conf: &Conf) -> Result<Vec<ParamSpec>, ConfigError> {
    let mut params = Vec::new();
    for item in conf.iter("params")? {
        if let Some(param) = ParamSpec::parse(&item?.get_string("_", ""))? {
            params.push(param);
        }
    }
    Ok(params)
}

/// `param_defaults` is a query string (`a=1&b=2`) or a table.
fn parse_defaults(conf: &Conf) -> Result<Vec<(String, String)>, ConfigError> {
    match conf.get("param_defaults")?.value() {
        Value::Null => Ok(Vec::new()),
        Value::Object(table) => Ok(table.iter().map(|(k, v)| (k.clone(), path::to_text(v))).collect()),
        other => parse_query(&path::to_text(other))
            .map_err(|e| ConfigError::InvalidConfig(format!("param_defaults: {}", e))),
    }
}

fn parse_field_map(conf: &Conf, key: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut map = HashMap::new();
    for item in conf.iter(key)? {
        let entry = item?.get_string("_", "");
        if entry.is_empty() {
            continue;
        }
        let (column, name) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidConfig(format!("{} entry '{}' is not column: name", key, entry)))?;
        map.insert(column.to_string(), name.trim().to_string());
    }
    Ok(map)
}

/// Decode a query string; repeated keys keep their first value.
fn parse_query(query: &str) -> Result<Vec<(String, String)>, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    let mut seen = std::collections::HashSet::new();
    Ok(pairs.into_iter().filter(|(k, _)| seen.insert(k.clone())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint(extra: Value) -> Result<Endpoint, ConfigError> {
        let mut base = json!({
            "url": "/users",
            "sql": "select * from users where id = {{ Param \"id\" }}",
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut base, extra) {
            base.extend(extra);
        }
        Endpoint::new(&Conf::new(base), SqlFormat::default())
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn construction_applies_defaults() {
        let e = endpoint(json!({})).unwrap();
        assert_eq!(e.method(), Method::GET);
        assert_eq!(endpoint(json!({ "method": "post" })).unwrap().method(), Method::POST);
        assert_eq!(e.sql_kind(), SqlKind::Query);
        assert_eq!(e.output_kind(), OutputKind::List);
        assert_eq!(e.name_case(), NameCase::LowerCamel);
        assert_eq!(e.csv_name_case(), NameCase::ScreamingSnake);
        assert!(e.params().is_empty());
    }

    #[test]
    fn construction_rejects_bad_config() {
        assert!(matches!(
            Endpoint::new(&Conf::new(json!({ "sql": "select 1" })), SqlFormat::default()),
            Err(ConfigError::MissingUrl)
        ));
        assert!(matches!(
            Endpoint::new(&Conf::new(json!({ "url": "/a" })), SqlFormat::default()),
            Err(ConfigError::MissingSql)
        ));
        assert!(matches!(endpoint(json!({ "method": "FETCH" })), Err(ConfigError::InvalidConfig(_))));
        assert!(matches!(endpoint(json!({ "url": "users" })), Err(ConfigError::InvalidConfig(_))));
        for url in ["/a/{}", "/a/{ }", "/a/{id", "/a/x{id}", "/a/:id", "/a/*rest", "/a/b:c"] {
            assert!(
                matches!(endpoint(json!({ "url": url })), Err(ConfigError::InvalidConfig(_))),
                "{}",
                url
            );
        }
        assert!(endpoint(json!({ "url": "/a/{user_id}/b" })).is_ok());
        assert!(matches!(endpoint(json!({ "sql_type": "delete" })), Err(ConfigError::InvalidSqlType(_))));
        assert!(matches!(endpoint(json!({ "output_type": "xml" })), Err(ConfigError::InvalidOutputType(_))));
        assert!(matches!(endpoint(json!({ "output_converter": "pascal" })), Err(ConfigError::InvalidConfig(_))));
        assert!(matches!(endpoint(json!({ "output_map": ["no_colon"] })), Err(ConfigError::InvalidConfig(_))));
        assert!(matches!(endpoint(json!({ "params": ["id unknown"] })), Err(ConfigError::InvalidConfig(_))));
        assert!(matches!(endpoint(json!({ "sql": "{{ Nope \"x\" }}" })), Err(ConfigError::Template { .. })));
    }

    #[test]
    fn field_maps_trim_names() {
        let e = endpoint(json!({
            "output_map": ["user_id: uid ", ""],
            "output_map_csv": ["user_id:USER"],
        }))
        .unwrap();
        assert_eq!(e.output_map()["user_id"], "uid");
        assert_eq!(e.csv_map()["user_id"], "USER");
    }

    #[test]
    fn route_path_uses_captures() {
        let e = endpoint(json!({ "url": "/users/{id}/orders" })).unwrap();
        assert_eq!(e.route_path(), "/users/:id/orders");
    }

    #[test]
    fn query_wins_over_body_over_defaults() {
        let e = endpoint(json!({ "param_defaults": "x=0&y=d&y=ignored" })).unwrap();
        let ctx = e
            .context(HeaderMap::new(), &uri("/users?x=2"), br#"{"x":"1","z":{"k":"v"}}"#)
            .unwrap();
        assert_eq!(ctx.param("x"), "2");
        assert_eq!(ctx.param("y"), "d");
        assert_eq!(ctx.param("z.k"), "v");
        assert_eq!(ctx.path(), "/users");
    }

    #[test]
    fn defaults_may_be_a_table() {
        let e = endpoint(json!({ "param_defaults": { "limit": 10 } })).unwrap();
        let ctx = e.context(HeaderMap::new(), &uri("/users"), b"").unwrap();
        assert_eq!(ctx.param("limit"), "10");
    }

    #[test]
    fn body_must_be_an_object() {
        let e = endpoint(json!({})).unwrap();
        for body in [&b"[1]"[..], &b"{"[..], &b"\"x\""[..]] {
            let err = e.context(HeaderMap::new(), &uri("/users"), body).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{:?}", body);
        }
        assert!(e.context(HeaderMap::new(), &uri("/users"), b" \n").is_ok());
    }

    #[test]
    fn validation_runs_in_order() {
        let e = endpoint(json!({ "params": ["id required pattern:^\\d+$", "name"] })).unwrap();
        let ctx = e.context(HeaderMap::new(), &uri("/users"), b"").unwrap();
        assert_eq!(e.validate(&ctx), Err(ValidationError::ParamRequired("id".into())));
        let ctx = e.context(HeaderMap::new(), &uri("/users?id=x1"), b"").unwrap();
        assert_eq!(e.validate(&ctx), Err(ValidationError::ParamInvalid("id".into())));
        let ctx = e.context(HeaderMap::new(), &uri("/users?id=12"), b"").unwrap();
        assert!(e.validate(&ctx).is_ok());
    }

    #[test]
    fn nested_param_names_reach_into_the_body() {
        let e = endpoint(json!({ "params": ["user.id required"] })).unwrap();
        let ctx = e.context(HeaderMap::new(), &uri("/users"), br#"{"user":{"id":7}}"#).unwrap();
        assert!(e.validate(&ctx).is_ok());
    }

    #[test]
    fn sql_renders_helpers_and_formats() {
        let e = Endpoint::new(
            &Conf::new(json!({
                "url": "/users",
                "sql": "select *\n  from users\n  where name = {{ Param \"name\" | Quote }}\n    and tenant = {{ Header \"x-tenant\" | OrElse \"0\" }}",
            })),
            SqlFormat::SingleLine,
        )
        .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", "42".parse().unwrap());
        let ctx = e.context(headers, &uri("/users?name=bob"), b"").unwrap();
        assert_eq!(
            ctx.sql().unwrap(),
            "select * from users where name = 'bob' and tenant = 42"
        );
    }

    #[test]
    fn update_endpoints_ignore_the_csv_flag() {
        let e = endpoint(json!({ "sql_type": "update", "output_type": "single" })).unwrap();
        assert_eq!(e.sql_kind(), SqlKind::Update);
        let ctx = e.context(HeaderMap::new(), &uri("/users?csv=true"), b"").unwrap();
        let mut out = e.output(&ctx);
        out.affected(0, 3);
        assert_eq!(out.end().status(), axum::http::StatusCode::OK);
    }
}
