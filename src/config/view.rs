//! Typed, logging view over a value tree.

use crate::error::PathError;
use crate::path;
use serde_json::Value;
use std::fmt::Display;

/// A read-only node of the configuration tree. Typed getters never fail: a
/// resolution error is logged and the default returned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conf {
    data: Value,
}

impl Conf {
    pub fn new(data: Value) -> Self {
        Conf { data }
    }

    pub fn value(&self) -> &Value {
        &self.data
    }

    /// Sub-view at `expr`; absent resolves to an empty view.
    pub fn get(&self, expr: &str) -> Result<Conf, PathError> {
        match path::get(&self.data, expr) {
            Ok(v) => Ok(Conf::new(v.cloned().unwrap_or(Value::Null))),
            Err(e) => {
                tracing::warn!("fail to evaluate value of {}: {}", expr, e);
                Err(e)
            }
        }
    }

    pub fn get_string(&self, expr: &str, default: &str) -> String {
        let v = or_default(expr, path::get_string(&self.data, expr, default), default.to_string());
        if v.is_empty() {
            default.to_string()
        } else {
            v
        }
    }

    pub fn get_int(&self, expr: &str, default: i32) -> i32 {
        or_default(expr, path::get_int(&self.data, expr, default), default)
    }

    pub fn get_long(&self, expr: &str, default: i64) -> i64 {
        or_default(expr, path::get_long(&self.data, expr, default), default)
    }

    pub fn get_bool(&self, expr: &str, default: bool) -> bool {
        or_default(expr, path::get_bool(&self.data, expr, default), default)
    }

    pub fn get_float(&self, expr: &str, default: f32) -> f32 {
        or_default(expr, path::get_float(&self.data, expr, default), default)
    }

    pub fn get_double(&self, expr: &str, default: f64) -> f64 {
        or_default(expr, path::get_double(&self.data, expr, default), default)
    }

    pub fn len(&self, expr: &str) -> Result<usize, PathError> {
        path::len(&self.data, expr)
    }

    /// Iterate the list at `expr`. Each step re-resolves `expr[i]`.
    pub fn iter(&self, expr: &str) -> Result<ConfIter<'_>, PathError> {
        let len = self.len(expr)?;
        Ok(ConfIter {
            conf: self,
            expr: expr.to_string(),
            len,
            index: 0,
        })
    }
}

fn or_default<T: Display>(expr: &str, result: Result<T, PathError>, default: T) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("fail to evaluate value of {}: {}, use default {}", expr, e, default);
        default
    })
}

/// Forward cursor over a list node. Restartable with [`ConfIter::reset`].
#[derive(Debug)]
pub struct ConfIter<'a> {
    conf: &'a Conf,
    expr: String,
    len: usize,
    index: usize,
}

impl ConfIter<'_> {
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

impl Iterator for ConfIter<'_> {
    type Item = Result<Conf, PathError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let expr = format!("{}[{}]", self.expr, self.index);
        self.index += 1;
        Some(self.conf.get(&expr))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ConfIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conf() -> Conf {
        Conf::new(json!({
            "port": "80x",
            "host": "",
            "db": { "max_open_conn": 8, "replace_newline_with_space": "true" },
            "api": [{ "url": "/a" }, { "url": "/b" }, { "url": "/c" }]
        }))
    }

    #[test]
    fn getters_fall_back_on_errors_and_empties() {
        let c = conf();
        assert_eq!(c.get_int("port", 3424), 3424);
        assert_eq!(c.get_string("host", "0.0.0.0"), "0.0.0.0");
        assert_eq!(c.get_int("db.max_open_conn", 3), 8);
        assert!(c.get_bool("db.replace_newline_with_space", false));
        assert_eq!(c.get_string("api[7].url", "none"), "none");
    }

    #[test]
    fn sub_views_resolve_relative_paths() {
        let db = conf().get("db").unwrap();
        assert_eq!(db.get_long("max_open_conn", 0), 8);
        assert_eq!(conf().get("missing").unwrap(), Conf::default());
    }

    #[test]
    fn iterator_walks_and_restarts() {
        let c = conf();
        let mut it = c.iter("api").unwrap();
        assert_eq!(it.len(), 3);
        let urls: Vec<String> = it.by_ref().map(|e| e.unwrap().get_string("url", "")).collect();
        assert_eq!(urls, ["/a", "/b", "/c"]);
        assert!(it.next().is_none());
        it.reset();
        assert_eq!(it.next().unwrap().unwrap().get_string("url", ""), "/a");
    }

    #[test]
    fn iterator_over_absent_list_is_empty() {
        let c = conf();
        assert_eq!(c.iter("params").unwrap().count(), 0);
        assert!(c.iter("db").is_err());
    }
}
