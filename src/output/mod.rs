//! Response encoders fed by the database executor.
//!
//! The executor drives one encoder per request, in order: `sql`, then either
//! `columns` / `row`* or `affected`, then `end`. On any failure `error` is called
//! instead of the remaining steps.

mod csv;
mod exec;
mod field;
mod list;

pub use self::csv::CsvOutput;
pub use exec::ExecOutput;
pub use field::{append_object, ColumnDesc, Field};
pub use list::{ListOutput, SingleOutput};

use crate::error::AppError;
use crate::response;
use axum::{http::StatusCode, response::Response};

pub trait Output: Send {
    /// The statement to run.
    fn sql(&self) -> Result<String, AppError>;

    fn columns(&mut self, _cols: &[ColumnDesc]) -> Result<(), AppError> {
        Ok(())
    }

    /// One result row; an empty buffer is a NULL or empty value.
    fn row(&mut self, _row: &[Vec<u8>]) -> Result<(), AppError> {
        Ok(())
    }

    fn affected(&mut self, _last_insert_id: i64, _rows_affected: u64) {}

    fn error(&mut self, err: AppError) -> Response {
        tracing::error!("request failed: {}", err);
        response::error(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    fn end(&mut self) -> Response;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Conf;
    use crate::service::Endpoint;
    use crate::sql::SqlFormat;
    use axum::http::{header, HeaderMap};
    use serde_json::json;

    fn endpoint(extra: serde_json::Value) -> Endpoint {
        let mut conf = json!({ "url": "/report", "sql": "select 1" });
        if let (Some(base), serde_json::Value::Object(extra)) = (conf.as_object_mut(), extra) {
            base.extend(extra);
        }
        Endpoint::new(&Conf::new(conf), SqlFormat::default()).unwrap()
    }

    async fn body(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn columns() -> Vec<ColumnDesc> {
        vec![ColumnDesc::new("id", "INT"), ColumnDesc::new("user_name", "VARCHAR")]
    }

    fn row(id: &str, name: &str) -> Vec<Vec<u8>> {
        vec![id.as_bytes().to_vec(), name.as_bytes().to_vec()]
    }

    #[tokio::test]
    async fn list_writes_sparse_objects() {
        let e = endpoint(json!({ "output_map": ["user_name: name"] }));
        let ctx = e.context(HeaderMap::new(), &"/report".parse().unwrap(), b"").unwrap();
        let mut out = ListOutput::new(&ctx);
        out.columns(&columns()).unwrap();
        out.row(&row("1", "a")).unwrap();
        out.row(&row("2", "")).unwrap();
        let resp = out.end();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body(resp).await, r#"[{"id":1,"name":"a"},{"id":2}]"#);
    }

    #[tokio::test]
    async fn empty_results_are_not_found() {
        let e = endpoint(json!({}));
        let ctx = e.context(HeaderMap::new(), &"/report".parse().unwrap(), b"").unwrap();

        let mut list = ListOutput::new(&ctx);
        list.columns(&columns()).unwrap();
        let resp = list.end();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(resp).await, response::NOT_FOUND_BODY);

        let mut single = SingleOutput::new(&ctx);
        single.columns(&columns()).unwrap();
        let resp = single.end();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(resp).await, response::NOT_FOUND_BODY);
    }

    #[tokio::test]
    async fn single_keeps_only_the_first_row() {
        let e = endpoint(json!({ "output_type": "single" }));
        let ctx = e.context(HeaderMap::new(), &"/report".parse().unwrap(), b"").unwrap();
        let mut out = SingleOutput::new(&ctx);
        out.columns(&columns()).unwrap();
        out.row(&row("1", "a")).unwrap();
        out.row(&row("2", "b")).unwrap();
        let resp = out.end();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(resp).await, r#"{"id":1,"userName":"a"}"#);
    }

    #[tokio::test]
    async fn exec_reports_affected_rows() {
        let e = endpoint(json!({ "sql_type": "update" }));
        let ctx = e.context(HeaderMap::new(), &"/report".parse().unwrap(), b"").unwrap();

        let mut out = ExecOutput::new(&ctx);
        out.affected(0, 5);
        assert_eq!(body(out.end()).await, r#"{"rowsAffected":5}"#);

        let mut out = ExecOutput::new(&ctx);
        out.affected(17, 1);
        assert_eq!(body(out.end()).await, r#"{"lastInsertId":17,"rowsAffected":1}"#);
    }

    #[tokio::test]
    async fn csv_uses_its_own_names_and_raw_values() {
        let e = endpoint(json!({
            "output_map": ["user_name: name"],
            "output_map_csv": ["id: Id"],
        }));
        let ctx = e
            .context(HeaderMap::new(), &"/report?filename=users".parse().unwrap(), b"")
            .unwrap();
        let mut out = CsvOutput::new(&ctx);
        out.columns(&columns()).unwrap();
        out.row(&row("1", "a, b")).unwrap();
        out.row(&row("2", "")).unwrap();
        let resp = out.end();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"users.csv\""
        );
        assert_eq!(body(resp).await, "Id,USER_NAME\n1,\"a, b\"\n2,\n");
    }

    #[tokio::test]
    async fn csv_flag_overrides_output_type() {
        let e = endpoint(json!({ "output_type": "single" }));
        let ctx = e.context(HeaderMap::new(), &"/report?csv=1".parse().unwrap(), b"").unwrap();
        let mut out = e.output(&ctx);
        out.columns(&columns()).unwrap();
        let resp = out.end();
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"/report.csv\""
        );
        assert_eq!(body(resp).await, "ID,USER_NAME\n");
    }

    #[tokio::test]
    async fn errors_use_the_envelope() {
        let e = endpoint(json!({}));
        let ctx = e.context(HeaderMap::new(), &"/report".parse().unwrap(), b"").unwrap();
        let mut out = ListOutput::new(&ctx);
        let resp = out.error(AppError::Render("boom".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(resp).await, r#"{"error":"render: boom"}"#);
    }
}
