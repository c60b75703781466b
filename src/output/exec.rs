//! Statement summary encoder.

use super::Output;
use crate::error::AppError;
use crate::response;
use crate::service::RequestContext;
use axum::{http::StatusCode, response::Response};

/// `{"lastInsertId":N,"rowsAffected":M}`; the id is omitted unless positive.
pub struct ExecOutput<'a> {
    ctx: &'a RequestContext<'a>,
    last_insert_id: i64,
    rows_affected: u64,
}

impl<'a> ExecOutput<'a> {
    pub fn new(ctx: &'a RequestContext<'a>) -> Self {
        ExecOutput {
            ctx,
            last_insert_id: 0,
            rows_affected: 0,
        }
    }
}

impl Output for ExecOutput<'_> {
    fn sql(&self) -> Result<String, AppError> {
        self.ctx.sql()
    }

    fn affected(&mut self, last_insert_id: i64, rows_affected: u64) {
        self.last_insert_id = last_insert_id;
        self.rows_affected = rows_affected;
    }

    fn end(&mut self) -> Response {
        let body = if self.last_insert_id > 0 {
            format!(
                r#"{{"lastInsertId":{},"rowsAffected":{}}}"#,
                self.last_insert_id, self.rows_affected
            )
        } else {
            format!(r#"{{"rowsAffected":{}}}"#, self.rows_affected)
        };
        response::json(StatusCode::OK, body)
    }
}
