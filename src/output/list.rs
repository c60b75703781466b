//! JSON array and single-object encoders.

use super::{append_object, ColumnDesc, Field, Output};
use crate::error::AppError;
use crate::response;
use crate::service::RequestContext;
use axum::{http::StatusCode, response::Response};

fn json_fields(ctx: &RequestContext<'_>, cols: &[ColumnDesc]) -> Vec<Field> {
    let endpoint = ctx.endpoint();
    cols.iter()
        .map(|c| Field::new(c, endpoint.output_map(), endpoint.name_case()))
        .collect()
}

/// `[{...},{...}]`, or 404 `{"found": false}` when no rows came back.
pub struct ListOutput<'a> {
    ctx: &'a RequestContext<'a>,
    fields: Vec<Field>,
    buffer: Vec<u8>,
    rows: usize,
}

impl<'a> ListOutput<'a> {
    pub fn new(ctx: &'a RequestContext<'a>) -> Self {
        ListOutput {
            ctx,
            fields: Vec::new(),
            buffer: Vec::new(),
            rows: 0,
        }
    }
}

impl Output for ListOutput<'_> {
    fn sql(&self) -> Result<String, AppError> {
        self.ctx.sql()
    }

    fn columns(&mut self, cols: &[ColumnDesc]) -> Result<(), AppError> {
        self.fields = json_fields(self.ctx, cols);
        self.rows = 0;
        self.buffer.clear();
        self.buffer.push(b'[');
        Ok(())
    }

    fn row(&mut self, row: &[Vec<u8>]) -> Result<(), AppError> {
        if self.rows > 0 {
            self.buffer.push(b',');
        }
        self.rows += 1;
        append_object(&mut self.buffer, &self.fields, row);
        Ok(())
    }

    fn end(&mut self) -> Response {
        if self.rows == 0 {
            return response::not_found();
        }
        self.buffer.push(b']');
        response::json(StatusCode::OK, std::mem::take(&mut self.buffer))
    }
}

/// The first row as a bare object; later rows are ignored.
pub struct SingleOutput<'a> {
    ctx: &'a RequestContext<'a>,
    fields: Vec<Field>,
    buffer: Vec<u8>,
    seen: bool,
}

impl<'a> SingleOutput<'a> {
    pub fn new(ctx: &'a RequestContext<'a>) -> Self {
        SingleOutput {
            ctx,
            fields: Vec::new(),
            buffer: Vec::new(),
            seen: false,
        }
    }
}

impl Output for SingleOutput<'_> {
    fn sql(&self) -> Result<String, AppError> {
        self.ctx.sql()
    }

    fn columns(&mut self, cols: &[ColumnDesc]) -> Result<(), AppError> {
        self.fields = json_fields(self.ctx, cols);
        self.seen = false;
        self.buffer.clear();
        Ok(())
    }

    fn row(&mut self, row: &[Vec<u8>]) -> Result<(), AppError> {
        if !self.seen {
            self.seen = true;
            append_object(&mut self.buffer, &self.fields, row);
        }
        Ok(())
    }

    fn end(&mut self) -> Response {
        if !self.seen {
            return response::not_found();
        }
        response::json(StatusCode::OK, std::mem::take(&mut self.buffer))
    }
}
