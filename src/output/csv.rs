//! CSV download encoder.

use super::{ColumnDesc, Field, Output};
use crate::error::AppError;
use crate::response;
use crate::service::RequestContext;
use axum::{http::StatusCode, response::Response};

/// Header record from the CSV name map, then every value verbatim.
pub struct CsvOutput<'a> {
    ctx: &'a RequestContext<'a>,
    writer: Option<csv::Writer<Vec<u8>>>,
    filename: String,
}

impl<'a> CsvOutput<'a> {
    pub fn new(ctx: &'a RequestContext<'a>) -> Self {
        CsvOutput {
            ctx,
            writer: None,
            filename: String::new(),
        }
    }

    fn filename(&self) -> String {
        let name = self.ctx.param("filename");
        if name.is_empty() {
            self.ctx.path().to_string()
        } else {
            name
        }
    }
}

impl Output for CsvOutput<'_> {
    fn sql(&self) -> Result<String, AppError> {
        self.ctx.sql()
    }

    fn columns(&mut self, cols: &[ColumnDesc]) -> Result<(), AppError> {
        let endpoint = self.ctx.endpoint();
        let header = cols
            .iter()
            .map(|c| Field::new(c, endpoint.csv_map(), endpoint.csv_name_case()).name);
        self.filename = self.filename();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header)?;
        self.writer = Some(writer);
        Ok(())
    }

    fn row(&mut self, row: &[Vec<u8>]) -> Result<(), AppError> {
        match self.writer.as_mut() {
            Some(writer) => Ok(writer.write_record(row)?),
            None => Err(AppError::Render("csv row before columns".into())),
        }
    }

    fn end(&mut self) -> Response {
        let Some(writer) = self.writer.take() else {
            return response::csv_attachment(&self.filename(), Vec::new());
        };
        match writer.into_inner() {
            Ok(body) => response::csv_attachment(&self.filename, body),
            Err(e) => {
                let err = AppError::Encoding(csv::Error::from(e.into_error()));
                tracing::error!("csv flush failed: {}", err);
                response::error(StatusCode::INTERNAL_SERVER_ERROR, err)
            }
        }
    }
}
