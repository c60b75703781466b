//! Endpoint definitions, request values and parameter validation.

mod context;
mod endpoint;
mod validation;

pub use context::RequestContext;
pub use endpoint::{Endpoint, OutputKind, SqlKind};
pub use validation::{ParamSpec, Validator};
