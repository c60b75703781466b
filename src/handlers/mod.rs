//! HTTP handlers for configured endpoints.

pub mod endpoint;
pub use endpoint::*;
