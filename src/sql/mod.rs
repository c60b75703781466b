//! SQL text production: template rendering and whitespace post-processing.

pub mod format;
pub mod template;

pub use format::SqlFormat;
pub use template::{Helpers, Template};
