pub mod loader;
pub mod types;
pub mod view;

pub use loader::*;
pub use types::*;
pub use view::*;
