pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::OerGraphError;
pub use text::{collapse_line_breaks, normalize_field, slugify};
pub use types::*;
