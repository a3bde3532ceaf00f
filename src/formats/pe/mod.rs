//! PE image support for modules already mapped in memory

pub mod directories;
pub mod headers;
pub mod types;

pub use directories::{resolve, ExportEntry, ExportTable};
pub use headers::validate;
pub use types::*;
