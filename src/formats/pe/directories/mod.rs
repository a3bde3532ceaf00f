//! Data directory parsers

pub mod export;

pub use export::{resolve, ExportEntry, ExportTable};
