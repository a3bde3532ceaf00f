//! Error types for in-memory export resolution.
//!
//! Every failure carries the name of the module being resolved so a caller
//! can diagnose it without re-running the resolver.

use thiserror::Error;

/// Main error type for resolver operations.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The loader service returned no base address for the module
    #[error("Failed to load module: {module}")]
    ModuleLoad { module: String },

    /// The primary (DOS) header does not carry the `MZ` signature
    #[error("Invalid DOS signature in module: {module}")]
    InvalidDosSignature { module: String },

    /// The secondary (NT) header does not carry the `PE\0\0` signature
    #[error("Invalid NT signature in module: {module}")]
    InvalidNtSignature { module: String },

    /// The export data directory has a zero virtual address
    #[error("No export directory in module: {module}")]
    NoExportDirectory { module: String },

    /// The export scan finished without a single usable entry
    #[error("No exports resolved from module: {module}")]
    NoExportsResolved { module: String },

    /// Lookup of a name that is not in the export table
    #[error("Function {function} not found in module: {module}")]
    SymbolNotFound { function: String, module: String },

    /// A header structure lies outside the declared image size
    #[error("{what} at RVA {rva:#x} lies outside image of {size_of_image:#x} bytes in module: {module}")]
    OutOfImageBounds {
        module: String,
        what: &'static str,
        rva: u64,
        size_of_image: u32,
    },

    /// Resolver configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Name of the module the error refers to, if any.
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::ModuleLoad { module }
            | Self::InvalidDosSignature { module }
            | Self::InvalidNtSignature { module }
            | Self::NoExportDirectory { module }
            | Self::NoExportsResolved { module }
            | Self::SymbolNotFound { module, .. }
            | Self::OutOfImageBounds { module, .. } => Some(module),
            Self::Config(_) | Self::Io(_) => None,
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ImportError>;
