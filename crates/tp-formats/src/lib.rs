//! Module file loaders for trackplay.
//!
//! Each loader decodes a file image into a validated [`tp_ir::Module`].

mod mod_format;

pub use mod_format::load_mod;

use tp_ir::ModuleError;

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// File is shorter than the fixed header
    #[error("file too short for a module header ({len} bytes)")]
    TooShort { len: usize },
    /// A pattern referenced by the order list is cut off
    #[error("pattern {index} is truncated")]
    TruncatedPattern { index: usize },
    /// Decoded module is structurally unplayable
    #[error("invalid module: {0}")]
    Invalid(#[from] ModuleError),
}
