//! Error types shared across Batchline crates

use thiserror::Error;

/// Result type alias for Batchline operations
pub type Result<T> = std::result::Result<T, BatchlineError>;

/// Main error type for Batchline
#[derive(Error, Debug)]
pub enum BatchlineError {
    #[error("Invalid page request: {0}")]
    InvalidPage(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
