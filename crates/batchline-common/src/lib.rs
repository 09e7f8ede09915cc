//! Batchline Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Batchline workspace.
//!
//! # Overview
//!
//! This crate provides functionality used by every Batchline workspace member:
//!
//! - **Error Handling**: Common error type and result alias
//! - **Fingerprints**: Stable SHA-256 digests used to identify job instances
//! - **Logging**: `tracing` subscriber setup shared by the server and the CLI
//! - **Pagination**: Page requests and page results for record queries
//!
//! # Example
//!
//! ```no_run
//! use batchline_common::fingerprint::Fingerprint;
//!
//! let key = Fingerprint::of_str("run.id=1;timestamp=1700000000000");
//! assert_eq!(key.as_str().len(), 64);
//! ```

pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod pagination;

// Re-export commonly used types
pub use error::{BatchlineError, Result};
pub use pagination::{Page, PageRequest, SortDirection};
