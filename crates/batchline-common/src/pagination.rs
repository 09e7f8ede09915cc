//! Shared pagination types
//!
//! Record queries page through results with a zero-based page index and a
//! bounded page size.
//!
//! # Examples
//!
//! ```rust
//! use batchline_common::pagination::{Page, PageRequest};
//!
//! let request = PageRequest::new(Some(2), Some(20)).unwrap();
//! assert_eq!(request.offset(), 40);
//!
//! let page: Page<u32> = Page::new(vec![1, 2, 3], &request, 43);
//! assert_eq!(page.total_pages, 3);
//! assert!(!page.has_next);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BatchlineError, Result};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Validated page request (zero-based page index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Build a page request, applying defaults for missing values
    pub fn new(page: Option<u32>, size: Option<u32>) -> Result<Self> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(BatchlineError::InvalidPage(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            page: page.unwrap_or(0),
            size,
        })
    }

    /// Row offset of the first item on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Sort direction for ordered listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = BatchlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(BatchlineError::Parse(format!("Invalid sort direction: {}", s))),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// One page of results plus navigation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let size = u64::from(request.size);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(size) };

        Self {
            items,
            page: request.page,
            size: request.size,
            total,
            total_pages,
            has_next: u64::from(request.page) + 1 < total_pages,
            has_prev: request.page > 0,
        }
    }

    /// Convert the items while keeping the page metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}
