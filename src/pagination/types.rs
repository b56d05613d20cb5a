//! Pagination types and traits
//!
//! Defines the offset-cursor core shared by every strategy.

use crate::error::{Error, Result};
use serde_json::Value;

/// Outcome of processing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Another page should be fetched
    HasMore,
    /// Terminal: no further requests for this resource
    Exhausted,
}

impl PageState {
    /// Check if we should continue
    pub fn has_more(&self) -> bool {
        matches!(self, Self::HasMore)
    }

    /// Check if pagination is complete
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Tracks pagination state during one sync of one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Offset of the page to request next
    pub offset: u64,
    /// Pages processed so far
    pub pages_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state at offset 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Current state of the machine
    pub fn page_state(&self) -> PageState {
        if self.done {
            PageState::Exhausted
        } else {
            PageState::HasMore
        }
    }

    /// Move to the next page; the offset never decreases
    pub fn advance(&mut self, page_size: u64, total: u64) -> PageState {
        self.pages_fetched += 1;

        let next_offset = self.offset + page_size;
        if next_offset < total {
            self.offset = next_offset;
            PageState::HasMore
        } else {
            self.mark_done();
            PageState::Exhausted
        }
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Query parameters selecting the page described by `state`
    fn page_params(&self, state: &PaginationState) -> Vec<(String, String)>;

    /// Process a page body and decide whether another page follows
    fn process_response(&self, body: &Value, state: &mut PaginationState) -> Result<PageState>;
}

/// Read a non-negative integer count from a JSON value
pub(crate) fn read_count(value: Option<&Value>, what: &str) -> Result<u64> {
    let value = value.ok_or_else(|| Error::pagination(format!("missing '{what}'")))?;

    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| Error::pagination(format!("'{what}' is not a count: {value}")))
}
