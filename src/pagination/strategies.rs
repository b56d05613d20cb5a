//! Pagination strategy implementations
//!
//! Every paginated resource uses `limit`/`offset` and stops once the next
//! offset reaches the total. The strategies only differ in where that total
//! lives in the page body. It is re-read on every page because server-side
//! filtering can change it between calls.

use super::types::{read_count, PageState, PaginationState, Paginator};
use crate::error::{Error, Result};
use serde_json::Value;

fn offset_params(state: &PaginationState, page_size: u64) -> Vec<(String, String)> {
    vec![
        ("limit".to_string(), page_size.to_string()),
        ("offset".to_string(), state.offset.to_string()),
    ]
}

// ============================================================================
// Count Field Pagination
// ============================================================================

/// Total read from a top-level count field
///
/// `{"campaigns": [...], "totalCount": 120}`
#[derive(Debug, Clone)]
pub struct CountFieldPaginator {
    /// Number of records per page
    pub page_size: u64,
    /// Field holding the total
    pub total_key: String,
}

impl CountFieldPaginator {
    /// Create a paginator reading `totalCount`
    pub fn new(page_size: u64) -> Self {
        Self::with_total_key(page_size, "totalCount")
    }

    /// Create a paginator reading a custom total field
    pub fn with_total_key(page_size: u64, total_key: impl Into<String>) -> Self {
        Self {
            page_size,
            total_key: total_key.into(),
        }
    }

    /// Total count reported by this page
    pub fn total(&self, body: &Value) -> Result<u64> {
        read_count(body.get(&self.total_key), &self.total_key)
    }
}

impl Paginator for CountFieldPaginator {
    fn page_params(&self, state: &PaginationState) -> Vec<(String, String)> {
        offset_params(state, self.page_size)
    }

    fn process_response(&self, body: &Value, state: &mut PaginationState) -> Result<PageState> {
        let total = self.total(body)?;
        Ok(state.advance(self.page_size, total))
    }
}

// ============================================================================
// Nested Results Pagination
// ============================================================================

/// Total read from each entry of a results list
///
/// `{"results": [{"totalResults": 40, ...}, {"totalResults": 42, ...}]}`
/// uses the largest per-result total; an empty list means nothing is left.
#[derive(Debug, Clone)]
pub struct ResultsPaginator {
    /// Number of records per page
    pub page_size: u64,
    /// Field holding the results list
    pub results_key: String,
    /// Per-result total field
    pub total_key: String,
}

impl ResultsPaginator {
    /// Create a paginator over `results[*].totalResults`
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size,
            results_key: "results".to_string(),
            total_key: "totalResults".to_string(),
        }
    }

    /// Largest total across the page's results
    pub fn total(&self, body: &Value) -> Result<u64> {
        let results = body
            .get(&self.results_key)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::pagination(format!("'{}' is missing or not a list", self.results_key))
            })?;

        results.iter().try_fold(0, |max, result| {
            let total = read_count(result.get(&self.total_key), &self.total_key)?;
            Ok(max.max(total))
        })
    }
}

impl Paginator for ResultsPaginator {
    fn page_params(&self, state: &PaginationState) -> Vec<(String, String)> {
        offset_params(state, self.page_size)
    }

    fn process_response(&self, body: &Value, state: &mut PaginationState) -> Result<PageState> {
        let total = self.total(body)?;
        Ok(state.advance(self.page_size, total))
    }
}

// ============================================================================
// Periodic Content Pagination
// ============================================================================

/// Total read from the first promoted link result of a periodic report
///
/// `{"promotedLinkResults": [{"totalResults": 7, ...}, ...]}`
#[derive(Debug, Clone)]
pub struct PeriodicContentPaginator {
    /// Number of records per page
    pub page_size: u64,
}

impl PeriodicContentPaginator {
    /// Create a new periodic content paginator
    pub fn new(page_size: u64) -> Self {
        Self { page_size }
    }

    /// Total reported by the first promoted link result
    pub fn total(&self, body: &Value) -> Result<u64> {
        let results = body
            .get("promotedLinkResults")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::pagination("'promotedLinkResults' is missing or not a list")
            })?;

        match results.first() {
            Some(first) => read_count(first.get("totalResults"), "totalResults"),
            None => Ok(0),
        }
    }
}

impl Paginator for PeriodicContentPaginator {
    fn page_params(&self, state: &PaginationState) -> Vec<(String, String)> {
        offset_params(state, self.page_size)
    }

    fn process_response(&self, body: &Value, state: &mut PaginationState) -> Result<PageState> {
        let total = self.total(body)?;
        Ok(state.advance(self.page_size, total))
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn page_params(&self, _state: &PaginationState) -> Vec<(String, String)> {
        Vec::new()
    }

    fn process_response(&self, _body: &Value, state: &mut PaginationState) -> Result<PageState> {
        state.pages_fetched += 1;
        state.mark_done();
        Ok(PageState::Exhausted)
    }
}
