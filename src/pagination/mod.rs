//! Pagination module
//!
//! Supports: count field, nested results, periodic content, none
//!
//! # Overview
//!
//! All paginated endpoints use `limit`/`offset`. Each strategy is a small
//! state machine over [`PaginationState`]: after every page the next offset
//! is computed first and then compared with a total freshly read from that
//! page. `HasMore` holds while `next_offset < total`; `Exhausted` is terminal.

mod strategies;
mod types;

pub use strategies::{
    CountFieldPaginator, NoPaginator, PeriodicContentPaginator, ResultsPaginator,
};
pub use types::{PageState, PaginationState, Paginator};
