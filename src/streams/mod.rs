//! Stream definitions
//!
//! ```text
//! marketers
//! ├── campaigns
//! │   ├── promoted_links
//! │   ├── promoted_link_daily_performance
//! │   └── section_daily_performance
//! └── budgets
//! ```
//!
//! Child streams are synced once per parent record, with the parent's
//! identifiers merged into the child's [`StreamContext`](crate::StreamContext).

mod definitions;
mod kind;

pub use definitions::{
    days_to_look_back, definition, BudgetsStream, CampaignsStream, MarketersStream,
    PromotedLinkDailyPerformanceStream, PromotedLinksStream, QueryParams,
    SectionDailyPerformanceStream, StreamDefinition, StreamSettings,
};
pub use kind::StreamKind;

#[cfg(test)]
mod tests;
