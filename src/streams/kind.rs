//! Stream identifiers and the parent/child tree

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every stream the tap can sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Advertiser accounts (root)
    Marketers,
    /// Campaigns per marketer
    Campaigns,
    /// Budgets per marketer
    Budgets,
    /// Ads per campaign
    PromotedLinks,
    /// Daily metrics per promoted link
    PromotedLinkDailyPerformance,
    /// Daily metrics per publisher section
    SectionDailyPerformance,
}

impl StreamKind {
    /// All streams, parents before children
    pub const ALL: [StreamKind; 6] = [
        Self::Marketers,
        Self::Campaigns,
        Self::Budgets,
        Self::PromotedLinks,
        Self::PromotedLinkDailyPerformance,
        Self::SectionDailyPerformance,
    ];

    /// Stream name as used in state and output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketers => "marketers",
            Self::Campaigns => "campaigns",
            Self::Budgets => "budgets",
            Self::PromotedLinks => "promoted_links",
            Self::PromotedLinkDailyPerformance => "promoted_link_daily_performance",
            Self::SectionDailyPerformance => "section_daily_performance",
        }
    }

    /// Stream whose records provide this stream's context
    pub fn parent(&self) -> Option<StreamKind> {
        match self {
            Self::Marketers => None,
            Self::Campaigns | Self::Budgets => Some(Self::Marketers),
            Self::PromotedLinks
            | Self::PromotedLinkDailyPerformance
            | Self::SectionDailyPerformance => Some(Self::Campaigns),
        }
    }

    /// Streams synced once per record of this stream
    pub fn children(&self) -> Vec<StreamKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.parent() == Some(*self))
            .collect()
    }

    /// Streams with no parent
    pub fn roots() -> Vec<StreamKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.parent().is_none())
            .collect()
    }

    /// Check whether `self` is `other` or one of its ancestors
    pub fn is_ancestor_or_self(&self, other: StreamKind) -> bool {
        let mut current = Some(other);
        while let Some(kind) = current {
            if kind == *self {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::invalid_value("stream", format!("unknown stream '{s}'")))
    }
}
