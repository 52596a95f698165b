//! Result post-processing: sort, page, aggregate
//!
//! All steps mutate a [`MetricResult`](crate::models::MetricResult) in place
//! and only touch vector metrics without an error.

pub mod aggregate;
pub mod page;
pub mod sort;

pub use aggregate::{Aggregator, MeterClass, UNKNOWN_FEE};
pub use page::page;
pub use sort::sort;

use crate::error::MonitoringError;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` sorts ascending; anything else descending
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Sort target plus the page window to cut afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortParams {
    pub target: String,
    pub order: SortOrder,
    pub page: usize,
    pub limit: usize,
}

impl SortParams {
    /// Parse sort and page parameters
    ///
    /// Returns `None` when no sort target is named; `page` and `limit` are
    /// then ignored.
    pub fn parse(
        sort_metric: Option<&str>,
        sort_type: Option<&str>,
        page: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Option<Self>, MonitoringError> {
        let Some(target) = sort_metric.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let page = match page {
            Some(raw) => positive(raw).ok_or_else(|| MonitoringError::InvalidPage(raw.to_string()))?,
            None => DEFAULT_PAGE,
        };
        let limit = match limit {
            Some(raw) => positive(raw).ok_or_else(|| MonitoringError::InvalidLimit(raw.to_string()))?,
            None => DEFAULT_LIMIT,
        };

        Ok(Some(Self {
            target: target.to_string(),
            order: SortOrder::parse(sort_type),
            page,
            limit,
        }))
    }
}

fn positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|v| *v > 0)
}
