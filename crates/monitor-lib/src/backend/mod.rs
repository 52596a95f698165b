//! Time-series backend capability
//!
//! The executor only depends on [`TimeSeriesBackend`]; the Prometheus HTTP
//! implementation lives in [`prometheus`].

pub mod prometheus;

use crate::error::BackendError;
use crate::models::MetricData;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

pub use prometheus::PrometheusBackend;

/// Evaluates query expressions against stored time series
#[async_trait]
pub trait TimeSeriesBackend: Send + Sync {
    /// Evaluate `expr` at a single instant; yields a vector
    async fn instant_query(&self, expr: &str, at: DateTime<Utc>) -> Result<MetricData, BackendError>;

    /// Evaluate `expr` over `[start, end]` every `step`; yields a matrix
    async fn range_query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<MetricData, BackendError>;
}
