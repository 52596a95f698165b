//! Error types for query compilation, execution and backend access

use thiserror::Error;

/// Errors surfaced by the monitoring query pipeline
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// A time, duration or integer parameter could not be parsed
    #[error("invalid parameter {param}: {reason}")]
    Parse { param: &'static str, reason: String },

    /// `time` mixed with `start`/`end`, or only one of `start`/`end` given
    #[error("time and start/end are mutually exclusive; start and end must be given together")]
    ParamConflict,

    #[error("start time must not be after end time")]
    InvalidStartEnd,

    #[error("page must be a positive integer, got {0:?}")]
    InvalidPage(String),

    #[error("limit must be a positive integer, got {0:?}")]
    InvalidLimit(String),

    #[error("unknown monitoring level: {0}")]
    InvalidLevel(String),

    #[error("invalid metric filter {filter:?}: {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: regex::Error,
    },

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A single backend query failed and the batch was abandoned
    #[error("query for {metric} failed: {source}")]
    Backend {
        metric: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to read resource metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("query task failed: {0}")]
    TaskFailed(String),
}

impl MonitoringError {
    /// Whether the error was caused by the caller's parameters
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            MonitoringError::Parse { .. }
                | MonitoringError::ParamConflict
                | MonitoringError::InvalidStartEnd
                | MonitoringError::InvalidPage(_)
                | MonitoringError::InvalidLimit(_)
                | MonitoringError::InvalidLevel(_)
                | MonitoringError::InvalidFilter { .. }
                | MonitoringError::MissingParameter(_)
        )
    }

    pub(crate) fn parse(param: &'static str, reason: impl Into<String>) -> Self {
        MonitoringError::Parse {
            param,
            reason: reason.into(),
        }
    }
}

/// Errors returned by a time-series backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend evaluated the expression and reported an error
    #[error("{error_type}: {message}")]
    Query { error_type: String, message: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

/// Errors returned by a resource metadata provider
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("kubernetes API error: {0}")]
    Api(String),
}
