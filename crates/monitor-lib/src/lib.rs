//! Monitoring library for cluster metric and meter queries
//!
//! This crate provides the core functionality for:
//! - Compiling catalog templates into scoped PromQL expressions
//! - Resolving instant and range windows, clamped to namespace lifetimes
//! - Concurrent execution against a time-series backend
//! - Sorting, paging and fee aggregation of results
//! - Health checks and observability

pub mod backend;
pub mod error;
pub mod executor;
pub mod expressions;
pub mod health;
pub mod metadata;
pub mod models;
pub mod observability;
pub mod postprocess;
pub mod request;
pub mod service;
pub mod timerange;

pub use backend::{PrometheusBackend, TimeSeriesBackend};
pub use error::{BackendError, MetadataError, MonitoringError};
pub use executor::{ErrorPolicy, Executor};
pub use expressions::{Catalog, Compiler, ComponentType, Level, QueryOptions, Scope};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use metadata::{KubeNamespaceProvider, ResourceMetadataProvider};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use request::{MonitoringRequest, ResolvedQuery};
pub use service::MonitoringService;
pub use timerange::TimeWindow;
