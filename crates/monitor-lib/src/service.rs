//! Monitoring service facade
//!
//! Ties request resolution, namespace clamping, execution and
//! post-processing together:
//!
//! 1. resolve the request for its level
//! 2. clamp the window to the namespace's creation time, answering with
//!    empty metrics when the window predates the namespace
//! 3. execute every group and merge by metric name
//! 4. sort and page by the level's identifier
//! 5. aggregate statistics and fees for meters

use crate::error::{MetadataError, MonitoringError};
use crate::executor::Executor;
use crate::expressions::Level;
use crate::health::{components, HealthRegistry};
use crate::metadata::ResourceMetadataProvider;
use crate::models::{Metric, MetricResult, PriceInfo};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::postprocess::{self, Aggregator};
use crate::request::{MonitoringRequest, ResolvedQuery};
use crate::timerange::Clamp;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct MonitoringService {
    executor: Executor,
    metadata: Option<Arc<dyn ResourceMetadataProvider>>,
    health: Option<HealthRegistry>,
    default_price: PriceInfo,
    scaling: HashMap<String, f64>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl MonitoringService {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            metadata: None,
            health: None,
            default_price: PriceInfo::default(),
            scaling: HashMap::new(),
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new("monitoring"),
        }
    }

    /// Clamp namespace-scoped windows using `provider`
    pub fn with_metadata(mut self, provider: Arc<dyn ResourceMetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    /// Report backend and metadata health into `registry`
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Prices used when a meter request does not override them
    pub fn with_default_price(mut self, price: PriceInfo) -> Self {
        self.default_price = price;
        self
    }

    /// Scale the summed usage of `meter` before pricing
    pub fn with_scaling(mut self, meter: impl Into<String>, factor: f64) -> Self {
        self.scaling.insert(meter.into(), factor);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn default_price(&self) -> &PriceInfo {
        &self.default_price
    }

    /// Answer `request` at `level`, evaluating instants at the current time
    pub async fn query(
        &self,
        level: Level,
        request: &MonitoringRequest,
    ) -> Result<MetricResult, MonitoringError> {
        self.query_at(level, request, Utc::now()).await
    }

    /// Answer `request` at `level` with `now` as the default instant
    pub async fn query_at(
        &self,
        level: Level,
        request: &MonitoringRequest,
        now: DateTime<Utc>,
    ) -> Result<MetricResult, MonitoringError> {
        let started = Instant::now();
        let outcome = match request.resolve(level, now, &self.default_price) {
            Ok(resolved) => {
                let meter = resolved.is_meter();
                self.run(resolved).await.map(|result| (result, meter))
            }
            Err(e) => Err(e),
        };
        self.metrics
            .observe_query_duration(started.elapsed().as_secs_f64());

        let level_name = level.resource_name();
        match outcome {
            Ok((result, meter)) => {
                self.metrics.inc_queries(level_name, meter);
                self.logger.log_query(
                    level_name,
                    meter,
                    result.results.len(),
                    started.elapsed().as_millis(),
                );
                Ok(result)
            }
            Err(e) => {
                self.metrics.inc_query_failures(level_name);
                self.logger
                    .log_query_failure(level_name, &e.to_string(), e.is_bad_request());
                Err(e)
            }
        }
    }

    /// Execute an already resolved query
    pub async fn run(&self, resolved: ResolvedQuery) -> Result<MetricResult, MonitoringError> {
        let window = match self.clamp(&resolved).await? {
            Clamp::Hit(window) => window,
            Clamp::NoHit => {
                self.metrics.inc_nohit();
                return self.empty_result(&resolved);
            }
        };

        let executed = self.executor.execute_grouped(&resolved.groups, window).await;
        self.report_backend(&executed).await;
        let mut result = executed?;

        if let (Some(sort), Some(identifier)) = (&resolved.sort, resolved.level.identifier()) {
            postprocess::sort(&mut result, &sort.target, sort.order, identifier);
            postprocess::page(&mut result, sort.page, sort.limit);
        }

        if let Some(price) = resolved.price() {
            let aggregator = self
                .scaling
                .iter()
                .fold(Aggregator::new(price.clone()), |agg, (meter, factor)| {
                    agg.with_scaling(meter.clone(), *factor)
                });
            aggregator.aggregate(&mut result);
        }

        Ok(result)
    }

    async fn clamp(&self, resolved: &ResolvedQuery) -> Result<Clamp, MonitoringError> {
        let unclamped = Clamp::Hit(resolved.window);
        let (Some(provider), Some(namespace)) = (&self.metadata, resolved.namespace()) else {
            return Ok(unclamped);
        };

        match provider.namespace_creation_time(namespace).await {
            Ok(created) => {
                self.set_health(components::METADATA, None).await;
                let clamped = resolved.window.clamp_to_creation(created);
                if clamped == Clamp::NoHit {
                    debug!(namespace = %namespace, created = %created, "window predates namespace");
                }
                Ok(clamped)
            }
            Err(MetadataError::NotFound { .. }) => {
                debug!(namespace = %namespace, "namespace not found, window left unclamped");
                Ok(unclamped)
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "namespace lookup failed");
                self.set_health(components::METADATA, Some(e.to_string())).await;
                Err(e.into())
            }
        }
    }

    fn empty_result(&self, resolved: &ResolvedQuery) -> Result<MetricResult, MonitoringError> {
        let result_type = resolved.window.metric_type();
        let Some(first) = resolved.groups.first() else {
            return Ok(MetricResult::default());
        };
        let names = self.executor.matched_metrics(first)?;
        Ok(MetricResult::new(
            names
                .into_iter()
                .map(|name| Metric::empty(name, result_type))
                .collect(),
        ))
    }

    async fn report_backend(&self, outcome: &Result<MetricResult, MonitoringError>) {
        match outcome {
            Ok(_) => self.set_health(components::BACKEND, None).await,
            Err(e @ MonitoringError::Backend { .. }) => {
                self.set_health(components::BACKEND, Some(e.to_string())).await
            }
            Err(MonitoringError::TaskFailed(reason)) => {
                if let Some(health) = &self.health {
                    health.set_degraded(components::EXECUTOR, reason.clone()).await;
                }
            }
            Err(_) => {}
        }
    }

    async fn set_health(&self, component: &str, problem: Option<String>) {
        let Some(health) = &self.health else {
            return;
        };
        match problem {
            None => health.set_healthy(component).await,
            Some(message) => health.set_degraded(component, message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::MockBackend;
    use crate::executor::ErrorPolicy;
    use crate::expressions::{Catalog, CatalogKey, Compiler, ComponentType};
    use crate::health::ComponentStatus;
    use crate::models::MetricType;
    use crate::timerange::TimeWindow;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedNamespace {
        created: Result<i64, &'static str>,
    }

    #[async_trait]
    impl ResourceMetadataProvider for FixedNamespace {
        async fn namespace_creation_time(
            &self,
            namespace: &str,
        ) -> Result<DateTime<Utc>, MetadataError> {
            match self.created {
                Ok(secs) => Ok(Utc.timestamp_opt(secs, 0).unwrap()),
                Err("missing") => Err(MetadataError::NotFound {
                    kind: "namespace",
                    name: namespace.to_string(),
                }),
                Err(reason) => Err(MetadataError::Api(reason.to_string())),
            }
        }
    }

    fn service(backend: MockBackend) -> MonitoringService {
        service_with(Arc::new(backend))
    }

    fn service_with(backend: Arc<MockBackend>) -> MonitoringService {
        let executor = Executor::new(
            backend,
            Compiler::new(Arc::new(Catalog::new())),
            ErrorPolicy::FailFast,
        );
        MonitoringService::new(executor)
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1585839999, 0).unwrap()
    }

    fn namespace_request() -> MonitoringRequest {
        MonitoringRequest {
            namespace: Some("kubesphere-system".into()),
            metrics_filter: Some("namespace_cpu_usage|namespace_pod_count".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_nohit_returns_named_empty_metrics() {
        let backend = Arc::new(MockBackend::default());
        let svc = service_with(Arc::clone(&backend)).with_metadata(Arc::new(FixedNamespace {
            created: Ok(1585836666),
        }));
        let request = MonitoringRequest {
            time: Some("1585830000".into()),
            ..namespace_request()
        };

        let result = svc.query_at(Level::Namespace, &request, now()).await.unwrap();

        let names: Vec<_> = result.results.iter().map(|m| m.metric_name.as_str()).collect();
        assert_eq!(names, vec!["namespace_cpu_usage", "namespace_pod_count"]);
        assert!(result.results.iter().all(|m| m.data.result.is_empty()));
        assert!(result
            .results
            .iter()
            .all(|m| m.data.result_type == MetricType::Vector));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_is_clamped_before_execution() {
        let svc = service(MockBackend::default()).with_metadata(Arc::new(FixedNamespace {
            created: Ok(1585836666),
        }));
        let request = MonitoringRequest {
            start: Some("1585830000".into()),
            end: Some("1585839999".into()),
            step: Some("1m".into()),
            ..namespace_request()
        };

        let resolved = request
            .resolve(Level::Namespace, now(), &PriceInfo::default())
            .unwrap();
        match svc.clamp(&resolved).await.unwrap() {
            Clamp::Hit(TimeWindow::Range { start, end, .. }) => {
                assert_eq!(start.timestamp(), 1585836699);
                assert_eq!(end.timestamp(), 1585839999);
            }
            other => panic!("unexpected clamp {other:?}"),
        }

        let result = svc.query_at(Level::Namespace, &request, now()).await.unwrap();
        assert_eq!(result.results.len(), 2);
        assert!(result
            .results
            .iter()
            .all(|m| m.data.result_type == MetricType::Matrix));
    }

    #[tokio::test]
    async fn test_missing_namespace_is_not_clamped() {
        let backend = Arc::new(MockBackend::default());
        let svc = service_with(Arc::clone(&backend)).with_metadata(Arc::new(FixedNamespace {
            created: Err("missing"),
        }));
        let request = MonitoringRequest {
            time: Some("1585830000".into()),
            ..namespace_request()
        };

        let result = svc.query_at(Level::Namespace, &request, now()).await.unwrap();
        assert_eq!(result.results.len(), 2);
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_failure_propagates() {
        let health = HealthRegistry::new();
        let svc = service(MockBackend::default())
            .with_metadata(Arc::new(FixedNamespace {
                created: Err("connection refused"),
            }))
            .with_health(health.clone());

        let err = svc
            .query_at(Level::Namespace, &namespace_request(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitoringError::Metadata(_)));
        assert!(!err.is_bad_request());
        assert_eq!(
            health.health().await.components[components::METADATA].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_component_query_covers_catalog() {
        let svc = service(MockBackend::default());
        let request = MonitoringRequest {
            component: Some("etcd".into()),
            ..Default::default()
        };

        let result = svc.query_at(Level::Component, &request, now()).await.unwrap();

        let catalog = Catalog::new();
        let mut expected = catalog
            .names(CatalogKey::Component(ComponentType::Etcd))
            .to_vec();
        let mut names: Vec<_> = result.results.iter().map(|m| m.metric_name.as_str()).collect();
        expected.sort();
        names.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_meter_fee_is_computed() {
        let svc = service(MockBackend::default()).with_default_price(PriceInfo {
            cpu_per_core_per_hour: 3.0,
            ..Default::default()
        });
        let request = MonitoringRequest {
            meter: Some("true".into()),
            metrics_filter: Some("meter_cluster_cpu_usage".into()),
            ..Default::default()
        };

        let result = svc.query_at(Level::Cluster, &request, now()).await.unwrap();

        let value = &result.metric("meter_cluster_cpu_usage").unwrap().data.result[0];
        assert_eq!(value.sum_value, Some(1.0));
        assert_eq!(value.fee, Some(3.0));
        assert_eq!(value.resource_unit.as_deref(), Some("cores"));
        assert_eq!(value.currency_unit.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn test_scaling_is_applied_to_meters() {
        let svc = service(MockBackend::default())
            .with_default_price(PriceInfo {
                cpu_per_core_per_hour: 3.0,
                ..Default::default()
            })
            .with_scaling("meter_cluster_cpu_usage", 2.0);
        let request = MonitoringRequest {
            meter: Some("true".into()),
            metrics_filter: Some("meter_cluster_cpu_usage".into()),
            ..Default::default()
        };

        let result = svc.query_at(Level::Cluster, &request, now()).await.unwrap();
        let value = &result.results[0].data.result[0];
        assert_eq!(value.fee, Some(6.0));
    }

    #[tokio::test]
    async fn test_sort_and_page_are_applied() {
        let svc = service(MockBackend::default());
        let request = MonitoringRequest {
            metrics_filter: Some("node_cpu_usage|node_load1".into()),
            sort_metric: Some("node_cpu_usage".into()),
            limit: Some("1".into()),
            ..Default::default()
        };

        let result = svc.query_at(Level::Node, &request, now()).await.unwrap();
        assert_eq!(result.current_page, 1);
        assert!(result.results.iter().all(|m| m.data.result.len() <= 1));
    }

    #[tokio::test]
    async fn test_backend_failure_marks_backend_degraded() {
        let health = HealthRegistry::new();
        let svc = service(MockBackend::failing_on("node_load1")).with_health(health.clone());
        let request = MonitoringRequest {
            metrics_filter: Some("node_load1".into()),
            ..Default::default()
        };

        let err = svc.query_at(Level::Node, &request, now()).await.unwrap_err();
        assert!(matches!(err, MonitoringError::Backend { .. }));
        assert_eq!(
            health.health().await.components[components::BACKEND].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_bad_request_is_reported() {
        let svc = service(MockBackend::default());
        let request = MonitoringRequest {
            time: Some("1585831995".into()),
            start: Some("1585830000".into()),
            ..Default::default()
        };
        let err = svc.query_at(Level::Cluster, &request, now()).await.unwrap_err();
        assert!(matches!(err, MonitoringError::ParamConflict));
        assert!(err.is_bad_request());
    }
}
