//! Concurrent multi-metric query execution
//!
//! One task is spawned per catalog name matching the metric filter. Under
//! [`ErrorPolicy::FailFast`] the first backend error cancels the remaining
//! tasks and fails the batch; under [`ErrorPolicy::PerMetric`] the failure is
//! recorded on the metric and the batch continues.

use crate::backend::TimeSeriesBackend;
use crate::error::MonitoringError;
use crate::expressions::{Compiler, QueryOptions};
use crate::models::{Metric, MetricResult};
use crate::observability::MonitorMetrics;
use crate::timerange::TimeWindow;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// How a failing metric affects the rest of its batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The first failure aborts the batch
    #[default]
    FailFast,
    /// Failures are reported per metric
    PerMetric,
}

/// Fans out compiled expressions to a backend
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn TimeSeriesBackend>,
    compiler: Compiler,
    policy: ErrorPolicy,
    metrics: MonitorMetrics,
}

impl Executor {
    pub fn new(backend: Arc<dyn TimeSeriesBackend>, compiler: Compiler, policy: ErrorPolicy) -> Self {
        Self {
            backend,
            compiler,
            policy,
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Catalog names selected by the options' metric filter, in catalog order
    ///
    /// The filter must match the whole name.
    pub fn matched_metrics(&self, opts: &QueryOptions) -> Result<Vec<&'static str>, MonitoringError> {
        let pattern = Regex::new(&format!("^(?:{})$", opts.metric_filter)).map_err(|source| {
            MonitoringError::InvalidFilter {
                filter: opts.metric_filter.clone(),
                source,
            }
        })?;

        Ok(self
            .compiler
            .catalog()
            .names(opts.catalog_key())
            .iter()
            .copied()
            .filter(|name| pattern.is_match(name))
            .collect())
    }

    /// Run every matched metric of `opts` over `window`
    pub async fn execute(
        &self,
        opts: &QueryOptions,
        window: TimeWindow,
    ) -> Result<MetricResult, MonitoringError> {
        let names = self.matched_metrics(opts)?;
        let result_type = window.metric_type();
        let mut tasks = JoinSet::new();

        for name in names {
            let expr = self.compiler.compile(name, opts);
            if expr.is_empty() {
                continue;
            }
            let backend = Arc::clone(&self.backend);
            let metrics = self.metrics.clone();
            tasks.spawn(async move {
                let started = Instant::now();
                let outcome = match window {
                    TimeWindow::Instant(at) => backend.instant_query(&expr, at).await,
                    TimeWindow::Range { start, end, step } => {
                        backend.range_query(&expr, start, end, step).await
                    }
                };
                metrics.observe_backend_latency(started.elapsed().as_secs_f64());
                (name, outcome)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (name, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    cancel(&mut tasks).await;
                    return Err(MonitoringError::TaskFailed(e.to_string()));
                }
            };

            match outcome {
                Ok(mut data) => {
                    debug!(metric = %name, series = data.result.len(), "metric query completed");
                    data.result_type = result_type;
                    results.push(Metric::new(name, data));
                }
                Err(source) => {
                    self.metrics.inc_backend_errors();
                    match self.policy {
                        ErrorPolicy::FailFast => {
                            cancel(&mut tasks).await;
                            return Err(MonitoringError::Backend {
                                metric: name.to_string(),
                                source,
                            });
                        }
                        ErrorPolicy::PerMetric => {
                            warn!(metric = %name, error = %source, "metric query failed");
                            results.push(Metric::failed(name, result_type, source));
                        }
                    }
                }
            }
        }

        Ok(MetricResult::new(results))
    }

    /// Run one batch per option set and merge the batches by metric name
    ///
    /// The first group seeds the result; later groups append their series to
    /// a metric of the same name or append new metrics.
    pub async fn execute_grouped(
        &self,
        groups: &[QueryOptions],
        window: TimeWindow,
    ) -> Result<MetricResult, MonitoringError> {
        if let [single] = groups {
            return self.execute(single, window).await;
        }

        let mut tasks = JoinSet::new();
        for (index, opts) in groups.iter().cloned().enumerate() {
            let executor = self.clone();
            tasks.spawn(async move { (index, executor.execute(&opts, window).await) });
        }

        let mut batches: Vec<Option<MetricResult>> = vec![None; groups.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(batch))) => batches[index] = Some(batch),
                Ok((_, Err(e))) => {
                    cancel(&mut tasks).await;
                    return Err(e);
                }
                Err(e) => {
                    cancel(&mut tasks).await;
                    return Err(MonitoringError::TaskFailed(e.to_string()));
                }
            }
        }

        Ok(merge_by_name(batches.into_iter().flatten()))
    }
}

async fn cancel<T: 'static>(tasks: &mut JoinSet<T>) {
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}
}

fn merge_by_name(batches: impl IntoIterator<Item = MetricResult>) -> MetricResult {
    let mut merged: Vec<Metric> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for batch in batches {
        for metric in batch.results {
            match index.get(&metric.metric_name) {
                Some(&i) => {
                    let existing = &mut merged[i];
                    existing.data.result.extend(metric.data.result);
                    if existing.error.is_none() {
                        existing.error = metric.error;
                    }
                }
                None => {
                    index.insert(metric.metric_name.clone(), merged.len());
                    merged.push(metric);
                }
            }
        }
    }

    MetricResult::new(merged)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::expressions::{Catalog, ComponentType, MeterOptions, Scope, WorkloadGroup};
    use crate::models::{MetricData, MetricType, MetricValue, Point};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Backend answering every query with one sample labelled by the expression
    #[derive(Default)]
    pub(crate) struct MockBackend {
        pub fail_when_contains: Option<String>,
        pub seen: Mutex<Vec<String>>,
    }

    impl MockBackend {
        pub(crate) fn failing_on(fragment: &str) -> Self {
            Self {
                fail_when_contains: Some(fragment.to_string()),
                ..Default::default()
            }
        }

        fn answer(&self, expr: &str, result_type: MetricType) -> Result<MetricData, BackendError> {
            self.seen.lock().unwrap().push(expr.to_string());
            if let Some(fragment) = &self.fail_when_contains {
                if expr.contains(fragment.as_str()) {
                    return Err(BackendError::Query {
                        error_type: "execution".into(),
                        message: "mock failure".into(),
                    });
                }
            }
            let mut labels = BTreeMap::new();
            labels.insert("expr".to_string(), expr.to_string());
            let value = match result_type {
                MetricType::Vector => MetricValue::with_sample(labels, Point::new(1.0, 1.0)),
                MetricType::Matrix => {
                    MetricValue::with_series(labels, vec![Point::new(1.0, 1.0), Point::new(2.0, 3.0)])
                }
            };
            Ok(MetricData {
                result_type,
                result: vec![value],
            })
        }
    }

    #[async_trait]
    impl TimeSeriesBackend for MockBackend {
        async fn instant_query(&self, expr: &str, _at: DateTime<Utc>) -> Result<MetricData, BackendError> {
            self.answer(expr, MetricType::Vector)
        }

        async fn range_query(
            &self,
            expr: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _step: Duration,
        ) -> Result<MetricData, BackendError> {
            self.answer(expr, MetricType::Matrix)
        }
    }

    fn executor(backend: MockBackend, policy: ErrorPolicy) -> Executor {
        Executor::new(
            Arc::new(backend),
            Compiler::new(Arc::new(Catalog::new())),
            policy,
        )
    }

    fn now() -> TimeWindow {
        TimeWindow::Instant(Utc.timestamp_opt(1585836666, 0).unwrap())
    }

    #[test]
    fn test_component_query_selects_whole_catalog() {
        let exec = executor(MockBackend::default(), ErrorPolicy::FailFast);
        let opts = QueryOptions::new(Scope::Component(ComponentType::Etcd));
        let names = exec.matched_metrics(&opts).unwrap();
        let catalog = Catalog::new();
        assert_eq!(
            names,
            catalog.names(crate::expressions::CatalogKey::Component(ComponentType::Etcd))
        );
    }

    #[test]
    fn test_metric_filter_is_anchored() {
        let exec = executor(MockBackend::default(), ErrorPolicy::FailFast);
        let opts = QueryOptions::new(Scope::Node { node: None })
            .with_metric_filter("node_cpu_usage|node_load1");
        assert_eq!(
            exec.matched_metrics(&opts).unwrap(),
            vec!["node_cpu_usage", "node_load1"]
        );
    }

    #[test]
    fn test_invalid_metric_filter() {
        let exec = executor(MockBackend::default(), ErrorPolicy::FailFast);
        let opts = QueryOptions::new(Scope::Cluster).with_metric_filter("cluster_(");
        assert!(matches!(
            exec.matched_metrics(&opts),
            Err(MonitoringError::InvalidFilter { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_every_matched_metric() {
        let exec = executor(MockBackend::default(), ErrorPolicy::FailFast);
        let opts = QueryOptions::new(Scope::Cluster).with_metric_filter("cluster_cpu_.*");
        let result = exec.execute(&opts, now()).await.unwrap();

        let mut names: Vec<_> = result.results.iter().map(|m| m.metric_name.as_str()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["cluster_cpu_total", "cluster_cpu_usage", "cluster_cpu_utilisation"]
        );
        assert!(result
            .results
            .iter()
            .all(|m| m.data.result_type == MetricType::Vector));
    }

    #[tokio::test]
    async fn test_range_window_yields_matrix() {
        let exec = executor(MockBackend::default(), ErrorPolicy::FailFast);
        let opts = QueryOptions::new(Scope::Cluster).with_metric_filter("cluster_cpu_usage");
        let window = TimeWindow::Range {
            start: Utc.timestamp_opt(0, 0).unwrap(),
            end: Utc.timestamp_opt(600, 0).unwrap(),
            step: Duration::minutes(1),
        };
        let result = exec.execute(&opts, window).await.unwrap();
        assert_eq!(result.results[0].data.result_type, MetricType::Matrix);
        assert!(result.results[0].data.result[0].series.is_some());
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let exec = executor(
            MockBackend::failing_on("node_num_cpu"),
            ErrorPolicy::FailFast,
        );
        let opts = QueryOptions::new(Scope::Cluster).with_metric_filter("cluster_cpu_.*");
        let err = exec.execute(&opts, now()).await.unwrap_err();
        assert!(matches!(err, MonitoringError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_per_metric_policy_records_errors() {
        let exec = executor(
            MockBackend::failing_on("cluster:pod:sum"),
            ErrorPolicy::PerMetric,
        );
        let opts = QueryOptions::new(Scope::Cluster)
            .with_metric_filter("cluster_pod_count|cluster_cpu_total");
        let result = exec.execute(&opts, now()).await.unwrap();

        let failed = result.metric("cluster_pod_count").unwrap();
        assert!(failed.is_failed());
        assert!(failed.data.result.is_empty());
        assert!(!result.metric("cluster_cpu_total").unwrap().is_failed());
    }

    #[tokio::test]
    async fn test_grouped_execution_merges_by_name() {
        let exec = executor(MockBackend::default(), ErrorPolicy::FailFast);
        let group = |name: &str| {
            QueryOptions::new(Scope::Application(WorkloadGroup {
                namespace: "bookinfo".into(),
                name: name.into(),
                workloads: vec![format!("Deployment:{name}")],
                pvcs: vec![],
            }))
            .with_meter(MeterOptions::default())
            .with_metric_filter("meter_application_cpu_usage")
        };

        let result = exec
            .execute_grouped(&[group("reviews"), group("ratings")], now())
            .await
            .unwrap();

        assert_eq!(result.results.len(), 1);
        let values = &result.results[0].data.result;
        assert_eq!(values.len(), 2);
        assert!(values[0].labels["expr"].contains("reviews"));
        assert!(values[1].labels["expr"].contains("ratings"));
    }
}
