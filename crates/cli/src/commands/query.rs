//! Metric query command

use anyhow::Result;
use clap::Args;
use monitor_lib::{Level, MonitoringRequest};

use crate::client::ApiClient;
use crate::output::{print_result, OutputFormat};

/// Time, sort, filter and scope options shared by queries and meters
#[derive(Debug, Clone, Default, Args)]
pub struct QueryArgs {
    /// Instant to evaluate at (unix seconds)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub time: Option<String>,

    /// Range start (unix seconds)
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Range end (unix seconds)
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Range resolution, e.g. 10m or 1h
    #[arg(long)]
    pub step: Option<String>,

    /// Metric to sort and page by
    #[arg(long)]
    pub sort_metric: Option<String>,

    /// Sort order (asc or desc)
    #[arg(long)]
    pub sort_type: Option<String>,

    #[arg(long)]
    pub page: Option<String>,

    #[arg(long)]
    pub limit: Option<String>,

    /// Regular expression selecting metric names
    #[arg(long, short = 'm')]
    pub metrics_filter: Option<String>,

    /// Regular expression selecting resource names
    #[arg(long, short = 'r')]
    pub resources_filter: Option<String>,

    #[arg(long)]
    pub node: Option<String>,

    #[arg(long)]
    pub workspace: Option<String>,

    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Workload kind (deployment, statefulset, daemonset)
    #[arg(long)]
    pub kind: Option<String>,

    #[arg(long)]
    pub workload: Option<String>,

    #[arg(long)]
    pub pod: Option<String>,

    #[arg(long)]
    pub container: Option<String>,

    #[arg(long)]
    pub pvc: Option<String>,

    #[arg(long)]
    pub storageclass: Option<String>,

    /// Control-plane component (etcd, apiserver, scheduler)
    #[arg(long)]
    pub component: Option<String>,

    /// Application groups: name:workload1|workload2[:pvc1|pvc2],...
    #[arg(long)]
    pub applications: Option<String>,

    /// Service groups: name:workload1|workload2,...
    #[arg(long)]
    pub services: Option<String>,
}

impl QueryArgs {
    /// Fill in the namespace from configuration when none was given
    pub fn with_default_namespace(mut self, namespace: Option<&str>) -> Self {
        if self.namespace.is_none() {
            self.namespace = namespace.map(str::to_string);
        }
        self
    }

    pub fn into_request(self) -> MonitoringRequest {
        MonitoringRequest {
            time: self.time,
            start: self.start,
            end: self.end,
            step: self.step,
            sort_metric: self.sort_metric,
            sort_type: self.sort_type,
            page: self.page,
            limit: self.limit,
            metrics_filter: self.metrics_filter,
            resources_filter: self.resources_filter,
            node: self.node,
            workspace: self.workspace,
            namespace: self.namespace,
            kind: self.kind,
            workload: self.workload,
            pod: self.pod,
            container: self.container,
            pvc: self.pvc,
            storageclass: self.storageclass,
            component: self.component,
            applications: self.applications,
            services: self.services,
            ..Default::default()
        }
    }
}

/// Parse a level name as used in request paths
pub fn parse_level(raw: &str) -> Result<Level, String> {
    raw.parse().map_err(|e: monitor_lib::MonitoringError| e.to_string())
}

pub async fn run_query(
    client: &ApiClient,
    level: Level,
    args: QueryArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = args.into_request();
    let result = client.query(level, &request).await?;
    print_result(&result, format, false)
}
