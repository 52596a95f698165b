//! Query scopes and platform component types

use crate::error::MonitoringError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The resource scope a metric query is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Cluster,
    Node,
    Workspace,
    Namespace,
    Workload,
    Pod,
    Container,
    PersistentVolumeClaim,
    Component,
    Application,
    Service,
}

impl Level {
    pub const ALL: [Level; 11] = [
        Level::Cluster,
        Level::Node,
        Level::Workspace,
        Level::Namespace,
        Level::Workload,
        Level::Pod,
        Level::Container,
        Level::PersistentVolumeClaim,
        Level::Component,
        Level::Application,
        Level::Service,
    ];

    /// Label that keys sort and page operations at this level
    ///
    /// Cluster and component results are not keyed by a resource and
    /// cannot be sorted.
    pub fn identifier(&self) -> Option<&'static str> {
        match self {
            Level::Cluster | Level::Component => None,
            Level::Node => Some("node"),
            Level::Workspace => Some("workspace"),
            Level::Namespace => Some("namespace"),
            Level::Workload => Some("workload"),
            Level::Pod => Some("pod"),
            Level::Container => Some("container"),
            Level::PersistentVolumeClaim => Some("persistentvolumeclaim"),
            Level::Application => Some("application"),
            Level::Service => Some("service"),
        }
    }

    /// Resource name used in request paths
    pub fn resource_name(&self) -> &'static str {
        match self {
            Level::Cluster => "cluster",
            Level::Node => "nodes",
            Level::Workspace => "workspaces",
            Level::Namespace => "namespaces",
            Level::Workload => "workloads",
            Level::Pod => "pods",
            Level::Container => "containers",
            Level::PersistentVolumeClaim => "persistentvolumeclaims",
            Level::Component => "components",
            Level::Application => "applications",
            Level::Service => "services",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_name())
    }
}

impl FromStr for Level {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_lowercase().as_str() {
            "cluster" => Level::Cluster,
            "node" | "nodes" => Level::Node,
            "workspace" | "workspaces" => Level::Workspace,
            "namespace" | "namespaces" => Level::Namespace,
            "workload" | "workloads" => Level::Workload,
            "pod" | "pods" => Level::Pod,
            "container" | "containers" => Level::Container,
            "pvc" | "persistentvolumeclaim" | "persistentvolumeclaims" => {
                Level::PersistentVolumeClaim
            }
            "component" | "components" => Level::Component,
            "application" | "applications" => Level::Application,
            "service" | "services" => Level::Service,
            _ => return Err(MonitoringError::InvalidLevel(s.to_string())),
        };
        Ok(level)
    }
}

/// Control-plane component whose own metric catalog is queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Etcd,
    ApiServer,
    Scheduler,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Etcd => "etcd",
            ComponentType::ApiServer => "apiserver",
            ComponentType::Scheduler => "scheduler",
        }
    }
}

impl FromStr for ComponentType {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "etcd" => Ok(ComponentType::Etcd),
            "apiserver" => Ok(ComponentType::ApiServer),
            "scheduler" => Ok(ComponentType::Scheduler),
            other => Err(MonitoringError::parse(
                "component",
                format!("unknown component {other:?}"),
            )),
        }
    }
}
