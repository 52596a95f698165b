//! Scoped query options and selector resolution
//!
//! Each [`Scope`] variant carries the exact names and ancestor scope a level
//! accepts. [`Scope::apply`] turns a scope plus the resource filter into the
//! label-selector fragments the templates reference:
//! - exact names always win over the filter regex
//! - with neither, the filter defaults to `.*`
//! - workload and pod scopes follow the ownership chain

use super::catalog::CatalogKey;
use super::level::{ComponentType, Level};
use super::template::{Substitutions, Token};
use crate::models::PriceInfo;
use chrono::Duration;

/// Filter used when a request names no resource filter
pub const DEFAULT_FILTER: &str = ".*";

/// Default meter window
pub fn default_meter_step() -> Duration {
    Duration::hours(1)
}

/// Kind of a workload owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    /// Case-insensitive match on the kind name; anything else is unknown
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "deployment" | "deployments" => Some(WorkloadKind::Deployment),
            "statefulset" | "statefulsets" => Some(WorkloadKind::StatefulSet),
            "daemonset" | "daemonsets" => Some(WorkloadKind::DaemonSet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }

    /// Kind whose lowercase name appears in a template name
    pub fn named_in(metric: &str) -> Option<Self> {
        [
            WorkloadKind::Deployment,
            WorkloadKind::StatefulSet,
            WorkloadKind::DaemonSet,
        ]
        .into_iter()
        .find(|kind| metric.contains(kind.state_label()))
    }

    /// Label kube-state-metrics uses for objects of this kind
    fn state_label(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::DaemonSet => "daemonset",
        }
    }
}

/// A named set of workloads (and optionally volumes) metered as one unit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkloadGroup {
    pub namespace: String,
    pub name: String,
    /// Workloads as `Kind:name`
    pub workloads: Vec<String>,
    pub pvcs: Vec<String>,
}

/// Resource scope of a query, one variant per level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Cluster,
    Node {
        node: Option<String>,
    },
    Workspace {
        workspace: Option<String>,
    },
    Namespace {
        workspace: Option<String>,
        namespace: Option<String>,
    },
    Workload {
        namespace: String,
        kind: Option<WorkloadKind>,
    },
    Pod {
        namespace: Option<String>,
        node: Option<String>,
        workload_kind: Option<WorkloadKind>,
        workload: Option<String>,
        pod: Option<String>,
    },
    Container {
        namespace: String,
        pod: String,
        container: Option<String>,
    },
    PersistentVolumeClaim {
        namespace: Option<String>,
        storage_class: Option<String>,
        pvc: Option<String>,
    },
    Component(ComponentType),
    Application(WorkloadGroup),
    Service(WorkloadGroup),
}

/// Selector fragments and meter values derived from a scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelectors {
    /// Values for `$1`, `$2`, ... in order
    pub positional: Vec<String>,
    pub node_selector: Option<String>,
    pub instance_selector: Option<String>,
    pub app: Option<String>,
    pub svc: Option<String>,
    pub pvc: Option<String>,
}

impl ResolvedSelectors {
    fn positional(fragments: impl IntoIterator<Item = String>) -> Self {
        Self {
            positional: fragments.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Substitution map for template rendering
    pub fn substitutions(&self) -> Substitutions {
        let mut subs = Substitutions::new();
        for (i, fragment) in self.positional.iter().enumerate() {
            subs.set(Token::Positional((i + 1) as u8), fragment.clone());
        }
        let named = [
            (Token::NodeSelector, &self.node_selector),
            (Token::InstanceSelector, &self.instance_selector),
            (Token::App, &self.app),
            (Token::Svc, &self.svc),
            (Token::Pvc, &self.pvc),
        ];
        for (token, value) in named {
            if let Some(value) = value {
                subs.set(token, value.clone());
            }
        }
        subs
    }
}

/// Quote a label value for a PromQL string literal
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn exact(label: &str, value: &str) -> String {
    format!("{label}={}", quote(value))
}

fn matching(label: &str, regex: &str) -> String {
    format!("{label}=~{}", quote(regex))
}

/// `label="name"` when an exact name is set, else `label=~"filter"`
fn exact_or_filter(label: &str, name: Option<&str>, filter: &str) -> String {
    match name {
        Some(name) => exact(label, name),
        None => matching(label, filter),
    }
}

fn alternation(values: &[String]) -> String {
    values.join("|")
}

impl Scope {
    pub fn level(&self) -> Level {
        match self {
            Scope::Cluster => Level::Cluster,
            Scope::Node { .. } => Level::Node,
            Scope::Workspace { .. } => Level::Workspace,
            Scope::Namespace { .. } => Level::Namespace,
            Scope::Workload { .. } => Level::Workload,
            Scope::Pod { .. } => Level::Pod,
            Scope::Container { .. } => Level::Container,
            Scope::PersistentVolumeClaim { .. } => Level::PersistentVolumeClaim,
            Scope::Component(_) => Level::Component,
            Scope::Application(_) => Level::Application,
            Scope::Service(_) => Level::Service,
        }
    }

    /// The single namespace this scope is confined to, if any
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Scope::Namespace { namespace, .. } => namespace.as_deref(),
            Scope::Workload { namespace, .. } | Scope::Container { namespace, .. } => {
                Some(namespace.as_str())
            }
            Scope::Pod { namespace, .. } | Scope::PersistentVolumeClaim { namespace, .. } => {
                namespace.as_deref()
            }
            Scope::Application(group) | Scope::Service(group) => Some(group.namespace.as_str()),
            _ => None,
        }
    }

    /// Resolve the selector fragments for the template named `metric`
    ///
    /// Workload templates reading kube-state-metrics series of one kind
    /// (`workload_deployment_replica` and friends) get a `$2` clause on that
    /// kind's label, whatever kind the request asked for.
    pub fn apply_to(&self, metric: &str, filter: &str) -> ResolvedSelectors {
        let mut resolved = self.apply(filter);
        if let Scope::Workload { namespace, .. } = self {
            if let Some(kind) = WorkloadKind::named_in(metric) {
                let label = kind.state_label();
                resolved.positional[1] = format!(
                    r#"{}, {label}!="", {}"#,
                    exact("namespace", namespace),
                    matching(label, filter)
                );
            }
        }
        resolved
    }

    /// Resolve the selector fragments shared by every template of the level
    pub fn apply(&self, filter: &str) -> ResolvedSelectors {
        match self {
            Scope::Cluster | Scope::Component(_) => ResolvedSelectors::default(),

            Scope::Node { node } => {
                let node = node.as_deref();
                ResolvedSelectors {
                    positional: vec![exact_or_filter("node", node, filter)],
                    node_selector: Some(exact_or_filter("node", node, filter)),
                    instance_selector: Some(exact_or_filter("instance", node, filter)),
                    ..Default::default()
                }
            }

            Scope::Workspace { workspace } => {
                let selector = match workspace {
                    Some(ws) => exact("workspace", ws),
                    None => format!(r#"{}, workspace!="""#, matching("workspace", filter)),
                };
                ResolvedSelectors::positional([selector])
            }

            Scope::Namespace {
                workspace,
                namespace,
            } => {
                let ns = exact_or_filter("namespace", namespace.as_deref(), filter);
                let selector = match workspace {
                    Some(ws) => format!("{}, {ns}", exact("workspace", ws)),
                    None => ns,
                };
                ResolvedSelectors::positional([selector])
            }

            Scope::Workload { namespace, kind } => {
                let ns = exact("namespace", namespace);
                let kind_name = kind.map(|k| k.as_str()).unwrap_or(".*");
                let workload = format!(
                    "{ns}, {}",
                    matching("workload", &format!("{kind_name}:({filter})"))
                );
                ResolvedSelectors::positional([workload, ns])
            }

            Scope::Pod {
                namespace,
                node,
                workload_kind,
                workload,
                pod,
            } => {
                let owner = match (workload, workload_kind) {
                    (Some(name), Some(WorkloadKind::Deployment)) => format!(
                        r#"owner_kind="ReplicaSet", {}"#,
                        matching("owner_name", &format!("^{name}-[^-]{{1,10}}$"))
                    ),
                    (Some(name), Some(kind)) => {
                        format!("{}, {}", exact("owner_kind", kind.as_str()), exact("owner_name", name))
                    }
                    _ => String::new(),
                };
                let pod = exact_or_filter("pod", pod.as_deref(), filter);
                let pod = match (namespace, node) {
                    (Some(ns), _) => format!("{pod}, {}", exact("namespace", ns)),
                    (None, Some(node)) => format!("{pod}, {}", exact("node", node)),
                    (None, None) => pod,
                };
                ResolvedSelectors::positional([owner, pod])
            }

            Scope::Container {
                namespace,
                pod,
                container,
            } => ResolvedSelectors::positional([format!(
                "{}, {}, {}",
                exact("pod", pod),
                exact("namespace", namespace),
                exact_or_filter("container", container.as_deref(), filter)
            )]),

            Scope::PersistentVolumeClaim {
                namespace,
                storage_class,
                pvc,
            } => {
                let claim = exact_or_filter("persistentvolumeclaim", pvc.as_deref(), filter);
                let selector = match (namespace, storage_class) {
                    (Some(ns), _) => format!("{}, {claim}", exact("namespace", ns)),
                    (None, Some(sc)) => format!("{}, {claim}", exact("storageclass", sc)),
                    (None, None) => claim,
                };
                ResolvedSelectors::positional([selector])
            }

            Scope::Application(group) => ResolvedSelectors {
                app: Some(group.name.clone()),
                pvc: Some(group_pvc_selector(group)),
                ..ResolvedSelectors::positional([group_workload_selector(group)])
            },

            Scope::Service(group) => ResolvedSelectors {
                svc: Some(group.name.clone()),
                ..ResolvedSelectors::positional([group_workload_selector(group)])
            },
        }
    }
}

fn group_workload_selector(group: &WorkloadGroup) -> String {
    format!(
        "{}, {}",
        exact("namespace", &group.namespace),
        matching("workload", &alternation(&group.workloads))
    )
}

fn group_pvc_selector(group: &WorkloadGroup) -> String {
    let claims = if group.pvcs.is_empty() {
        // no volumes: match nothing rather than every claim in the namespace
        "^$".to_string()
    } else {
        alternation(&group.pvcs)
    };
    format!(
        "{}, {}",
        exact("namespace", &group.namespace),
        matching("persistentvolumeclaim", &claims)
    )
}

/// Meter-only options
#[derive(Debug, Clone, PartialEq)]
pub struct MeterOptions {
    pub step: Duration,
    pub price: PriceInfo,
}

impl Default for MeterOptions {
    fn default() -> Self {
        Self {
            step: default_meter_step(),
            price: PriceInfo::default(),
        }
    }
}

impl MeterOptions {
    /// Window length in whole hours, at least one
    pub fn window_hours(&self) -> i64 {
        self.step.num_hours().max(1)
    }
}

/// A fully-scoped metric or meter query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub scope: Scope,
    pub resource_filter: String,
    pub metric_filter: String,
    pub meter: Option<MeterOptions>,
}

impl QueryOptions {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            resource_filter: DEFAULT_FILTER.to_string(),
            metric_filter: DEFAULT_FILTER.to_string(),
            meter: None,
        }
    }

    pub fn with_resource_filter(mut self, filter: impl Into<String>) -> Self {
        self.resource_filter = filter.into();
        self
    }

    pub fn with_metric_filter(mut self, filter: impl Into<String>) -> Self {
        self.metric_filter = filter.into();
        self
    }

    pub fn with_meter(mut self, meter: MeterOptions) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn level(&self) -> Level {
        self.scope.level()
    }

    pub fn is_meter(&self) -> bool {
        self.meter.is_some()
    }

    /// Catalog section the query draws names from
    pub fn catalog_key(&self) -> CatalogKey {
        match (&self.scope, &self.meter) {
            (Scope::Component(component), _) => CatalogKey::Component(*component),
            (_, Some(_)) => CatalogKey::Meters(self.level()),
            (_, None) => CatalogKey::Metrics(self.level()),
        }
    }

    /// Selector fragments for the template named `metric`
    pub fn selectors(&self, metric: &str) -> ResolvedSelectors {
        self.scope.apply_to(metric, &self.resource_filter)
    }
}
