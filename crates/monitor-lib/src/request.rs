//! Request parameters and their resolution into scoped queries
//!
//! [`MonitoringRequest`] mirrors the flat option names accepted on the wire.
//! [`MonitoringRequest::resolve`] validates them for one level and produces a
//! [`ResolvedQuery`]: one [`QueryOptions`] per workload group (exactly one for
//! levels without groups), the time window and the optional sort window.

use crate::error::MonitoringError;
use crate::expressions::options::{default_meter_step, DEFAULT_FILTER};
use crate::expressions::{
    ComponentType, Level, MeterOptions, QueryOptions, Scope, WorkloadGroup, WorkloadKind,
};
use crate::models::PriceInfo;
use crate::postprocess::SortParams;
use crate::timerange::{default_range_step, parse_duration, TimeWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw monitoring request options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_filter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storageclass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    /// `name:workloads[:pvcs]` groups separated by `,`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<String>,
    /// `name:workloads` groups separated by `,`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_per_core_per_hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_per_gigabytes_per_hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_network_traffic_per_megabytes_per_hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress_network_traffic_per_megabytes_per_hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvc_per_gigabytes_per_hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_unit: Option<String>,
}

/// A validated request, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub level: Level,
    /// One entry per workload group; a single entry for other levels
    pub groups: Vec<QueryOptions>,
    pub window: TimeWindow,
    pub sort: Option<SortParams>,
}

impl ResolvedQuery {
    pub fn is_meter(&self) -> bool {
        self.groups.iter().any(QueryOptions::is_meter)
    }

    /// Namespace every group is confined to, if any
    pub fn namespace(&self) -> Option<&str> {
        self.groups.first().and_then(|g| g.scope.namespace())
    }

    pub fn price(&self) -> Option<&PriceInfo> {
        self.groups
            .first()
            .and_then(|g| g.meter.as_ref())
            .map(|m| &m.price)
    }
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn owned(value: &Option<String>) -> Option<String> {
    given(value).map(str::to_string)
}

fn parse_flag(param: &'static str, raw: Option<&str>) -> Result<bool, MonitoringError> {
    match raw {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(MonitoringError::parse(param, format!("{v:?} is not a boolean"))),
    }
}

fn parse_price(param: &'static str, raw: Option<&str>, fallback: f64) -> Result<f64, MonitoringError> {
    match raw {
        None => Ok(fallback),
        Some(v) => v
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| MonitoringError::parse(param, format!("{v:?} is not a valid price"))),
    }
}

impl MonitoringRequest {
    /// Validate the request for `level`
    ///
    /// `now` is the instant used when no time is given; `default_price` is
    /// used for every unit price the request does not override.
    pub fn resolve(
        &self,
        level: Level,
        now: DateTime<Utc>,
        default_price: &PriceInfo,
    ) -> Result<ResolvedQuery, MonitoringError> {
        let meter = parse_flag("meter", given(&self.meter))?
            || matches!(level, Level::Application | Level::Service);
        if meter && matches!(level, Level::Component | Level::Container) {
            return Err(MonitoringError::parse(
                "meter",
                format!("no meters are defined for {level}"),
            ));
        }

        let default_step = if meter {
            default_meter_step()
        } else {
            default_range_step()
        };
        let window = TimeWindow::resolve(
            given(&self.time),
            given(&self.start),
            given(&self.end),
            given(&self.step),
            now,
            default_step,
        )?;

        let sort = SortParams::parse(
            given(&self.sort_metric),
            given(&self.sort_type),
            given(&self.page),
            given(&self.limit),
        )?;

        let meter_options = if meter {
            Some(MeterOptions {
                step: match given(&self.step) {
                    Some(raw) => parse_duration("step", raw)?,
                    None => default_step,
                },
                price: self.price(default_price)?,
            })
        } else {
            None
        };

        let resource_filter = given(&self.resources_filter).unwrap_or(DEFAULT_FILTER);
        let metric_filter = given(&self.metrics_filter).unwrap_or(DEFAULT_FILTER);

        let groups = self
            .scopes(level)?
            .into_iter()
            .map(|scope| {
                let opts = QueryOptions::new(scope)
                    .with_resource_filter(resource_filter)
                    .with_metric_filter(metric_filter);
                match &meter_options {
                    Some(m) => opts.with_meter(m.clone()),
                    None => opts,
                }
            })
            .collect();

        Ok(ResolvedQuery {
            level,
            groups,
            window,
            sort,
        })
    }

    fn price(&self, defaults: &PriceInfo) -> Result<PriceInfo, MonitoringError> {
        Ok(PriceInfo {
            cpu_per_core_per_hour: parse_price(
                "cpu_per_core_per_hour",
                given(&self.cpu_per_core_per_hour),
                defaults.cpu_per_core_per_hour,
            )?,
            mem_per_gigabytes_per_hour: parse_price(
                "mem_per_gigabytes_per_hour",
                given(&self.mem_per_gigabytes_per_hour),
                defaults.mem_per_gigabytes_per_hour,
            )?,
            ingress_network_traffic_per_megabytes_per_hour: parse_price(
                "ingress_network_traffic_per_megabytes_per_hour",
                given(&self.ingress_network_traffic_per_megabytes_per_hour),
                defaults.ingress_network_traffic_per_megabytes_per_hour,
            )?,
            egress_network_traffic_per_megabytes_per_hour: parse_price(
                "egress_network_traffic_per_megabytes_per_hour",
                given(&self.egress_network_traffic_per_megabytes_per_hour),
                defaults.egress_network_traffic_per_megabytes_per_hour,
            )?,
            pvc_per_gigabytes_per_hour: parse_price(
                "pvc_per_gigabytes_per_hour",
                given(&self.pvc_per_gigabytes_per_hour),
                defaults.pvc_per_gigabytes_per_hour,
            )?,
            currency_unit: owned(&self.currency_unit)
                .unwrap_or_else(|| defaults.currency_unit.clone()),
        })
    }

    fn required_namespace(&self) -> Result<String, MonitoringError> {
        owned(&self.namespace).ok_or(MonitoringError::MissingParameter("namespace"))
    }

    fn scopes(&self, level: Level) -> Result<Vec<Scope>, MonitoringError> {
        let scope = match level {
            Level::Cluster => Scope::Cluster,
            Level::Node => Scope::Node {
                node: owned(&self.node),
            },
            Level::Workspace => Scope::Workspace {
                workspace: owned(&self.workspace),
            },
            Level::Namespace => Scope::Namespace {
                workspace: owned(&self.workspace),
                namespace: owned(&self.namespace),
            },
            Level::Workload => Scope::Workload {
                namespace: self.required_namespace()?,
                kind: given(&self.kind).and_then(WorkloadKind::normalize),
            },
            Level::Pod => Scope::Pod {
                namespace: owned(&self.namespace),
                node: owned(&self.node),
                workload_kind: given(&self.kind).and_then(WorkloadKind::normalize),
                workload: owned(&self.workload),
                pod: owned(&self.pod),
            },
            Level::Container => Scope::Container {
                namespace: self.required_namespace()?,
                pod: owned(&self.pod).ok_or(MonitoringError::MissingParameter("pod"))?,
                container: owned(&self.container),
            },
            Level::PersistentVolumeClaim => Scope::PersistentVolumeClaim {
                namespace: owned(&self.namespace),
                storage_class: owned(&self.storageclass),
                pvc: owned(&self.pvc),
            },
            Level::Component => {
                let component: ComponentType = given(&self.component)
                    .ok_or(MonitoringError::MissingParameter("component"))?
                    .parse()?;
                Scope::Component(component)
            }
            Level::Application => {
                let namespace = self.required_namespace()?;
                let raw = given(&self.applications)
                    .ok_or(MonitoringError::MissingParameter("applications"))?;
                return Ok(parse_groups("applications", raw, &namespace, true)?
                    .into_iter()
                    .map(Scope::Application)
                    .collect());
            }
            Level::Service => {
                let namespace = self.required_namespace()?;
                let raw =
                    given(&self.services).ok_or(MonitoringError::MissingParameter("services"))?;
                return Ok(parse_groups("services", raw, &namespace, false)?
                    .into_iter()
                    .map(Scope::Service)
                    .collect());
            }
        };
        Ok(vec![scope])
    }
}

/// Parse `name:workloads[:pvcs]` groups separated by `,`
///
/// Workloads and volumes are `|`-separated. A workload is `Kind/name`, or a
/// bare `name` for a Deployment.
fn parse_groups(
    param: &'static str,
    raw: &str,
    namespace: &str,
    allow_pvcs: bool,
) -> Result<Vec<WorkloadGroup>, MonitoringError> {
    let mut groups = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        let workloads = parts.next().unwrap_or_default();
        let pvcs = parts.next();

        if name.is_empty() {
            return Err(MonitoringError::parse(param, format!("group {entry:?} has no name")));
        }
        if pvcs.is_some() && !allow_pvcs {
            return Err(MonitoringError::parse(
                param,
                format!("group {name:?} lists volumes, which only applications accept"),
            ));
        }

        let workloads = split_list(workloads)
            .map(|w| workload_label(param, w))
            .collect::<Result<Vec<_>, _>>()?;
        if workloads.is_empty() {
            return Err(MonitoringError::parse(param, format!("group {name:?} has no workloads")));
        }

        groups.push(WorkloadGroup {
            namespace: namespace.to_string(),
            name: name.to_string(),
            workloads,
            pvcs: pvcs.map(split_list).into_iter().flatten().map(str::to_string).collect(),
        });
    }

    if groups.is_empty() {
        return Err(MonitoringError::parse(param, "no groups given"));
    }
    Ok(groups)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('|').map(str::trim).filter(|s| !s.is_empty())
}

fn workload_label(param: &'static str, raw: &str) -> Result<String, MonitoringError> {
    let (kind, name) = match raw.split_once('/') {
        Some((kind, name)) => {
            let kind = WorkloadKind::normalize(kind)
                .ok_or_else(|| MonitoringError::parse(param, format!("unknown workload kind {kind:?}")))?;
            (kind, name)
        }
        None => (WorkloadKind::Deployment, raw),
    };
    Ok(format!("{}:{}", kind.as_str(), name))
}
