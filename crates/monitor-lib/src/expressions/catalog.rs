//! Named metric and meter templates
//!
//! The catalog is built once at startup and shared read-only between the
//! compiler, the executor and the API layer.

use super::level::{ComponentType, Level};
use std::collections::HashMap;

/// Which ordered list of templates a query draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    Metrics(Level),
    Meters(Level),
    Component(ComponentType),
}

/// Ordered templates valid for one catalog key
#[derive(Debug, Default)]
struct Section {
    names: Vec<&'static str>,
    templates: HashMap<&'static str, &'static str>,
}

impl Section {
    fn from_entries(entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            names: entries.iter().map(|(name, _)| *name).collect(),
            templates: entries.iter().copied().collect(),
        }
    }
}

/// Immutable catalog of query templates
#[derive(Debug)]
pub struct Catalog {
    sections: HashMap<CatalogKey, Section>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Build the built-in catalog
    pub fn new() -> Self {
        let mut sections = HashMap::new();

        let metrics: [(Level, &[(&str, &str)]); 8] = [
            (Level::Cluster, CLUSTER_METRICS),
            (Level::Node, NODE_METRICS),
            (Level::Workspace, WORKSPACE_METRICS),
            (Level::Namespace, NAMESPACE_METRICS),
            (Level::Workload, WORKLOAD_METRICS),
            (Level::Pod, POD_METRICS),
            (Level::Container, CONTAINER_METRICS),
            (Level::PersistentVolumeClaim, PVC_METRICS),
        ];
        for (level, entries) in metrics {
            sections.insert(CatalogKey::Metrics(level), Section::from_entries(entries));
        }

        let meters: [(Level, &[(&str, &str)]); 9] = [
            (Level::Cluster, CLUSTER_METERS),
            (Level::Node, NODE_METERS),
            (Level::Workspace, WORKSPACE_METERS),
            (Level::Namespace, NAMESPACE_METERS),
            (Level::Workload, WORKLOAD_METERS),
            (Level::Pod, POD_METERS),
            (Level::PersistentVolumeClaim, PVC_METERS),
            (Level::Application, APPLICATION_METERS),
            (Level::Service, SERVICE_METERS),
        ];
        for (level, entries) in meters {
            sections.insert(CatalogKey::Meters(level), Section::from_entries(entries));
        }

        let components: [(ComponentType, &[(&str, &str)]); 3] = [
            (ComponentType::Etcd, ETCD_METRICS),
            (ComponentType::ApiServer, APISERVER_METRICS),
            (ComponentType::Scheduler, SCHEDULER_METRICS),
        ];
        for (component, entries) in components {
            sections.insert(
                CatalogKey::Component(component),
                Section::from_entries(entries),
            );
        }

        Self { sections }
    }

    /// Ordered names available under `key`; empty if the key has no section
    pub fn names(&self, key: CatalogKey) -> &[&'static str] {
        self.sections
            .get(&key)
            .map(|s| s.names.as_slice())
            .unwrap_or(&[])
    }

    /// Template for `name` under `key`
    pub fn template(&self, key: CatalogKey, name: &str) -> Option<&'static str> {
        self.sections.get(&key)?.templates.get(name).copied()
    }

    /// Whether any section defines `name`
    pub fn contains(&self, name: &str) -> bool {
        self.sections.values().any(|s| s.templates.contains_key(name))
    }
}

const CLUSTER_METRICS: &[(&str, &str)] = &[
    ("cluster_cpu_utilisation", ":node_cpu_utilisation:avg1m"),
    ("cluster_cpu_usage", "round(:node_cpu_utilisation:avg1m * sum(node:node_num_cpu:sum), 0.001)"),
    ("cluster_cpu_total", "sum(node:node_num_cpu:sum)"),
    ("cluster_memory_utilisation", ":node_memory_utilisation:"),
    ("cluster_memory_available", "sum(node:node_memory_bytes_available:sum)"),
    ("cluster_memory_total", "sum(node:node_memory_bytes_total:sum)"),
    ("cluster_memory_usage_wo_cache", "sum(node:node_memory_bytes_total:sum) - sum(node:node_memory_bytes_available:sum)"),
    ("cluster_net_utilisation", ":node_net_utilisation:sum_irate"),
    ("cluster_net_bytes_transmitted", "sum(node:node_net_bytes_transmitted:sum_irate)"),
    ("cluster_net_bytes_received", "sum(node:node_net_bytes_received:sum_irate)"),
    ("cluster_disk_read_iops", "sum(node:data_volume_iops_reads:sum)"),
    ("cluster_disk_write_iops", "sum(node:data_volume_iops_writes:sum)"),
    ("cluster_disk_read_throughput", "sum(node:data_volume_throughput_bytes_read:sum)"),
    ("cluster_disk_write_throughput", "sum(node:data_volume_throughput_bytes_written:sum)"),
    ("cluster_disk_size_usage", r#"sum(max(node_filesystem_size_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"} - node_filesystem_avail_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"}) by (device, instance))"#),
    ("cluster_disk_size_utilisation", "cluster:disk_utilization:ratio"),
    ("cluster_disk_size_capacity", r#"sum(max(node_filesystem_size_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"}) by (device, instance))"#),
    ("cluster_disk_size_available", r#"sum(max(node_filesystem_avail_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"}) by (device, instance))"#),
    ("cluster_pod_count", "cluster:pod:sum"),
    ("cluster_pod_quota", r#"sum(max(kube_node_status_capacity{resource="pods"}) by (node) unless on (node) (kube_node_status_condition{condition="Ready",status=~"unknown|false"} > 0))"#),
    ("cluster_pod_utilisation", "cluster:pod_utilization:ratio"),
    ("cluster_pod_running_count", "cluster:pod_running:count"),
    ("cluster_pod_abnormal_count", "cluster:pod_abnormal:sum"),
    ("cluster_node_online", r#"sum(kube_node_status_condition{condition="Ready",status="true"})"#),
    ("cluster_node_offline", "cluster:node_offline:sum"),
    ("cluster_node_total", r#"sum(kube_node_status_condition{condition="Ready"})"#),
    ("cluster_namespace_count", "count(kube_namespace_labels)"),
    ("cluster_deployment_count", "sum(kube_deployment_labels)"),
    ("cluster_statefulset_count", "sum(kube_statefulset_labels)"),
    ("cluster_daemonset_count", "sum(kube_daemonset_labels)"),
    ("cluster_pvc_count", "sum(kube_persistentvolumeclaim_info)"),
    ("cluster_load1", "sum(node_load1{job=\"node-exporter\"}) / sum(node:node_num_cpu:sum)"),
    ("cluster_load5", "sum(node_load5{job=\"node-exporter\"}) / sum(node:node_num_cpu:sum)"),
    ("cluster_load15", "sum(node_load15{job=\"node-exporter\"}) / sum(node:node_num_cpu:sum)"),
];

const NODE_METRICS: &[(&str, &str)] = &[
    ("node_cpu_utilisation", "node:node_cpu_utilisation:avg1m{$1}"),
    ("node_cpu_total", "node:node_num_cpu:sum{$1}"),
    ("node_cpu_usage", "round(node:node_cpu_utilisation:avg1m{$1} * node:node_num_cpu:sum{$1}, 0.001)"),
    ("node_memory_utilisation", "node:node_memory_utilisation:{$1}"),
    ("node_memory_available", "node:node_memory_bytes_available:sum{$1}"),
    ("node_memory_total", "node:node_memory_bytes_total:sum{$1}"),
    ("node_memory_usage_wo_cache", "node:node_memory_bytes_total:sum{$1} - node:node_memory_bytes_available:sum{$1}"),
    ("node_net_utilisation", "node:node_net_utilisation:sum_irate{$1}"),
    ("node_net_bytes_transmitted", "node:node_net_bytes_transmitted:sum_irate{$1}"),
    ("node_net_bytes_received", "node:node_net_bytes_received:sum_irate{$1}"),
    ("node_disk_read_iops", "node:data_volume_iops_reads:sum{$1}"),
    ("node_disk_write_iops", "node:data_volume_iops_writes:sum{$1}"),
    ("node_disk_read_throughput", "node:data_volume_throughput_bytes_read:sum{$1}"),
    ("node_disk_write_throughput", "node:data_volume_throughput_bytes_written:sum{$1}"),
    ("node_disk_size_capacity", r#"sum(max(node_filesystem_size_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"} * on (namespace, pod) group_left(node) node_namespace_pod:kube_pod_info:{$1}) by (device, node)) by (node)"#),
    ("node_disk_size_available", r#"node:disk_space_available:{$1}"#),
    ("node_disk_size_usage", r#"sum(max((node_filesystem_size_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"} - node_filesystem_avail_bytes{device=~"/dev/.*", device!~"/dev/loop\\d+", job="node-exporter"}) * on (namespace, pod) group_left(node) node_namespace_pod:kube_pod_info:{$1}) by (device, node)) by (node)"#),
    ("node_disk_size_utilisation", "node:disk_space_utilization:ratio{$1}"),
    ("node_pod_count", "node:pod_count:sum{$1}"),
    ("node_pod_quota", r#"max(kube_node_status_capacity{resource="pods",$1}) by (node) unless on (node) (kube_node_status_condition{condition="Ready",status=~"unknown|false"} > 0)"#),
    ("node_pod_utilisation", "node:pod_utilization:ratio{$1}"),
    ("node_pod_running_count", "node:pod_running:count{$1}"),
    ("node_pod_abnormal_count", "node:pod_abnormal:count{$1}"),
    ("node_load1", "node:load1:ratio{$1}"),
    ("node_load5", "node:load5:ratio{$1}"),
    ("node_load15", "node:load15:ratio{$1}"),
];

const WORKSPACE_METRICS: &[(&str, &str)] = &[
    ("workspace_cpu_usage", r#"round(sum by (workspace) (namespace:container_cpu_usage_seconds_total:sum_rate{namespace!="", $1}), 0.001)"#),
    ("workspace_memory_usage", r#"sum by (workspace) (namespace:container_memory_usage_bytes:sum{namespace!="", $1})"#),
    ("workspace_memory_usage_wo_cache", r#"sum by (workspace) (namespace:container_memory_usage_bytes_wo_cache:sum{namespace!="", $1})"#),
    ("workspace_net_bytes_transmitted", r#"sum by (workspace) (sum by (namespace) (irate(container_network_transmit_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_net_bytes_received", r#"sum by (workspace) (sum by (namespace) (irate(container_network_receive_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_pod_count", r#"sum by (workspace) (kube_pod_status_phase{phase!~"Failed|Succeeded", namespace!=""} * on (namespace) group_left(workspace)(kube_namespace_labels{$1})) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_pod_running_count", r#"sum by (workspace) (kube_pod_status_phase{phase="Running", namespace!=""} * on (namespace) group_left(workspace)(kube_namespace_labels{$1})) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_pod_succeeded_count", r#"sum by (workspace) (kube_pod_status_phase{phase="Succeeded", namespace!=""} * on (namespace) group_left(workspace)(kube_namespace_labels{$1})) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_pod_abnormal_count", r#"count by (workspace) ((kube_pod_info{node!=""} unless on (pod, namespace) (kube_pod_status_phase{job="kube-state-metrics", phase="Succeeded"} > 0) unless on (pod, namespace) ((kube_pod_status_ready{job="kube-state-metrics", condition="true"} > 0) and on (pod, namespace) (kube_pod_status_phase{job="kube-state-metrics", phase="Running"} > 0)) unless on (pod, namespace) (kube_pod_container_status_waiting_reason{job="kube-state-metrics", reason="ContainerCreating"} > 0)) * on (namespace) group_left(workspace)(kube_namespace_labels{$1}))"#),
    ("workspace_namespace_count", r#"count by (workspace) (kube_namespace_labels{$1})"#),
    ("workspace_deployment_count", r#"sum by (workspace) (kube_deployment_labels{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_statefulset_count", r#"sum by (workspace) (kube_statefulset_labels{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_daemonset_count", r#"sum by (workspace) (kube_daemonset_labels{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
    ("workspace_pvc_count", r#"sum by (workspace) ((kube_persistentvolumeclaim_info{namespace!=""} + on (namespace, persistentvolumeclaim) group_left kube_persistentvolumeclaim_status_phase{phase="Bound"}) * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(workspace) max by(workspace) (kube_namespace_labels{$1} * 0)"#),
];

const NAMESPACE_METRICS: &[(&str, &str)] = &[
    ("namespace_cpu_usage", r#"round(namespace:container_cpu_usage_seconds_total:sum_rate{namespace!="", $1}, 0.001)"#),
    ("namespace_memory_usage", r#"namespace:container_memory_usage_bytes:sum{namespace!="", $1}"#),
    ("namespace_memory_usage_wo_cache", r#"namespace:container_memory_usage_bytes_wo_cache:sum{namespace!="", $1}"#),
    ("namespace_net_bytes_transmitted", r#"sum by (namespace) (irate(container_network_transmit_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m]) * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_net_bytes_received", r#"sum by (namespace) (irate(container_network_receive_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m]) * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_pod_count", r#"sum by (namespace) (kube_pod_status_phase{phase!~"Failed|Succeeded", namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_pod_running_count", r#"sum by (namespace) (kube_pod_status_phase{phase="Running", namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_pod_succeeded_count", r#"sum by (namespace) (kube_pod_status_phase{phase="Succeeded", namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_pod_abnormal_count", r#"namespace:pod_abnormal:count{namespace!="", $1}"#),
    ("namespace_pod_abnormal_ratio", r#"namespace:pod_abnormal:ratio{namespace!="", $1}"#),
    ("namespace_memory_limit_hard", r#"min by (namespace) (kube_resourcequota{resourcequota!="quota", type="hard", namespace!="", resource="limits.memory"} * on (namespace) group_left(workspace) kube_namespace_labels{$1})"#),
    ("namespace_cpu_limit_hard", r#"min by (namespace) (kube_resourcequota{resourcequota!="quota", type="hard", namespace!="", resource="limits.cpu"} * on (namespace) group_left(workspace) kube_namespace_labels{$1})"#),
    ("namespace_pod_count_hard", r#"min by (namespace) (kube_resourcequota{resourcequota!="quota", type="hard", namespace!="", resource="count/pods"} * on (namespace) group_left(workspace) kube_namespace_labels{$1})"#),
    ("namespace_deployment_count", r#"sum by (namespace) (kube_deployment_labels{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_statefulset_count", r#"sum by (namespace) (kube_statefulset_labels{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_daemonset_count", r#"sum by (namespace) (kube_daemonset_labels{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
    ("namespace_pvc_bytes_total", r#"sum by (namespace) (kubelet_volume_stats_capacity_bytes{namespace!=""} * on (namespace) group_left(workspace) kube_namespace_labels{$1}) or on(namespace) max by(namespace) (kube_namespace_labels{$1} * 0)"#),
];

const WORKLOAD_METRICS: &[(&str, &str)] = &[
    ("workload_cpu_usage", "round(namespace:workload_cpu_usage:sum{$1}, 0.001)"),
    ("workload_memory_usage", "namespace:workload_memory_usage:sum{$1}"),
    ("workload_memory_usage_wo_cache", "namespace:workload_memory_usage_wo_cache:sum{$1}"),
    ("workload_net_bytes_transmitted", "namespace:workload_net_bytes_transmitted:sum_irate{$1}"),
    ("workload_net_bytes_received", "namespace:workload_net_bytes_received:sum_irate{$1}"),
    ("workload_deployment_replica", r#"label_join(sum (label_join(label_replace(kube_deployment_spec_replicas{$2}, "owner_kind", "Deployment", "", ""), "workload", "", "deployment")) by (namespace, owner_kind, workload), "workload", ":", "owner_kind", "workload")"#),
    ("workload_deployment_replica_available", r#"label_join(sum (label_join(label_replace(kube_deployment_status_replicas_available{$2}, "owner_kind", "Deployment", "", ""), "workload", "", "deployment")) by (namespace, owner_kind, workload), "workload", ":", "owner_kind", "workload")"#),
    ("workload_statefulset_replica", r#"label_join(sum (label_join(label_replace(kube_statefulset_replicas{$2}, "owner_kind", "StatefulSet", "", ""), "workload", "", "statefulset")) by (namespace, owner_kind, workload), "workload", ":", "owner_kind", "workload")"#),
    ("workload_statefulset_replica_available", r#"label_join(sum (label_join(label_replace(kube_statefulset_status_replicas_current{$2}, "owner_kind", "StatefulSet", "", ""), "workload", "", "statefulset")) by (namespace, owner_kind, workload), "workload", ":", "owner_kind", "workload")"#),
    ("workload_daemonset_replica", r#"label_join(sum (label_join(label_replace(kube_daemonset_status_desired_number_scheduled{$2}, "owner_kind", "DaemonSet", "", ""), "workload", "", "daemonset")) by (namespace, owner_kind, workload), "workload", ":", "owner_kind", "workload")"#),
    ("workload_daemonset_replica_available", r#"label_join(sum (label_join(label_replace(kube_daemonset_status_number_available{$2}, "owner_kind", "DaemonSet", "", ""), "workload", "", "daemonset")) by (namespace, owner_kind, workload), "workload", ":", "owner_kind", "workload")"#),
    ("workload_deployment_unavailable_replicas_ratio", "namespace:deployment_unavailable_replicas:ratio{$1}"),
    ("workload_daemonset_unavailable_replicas_ratio", "namespace:daemonset_unavailable_replicas:ratio{$1}"),
    ("workload_statefulset_unavailable_replicas_ratio", "namespace:statefulset_unavailable_replicas:ratio{$1}"),
];

const POD_METRICS: &[(&str, &str)] = &[
    ("pod_cpu_usage", r#"round(sum by (namespace, pod) (irate(container_cpu_usage_seconds_total{job="kubelet", pod!="", image!=""}[5m])) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2}, 0.001)"#),
    ("pod_memory_usage", r#"sum by (namespace, pod) (container_memory_usage_bytes{job="kubelet", pod!="", image!=""}) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2}"#),
    ("pod_memory_usage_wo_cache", r#"sum by (namespace, pod) (container_memory_working_set_bytes{job="kubelet", pod!="", image!=""}) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2}"#),
    ("pod_net_bytes_transmitted", r#"sum by (namespace, pod) (irate(container_network_transmit_bytes_total{pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2}"#),
    ("pod_net_bytes_received", r#"sum by (namespace, pod) (irate(container_network_receive_bytes_total{pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2}"#),
];

const CONTAINER_METRICS: &[(&str, &str)] = &[
    ("container_cpu_usage", r#"round(sum by (namespace, pod, container) (irate(container_cpu_usage_seconds_total{job="kubelet", container!="POD", container!="", image!="", $1}[5m])), 0.001)"#),
    ("container_memory_usage", r#"sum by (namespace, pod, container) (container_memory_usage_bytes{job="kubelet", container!="POD", container!="", image!="", $1})"#),
    ("container_memory_usage_wo_cache", r#"sum by (namespace, pod, container) (container_memory_working_set_bytes{job="kubelet", container!="POD", container!="", image!="", $1})"#),
];

const PVC_METRICS: &[(&str, &str)] = &[
    ("pvc_inodes_available", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_inodes_free) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_inodes_used", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_inodes_used) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_inodes_total", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_inodes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_inodes_utilisation", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_inodes_used / kubelet_volume_stats_inodes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_bytes_available", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_available_bytes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_bytes_used", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_used_bytes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_bytes_total", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_capacity_bytes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
    ("pvc_bytes_utilisation", "max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_used_bytes / kubelet_volume_stats_capacity_bytes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1}"),
];

const ETCD_METRICS: &[(&str, &str)] = &[
    ("etcd_server_list", r#"label_replace(up{job="etcd"}, "node_ip", "$1", "instance", "(.*):.*")"#),
    ("etcd_server_total", r#"count(up{job="etcd"})"#),
    ("etcd_server_up_total", "etcd:up:sum"),
    ("etcd_server_has_leader", r#"label_replace(etcd_server_has_leader, "node_ip", "$1", "instance", "(.*):.*")"#),
    ("etcd_server_is_leader", r#"label_replace(etcd_server_is_leader, "node_ip", "$1", "instance", "(.*):.*")"#),
    ("etcd_server_leader_changes", r#"label_replace(etcd:etcd_server_leader_changes_seen:sum_changes, "node_ip", "$1", "node", "(.*)")"#),
    ("etcd_server_proposals_failed_rate", "avg(etcd:etcd_server_proposals_failed:sum_irate)"),
    ("etcd_server_proposals_applied_rate", "avg(etcd:etcd_server_proposals_applied:sum_irate)"),
    ("etcd_server_proposals_committed_rate", "avg(etcd:etcd_server_proposals_committed:sum_irate)"),
    ("etcd_server_proposals_pending_count", "avg(etcd:etcd_server_proposals_pending:sum)"),
    ("etcd_mvcc_db_size", "avg(etcd:etcd_mvcc_db_total_size:sum)"),
    ("etcd_network_client_grpc_received_bytes", "sum(etcd:etcd_network_client_grpc_received_bytes:sum_irate)"),
    ("etcd_network_client_grpc_sent_bytes", "sum(etcd:etcd_network_client_grpc_sent_bytes:sum_irate)"),
    ("etcd_grpc_call_rate", r#"sum(etcd:grpc_server_started:sum_irate)"#),
    ("etcd_grpc_call_failed_rate", r#"sum(etcd:grpc_server_handled:sum_irate)"#),
    ("etcd_disk_wal_fsync_duration", "avg(etcd:etcd_disk_wal_fsync_duration:avg)"),
    ("etcd_disk_backend_commit_duration", "avg(etcd:etcd_disk_backend_commit_duration:avg)"),
];

const APISERVER_METRICS: &[(&str, &str)] = &[
    ("apiserver_up_sum", "apiserver:up:sum"),
    ("apiserver_request_rate", "apiserver:apiserver_request_total:sum_irate"),
    ("apiserver_request_by_verb_rate", "apiserver:apiserver_request_total:sum_verb_irate"),
    ("apiserver_request_latencies", "apiserver:apiserver_request_duration:avg"),
    ("apiserver_request_by_verb_latencies", "apiserver:apiserver_request_duration:avg_by_verb"),
];

const SCHEDULER_METRICS: &[(&str, &str)] = &[
    ("scheduler_up_sum", "scheduler:up:sum"),
    ("scheduler_schedule_attempts", "scheduler:scheduler_schedule_attempts:sum"),
    ("scheduler_schedule_attempt_rate", "scheduler:scheduler_schedule_attempts:sum_rate"),
    ("scheduler_e2e_scheduling_latency", "scheduler:scheduler_e2e_scheduling_duration:avg"),
    ("scheduler_e2e_scheduling_latency_quantile", "scheduler:scheduler_e2e_scheduling_duration:histogram_quantile"),
];

// Regex back-references in templates that also take positional selectors
// are written `${1}` so they cannot be mistaken for a selector token.
//
// Meter values are usage averaged over a `$step` window sampled hourly, so a
// one-hour step yields resource-hours. Traffic meters report bytes moved in
// the window.

const CLUSTER_METERS: &[(&str, &str)] = &[
    ("meter_cluster_cpu_usage", "round(sum_over_time(sum(node:node_cpu_utilisation:avg1m * node:node_num_cpu:sum)[$step:1h]) / $factor, 0.001)"),
    ("meter_cluster_memory_usage", "round(sum_over_time(sum(node:node_memory_bytes_total:sum - node:node_memory_bytes_available:sum)[$step:1h]) / $factor, 1)"),
    ("meter_cluster_net_bytes_transmitted", "round(sum_over_time(sum(node:node_net_bytes_transmitted:sum_irate)[$step:1h]) * 3600, 1)"),
    ("meter_cluster_net_bytes_received", "round(sum_over_time(sum(node:node_net_bytes_received:sum_irate)[$step:1h]) * 3600, 1)"),
    ("meter_cluster_pvc_bytes_total", "round(sum_over_time(sum(kubelet_volume_stats_capacity_bytes)[$step:1h]) / $factor, 1)"),
];

const NODE_METERS: &[(&str, &str)] = &[
    ("meter_node_cpu_usage", "round(sum_over_time((node:node_cpu_utilisation:avg1m{$nodeSelector} * node:node_num_cpu:sum{$nodeSelector})[$step:1h]) / $factor, 0.001)"),
    ("meter_node_memory_usage_wo_cache", "round(sum_over_time((node:node_memory_bytes_total:sum{$nodeSelector} - node:node_memory_bytes_available:sum{$nodeSelector})[$step:1h]) / $factor, 1)"),
    ("meter_node_net_bytes_transmitted", "round(sum_over_time(node:node_net_bytes_transmitted:sum_irate{$nodeSelector}[$step:1h]) * 3600, 1)"),
    ("meter_node_net_bytes_received", "round(sum_over_time(node:node_net_bytes_received:sum_irate{$nodeSelector}[$step:1h]) * 3600, 1)"),
    ("meter_node_pvc_bytes_total", r#"round(label_replace(sum by (instance) (sum_over_time(kubelet_volume_stats_capacity_bytes{$instanceSelector}[$step:1h])), "node", "${1}", "instance", "(.*)") / $factor, 1)"#),
];

const WORKSPACE_METERS: &[(&str, &str)] = &[
    ("meter_workspace_cpu_usage", r#"round(sum by (workspace) (sum_over_time(namespace:container_cpu_usage_seconds_total:sum_rate{namespace!="", $1}[$step:1h])) / $factor, 0.001)"#),
    ("meter_workspace_memory_usage", r#"round(sum by (workspace) (sum_over_time(namespace:container_memory_usage_bytes:sum{namespace!="", $1}[$step:1h])) / $factor, 1)"#),
    ("meter_workspace_net_bytes_transmitted", r#"round(sum by (workspace) (sum_over_time((sum by (namespace) (irate(container_network_transmit_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace) group_left(workspace) kube_namespace_labels{$1})[$step:1h])) * 3600, 1)"#),
    ("meter_workspace_net_bytes_received", r#"round(sum by (workspace) (sum_over_time((sum by (namespace) (irate(container_network_receive_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace) group_left(workspace) kube_namespace_labels{$1})[$step:1h])) * 3600, 1)"#),
    ("meter_workspace_pvc_bytes_total", r#"round(sum by (workspace) (sum_over_time((sum by (namespace) (kubelet_volume_stats_capacity_bytes{namespace!=""}) * on (namespace) group_left(workspace) kube_namespace_labels{$1})[$step:1h])) / $factor, 1)"#),
];

const NAMESPACE_METERS: &[(&str, &str)] = &[
    ("meter_namespace_cpu_usage", r#"round(sum_over_time(namespace:container_cpu_usage_seconds_total:sum_rate{namespace!="", $1}[$step:1h]) / $factor, 0.001)"#),
    ("meter_namespace_memory_usage_wo_cache", r#"round(sum_over_time(namespace:container_memory_usage_bytes_wo_cache:sum{namespace!="", $1}[$step:1h]) / $factor, 1)"#),
    ("meter_namespace_net_bytes_transmitted", r#"round(sum by (namespace) (sum_over_time((sum by (namespace) (irate(container_network_transmit_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace) group_left(workspace) kube_namespace_labels{$1})[$step:1h])) * 3600, 1)"#),
    ("meter_namespace_net_bytes_received", r#"round(sum by (namespace) (sum_over_time((sum by (namespace) (irate(container_network_receive_bytes_total{namespace!="", pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace) group_left(workspace) kube_namespace_labels{$1})[$step:1h])) * 3600, 1)"#),
    ("meter_namespace_pvc_bytes_total", r#"round(sum by (namespace) (sum_over_time((sum by (namespace) (kubelet_volume_stats_capacity_bytes{namespace!=""}) * on (namespace) group_left(workspace) kube_namespace_labels{$1})[$step:1h])) / $factor, 1)"#),
];

const WORKLOAD_METERS: &[(&str, &str)] = &[
    ("meter_workload_cpu_usage", "round(sum_over_time(namespace:workload_cpu_usage:sum{$1}[$step:1h]) / $factor, 0.001)"),
    ("meter_workload_memory_usage_wo_cache", "round(sum_over_time(namespace:workload_memory_usage_wo_cache:sum{$1}[$step:1h]) / $factor, 1)"),
    ("meter_workload_net_bytes_transmitted", "round(sum_over_time(namespace:workload_net_bytes_transmitted:sum_irate{$1}[$step:1h]) * 3600, 1)"),
    ("meter_workload_net_bytes_received", "round(sum_over_time(namespace:workload_net_bytes_received:sum_irate{$1}[$step:1h]) * 3600, 1)"),
];

const POD_METERS: &[(&str, &str)] = &[
    ("meter_pod_cpu_usage", r#"round(sum_over_time((sum by (namespace, pod) (irate(container_cpu_usage_seconds_total{job="kubelet", pod!="", image!=""}[5m])) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2})[$step:1h]) / $factor, 0.001)"#),
    ("meter_pod_memory_usage_wo_cache", r#"round(sum_over_time((sum by (namespace, pod) (container_memory_working_set_bytes{job="kubelet", pod!="", image!=""}) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2})[$step:1h]) / $factor, 1)"#),
    ("meter_pod_net_bytes_transmitted", r#"round(sum_over_time((sum by (namespace, pod) (irate(container_network_transmit_bytes_total{pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2})[$step:1h]) * 3600, 1)"#),
    ("meter_pod_net_bytes_received", r#"round(sum_over_time((sum by (namespace, pod) (irate(container_network_receive_bytes_total{pod!="", interface!~"^(cali.+|tunl.+|dummy.+|kube.+|flannel.+|cni.+|docker.+|veth.+|lo.*)", job="kubelet"}[5m])) * on (namespace, pod) group_left(owner_kind, owner_name) kube_pod_owner{$1} * on (namespace, pod) group_left(node) kube_pod_info{$2})[$step:1h]) * 3600, 1)"#),
];

const PVC_METERS: &[(&str, &str)] = &[
    ("meter_pvc_bytes_total", "round(sum_over_time((max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_capacity_bytes) * on (namespace, persistentvolumeclaim) group_left (storageclass) kube_persistentvolumeclaim_info{$1})[$step:1h]) / $factor, 1)"),
];

const APPLICATION_METERS: &[(&str, &str)] = &[
    ("meter_application_cpu_usage", r#"round(sum by (namespace, application) (label_replace(sum_over_time(namespace:workload_cpu_usage:sum{$1}[$step:1h]), "application", "$app", "", "")) / $factor, 0.001)"#),
    ("meter_application_memory_usage_wo_cache", r#"round(sum by (namespace, application) (label_replace(sum_over_time(namespace:workload_memory_usage_wo_cache:sum{$1}[$step:1h]), "application", "$app", "", "")) / $factor, 1)"#),
    ("meter_application_net_bytes_transmitted", r#"round(sum by (namespace, application) (label_replace(sum_over_time(namespace:workload_net_bytes_transmitted:sum_irate{$1}[$step:1h]), "application", "$app", "", "")) * 3600, 1)"#),
    ("meter_application_net_bytes_received", r#"round(sum by (namespace, application) (label_replace(sum_over_time(namespace:workload_net_bytes_received:sum_irate{$1}[$step:1h]), "application", "$app", "", "")) * 3600, 1)"#),
    ("meter_application_pvc_bytes_total", r#"round(sum by (namespace, application) (label_replace(sum_over_time(max by (namespace, persistentvolumeclaim) (kubelet_volume_stats_capacity_bytes{$pvc})[$step:1h]), "application", "$app", "", "")) / $factor, 1)"#),
];

const SERVICE_METERS: &[(&str, &str)] = &[
    ("meter_service_cpu_usage", r#"round(sum by (namespace, service) (label_replace(sum_over_time(namespace:workload_cpu_usage:sum{$1}[$step:1h]), "service", "$svc", "", "")) / $factor, 0.001)"#),
    ("meter_service_memory_usage_wo_cache", r#"round(sum by (namespace, service) (label_replace(sum_over_time(namespace:workload_memory_usage_wo_cache:sum{$1}[$step:1h]), "service", "$svc", "", "")) / $factor, 1)"#),
    ("meter_service_net_bytes_transmitted", r#"round(sum by (namespace, service) (label_replace(sum_over_time(namespace:workload_net_bytes_transmitted:sum_irate{$1}[$step:1h]), "service", "$svc", "", "")) * 3600, 1)"#),
    ("meter_service_net_bytes_received", r#"round(sum by (namespace, service) (label_replace(sum_over_time(namespace:workload_net_bytes_received:sum_irate{$1}[$step:1h]), "service", "$svc", "", "")) * 3600, 1)"#),
];
