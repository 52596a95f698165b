//! Server configuration

use anyhow::Result;
use monitor_lib::{ErrorPolicy, PriceInfo};
use serde::Deserialize;
use tracing::warn;

/// Server configuration, read from `MONITOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for health, metrics and query routes
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Prometheus HTTP API base URL
    #[serde(default = "default_prometheus_endpoint")]
    pub prometheus_endpoint: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Look up namespace creation times to clamp query windows
    #[serde(default = "default_namespace_clamp")]
    pub namespace_clamp: bool,

    #[serde(default)]
    pub error_policy: ErrorPolicy,

    // Default meter prices
    #[serde(default)]
    pub cpu_per_core_per_hour: f64,
    #[serde(default)]
    pub mem_per_gigabytes_per_hour: f64,
    #[serde(default)]
    pub ingress_network_traffic_per_megabytes_per_hour: f64,
    #[serde(default)]
    pub egress_network_traffic_per_megabytes_per_hour: f64,
    #[serde(default)]
    pub pvc_per_gigabytes_per_hour: f64,
    #[serde(default = "default_currency_unit")]
    pub currency_unit: String,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "monitor-server".to_string())
}

fn default_api_port() -> u16 {
    9090
}

fn default_prometheus_endpoint() -> String {
    "http://prometheus-k8s.kubesphere-monitoring-system.svc:9090".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_namespace_clamp() -> bool {
    true
}

fn default_currency_unit() -> String {
    PriceInfo::default().currency_unit
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            prometheus_endpoint: default_prometheus_endpoint(),
            request_timeout_secs: default_request_timeout(),
            namespace_clamp: default_namespace_clamp(),
            error_policy: ErrorPolicy::default(),
            cpu_per_core_per_hour: 0.0,
            mem_per_gigabytes_per_hour: 0.0,
            ingress_network_traffic_per_megabytes_per_hour: 0.0,
            egress_network_traffic_per_megabytes_per_hour: 0.0,
            pvc_per_gigabytes_per_hour: 0.0,
            currency_unit: default_currency_unit(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the environment
    ///
    /// Values that fail to deserialize fall back to the defaults.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "invalid MONITOR_* configuration, using defaults");
            MonitorConfig::default()
        }))
    }

    /// Prices applied to meter requests that do not override them
    pub fn price(&self) -> PriceInfo {
        PriceInfo {
            cpu_per_core_per_hour: self.cpu_per_core_per_hour,
            mem_per_gigabytes_per_hour: self.mem_per_gigabytes_per_hour,
            ingress_network_traffic_per_megabytes_per_hour: self
                .ingress_network_traffic_per_megabytes_per_hour,
            egress_network_traffic_per_megabytes_per_hour: self
                .egress_network_traffic_per_megabytes_per_hour,
            pvc_per_gigabytes_per_hour: self.pvc_per_gigabytes_per_hour,
            currency_unit: self.currency_unit.clone(),
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
