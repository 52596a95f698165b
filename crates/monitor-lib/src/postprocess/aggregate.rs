//! Meter aggregation and pricing
//!
//! Each series is reduced to min/max/avg/sum. The sum, optionally scaled per
//! metric, is converted into the billing unit of the meter's class, rounded
//! to that class's precision and multiplied by the unit price:
//!
//! | class   | billing unit | precision |
//! |---------|--------------|-----------|
//! | CPU     | core         | 0.001     |
//! | memory  | GiB          | 0.1       |
//! | ingress | MB           | 1         |
//! | egress  | MB           | 1         |
//! | PVC     | GiB          | 0.1       |
//!
//! Fees are plain `f64` and are not rounded after multiplication. A meter
//! whose class cannot be determined gets [`UNKNOWN_FEE`].

use crate::models::{MetricResult, MetricValue, PriceInfo};
use std::collections::HashMap;
use tracing::warn;

/// Fee reported for meters that cannot be priced
pub const UNKNOWN_FEE: f64 = -1.0;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Pricing class of a meter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterClass {
    Cpu,
    Memory,
    NetIngress,
    NetEgress,
    Pvc,
}

impl MeterClass {
    /// Class of a meter, derived from its name
    pub fn classify(name: &str) -> Option<Self> {
        if name.contains("cpu_usage") {
            Some(MeterClass::Cpu)
        } else if name.contains("memory_usage") {
            Some(MeterClass::Memory)
        } else if name.contains("net_bytes_received") {
            Some(MeterClass::NetIngress)
        } else if name.contains("net_bytes_transmitted") {
            Some(MeterClass::NetEgress)
        } else if name.contains("pvc_bytes_total") {
            Some(MeterClass::Pvc)
        } else {
            None
        }
    }

    /// Unit of the raw min/max/avg/sum values
    pub fn resource_unit(&self) -> &'static str {
        match self {
            MeterClass::Cpu => "cores",
            _ => "bytes",
        }
    }

    fn billing_quantity(&self, raw: f64) -> f64 {
        match self {
            MeterClass::Cpu => round_to(raw, 3),
            MeterClass::Memory | MeterClass::Pvc => round_to(raw / GIB, 1),
            MeterClass::NetIngress | MeterClass::NetEgress => (raw / MIB).round(),
        }
    }

    fn unit_price(&self, price: &PriceInfo) -> f64 {
        match self {
            MeterClass::Cpu => price.cpu_per_core_per_hour,
            MeterClass::Memory => price.mem_per_gigabytes_per_hour,
            MeterClass::NetIngress => price.ingress_network_traffic_per_megabytes_per_hour,
            MeterClass::NetEgress => price.egress_network_traffic_per_megabytes_per_hour,
            MeterClass::Pvc => price.pvc_per_gigabytes_per_hour,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Min, max, avg and sum of one series
#[derive(Debug, Clone, Copy, PartialEq)]
struct Stats {
    min: f64,
    max: f64,
    avg: f64,
    sum: f64,
}

fn stats(value: &MetricValue) -> Option<Stats> {
    if let Some(series) = value.series.as_ref().filter(|s| !s.is_empty()) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for point in series {
            min = min.min(point.value);
            max = max.max(point.value);
            sum += point.value;
        }
        return Some(Stats {
            min,
            max,
            avg: sum / series.len() as f64,
            sum,
        });
    }

    value.sample.map(|p| Stats {
        min: p.value,
        max: p.value,
        avg: p.value,
        sum: p.value,
    })
}

/// Computes statistics and fees for meter results
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    price: PriceInfo,
    scaling: HashMap<String, f64>,
}

impl Aggregator {
    pub fn new(price: PriceInfo) -> Self {
        Self {
            price,
            scaling: HashMap::new(),
        }
    }

    /// Multiply the sum of `metric` by `factor` before pricing
    pub fn with_scaling(mut self, metric: impl Into<String>, factor: f64) -> Self {
        self.scaling.insert(metric.into(), factor);
        self
    }

    pub fn price(&self) -> &PriceInfo {
        &self.price
    }

    /// Fill statistics, fee and units on every value of every metric
    ///
    /// Failed metrics and values without data are skipped.
    pub fn aggregate(&self, result: &mut MetricResult) {
        for metric in result.results.iter_mut().filter(|m| !m.is_failed()) {
            let class = MeterClass::classify(&metric.metric_name);
            if class.is_none() {
                warn!(metric = %metric.metric_name, "no pricing class for meter");
            }
            let factor = self
                .scaling
                .get(&metric.metric_name)
                .copied()
                .unwrap_or(1.0);

            for value in metric.data.result.iter_mut() {
                let Some(stats) = stats(value) else {
                    continue;
                };
                value.min_value = Some(stats.min);
                value.max_value = Some(stats.max);
                value.avg_value = Some(stats.avg);
                value.sum_value = Some(stats.sum);
                value.currency_unit = Some(self.price.currency_unit.clone());

                match class {
                    Some(class) => {
                        let quantity = class.billing_quantity(stats.sum * factor);
                        value.fee = Some(quantity * class.unit_price(&self.price));
                        value.resource_unit = Some(class.resource_unit().to_string());
                    }
                    None => value.fee = Some(UNKNOWN_FEE),
                }
            }
        }
    }
}
