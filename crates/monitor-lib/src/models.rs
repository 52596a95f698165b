//! Result model shared by the executor, the post-processor and the API

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single `(timestamp, value)` sample
///
/// Serialized the way Prometheus does: `[1585836666.0, "0.25"]`, with the
/// value as a string so that `NaN` and infinities survive JSON.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub timestamp: f64,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

pub(crate) fn format_sample_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn parse_sample_value(raw: &str) -> Option<f64> {
    match raw {
        "NaN" => Some(f64::NAN),
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => raw.parse().ok(),
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.timestamp)?;
        tuple.serialize_element(&format_sample_value(self.value))?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PointVisitor;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawValue {
            Text(String),
            Number(f64),
        }

        impl<'de> Visitor<'de> for PointVisitor {
            type Value = Point;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a [timestamp, value] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Point, A::Error> {
                let timestamp: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let raw: RawValue = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let value = match raw {
                    RawValue::Number(v) => v,
                    RawValue::Text(s) => parse_sample_value(&s).ok_or_else(|| {
                        de::Error::invalid_value(de::Unexpected::Str(&s), &"a float")
                    })?,
                };
                Ok(Point { timestamp, value })
            }
        }

        deserializer.deserialize_seq(PointVisitor)
    }
}

/// Shape of a metric's result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// One sample per series (instant query)
    #[default]
    Vector,
    /// A point series per series (range query)
    Matrix,
}

/// One labelled series of a metric, plus derived statistics for meters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    #[serde(rename = "metric", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(rename = "value", default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<Point>,

    #[serde(rename = "values", default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<Point>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_unit: Option<String>,
}

impl MetricValue {
    /// Vector value with a single sample
    pub fn with_sample(labels: BTreeMap<String, String>, sample: Point) -> Self {
        Self {
            labels,
            sample: Some(sample),
            ..Default::default()
        }
    }

    /// Matrix value with a point series
    pub fn with_series(labels: BTreeMap<String, String>, series: Vec<Point>) -> Self {
        Self {
            labels,
            series: Some(series),
            ..Default::default()
        }
    }

    /// Label value, treating an empty string as absent
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Result payload of one metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    #[serde(rename = "resultType")]
    pub result_type: MetricType,
    #[serde(rename = "result", default)]
    pub result: Vec<MetricValue>,
}

/// One named metric of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    #[serde(default)]
    pub data: MetricData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, data: MetricData) -> Self {
        Self {
            metric_name: name.into(),
            data,
            error: None,
        }
    }

    /// A metric that carries no data, used for NoHit responses
    pub fn empty(name: impl Into<String>, result_type: MetricType) -> Self {
        Self::new(
            name,
            MetricData {
                result_type,
                result: Vec::new(),
            },
        )
    }

    /// A metric whose query failed
    pub fn failed(name: impl Into<String>, result_type: MetricType, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::empty(name, result_type)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Vector metrics without an error take part in sorting and paging
    pub(crate) fn is_sortable(&self) -> bool {
        self.data.result_type == MetricType::Vector && !self.is_failed()
    }
}

/// A batch of metrics with paging metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub results: Vec<Metric>,
    #[serde(rename = "page", default, skip_serializing_if = "is_zero")]
    pub current_page: usize,
    #[serde(rename = "total_page", default, skip_serializing_if = "is_zero")]
    pub total_pages: usize,
    #[serde(rename = "total_item", default, skip_serializing_if = "is_zero")]
    pub total_items: usize,
}

fn is_zero(v: &usize) -> bool {
    *v == 0
}

impl MetricResult {
    pub fn new(results: Vec<Metric>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    /// Look up a metric by name
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.results.iter().find(|m| m.metric_name == name)
    }
}

/// Unit prices used to turn metered usage into a fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
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

fn default_currency_unit() -> String {
    "USD".to_string()
}

impl Default for PriceInfo {
    fn default() -> Self {
        Self {
            cpu_per_core_per_hour: 0.0,
            mem_per_gigabytes_per_hour: 0.0,
            ingress_network_traffic_per_megabytes_per_hour: 0.0,
            egress_network_traffic_per_megabytes_per_hour: 0.0,
            pvc_per_gigabytes_per_hour: 0.0,
            currency_unit: default_currency_unit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_value_as_string() {
        let json = serde_json::to_string(&Point::new(1585836666.0, 0.25)).unwrap();
        assert_eq!(json, r#"[1585836666.0,"0.25"]"#);

        let json = serde_json::to_string(&Point::new(1.0, f64::NAN)).unwrap();
        assert_eq!(json, r#"[1.0,"NaN"]"#);
    }

    #[test]
    fn test_point_deserializes_prometheus_sample() {
        let p: Point = serde_json::from_str(r#"[1585836666.781, "3"]"#).unwrap();
        assert_eq!(p.timestamp, 1585836666.781);
        assert_eq!(p.value, 3.0);

        let p: Point = serde_json::from_str(r#"[1, "+Inf"]"#).unwrap();
        assert!(p.value.is_infinite());

        let p: Point = serde_json::from_str(r#"[1, "NaN"]"#).unwrap();
        assert!(p.value.is_nan());

        assert!(serde_json::from_str::<Point>(r#"[1, "abc"]"#).is_err());
    }

    #[test]
    fn test_metric_value_shape() {
        let mut labels = BTreeMap::new();
        labels.insert("node".to_string(), "node-1".to_string());
        let value = MetricValue::with_sample(labels, Point::new(10.0, 1.5));

        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["metric"]["node"], "node-1");
        assert_eq!(json["value"][1], "1.5");
        assert!(json.get("values").is_none());
        assert!(json.get("fee").is_none());
    }

    #[test]
    fn test_metric_result_wire_names() {
        let result = MetricResult {
            results: vec![Metric::failed("node_cpu_usage", MetricType::Vector, "boom")],
            current_page: 2,
            total_pages: 3,
            total_items: 11,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["total_page"], 3);
        assert_eq!(json["total_item"], 11);
        assert_eq!(json["results"][0]["metric_name"], "node_cpu_usage");
        assert_eq!(json["results"][0]["data"]["resultType"], "vector");
        assert_eq!(json["results"][0]["error"], "boom");
    }

    #[test]
    fn test_unsorted_result_omits_paging_fields() {
        let json = serde_json::to_value(MetricResult::new(vec![])).unwrap();
        assert!(json.get("page").is_none());
        assert!(json.get("total_item").is_none());
    }

    #[test]
    fn test_label_treats_empty_as_absent() {
        let mut labels = BTreeMap::new();
        labels.insert("pod".to_string(), String::new());
        let value = MetricValue::with_sample(labels, Point::default());
        assert_eq!(value.label("pod"), None);
        assert_eq!(value.label("node"), None);
    }
}
