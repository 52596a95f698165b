//! Prometheus HTTP API backend

use super::TimeSeriesBackend;
use crate::error::BackendError;
use crate::models::{MetricData, MetricType, MetricValue, Point};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

/// Client for `/api/v1/query` and `/api/v1/query_range`
#[derive(Debug, Clone)]
pub struct PrometheusBackend {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Option<EnvelopeData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

impl PrometheusBackend {
    /// Create a backend for the Prometheus server at `endpoint`
    pub fn new(endpoint: &str, timeout: std::time::Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, endpoint)
    }

    pub fn with_client(client: Client, endpoint: &str) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(endpoint)
            .map_err(|e| BackendError::Decode(format!("invalid endpoint {endpoint:?}: {e}")))?;
        // keep any path prefix when joining API paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base_url
    }

    async fn call(&self, path: &str, params: &[(&str, String)]) -> Result<MetricData, BackendError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| BackendError::Decode(format!("invalid API path {path}: {e}")))?;

        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) if envelope.status == "success" => {
                let data = envelope
                    .data
                    .ok_or_else(|| BackendError::Decode("success response without data".into()))?;
                decode_data(data)
            }
            Ok(envelope) => Err(BackendError::Query {
                error_type: envelope.error_type.unwrap_or_else(|| "unknown".into()),
                message: envelope.error.unwrap_or_default(),
            }),
            Err(_) if !status.is_success() => Err(BackendError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(BackendError::Decode(e.to_string())),
        }
    }
}

fn decode_data(data: EnvelopeData) -> Result<MetricData, BackendError> {
    let decode = |e: serde_json::Error| BackendError::Decode(e.to_string());

    match data.result_type.as_str() {
        "vector" => Ok(MetricData {
            result_type: MetricType::Vector,
            result: serde_json::from_value(data.result).map_err(decode)?,
        }),
        "matrix" => Ok(MetricData {
            result_type: MetricType::Matrix,
            result: serde_json::from_value(data.result).map_err(decode)?,
        }),
        "scalar" => {
            let point: Point = serde_json::from_value(data.result).map_err(decode)?;
            Ok(MetricData {
                result_type: MetricType::Vector,
                result: vec![MetricValue::with_sample(BTreeMap::new(), point)],
            })
        }
        other => Err(BackendError::Decode(format!("unsupported result type {other:?}"))),
    }
}

/// Unix seconds with millisecond precision, as the HTTP API expects
fn unix_seconds(t: DateTime<Utc>) -> String {
    format!("{:.3}", t.timestamp_millis() as f64 / 1000.0)
}

fn step_seconds(step: Duration) -> String {
    let ms = step.num_milliseconds();
    if ms % 1000 == 0 {
        format!("{}", ms / 1000)
    } else {
        format!("{}.{:03}", ms / 1000, ms % 1000)
    }
}

#[async_trait]
impl TimeSeriesBackend for PrometheusBackend {
    async fn instant_query(&self, expr: &str, at: DateTime<Utc>) -> Result<MetricData, BackendError> {
        debug!(expr = %expr, "prometheus instant query");
        self.call(
            "api/v1/query",
            &[("query", expr.to_string()), ("time", unix_seconds(at))],
        )
        .await
    }

    async fn range_query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<MetricData, BackendError> {
        debug!(expr = %expr, "prometheus range query");
        self.call(
            "api/v1/query_range",
            &[
                ("query", expr.to_string()),
                ("start", unix_seconds(start)),
                ("end", unix_seconds(end)),
                ("step", step_seconds(step)),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn backend(url: &str) -> PrometheusBackend {
        PrometheusBackend::new(url, std::time::Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_instant_query_decodes_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "up".into()),
                Matcher::UrlEncoded("time".into(), "1585836666.000".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"success","data":{"resultType":"vector","result":[
                    {"metric":{"node":"node-1"},"value":[1585836666,"0.5"]},
                    {"metric":{"node":"node-2"},"value":[1585836666,"NaN"]}
                ]}}"#,
            )
            .create_async()
            .await;

        let data = backend(&server.url())
            .instant_query("up", ts(1585836666))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data.result_type, MetricType::Vector);
        assert_eq!(data.result.len(), 2);
        assert_eq!(data.result[0].label("node"), Some("node-1"));
        assert_eq!(data.result[0].sample.unwrap().value, 0.5);
        assert!(data.result[1].sample.unwrap().value.is_nan());
    }

    #[tokio::test]
    async fn test_range_query_decodes_matrix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "100.000".into()),
                Matcher::UrlEncoded("end".into(), "200.000".into()),
                Matcher::UrlEncoded("step".into(), "60".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"status":"success","data":{"resultType":"matrix","result":[
                    {"metric":{"pod":"web-0"},"values":[[100,"1"],[160,"2"]]}
                ]}}"#,
            )
            .create_async()
            .await;

        let data = backend(&server.url())
            .range_query("pod_cpu", ts(100), ts(200), Duration::seconds(60))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data.result_type, MetricType::Matrix);
        let series = data.result[0].series.as_ref().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1], Point::new(160.0, 2.0));
    }

    #[tokio::test]
    async fn test_scalar_becomes_single_sample() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"resultType":"scalar","result":[1,"42"]}}"#)
            .create_async()
            .await;

        let data = backend(&server.url())
            .instant_query("scalar(vector(42))", ts(1))
            .await
            .unwrap();
        assert_eq!(data.result_type, MetricType::Vector);
        assert_eq!(data.result[0].sample.unwrap().value, 42.0);
        assert!(data.result[0].labels.is_empty());
    }

    #[tokio::test]
    async fn test_query_error_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .instant_query("up{", ts(1))
            .await
            .unwrap_err();
        match err {
            BackendError::Query {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "bad_data");
                assert_eq!(message, "parse error at char 4");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_failure_keeps_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let err = backend(&server.url())
            .instant_query("up", ts(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
    }

    #[test]
    fn test_endpoint_path_prefix_is_kept() {
        let backend = backend("http://prometheus:9090/prom");
        assert_eq!(
            backend.endpoint().join("api/v1/query").unwrap().as_str(),
            "http://prometheus:9090/prom/api/v1/query"
        );
    }

    #[test]
    fn test_step_formatting() {
        assert_eq!(step_seconds(Duration::minutes(10)), "600");
        assert_eq!(step_seconds(Duration::milliseconds(1500)), "1.500");
    }

    #[test]
    fn test_unix_seconds_formatting() {
        assert_eq!(unix_seconds(ts(1585836666)), "1585836666.000");
        let before_epoch = Utc.timestamp_millis_opt(-500).unwrap();
        assert_eq!(unix_seconds(before_epoch), "-0.500");
        let fractional = Utc.timestamp_millis_opt(1585836666781).unwrap();
        assert_eq!(unix_seconds(fractional), "1585836666.781");
    }
}
