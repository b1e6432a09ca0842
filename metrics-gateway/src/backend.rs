//! Instant queries against the metrics backend.
//!
//! [`MetricsBackend`] is the seam the aggregator talks to; [`PrometheusBackend`]
//! implements it over the Prometheus HTTP API (`/api/v1/query`).

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered HTTP {0}")]
    Status(StatusCode),

    #[error("backend rejected query ({error_type}): {message}")]
    Api { error_type: String, message: String },

    #[error("malformed backend response: {0}")]
    Decode(String),

    #[error("expected a vector result, got {0}")]
    UnexpectedResultType(String),

    #[error("query matched no series")]
    EmptyResult,

    #[error("sample value {0:?} is not a number")]
    InvalidSample(String),

    #[error("sample value {0} is not finite")]
    NonFiniteSample(f64),
}

/// Evaluates one expression at the current time and returns a single scalar.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    async fn query(&self, expr: &str) -> Result<f64, BackendError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    data: Option<QueryData>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    // [unix timestamp, "value"]
    value: (f64, String),
}

pub struct PrometheusBackend {
    base_url: String,
    client: reqwest::Client,
}

impl PrometheusBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn query_url(&self) -> Result<Url, BackendError> {
        let invalid = |reason: String| BackendError::InvalidAddress {
            address: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("not a base URL".into()));
        }
        let path = format!("{}/api/v1/query", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url)
    }
}

#[async_trait]
impl MetricsBackend for PrometheusBackend {
    async fn query(&self, expr: &str) -> Result<f64, BackendError> {
        let url = self.query_url()?;
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(&[("query", expr), ("time", now.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Prometheus reports query errors as JSON with a 4xx/5xx status
        let api: ApiResponse = match serde_json::from_slice(&body) {
            Ok(api) => api,
            Err(_) if !status.is_success() => return Err(BackendError::Status(status)),
            Err(e) => return Err(BackendError::Decode(e.to_string())),
        };
        parse_vector_value(api)
    }
}

fn parse_vector_value(api: ApiResponse) -> Result<f64, BackendError> {
    if api.status != "success" {
        return Err(BackendError::Api {
            error_type: api.error_type.unwrap_or_else(|| "unknown".into()),
            message: api.error.unwrap_or_default(),
        });
    }
    let data = api
        .data
        .ok_or_else(|| BackendError::Decode("missing data".into()))?;
    if data.result_type != "vector" {
        return Err(BackendError::UnexpectedResultType(data.result_type));
    }

    let samples: Vec<VectorSample> =
        serde_json::from_value(data.result).map_err(|e| BackendError::Decode(e.to_string()))?;
    if samples.len() > 1 {
        debug!(series = samples.len(), "query matched several series, using the first");
    }
    let sample = samples.into_iter().next().ok_or(BackendError::EmptyResult)?;

    let raw = sample.value.1;
    let value: f64 = raw
        .parse()
        .map_err(|_| BackendError::InvalidSample(raw.clone()))?;
    if !value.is_finite() {
        return Err(BackendError::NonFiniteSample(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devkit::{PromResponse, StubAnswer, StubPrometheus};
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<f64, BackendError> {
        parse_vector_value(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn test_parse_first_sample() {
        let body = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"instance": "h1"}, "value": [1700000000.5, "42.5"]},
                    {"metric": {"instance": "h1"}, "value": [1700000000.5, "7"]}
                ]
            }
        });
        assert_eq!(parse(body).unwrap(), 42.5);
    }

    #[test]
    fn test_parse_zero_is_a_value() {
        assert_eq!(parse(PromResponse::vector(0.0)).unwrap(), 0.0);
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse(PromResponse::empty_vector()),
            Err(BackendError::EmptyResult)
        ));
        assert!(matches!(
            parse(PromResponse::scalar(3.0)),
            Err(BackendError::UnexpectedResultType(t)) if t == "scalar"
        ));
        assert!(matches!(
            parse(PromResponse::error("bad_data", "parse error")),
            Err(BackendError::Api { error_type, .. }) if error_type == "bad_data"
        ));
        assert!(matches!(
            parse(PromResponse::vector_raw("NaN")),
            Err(BackendError::NonFiniteSample(_))
        ));
        assert!(matches!(
            parse(PromResponse::vector_raw("abc")),
            Err(BackendError::InvalidSample(s)) if s == "abc"
        ));
    }

    #[test]
    fn test_query_url_keeps_base_path() {
        let backend = PrometheusBackend::new("http://prom:9090/prometheus/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            backend.query_url().unwrap().as_str(),
            "http://prom:9090/prometheus/api/v1/query"
        );
    }

    #[tokio::test]
    async fn test_malformed_address_is_a_query_error() {
        let backend = PrometheusBackend::new("not a url", Duration::from_secs(1)).unwrap();
        let err = backend.query("up").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_query_against_stub() {
        let stub = StubPrometheus::start().await.unwrap();
        stub.respond_when("node_memory_MemTotal_bytes", StubAnswer::Value(8.0e9));
        stub.respond_when("broken", StubAnswer::Error {
            error_type: "bad_data".into(),
            message: "unexpected end of input".into(),
        });
        stub.respond_when("down", StubAnswer::Unavailable);
        stub.respond_when("scalar(", StubAnswer::Scalar(1.0));

        let backend = PrometheusBackend::new(stub.url(), Duration::from_secs(5)).unwrap();

        assert_eq!(backend.query("node_memory_MemTotal_bytes").await.unwrap(), 8.0e9);
        assert!(matches!(
            backend.query("unknown_metric").await,
            Err(BackendError::EmptyResult)
        ));
        assert!(matches!(
            backend.query("broken").await,
            Err(BackendError::Api { .. })
        ));
        assert!(matches!(
            backend.query("down").await,
            Err(BackendError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
        assert!(matches!(
            backend.query("scalar(1)").await,
            Err(BackendError::UnexpectedResultType(t)) if t == "scalar"
        ));

        let received = stub.received_queries();
        assert_eq!(received.len(), 5);
        assert_eq!(received[0].query, "node_memory_MemTotal_bytes");
        let sent_at = received[0].time.as_deref().expect("time parameter sent");
        let sent_at = OffsetDateTime::parse(sent_at, &Rfc3339).unwrap();
        assert!((OffsetDateTime::now_utc() - sent_at).whole_seconds().abs() < 60);
    }

    #[tokio::test]
    async fn test_silent_backend_hits_deadline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept connections and never answer
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let backend = PrometheusBackend::new(format!("http://{addr}"), Duration::from_secs(1)).unwrap();
        let started = std::time::Instant::now();
        let result = backend.query("up").await;

        assert!(matches!(result, Err(BackendError::Transport(ref e)) if e.is_timeout()), "{result:?}");
        assert!(started.elapsed() < Duration::from_millis(1900));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let backend =
            PrometheusBackend::new(format!("http://127.0.0.1:{port}"), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            backend.query("up").await,
            Err(BackendError::Transport(_))
        ));
    }
}
