//! The JSON document served on `GET /`.

use crate::config::UnavailableAs;
use crate::models::{HostMetricsRecord, MetricKind};
use serde::Serialize;

pub const ERROR_CODE: &str = "ERROR";
pub const ERROR_MESSAGE: &str = "Some metrics are not available";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Metadata {
    pub hostname: String,
    pub version: String,
}

impl Metadata {
    /// Identity of this process: OS hostname and `v<crate version>`.
    pub fn current() -> Self {
        Self {
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
            version: format!("v{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERR")]
    Err,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeMetrics {
    pub instance: String,
    pub hostname: String,
    pub mem_total_bytes: Option<f64>,
    pub mem_available_bytes: Option<f64>,
    pub mem_usage_percent: Option<f64>,
    pub filesystem_available_bytes: Option<f64>,
    pub filesystem_total_bytes: Option<f64>,
    pub filesystem_usage_percent: Option<f64>,
    pub cpu_usage_percent: Option<f64>,
    pub cpu_cores_count: Option<f64>,
}

impl NodeMetrics {
    fn from_record(record: &HostMetricsRecord, unavailable_as: UnavailableAs) -> Self {
        let value = |kind: MetricKind| match (record.get(kind), unavailable_as) {
            (Some(v), _) => Some(v),
            (None, UnavailableAs::Zero) => Some(0.0),
            (None, UnavailableAs::Null) => None,
        };
        Self {
            instance: record.instance.clone(),
            hostname: record.label.clone().unwrap_or_default(),
            mem_total_bytes: value(MetricKind::MemTotalBytes),
            mem_available_bytes: value(MetricKind::MemAvailableBytes),
            mem_usage_percent: value(MetricKind::MemUsagePercent),
            filesystem_available_bytes: value(MetricKind::FilesystemAvailableBytes),
            filesystem_total_bytes: value(MetricKind::FilesystemTotalBytes),
            filesystem_usage_percent: value(MetricKind::FilesystemUsagePercent),
            cpu_usage_percent: value(MetricKind::CpuUsagePercent),
            cpu_cores_count: value(MetricKind::CpuCoresCount),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FleetResponse {
    pub metadata: Metadata,
    pub status: Status,
    pub error_code: String,
    pub error_message: String,
    pub metrics: Vec<NodeMetrics>,
}

pub fn build_response(
    metadata: Metadata,
    records: &[HostMetricsRecord],
    fleet_ok: bool,
    unavailable_as: UnavailableAs,
) -> FleetResponse {
    let (status, error_code, error_message) = if fleet_ok {
        (Status::Ok, String::new(), String::new())
    } else {
        (Status::Err, ERROR_CODE.to_string(), ERROR_MESSAGE.to_string())
    };

    FleetResponse {
        metadata,
        status,
        error_code,
        error_message,
        metrics: records
            .iter()
            .map(|r| NodeMetrics::from_record(r, unavailable_as))
            .collect(),
    }
}
