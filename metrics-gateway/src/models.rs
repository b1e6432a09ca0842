use std::fmt;

/// A node scraped by Prometheus, addressed by its `instance` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub instance: String,
    pub label: Option<String>,
}

impl Host {
    pub fn new(instance: impl Into<String>, label: Option<String>) -> Self {
        Self {
            instance: instance.into(),
            label: label.filter(|l| !l.is_empty()),
        }
    }
}

/// The fixed set of measurements reported for every host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    MemTotalBytes,
    MemAvailableBytes,
    MemUsagePercent,
    FilesystemAvailableBytes,
    FilesystemTotalBytes,
    FilesystemUsagePercent,
    CpuUsagePercent,
    CpuCoresCount,
}

impl MetricKind {
    /// Evaluation order used by the host aggregator.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::MemTotalBytes,
        MetricKind::MemAvailableBytes,
        MetricKind::MemUsagePercent,
        MetricKind::FilesystemAvailableBytes,
        MetricKind::FilesystemTotalBytes,
        MetricKind::FilesystemUsagePercent,
        MetricKind::CpuUsagePercent,
        MetricKind::CpuCoresCount,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// JSON field name of this metric in the response document.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::MemTotalBytes => "mem_total_bytes",
            MetricKind::MemAvailableBytes => "mem_available_bytes",
            MetricKind::MemUsagePercent => "mem_usage_percent",
            MetricKind::FilesystemAvailableBytes => "filesystem_available_bytes",
            MetricKind::FilesystemTotalBytes => "filesystem_total_bytes",
            MetricKind::FilesystemUsagePercent => "filesystem_usage_percent",
            MetricKind::CpuUsagePercent => "cpu_usage_percent",
            MetricKind::CpuCoresCount => "cpu_cores_count",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `None` means the query failed. Zero is a real measurement.
pub type MetricValue = Option<f64>;

/// Values collected for one host during one request.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMetricsRecord {
    pub instance: String,
    pub label: Option<String>,
    values: [MetricValue; 8],
}

impl HostMetricsRecord {
    /// Record for `host` with every metric unavailable.
    pub fn empty(host: &Host) -> Self {
        Self {
            instance: host.instance.clone(),
            label: host.label.clone(),
            values: [None; 8],
        }
    }

    pub fn get(&self, kind: MetricKind) -> MetricValue {
        self.values[kind.index()]
    }

    pub fn set(&mut self, kind: MetricKind, value: MetricValue) {
        self.values[kind.index()] = value;
    }

    pub fn unavailable(&self) -> impl Iterator<Item = MetricKind> + '_ {
        MetricKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
    }
}
