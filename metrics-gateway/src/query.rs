//! PromQL expressions for every [`MetricKind`].
//!
//! Node metrics come from node-exporter, scraped under the `node-exporter`
//! job. The instance identifier is interpolated verbatim; Prometheus rejects
//! anything that does not form a valid selector.

use crate::models::MetricKind;

const JOB: &str = "node-exporter";

pub fn build_query(kind: MetricKind, instance: &str) -> String {
    let node = format!(r#"job="{JOB}", instance="{instance}""#);
    let root_fs = format!(r#"{node}, fstype!="", mountpoint="/""#);

    match kind {
        MetricKind::MemTotalBytes => format!("node_memory_MemTotal_bytes{{{node}}}"),
        MetricKind::MemAvailableBytes => format!("node_memory_MemAvailable_bytes{{{node}}}"),
        MetricKind::MemUsagePercent => format!(
            "100 - (avg(node_memory_MemAvailable_bytes{{{node}}}) / avg(node_memory_MemTotal_bytes{{{node}}}) * 100)"
        ),
        MetricKind::FilesystemAvailableBytes => {
            format!("node_filesystem_avail_bytes{{{root_fs}}}")
        }
        MetricKind::FilesystemTotalBytes => format!("node_filesystem_size_bytes{{{root_fs}}}"),
        MetricKind::FilesystemUsagePercent => format!(
            "100 - (node_filesystem_avail_bytes{{{root_fs}}} / node_filesystem_size_bytes{{{root_fs}}} * 100)"
        ),
        // cpu series are selected without the job label, node-exporter is the only exporter of them
        MetricKind::CpuUsagePercent => format!(
            r#"(1 - avg by (instance) (rate(node_cpu_seconds_total{{mode="idle", instance="{instance}"}}[5m]))) * 100"#
        ),
        MetricKind::CpuCoresCount => {
            format!(r#"count(node_cpu_seconds_total{{mode="idle", instance="{instance}"}})"#)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_usage_expression() {
        assert_eq!(
            build_query(MetricKind::CpuUsagePercent, "10.0.0.5:9100"),
            r#"(1 - avg by (instance) (rate(node_cpu_seconds_total{mode="idle", instance="10.0.0.5:9100"}[5m]))) * 100"#
        );
    }

    #[test]
    fn test_gauge_expressions() {
        assert_eq!(
            build_query(MetricKind::MemTotalBytes, "h1:9100"),
            r#"node_memory_MemTotal_bytes{job="node-exporter", instance="h1:9100"}"#
        );
        assert_eq!(
            build_query(MetricKind::FilesystemTotalBytes, "h1:9100"),
            r#"node_filesystem_size_bytes{job="node-exporter", instance="h1:9100", fstype!="", mountpoint="/"}"#
        );
        assert_eq!(
            build_query(MetricKind::CpuCoresCount, "h1:9100"),
            r#"count(node_cpu_seconds_total{mode="idle", instance="h1:9100"})"#
        );
    }

    #[test]
    fn test_usage_percent_expressions() {
        assert_eq!(
            build_query(MetricKind::MemUsagePercent, "h1"),
            r#"100 - (avg(node_memory_MemAvailable_bytes{job="node-exporter", instance="h1"}) / avg(node_memory_MemTotal_bytes{job="node-exporter", instance="h1"}) * 100)"#
        );
        let fs = build_query(MetricKind::FilesystemUsagePercent, "h1");
        assert!(fs.starts_with("100 - (node_filesystem_avail_bytes{"));
        assert_eq!(fs.matches(r#"mountpoint="/""#).count(), 2);
    }

    #[test]
    fn test_every_kind_is_distinct_and_targets_instance() {
        let exprs: Vec<String> = MetricKind::ALL
            .iter()
            .map(|kind| build_query(*kind, "node-7:9100"))
            .collect();
        for (i, expr) in exprs.iter().enumerate() {
            assert!(expr.contains(r#"instance="node-7:9100""#), "{expr}");
            assert!(!exprs[i + 1..].contains(expr));
        }
    }
}
