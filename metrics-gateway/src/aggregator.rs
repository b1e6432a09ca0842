//! Host and fleet aggregation.
//!
//! Every query is evaluated even when earlier ones failed: a failure only
//! leaves that metric unavailable and clears the `ok` flag. Nothing here
//! returns an error.

use crate::backend::MetricsBackend;
use crate::models::{Host, HostMetricsRecord, MetricKind};
use crate::query::build_query;
use tracing::{debug, warn};

/// Records for the whole fleet, in configured host order.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    pub records: Vec<HostMetricsRecord>,
    pub ok: bool,
}

pub async fn aggregate_host(
    backend: &dyn MetricsBackend,
    host: &Host,
) -> (HostMetricsRecord, bool) {
    let mut record = HostMetricsRecord::empty(host);
    let mut all_ok = true;

    for kind in MetricKind::ALL {
        let expr = build_query(kind, &host.instance);
        match backend.query(&expr).await {
            Ok(value) => record.set(kind, Some(value)),
            Err(e) => {
                warn!(instance = %host.instance, metric = %kind, error = %e, "metric unavailable");
                all_ok = false;
            }
        }
    }

    if !all_ok {
        let missing: Vec<&str> = record.unavailable().map(MetricKind::as_str).collect();
        debug!(instance = %host.instance, ?missing, "host incomplete");
    }

    (record, all_ok)
}

pub async fn aggregate_fleet(backend: &dyn MetricsBackend, hosts: &[Host]) -> FleetSnapshot {
    let mut records = Vec::with_capacity(hosts.len());
    let mut ok = true;

    for host in hosts {
        let (record, host_ok) = aggregate_host(backend, host).await;
        ok &= host_ok;
        records.push(record);
    }

    FleetSnapshot { records, ok }
}
