use crate::inventory::DomainSnapshot;
use crate::platform::StorageDomain;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Occupancy of one storage domain relative to the threshold.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DomainUsage {
    #[serde(flatten)]
    pub domain: StorageDomain,
    /// `None` when the domain reports zero capacity.
    pub percent_usage: Option<u64>,
    pub overloaded: bool,
}

/// Occupancy of every domain in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OccupancyReport {
    pub threshold: u8,
    pub taken_at: DateTime<Utc>,
    pub domains: Vec<DomainUsage>,
}

impl OccupancyReport {
    /// Overloaded domains in snapshot order.
    pub(crate) fn overloaded(&self) -> impl Iterator<Item = &DomainUsage> {
        self.domains.iter().filter(|d| d.overloaded)
    }
}

/// A domain is overloaded once it reaches the threshold. Zero-capacity domains never are.
pub(crate) fn is_overloaded(percent_usage: Option<u64>, threshold: u8) -> bool {
    percent_usage.is_some_and(|pct| pct >= u64::from(threshold))
}

/// Compute per-domain occupancy for a snapshot. Order follows the snapshot.
pub(crate) fn analyze(snapshot: &DomainSnapshot, threshold: u8) -> OccupancyReport {
    let domains = snapshot
        .domains
        .iter()
        .map(|sd| {
            let percent_usage = sd.percent_usage();
            DomainUsage {
                domain: sd.clone(),
                percent_usage,
                overloaded: is_overloaded(percent_usage, threshold),
            }
        })
        .collect();

    OccupancyReport { threshold, taken_at: snapshot.taken_at, domains }
}
