use super::types::{MigrationMap, PlanResult};
use crate::platform::{percent_of, Disk, StorageDomain};
use tracing::{debug, info};

/// Simulated occupancy of one domain while planning. Never written back.
#[derive(Debug)]
struct DomainProjection<'a> {
    domain: &'a StorageDomain,
    /// Simulated used bytes (changes as moves are planned).
    sim_used: u64,
}

impl<'a> DomainProjection<'a> {
    const fn new(domain: &'a StorageDomain) -> Self {
        Self { domain, sim_used: domain.used_bytes }
    }

    /// Capacity stays fixed while the projected numerator moves.
    fn sim_percent(&self) -> Option<u64> {
        percent_of(self.sim_used, self.domain.capacity_bytes())
    }

    fn accepts(&self, size: u64, threshold: u8) -> bool {
        percent_of(self.sim_used.saturating_add(size), self.domain.capacity_bytes())
            .is_some_and(|pct| pct < u64::from(threshold))
    }

    fn below(&self, threshold: u8) -> bool {
        self.sim_percent().is_some_and(|pct| pct < u64::from(threshold))
    }
}

/// What-if state for one planning run, kept apart from the snapshot it was built from.
struct PlanContext<'a> {
    threshold: u8,
    source: DomainProjection<'a>,
    destinations: Vec<DomainProjection<'a>>,
}

/// Sort disks largest first. Equal sizes keep their input order.
pub(crate) fn sort_largest_first(disks: &mut [Disk]) {
    disks.sort_by(|a, b| b.actual_size_bytes.cmp(&a.actual_size_bytes));
}

/// Greedy bin-packing of disks into destinations.
///
/// `disks` must be sorted largest first and `destinations` most free first.
/// Each disk goes to the first destination that stays strictly below the
/// threshold after receiving it; a disk that fits nowhere is skipped. Planning
/// stops as soon as the source's projected occupancy drops below the threshold.
pub(crate) fn build_plan(
    source: &StorageDomain,
    disks: &[Disk],
    destinations: &[StorageDomain],
    threshold: u8,
) -> PlanResult {
    let mut ctx = PlanContext {
        threshold,
        source: DomainProjection::new(source),
        destinations: destinations.iter().map(DomainProjection::new).collect(),
    };
    let mut map = MigrationMap::default();

    'disks: for disk in disks {
        for dest in &mut ctx.destinations {
            debug!(
                "Checking if disk {} fits in {}... (disk real size: {} bytes)",
                disk.id, dest.domain.name, disk.actual_size_bytes
            );
            if !dest.accepts(disk.actual_size_bytes, ctx.threshold) {
                debug!(
                    "Disk would trespass occupation threshold ({} perc.) on {}",
                    ctx.threshold, dest.domain.name
                );
                continue;
            }

            dest.sim_used = dest.sim_used.saturating_add(disk.actual_size_bytes);
            ctx.source.sim_used = ctx.source.sim_used.saturating_sub(disk.actual_size_bytes);
            map.assign(dest.domain, disk.clone());

            if ctx.source.below(ctx.threshold) {
                debug!("The origin SD {} is below occupation threshold", source.name);
                break 'disks;
            }
            continue 'disks;
        }
        debug!("Disk {} fits in no destination, skipping", disk.id);
    }

    let projected_source_percent = ctx.source.sim_percent();
    let relieves_source = ctx.source.below(ctx.threshold);

    info!(
        "Plan for {}: {} disks, {} bytes, occupancy {:?}% -> {:?}%",
        source.name,
        map.disk_count(),
        map.total_bytes(),
        source.percent_usage(),
        projected_source_percent,
    );

    PlanResult { map, projected_source_percent, relieves_source }
}
