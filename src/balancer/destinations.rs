use super::occupancy::is_overloaded;
use super::types::Policy;
use crate::platform::StorageDomain;
use tracing::debug;

/// Candidate destinations for moving disks off `source`, most free space first.
///
/// Only domains in the source's datacenter (and the configured scope, if any)
/// qualify. The source itself, excluded names, zero-capacity domains and
/// domains at or above the threshold are dropped. Equal free space is broken
/// by name so the order never depends on the platform's listing order.
pub(crate) fn select_destinations(
    all_domains: &[StorageDomain],
    source: &StorageDomain,
    policy: &Policy,
) -> Vec<StorageDomain> {
    let mut candidates: Vec<StorageDomain> = all_domains
        .iter()
        .filter(|sd| {
            if sd.id == source.id || sd.name == source.name {
                debug!("Discarding SD {} as it's the origin SD", sd.name);
                return false;
            }
            if sd.datacenter_id != source.datacenter_id {
                debug!("Discarding SD {} as it belongs to another datacenter", sd.name);
                return false;
            }
            if let Some(scope) = &policy.datacenter {
                if sd.datacenter_name.as_deref() != Some(scope.as_str()) {
                    debug!("Discarding SD {} as it's outside datacenter {}", sd.name, scope);
                    return false;
                }
            }
            if policy.excluded_domains.contains(&sd.name) {
                debug!("Discarding SD {} as it's excluded from balancing", sd.name);
                return false;
            }
            let Some(pct) = sd.percent_usage() else {
                debug!("Discarding SD {} as it reports no capacity", sd.name);
                return false;
            };
            if is_overloaded(Some(pct), policy.threshold) {
                debug!("Discarding SD {} as it's overused ({} perc.)", sd.name, pct);
                return false;
            }
            debug!("Tagging SD {} as a suitable destination", sd.name);
            true
        })
        .cloned()
        .collect();

    candidates.sort_by(|a, b| b.free_bytes.cmp(&a.free_bytes).then_with(|| a.name.cmp(&b.name)));
    candidates
}
