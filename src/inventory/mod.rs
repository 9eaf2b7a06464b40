use crate::platform::{Disk, DomainFilter, Platform, PlatformError, StorageDomain, Vm};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Storage domains as reported at one point in time.
#[derive(Debug, Clone)]
pub(crate) struct DomainSnapshot {
    pub domains: Vec<StorageDomain>,
    pub taken_at: DateTime<Utc>,
}

impl DomainSnapshot {
    pub(crate) fn find(&self, id: &str) -> Option<&StorageDomain> {
        self.domains.iter().find(|sd| sd.id == id)
    }
}

/// Take a fresh snapshot of the storage domains matching `filter`.
pub(crate) async fn snapshot_domains(
    platform: &dyn Platform,
    filter: &DomainFilter,
) -> Result<DomainSnapshot, PlatformError> {
    let domains = platform.list_storage_domains(filter).await?;
    debug!("Snapshot holds {} storage domains", domains.len());
    Ok(DomainSnapshot { domains, taken_at: Utc::now() })
}

/// Disks of one source domain plus what is needed to judge their eligibility.
#[derive(Debug, Clone, Default)]
pub(crate) struct DiskInventory {
    pub disks: Vec<Disk>,
    /// Disk id → owning VM, precomputed once per inventory.
    pub owners: HashMap<String, Vm>,
    pub template_disk_ids: HashSet<String>,
}

/// Gather the disks stored on `domain_name` with their VM owners and template membership.
///
/// VMs and templates are only listed when the domain actually holds disks.
pub(crate) async fn snapshot_disks(
    platform: &dyn Platform,
    domain_name: &str,
) -> Result<DiskInventory, PlatformError> {
    let disks = platform.list_disks(domain_name).await?;
    if disks.is_empty() {
        return Ok(DiskInventory::default());
    }

    let owners = build_owner_map(platform.list_vms().await?);
    let template_disk_ids = platform.list_template_disk_ids().await?;

    Ok(DiskInventory { disks, owners, template_disk_ids })
}

/// Map every attached disk id to its owning VM.
///
/// When several VMs reference the same disk, the first VM in listing order
/// owns it and the others are reported.
pub(crate) fn build_owner_map(vms: Vec<Vm>) -> HashMap<String, Vm> {
    let mut owners: HashMap<String, Vm> = HashMap::new();
    for vm in vms {
        for disk_id in &vm.disk_ids {
            if let Some(existing) = owners.get(disk_id) {
                warn!(
                    "Disk {} is attached to both {} and {}, keeping {} as owner",
                    disk_id, existing.name, vm.name, existing.name
                );
                continue;
            }
            owners.insert(disk_id.clone(), vm.clone());
        }
    }
    owners
}
