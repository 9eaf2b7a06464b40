use crate::balancer::{Policy, PowerPolicy};
use crate::config::AppConfig;
use crate::platform::{
    Disk, DiskStatus, DomainFilter, Platform, PlatformError, StorageDomain, Vm, VmStatus,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub(crate) const GB: u64 = 1024 * 1024 * 1024;

pub(crate) fn domain(name: &str, used: u64, free: u64) -> StorageDomain {
    domain_in(name, used, free, "Default")
}

pub(crate) fn domain_in(name: &str, used: u64, free: u64, datacenter: &str) -> StorageDomain {
    StorageDomain {
        id: format!("sd-{name}"),
        name: name.to_string(),
        used_bytes: used,
        free_bytes: free,
        datacenter_id: Some(format!("dc-{datacenter}")),
        datacenter_name: Some(datacenter.to_string()),
    }
}

pub(crate) fn disk(id: &str, size: u64) -> Disk {
    Disk {
        id: id.to_string(),
        name: format!("{id}_Disk1"),
        actual_size_bytes: size,
        status: DiskStatus::Ok,
    }
}

pub(crate) fn vm(name: &str, status: VmStatus, stateless: bool, disk_ids: &[&str]) -> Vm {
    Vm {
        id: format!("vm-{name}"),
        name: name.to_string(),
        status,
        stateless,
        disk_ids: disk_ids.iter().map(|d| (*d).to_string()).collect(),
    }
}

pub(crate) fn policy(threshold: u8) -> Policy {
    Policy {
        threshold,
        power_policy: PowerPolicy::Both,
        datacenter: None,
        excluded_domains: HashSet::new(),
    }
}

/// Config with every wait shortened so executor tests finish immediately.
pub(crate) fn test_config(threshold: u8) -> AppConfig {
    AppConfig {
        uri: "https://engine.test/ovirt-engine/api".to_string(),
        username: "admin@internal".to_string(),
        password: "secret".to_string(),
        ca_path: "/etc/pki/ca.pem".to_string(),
        threshold: Some(threshold),
        iteration_sleep_secs: 1,
        unlock_initial_delay_secs: 0,
        unlock_poll_interval_secs: 0,
        unlock_timeout_secs: 1,
        ..AppConfig::default()
    }
}

/// In-memory management platform.
///
/// With `apply_moves` set, an accepted move shifts the disk's bytes from its
/// domain to the destination, so a following scan sees the new occupancy.
#[derive(Default)]
pub(crate) struct FakePlatform {
    pub domains: Mutex<Vec<StorageDomain>>,
    /// Listings served before falling back to `domains`, one per query.
    pub scripted_listings: Mutex<VecDeque<Vec<StorageDomain>>>,
    /// Disks keyed by the name of the domain holding them.
    pub disks: Mutex<HashMap<String, Vec<Disk>>>,
    pub vms: Mutex<Vec<Vm>>,
    pub template_disk_ids: Mutex<HashSet<String>>,
    pub fail_domain_listing: AtomicBool,
    pub failing_moves: Mutex<HashSet<String>>,
    /// Number of status polls a disk stays locked after its move.
    pub locked_polls: Mutex<HashMap<String, usize>>,
    pub apply_moves: AtomicBool,
    /// (disk id, destination name) in the order moves were issued.
    pub moves: Mutex<Vec<(String, String)>>,
    pub domain_queries: Mutex<Vec<DomainFilter>>,
}

impl FakePlatform {
    pub(crate) fn with_domains(domains: Vec<StorageDomain>) -> Self {
        let platform = Self::default();
        *platform.domains.lock().unwrap() = domains;
        platform
    }

    pub(crate) fn put_disks(&self, domain_name: &str, disks: Vec<Disk>) {
        self.disks.lock().unwrap().insert(domain_name.to_string(), disks);
    }

    pub(crate) fn moved(&self) -> Vec<(String, String)> {
        self.moves.lock().unwrap().clone()
    }

    fn relocate(&self, disk_id: &str, destination: &StorageDomain) {
        let mut disks = self.disks.lock().unwrap();
        let Some((source_name, index)) = disks.iter().find_map(|(name, list)| {
            list.iter().position(|d| d.id == disk_id).map(|i| (name.clone(), i))
        }) else {
            return;
        };
        let Some(moved) = disks.get_mut(&source_name).map(|list| list.remove(index)) else {
            return;
        };
        let size = moved.actual_size_bytes;
        disks.entry(destination.name.clone()).or_default().push(moved);

        for sd in self.domains.lock().unwrap().iter_mut() {
            if sd.name == source_name {
                sd.used_bytes -= size;
                sd.free_bytes += size;
            } else if sd.id == destination.id {
                sd.used_bytes += size;
                sd.free_bytes -= size;
            }
        }
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn test_connection(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn list_storage_domains(
        &self,
        filter: &DomainFilter,
    ) -> Result<Vec<StorageDomain>, PlatformError> {
        self.domain_queries.lock().unwrap().push(filter.clone());
        if self.fail_domain_listing.load(Ordering::SeqCst) {
            return Err(PlatformError::Http("connection refused".to_string()));
        }
        let listing = self
            .scripted_listings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.domains.lock().unwrap().clone());
        Ok(listing
            .into_iter()
            .filter(|sd| !filter.excluded_names.contains(&sd.name))
            .filter(|sd| {
                let scope = filter.datacenter.as_deref();
                scope.is_none_or(|dc| sd.datacenter_name.as_deref() == Some(dc))
            })
            .collect())
    }

    async fn list_disks(&self, domain_name: &str) -> Result<Vec<Disk>, PlatformError> {
        Ok(self.disks.lock().unwrap().get(domain_name).cloned().unwrap_or_default())
    }

    async fn list_vms(&self) -> Result<Vec<Vm>, PlatformError> {
        Ok(self.vms.lock().unwrap().clone())
    }

    async fn list_template_disk_ids(&self) -> Result<HashSet<String>, PlatformError> {
        Ok(self.template_disk_ids.lock().unwrap().clone())
    }

    async fn move_disk(
        &self,
        disk_id: &str,
        destination: &StorageDomain,
    ) -> Result<(), PlatformError> {
        self.moves.lock().unwrap().push((disk_id.to_string(), destination.name.clone()));
        if self.failing_moves.lock().unwrap().contains(disk_id) {
            return Err(PlatformError::Api {
                status: 409,
                body: "Cannot move Virtual Disk. Disk is locked.".to_string(),
            });
        }
        if self.apply_moves.load(Ordering::SeqCst) {
            self.relocate(disk_id, destination);
        }
        Ok(())
    }

    async fn disk_status(&self, disk_id: &str) -> Result<DiskStatus, PlatformError> {
        let mut locked = self.locked_polls.lock().unwrap();
        match locked.get_mut(disk_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(DiskStatus::Locked)
            }
            _ => Ok(DiskStatus::Ok),
        }
    }
}
