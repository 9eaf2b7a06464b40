mod error;
mod models;
mod ovirt;
pub(crate) mod wire;

pub(crate) use error::PlatformError;
pub(crate) use models::{percent_of, Disk, DiskStatus, StorageDomain, Vm, VmStatus};
pub(crate) use ovirt::OvirtClient;

use async_trait::async_trait;
use std::collections::HashSet;

/// Restricts which storage domains a listing returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DomainFilter {
    /// Sorted, so that the generated search query is stable.
    pub excluded_names: Vec<String>,
    pub datacenter: Option<String>,
}

impl DomainFilter {
    pub(crate) fn new<'a>(
        excluded: impl IntoIterator<Item = &'a String>,
        datacenter: Option<&str>,
    ) -> Self {
        let mut excluded_names: Vec<String> = excluded.into_iter().cloned().collect();
        excluded_names.sort();
        Self { excluded_names, datacenter: datacenter.map(str::to_string) }
    }
}

/// The read and move operations the balancer consumes from the management platform.
///
/// Every call is remote and fallible. Only the list/get queries are safe to repeat.
#[async_trait]
pub(crate) trait Platform: Send + Sync {
    /// Verify the endpoint is reachable and the credentials are accepted.
    async fn test_connection(&self) -> Result<(), PlatformError>;

    async fn list_storage_domains(
        &self,
        filter: &DomainFilter,
    ) -> Result<Vec<StorageDomain>, PlatformError>;

    /// Disks stored on the named domain.
    async fn list_disks(&self, domain_name: &str) -> Result<Vec<Disk>, PlatformError>;

    /// All VMs, each carrying the ids of its attached disks.
    async fn list_vms(&self) -> Result<Vec<Vm>, PlatformError>;

    async fn list_template_disk_ids(&self) -> Result<HashSet<String>, PlatformError>;

    /// Ask the platform to move a disk. Returns once the request is accepted,
    /// not when the copy completes.
    async fn move_disk(
        &self,
        disk_id: &str,
        destination: &StorageDomain,
    ) -> Result<(), PlatformError>;

    async fn disk_status(&self, disk_id: &str) -> Result<DiskStatus, PlatformError>;
}
