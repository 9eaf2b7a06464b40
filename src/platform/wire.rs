//! JSON shapes of the oVirt REST API v4.
//!
//! oVirt serializes numbers and booleans as strings and an empty collection
//! as `{}`, so every list field defaults to empty and scalar fields accept
//! both encodings.

use super::models::{Disk, DiskStatus, StorageDomain, Vm, VmStatus};
use super::DomainFilter;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// The engine's built-in image repository, never balanced.
pub(crate) const IMAGE_REPOSITORY_DOMAIN: &str = "ovirt-image-repository";

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrText {
    Bool(bool),
    Text(String),
}

fn de_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match BoolOrText::deserialize(deserializer)? {
        BoolOrText::Bool(b) => Ok(b),
        BoolOrText::Text(s) => Ok(s.eq_ignore_ascii_case("true")),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DataCenterRefs {
    #[serde(default)]
    pub data_center: Vec<IdRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStorageDomain {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub available: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub used: u64,
    #[serde(default)]
    pub data_centers: DataCenterRefs,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StorageDomainList {
    #[serde(default)]
    pub storage_domain: Vec<WireStorageDomain>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDataCenter {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataCenterList {
    #[serde(default)]
    pub data_center: Vec<WireDataCenter>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDisk {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub actual_size: u64,
    #[serde(default)]
    pub status: Option<DiskStatus>,
}

impl From<WireDisk> for Disk {
    fn from(d: WireDisk) -> Self {
        Self {
            id: d.id,
            name: d.name,
            actual_size_bytes: d.actual_size,
            status: d.status.unwrap_or(DiskStatus::Unknown),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiskList {
    #[serde(default)]
    pub disk: Vec<WireDisk>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVm {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "unknown_vm_status")]
    pub status: VmStatus,
    #[serde(default, deserialize_with = "de_bool")]
    pub stateless: bool,
}

const fn unknown_vm_status() -> VmStatus {
    VmStatus::Other
}

impl WireVm {
    pub(crate) fn into_vm(self, disk_ids: Vec<String>) -> Vm {
        Vm {
            id: self.id,
            name: self.name,
            status: self.status,
            stateless: self.stateless,
            disk_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VmList {
    #[serde(default)]
    pub vm: Vec<WireVm>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDiskAttachment {
    pub id: String,
    #[serde(default)]
    pub disk: Option<IdRef>,
}

impl WireDiskAttachment {
    /// Attachment ids equal the disk id, but prefer the explicit disk link when present.
    pub(crate) fn disk_id(self) -> String {
        self.disk.map_or(self.id, |d| d.id)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiskAttachmentList {
    #[serde(default)]
    pub disk_attachment: Vec<WireDiskAttachment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateList {
    #[serde(default)]
    pub template: Vec<IdRef>,
}

/// Body of the `move` action on a disk.
pub(crate) fn move_request(destination: &StorageDomain) -> serde_json::Value {
    serde_json::json!({ "storage_domain": { "id": destination.id } })
}

/// Build the engine search expression for a domain listing.
pub(crate) fn domain_search_query(filter: &DomainFilter) -> String {
    let mut query = format!("name != {IMAGE_REPOSITORY_DOMAIN}");
    for name in &filter.excluded_names {
        query.push_str(" and name != ");
        query.push_str(name);
    }
    if let Some(dc) = &filter.datacenter {
        query.push_str(" and datacenter = ");
        query.push_str(dc);
    }
    query
}

/// Attach datacenter names to raw domains. The first datacenter reference wins.
pub(crate) fn resolve_domains(
    domains: Vec<WireStorageDomain>,
    datacenters: &[WireDataCenter],
) -> Vec<StorageDomain> {
    let names: HashMap<&str, &str> =
        datacenters.iter().map(|dc| (dc.id.as_str(), dc.name.as_str())).collect();

    domains
        .into_iter()
        .map(|sd| {
            let datacenter_id = sd.data_centers.data_center.into_iter().next().map(|r| r.id);
            let datacenter_name = datacenter_id
                .as_deref()
                .and_then(|id| names.get(id))
                .map(|name| (*name).to_string());
            StorageDomain {
                id: sd.id,
                name: sd.name,
                used_bytes: sd.used,
                free_bytes: sd.available,
                datacenter_id,
                datacenter_name,
            }
        })
        .collect()
}
