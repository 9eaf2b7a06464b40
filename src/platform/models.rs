use serde::{Deserialize, Serialize};
use std::fmt;

/// A capacity-bounded storage backend as seen in one inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StorageDomain {
    pub id: String,
    pub name: String,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub datacenter_id: Option<String>,
    pub datacenter_name: Option<String>,
}

impl StorageDomain {
    pub(crate) const fn capacity_bytes(&self) -> u64 {
        self.used_bytes.saturating_add(self.free_bytes)
    }

    /// Occupancy as a truncated integer percentage, `None` for a domain with no capacity.
    pub(crate) fn percent_usage(&self) -> Option<u64> {
        percent_of(self.used_bytes, self.capacity_bytes())
    }
}

/// `used * 100 / capacity` with integer truncation (84.9% is 84).
///
/// Computed in `u128` so multi-petabyte domains cannot overflow. `used` may
/// exceed `capacity` when projecting, in which case the result exceeds 100.
pub(crate) fn percent_of(used: u64, capacity: u64) -> Option<u64> {
    if capacity == 0 {
        return None;
    }
    let pct = u128::from(used) * 100 / u128::from(capacity);
    Some(u64::try_from(pct).unwrap_or(u64::MAX))
}

/// Lifecycle status of a disk image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DiskStatus {
    Ok,
    Locked,
    Illegal,
    #[serde(other)]
    Unknown,
}

impl DiskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Locked => "locked",
            Self::Illegal => "illegal",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A virtual disk image, the unit of migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Disk {
    pub id: String,
    pub name: String,
    pub actual_size_bytes: u64,
    pub status: DiskStatus,
}

/// Power state of a VM. Transitional platform states map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum VmStatus {
    Up,
    Down,
    #[serde(other)]
    Other,
}

impl VmStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A VM together with the ids of the disks attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Vm {
    pub id: String,
    pub name: String,
    pub status: VmStatus,
    pub stateless: bool,
    pub disk_ids: Vec<String>,
}
