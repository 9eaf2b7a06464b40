use crate::platform::{Disk, StorageDomain};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Which disks may move, based on the power state of their owning VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PowerPolicy {
    /// Only disks of powered-off VMs.
    DownOnly,
    /// Only disks of running VMs.
    UpOnly,
    #[default]
    Both,
}

impl PowerPolicy {
    /// Accepts the short config forms (`d`, `u`, `du`) and the long ones.
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "d" | "down" | "down_only" => Some(Self::DownOnly),
            "u" | "up" | "up_only" => Some(Self::UpOnly),
            "du" | "ud" | "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DownOnly => "d",
            Self::UpOnly => "u",
            Self::Both => "du",
        }
    }
}

impl fmt::Display for PowerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable balancing policy, built once from the configuration.
#[derive(Debug, Clone)]
pub(crate) struct Policy {
    pub threshold: u8,
    pub power_policy: PowerPolicy,
    pub datacenter: Option<String>,
    pub excluded_domains: HashSet<String>,
}

/// One destination and the disks planned to move into it, in assignment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assignment {
    pub destination: StorageDomain,
    pub disks: Vec<Disk>,
}

impl Assignment {
    pub(crate) fn total_bytes(&self) -> u64 {
        self.disks.iter().map(|d| d.actual_size_bytes).sum()
    }
}

/// Destination → disks for one rebalancing pass. Built once, consumed once by the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MigrationMap {
    assignments: Vec<Assignment>,
}

impl MigrationMap {
    pub(crate) fn assign(&mut self, destination: &StorageDomain, disk: Disk) {
        let existing = self.assignments.iter_mut().find(|a| a.destination.id == destination.id);
        if let Some(entry) = existing {
            entry.disks.push(disk);
        } else {
            self.assignments
                .push(Assignment { destination: destination.clone(), disks: vec![disk] });
        }
    }

    pub(crate) fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub(crate) fn disk_count(&self) -> usize {
        self.assignments.iter().map(|a| a.disks.len()).sum()
    }

    pub(crate) fn total_bytes(&self) -> u64 {
        self.assignments.iter().map(Assignment::total_bytes).sum()
    }

    /// Disks assigned to the named destination, empty if it received none.
    #[cfg(test)]
    pub(crate) fn disks_for(&self, destination_name: &str) -> &[Disk] {
        self.assignments
            .iter()
            .find(|a| a.destination.name == destination_name)
            .map_or(&[], |a| a.disks.as_slice())
    }
}

/// Result of running the bin-packing planner for one source domain.
#[derive(Debug, Clone)]
pub(crate) struct PlanResult {
    pub map: MigrationMap,
    /// Simulated source occupancy once every planned move has completed.
    pub projected_source_percent: Option<u64>,
    /// Whether the plan brings the source below the threshold.
    pub relieves_source: bool,
}
