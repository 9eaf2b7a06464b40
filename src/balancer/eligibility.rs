use super::types::{Policy, PowerPolicy};
use crate::platform::{Disk, DiskStatus, Vm, VmStatus};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Reserved name of the engine's OVF metadata disks.
pub(crate) const OVF_STORE_NAME: &str = "OVF_STORE";

/// Why a disk may or may not be moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Migratable,
    TemplateDisk,
    OvfStore,
    NotOk(DiskStatus),
    StatelessRunning,
    RunningExcludedByPolicy,
    StoppedExcludedByPolicy,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Migratable => f.write_str("migratable"),
            Self::TemplateDisk => f.write_str("belongs to a template"),
            Self::OvfStore => f.write_str("is an OVF_STORE disk"),
            Self::NotOk(status) => write!(f, "has a different state from ok ({status})"),
            Self::StatelessRunning => f.write_str("belongs to a stateless and powered-on VM"),
            Self::RunningExcludedByPolicy => f.write_str("belongs to a powered-on VM"),
            Self::StoppedExcludedByPolicy => f.write_str("belongs to a powered-off VM"),
        }
    }
}

/// Decide whether one disk may be moved. The first matching rule wins.
pub(crate) fn classify(
    disk: &Disk,
    owner: Option<&Vm>,
    template_disk_ids: &HashSet<String>,
    power_policy: PowerPolicy,
) -> Verdict {
    let Some(vm) = owner else {
        if template_disk_ids.contains(&disk.id) {
            return Verdict::TemplateDisk;
        }
        if disk.name == OVF_STORE_NAME {
            return Verdict::OvfStore;
        }
        if disk.status != DiskStatus::Ok {
            return Verdict::NotOk(disk.status);
        }
        return Verdict::Migratable;
    };

    if disk.status != DiskStatus::Ok {
        return Verdict::NotOk(disk.status);
    }

    match (vm.status, power_policy) {
        (VmStatus::Up, _) if vm.stateless => Verdict::StatelessRunning,
        (VmStatus::Up, PowerPolicy::DownOnly) => Verdict::RunningExcludedByPolicy,
        (VmStatus::Down, PowerPolicy::UpOnly) => Verdict::StoppedExcludedByPolicy,
        _ => Verdict::Migratable,
    }
}

/// The migratable subset of `disks`, in input order.
///
/// A disk whose owner cannot be resolved is treated as having no VM.
pub(crate) fn filter_migratable(
    disks: &[Disk],
    owners: &HashMap<String, Vm>,
    template_disk_ids: &HashSet<String>,
    policy: &Policy,
) -> Vec<Disk> {
    disks
        .iter()
        .filter(|disk| {
            let owner = owners.get(&disk.id);
            let verdict = classify(disk, owner, template_disk_ids, policy.power_policy);
            let vm_name = owner.map_or("<NoVM>", |vm| vm.name.as_str());
            match verdict {
                Verdict::Migratable => {
                    debug!("Disk {} seems migratable (VM: {}), adding", disk.id, vm_name);
                    true
                }
                Verdict::RunningExcludedByPolicy | Verdict::StoppedExcludedByPolicy => {
                    debug!(
                        "Discarding disk {} as it {} ({}) and the policy is '{}'",
                        disk.id, verdict, vm_name, policy.power_policy
                    );
                    false
                }
                _ => {
                    debug!("Discarding disk {} as it {} (VM: {})", disk.id, verdict, vm_name);
                    false
                }
            }
        })
        .cloned()
        .collect()
}
