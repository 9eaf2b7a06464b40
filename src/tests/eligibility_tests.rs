use super::support::{disk, policy, vm};
use crate::balancer::{classify, filter_migratable, PowerPolicy, Verdict, OVF_STORE_NAME};
use crate::inventory::build_owner_map;
use crate::platform::{DiskStatus, VmStatus};
use std::collections::{HashMap, HashSet};

fn no_templates() -> HashSet<String> {
    HashSet::new()
}

#[test]
fn test_orphan_disk_is_migratable() {
    let d = disk("orphan", 10);
    assert_eq!(classify(&d, None, &no_templates(), PowerPolicy::DownOnly), Verdict::Migratable);
}

#[test]
fn test_template_disk_is_never_migrated() {
    let d = disk("tpl", 10);
    let templates: HashSet<String> = ["tpl".to_string()].into();
    assert_eq!(classify(&d, None, &templates, PowerPolicy::Both), Verdict::TemplateDisk);
}

#[test]
fn test_ovf_store_is_never_migrated() {
    let mut d = disk("ovf", 10);
    d.name = OVF_STORE_NAME.to_string();
    assert_eq!(classify(&d, None, &no_templates(), PowerPolicy::Both), Verdict::OvfStore);
}

#[test]
fn test_non_ok_status_excluded_with_or_without_owner() {
    let mut d = disk("busy", 10);
    d.status = DiskStatus::Locked;
    let owner = vm("web", VmStatus::Down, false, &["busy"]);

    assert_eq!(
        classify(&d, Some(&owner), &no_templates(), PowerPolicy::Both),
        Verdict::NotOk(DiskStatus::Locked)
    );
    assert_eq!(
        classify(&d, None, &no_templates(), PowerPolicy::Both),
        Verdict::NotOk(DiskStatus::Locked)
    );
}

#[test]
fn test_stateless_running_vm_excluded_under_any_policy() {
    let d = disk("d1", 10);
    let owner = vm("kiosk", VmStatus::Up, true, &["d1"]);
    for policy in [PowerPolicy::Both, PowerPolicy::UpOnly, PowerPolicy::DownOnly] {
        assert_eq!(
            classify(&d, Some(&owner), &no_templates(), policy),
            Verdict::StatelessRunning,
            "policy {policy}"
        );
    }
}

#[test]
fn test_power_policy_rules() {
    let d = disk("d1", 10);
    let up = vm("up", VmStatus::Up, false, &["d1"]);
    let down = vm("down", VmStatus::Down, true, &["d1"]);
    let t = no_templates();

    assert_eq!(
        classify(&d, Some(&up), &t, PowerPolicy::DownOnly),
        Verdict::RunningExcludedByPolicy
    );
    assert_eq!(classify(&d, Some(&up), &t, PowerPolicy::UpOnly), Verdict::Migratable);
    assert_eq!(
        classify(&d, Some(&down), &t, PowerPolicy::UpOnly),
        Verdict::StoppedExcludedByPolicy
    );
    assert_eq!(classify(&d, Some(&down), &t, PowerPolicy::DownOnly), Verdict::Migratable);
    assert_eq!(classify(&d, Some(&down), &t, PowerPolicy::Both), Verdict::Migratable);
}

#[test]
fn test_owned_template_id_is_judged_by_owner() {
    // The template rule only applies to disks without an owning VM.
    let d = disk("shared", 10);
    let templates: HashSet<String> = ["shared".to_string()].into();
    let owner = vm("web", VmStatus::Down, false, &["shared"]);
    assert_eq!(classify(&d, Some(&owner), &templates, PowerPolicy::Both), Verdict::Migratable);
}

#[test]
fn test_filter_keeps_input_order() {
    let disks = vec![disk("a", 1), disk("b", 2), disk("c", 3), disk("d", 4)];
    let owners = build_owner_map(vec![vm("kiosk", VmStatus::Up, true, &["b"])]);
    let templates: HashSet<String> = ["d".to_string()].into();

    let result = filter_migratable(&disks, &owners, &templates, &policy(85));
    let ids: Vec<&str> = result.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["a", "c"]);
}

#[test]
fn test_unresolved_owner_treated_as_orphan() {
    let disks = vec![disk("lost", 5)];
    let result = filter_migratable(&disks, &HashMap::new(), &HashSet::new(), &policy(85));
    assert_eq!(result.len(), 1);
}

#[test]
fn test_owner_map_first_vm_wins() {
    let owners = build_owner_map(vec![
        vm("first", VmStatus::Down, false, &["d1"]),
        vm("clone", VmStatus::Up, true, &["d1", "d2"]),
    ]);
    assert_eq!(owners["d1"].name, "first");
    assert_eq!(owners["d2"].name, "clone");
}
