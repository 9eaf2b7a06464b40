use super::support::{disk, domain, GB};
use crate::balancer::{build_plan, sort_largest_first, PlanResult};
use crate::platform::{percent_of, StorageDomain};

fn assert_destinations_safe(destinations: &[StorageDomain], plan: &PlanResult, threshold: u8) {
    for assignment in plan.map.assignments() {
        let dest = destinations.iter().find(|d| d.id == assignment.destination.id).unwrap();
        let projected =
            percent_of(dest.used_bytes + assignment.total_bytes(), dest.capacity_bytes());
        assert!(
            projected.is_some_and(|p| p < u64::from(threshold)),
            "{} would end at {:?}%",
            dest.name,
            projected
        );
    }
}

#[test]
fn test_single_disk_relieves_source() {
    let source = domain("src", 90 * GB, 10 * GB);
    let dests = vec![domain("dst", 40 * GB, 60 * GB)];
    let disks = vec![disk("big", 6 * GB), disk("mid", 3 * GB), disk("small", 2 * GB)];

    let plan = build_plan(&source, &disks, &dests, 85);

    assert_eq!(plan.map.disk_count(), 1);
    let ids: Vec<&str> = plan.map.disks_for("dst").iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["big"]);
    assert!(plan.relieves_source);
    assert_eq!(plan.projected_source_percent, Some(84));
}

#[test]
fn test_projection_carries_across_disks() {
    let source = domain("src", 300 * GB, 0);
    let dests = vec![domain("first", 70 * GB, 30 * GB), domain("second", 50 * GB, 50 * GB)];
    let disks = vec![disk("a", 10 * GB), disk("b", 10 * GB), disk("c", 10 * GB)];

    let plan = build_plan(&source, &disks, &dests, 85);

    // first takes one disk (80%); a second would reach 90%
    assert_eq!(plan.map.disks_for("first").len(), 1);
    assert_eq!(plan.map.disks_for("second").len(), 2);
    assert!(!plan.relieves_source);
    assert_destinations_safe(&dests, &plan, 85);
}

#[test]
fn test_disk_fitting_nowhere_is_skipped() {
    let source = domain("src", 90 * GB, 10 * GB);
    let dests = vec![domain("dst", 70 * GB, 30 * GB)];
    let disks = vec![disk("huge", 50 * GB), disk("small", 5 * GB)];

    let plan = build_plan(&source, &disks, &dests, 85);

    let ids: Vec<&str> = plan.map.disks_for("dst").iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["small"]);
    assert!(!plan.relieves_source, "source ends at exactly 85%");
    assert_eq!(plan.projected_source_percent, Some(85));
}

#[test]
fn test_no_room_anywhere_gives_empty_plan() {
    let source = domain("src", 95 * GB, 5 * GB);
    let dests = vec![domain("a", 80 * GB, 20 * GB), domain("b", 82 * GB, 18 * GB)];
    let disks = vec![disk("x", 40 * GB), disk("y", 30 * GB), disk("z", 20 * GB)];

    let plan = build_plan(&source, &disks, &dests, 85);

    assert!(plan.map.is_empty());
    assert!(!plan.relieves_source);
    assert_eq!(plan.projected_source_percent, Some(95));
}

#[test]
fn test_oversized_load_terminates_safely() {
    let source = domain("src", 1000 * GB, 0);
    let dests = vec![domain("a", 10 * GB, 90 * GB), domain("b", 30 * GB, 70 * GB)];
    let disks: Vec<_> = (0..50).map(|i| disk(&format!("d{i}"), 20 * GB)).collect();

    let plan = build_plan(&source, &disks, &dests, 85);

    assert!(!plan.relieves_source);
    assert!(!plan.map.is_empty());
    assert_destinations_safe(&dests, &plan, 85);
}

#[test]
fn test_empty_inputs_give_empty_plan() {
    let source = domain("src", 90 * GB, 10 * GB);
    let dests = vec![domain("dst", 10 * GB, 90 * GB)];

    assert!(build_plan(&source, &[], &dests, 85).map.is_empty());
    assert!(build_plan(&source, &[disk("a", GB)], &[], 85).map.is_empty());
}

#[test]
fn test_degenerate_thresholds() {
    let source = domain("src", 99 * GB, GB);
    let dests = vec![domain("dst", 90 * GB, 10 * GB)];
    let disks = vec![disk("a", 5 * GB)];

    assert!(build_plan(&source, &disks, &dests, 0).map.is_empty());

    let plan = build_plan(&source, &disks, &dests, 100);
    assert_eq!(plan.map.disk_count(), 1);
    assert!(plan.relieves_source);
}

#[test]
fn test_planning_is_deterministic() {
    let source = domain("src", 500 * GB, 20 * GB);
    let dests = vec![domain("a", 100 * GB, 100 * GB), domain("b", 60 * GB, 90 * GB)];
    let mut disks = vec![
        disk("d1", 12 * GB),
        disk("d2", 40 * GB),
        disk("d3", 7 * GB),
        disk("d4", 40 * GB),
        disk("d5", 25 * GB),
    ];
    sort_largest_first(&mut disks);

    let first = build_plan(&source, &disks, &dests, 85);
    let second = build_plan(&source, &disks, &dests, 85);
    assert_eq!(first.map, second.map);
}

#[test]
fn test_sort_largest_first_is_stable() {
    let mut disks = vec![disk("a", 5), disk("b", 9), disk("c", 5), disk("d", 1)];
    sort_largest_first(&mut disks);
    let ids: Vec<&str> = disks.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["b", "a", "c", "d"]);
}
