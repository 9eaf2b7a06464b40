mod destinations;
mod eligibility;
mod occupancy;
mod planner;
mod types;

pub(crate) use destinations::select_destinations;
pub(crate) use eligibility::{classify, filter_migratable, Verdict, OVF_STORE_NAME};
pub(crate) use occupancy::{analyze, is_overloaded, DomainUsage, OccupancyReport};
pub(crate) use planner::{build_plan, sort_largest_first};
pub(crate) use types::{MigrationMap, PlanResult, Policy, PowerPolicy};
