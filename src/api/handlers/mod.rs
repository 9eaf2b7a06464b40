mod occupancy;
mod status;

pub(super) use occupancy::get_occupancy;
pub(super) use status::get_status;
