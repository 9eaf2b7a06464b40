use crate::balancer::MigrationMap;
use crate::platform::{DiskStatus, Platform, Vm};
use crate::state::DaemonStatus;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Bounds of the wait for a moved disk to leave the `locked` state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UnlockWait {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl UnlockWait {
    pub(crate) const fn from_config(config: &crate::config::AppConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.unlock_initial_delay_secs),
            poll_interval: Duration::from_secs(config.unlock_poll_interval_secs),
            timeout: Duration::from_secs(config.unlock_timeout_secs),
        }
    }
}

/// How a single disk move ended, as far as this process observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MoveOutcome {
    /// The disk left the locked state with the given status.
    Completed(DiskStatus),
    /// The platform rejected the move.
    Failed(String),
    /// Still locked when the wait deadline passed.
    TimedOut,
    /// Shutdown was requested while waiting; the platform keeps moving the disk.
    Interrupted,
}

/// Tally of one plan execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ExecutionReport {
    pub moved: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub interrupted: usize,
    /// Planned disks never issued because of shutdown.
    pub skipped: usize,
}

impl ExecutionReport {
    fn record(&mut self, outcome: &MoveOutcome) {
        match outcome {
            MoveOutcome::Completed(_) => self.moved += 1,
            MoveOutcome::Failed(_) => self.failed += 1,
            MoveOutcome::TimedOut => self.timed_out += 1,
            MoveOutcome::Interrupted => self.interrupted += 1,
        }
    }
}

/// All the context needed to execute a migration map.
pub(crate) struct ExecutionContext<'a> {
    pub platform: &'a dyn Platform,
    /// Only used to name the owning VM in log lines.
    pub owners: &'a HashMap<String, Vm>,
    pub wait: UnlockWait,
    pub cancel: &'a CancellationToken,
    pub status: &'a RwLock<DaemonStatus>,
}

/// Issue every planned move, one at a time, waiting for each disk to unlock.
///
/// A failed or timed-out move is logged and the next disk is tried. Nothing is
/// retried or rolled back.
pub(crate) async fn execute_plan(
    ctx: &ExecutionContext<'_>,
    plan: &MigrationMap,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let total = plan.disk_count();
    let mut position = 0usize;

    for assignment in plan.assignments() {
        for disk in &assignment.disks {
            position += 1;
            if ctx.cancel.is_cancelled() {
                report.skipped += 1;
                continue;
            }

            let vm_name = ctx.owners.get(&disk.id).map_or("<NoVM>", |vm| vm.name.as_str());
            info!(
                "Moving disk {} (VM: {}) -> {} ({} GB)",
                disk.id,
                vm_name,
                assignment.destination.name,
                disk.actual_size_bytes / BYTES_PER_GB
            );
            *ctx.status.write().await = DaemonStatus::executing(format!(
                "Moving disk {} to {} ({}/{})",
                disk.id, assignment.destination.name, position, total
            ));

            let outcome = match ctx.platform.move_disk(&disk.id, &assignment.destination).await {
                Ok(()) => wait_for_unlock(ctx.platform, &disk.id, ctx.wait, ctx.cancel).await,
                Err(e) => MoveOutcome::Failed(e.to_string()),
            };

            match &outcome {
                MoveOutcome::Completed(DiskStatus::Ok) => {
                    debug!("Disk {} unlocked (Status: ok)", disk.id);
                }
                MoveOutcome::Completed(status) => {
                    warn!("Disk {} unlocked with status {}", disk.id, status);
                }
                MoveOutcome::Failed(reason) => {
                    warn!("Could not move disk {}, platform error: {}", disk.id, reason);
                }
                MoveOutcome::TimedOut => {
                    warn!(
                        "Disk {} still locked after {}s, continuing with the next disk",
                        disk.id,
                        ctx.wait.timeout.as_secs()
                    );
                }
                MoveOutcome::Interrupted => {
                    warn!(
                        "Shutdown requested while disk {} was moving; the platform will finish it",
                        disk.id
                    );
                }
            }
            report.record(&outcome);
        }
    }

    report
}

/// Poll the disk until it is no longer locked, bounded by `wait.timeout`.
///
/// Status query errors are logged and polling continues until the deadline.
pub(crate) async fn wait_for_unlock(
    platform: &dyn Platform,
    disk_id: &str,
    wait: UnlockWait,
    cancel: &CancellationToken,
) -> MoveOutcome {
    debug!("Waiting for disk {} being unlocked...", disk_id);
    // An unrepresentable deadline means waiting without a bound.
    let deadline = Instant::now().checked_add(wait.timeout);
    let mut delay = wait.initial_delay;

    loop {
        let now = Instant::now();
        let pause = match deadline {
            Some(deadline) if now >= deadline => return MoveOutcome::TimedOut,
            Some(deadline) => delay.min(deadline - now),
            None => delay,
        };

        tokio::select! {
            () = cancel.cancelled() => return MoveOutcome::Interrupted,
            () = tokio::time::sleep(pause) => {}
        }

        match platform.disk_status(disk_id).await {
            Ok(DiskStatus::Locked) => debug!("Disk {} still locked", disk_id),
            Ok(status) => return MoveOutcome::Completed(status),
            Err(e) => warn!("Could not query status of disk {}: {}", disk_id, e),
        }
        delay = wait.poll_interval;
    }
}
