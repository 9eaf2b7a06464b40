use crate::balancer::{self, DomainUsage, OccupancyReport, Policy};
use crate::config::AppConfig;
use crate::executor::{self, ExecutionContext, ExecutionReport, UnlockWait};
use crate::inventory;
use crate::platform::{DomainFilter, Platform, StorageDomain};
use crate::state::DaemonStatus;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How the process was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    /// Balance, sleep, repeat until interrupted.
    Daemon,
    /// One scanning pass, then exit.
    OneRun,
    /// Report occupancy only, never plan or move.
    ShowOccupation,
}

/// What happened when one overloaded domain was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DomainOutcome {
    NoDisks,
    NoMigratableDisks,
    NoDestinations,
    /// The fresh snapshot already shows the source below the threshold.
    AlreadyRelieved,
    EmptyPlan,
    Executed { report: ExecutionReport, relieves_source: bool },
    /// A query failed or the pass panicked; the next pass re-evaluates.
    Aborted(String),
}

/// Outcome of one scanning pass.
#[derive(Debug, Default)]
pub(crate) struct PassSummary {
    pub domains_scanned: usize,
    pub outcomes: Vec<(String, DomainOutcome)>,
}

fn fmt_percent(pct: Option<u64>) -> String {
    pct.map_or_else(|| "n/a".to_string(), |p| p.to_string())
}

/// The control loop: scan, plan and execute per overloaded domain, sleep.
pub(crate) struct Balancer {
    platform: Arc<dyn Platform>,
    config: Arc<AppConfig>,
    policy: Policy,
    wait: UnlockWait,
    status: RwLock<DaemonStatus>,
    last_report: RwLock<Option<OccupancyReport>>,
    last_pass_at: RwLock<Option<DateTime<Utc>>>,
}

impl Balancer {
    pub(crate) fn new(platform: Arc<dyn Platform>, config: Arc<AppConfig>) -> Result<Self> {
        let policy = config.policy()?;
        let wait = UnlockWait::from_config(&config);
        Ok(Self {
            platform,
            config,
            policy,
            wait,
            status: RwLock::new(DaemonStatus::idle()),
            last_report: RwLock::new(None),
            last_pass_at: RwLock::new(None),
        })
    }

    pub(crate) async fn status(&self) -> DaemonStatus {
        self.status.read().await.clone()
    }

    pub(crate) async fn last_report(&self) -> Option<OccupancyReport> {
        self.last_report.read().await.clone()
    }

    pub(crate) async fn last_pass_at(&self) -> Option<DateTime<Utc>> {
        *self.last_pass_at.read().await
    }

    /// Run until the mode completes or `cancel` fires.
    pub(crate) async fn run(&self, mode: RunMode, cancel: &CancellationToken) -> Result<()> {
        match mode {
            RunMode::ShowOccupation => {
                self.show_occupation().await?;
            }
            RunMode::OneRun => {
                self.run_pass(cancel).await?;
            }
            RunMode::Daemon => {
                info!(
                    "Balancing every {}s (threshold {} perc., policy '{}')",
                    self.config.iteration_sleep_secs,
                    self.policy.threshold,
                    self.policy.power_policy
                );
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        result = self.run_pass(cancel) => {
                            if let Err(e) = result {
                                warn!("Balancing pass abandoned: {e:#}");
                            }
                        }
                    }
                    debug!("- - - - - - - - - - - - - - - - -");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.config.iteration_sleep()) => {}
                    }
                }
                *self.status.write().await = DaemonStatus::idle();
            }
        }
        Ok(())
    }

    /// Snapshot all domains in scope and compute their occupancy.
    pub(crate) async fn scan(&self) -> Result<OccupancyReport> {
        let filter =
            DomainFilter::new(&self.policy.excluded_domains, self.policy.datacenter.as_deref());
        let snapshot = inventory::snapshot_domains(self.platform.as_ref(), &filter)
            .await
            .context("Could not retrieve storage domain list")?;

        let report = balancer::analyze(&snapshot, self.policy.threshold);
        for usage in &report.domains {
            debug!("{} -> {} perc.", usage.domain.name, fmt_percent(usage.percent_usage));
        }
        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// Log every domain's occupancy without planning anything.
    pub(crate) async fn show_occupation(&self) -> Result<OccupancyReport> {
        info!("Analyzing occupation of storage domains...");
        let report = self.scan().await?;
        for usage in &report.domains {
            info!("{} -> {} perc.", usage.domain.name, fmt_percent(usage.percent_usage));
        }
        for usage in report.overloaded() {
            self.log_overused(usage);
        }
        Ok(report)
    }

    fn log_overused(&self, usage: &DomainUsage) {
        info!(
            "Storage domain {} is overused: ({} perc.), limit is {} perc.",
            usage.domain.name,
            fmt_percent(usage.percent_usage),
            self.policy.threshold
        );
    }

    /// One `Scanning` cycle: rebalance every overloaded domain in snapshot order.
    pub(crate) async fn run_pass(&self, cancel: &CancellationToken) -> Result<PassSummary> {
        *self.status.write().await =
            DaemonStatus::scanning("Analyzing occupation of storage domains...");
        let result = self.scan_and_rebalance(cancel).await;
        *self.status.write().await = DaemonStatus::idle();
        *self.last_pass_at.write().await = Some(Utc::now());
        result
    }

    async fn scan_and_rebalance(&self, cancel: &CancellationToken) -> Result<PassSummary> {
        debug!("Analyzing occupation of storage domains...");
        let report = self.scan().await?;
        let mut summary =
            PassSummary { domains_scanned: report.domains.len(), outcomes: Vec::new() };

        let overloaded: Vec<DomainUsage> = report.overloaded().cloned().collect();
        if overloaded.is_empty() {
            info!("RESULT: No rebalancing needed, all storage domains are below occupation threshold.");
            return Ok(summary);
        }

        for usage in overloaded {
            if cancel.is_cancelled() {
                break;
            }
            self.log_overused(&usage);

            let source = &usage.domain;
            let outcome = match AssertUnwindSafe(self.rebalance_domain(source, cancel))
                .catch_unwind()
                .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!("Rebalancing of {} couldn't be performed: {e:#}", source.name);
                    DomainOutcome::Aborted(format!("{e:#}"))
                }
                Err(_) => {
                    error!("Rebalancing of {} panicked!", source.name);
                    DomainOutcome::Aborted("rebalancing panicked".to_string())
                }
            };
            summary.outcomes.push((source.name.clone(), outcome));
        }

        Ok(summary)
    }

    /// Plan and execute the relief of one overloaded domain.
    async fn rebalance_domain(
        &self,
        source: &StorageDomain,
        cancel: &CancellationToken,
    ) -> Result<DomainOutcome> {
        info!("Rebalancing storage domain {} ...", source.name);
        *self.status.write().await =
            DaemonStatus::planning(format!("Gathering disks from {}", source.name));

        let disk_inventory = inventory::snapshot_disks(self.platform.as_ref(), &source.name)
            .await
            .with_context(|| format!("Could not list disks of {}", source.name))?;
        if disk_inventory.disks.is_empty() {
            warn!(
                "Couldn't get any disk from storage domain {}, rebalancing cannot be performed.",
                source.name
            );
            return Ok(DomainOutcome::NoDisks);
        }

        debug!("Applying disk filter policies...");
        let mut migratable = balancer::filter_migratable(
            &disk_inventory.disks,
            &disk_inventory.owners,
            &disk_inventory.template_disk_ids,
            &self.policy,
        );
        if migratable.is_empty() {
            warn!(
                "No migratable disk on storage domain {} ({} disks filtered out), it stays overloaded.",
                source.name,
                disk_inventory.disks.len()
            );
            return Ok(DomainOutcome::NoMigratableDisks);
        }
        balancer::sort_largest_first(&mut migratable);

        // Destinations must reflect the moment of planning, not the outer scan.
        let scope = source.datacenter_name.as_deref().or(self.policy.datacenter.as_deref());
        let filter = DomainFilter::new(&self.policy.excluded_domains, scope);
        let snapshot = inventory::snapshot_domains(self.platform.as_ref(), &filter)
            .await
            .with_context(|| format!("Could not refresh storage domains for {}", source.name))?;
        let current_source = snapshot.find(&source.id).unwrap_or(source);
        if !balancer::is_overloaded(current_source.percent_usage(), self.policy.threshold) {
            info!(
                "Storage domain {} is now at {} perc., below {} perc. No rebalancing needed.",
                source.name,
                fmt_percent(current_source.percent_usage()),
                self.policy.threshold
            );
            return Ok(DomainOutcome::AlreadyRelieved);
        }

        let destinations =
            balancer::select_destinations(&snapshot.domains, current_source, &self.policy);
        for sd in &destinations {
            debug!("SORTED SD: {}: {} bytes free", sd.name, sd.free_bytes);
        }
        if destinations.is_empty() {
            warn!(
                "No destination below threshold for {}. Cannot perform rebalancing.",
                source.name
            );
            return Ok(DomainOutcome::NoDestinations);
        }

        let plan = balancer::build_plan(
            current_source,
            &migratable,
            &destinations,
            self.policy.threshold,
        );
        if plan.map.is_empty() {
            warn!("No migration map for {}. Cannot perform rebalancing.", source.name);
            return Ok(DomainOutcome::EmptyPlan);
        }
        for assignment in plan.map.assignments() {
            let ids: Vec<&str> = assignment.disks.iter().map(|d| d.id.as_str()).collect();
            debug!("{} -> {:?}", assignment.destination.name, ids);
        }

        let ctx = ExecutionContext {
            platform: self.platform.as_ref(),
            owners: &disk_inventory.owners,
            wait: self.wait,
            cancel,
            status: &self.status,
        };
        let report = executor::execute_plan(&ctx, &plan.map).await;

        if plan.relieves_source {
            info!(
                "RESULT: Storage domain {} has been rebalanced ({} moved, {} failed, {} timed out).",
                source.name, report.moved, report.failed, report.timed_out
            );
        } else {
            warn!(
                "RESULT: Storage domain {} partially rebalanced, projected occupancy {} perc. stays above {} perc.",
                source.name,
                fmt_percent(plan.projected_source_percent),
                self.policy.threshold
            );
        }

        Ok(DomainOutcome::Executed { report, relieves_source: plan.relieves_source })
    }
}
