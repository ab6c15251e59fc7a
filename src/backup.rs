//! Backup orchestration: create snapshots, then trim.
//!
//! Provider failures here are recorded and logged, never fatal: a create
//! that fails for one volume or a delete that fails for one snapshot must
//! not stop the rest of the run. The caller inspects [`RunReport`] (or
//! [`RunSummary`] across accounts) to decide the exit status.

use time::OffsetDateTime;

use crate::config::Account;
use crate::policy::RetentionPolicy;
use crate::provider::{DeleteOutcome, SnapshotProvider};
use crate::trim::plan_trim;
use crate::Result;

/// Counters for one backup-and-trim cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Snapshots successfully created.
    pub created: usize,
    /// Snapshots removed, including those another run deleted first.
    pub deleted: usize,
    /// Create or delete calls that failed.
    pub failures: usize,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Aggregate over a multi-account run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub accounts: usize,
    pub failed_accounts: usize,
    pub report: RunReport,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failed_accounts == 0 && self.report.is_clean()
    }
}

/// Run one backup-and-trim cycle against `provider`.
///
/// `now` is fixed by the caller for the whole run; the engine never reads
/// the system clock. Listing failures abort the cycle (there is nothing to
/// work on), per-item failures are counted and skipped.
pub fn run_backup<P: SnapshotProvider>(
    provider: &mut P,
    policy: &RetentionPolicy,
    now: OffsetDateTime,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    let volumes = provider.list_volumes()?;
    log::info!("creating snapshots for {} volumes", volumes.len());
    for volume in &volumes {
        match provider.create_snapshot(volume) {
            Ok(id) => {
                log::debug!("created snapshot {id} for {volume}");
                report.created += 1;
            }
            Err(err) => {
                log::warn!("snapshot creation failed for {volume}: {err}");
                report.failures += 1;
            }
        }
    }

    let snapshots = provider.list_snapshots()?;
    let plan = plan_trim(now, policy, &snapshots)?;
    log::info!(
        "trimming {} snapshots across {} volumes",
        plan.total(),
        plan.deletions.len()
    );

    for (volume, ids) in &plan.deletions {
        for id in ids {
            match provider.delete_snapshot(id) {
                Ok(DeleteOutcome::Deleted) => report.deleted += 1,
                Ok(DeleteOutcome::NotFound | DeleteOutcome::RaceLost) => {
                    // Someone else got there first; that is still done.
                    log::debug!("snapshot {id} for {volume} already gone");
                    report.deleted += 1;
                }
                Err(err) => {
                    log::warn!("failed to delete snapshot {id} for {volume}: {err}");
                    report.failures += 1;
                }
            }
        }
    }

    Ok(report)
}

/// Run every account in turn, continuing past account-level failures.
///
/// `open_provider` establishes the provider session for one account; if it
/// (or the account's listing) fails, the account is logged and counted and
/// the remaining accounts still run.
pub fn run_accounts<P, F>(
    accounts: &[Account],
    policy: &RetentionPolicy,
    now: OffsetDateTime,
    mut open_provider: F,
) -> RunSummary
where
    P: SnapshotProvider,
    F: FnMut(&Account) -> Result<P>,
{
    let mut summary = RunSummary {
        accounts: accounts.len(),
        ..RunSummary::default()
    };

    for account in accounts {
        log::info!("backing up account {}", account.name);
        let outcome = open_provider(account)
            .and_then(|mut provider| run_backup(&mut provider, policy, now));
        match outcome {
            Ok(report) => {
                summary.report.created += report.created;
                summary.report.deleted += report.deleted;
                summary.report.failures += report.failures;
            }
            Err(err) => {
                log::error!("account {} failed, continuing: {err}", account.name);
                summary.failed_accounts += 1;
            }
        }
    }

    summary
}
