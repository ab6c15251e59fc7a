//! Trim selection: decide which snapshots to delete.
//!
//! The selector walks one volume's snapshots (oldest first) against the
//! ascending schedule in a single pass. Per bucket the first snapshot seen
//! after crossing a boundary is kept and later same-bucket snapshots are
//! deleted, so each time window keeps its oldest snapshot. The newest
//! snapshot and anything flagged `preserve` are never deleted.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::policy::RetentionPolicy;
use crate::schedule::generate_schedule;
use crate::snapshot::{group_by_volume, Snapshot};
use crate::{Error, Result};

/// Per-volume deletion sets for one run.
#[derive(Debug, Default, Serialize)]
pub struct TrimPlan {
    /// Volume label to snapshot ids marked for deletion. Volumes with
    /// nothing to delete are omitted.
    pub deletions: BTreeMap<String, Vec<String>>,
}

impl TrimPlan {
    /// Total snapshots marked for deletion across all volumes.
    pub fn total(&self) -> usize {
        self.deletions.values().map(Vec::len).sum()
    }
}

/// Select the snapshots to delete for one volume group.
///
/// `schedule` must be ascending (see [`generate_schedule`]) and `snapshots`
/// ascending by creation time with at least one entry; an empty group is a
/// caller bug and fails fast.
pub fn select_for_deletion(
    schedule: &[OffsetDateTime],
    snapshots: &[Snapshot],
) -> Result<Vec<String>> {
    if snapshots.is_empty() {
        return Err(Error::EmptyGroup);
    }

    // The newest snapshot is retained unconditionally.
    let candidates = &snapshots[..snapshots.len() - 1];

    // An empty schedule retains nothing by bucket matching; only the
    // keep-newest rule (and preserve flags) apply.
    if schedule.is_empty() {
        return Ok(candidates
            .iter()
            .filter(|snapshot| !snapshot.preserve)
            .map(|snapshot| snapshot.id.clone())
            .collect());
    }

    let mut doomed = Vec::new();
    let mut cursor = 0;
    let mut kept_in_bucket = false;

    for snapshot in candidates {
        // Advance past every boundary at or before this snapshot. Once the
        // cursor runs off the end, the implicit final bucket is unbounded.
        while cursor < schedule.len() && snapshot.created_at >= schedule[cursor] {
            cursor += 1;
            kept_in_bucket = false;
        }

        if kept_in_bucket {
            if !snapshot.preserve {
                doomed.push(snapshot.id.clone());
            }
        } else {
            kept_in_bucket = true;
        }
    }

    Ok(doomed)
}

/// Compute the full deletion plan for one run.
///
/// The schedule is generated once from `now` so every volume is judged
/// against identical boundaries. Snapshots without a volume label are
/// skipped entirely.
pub fn plan_trim(
    now: OffsetDateTime,
    policy: &RetentionPolicy,
    snapshots: &[Snapshot],
) -> Result<TrimPlan> {
    let schedule = generate_schedule(now, policy);
    let mut plan = TrimPlan::default();

    for (volume, group) in group_by_volume(snapshots) {
        let doomed = select_for_deletion(&schedule, &group)?;
        if !doomed.is_empty() {
            log::debug!(
                "volume {volume}: {} of {} snapshots selected for deletion",
                doomed.len(),
                group.len()
            );
            plan.deletions.insert(volume, doomed);
        }
    }

    Ok(plan)
}
