//! Provider collaborator boundary.
//!
//! The engine only ever references snapshots; creating and deleting them is
//! the provider's job. Deletion is an idempotent contract: a snapshot that
//! is already gone (deleted out from under us by a concurrent run) counts as
//! done, never as a failure to retry.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::snapshot::Snapshot;
use crate::{Error, Result};

/// Outcome of a delete call. All three variants mean "done, move on".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The snapshot id was unknown to the provider.
    NotFound,
    /// A concurrent run deleted the snapshot first.
    RaceLost,
}

/// Block-storage provider operations the engine depends on.
pub trait SnapshotProvider {
    /// Volume labels visible to the caller's credentials.
    fn list_volumes(&self) -> Result<Vec<String>>;

    /// All snapshots owned by the caller, in no particular order.
    fn list_snapshots(&self) -> Result<Vec<Snapshot>>;

    /// Create a point-in-time snapshot of `volume`; returns the new id.
    fn create_snapshot(&mut self, volume: &str) -> Result<String>;

    /// Delete `id` under the idempotent contract above.
    fn delete_snapshot(&mut self, id: &str) -> Result<DeleteOutcome>;
}

/// Deterministic in-memory provider for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    volumes: Vec<String>,
    snapshots: Vec<Snapshot>,
    next_id: u64,
    clock: Option<OffsetDateTime>,
    failing_volumes: Vec<String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed instant assigned to created snapshots; each create advances it
    /// by one second so creation order stays total.
    pub fn with_clock(mut self, clock: OffsetDateTime) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn add_volume(&mut self, volume: &str) {
        self.volumes.push(volume.to_string());
    }

    pub fn add_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    /// Make `create_snapshot` fail for `volume`.
    pub fn fail_creates_for(&mut self, volume: &str) {
        self.failing_volumes.push(volume.to_string());
    }

    pub fn snapshot_ids(&self) -> Vec<String> {
        self.snapshots.iter().map(|s| s.id.clone()).collect()
    }
}

impl SnapshotProvider for MemoryProvider {
    fn list_volumes(&self) -> Result<Vec<String>> {
        Ok(self.volumes.clone())
    }

    fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        Ok(self.snapshots.clone())
    }

    fn create_snapshot(&mut self, volume: &str) -> Result<String> {
        if self.failing_volumes.iter().any(|v| v == volume) {
            return Err(Error::Provider(format!(
                "snapshot creation failed for {volume}"
            )));
        }

        let id = format!("snap-{:06}", self.next_id);
        self.next_id += 1;

        let created_at = match self.clock {
            Some(clock) => {
                self.clock = Some(clock + Duration::seconds(1));
                clock
            }
            None => OffsetDateTime::UNIX_EPOCH + Duration::seconds(self.next_id as i64),
        };

        self.snapshots.push(Snapshot {
            id: id.clone(),
            volume: Some(volume.to_string()),
            created_at,
            preserve: false,
        });
        Ok(id)
    }

    fn delete_snapshot(&mut self, id: &str) -> Result<DeleteOutcome> {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        if self.snapshots.len() == before {
            return Ok(DeleteOutcome::NotFound);
        }
        Ok(DeleteOutcome::Deleted)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileState {
    #[serde(default)]
    volumes: Vec<String>,
    #[serde(default)]
    snapshots: Vec<Snapshot>,
}

/// File-backed provider: volumes and snapshots held in a JSON document that
/// is rewritten after every mutation. Stands in for a real provider session
/// in the CLI `run` path and in end-to-end tests.
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
    state: FileState,
    next_id: u64,
    clock: OffsetDateTime,
}

impl FileProvider {
    /// Open the state document at `path`. `clock` stamps snapshots created
    /// in this session, advancing one second per create so creation order
    /// stays total.
    pub fn open(path: &Path, clock: OffsetDateTime) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let state: FileState = serde_json::from_str(&raw)?;

        // Resume id numbering past anything already in the document.
        let next_id = state
            .snapshots
            .iter()
            .filter_map(|s| s.id.strip_prefix("snap-"))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1);

        Ok(Self {
            path: path.to_path_buf(),
            state,
            next_id,
            clock,
        })
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SnapshotProvider for FileProvider {
    fn list_volumes(&self) -> Result<Vec<String>> {
        Ok(self.state.volumes.clone())
    }

    fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        Ok(self.state.snapshots.clone())
    }

    fn create_snapshot(&mut self, volume: &str) -> Result<String> {
        let id = format!("snap-{:06}", self.next_id);
        self.next_id += 1;

        let created_at = self.clock;
        self.clock += Duration::seconds(1);

        self.state.snapshots.push(Snapshot {
            id: id.clone(),
            volume: Some(volume.to_string()),
            created_at,
            preserve: false,
        });
        self.persist()?;
        Ok(id)
    }

    fn delete_snapshot(&mut self, id: &str) -> Result<DeleteOutcome> {
        let before = self.state.snapshots.len();
        self.state.snapshots.retain(|s| s.id != id);
        if self.state.snapshots.len() == before {
            return Ok(DeleteOutcome::NotFound);
        }
        self.persist()?;
        Ok(DeleteOutcome::Deleted)
    }
}
