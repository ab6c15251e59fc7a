//! Grandfather-father-son snapshot retention for block-storage volumes.
//!
//! The core is pure: [`schedule::generate_schedule`] turns a fixed `now` and
//! a [`policy::RetentionPolicy`] into ascending bucket boundaries, and
//! [`trim::select_for_deletion`] merges one volume's chronological snapshot
//! stream against them to pick the deletions. Everything that talks to a
//! provider sits behind [`provider::SnapshotProvider`] and is driven by
//! [`backup::run_backup`].

pub mod backup;
pub mod config;
pub mod error;
pub mod policy;
pub mod provider;
pub mod schedule;
pub mod snapshot;
pub mod trim;

pub use error::{Error, Result};
pub use policy::{MonthlyRetention, RetentionPolicy};
pub use provider::{DeleteOutcome, SnapshotProvider};
pub use schedule::generate_schedule;
pub use snapshot::Snapshot;
pub use trim::{plan_trim, select_for_deletion, TrimPlan};
