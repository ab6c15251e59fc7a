//! Snapshot data model and volume grouping.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::Result;

/// A point-in-time snapshot as observed from the provider listing.
///
/// Snapshots are owned by the provider and never mutated here. A snapshot
/// without a volume label has opted out of trimming and is kept forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub preserve: bool,
}

/// Parse a provider timestamp (ISO-8601 UTC, optional fractional seconds).
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::parse(value, &Rfc3339)?)
}

/// Load a snapshot inventory: a JSON array of snapshots.
pub fn load_inventory(path: &Path) -> Result<Vec<Snapshot>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Group snapshots by volume label, each group sorted ascending by creation
/// time (ties broken by id so runs are deterministic).
///
/// Unlabeled snapshots are excluded: they are never candidates for trimming.
pub fn group_by_volume(snapshots: &[Snapshot]) -> BTreeMap<String, Vec<Snapshot>> {
    let mut groups: BTreeMap<String, Vec<Snapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        let Some(volume) = &snapshot.volume else {
            continue;
        };
        groups
            .entry(volume.clone())
            .or_default()
            .push(snapshot.clone());
    }

    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn snap(id: &str, volume: Option<&str>, created_at: OffsetDateTime) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            volume: volume.map(str::to_string),
            created_at,
            preserve: false,
        }
    }

    #[test]
    fn parses_fractional_seconds() {
        let ts = parse_timestamp("2024-03-09T10:15:30.123456Z").expect("parse");
        assert_eq!(ts, datetime!(2024-03-09 10:15:30.123456 UTC));
    }

    #[test]
    fn parses_whole_seconds() {
        let ts = parse_timestamp("2024-03-09T10:15:30Z").expect("parse");
        assert_eq!(ts, datetime!(2024-03-09 10:15:30 UTC));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("last tuesday").is_err());
    }

    #[test]
    fn groups_sort_ascending_and_skip_unlabeled() {
        let snapshots = vec![
            snap("snap-b", Some("vol-1"), datetime!(2024-03-09 14:00:00 UTC)),
            snap("snap-c", None, datetime!(2024-03-09 15:00:00 UTC)),
            snap("snap-a", Some("vol-1"), datetime!(2024-03-09 10:00:00 UTC)),
            snap("snap-d", Some("vol-2"), datetime!(2024-03-08 09:00:00 UTC)),
        ];

        let groups = group_by_volume(&snapshots);
        assert_eq!(groups.len(), 2);

        let vol1: Vec<&str> = groups["vol-1"].iter().map(|s| s.id.as_str()).collect();
        assert_eq!(vol1, vec!["snap-a", "snap-b"]);
        assert_eq!(groups["vol-2"].len(), 1);
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let at = datetime!(2024-03-09 10:00:00 UTC);
        let snapshots = vec![
            snap("snap-z", Some("vol-1"), at),
            snap("snap-a", Some("vol-1"), at),
        ];

        let groups = group_by_volume(&snapshots);
        let ids: Vec<&str> = groups["vol-1"].iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["snap-a", "snap-z"]);
    }

    #[test]
    fn load_inventory_reads_a_json_array() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        std::io::Write::write_all(
            &mut file,
            br#"[
                {"id": "snap-1", "volume": "vol-1", "created_at": "2024-03-09T10:00:00Z"},
                {"id": "snap-2", "created_at": "2024-03-09T14:00:00.250Z", "preserve": true}
            ]"#,
        )
        .expect("write");

        let snapshots = load_inventory(file.path()).expect("load");
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].volume.as_deref(), Some("vol-1"));
        assert_eq!(snapshots[1].volume, None);
        assert!(snapshots[1].preserve);
        assert_eq!(
            snapshots[1].created_at,
            datetime!(2024-03-09 14:00:00.25 UTC)
        );
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let original = Snapshot {
            id: "snap-1".to_string(),
            volume: Some("vol-1".to_string()),
            created_at: datetime!(2024-03-09 10:15:30.5 UTC),
            preserve: true,
        };

        let json = serde_json::to_string(&original).expect("serialize");
        let decoded: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, original);
    }
}
