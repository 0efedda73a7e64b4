use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{TimelinePoint, TIMELINE_CAPACITY};

use crate::{KeyValueStore, StoreError};

pub const EXPORT_VERSION: u32 = 1;

/// File-download document produced by [`TimelineStore::export_all`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineExport {
    #[serde(rename = "v", alias = "version")]
    pub version: u32,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub data: Vec<TimelinePoint>,
}

#[derive(Deserialize)]
struct ImportDocument {
    data: Vec<TimelinePoint>,
}

/// Points with the same timestamp, eGFR and creatinine count as one.
#[derive(PartialEq, Eq, Hash)]
struct DedupKey(DateTime<Utc>, Option<u64>, Option<u64>);

impl DedupKey {
    fn of(point: &TimelinePoint) -> Self {
        Self(
            point.recorded_at,
            point.egfr.map(f64::to_bits),
            point.creatinine.map(f64::to_bits),
        )
    }
}

/// Append-only history of saved points, capped at [`TIMELINE_CAPACITY`].
///
/// Storage order is insertion order. Read-modify-write is not atomic: one
/// writer at a time.
pub struct TimelineStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStore> TimelineStore<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Points in storage order. Unreadable state is treated as an empty timeline.
    pub fn stored(&self) -> Result<Vec<TimelinePoint>, StoreError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<TimelinePoint>>(&raw) {
            Ok(points) => Ok(points),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "timeline unreadable, starting empty");
                Ok(Vec::new())
            }
        }
    }

    /// Points for display, newest first.
    pub fn list(&self) -> Result<Vec<TimelinePoint>, StoreError> {
        let mut points = self.stored()?;
        points.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(points)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.stored()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn append(&self, point: TimelinePoint) -> Result<(), StoreError> {
        let mut points = self.stored()?;
        points.push(point);
        self.persist(points)?;
        tracing::debug!(key = %self.key, "timeline point appended");
        Ok(())
    }

    /// Removes the point at `index` in the [`list`](Self::list) ordering and
    /// re-persists the rest oldest first.
    pub fn remove(&self, index: usize) -> Result<TimelinePoint, StoreError> {
        let mut points = self.list()?;
        if index >= points.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: points.len(),
            });
        }
        let removed = points.remove(index);
        points.reverse();
        self.persist(points)?;
        tracing::debug!(key = %self.key, index, "timeline point removed");
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove(&self.key)?;
        tracing::info!(key = %self.key, "timeline cleared");
        Ok(())
    }

    /// Pretty JSON `{v, exportedAt, data}` with points in storage order.
    pub fn export_all(&self) -> Result<String, StoreError> {
        let document = TimelineExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            data: self.stored()?,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Merges an exported document into the timeline and returns how many points were added.
    ///
    /// A malformed document is rejected without touching the stored points.
    /// Duplicates are dropped silently, keeping the first occurrence.
    pub fn import_merge(&self, document: &str) -> Result<usize, StoreError> {
        let incoming: ImportDocument =
            serde_json::from_str(document).map_err(|err| StoreError::Import(err.to_string()))?;

        let existing = self.stored()?;
        let before: HashSet<DedupKey> = existing.iter().map(DedupKey::of).collect();

        let mut seen = HashSet::new();
        let merged: Vec<TimelinePoint> = existing
            .into_iter()
            .chain(incoming.data)
            .filter(|point| seen.insert(DedupKey::of(point)))
            .collect();

        let kept = self.persist(merged)?;
        let added = kept
            .iter()
            .filter(|point| !before.contains(&DedupKey::of(point)))
            .count();
        tracing::info!(key = %self.key, added, total = kept.len(), "timeline imported");
        Ok(added)
    }

    fn persist(&self, mut points: Vec<TimelinePoint>) -> Result<Vec<TimelinePoint>, StoreError> {
        if points.len() > TIMELINE_CAPACITY {
            let overflow = points.len() - TIMELINE_CAPACITY;
            points.drain(..overflow);
            tracing::debug!(key = %self.key, evicted = overflow, "timeline capacity reached");
        }
        self.storage
            .set(&self.key, &serde_json::to_string(&points)?)?;
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::{Duration, TimeZone};
    use triage_core::{Brand, Mode};

    fn point(minutes: i64, egfr: Option<f64>) -> TimelinePoint {
        TimelinePoint {
            recorded_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            country: "NG".into(),
            brand: Brand::Bubulizer,
            mode: Mode::Patient,
            egfr,
            creatinine: Some(1.0),
            crp: None,
            procalcitonin: None,
            spo2: None,
            risk: (minutes % 21) as u8,
            notes: format!("point {minutes}"),
        }
    }

    fn store() -> TimelineStore<MemoryStore> {
        TimelineStore::new(MemoryStore::new(), "kt_timeline_v1")
    }

    #[test]
    fn list_is_newest_first_storage_is_insertion_order() {
        let timeline = store();
        timeline.append(point(5, Some(50.0))).unwrap();
        timeline.append(point(1, Some(60.0))).unwrap();
        timeline.append(point(9, Some(40.0))).unwrap();

        let listed: Vec<_> = timeline.list().unwrap().iter().map(|p| p.egfr).collect();
        assert_eq!(listed, [Some(40.0), Some(50.0), Some(60.0)]);

        let stored: Vec<_> = timeline.stored().unwrap().iter().map(|p| p.egfr).collect();
        assert_eq!(stored, [Some(50.0), Some(60.0), Some(40.0)]);
    }

    #[test]
    fn remove_uses_display_position_and_restores_chronological_storage() {
        let timeline = store();
        timeline.append(point(5, Some(50.0))).unwrap();
        timeline.append(point(1, Some(60.0))).unwrap();
        timeline.append(point(9, Some(40.0))).unwrap();

        let removed = timeline.remove(1).unwrap();
        assert_eq!(removed.egfr, Some(50.0));

        let stored: Vec<_> = timeline.stored().unwrap().iter().map(|p| p.egfr).collect();
        assert_eq!(stored, [Some(60.0), Some(40.0)]);

        assert!(matches!(
            timeline.remove(2),
            Err(StoreError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn append_evicts_oldest_beyond_capacity() {
        let timeline = store();
        for minute in 0..260 {
            timeline.append(point(minute, Some(minute as f64))).unwrap();
        }

        let stored = timeline.stored().unwrap();
        assert_eq!(stored.len(), TIMELINE_CAPACITY);
        assert_eq!(stored.first().and_then(|p| p.egfr), Some(10.0));
        assert_eq!(stored.last().and_then(|p| p.egfr), Some(259.0));
        assert!(stored
            .windows(2)
            .all(|pair| pair[0].recorded_at < pair[1].recorded_at));
    }

    #[test]
    fn clear_removes_everything() {
        let timeline = store();
        timeline.append(point(1, None)).unwrap();
        timeline.clear().unwrap();
        assert!(timeline.is_empty().unwrap());
    }

    #[test]
    fn corrupt_state_reads_as_empty() {
        let storage = MemoryStore::new();
        storage.set("kt_timeline_v1", "{not json").unwrap();
        let timeline = TimelineStore::new(storage, "kt_timeline_v1");

        assert!(timeline.list().unwrap().is_empty());
        timeline.append(point(1, None)).unwrap();
        assert_eq!(timeline.len().unwrap(), 1);
    }

    #[test]
    fn export_document_shape() {
        let timeline = store();
        timeline.append(point(1, Some(33.0))).unwrap();

        let exported: serde_json::Value =
            serde_json::from_str(&timeline.export_all().unwrap()).unwrap();
        assert_eq!(exported["v"], 1);
        assert!(exported["exportedAt"].is_string());
        assert_eq!(exported["data"][0]["egfr"], 33.0);
        assert_eq!(exported["data"][0]["creat"], 1.0);
    }

    #[test]
    fn import_dedups_by_timestamp_egfr_and_creatinine() {
        let timeline = store();
        timeline.append(point(1, Some(33.0))).unwrap();

        let mut same_key_other_notes = point(1, Some(33.0));
        same_key_other_notes.notes = "different".into();
        let document = serde_json::json!({
            "v": 1,
            "exportedAt": "2025-02-02T00:00:00Z",
            "data": [same_key_other_notes, point(1, Some(34.0)), point(2, None), point(2, None)],
        });

        let added = timeline.import_merge(&document.to_string()).unwrap();
        assert_eq!(added, 2);

        let stored = timeline.stored().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].notes, "point 1");
    }

    #[test]
    fn malformed_import_leaves_state_untouched() {
        let timeline = store();
        timeline.append(point(1, Some(33.0))).unwrap();
        let before = timeline.stored().unwrap();

        for bad in [
            "not json",
            r#"{"v":1}"#,
            r#"{"data":"nope"}"#,
            r#"{"data":[{"egfr":1}]}"#,
        ] {
            assert!(matches!(
                timeline.import_merge(bad),
                Err(StoreError::Import(_))
            ));
        }
        assert_eq!(timeline.stored().unwrap(), before);
    }

    #[test]
    fn import_respects_capacity() {
        let timeline = store();
        for minute in 0..200 {
            timeline.append(point(minute, Some(1.0))).unwrap();
        }
        let data: Vec<_> = (200..300).map(|minute| point(minute, Some(1.0))).collect();
        let document = serde_json::json!({ "data": data });

        let added = timeline.import_merge(&document.to_string()).unwrap();
        assert_eq!(added, 100);
        let stored = timeline.stored().unwrap();
        assert_eq!(stored.len(), TIMELINE_CAPACITY);
        assert_eq!(stored[0].recorded_at, point(50, None).recorded_at);
    }
}
