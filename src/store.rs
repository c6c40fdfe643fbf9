// File-backed history store - one JSONL log per bucket, in-memory indexes
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::warn;

use crate::constants;
use crate::history::{HistoryStore, SizeHistoryRecord, StoreError};

/// Per-bucket series: records ascending by timestamp plus a secondary
/// index ordered by (size, timestamp)
///
/// Records only ever grow, so `by_size` can hold positions into `records`.
#[derive(Default)]
struct BucketSeries {
    records: Vec<SizeHistoryRecord>,
    by_size: BTreeMap<(u64, i64), usize>,
}

impl BucketSeries {
    fn push(&mut self, record: SizeHistoryRecord) {
        self.by_size
            .insert((record.size_bytes, record.timestamp), self.records.len());
        self.records.push(record);
    }
}

/// Append-only history store persisted as one JSONL file per bucket
///
/// The log files are the durable truth; both indexes are rebuilt from them
/// on open. The conditional-append check and the log write happen under a
/// single write lock, which is what turns concurrent same-baseline writers
/// into one winner plus conflicts.
pub struct FileHistoryStore {
    dir: PathBuf,
    state: RwLock<HashMap<String, BucketSeries>>,
}

impl FileHistoryStore {
    /// Open a history directory, creating it if missing, and rebuild the
    /// in-memory indexes from the logs found there
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut state: HashMap<String, BucketSeries> = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(constants::HISTORY_FILE_EXT) {
                continue;
            }
            load_log(&path, &mut state)?;
        }

        // Per-bucket order and monotonicity are normally guaranteed by the
        // append discipline; sort anyway so a hand-edited log still loads.
        for series in state.values_mut() {
            series.records.sort_by_key(|r| r.timestamp);
            series.records.dedup_by_key(|r| r.timestamp);
            series.by_size = series
                .records
                .iter()
                .enumerate()
                .map(|(i, r)| ((r.size_bytes, r.timestamp), i))
                .collect();
        }

        Ok(Self {
            dir,
            state: RwLock::new(state),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Total number of records across all buckets
    pub fn record_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .values()
            .map(|s| s.records.len())
            .sum()
    }
}

fn load_log(path: &Path, state: &mut HashMap<String, BucketSeries>) -> Result<(), StoreError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SizeHistoryRecord>(&line) {
            Ok(record) => {
                state.entry(record.bucket.clone()).or_default().push(record);
            }
            Err(e) => {
                warn!(
                    "skipping corrupt record at {}:{}: {}",
                    path.display(),
                    lineno + 1,
                    e
                );
            }
        }
    }

    Ok(())
}

impl HistoryStore for FileHistoryStore {
    fn append(&self, record: &SizeHistoryRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        let series = state.entry(record.bucket.clone()).or_default();

        // Timestamps are strictly monotonic per bucket, so comparing
        // against the last record covers both conditions: an equal
        // timestamp means the key is occupied, an older one means the
        // caller's baseline predates a concurrent append.
        if let Some(last) = series.records.last() {
            if record.timestamp == last.timestamp {
                return Err(StoreError::Conflict {
                    bucket: record.bucket.clone(),
                    timestamp: record.timestamp,
                });
            }
            if record.timestamp < last.timestamp {
                return Err(StoreError::StaleBaseline {
                    bucket: record.bucket.clone(),
                    timestamp: record.timestamp,
                    latest: last.timestamp,
                });
            }
        }

        let path = constants::history_path(&self.dir, &record.bucket);
        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;

        series.push(record.clone());
        Ok(())
    }

    fn latest(&self, bucket: &str) -> Result<Option<SizeHistoryRecord>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(state
            .get(bucket)
            .and_then(|s| s.records.last())
            .cloned())
    }

    fn range(
        &self,
        bucket: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<SizeHistoryRecord>, StoreError> {
        let state = self.state.read().unwrap();
        let Some(series) = state.get(bucket) else {
            return Ok(Vec::new());
        };

        let lo = match start {
            Some(t) => series.records.partition_point(|r| r.timestamp < t),
            None => 0,
        };
        let hi = match end {
            Some(t) => series.records.partition_point(|r| r.timestamp <= t),
            None => series.records.len(),
        };
        if lo >= hi {
            return Ok(Vec::new());
        }
        Ok(series.records[lo..hi].to_vec())
    }

    fn max_size(&self, bucket: &str) -> Result<Option<SizeHistoryRecord>, StoreError> {
        let state = self.state.read().unwrap();
        let Some(series) = state.get(bucket) else {
            return Ok(None);
        };
        Ok(series
            .by_size
            .last_key_value()
            .map(|(_, &idx)| series.records[idx].clone()))
    }

    fn buckets(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().unwrap();
        let mut buckets: Vec<String> = state
            .iter()
            .filter(|(_, s)| !s.records.is_empty())
            .map(|(b, _)| b.clone())
            .collect();
        buckets.sort();
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bucket: &str, timestamp: i64, size_bytes: u64, object_count: u64) -> SizeHistoryRecord {
        SizeHistoryRecord {
            bucket: bucket.to_string(),
            timestamp,
            size_bytes,
            object_count,
            flagged: false,
        }
    }

    fn open_store() -> (tempfile::TempDir, FileHistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_then_range_round_trip() {
        let (_dir, store) = open_store();
        let r = record("my-bucket", 1000, 100, 1);
        store.append(&r).unwrap();

        let got = store.range("my-bucket", None, None).unwrap();
        assert_eq!(got, vec![r]);
    }

    #[test]
    fn test_append_conflict_on_occupied_key() {
        let (_dir, store) = open_store();
        store.append(&record("my-bucket", 1000, 100, 1)).unwrap();

        let err = store.append(&record("my-bucket", 1000, 150, 2)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { timestamp: 1000, .. }));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_append_rejects_stale_baseline() {
        let (_dir, store) = open_store();
        store.append(&record("my-bucket", 2000, 100, 1)).unwrap();

        let err = store.append(&record("my-bucket", 1000, 50, 1)).unwrap_err();
        assert!(matches!(err, StoreError::StaleBaseline { latest: 2000, .. }));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_buckets_are_independent() {
        let (_dir, store) = open_store();
        store.append(&record("bucket-a", 1000, 10, 1)).unwrap();
        store.append(&record("bucket-b", 1000, 20, 1)).unwrap();

        assert_eq!(store.latest("bucket-a").unwrap().unwrap().size_bytes, 10);
        assert_eq!(store.latest("bucket-b").unwrap().unwrap().size_bytes, 20);
        assert_eq!(store.buckets().unwrap(), vec!["bucket-a", "bucket-b"]);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let (_dir, store) = open_store();
        for (t, s) in [(1000, 10), (2000, 20), (3000, 30), (4000, 40)] {
            store.append(&record("my-bucket", t, s, 1)).unwrap();
        }

        let got = store.range("my-bucket", Some(2000), Some(3000)).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].timestamp, 2000);
        assert_eq!(got[1].timestamp, 3000);

        let open_start = store.range("my-bucket", None, Some(2000)).unwrap();
        assert_eq!(open_start.len(), 2);
        let open_end = store.range("my-bucket", Some(3000), None).unwrap();
        assert_eq!(open_end.len(), 2);
        let empty = store.range("my-bucket", Some(5000), None).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_max_size_tracks_peak_not_latest() {
        let (_dir, store) = open_store();
        store.append(&record("my-bucket", 1000, 100, 1)).unwrap();
        store.append(&record("my-bucket", 2000, 500, 2)).unwrap();
        store.append(&record("my-bucket", 3000, 200, 1)).unwrap();

        let max = store.max_size("my-bucket").unwrap().unwrap();
        assert_eq!(max.size_bytes, 500);
        assert_eq!(max.timestamp, 2000);

        let latest = store.latest("my-bucket").unwrap().unwrap();
        assert_eq!(latest.size_bytes, 200);

        // invariant: max >= every record
        for r in store.range("my-bucket", None, None).unwrap() {
            assert!(max.size_bytes >= r.size_bytes);
        }
    }

    #[test]
    fn test_reopen_rebuilds_indexes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileHistoryStore::open(dir.path()).unwrap();
            store.append(&record("my-bucket", 1000, 100, 1)).unwrap();
            store.append(&record("my-bucket", 2000, 300, 2)).unwrap();
            store.append(&record("my-bucket", 3000, 150, 1)).unwrap();
        }

        let store = FileHistoryStore::open(dir.path()).unwrap();
        assert_eq!(store.record_count(), 3);
        assert_eq!(store.latest("my-bucket").unwrap().unwrap().timestamp, 3000);
        assert_eq!(store.max_size("my-bucket").unwrap().unwrap().size_bytes, 300);
    }

    #[test]
    fn test_load_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileHistoryStore::open(dir.path()).unwrap();
            store.append(&record("my-bucket", 1000, 100, 1)).unwrap();
        }
        let path = constants::history_path(dir.path(), "my-bucket");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        let store = FileHistoryStore::open(dir.path()).unwrap();
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn test_latest_of_unknown_bucket_is_none() {
        let (_dir, store) = open_store();
        assert!(store.latest("nothing-here").unwrap().is_none());
        assert!(store.max_size("nothing-here").unwrap().is_none());
        assert!(store.range("nothing-here", None, None).unwrap().is_empty());
    }
}
