// History store contract - append-only size time series per bucket
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timestamped observation of a bucket's aggregate size
///
/// Records are immutable once written and uniquely keyed by
/// (bucket, timestamp). Timestamps are epoch milliseconds and strictly
/// monotonic within a bucket; the latest record is the authoritative
/// current aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeHistoryRecord {
    pub bucket: String,
    pub timestamp: i64,
    pub size_bytes: u64,
    pub object_count: u64,
    /// Set when the observation was clamped at zero or produced from an
    /// unresolvable removal delta.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flagged: bool,
}

/// Errors from history store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists for {bucket}@{timestamp}")]
    Conflict { bucket: String, timestamp: i64 },

    #[error("stale baseline for {bucket}: latest is {latest}, append was {timestamp}")]
    StaleBaseline {
        bucket: String,
        timestamp: i64,
        latest: i64,
    },

    #[error("history store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt history record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Conflicts are resolved by re-reading the baseline and retrying;
    /// everything else is fatal to the current operation.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::StaleBaseline { .. }
        )
    }
}

/// Durable, append-only time-series persistence with a secondary access
/// path for maximum-size lookups
///
/// `append` is the sole mutation. All operations are safe under concurrent
/// callers; for a given (bucket, timestamp) key at most one concurrent
/// append succeeds.
pub trait HistoryStore: Send + Sync {
    /// Conditionally append one record
    ///
    /// Fails with [`StoreError::Conflict`] when the exact key is already
    /// occupied and with [`StoreError::StaleBaseline`] when the record's
    /// timestamp is not strictly beyond the bucket's current latest, i.e.
    /// the caller read its baseline before a concurrent writer landed.
    fn append(&self, record: &SizeHistoryRecord) -> Result<(), StoreError>;

    /// Most recent record for a bucket
    fn latest(&self, bucket: &str) -> Result<Option<SizeHistoryRecord>, StoreError>;

    /// Records in `[start, end]` (both inclusive, either side open when
    /// `None`), ascending by timestamp
    ///
    /// The result is a snapshot as of the call; records appended
    /// concurrently may appear in a subsequent call.
    fn range(
        &self,
        bucket: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<SizeHistoryRecord>, StoreError>;

    /// The record with the greatest size for a bucket, served from the
    /// secondary index rather than a scan
    fn max_size(&self, bucket: &str) -> Result<Option<SizeHistoryRecord>, StoreError>;

    /// All bucket ids with at least one record, sorted
    fn buckets(&self) -> Result<Vec<String>, StoreError>;
}
