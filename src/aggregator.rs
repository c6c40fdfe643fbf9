// Size aggregation - turns object-change events into history records
use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::constants;
use crate::event::{ChangeKind, ObjectChangeEvent};
use crate::history::{HistoryStore, SizeHistoryRecord, StoreError};

/// Errors from applying an event
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("conditional append lost {attempts} races for bucket {bucket}")]
    RetriesExhausted {
        bucket: String,
        attempts: usize,
        #[source]
        last: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How an accepted event was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    /// Normal case: a fresh record was appended
    Recorded,
    /// Recognized replay of an already-applied delivery id; the prior
    /// record is returned and nothing was written
    Duplicate,
    /// A removal whose prior size could not be determined; recorded with a
    /// zero size delta and flagged
    RemovalUnresolved,
    /// The delta would have driven a total negative; clamped at zero and
    /// flagged
    Clamped,
}

/// Result of applying one event
#[derive(Debug, Clone)]
pub struct Applied {
    pub record: SizeHistoryRecord,
    pub status: ApplyStatus,
}

/// Bounded memory of recently applied delivery ids
///
/// At-least-once delivery means the same notification can arrive any number
/// of times; replays inside the window are answered with the record the
/// first application produced.
struct DeliveryWindow {
    seen: HashMap<String, SizeHistoryRecord>,
    order: VecDeque<String>,
    capacity: usize,
}

impl DeliveryWindow {
    fn new(capacity: usize) -> Self {
        Self {
            seen: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, delivery_id: &str) -> Option<&SizeHistoryRecord> {
        self.seen.get(delivery_id)
    }

    fn insert(&mut self, delivery_id: String, record: SizeHistoryRecord) {
        if self.seen.insert(delivery_id.clone(), record).is_none() {
            self.order.push_back(delivery_id);
            while self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.seen.remove(&evicted);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Last known per-object sizes, used to resolve removal deltas when the
/// event itself does not carry the size
///
/// Bounded; evicting an entry only degrades a later removal into the
/// flagged zero-delta path, never into a wrong total.
struct ObjectSizeCache {
    sizes: HashMap<(String, String), u64>,
    capacity: usize,
}

impl ObjectSizeCache {
    fn new(capacity: usize) -> Self {
        Self {
            sizes: HashMap::new(),
            capacity,
        }
    }

    fn insert(&mut self, bucket: &str, key: &str, size: u64) {
        if self.sizes.len() >= self.capacity
            && !self.sizes.contains_key(&(bucket.to_string(), key.to_string()))
        {
            if let Some(evict) = self.sizes.keys().next().cloned() {
                self.sizes.remove(&evict);
            }
        }
        self.sizes.insert((bucket.to_string(), key.to_string()), size);
    }

    fn get(&self, bucket: &str, key: &str) -> Option<u64> {
        self.sizes.get(&(bucket.to_string(), key.to_string())).copied()
    }

    fn remove(&mut self, bucket: &str, key: &str) {
        self.sizes.remove(&(bucket.to_string(), key.to_string()));
    }
}

/// Consumes object-change notifications and maintains each bucket's running
/// aggregate in the history store
///
/// There is no in-process counter: the baseline is re-read from the store on
/// every attempt and the append is conditional, so concurrent appliers for
/// the same bucket resolve to one winner and bounded retries for the rest.
pub struct SizeAggregator<S: HistoryStore> {
    store: Arc<S>,
    window: Mutex<DeliveryWindow>,
    object_sizes: Mutex<ObjectSizeCache>,
    max_attempts: usize,
}

impl<S: HistoryStore> SizeAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_max_attempts(store, constants::AGGREGATE_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<S>, max_attempts: usize) -> Self {
        Self {
            store,
            window: Mutex::new(DeliveryWindow::new(constants::DELIVERY_WINDOW_CAPACITY)),
            object_sizes: Mutex::new(ObjectSizeCache::new(constants::OBJECT_CACHE_CAPACITY)),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Number of delivery ids currently held for dedup
    pub fn window_len(&self) -> usize {
        self.window.lock().unwrap().len()
    }

    /// Apply one event, producing exactly one new history record per
    /// logical change
    ///
    /// Replays of an already-applied delivery id are a no-op returning the
    /// prior record. Exhausting the conditional-append retry bound surfaces
    /// an error so the delivery mechanism redelivers.
    pub fn apply(&self, event: &ObjectChangeEvent) -> Result<Applied, AggregationError> {
        event.validate().map_err(AggregationError::InvalidEvent)?;
        let event_time = event
            .event_time
            .as_millis()
            .map_err(|e| AggregationError::InvalidEvent(e.to_string()))?;

        if let Some(prior) = self.window.lock().unwrap().get(&event.delivery_id) {
            debug!(
                "duplicate delivery {} for bucket {}, returning prior record",
                event.delivery_id, event.bucket
            );
            return Ok(Applied {
                record: prior.clone(),
                status: ApplyStatus::Duplicate,
            });
        }

        let (size_delta, count_delta, mut status) = self.resolve_delta(event);

        let mut last_conflict: Option<StoreError> = None;
        for attempt in 1..=self.max_attempts {
            let baseline = self.store.latest(&event.bucket)?;
            let (base_size, base_count, base_ts) = match &baseline {
                Some(r) => (r.size_bytes as i128, r.object_count as i128, r.timestamp),
                None => (0, 0, i64::MIN),
            };

            let mut flagged = status == ApplyStatus::RemovalUnresolved;
            let new_size = base_size + size_delta;
            let new_count = base_count + count_delta;
            if new_size < 0 || new_count < 0 {
                warn!(
                    "clamping bucket {} at zero (size {} count {}): store observation drifted",
                    event.bucket, new_size, new_count
                );
                flagged = true;
                if status == ApplyStatus::Recorded {
                    status = ApplyStatus::Clamped;
                }
            }

            let record = SizeHistoryRecord {
                bucket: event.bucket.clone(),
                timestamp: event_time.max(base_ts.saturating_add(1)),
                size_bytes: new_size.max(0) as u64,
                object_count: new_count.max(0) as u64,
                flagged,
            };

            match self.store.append(&record) {
                Ok(()) => {
                    // the object is gone for good only once its removal is
                    // durably recorded
                    if event.change_type == ChangeKind::Removed {
                        self.object_sizes
                            .lock()
                            .unwrap()
                            .remove(&event.bucket, &event.key);
                    }
                    self.window
                        .lock()
                        .unwrap()
                        .insert(event.delivery_id.clone(), record.clone());
                    return Ok(Applied { record, status });
                }
                Err(e) if e.is_conflict() => {
                    debug!(
                        "append conflict for bucket {} (attempt {}/{}): {}",
                        event.bucket, attempt, self.max_attempts, e
                    );
                    last_conflict = Some(e);
                    if attempt < self.max_attempts {
                        std::thread::sleep(backoff_delay(&event.delivery_id, attempt));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AggregationError::RetriesExhausted {
            bucket: event.bucket.clone(),
            attempts: self.max_attempts,
            last: last_conflict.unwrap_or_else(|| StoreError::Unavailable(
                "append never attempted".to_string(),
            )),
        })
    }

    /// Signed (size, object count) delta for an event, plus the outcome it
    /// implies before clamping
    fn resolve_delta(&self, event: &ObjectChangeEvent) -> (i128, i128, ApplyStatus) {
        match event.change_type {
            ChangeKind::Created => {
                let size = event.size.unwrap_or(0);
                self.object_sizes
                    .lock()
                    .unwrap()
                    .insert(&event.bucket, &event.key, size);
                (size as i128, 1, ApplyStatus::Recorded)
            }
            ChangeKind::Removed => {
                let looked_up = self
                    .object_sizes
                    .lock()
                    .unwrap()
                    .get(&event.bucket, &event.key);
                match event.size.filter(|s| *s > 0).or(looked_up) {
                    Some(size) => (-(size as i128), -1, ApplyStatus::Recorded),
                    None => {
                        warn!(
                            "removal of {}/{} has no resolvable size, recording zero delta",
                            event.bucket, event.key
                        );
                        // The object is definitely gone, so the count still
                        // drops; only the size delta is unknown.
                        (0, -1, ApplyStatus::RemovalUnresolved)
                    }
                }
            }
        }
    }
}

/// Jittered exponential backoff for append retries
///
/// Jitter is derived from the delivery id so concurrent losers of the same
/// race spread out instead of colliding again in lockstep.
fn backoff_delay(delivery_id: &str, attempt: usize) -> Duration {
    let base = constants::AGGREGATE_BACKOFF_BASE_MS << (attempt.saturating_sub(1)).min(6);
    let mut hasher = DefaultHasher::new();
    delivery_id.hash(&mut hasher);
    attempt.hash(&mut hasher);
    let jitter = hasher.finish() % base.max(1);
    Duration::from_millis(base + jitter)
}
