//! Persistence collaborators.
//!
//! A [PersistenceAdapter] stores [Thought] records by value and can push bulk remote snapshots.
//! Mutations never talk to an adapter directly: their [ThoughtEvent]s are collected in a
//! [SyncQueue], which writes each touched value's *current* record on flush.

use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{event::ThoughtEvent, properties::Thought, thoughtbase::ThoughtBase, ThoughtError};

pub trait PersistenceAdapter: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Thought>, ThoughtError>;
    fn put(&self, key: &str, thought: &Thought) -> Result<(), ThoughtError>;
    fn delete(&self, key: &str) -> Result<(), ThoughtError>;
    /// Register a receiver for bulk remote snapshots.
    fn subscribe(&self, on_bulk_update: UnboundedSender<Vec<Thought>>) -> Result<(), ThoughtError>;
    /// Every stored record, for the initial load.
    fn snapshot(&self) -> Result<Vec<Thought>, ThoughtError>;
}

/// In-memory adapter. Clones share the same store, so a test can keep one handle while a service
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    records: Arc<Mutex<BTreeMap<String, Thought>>>,
    subscribers: Arc<Mutex<Vec<UnboundedSender<Vec<Thought>>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        MemoryAdapter::default()
    }

    pub fn with_records<I: IntoIterator<Item = Thought>>(records: I) -> Self {
        let adapter = MemoryAdapter::default();
        adapter.records.lock().extend(
            records
                .into_iter()
                .map(|thought| (thought.value.clone(), thought)),
        );
        adapter
    }

    pub fn records(&self) -> BTreeMap<String, Thought> {
        self.records.lock().clone()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace the stored records as a remote peer would and notify subscribers. Returns how many
    /// subscribers received the snapshot.
    pub fn push_remote(&self, snapshot: Vec<Thought>) -> usize {
        {
            let mut records = self.records.lock();
            records.clear();
            records.extend(
                snapshot
                    .iter()
                    .map(|thought| (thought.value.clone(), thought.clone())),
            );
        }
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        subscribers.len()
    }

    fn check_writable(&self) -> Result<(), ThoughtError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ThoughtError::Io("memory adapter is offline".to_string()));
        }
        Ok(())
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn get(&self, key: &str) -> Result<Option<Thought>, ThoughtError> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn put(&self, key: &str, thought: &Thought) -> Result<(), ThoughtError> {
        self.check_writable()?;
        self.records.lock().insert(key.to_string(), thought.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ThoughtError> {
        self.check_writable()?;
        self.records.lock().remove(key);
        Ok(())
    }

    fn subscribe(&self, on_bulk_update: UnboundedSender<Vec<Thought>>) -> Result<(), ThoughtError> {
        self.subscribers.lock().push(on_bulk_update);
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<Thought>, ThoughtError> {
        Ok(self.records.lock().values().cloned().collect())
    }
}

/// Records kept as one pretty-printed JSON object keyed by value. Every write rewrites the file.
#[derive(Debug)]
pub struct JsonFileAdapter {
    path: PathBuf,
    records: Mutex<BTreeMap<String, Thought>>,
}

impl JsonFileAdapter {
    /// Open `path`, loading its records if the file exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ThoughtError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            tracing::debug!("Reading records from {:?}", &path);
            let content = read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            tracing::debug!("Record file {:?} not found, starting empty", &path);
            BTreeMap::new()
        };
        Ok(JsonFileAdapter {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, records: &BTreeMap<String, Thought>) -> Result<(), ThoughtError> {
        write(&self.path, serde_json::to_string_pretty(records)?)?;
        Ok(())
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn get(&self, key: &str) -> Result<Option<Thought>, ThoughtError> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn put(&self, key: &str, thought: &Thought) -> Result<(), ThoughtError> {
        let mut records = self.records.lock();
        records.insert(key.to_string(), thought.clone());
        self.save(&records)
    }

    fn delete(&self, key: &str) -> Result<(), ThoughtError> {
        let mut records = self.records.lock();
        if records.remove(key).is_some() {
            self.save(&records)?;
        }
        Ok(())
    }

    /// A file has no remote peer; the current contents are delivered once.
    fn subscribe(&self, on_bulk_update: UnboundedSender<Vec<Thought>>) -> Result<(), ThoughtError> {
        on_bulk_update
            .send(self.snapshot()?)
            .map_err(|_| ThoughtError::Service("snapshot receiver dropped".to_string()))
    }

    fn snapshot(&self) -> Result<Vec<Thought>, ThoughtError> {
        Ok(self.records.lock().values().cloned().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub written: usize,
    pub removed: usize,
    pub failed: Vec<(String, ThoughtError)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Values waiting to be written. Repeated events for one value collapse into one write.
#[derive(Debug, Clone, Default)]
pub struct SyncQueue {
    pending: BTreeSet<String>,
}

impl SyncQueue {
    /// Queue the values of local record events. Remote events are already persisted.
    pub fn enqueue(&mut self, events: &[ThoughtEvent]) {
        self.pending.extend(
            events
                .iter()
                .filter(|event| event.needs_persist())
                .filter_map(|event| event.value().map(str::to_string)),
        );
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &String> {
        self.pending.iter()
    }

    /// Write every pending value's current record, or delete it when it no longer exists. Failed
    /// values stay queued for the next flush; memory state is never rolled back.
    pub fn flush(&mut self, thoughts: &ThoughtBase, adapter: &dyn PersistenceAdapter) -> SyncReport {
        let mut report = SyncReport::default();
        for key in std::mem::take(&mut self.pending) {
            let result = match thoughts.get(&key) {
                Some(thought) => adapter.put(&key, &thought).map(|_| report.written += 1),
                None => adapter.delete(&key).map(|_| report.removed += 1),
            };
            if let Err(e) = result {
                tracing::warn!("[SyncQueue::flush] could not persist '{key}': {e}");
                report.failed.push((key, e));
            }
        }
        for (key, _) in report.failed.iter() {
            self.pending.insert(key.clone());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        properties::{Membership, Timestamp},
        tests::helpers::chain_base,
    };
    use test_log::test;

    #[test]
    fn test_queue_coalesces_and_flushes() {
        let mut thoughts = chain_base();
        let adapter = MemoryAdapter::new();
        let mut queue = SyncQueue::default();

        queue.enqueue(&thoughts.create("x", ["a"], 1.0).unwrap());
        queue.enqueue(&thoughts.create("x", ["d"], 0.0).unwrap());
        queue.enqueue(&[ThoughtEvent::updated("remote").with_origin(crate::event::EventOrigin::Remote)]);
        assert_eq!(queue.len(), 1);

        let report = queue.flush(&thoughts, &adapter);
        assert_eq!(report.written, 1);
        assert!(queue.is_empty());
        assert_eq!(adapter.get("x").unwrap().unwrap().member_of.len(), 2);

        queue.enqueue(&thoughts.delete(["a"]));
        let report = queue.flush(&thoughts, &adapter);
        assert_eq!((report.written, report.removed), (1, 3));
        assert!(adapter.get("b").unwrap().is_none());
        assert_eq!(adapter.get("x").unwrap().unwrap().member_of.len(), 1);
    }

    #[test]
    fn test_failed_writes_stay_queued() {
        let mut thoughts = chain_base();
        let adapter = MemoryAdapter::new();
        let mut queue = SyncQueue::default();
        adapter.set_failing(true);

        queue.enqueue(&thoughts.create("x", ["root"], 5.0).unwrap());
        let report = queue.flush(&thoughts, &adapter);
        assert!(!report.is_clean());
        assert_eq!(report.failed[0].0, "x");
        assert!(thoughts.contains("x"));
        assert_eq!(queue.len(), 1);

        adapter.set_failing(false);
        assert!(queue.flush(&thoughts, &adapter).is_clean());
        assert!(adapter.get("x").unwrap().is_some());
    }

    #[test]
    fn test_push_remote_reaches_subscribers() {
        let adapter = MemoryAdapter::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        adapter.subscribe(tx).unwrap();
        let record = Thought::new("a", vec![Membership::new(["root"], 0.0)], Timestamp(9));
        assert_eq!(adapter.push_remote(vec![record.clone()]), 1);
        assert_eq!(rx.try_recv().unwrap(), vec![record.clone()]);
        assert_eq!(adapter.snapshot().unwrap(), vec![record]);
    }
}
