//! In-memory checkpoint storage for development and testing
//!
//! This module provides **[`InMemoryCheckpointSaver`]** - the reference implementation of
//! [`BlockingCheckpointSaver`] and [`CheckpointSaver`]. Checkpoints live in a
//! lock-protected B-tree index and are never evicted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  InMemoryCheckpointSaver                                     │
//! │                                                               │
//! │  ┌────────────────────────────────────────────────┐         │
//! │  │  Arc<RwLock<BTreeMap<thread_id, ThreadIndex>>> │         │
//! │  │  ┌──────────────────────────────────────────┐ │         │
//! │  │  │  "session-1"                             │ │         │
//! │  │  │    ├─ id 0006…a1 → Arc<StoredEntry>      │ │         │
//! │  │  │    ├─ id 0006…b7 → Arc<StoredEntry>      │ │         │
//! │  │  │    └─ id 0006…c3 → Arc<StoredEntry>      │ │         │
//! │  │  │  "session-2"                             │ │         │
//! │  │  │    └─ id 0006…b9 → Arc<StoredEntry>      │ │         │
//! │  │  └──────────────────────────────────────────┘ │         │
//! │  └────────────────────────────────────────────────┘         │
//! │                                                               │
//! │  StoredEntry (immutable once inserted):                      │
//! │    • config / parent_config                                  │
//! │    • checkpoint bytes, metadata bytes (SerializerProtocol)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! - `put` serializes outside the lock, then inserts one `Arc` under the write
//!   lock, so no reader can observe a partial entry
//! - `get_tuple` and `list` hold the read lock only long enough to clone `Arc`
//!   handles; decoding and filtering happen afterwards
//! - A `list` in progress iterates its snapshot and does not see later `put`s
//! - The lock is never held across an `.await`, so the same store serves OS
//!   threads and tasks on a single-threaded runtime alike
//!
//! # Performance Characteristics
//!
//! | Operation | Complexity | Notes |
//! |-----------|------------|-------|
//! | `put()` | O(log n) | B-tree insert per thread |
//! | `get_tuple()` | O(log n) | Exact id or last key |
//! | `list()` | O(k) to snapshot | k = candidates after thread scope and `before` bound |
//!
//! With no filter, `limit` also bounds the snapshot.

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    config::SaverConfig,
    error::{CheckpointError, Result},
    filter::MetadataFilter,
    id::CheckpointId,
    serializer::{JsonSerializer, SerializerProtocol},
    traits::{BlockingCheckpointSaver, CheckpointIter, CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage entry for in-memory checkpoints
#[derive(Debug)]
struct StoredEntry {
    config: CheckpointConfig,
    parent_config: Option<CheckpointConfig>,
    checkpoint: Vec<u8>,
    metadata: Vec<u8>,
}

/// Checkpoints of one thread ordered by id
type ThreadIndex = BTreeMap<CheckpointId, Arc<StoredEntry>>;

/// Thread-safe in-memory checkpoint storage
type CheckpointStorage = Arc<RwLock<BTreeMap<String, ThreadIndex>>>;

/// In-memory checkpoint saver implementation
///
/// Cloning is shallow: clones share the same storage.
///
/// # Example
///
/// ```rust
/// use checkpoint_store::{
///     CheckpointConfig, CheckpointMetadata, CheckpointSaver, Checkpoint, InMemoryCheckpointSaver,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let saver = InMemoryCheckpointSaver::new();
///     let config = CheckpointConfig::new("thread-1");
///
///     let saved = saver.put(&config, Checkpoint::empty(), CheckpointMetadata::new()).await?;
///     let latest = saver.get_tuple(&config).await?.expect("just saved");
///     assert_eq!(latest.config, saved);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct InMemoryCheckpointSaver<S = JsonSerializer> {
    storage: CheckpointStorage,
    serializer: Arc<S>,
    config: SaverConfig,
}

impl InMemoryCheckpointSaver {
    /// Create a new in-memory checkpoint saver with JSON encoding
    pub fn new() -> Self {
        Self::with_config(SaverConfig::default())
    }

    /// Create a JSON-encoded saver with the given configuration
    pub fn with_config(config: SaverConfig) -> Self {
        Self::with_serializer(JsonSerializer::new(), config)
    }
}

impl<S: SerializerProtocol> InMemoryCheckpointSaver<S> {
    /// Create a saver that encodes entries with `serializer`
    pub fn with_serializer(serializer: S, config: SaverConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(BTreeMap::new())),
            serializer: Arc::new(serializer),
            config,
        }
    }

    pub fn config(&self) -> &SaverConfig {
        &self.config
    }

    /// Get the number of threads being tracked
    pub fn thread_count(&self) -> usize {
        self.storage.read().len()
    }

    /// Get the total number of checkpoints across all threads
    pub fn checkpoint_count(&self) -> usize {
        self.storage.read().values().map(|thread| thread.len()).sum()
    }

    /// Decide what to do with an id that is already stored in the thread.
    ///
    /// Re-putting the same checkpoint with the same metadata is idempotent and
    /// returns the stored config. Anything else would leave the caller holding
    /// a config that does not address what it put, so it is a conflict.
    fn resolve_duplicate(
        &self,
        existing: &StoredEntry,
        checkpoint: &Checkpoint,
        checkpoint_bytes: &[u8],
        metadata: &CheckpointMetadata,
        metadata_bytes: &[u8],
    ) -> Result<CheckpointConfig> {
        let same_checkpoint = existing.checkpoint == checkpoint_bytes
            || self.serializer.loads::<Checkpoint>(&existing.checkpoint)? == *checkpoint;
        let same_metadata = existing.metadata == metadata_bytes
            || self.serializer.loads::<CheckpointMetadata>(&existing.metadata)? == *metadata;

        if same_checkpoint && same_metadata {
            debug!("Checkpoint already stored");
            return Ok(existing.config.clone());
        }

        warn!(
            same_checkpoint,
            same_metadata, "Checkpoint id collides with different content"
        );
        Err(CheckpointError::IdentityConflict {
            thread_id: existing.config.thread_id.clone(),
            checkpoint_id: checkpoint.id.clone(),
        })
    }
}

impl Default for InMemoryCheckpointSaver {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for InMemoryCheckpointSaver<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            serializer: Arc::clone(&self.serializer),
            config: self.config.clone(),
        }
    }
}

fn decode_entry<S: SerializerProtocol>(
    serializer: &S,
    entry: &StoredEntry,
    metadata: CheckpointMetadata,
) -> Result<CheckpointTuple> {
    Ok(CheckpointTuple {
        config: entry.config.clone(),
        checkpoint: serializer.loads(&entry.checkpoint)?,
        metadata,
        parent_config: entry.parent_config.clone(),
    })
}

/// Lazy iterator over a `list` snapshot
///
/// Holds `Arc` handles to the candidate entries captured at call time. Each
/// entry's metadata is decoded and filtered only when the iterator reaches it,
/// and its checkpoint only if it matches.
pub struct ListIter<S> {
    entries: std::vec::IntoIter<Arc<StoredEntry>>,
    filter: Option<MetadataFilter>,
    remaining: Option<usize>,
    serializer: Arc<S>,
}

impl<S: SerializerProtocol> Iterator for ListIter<S> {
    type Item = Result<CheckpointTuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }

        for entry in self.entries.by_ref() {
            let item = match self.serializer.loads::<CheckpointMetadata>(&entry.metadata) {
                Ok(metadata) => {
                    if let Some(filter) = &self.filter {
                        if !filter.matches(&metadata) {
                            continue;
                        }
                    }
                    decode_entry(self.serializer.as_ref(), &entry, metadata)
                }
                Err(e) => Err(e),
            };

            if let Err(e) = &item {
                warn!(
                    thread_id = %entry.config.thread_id,
                    error = %e,
                    "Failed to decode stored checkpoint"
                );
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(item);
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self.entries.len();
        (0, Some(self.remaining.map_or(upper, |r| r.min(upper))))
    }
}

impl<S: SerializerProtocol + 'static> BlockingCheckpointSaver for InMemoryCheckpointSaver<S> {
    fn blocking_get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let entry = {
            let storage = self.storage.read();
            storage
                .get(&config.thread_id)
                .and_then(|thread| match &config.checkpoint_id {
                    Some(checkpoint_id) => thread.get(checkpoint_id),
                    None => thread.values().next_back(),
                })
                .cloned()
        };

        debug!(
            thread_id = %config.thread_id,
            checkpoint_id = ?config.checkpoint_id,
            found = entry.is_some(),
            "Loaded checkpoint"
        );

        entry
            .map(|entry| {
                let metadata = self.serializer.loads(&entry.metadata)?;
                decode_entry(self.serializer.as_ref(), &entry, metadata)
            })
            .transpose()
    }

    fn blocking_list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<&MetadataFilter>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointIter> {
        let limit = self.config.effective_limit(limit);
        let filter = filter.filter(|f| !f.is_empty()).cloned();
        let upper: Bound<&str> = match before.and_then(|b| b.checkpoint_id.as_deref()) {
            Some(before_id) => Bound::Excluded(before_id),
            None => Bound::Unbounded,
        };
        // Without a filter every candidate is a result, so the limit bounds the snapshot too
        let snapshot_cap = if filter.is_none() { limit } else { None };

        let entries: Vec<Arc<StoredEntry>> = {
            let storage = self.storage.read();
            let threads: Vec<&ThreadIndex> = match config {
                Some(cfg) => storage.get(&cfg.thread_id).into_iter().collect(),
                None => storage.values().collect(),
            };

            threads
                .into_iter()
                .flat_map(|thread| {
                    thread
                        .range::<str, _>((Bound::Unbounded, upper))
                        .rev()
                        .map(|(_, entry)| Arc::clone(entry))
                })
                .take(snapshot_cap.unwrap_or(usize::MAX))
                .collect()
        };

        debug!(
            thread_id = ?config.map(|c| c.thread_id.as_str()),
            filter_keys = filter.as_ref().map_or(0, MetadataFilter::len),
            before = ?before.and_then(|b| b.checkpoint_id.as_deref()),
            ?limit,
            candidates = entries.len(),
            "Listing checkpoints"
        );

        Ok(Box::new(ListIter {
            entries: entries.into_iter(),
            filter,
            remaining: limit,
            serializer: Arc::clone(&self.serializer),
        }))
    }

    #[tracing::instrument(
        skip(self, config, checkpoint, metadata),
        fields(thread_id = %config.thread_id, checkpoint_id = %checkpoint.id)
    )]
    fn blocking_put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        if config.thread_id.is_empty() {
            return Err(CheckpointError::Invalid("thread_id is required".to_string()));
        }
        if checkpoint.id.is_empty() {
            return Err(CheckpointError::Invalid("checkpoint id is required".to_string()));
        }
        if config.checkpoint_id.as_deref() == Some(checkpoint.id.as_str()) {
            return Err(CheckpointError::Invalid(format!(
                "checkpoint {} cannot be its own parent",
                checkpoint.id
            )));
        }
        if let Some(channel) = checkpoint.non_finite_version() {
            return Err(CheckpointError::Invalid(format!(
                "channel {:?} has a non-finite version",
                channel
            )));
        }

        let checkpoint_bytes = self.serializer.dumps(&checkpoint)?;
        let metadata_bytes = self.serializer.dumps(&metadata)?;

        let checkpoint_config = CheckpointConfig {
            thread_id: config.thread_id.clone(),
            checkpoint_id: Some(checkpoint.id.clone()),
        };
        let parent_config = config.checkpoint_id.as_ref().map(|_| config.clone());

        let mut storage = self.storage.write();
        let thread = storage.entry(config.thread_id.clone()).or_default();

        if let Some(existing) = thread.get(&checkpoint.id) {
            return self.resolve_duplicate(
                existing,
                &checkpoint,
                &checkpoint_bytes,
                &metadata,
                &metadata_bytes,
            );
        }

        thread.insert(
            checkpoint.id.clone(),
            Arc::new(StoredEntry {
                config: checkpoint_config.clone(),
                parent_config,
                checkpoint: checkpoint_bytes,
                metadata: metadata_bytes,
            }),
        );
        drop(storage);

        debug!("Stored checkpoint");
        Ok(checkpoint_config)
    }
}

#[async_trait]
impl<S: SerializerProtocol + 'static> CheckpointSaver for InMemoryCheckpointSaver<S> {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        self.blocking_get_tuple(config)
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<&MetadataFilter>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let iter = self.blocking_list(config, filter, before, limit)?;
        Ok(Box::pin(stream::iter(iter)))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        self.blocking_put(config, checkpoint, metadata)
    }
}
