//! Checkpoint storage traits for backend implementations
//!
//! This module defines the contract every checkpoint backend satisfies, in two
//! call styles:
//!
//! - **[`CheckpointSaver`]** - `async` calls; `list` returns a [`CheckpointStream`]
//! - **[`BlockingCheckpointSaver`]** - the same operations as `blocking_*` calls;
//!   `blocking_list` returns a lazy [`CheckpointIter`]
//!
//! For equal store state both styles return the same tuples in the same order.
//! The in-memory backend implements the async trait as a thin wrapper over the
//! blocking core, so there is one code path.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Execution engine                                            │
//! │  • create_checkpoint(parent, writes, step)                   │
//! │  • put(config, checkpoint, metadata) → next config           │
//! │  • get_tuple / list to resume or inspect history             │
//! └───────────────┬─────────────────────────┬────────────────────┘
//!                 │ blocking                │ async
//!                 ↓                         ↓
//! ┌──────────────────────────┐  ┌──────────────────────────────┐
//! │  BlockingCheckpointSaver │←─│  CheckpointSaver             │
//! │  CheckpointIter          │  │  CheckpointStream            │
//! └────────────┬─────────────┘  └──────────────────────────────┘
//!              ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (in-memory reference, or any durable backend)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Contract
//!
//! ## put() - Save Checkpoint
//!
//! - Stores `(config, checkpoint, metadata, parent_config)` keyed by
//!   `(thread_id, checkpoint.id)`; `parent_config` is the incoming config when
//!   it names a checkpoint, otherwise `None`
//! - Returns a config addressing exactly the stored checkpoint
//! - Atomic: once it returns, every caller sees the whole entry; no caller ever
//!   sees part of it
//! - Never overwrites: re-putting an id with the same checkpoint and metadata
//!   returns the stored config; any other collision is
//!   [`CheckpointError::IdentityConflict`](crate::CheckpointError::IdentityConflict)
//! - Rejects checkpoints that could not be read back, such as non-finite
//!   float versions, with [`CheckpointError::Invalid`](crate::CheckpointError::Invalid)
//!
//! ## get_tuple() - Retrieve Checkpoint
//!
//! - With `checkpoint_id`: that exact tuple, or `None`
//! - Without: the tuple with the greatest id in the thread, or `None`
//!
//! ## list() - Query Checkpoints
//!
//! - `config`: `Some` restricts to one thread, `None` searches every thread
//! - `filter`: exact-match [`MetadataFilter`]; `None` or empty matches all
//! - `before`: only checkpoints whose id sorts strictly before `before.checkpoint_id`
//! - `limit`: cap on results; `None` or `0` is unbounded
//! - Order: newest first within a thread; threads in ascending `thread_id` order
//! - Lazy, finite, and computed over a snapshot taken at call time; calling
//!   `list` again re-reads current state
//! - Zero matches is an empty sequence, never an error
//!
//! # Example
//!
//! ```rust
//! use checkpoint_store::{
//!     BlockingCheckpointSaver, Checkpoint, CheckpointConfig, CheckpointMetadata,
//!     InMemoryCheckpointSaver, MetadataFilter,
//! };
//! use serde_json::json;
//!
//! let saver = InMemoryCheckpointSaver::new();
//! let config = CheckpointConfig::new("thread-1");
//! let metadata = CheckpointMetadata::new().with_extra("source", json!("input"));
//!
//! let saved = saver.blocking_put(&config, Checkpoint::empty(), metadata)?;
//! assert!(saved.checkpoint_id.is_some());
//!
//! let filter = MetadataFilter::new().eq("source", json!("input"));
//! let found: Vec<_> = saver
//!     .blocking_list(None, Some(&filter), None, None)?
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(found.len(), 1);
//! # Ok::<(), checkpoint_store::CheckpointError>(())
//! ```

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    error::Result,
    filter::MetadataFilter,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Type alias for async stream of checkpoint tuples
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send + 'static>>;

/// Type alias for a lazy, single-pass iterator of checkpoint tuples
pub type CheckpointIter = Box<dyn Iterator<Item = Result<CheckpointTuple>> + Send + 'static>;

/// Synchronous checkpoint storage
///
/// Implementations must be safe to call from many threads at once without
/// external synchronization.
pub trait BlockingCheckpointSaver: Send + Sync {
    /// Fetch only the checkpoint addressed by `config`
    fn blocking_get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        Ok(self.blocking_get_tuple(config)?.map(|tuple| tuple.checkpoint))
    }

    /// Fetch the tuple addressed by `config`, or the latest one in its thread
    fn blocking_get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// List stored tuples matching the given scope, filter and cursor
    fn blocking_list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<&MetadataFilter>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointIter>;

    /// Persist `checkpoint` as the successor of `config`
    fn blocking_put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig>;
}

/// Asynchronous checkpoint storage
///
/// Same contract as [`BlockingCheckpointSaver`]; for equal store state the two
/// must never return different results.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch only the checkpoint addressed by `config`
    async fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        Ok(self.get_tuple(config).await?.map(|tuple| tuple.checkpoint))
    }

    /// Fetch the tuple addressed by `config`, or the latest one in its thread
    ///
    /// Returns `Ok(None)` rather than an error when nothing matches.
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// Stream stored tuples matching the given scope, filter and cursor,
    /// newest first
    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<&MetadataFilter>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream>;

    /// Persist `checkpoint` as the successor of `config` and return the config
    /// addressing it
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig>;
}
