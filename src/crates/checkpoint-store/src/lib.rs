//! # checkpoint-store - Versioned State Snapshots for Graph Execution
//!
//! **Checkpoint lineage and query engine** for long-running stateful computations such as
//! stepwise graph execution. Every step produces an immutable checkpoint derived from its
//! predecessor plus a set of channel writes; checkpoints are stored per execution thread
//! and can be retrieved by identity or queried by metadata.
//!
//! ## Overview
//!
//! - **Lineage** - [`create_checkpoint`] derives a child from a parent and advances the
//!   version of every written channel
//! - **Persistence** - [`CheckpointSaver::put`] stores a checkpoint with caller metadata,
//!   keyed by thread and checkpoint id
//! - **Lookup** - [`CheckpointSaver::get_tuple`] returns an exact checkpoint or the latest
//!   one in a thread
//! - **Query** - [`CheckpointSaver::list`] filters by exact-match metadata, newest first,
//!   with `before`/`limit` pagination
//! - **Two call styles** - every operation is available as `async` ([`CheckpointSaver`])
//!   and blocking ([`BlockingCheckpointSaver`]) with identical results
//!
//! ## Core Concepts
//!
//! ### 1. Checkpoint
//!
//! A [`Checkpoint`] holds channel values, per-channel [`ChannelVersion`]s and the
//! `versions_seen` bookkeeping of the execution engine. [`Checkpoint::empty`] is the
//! root of every new thread. Ids are time-ordered (see [`id`]), so the greatest id in
//! a thread is its latest checkpoint.
//!
//! ### 2. Identity
//!
//! A [`CheckpointConfig`] addresses one thread (`thread_id`) and optionally one
//! checkpoint in it (`checkpoint_id`). `put` returns the config of the stored
//! checkpoint; passing that config to the next `put` records it as the parent.
//!
//! ### 3. Metadata and Filters
//!
//! [`CheckpointMetadata`] is an open JSON mapping attached at save time. A
//! [`MetadataFilter`] selects checkpoints whose metadata deep-equals every key it names.
//!
//! ### 4. Backends
//!
//! [`InMemoryCheckpointSaver`] is the reference backend. Durable backends implement
//! [`CheckpointSaver`] (and optionally [`BlockingCheckpointSaver`]) and must keep `put`
//! atomic and `list` snapshot-consistent.
//!
//! ## Quick Start
//!
//! ```rust
//! use checkpoint_store::{
//!     create_checkpoint, Checkpoint, CheckpointConfig, CheckpointMetadata,
//!     CheckpointSaver, CheckpointSource, InMemoryCheckpointSaver, MetadataFilter,
//! };
//! use futures::TryStreamExt;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let saver = InMemoryCheckpointSaver::new();
//!
//!     // Root checkpoint for a new thread
//!     let root = Checkpoint::empty();
//!     let config = saver
//!         .put(
//!             &CheckpointConfig::new("thread-1"),
//!             root.clone(),
//!             CheckpointMetadata::new().with_source(CheckpointSource::Input).with_step(-1),
//!         )
//!         .await?;
//!
//!     // One step of execution
//!     let writes = HashMap::from([("foo".to_string(), json!("bar"))]);
//!     let next = create_checkpoint(&root, &writes, 0)?;
//!     saver
//!         .put(
//!             &config,
//!             next,
//!             CheckpointMetadata::new()
//!                 .with_source(CheckpointSource::Loop)
//!                 .with_step(0)
//!                 .with_writes(json!({"foo": "bar"})),
//!         )
//!         .await?;
//!
//!     // Query history
//!     let filter = MetadataFilter::new().eq("source", json!("loop"));
//!     let loops: Vec<_> = saver
//!         .list(None, Some(&filter), None, None)
//!         .await?
//!         .try_collect()
//!         .await?;
//!     assert_eq!(loops.len(), 1);
//!     assert_eq!(loops[0].parent_config, Some(config));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`checkpoint`] - [`Checkpoint`], [`CheckpointConfig`], [`CheckpointMetadata`], [`CheckpointTuple`]
//! - [`builder`] - [`create_checkpoint`]
//! - [`filter`] - [`MetadataFilter`]
//! - [`traits`] - [`CheckpointSaver`], [`BlockingCheckpointSaver`]
//! - [`memory`] - [`InMemoryCheckpointSaver`]
//! - [`config`] - [`SaverConfig`]
//! - [`serializer`] - [`SerializerProtocol`], [`JsonSerializer`]
//! - [`id`] - time-ordered checkpoint ids
//! - [`error`] - [`CheckpointError`]

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod filter;
pub mod id;
pub mod memory;
pub mod serializer;
pub mod traits;

// Re-export main types
pub use builder::create_checkpoint;
pub use checkpoint::{
    increment, ChannelVersion, ChannelVersions, Checkpoint, CheckpointConfig,
    CheckpointMetadata, CheckpointSource, CheckpointTuple,
};
pub use config::SaverConfig;
pub use error::{CheckpointError, Result};
pub use filter::MetadataFilter;
pub use id::CheckpointId;
pub use memory::{InMemoryCheckpointSaver, ListIter};
pub use serializer::{JsonSerializer, SerializerProtocol};
pub use traits::{BlockingCheckpointSaver, CheckpointIter, CheckpointSaver, CheckpointStream};
