//! Core checkpoint data structures for state persistence and time-travel
//!
//! This module defines the value types that flow through the store: **[`Checkpoint`]**,
//! **[`CheckpointConfig`]**, **[`CheckpointMetadata`]**, and **[`CheckpointTuple`]**.
//!
//! # Overview
//!
//! - **State Snapshots** - A [`Checkpoint`] is an immutable capture of all channel values
//! - **Version Tracking** - Per-channel [`ChannelVersion`] counters advanced on every write
//! - **Open Metadata** - Caller-defined [`CheckpointMetadata`], queryable by exact match
//! - **Thread Isolation** - [`CheckpointConfig`] addresses one lineage by `thread_id`
//! - **Serializable** - All types support JSON serialization via serde
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CheckpointTuple                                             │
//! │  ┌────────────────────────────────────────┐                 │
//! │  │  CheckpointConfig                      │                 │
//! │  │  • thread_id: "user-123"               │                 │
//! │  │  • checkpoint_id: "0006…-ffff-…"       │                 │
//! │  └────────────────────────────────────────┘                 │
//! │  ┌────────────────────────────────────────┐                 │
//! │  │  Checkpoint                            │                 │
//! │  │  • channel_values: {"messages": [...]} │                 │
//! │  │  • channel_versions: {"messages": 5}   │                 │
//! │  │  • versions_seen: {"node_a": {...}}    │                 │
//! │  └────────────────────────────────────────┘                 │
//! │  ┌────────────────────────────────────────┐                 │
//! │  │  CheckpointMetadata                    │                 │
//! │  │  • source: "loop"                      │                 │
//! │  │  • step: 5                             │                 │
//! │  │  • writes: {"node_a": {...}}           │                 │
//! │  │  • <any other caller key>              │                 │
//! │  └────────────────────────────────────────┘                 │
//! │  parent_config: Some(CheckpointConfig) | None (root)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use checkpoint_store::{CheckpointConfig, CheckpointMetadata, CheckpointSource};
//! use serde_json::json;
//!
//! let config = CheckpointConfig::new("user-session-123");
//! assert!(config.checkpoint_id.is_none());
//!
//! let metadata = CheckpointMetadata::new()
//!     .with_source(CheckpointSource::Loop)
//!     .with_step(5)
//!     .with_extra("user_action", json!("approved"));
//!
//! assert_eq!(metadata.source(), Some(CheckpointSource::Loop));
//! assert_eq!(metadata.step(), Some(5));
//! ```
//!
//! # Channel Versions
//!
//! A channel's version is advanced by [`increment`] every time the channel is written.
//! Along a lineage chain the version of any channel never decreases:
//!
//! ```text
//! parent: channel_versions["messages"] = Int(5)
//!   → step writes "messages"
//! child:  channel_versions["messages"] = Int(6)
//! ```

use crate::error::{CheckpointError, Result};
use crate::id::{self, CheckpointId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Channel version marker - can be int, float, or string
///
/// Versions only compare within the same variant; comparing across variants
/// yields `None` from [`PartialOrd::partial_cmp`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChannelVersion {
    /// Sequential integer version (most common)
    Int(i64),
    /// Floating-point version
    Float(f64),
    /// String-encoded decimal version, e.g. `"00042"`
    String(String),
}

impl PartialOrd for ChannelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (ChannelVersion::Int(a), ChannelVersion::Int(b)) => a.partial_cmp(b),
            (ChannelVersion::Float(a), ChannelVersion::Float(b)) => a.partial_cmp(b),
            (ChannelVersion::String(a), ChannelVersion::String(b)) => {
                // Equal-width decimal strings order numerically; fall back to length first.
                Some(a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            }
            _ => None,
        }
    }
}

impl ChannelVersion {
    /// Returns false for NaN or infinite float versions, which have no JSON form
    pub fn is_finite(&self) -> bool {
        match self {
            ChannelVersion::Float(v) => v.is_finite(),
            _ => true,
        }
    }
}

/// Mapping from channel name to version
pub type ChannelVersions = HashMap<String, ChannelVersion>;

/// Advance a channel version by one unit.
///
/// - `None` (channel never written) → `Int(1)`
/// - `Int(n)` → `Int(n + 1)`
/// - `Float(f)` → `Float(f + 1.0)`
/// - `String(s)` holding a decimal integer → the next integer, zero-padded to the width of `s`
///
/// Anything else cannot be versioned and is reported as [`CheckpointError::Lineage`].
pub fn increment(current: Option<&ChannelVersion>) -> Result<ChannelVersion> {
    match current {
        None => Ok(ChannelVersion::Int(1)),
        Some(ChannelVersion::Int(v)) => v
            .checked_add(1)
            .map(ChannelVersion::Int)
            .ok_or_else(|| CheckpointError::Lineage(format!("version {} overflows", v))),
        Some(ChannelVersion::Float(v)) => {
            let next = v + 1.0;
            if next.is_finite() && next > *v {
                Ok(ChannelVersion::Float(next))
            } else {
                Err(CheckpointError::Lineage(format!(
                    "float version {} cannot be advanced",
                    v
                )))
            }
        }
        Some(ChannelVersion::String(s)) => {
            let parsed = if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<u64>().ok()
            } else {
                None
            };
            let num = parsed.ok_or_else(|| {
                CheckpointError::Lineage(format!("string version {:?} is not a decimal counter", s))
            })?;
            let next = num
                .checked_add(1)
                .ok_or_else(|| CheckpointError::Lineage(format!("version {} overflows", s)))?;
            Ok(ChannelVersion::String(format!("{:0width$}", next, width = s.len())))
        }
    }
}

/// Origin of a checkpoint, stored under the conventional `source` metadata key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Checkpoint created from an input to invoke/stream/batch
    Input,
    /// Checkpoint created from inside the execution loop
    Loop,
    /// Checkpoint created from a manual state update
    Update,
    /// Checkpoint created as a copy of another checkpoint
    Fork,
}

/// Caller-defined metadata attached to a checkpoint at save time.
///
/// An open mapping from string keys to JSON values. The store enforces no keys;
/// `source`, `step` and `writes` are conventions with typed helpers.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct CheckpointMetadata(Map<String, Value>);

impl CheckpointMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `source` key
    pub fn with_source(self, source: CheckpointSource) -> Self {
        let value = match source {
            CheckpointSource::Input => "input",
            CheckpointSource::Loop => "loop",
            CheckpointSource::Update => "update",
            CheckpointSource::Fork => "fork",
        };
        self.with_extra("source", Value::from(value))
    }

    /// Set the `step` key
    /// -1 for the first "input" checkpoint, 0 for the first "loop" checkpoint
    pub fn with_step(self, step: i64) -> Self {
        self.with_extra("step", Value::from(step))
    }

    /// Set the `writes` key
    pub fn with_writes(self, writes: Value) -> Self {
        self.with_extra("writes", writes)
    }

    /// Set an arbitrary key
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `source` key, if present and one of the known sources
    pub fn source(&self) -> Option<CheckpointSource> {
        self.0
            .get("source")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The `step` key, if present and an integer
    pub fn step(&self) -> Option<i64> {
        self.0.get("step").and_then(Value::as_i64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for CheckpointMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for CheckpointMetadata {
    type Error = CheckpointError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CheckpointError::Invalid(format!(
                "metadata must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// State snapshot at a given point in time
///
/// Immutable once persisted: any change produces a new checkpoint with a new id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// The version of the checkpoint format (currently 1)
    pub v: i32,

    /// The ID of the checkpoint (unique and monotonically increasing)
    pub id: CheckpointId,

    /// The values of the channels at the time of the checkpoint
    pub channel_values: HashMap<String, Value>,

    /// The versions of the channels at the time of the checkpoint
    pub channel_versions: ChannelVersions,

    /// Map from task identity to map from channel name to version seen.
    /// Owned by the execution engine; the store only copies it.
    pub versions_seen: HashMap<String, ChannelVersions>,
}

impl Checkpoint {
    /// Current checkpoint format version
    pub const CURRENT_VERSION: i32 = 1;

    /// Step used when minting the id of a root checkpoint
    pub const ROOT_STEP: i64 = -1;

    /// Create a new checkpoint
    pub fn new(
        id: CheckpointId,
        channel_values: HashMap<String, Value>,
        channel_versions: ChannelVersions,
        versions_seen: HashMap<String, ChannelVersions>,
    ) -> Self {
        Self {
            v: Self::CURRENT_VERSION,
            id,
            channel_values,
            channel_versions,
            versions_seen,
        }
    }

    /// Create the empty root checkpoint, the ancestor of every new thread
    pub fn empty() -> Self {
        Self::new(
            id::next_checkpoint_id(Self::ROOT_STEP),
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
        )
    }

    /// Creation time encoded in the id
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        id::checkpoint_timestamp(&self.id)
    }

    /// Name of the first channel holding a non-finite version, in
    /// `channel_versions` or any `versions_seen` entry
    pub fn non_finite_version(&self) -> Option<&str> {
        self.channel_versions
            .iter()
            .chain(self.versions_seen.values().flatten())
            .find(|(_, version)| !version.is_finite())
            .map(|(channel, _)| channel.as_str())
    }
}

/// Identity of one thread of execution, optionally pinned to one checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CheckpointConfig {
    /// Thread ID for grouping related checkpoints
    pub thread_id: String,

    /// Specific checkpoint ID; `None` addresses the latest checkpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,
}

impl CheckpointConfig {
    /// Address the latest checkpoint of a thread
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_id: None,
        }
    }

    /// Pin the config to a specific checkpoint
    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<CheckpointId>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }
}

/// A tuple containing a checkpoint and its associated data
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointTuple {
    /// Config addressing exactly this checkpoint
    pub config: CheckpointConfig,

    /// The checkpoint itself
    pub checkpoint: Checkpoint,

    /// Metadata associated with the checkpoint
    pub metadata: CheckpointMetadata,

    /// Config of the checkpoint this one extended; `None` for a root.
    /// The parent is not required to still exist.
    pub parent_config: Option<CheckpointConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_creation() {
        let checkpoint = Checkpoint::empty();
        assert_eq!(checkpoint.v, Checkpoint::CURRENT_VERSION);
        assert!(checkpoint.channel_values.is_empty());
        assert!(checkpoint.channel_versions.is_empty());
        assert!(checkpoint.versions_seen.is_empty());
        assert!(checkpoint.created_at().is_some());
    }

    #[test]
    fn test_empty_checkpoints_get_distinct_ids() {
        let a = Checkpoint::empty();
        let b = Checkpoint::empty();
        assert!(a.id < b.id);
        assert_ne!(a, b);
    }

    #[test]
    fn test_channel_version_increment() {
        assert_eq!(increment(None).unwrap(), ChannelVersion::Int(1));
        assert_eq!(
            increment(Some(&ChannelVersion::Int(1))).unwrap(),
            ChannelVersion::Int(2)
        );
        assert_eq!(
            increment(Some(&ChannelVersion::Float(1.0))).unwrap(),
            ChannelVersion::Float(2.0)
        );
        assert_eq!(
            increment(Some(&ChannelVersion::String("0009".to_string()))).unwrap(),
            ChannelVersion::String("0010".to_string())
        );
        assert_eq!(
            increment(Some(&ChannelVersion::String("99".to_string()))).unwrap(),
            ChannelVersion::String("100".to_string())
        );
    }

    #[test]
    fn test_channel_version_increment_rejects_malformed() {
        let err = increment(Some(&ChannelVersion::String("v1.0".to_string()))).unwrap_err();
        assert!(matches!(err, CheckpointError::Lineage(_)));

        assert!(increment(Some(&ChannelVersion::Int(i64::MAX))).is_err());
        assert!(increment(Some(&ChannelVersion::Float(f64::NAN))).is_err());
        assert!(increment(Some(&ChannelVersion::Float(f64::INFINITY))).is_err());
    }

    #[test]
    fn test_channel_version_ordering() {
        assert!(ChannelVersion::Int(1) < ChannelVersion::Int(2));
        assert!(ChannelVersion::String("9".into()) < ChannelVersion::String("10".into()));
        assert_eq!(
            ChannelVersion::Int(1).partial_cmp(&ChannelVersion::String("1".into())),
            None
        );
    }

    #[test]
    fn test_checkpoint_metadata() {
        let metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Input)
            .with_step(-1)
            .with_writes(json!({}))
            .with_extra("key", json!("value"));

        assert_eq!(metadata.source(), Some(CheckpointSource::Input));
        assert_eq!(metadata.step(), Some(-1));
        assert_eq!(metadata.get("key"), Some(&json!("value")));
        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({"source": "input", "step": -1, "writes": {}, "key": "value"})
        );
    }

    #[test]
    fn test_metadata_from_non_object_is_invalid() {
        assert!(CheckpointMetadata::try_from(json!([1, 2])).is_err());
        let metadata = CheckpointMetadata::try_from(json!({"score": null})).unwrap();
        assert_eq!(metadata.get("score"), Some(&Value::Null));
        assert_eq!(metadata.source(), None);
    }

    #[test]
    fn test_checkpoint_config() {
        let config = CheckpointConfig::new("thread-1").with_checkpoint_id("checkpoint-1");

        assert_eq!(config.thread_id, "thread-1");
        assert_eq!(config.checkpoint_id.as_deref(), Some("checkpoint-1"));
        assert_eq!(
            serde_json::to_value(CheckpointConfig::new("thread-1")).unwrap(),
            json!({"thread_id": "thread-1"})
        );
    }
}
