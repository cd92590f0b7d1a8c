//! Checkpoint lineage: deriving a child checkpoint from its parent
//!
//! [`create_checkpoint`] is the only place a lineage advances. It is a pure
//! function of its inputs apart from the freshly minted id.
//!
//! ```text
//! parent                         pending_writes          child
//! ┌──────────────────────┐      ┌───────────────┐      ┌──────────────────────┐
//! │ values:  a=1, b=2    │  +   │ b = 20        │  →   │ values:  a=1, b=20   │
//! │ versions: a=3, b=7   │      │ c = "x"       │      │          c="x"       │
//! └──────────────────────┘      └───────────────┘      │ versions: a=3, b=8,  │
//!                                                      │           c=1        │
//!                                                      └──────────────────────┘
//! ```

use crate::checkpoint::{increment, Checkpoint};
use crate::error::{CheckpointError, Result};
use crate::id::next_checkpoint_id;
use serde_json::Value;
use std::collections::HashMap;

/// Derive the next checkpoint from `parent` plus the writes produced during `step`.
///
/// - `channel_values`: the parent's values overridden by every key in `pending_writes`
/// - `channel_versions`: every written channel advanced by one unit, all others copied
/// - `versions_seen`: copied unchanged; the execution engine updates it itself
///
/// `step` only feeds id generation. With no pending writes the child differs
/// from the parent in its `id` alone.
///
/// # Errors
///
/// [`CheckpointError::Lineage`] when a written channel cannot be versioned:
/// an empty channel name, or a parent version that cannot be advanced.
///
/// # Example
///
/// ```rust
/// use checkpoint_store::{create_checkpoint, ChannelVersion, Checkpoint};
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let root = Checkpoint::empty();
/// let writes = HashMap::from([("messages".to_string(), json!(["hi"]))]);
///
/// let child = create_checkpoint(&root, &writes, 0).unwrap();
/// assert_eq!(child.channel_values["messages"], json!(["hi"]));
/// assert_eq!(child.channel_versions["messages"], ChannelVersion::Int(1));
/// assert!(child.id > root.id);
/// ```
pub fn create_checkpoint(
    parent: &Checkpoint,
    pending_writes: &HashMap<String, Value>,
    step: i64,
) -> Result<Checkpoint> {
    let mut channel_values = parent.channel_values.clone();
    let mut channel_versions = parent.channel_versions.clone();

    for (channel, value) in pending_writes {
        if channel.is_empty() {
            return Err(CheckpointError::Lineage(
                "cannot version a write to an unnamed channel".to_string(),
            ));
        }

        let next = increment(parent.channel_versions.get(channel)).map_err(|e| match e {
            CheckpointError::Lineage(msg) => {
                CheckpointError::Lineage(format!("channel {:?}: {}", channel, msg))
            }
            other => other,
        })?;
        channel_versions.insert(channel.clone(), next);
        channel_values.insert(channel.clone(), value.clone());
    }

    tracing::trace!(
        parent_id = %parent.id,
        step,
        writes = pending_writes.len(),
        "Derived checkpoint"
    );

    Ok(Checkpoint::new(
        next_checkpoint_id(step),
        channel_values,
        channel_versions,
        parent.versions_seen.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::ChannelVersion;
    use proptest::prelude::*;
    use serde_json::json;

    fn writes(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_writes_only_change_id() {
        let root = Checkpoint::empty();
        let child = create_checkpoint(&root, &HashMap::new(), 1).unwrap();

        assert_ne!(child.id, root.id);
        assert_eq!(child.channel_values, root.channel_values);
        assert_eq!(child.channel_versions, root.channel_versions);
        assert_eq!(child.versions_seen, root.versions_seen);

        let relabelled = Checkpoint {
            id: root.id.clone(),
            ..child
        };
        assert_eq!(relabelled, root);
    }

    #[test]
    fn test_writes_override_values_and_advance_versions() {
        let first = create_checkpoint(
            &Checkpoint::empty(),
            &writes(&[("a", json!(1)), ("b", json!(2))]),
            0,
        )
        .unwrap();
        let second = create_checkpoint(&first, &writes(&[("b", json!(20)), ("c", json!("x"))]), 1)
            .unwrap();

        assert_eq!(second.channel_values["a"], json!(1));
        assert_eq!(second.channel_values["b"], json!(20));
        assert_eq!(second.channel_values["c"], json!("x"));

        assert_eq!(second.channel_versions["a"], ChannelVersion::Int(1));
        assert_eq!(second.channel_versions["b"], ChannelVersion::Int(2));
        assert_eq!(second.channel_versions["c"], ChannelVersion::Int(1));
        assert!(second.id > first.id);
    }

    #[test]
    fn test_versions_seen_copied_unchanged() {
        let mut parent = Checkpoint::empty();
        parent.versions_seen.insert(
            "node_a".to_string(),
            HashMap::from([("a".to_string(), ChannelVersion::Int(3))]),
        );

        let child = create_checkpoint(&parent, &writes(&[("a", json!(true))]), 2).unwrap();
        assert_eq!(child.versions_seen, parent.versions_seen);
    }

    #[test]
    fn test_same_inputs_differ_only_in_id() {
        let parent = create_checkpoint(&Checkpoint::empty(), &writes(&[("a", json!(1))]), 0)
            .unwrap();
        let w = writes(&[("a", json!(2)), ("b", json!(null))]);

        let x = create_checkpoint(&parent, &w, 1).unwrap();
        let y = create_checkpoint(&parent, &w, 1).unwrap();
        assert_ne!(x.id, y.id);
        assert_eq!(Checkpoint { id: y.id.clone(), ..x }, y);
    }

    #[test]
    fn test_unnamed_channel_is_lineage_error() {
        let err = create_checkpoint(&Checkpoint::empty(), &writes(&[("", json!(1))]), 0)
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Lineage(_)));
    }

    #[test]
    fn test_malformed_parent_version_is_lineage_error() {
        let mut parent = Checkpoint::empty();
        parent
            .channel_versions
            .insert("a".to_string(), ChannelVersion::String("v-two".to_string()));

        let err = create_checkpoint(&parent, &writes(&[("a", json!(1))]), 0).unwrap_err();
        assert!(err.to_string().contains("\"a\""));

        // Untouched malformed channels are copied, not rejected
        let child = create_checkpoint(&parent, &writes(&[("b", json!(1))]), 0).unwrap();
        assert_eq!(
            child.channel_versions["a"],
            ChannelVersion::String("v-two".to_string())
        );
    }

    proptest! {
        #[test]
        fn prop_lineage_is_monotonic(
            steps in prop::collection::vec(
                prop::collection::hash_map("[a-d]", any::<i32>(), 0..4),
                1..8,
            )
        ) {
            let mut parent = Checkpoint::empty();
            for (step, raw) in steps.into_iter().enumerate() {
                let pending: HashMap<String, Value> =
                    raw.into_iter().map(|(k, v)| (k, json!(v))).collect();
                let child = create_checkpoint(&parent, &pending, step as i64).unwrap();

                for (channel, version) in &child.channel_versions {
                    match parent.channel_versions.get(channel) {
                        Some(old) if pending.contains_key(channel) => prop_assert!(version > old),
                        Some(old) => prop_assert_eq!(version, old),
                        None => prop_assert!(pending.contains_key(channel)),
                    }
                }
                for channel in pending.keys() {
                    prop_assert_eq!(&child.channel_values[channel], &pending[channel]);
                }
                prop_assert!(child.id > parent.id);
                parent = child;
            }
        }
    }
}
