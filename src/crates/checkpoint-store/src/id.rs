//! Time-ordered checkpoint identifiers
//!
//! A checkpoint id is a UUID-formatted string laid out as:
//!
//! ```text
//! ┌──────────────────────────────┬──────────┬──────────────────────┐
//! │  creation stamp (64 bits)    │ step (16)│   random (48 bits)   │
//! │  µs since epoch, strictly ↑  │          │                      │
//! └──────────────────────────────┴──────────┴──────────────────────┘
//! ```
//!
//! The stamp is strictly increasing across the whole process, so ids compare
//! lexicographically in creation order and "greatest id" means "latest".

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Checkpoint ID type
pub type CheckpointId = String;

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

const RANDOM_MASK: u64 = (1 << 48) - 1;

fn next_stamp() -> u64 {
    let now = Utc::now().timestamp_micros().max(0) as u64;
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

/// Generate a new checkpoint id for the given step.
///
/// Every call returns an id greater than all ids previously generated in
/// this process. The step is stored in 16 bits; steps outside the `i16` range
/// are clamped to its bounds.
pub fn next_checkpoint_id(step: i64) -> CheckpointId {
    let stamp = next_stamp();
    let step = step.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16;
    let low = ((step as u16 as u64) << 48) | (rand::random::<u64>() & RANDOM_MASK);
    Uuid::from_u64_pair(stamp, low).to_string()
}

/// Decode the creation time embedded in a checkpoint id.
///
/// Returns `None` for ids that were not produced by [`next_checkpoint_id`].
pub fn checkpoint_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let uuid = Uuid::parse_str(id).ok()?;
    let (stamp, _) = uuid.as_u64_pair();
    let micros = i64::try_from(stamp).ok()?;
    DateTime::from_timestamp(micros.div_euclid(1_000_000), (micros.rem_euclid(1_000_000) * 1_000) as u32)
}

/// Decode the step embedded in a checkpoint id.
///
/// Steps beyond the `i16` range saturate at `i16::MIN` or `i16::MAX`; the
/// checkpoint's metadata is the authoritative record of its step.
pub fn checkpoint_step(id: &str) -> Option<i64> {
    let uuid = Uuid::parse_str(id).ok()?;
    let (_, low) = uuid.as_u64_pair();
    Some(i64::from((low >> 48) as u16 as i16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_sort_in_creation_order() {
        let ids: Vec<_> = (0..1_000).map(|i| next_checkpoint_id(i % 7)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn test_ids_monotonic_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| (0..250).map(|_| next_checkpoint_id(0)).collect::<Vec<_>>())
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            all.extend(ids);
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 1_000);
    }

    #[test]
    fn test_step_and_timestamp_round_trip() {
        let before = Utc::now();
        let id = next_checkpoint_id(-1);
        assert_eq!(checkpoint_step(&id), Some(-1));

        let ts = checkpoint_timestamp(&id).unwrap();
        assert!(ts >= before - chrono::Duration::seconds(1));
        assert!(ts <= Utc::now() + chrono::Duration::seconds(1));

        assert_eq!(checkpoint_step(&next_checkpoint_id(42)), Some(42));
    }

    #[test]
    fn test_out_of_range_steps_saturate() {
        assert_eq!(checkpoint_step(&next_checkpoint_id(32_767)), Some(32_767));
        assert_eq!(checkpoint_step(&next_checkpoint_id(-32_768)), Some(-32_768));
        assert_eq!(checkpoint_step(&next_checkpoint_id(65_537)), Some(i64::from(i16::MAX)));
        assert_eq!(checkpoint_step(&next_checkpoint_id(-40_000)), Some(i64::from(i16::MIN)));
    }

    #[test]
    fn test_foreign_ids_decode_to_none() {
        assert!(checkpoint_timestamp("not-a-uuid").is_none());
        assert!(checkpoint_step("1").is_none());
    }
}
