//! Serialization protocol for stored checkpoints
//!
//! Backends persist checkpoints and metadata as bytes and decode them on every
//! read, so a stored entry can never be mutated through a returned value.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Protocol for serializing and deserializing checkpoint data
///
/// Implementations can provide custom encodings as long as every
/// `serde_json::Value` survives a round trip.
pub trait SerializerProtocol: Send + Sync {
    /// Serialize a value to bytes
    fn dumps<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes
    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// JSON-based serializer (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{ChannelVersion, Checkpoint, CheckpointMetadata, CheckpointSource};
    use crate::error::CheckpointError;
    use serde_json::json;

    #[test]
    fn test_checkpoint_survives_json() {
        let serializer = JsonSerializer::new();
        let mut checkpoint = Checkpoint::empty();
        checkpoint
            .channel_values
            .insert("messages".to_string(), json!([{"role": "user"}]));
        checkpoint
            .channel_versions
            .insert("messages".to_string(), ChannelVersion::String("007".to_string()));
        checkpoint
            .channel_versions
            .insert("count".to_string(), ChannelVersion::Float(2.5));

        let bytes = serializer.dumps(&checkpoint).unwrap();
        let restored: Checkpoint = serializer.loads(&bytes).unwrap();

        assert_eq!(restored, checkpoint);
    }

    #[test]
    fn test_metadata_is_a_plain_json_object() {
        let serializer = JsonSerializer::new();
        let metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Loop)
            .with_extra("score", json!(null));

        let bytes = serializer.dumps(&metadata).unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(),
            json!({"source": "loop", "score": null})
        );
        let restored: CheckpointMetadata = serializer.loads(&bytes).unwrap();
        assert_eq!(restored, metadata);
    }

    #[test]
    fn test_corrupt_bytes_are_serialization_errors() {
        let err = JsonSerializer::new()
            .loads::<Checkpoint>(b"{not json")
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Serialization(_)));
    }
}
