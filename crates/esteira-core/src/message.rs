use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Core message domain type. Created at enqueue, owned by exactly one
/// partition, destroyed on ack. The WAL stores the serialized form of this
/// struct; dispatch timestamps live in the queue's in-flight map and are
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub body: Vec<u8>,
}

impl Message {
    /// Build a message around `body` with a fresh UUIDv7 id.
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            id: Uuid::now_v7(),
            body,
        }
    }

    /// Serialize to the self-describing WAL record payload.
    pub fn to_record(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a WAL record payload.
    pub fn from_record(record: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(record)
    }
}
