/// Low-level write-ahead log errors. This is the error type for every `Wal`
/// operation — the log can only fail with infrastructure errors, never
/// domain errors.
#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The file ended inside a length prefix or a record body.
    #[error("truncated record: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    /// The record does not fit the 4-byte length prefix.
    #[error("record of {0} bytes exceeds the u32 length prefix")]
    RecordTooLarge(usize),
}

/// Errors from partition queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Wal(#[from] WalError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the topic and broker registries.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("failed to create partition directory {path}: {source}")]
    PartitionDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("failed to spawn sweeper thread: {0}")]
    SweeperSpawn(String),
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
