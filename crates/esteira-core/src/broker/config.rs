use serde::Deserialize;

/// Top-level broker configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub sweeper: SweeperConfig,
}

/// Listen addresses for the line protocol and the metrics endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub metrics_addr: String,
}

/// Per-partition queue settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Root directory for WAL files, laid out as
    /// `<data_dir>/<topic>/<partition>.wal.log`.
    pub data_dir: String,
    /// How long a dispatched message may stay unacknowledged before it is
    /// eligible for redelivery.
    pub visibility_timeout_ms: u64,
}

/// Orphan sweeper cadence, independent of the visibility timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            metrics_addr: "0.0.0.0:8081".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            visibility_timeout_ms: 10_000,
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval_ms: 2_000 }
    }
}
