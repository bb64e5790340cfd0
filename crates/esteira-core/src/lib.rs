pub mod broker;
pub mod clock;
pub mod error;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod telemetry;
pub mod wal;

pub use broker::{Broker, BrokerConfig, OrphanSweeper, Topic};
pub use clock::{Clock, SystemClock};
pub use error::{BrokerError, BrokerResult, QueueError, QueueResult, WalError};
pub use message::Message;
pub use metrics::{Metrics, MetricsSnapshot};
pub use queue::PartitionQueue;
pub use wal::Wal;
