use std::net::SocketAddr;
use std::sync::Arc;

use esteira_core::{Broker, Metrics, PartitionQueue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{self, Command};

/// Serve one client connection: read command lines, write reply lines, until
/// EOF or an I/O error. The connection count is maintained here so an early
/// error path can never leak it.
pub async fn handle(stream: TcpStream, peer: SocketAddr, broker: Arc<Broker>, metrics: Arc<Metrics>) {
    debug!(%peer, "connection opened");
    metrics.inc_active_connections();

    if let Err(e) = serve(stream, &broker).await {
        debug!(%peer, error = %e, "connection closed with error");
    }

    metrics.dec_active_connections();
    debug!(%peer, "connection closed");
}

async fn serve(stream: TcpStream, broker: &Arc<Broker>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = match protocol::parse(&line) {
            Ok(command) => execute(broker, command).await,
            Err(e) => format!("ERROR: {e}\n"),
        };
        writer.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

/// Run one command against the broker. Queue operations block on fsync, so
/// they run on the blocking pool rather than the reactor threads.
async fn execute(broker: &Arc<Broker>, command: Command) -> String {
    let broker = Arc::clone(broker);
    match command {
        Command::Produce {
            topic,
            partition,
            body,
        } => {
            run_blocking(move || {
                let queue = open_queue(&broker, &topic, partition)?;
                match queue.enqueue(body) {
                    Ok(_) => Ok("OK\n".to_string()),
                    Err(e) => Err(format!("Failed to produce message: {e}")),
                }
            })
            .await
        }
        Command::Consume { topic, partition } => {
            run_blocking(move || {
                let queue = open_queue(&broker, &topic, partition)?;
                Ok(match queue.dequeue() {
                    Some(msg) => {
                        format!("{} {}\n", msg.id, String::from_utf8_lossy(&msg.body))
                    }
                    None => "No messages in queue\n".to_string(),
                })
            })
            .await
        }
        Command::Ack {
            topic,
            partition,
            id,
        } => {
            run_blocking(move || {
                let queue = open_queue(&broker, &topic, partition)?;
                // An id that does not parse is simply unknown; ack is a no-op
                // either way.
                if let Ok(id) = Uuid::parse_str(&id) {
                    queue.ack(&id);
                }
                Ok("ACK_OK\n".to_string())
            })
            .await
        }
    }
}

fn open_queue(
    broker: &Broker,
    topic: &str,
    partition: u32,
) -> Result<Arc<PartitionQueue>, String> {
    broker
        .get_topic(topic)
        .get_partition(partition)
        .map_err(|e| format!("Failed to get partition {partition} for topic {topic}: {e}"))
}

/// Run `op` on the blocking pool, mapping failures to protocol error lines.
async fn run_blocking<F>(op: F) -> String
where
    F: FnOnce() -> Result<String, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(reason)) => format!("ERROR: {reason}\n"),
        Err(e) => {
            warn!(error = %e, "broker task failed");
            "ERROR: internal error\n".to_string()
        }
    }
}
