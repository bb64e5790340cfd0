mod connection;
mod http;
mod protocol;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use esteira_core::{Broker, BrokerConfig, Metrics, OrphanSweeper, SystemClock};
use tokio::net::TcpListener;
use tracing::{info, warn};

fn load_config() -> BrokerConfig {
    let paths = ["esteira.toml", "/etc/esteira/esteira.toml"];

    for path in &paths {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        info!(path, "loaded configuration");
                        return config;
                    }
                    Err(e) => {
                        eprintln!("error parsing {path}: {e}");
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("error reading {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    info!("no config file found, using defaults");
    BrokerConfig::default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    esteira_core::telemetry::init_tracing();

    let config = load_config();
    let data_dir =
        std::env::var("ESTEIRA_DATA_DIR").unwrap_or_else(|_| config.queue.data_dir.clone());

    let metrics = Arc::new(Metrics::new());
    let broker = Arc::new(Broker::new(
        data_dir,
        Duration::from_millis(config.queue.visibility_timeout_ms),
        Arc::clone(&metrics),
        Arc::new(SystemClock),
    ));

    let sweeper = OrphanSweeper::spawn(
        Arc::clone(&broker),
        Duration::from_millis(config.sweeper.interval_ms),
    )?;

    let metrics_addr = config.server.metrics_addr.clone();
    let metrics_handle = Arc::clone(&metrics);
    tokio::spawn(async move {
        if let Err(e) = http::serve(&metrics_addr, metrics_handle).await {
            warn!(error = %e, "metrics server exited");
        }
    });

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "broker listening");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(connection::handle(
                            stream,
                            peer,
                            Arc::clone(&broker),
                            Arc::clone(&metrics),
                        ));
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    info!("shutting down");
    sweeper.shutdown();
    broker.close();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to install CTRL+C handler");
    }

    info!("received shutdown signal");
}
