use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use esteira_core::{Metrics, MetricsSnapshot};
use tracing::info;

/// Serve `GET /metrics`: a JSON snapshot of queue depths and the live
/// connection count.
pub async fn serve(addr: &str, metrics: Arc<Metrics>) -> std::io::Result<()> {
    let app = router(metrics);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "metrics server listening");
    axum::serve(listener, app).await
}

fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(snapshot))
        .with_state(metrics)
}

async fn snapshot(State(metrics): State<Arc<Metrics>>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_handler_serves_the_wire_shape() {
        let metrics = Arc::new(Metrics::new());
        metrics.set_queue_depth("t-0", 4);
        metrics.inc_active_connections();

        let Json(body) = snapshot(State(metrics)).await;
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"queues": {"t-0": 4}, "active_connections": 1})
        );
    }
}
