use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::jobs::task::queues;
use crate::state::AppState;

/// GET /health
/// Returns service status plus pending queue depths.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let mut depths = serde_json::Map::new();
    let mut status = "ok";

    for queue in queues::POLL_ORDER {
        match state.queue.depth(queue).await {
            Ok(depth) => {
                depths.insert(queue.to_string(), json!(depth));
            }
            Err(_) => {
                status = "degraded";
                depths.insert(queue.to_string(), Value::Null);
            }
        }
    }

    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "service": "vitae-api",
        "queues": depths
    }))
}
