use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let db_ok = state.store.ping().await;

    let status = if db_ok { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "database": db_ok,
        "aiEnabled": state.resolver.has_model(),
        "timestamp": chrono::Utc::now(),
    }))
}
