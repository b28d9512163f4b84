use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;

/// Shown in place of the model list when listing itself fails.
const MODEL_LIST_UNAVAILABLE: &str = "Unable to fetch model list";

/// GET /test-gemini: send a fixed prompt to the provider and report the
/// outcome. Always 200; failures are described in the body.
pub async fn probe_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let runtime = state.coach.runtime();

    match runtime.probe().await {
        Ok(resp) => Json(json!({
            "status": "success",
            "message": format!("Successfully connected using: {}", runtime.model()),
            "response": resp.content,
        })),
        Err(e) => {
            warn!(error = %e, "provider probe failed");
            let models = runtime.list_models().await.unwrap_or_else(|err| {
                warn!(error = %err, "model listing failed");
                vec![MODEL_LIST_UNAVAILABLE.to_string()]
            });
            Json(json!({
                "status": "error",
                "message": e.to_string(),
                "available_models": models,
            }))
        }
    }
}
