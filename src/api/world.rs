use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::api::AppState;
use crate::domain::WorldSnapshot;
use crate::error::AppError;

pub async fn export_world(State(state): State<AppState>) -> Result<Json<WorldSnapshot>, AppError> {
    Ok(Json(state.arena.export_world().await?))
}

/// Replace the world with the posted snapshot.
pub async fn import_world(
    State(state): State<AppState>,
    Json(snapshot): Json<WorldSnapshot>,
) -> Result<Json<serde_json::Value>, AppError> {
    let world_version = state.arena.import_world(snapshot).await?;
    Ok(Json(json!({ "worldVersion": world_version })))
}
