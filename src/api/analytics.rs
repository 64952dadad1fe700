use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::db::Analytics;
use crate::error::AppError;

pub async fn get_analytics(State(state): State<AppState>) -> Result<Json<Analytics>, AppError> {
    Ok(Json(state.arena.analytics().await?))
}
