use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::arena::LeaderboardEntry;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Competitors by rating, highest first.
pub async fn get_leaderboard(
    Query(params): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let mut entries = state.arena.competitors.leaderboard().await?;
    if let Some(limit) = params.limit {
        entries.truncate(limit);
    }
    Ok(Json(entries))
}
