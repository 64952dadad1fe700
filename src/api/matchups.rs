use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{CompetitorId, Matchup, MatchupId};
use crate::error::AppError;

/// Both ids for an explicit pairing, neither for a random one.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchupRequest {
    pub competitor_a_id: Option<String>,
    pub competitor_b_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<CompetitorId> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(CompetitorId::new)
}

pub async fn create_matchup(
    State(state): State<AppState>,
    body: Option<Json<CreateMatchupRequest>>,
) -> Result<(StatusCode, Json<Matchup>), AppError> {
    let Json(body) = body.unwrap_or_default();
    let matchup = state
        .arena
        .matchups
        .create(non_empty(body.competitor_a_id), non_empty(body.competitor_b_id))
        .await?;
    Ok((StatusCode::CREATED, Json(matchup)))
}

pub async fn get_matchup(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Matchup>, AppError> {
    Ok(Json(state.arena.matchups.get(&MatchupId::new(id)).await?))
}
