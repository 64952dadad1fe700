use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::AppState;
use crate::domain::{CastOutcome, CompetitorId, MatchupId, VoteId, VoteRecord, VoterId};
use crate::error::AppError;

const DEFAULT_RECENT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub matchup_id: String,
    pub winner_id: String,
    pub voter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::BadRequest(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// 201 with the recorded vote, or 409 when this voter already voted on the matchup.
pub async fn cast_vote(
    State(state): State<AppState>,
    Json(body): Json<CastVoteRequest>,
) -> Result<Response, AppError> {
    let matchup_id = MatchupId::new(required("matchupId", &body.matchup_id)?);
    let winner_id = CompetitorId::new(required("winnerId", &body.winner_id)?);
    let voter_id = VoterId::new(required("voterId", &body.voter_id)?);

    let outcome = state
        .arena
        .votes
        .record(&matchup_id, &winner_id, &voter_id)
        .await?;

    Ok(match outcome {
        CastOutcome::Recorded(vote) => (StatusCode::CREATED, Json(vote)).into_response(),
        CastOutcome::Rejected(reason) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": reason.to_string(),
                "rejection": reason,
            })),
        )
            .into_response(),
    })
}

pub async fn undo_vote(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let undone = state.arena.votes.undo(&VoteId::new(id)).await?;
    Ok(Json(json!({ "undone": undone })))
}

pub async fn recent_votes(
    Query(params): Query<RecentQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<VoteRecord>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    if limit < 0 {
        return Err(AppError::BadRequest("limit must be >= 0".to_string()));
    }
    Ok(Json(state.arena.votes.recent(limit).await?))
}
