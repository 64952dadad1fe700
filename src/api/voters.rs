use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::arena::accounts::export_csv;
use crate::domain::{Achievement, VoterAccount, VoterAccountUpdate, VoterId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct VotesQuery {
    pub format: Option<String>,
}

pub async fn get_voter(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VoterAccount>, AppError> {
    Ok(Json(state.arena.accounts.get(&VoterId::new(id)).await?))
}

pub async fn update_voter(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<VoterAccountUpdate>,
) -> Result<Json<VoterAccount>, AppError> {
    let account = state
        .arena
        .accounts
        .update(&VoterId::new(id), body)
        .await?;
    Ok(Json(account))
}

/// The voter's votes oldest first, as JSON records or as a CSV export.
pub async fn get_voter_votes(
    Path(id): Path<String>,
    Query(params): Query<VotesQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let voter_id = VoterId::new(id);
    let format = params
        .format
        .as_deref()
        .map(|f| f.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "json".to_string());

    match format.as_str() {
        "json" => {
            let votes = state.arena.accounts.votes(&voter_id).await?;
            Ok(Json(votes).into_response())
        }
        "csv" => {
            let rows = state.arena.accounts.export_votes(&voter_id).await?;
            let body = export_csv(&rows)?;
            let disposition = format!("attachment; filename=\"votes-{}.csv\"", voter_id);
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        _ => Err(AppError::BadRequest(
            "format must be one of: json, csv".to_string(),
        )),
    }
}

pub async fn claim_achievements(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<&'static Achievement>>, AppError> {
    let unlocked = state
        .arena
        .accounts
        .claim_achievements(&VoterId::new(id))
        .await?;
    Ok(Json(unlocked))
}

pub async fn list_achievements(State(state): State<AppState>) -> Json<&'static [Achievement]> {
    Json(state.arena.accounts.catalog())
}
