use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::AppState;
use crate::arena::{CompetitorDetail, CompetitorView};
use crate::domain::{CompetitorId, CompetitorUpdate, NewCompetitor};
use crate::error::AppError;

pub async fn list_competitors(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompetitorView>>, AppError> {
    Ok(Json(state.arena.competitors.list().await?))
}

pub async fn create_competitor(
    State(state): State<AppState>,
    Json(body): Json<NewCompetitor>,
) -> Result<(StatusCode, Json<CompetitorView>), AppError> {
    let competitor = state.arena.competitors.create(body).await?;
    Ok((StatusCode::CREATED, Json(competitor.into())))
}

pub async fn get_competitor(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CompetitorDetail>, AppError> {
    let detail = state.arena.competitors.get(&CompetitorId::new(id)).await?;
    Ok(Json(detail))
}

pub async fn update_competitor(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<CompetitorUpdate>,
) -> Result<Json<CompetitorView>, AppError> {
    let competitor = state
        .arena
        .competitors
        .update(&CompetitorId::new(id), body)
        .await?;
    Ok(Json(competitor.into()))
}

pub async fn delete_competitor(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if state
        .arena
        .competitors
        .delete(&CompetitorId::new(id.clone()))
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("competitor {}", id)))
    }
}
