pub mod analytics;
pub mod competitors;
pub mod events;
pub mod health;
pub mod leaderboard;
pub mod matchups;
pub mod voters;
pub mod votes;
pub mod world;

use crate::arena::Arena;
use crate::config::Config;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub arena: Arena,
    pub config: Config,
}

impl AppState {
    pub fn new(arena: Arena, config: Config) -> Self {
        Self { arena, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/competitors",
            get(competitors::list_competitors).post(competitors::create_competitor),
        )
        .route(
            "/v1/competitors/:id",
            get(competitors::get_competitor)
                .patch(competitors::update_competitor)
                .delete(competitors::delete_competitor),
        )
        .route("/v1/matchups", post(matchups::create_matchup))
        .route("/v1/matchups/:id", get(matchups::get_matchup))
        .route("/v1/votes", post(votes::cast_vote))
        .route("/v1/votes/recent", get(votes::recent_votes))
        .route("/v1/votes/:id/undo", post(votes::undo_vote))
        .route(
            "/v1/voters/:id",
            get(voters::get_voter).patch(voters::update_voter),
        )
        .route("/v1/voters/:id/votes", get(voters::get_voter_votes))
        .route(
            "/v1/voters/:id/achievements",
            post(voters::claim_achievements),
        )
        .route("/v1/achievements", get(voters::list_achievements))
        .route("/v1/leaderboard", get(leaderboard::get_leaderboard))
        .route("/v1/analytics", get(analytics::get_analytics))
        .route(
            "/v1/world",
            get(world::export_world).post(world::import_world),
        )
        .route("/v1/events", get(events::stream_events))
        .layer(cors)
        .with_state(state)
}
