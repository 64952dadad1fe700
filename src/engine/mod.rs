//! Pure computation for the rating and voting ledger. No I/O lives here.

pub mod achievements;
pub mod ledger;
pub mod pairing;
pub mod rating;
pub mod standings;

pub use achievements::{evaluate, EvaluationContext};
pub use ledger::{plan_undo, plan_vote, UndoInputs, UndoPlan, VotePlan};
pub use pairing::pick_random_pair;
pub use rating::{expected_score, influence_reward, rating_delta, tier_for_rating};
pub use standings::{apply_outcome, revert_outcome, Outcome};

/// Tunables for rating updates, undo and history bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerParams {
    pub k_factor: i64,
    pub rating_floor: i64,
    pub undo_window_ms: i64,
    pub history_limit: usize,
    pub starting_influence: i64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            k_factor: rating::DEFAULT_K_FACTOR,
            rating_floor: rating::DEFAULT_RATING_FLOOR,
            undo_window_ms: 5_000,
            history_limit: 50,
            starting_influence: 100,
        }
    }
}
