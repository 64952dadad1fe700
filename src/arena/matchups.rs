//! MatchupStore: creates and looks up matchups.

use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use crate::domain::{CompetitorId, Matchup, MatchupId};
use crate::engine::pick_random_pair;
use crate::error::LedgerError;

use super::events::ChangeKind;
use super::Shared;

#[derive(Clone)]
pub struct MatchupStore {
    shared: Shared,
    rng: Arc<Mutex<StdRng>>,
}

impl MatchupStore {
    pub(crate) fn new(shared: Shared, rng: StdRng) -> Self {
        Self {
            shared,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Create a matchup. With both ids given the pairing is explicit; with
    /// neither, two distinct competitors are drawn uniformly at random.
    ///
    /// Every call creates a new matchup, even for a pairing seen before.
    ///
    /// # Errors
    /// `InvalidPairing` for bad explicit ids or when only one id is given,
    /// `InsufficientCompetitors` when fewer than two competitors exist.
    pub async fn create(
        &self,
        a: Option<CompetitorId>,
        b: Option<CompetitorId>,
    ) -> Result<Matchup, LedgerError> {
        let now = self.shared.clock.now();
        let committed = match (a, b) {
            (Some(a), Some(b)) => {
                self.shared
                    .write("create_matchup", || {
                        self.shared.repo.create_matchup_between(&a, &b, now)
                    })
                    .await?
            }
            (None, None) => {
                let pick = |pool: &[CompetitorId]| {
                    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                    pick_random_pair(pool, &mut *rng)
                };
                self.shared
                    .write("create_matchup", || {
                        self.shared.repo.create_random_matchup(&pick, now)
                    })
                    .await?
            }
            _ => {
                return Err(LedgerError::InvalidPairing(
                    "give both competitor ids or neither".to_string(),
                ))
            }
        };

        let matchup = committed.value;
        info!(
            matchup = %matchup.id,
            a = %matchup.competitor_a_id,
            b = %matchup.competitor_b_id,
            "Matchup created"
        );
        self.shared.feed.publish(
            committed.world_version,
            ChangeKind::MatchupCreated(matchup.id.clone()),
        );
        Ok(matchup)
    }

    pub async fn get(&self, id: &MatchupId) -> Result<Matchup, LedgerError> {
        self.shared
            .repo
            .get_matchup(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("matchup {}", id)))
    }
}
