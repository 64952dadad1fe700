use serde::{Deserialize, Serialize};

use super::primitives::{CompetitorId, MatchupId, TimeMs};

/// An immutable pairing of two distinct competitors awaiting votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub id: MatchupId,
    pub competitor_a_id: CompetitorId,
    pub competitor_b_id: CompetitorId,
    pub created_at: TimeMs,
}

impl Matchup {
    pub fn involves(&self, id: &CompetitorId) -> bool {
        &self.competitor_a_id == id || &self.competitor_b_id == id
    }

    /// The other side of the pairing, or `None` if `id` is not part of it.
    pub fn opponent_of(&self, id: &CompetitorId) -> Option<&CompetitorId> {
        if &self.competitor_a_id == id {
            Some(&self.competitor_b_id)
        } else if &self.competitor_b_id == id {
            Some(&self.competitor_a_id)
        } else {
            None
        }
    }
}
