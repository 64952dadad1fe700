//! Serializable snapshot of the shared world: competitors, matchups and votes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

use super::competitor::Competitor;
use super::matchup::Matchup;
use super::vote::VoteRecord;

/// Ratings an imported snapshot may carry, on competitors, their history and votes.
pub const IMPORTABLE_RATINGS: RangeInclusive<i64> = 0..=1_000_000;

/// Largest influence a single imported vote may have awarded.
pub const MAX_IMPORTED_INFLUENCE: i64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub schema_version: i64,
    #[serde(default)]
    pub world_version: i64,
    pub competitors: Vec<Competitor>,
    pub matchups: Vec<Matchup>,
    pub votes: Vec<VoteRecord>,
}

impl WorldSnapshot {
    /// Check the structural invariants a snapshot must hold before it may
    /// replace the stored world.
    pub fn validate(&self) -> Result<(), String> {
        let mut competitor_ids = HashSet::new();
        for c in &self.competitors {
            if !competitor_ids.insert(&c.id) {
                return Err(format!("duplicate competitor id {}", c.id));
            }
            for (field, value) in [
                ("name", &c.name),
                ("description", &c.description),
                ("imageRef", &c.image_ref),
            ] {
                if value.trim().is_empty() {
                    return Err(format!("competitor {} has an empty {}", c.id, field));
                }
            }
            if !IMPORTABLE_RATINGS.contains(&c.rating)
                || c
                    .rating_history
                    .iter()
                    .any(|p| !IMPORTABLE_RATINGS.contains(&p.rating))
            {
                return Err(format!("competitor {} has a rating out of range", c.id));
            }
            if c.record.total_matches != c.record.wins + c.record.losses {
                return Err(format!("competitor {} has inconsistent record", c.id));
            }
            if c.record.wins < 0 || c.record.losses < 0 {
                return Err(format!("competitor {} has a negative record", c.id));
            }
            match c.rating_history.last() {
                Some(point) if point.rating == c.rating => {}
                _ => {
                    return Err(format!(
                        "competitor {} rating history does not end at its rating",
                        c.id
                    ))
                }
            }
        }

        let mut matchup_ids = HashSet::new();
        for m in &self.matchups {
            if !matchup_ids.insert(&m.id) {
                return Err(format!("duplicate matchup id {}", m.id));
            }
            if m.competitor_a_id == m.competitor_b_id {
                return Err(format!("matchup {} pairs a competitor with itself", m.id));
            }
        }

        let mut vote_ids = HashSet::new();
        let mut ballots = HashSet::new();
        for v in &self.votes {
            if !vote_ids.insert(&v.id) {
                return Err(format!("duplicate vote id {}", v.id));
            }
            let ratings = [
                v.winner_rating_before,
                v.winner_rating_after,
                v.loser_rating_before,
                v.loser_rating_after,
            ];
            if ratings.iter().any(|r| !IMPORTABLE_RATINGS.contains(r)) {
                return Err(format!("vote {} has a rating out of range", v.id));
            }
            if !(0..=MAX_IMPORTED_INFLUENCE).contains(&v.influence_gained) {
                return Err(format!("vote {} has influence out of range", v.id));
            }
            if !matchup_ids.contains(&v.matchup_id) {
                return Err(format!("vote {} references unknown matchup {}", v.id, v.matchup_id));
            }
            if !ballots.insert((&v.matchup_id, &v.voter_id)) {
                return Err(format!(
                    "voter {} voted twice on matchup {}",
                    v.voter_id, v.matchup_id
                ));
            }
        }
        Ok(())
    }
}
