//! Domain types for the portrait clash arena.
//!
//! This module provides:
//! - Domain primitives: TimeMs and the entity id newtypes
//! - Competitor, Matchup, VoteRecord and VoterAccount entities
//! - The static achievement catalog
//! - The versioned world snapshot used for export and import

pub mod achievement;
pub mod competitor;
pub mod matchup;
pub mod primitives;
pub mod vote;
pub mod voter;
pub mod world;

pub use achievement::{find_achievement, Achievement, Criterion, Rarity, ACHIEVEMENTS};
pub use competitor::{
    Competitor, CompetitorUpdate, NewCompetitor, RatingPoint, Record, Tier, INITIAL_RATING,
};
pub use matchup::Matchup;
pub use primitives::{CompetitorId, MatchupId, TimeMs, VoteId, VoterId};
pub use vote::{CastOutcome, Rejection, VoteRecord};
pub use voter::{VoterAccount, VoterAccountUpdate};
pub use world::WorldSnapshot;
