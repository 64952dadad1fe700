pub mod api;
pub mod arena;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;

pub use arena::{Arena, ChangeKind, StateChange};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CastOutcome, Competitor, CompetitorId, Matchup, MatchupId, Rejection, Tier, TimeMs, VoteId,
    VoteRecord, VoterAccount, VoterId,
};
pub use engine::LedgerParams;
pub use error::{AppError, LedgerError};
