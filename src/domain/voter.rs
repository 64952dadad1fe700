//! Local voter account: influence, vote count, achievements and history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::primitives::{TimeMs, VoteId, VoterId};
use super::vote::VoteRecord;

pub const DEFAULT_AVATAR: &str = "⚡";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterAccount {
    pub id: VoterId,
    pub display_name: String,
    pub avatar_ref: String,
    pub influence: i64,
    pub vote_count: i64,
    pub last_vote_at: Option<TimeMs>,
    pub unlocked_achievement_ids: BTreeSet<String>,
    /// Ids of the votes cast by this voter, oldest first.
    pub vote_history: Vec<VoteId>,
}

impl VoterAccount {
    /// A fresh account with the given starting influence.
    pub fn new(id: VoterId, starting_influence: i64) -> Self {
        let short: String = id.as_str().chars().take(6).collect();
        VoterAccount {
            display_name: format!("Voter-{}", short),
            id,
            avatar_ref: DEFAULT_AVATAR.to_string(),
            influence: starting_influence.max(0),
            vote_count: 0,
            last_vote_at: None,
            unlocked_achievement_ids: BTreeSet::new(),
            vote_history: Vec::new(),
        }
    }

    /// Account for a freshly recorded vote.
    pub fn credit_vote(&mut self, vote: &VoteRecord) {
        self.vote_count += 1;
        self.influence += vote.influence_gained;
        self.last_vote_at = Some(vote.timestamp);
        self.vote_history.push(vote.id.clone());
    }

    /// Reverse `credit_vote`. Counters never go below zero.
    pub fn debit_vote(&mut self, vote: &VoteRecord) {
        self.vote_count = (self.vote_count - 1).max(0);
        self.influence = (self.influence - vote.influence_gained).max(0);
        self.vote_history.retain(|id| id != &vote.id);
    }
}

/// Client-editable subset of a voter account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterAccountUpdate {
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

impl VoterAccountUpdate {
    pub fn validated(self) -> Result<Self, String> {
        let display_name = match self.display_name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err("displayName must not be empty".to_string());
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        let avatar_ref = match self.avatar_ref {
            Some(avatar) if avatar.trim().is_empty() => {
                return Err("avatarRef must not be empty".to_string())
            }
            other => other,
        };
        Ok(VoterAccountUpdate {
            display_name,
            avatar_ref,
        })
    }

    pub fn apply_to(&self, account: &mut VoterAccount) {
        if let Some(name) = &self.display_name {
            account.display_name = name.clone();
        }
        if let Some(avatar) = &self.avatar_ref {
            account.avatar_ref = avatar.clone();
        }
    }
}
