//! UserAccounts: voter profiles, achievement claims and vote history export.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::domain::{
    Achievement, CompetitorId, TimeMs, VoteRecord, VoterAccount, VoterAccountUpdate, VoterId, ACHIEVEMENTS,
};
use crate::error::LedgerError;

use super::events::ChangeKind;
use super::Shared;

/// One line of a voter's vote export. Competitors deleted since the vote are
/// shown by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoteExportRow {
    pub date: String,
    pub winner: String,
    pub loser: String,
    pub influence: i64,
}

fn format_time(at: TimeMs) -> String {
    DateTime::<Utc>::from_timestamp_millis(at.as_ms())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| at.as_ms().to_string())
}

/// Render export rows as CSV with a `Date,Winner,Loser,Influence` header.
pub fn export_csv(rows: &[VoteExportRow]) -> Result<String, LedgerError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer
            .write_record(["Date", "Winner", "Loser", "Influence"])
            .map_err(|e| LedgerError::Corrupt(format!("csv export failed: {}", e)))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| LedgerError::Corrupt(format!("csv export failed: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::Corrupt(format!("csv export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::Corrupt(format!("csv export failed: {}", e)))
}

#[derive(Clone)]
pub struct UserAccounts {
    shared: Shared,
}

impl UserAccounts {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// The voter's account; voters never seen before get a fresh default one.
    pub async fn get(&self, voter_id: &VoterId) -> Result<VoterAccount, LedgerError> {
        self.shared
            .repo
            .get_voter_account(voter_id, self.shared.params.starting_influence)
            .await
    }

    /// Change display name or avatar. Counters are owned by the ledger.
    pub async fn update(
        &self,
        voter_id: &VoterId,
        update: VoterAccountUpdate,
    ) -> Result<VoterAccount, LedgerError> {
        let update = update.validated().map_err(LedgerError::Validation)?;
        let starting_influence = self.shared.params.starting_influence;
        let committed = self
            .shared
            .write("update_voter", || {
                self.shared
                    .repo
                    .update_voter_account(voter_id, &update, starting_influence)
            })
            .await?;

        self.shared.feed.publish(
            committed.world_version,
            ChangeKind::VoterUpdated(voter_id.clone()),
        );
        Ok(committed.value)
    }

    /// Unlock and return every catalog achievement the voter newly qualifies for.
    pub async fn claim_achievements(
        &self,
        voter_id: &VoterId,
    ) -> Result<Vec<&'static Achievement>, LedgerError> {
        let starting_influence = self.shared.params.starting_influence;
        let now = self.shared.clock.now();
        let committed = self
            .shared
            .write("claim_achievements", || {
                self.shared
                    .repo
                    .claim_achievements(voter_id, starting_influence, now)
            })
            .await?;

        if !committed.value.is_empty() {
            info!(
                voter = %voter_id,
                unlocked = committed.value.len(),
                "Achievements unlocked"
            );
            self.shared.feed.publish(
                committed.world_version,
                ChangeKind::VoterUpdated(voter_id.clone()),
            );
        }
        Ok(committed.value)
    }

    pub fn catalog(&self) -> &'static [Achievement] {
        ACHIEVEMENTS
    }

    /// Votes cast by the voter, oldest first.
    pub async fn votes(&self, voter_id: &VoterId) -> Result<Vec<VoteRecord>, LedgerError> {
        self.shared.repo.votes_by_voter(voter_id).await
    }

    /// The voter's votes with competitor names resolved, oldest first.
    pub async fn export_votes(&self, voter_id: &VoterId) -> Result<Vec<VoteExportRow>, LedgerError> {
        let votes = self.votes(voter_id).await?;
        let names: HashMap<_, _> = self
            .shared
            .repo
            .list_competitors()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let name_of = |id: &CompetitorId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
        Ok(votes
            .iter()
            .map(|v| VoteExportRow {
                date: format_time(v.timestamp),
                winner: name_of(&v.winner_id),
                loser: name_of(&v.loser_id),
                influence: v.influence_gained,
            })
            .collect())
    }
}
