//! EntityStore: the competitor collection and the leaderboard over it.

use serde::Serialize;
use tracing::info;

use crate::domain::{
    Competitor, CompetitorId, CompetitorUpdate, NewCompetitor, Tier, VoteRecord,
};
use crate::error::LedgerError;

use super::events::ChangeKind;
use super::Shared;

/// Number of recent votes included in a competitor's detail view.
const DETAIL_RECENT_VOTES: i64 = 20;

/// Roster written into a store nothing was ever written to.
const DEFAULT_ROSTER: &[(&str, &str, &str)] = &[
    (
        "Steve Jobs",
        "Visionary co-founder of Apple Inc. and pioneer of the personal computer and smartphone eras.",
        "https://images.unsplash.com/photo-1550133730-695473e544be?q=80&w=800&auto=format&fit=crop",
    ),
    (
        "Elon Musk",
        "Business magnate and engineer, leading Tesla, SpaceX, and the pursuit of a multi-planetary future.",
        "https://images.unsplash.com/photo-1563200742-0f04ca447b97?q=80&w=800&auto=format&fit=crop",
    ),
    (
        "Marie Curie",
        "Legendary physicist and chemist who conducted pioneering research on radioactivity.",
        "https://images.unsplash.com/photo-1567113463300-102550123354?q=80&w=800&auto=format&fit=crop",
    ),
    (
        "Albert Einstein",
        "Theoretical physicist who developed the theory of relativity, one of the pillars of modern physics.",
        "https://images.unsplash.com/photo-1544256718-3bcf237f3974?q=80&w=800&auto=format&fit=crop",
    ),
    (
        "Leonardo da Vinci",
        "Polymath of the High Renaissance who was active as a painter, scientist, and engineer.",
        "https://images.unsplash.com/photo-1579783902614-a3fb3927b6a5?q=80&w=800&auto=format&fit=crop",
    ),
    (
        "Ada Lovelace",
        "English mathematician and writer, chiefly known for her work on the Analytical Engine.",
        "https://images.unsplash.com/photo-1614850523296-d8c1af93d400?q=80&w=800&auto=format&fit=crop",
    ),
];

/// A competitor with its derived tier and win rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorView {
    #[serde(flatten)]
    pub competitor: Competitor,
    pub tier: Tier,
    pub win_rate: f64,
}

impl From<Competitor> for CompetitorView {
    fn from(competitor: Competitor) -> Self {
        let tier = competitor.tier();
        let win_rate = competitor.record.win_rate();
        CompetitorView {
            competitor,
            tier,
            win_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorDetail {
    #[serde(flatten)]
    pub view: CompetitorView,
    /// Votes this competitor won or lost, newest first.
    pub recent_votes: Vec<VoteRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub view: CompetitorView,
}

/// Rank competitors by rating, breaking ties by wins, then name, then id.
pub fn rank(mut competitors: Vec<Competitor>) -> Vec<LeaderboardEntry> {
    competitors.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| b.record.wins.cmp(&a.record.wins))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    competitors
        .into_iter()
        .enumerate()
        .map(|(i, c)| LeaderboardEntry {
            rank: i + 1,
            view: c.into(),
        })
        .collect()
}

#[derive(Clone)]
pub struct EntityStore {
    shared: Shared,
}

impl EntityStore {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// All competitors, oldest first.
    pub async fn list(&self) -> Result<Vec<CompetitorView>, LedgerError> {
        let competitors = self.shared.repo.list_competitors().await?;
        Ok(competitors.into_iter().map(CompetitorView::from).collect())
    }

    pub async fn get(&self, id: &CompetitorId) -> Result<CompetitorDetail, LedgerError> {
        let competitor = self
            .shared
            .repo
            .get_competitor(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("competitor {}", id)))?;
        let recent_votes = self
            .shared
            .repo
            .votes_involving(id, DETAIL_RECENT_VOTES)
            .await?;
        Ok(CompetitorDetail {
            view: competitor.into(),
            recent_votes,
        })
    }

    pub async fn create(&self, fields: NewCompetitor) -> Result<Competitor, LedgerError> {
        let fields = fields.validated().map_err(LedgerError::Validation)?;
        let competitor = Competitor::new(CompetitorId::generate(), fields, self.shared.clock.now());

        let committed = self
            .shared
            .write("create_competitor", || {
                self.shared.repo.insert_new_competitor(&competitor)
            })
            .await?;

        info!(competitor = %competitor.id, name = %competitor.name, "Competitor created");
        self.shared.feed.publish(
            committed.world_version,
            ChangeKind::CompetitorCreated(competitor.id.clone()),
        );
        Ok(competitor)
    }

    /// Edit name, description or image. Rating and record are not editable.
    pub async fn update(
        &self,
        id: &CompetitorId,
        update: CompetitorUpdate,
    ) -> Result<Competitor, LedgerError> {
        let update = update.validated().map_err(LedgerError::Validation)?;
        let committed = self
            .shared
            .write("update_competitor", || {
                self.shared.repo.update_competitor(id, &update)
            })
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("competitor {}", id)))?;

        self.shared.feed.publish(
            committed.world_version,
            ChangeKind::CompetitorUpdated(id.clone()),
        );
        Ok(committed.value)
    }

    /// Hard-delete a competitor. Past matchups and votes keep referring to it.
    ///
    /// Returns `false` when no such competitor existed.
    pub async fn delete(&self, id: &CompetitorId) -> Result<bool, LedgerError> {
        let committed = self
            .shared
            .write("delete_competitor", || self.shared.repo.delete_competitor(id))
            .await?;
        let Some(committed) = committed else {
            return Ok(false);
        };

        info!(competitor = %id, "Competitor deleted");
        self.shared.feed.publish(
            committed.world_version,
            ChangeKind::CompetitorDeleted(id.clone()),
        );
        Ok(true)
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        Ok(rank(self.shared.repo.list_competitors().await?))
    }

    /// Write the default roster into a store that has never been written to.
    ///
    /// Returns the number of competitors created.
    pub async fn seed_defaults(&self) -> Result<usize, LedgerError> {
        let roster = DEFAULT_ROSTER
            .iter()
            .map(|(name, description, image)| NewCompetitor::new(*name, *description, *image))
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::Validation)?;
        let now = self.shared.clock.now();

        let created = self
            .shared
            .write("seed_defaults", || self.shared.repo.seed_if_fresh(&roster, now))
            .await?;
        if created > 0 {
            info!(count = created, "Seeded default competitors");
        }
        Ok(created)
    }
}
