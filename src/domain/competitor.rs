//! Competitor entity, its win/loss record, rating history and rank tier.

use serde::{Deserialize, Serialize};

use super::primitives::{CompetitorId, TimeMs};

/// Rating every new competitor starts from.
pub const INITIAL_RATING: i64 = 1200;

/// Discrete rank label derived from rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Challenger,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
            Tier::Diamond => "Diamond",
            Tier::Challenger => "Challenger",
        };
        f.write_str(label)
    }
}

/// Head-to-head record. `total_matches` always equals `wins + losses`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub wins: i64,
    pub losses: i64,
    pub total_matches: i64,
}

impl Record {
    pub fn new(wins: i64, losses: i64) -> Self {
        Record {
            wins,
            losses,
            total_matches: wins + losses,
        }
    }

    pub fn with_win(self) -> Self {
        Record::new(self.wins + 1, self.losses)
    }

    pub fn with_loss(self) -> Self {
        Record::new(self.wins, self.losses + 1)
    }

    /// Remove one win, never going below zero.
    pub fn without_win(self) -> Self {
        Record::new((self.wins - 1).max(0), self.losses)
    }

    /// Remove one loss, never going below zero.
    pub fn without_loss(self) -> Self {
        Record::new(self.wins, (self.losses - 1).max(0))
    }

    /// Win percentage in `[0, 100]`; zero for a competitor with no matches.
    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            0.0
        } else {
            self.wins as f64 / self.total_matches as f64 * 100.0
        }
    }
}

/// One point of a competitor's rating history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPoint {
    pub timestamp: TimeMs,
    pub rating: i64,
}

/// An entrant subject to matchups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub id: CompetitorId,
    pub name: String,
    pub description: String,
    pub image_ref: String,
    pub rating: i64,
    /// Positive for consecutive wins, negative for consecutive losses.
    pub streak: i64,
    pub record: Record,
    /// Oldest first; the last point always carries the current rating.
    pub rating_history: Vec<RatingPoint>,
    pub created_at: TimeMs,
}

impl Competitor {
    /// A fresh competitor at the initial rating with a single seeded history point.
    pub fn new(id: CompetitorId, fields: NewCompetitor, now: TimeMs) -> Self {
        Competitor {
            id,
            name: fields.name,
            description: fields.description,
            image_ref: fields.image_ref,
            rating: INITIAL_RATING,
            streak: 0,
            record: Record::default(),
            rating_history: vec![RatingPoint {
                timestamp: now,
                rating: INITIAL_RATING,
            }],
            created_at: now,
        }
    }

    pub fn tier(&self) -> Tier {
        crate::engine::rating::tier_for_rating(self.rating)
    }

    /// Set a new rating and append it to the history, keeping at most `limit` points.
    pub fn push_rating(&mut self, rating: i64, at: TimeMs, limit: usize) {
        self.rating = rating;
        self.rating_history.push(RatingPoint {
            timestamp: at,
            rating,
        });
        let limit = limit.max(1);
        if self.rating_history.len() > limit {
            let excess = self.rating_history.len() - limit;
            self.rating_history.drain(..excess);
        }
    }
}

fn required(field: &str, value: String) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Validated creation payload for a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompetitor {
    pub name: String,
    pub description: String,
    pub image_ref: String,
}

impl NewCompetitor {
    /// Build a payload, trimming all fields and rejecting empty ones.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Result<Self, String> {
        Ok(NewCompetitor {
            name: required("name", name.into())?,
            description: required("description", description.into())?,
            image_ref: required("imageRef", image_ref.into())?,
        })
    }

    pub fn validated(self) -> Result<Self, String> {
        NewCompetitor::new(self.name, self.description, self.image_ref)
    }
}

/// Partial update of a competitor's presentation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_ref: Option<String>,
}

impl CompetitorUpdate {
    pub fn validated(self) -> Result<Self, String> {
        Ok(CompetitorUpdate {
            name: self.name.map(|v| required("name", v)).transpose()?,
            description: self
                .description
                .map(|v| required("description", v))
                .transpose()?,
            image_ref: self.image_ref.map(|v| required("imageRef", v)).transpose()?,
        })
    }

    pub fn apply_to(&self, competitor: &mut Competitor) {
        if let Some(name) = &self.name {
            competitor.name = name.clone();
        }
        if let Some(description) = &self.description {
            competitor.description = description.clone();
        }
        if let Some(image_ref) = &self.image_ref {
            competitor.image_ref = image_ref.clone();
        }
    }
}
