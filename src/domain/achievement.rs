//! Static achievement catalog.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
}

/// What an account has to reach for an achievement to qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "threshold")]
pub enum Criterion {
    /// At least this many votes cast.
    VoteCount(i64),
    /// At least this much influence.
    Influence(i64),
    /// Voted on every currently existing competitor.
    VotedOnEveryCompetitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    pub points: u32,
    pub criterion: Criterion,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_vote",
        title: "Arena Entry",
        description: "Cast your very first vote.",
        rarity: Rarity::Common,
        points: 10,
        criterion: Criterion::VoteCount(1),
    },
    Achievement {
        id: "streak_3",
        title: "Triple Threat",
        description: "Vote 3 times in one session.",
        rarity: Rarity::Common,
        points: 25,
        criterion: Criterion::VoteCount(3),
    },
    Achievement {
        id: "influence_500",
        title: "Influencer",
        description: "Reach 500 global influence.",
        rarity: Rarity::Rare,
        points: 50,
        criterion: Criterion::Influence(500),
    },
    Achievement {
        id: "collector",
        title: "Arena Historian",
        description: "Vote on all current participants.",
        rarity: Rarity::Epic,
        points: 100,
        criterion: Criterion::VotedOnEveryCompetitor,
    },
];

pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}
