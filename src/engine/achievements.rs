//! Achievement evaluation. Pure: callers persist whatever it returns.

use std::collections::HashSet;

use crate::domain::{Achievement, CompetitorId, Criterion, VoteRecord, VoterAccount, ACHIEVEMENTS};

/// Everything the evaluator looks at for one voter.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub account: &'a VoterAccount,
    /// Votes cast by this voter.
    pub votes: &'a [VoteRecord],
    /// Ids of the competitors that currently exist.
    pub roster: &'a [CompetitorId],
}

impl EvaluationContext<'_> {
    fn voted_on_every_competitor(&self) -> bool {
        if self.roster.is_empty() {
            return false;
        }
        let seen: HashSet<&CompetitorId> = self
            .votes
            .iter()
            .flat_map(|v| [&v.winner_id, &v.loser_id])
            .collect();
        self.roster.iter().all(|id| seen.contains(id))
    }
}

pub fn qualifies(achievement: &Achievement, ctx: &EvaluationContext<'_>) -> bool {
    match achievement.criterion {
        Criterion::VoteCount(n) => ctx.account.vote_count >= n,
        Criterion::Influence(n) => ctx.account.influence >= n,
        Criterion::VotedOnEveryCompetitor => ctx.voted_on_every_competitor(),
    }
}

/// Catalog entries the account qualifies for but has not unlocked yet.
pub fn evaluate(ctx: &EvaluationContext<'_>) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !ctx.account.unlocked_achievement_ids.contains(a.id))
        .filter(|a| qualifies(a, ctx))
        .collect()
}

/// Unlocked catalog ids whose criterion no longer holds. Ids outside the
/// catalog are left alone.
pub fn no_longer_qualifying(ctx: &EvaluationContext<'_>) -> Vec<String> {
    ctx.account
        .unlocked_achievement_ids
        .iter()
        .filter(|id| {
            crate::domain::find_achievement(id).is_some_and(|a| !qualifies(a, ctx))
        })
        .cloned()
        .collect()
}
