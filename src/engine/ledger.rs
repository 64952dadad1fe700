//! Pure half of the vote ledger: turning loaded state into the state to persist.
//!
//! The repository loads everything inside one transaction, hands it to
//! [`plan_vote`] or [`plan_undo`], and writes the returned plan back before
//! committing.

use crate::domain::{
    Competitor, CompetitorId, Matchup, TimeMs, VoteId, VoteRecord, VoterAccount, VoterId,
};
use crate::error::LedgerError;

use super::achievements::{no_longer_qualifying, EvaluationContext};
use super::rating::{influence_reward, rating_delta};
use super::standings::{apply_outcome, revert_loser, revert_winner, Outcome};
use super::LedgerParams;

#[derive(Debug, Clone, PartialEq)]
pub struct VotePlan {
    pub vote: VoteRecord,
    pub outcome: Outcome,
    pub account: VoterAccount,
}

/// Compute the effects of `voter_id` picking `winner` over `loser` in `matchup`.
#[allow(clippy::too_many_arguments)]
pub fn plan_vote(
    matchup: &Matchup,
    winner: &Competitor,
    loser: &Competitor,
    account: &VoterAccount,
    vote_id: VoteId,
    voter_id: &VoterId,
    params: &LedgerParams,
    now: TimeMs,
) -> Result<VotePlan, LedgerError> {
    if matchup.opponent_of(&winner.id) != Some(&loser.id) {
        return Err(LedgerError::InvalidWinner(format!(
            "{} is not a competitor in matchup {}",
            winner.id, matchup.id
        )));
    }

    let delta = rating_delta(winner.rating, loser.rating, params.k_factor);
    let influence_gained = influence_reward(winner.rating, loser.rating);
    let outcome = apply_outcome(winner, loser, delta, params, now);

    let vote = VoteRecord {
        id: vote_id,
        matchup_id: matchup.id.clone(),
        winner_id: winner.id.clone(),
        loser_id: loser.id.clone(),
        winner_rating_before: winner.rating,
        winner_rating_after: outcome.winner.rating,
        loser_rating_before: loser.rating,
        loser_rating_after: outcome.loser.rating,
        timestamp: now,
        voter_id: voter_id.clone(),
        influence_gained,
        undo_expires_at: now.plus_ms(params.undo_window_ms),
    };

    let mut account = account.clone();
    account.credit_vote(&vote);

    Ok(VotePlan {
        vote,
        outcome,
        account,
    })
}

/// State to write back when a vote is undone. Competitors or the account may
/// be absent when they were deleted after the vote.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoPlan {
    pub winner: Option<Competitor>,
    pub loser: Option<Competitor>,
    pub account: Option<VoterAccount>,
    pub revoked_achievements: Vec<String>,
}

/// Inputs loaded for an undo attempt.
#[derive(Debug, Clone, Copy)]
pub struct UndoInputs<'a> {
    pub vote: &'a VoteRecord,
    pub winner: Option<&'a Competitor>,
    pub loser: Option<&'a Competitor>,
    pub account: Option<&'a VoterAccount>,
    /// The voter's other votes, excluding the one being undone.
    pub remaining_votes: &'a [VoteRecord],
    pub roster: &'a [CompetitorId],
}

/// Reverse a vote's effects, or `None` once the undo deadline has passed.
pub fn plan_undo(inputs: UndoInputs<'_>, params: &LedgerParams, now: TimeMs) -> Option<UndoPlan> {
    let vote = inputs.vote;
    if !vote.is_undoable_at(now) {
        return None;
    }

    let winner = inputs.winner.map(|w| revert_winner(w, vote, params, now));
    let loser = inputs.loser.map(|l| revert_loser(l, vote, params, now));

    let (account, revoked_achievements) = match inputs.account {
        Some(account) => {
            let mut account = account.clone();
            account.debit_vote(vote);
            let revoked = no_longer_qualifying(&EvaluationContext {
                account: &account,
                votes: inputs.remaining_votes,
                roster: inputs.roster,
            });
            for id in &revoked {
                account.unlocked_achievement_ids.remove(id);
            }
            (Some(account), revoked)
        }
        None => (None, Vec::new()),
    };

    Some(UndoPlan {
        winner,
        loser,
        account,
        revoked_achievements,
    })
}
