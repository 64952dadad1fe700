//! Applying and reverting a match outcome on a pair of competitors.
//!
//! Both directions work on copies and return the updated competitors; the
//! caller persists them. Reverting restores the ratings captured at vote time
//! rather than re-running the rating math backwards.

use crate::domain::{Competitor, TimeMs, VoteRecord};

use super::LedgerParams;

/// Updated winner and loser after a vote is applied or reverted.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub winner: Competitor,
    pub loser: Competitor,
}

fn next_win_streak(streak: i64) -> i64 {
    if streak < 0 {
        1
    } else {
        streak + 1
    }
}

fn next_loss_streak(streak: i64) -> i64 {
    if streak > 0 {
        -1
    } else {
        streak - 1
    }
}

/// Move `delta` rating points from loser to winner, clamping the loser at the floor.
pub fn apply_outcome(
    winner: &Competitor,
    loser: &Competitor,
    delta: i64,
    params: &LedgerParams,
    now: TimeMs,
) -> Outcome {
    let mut w = winner.clone();
    w.streak = next_win_streak(w.streak);
    w.record = w.record.with_win();
    w.push_rating(winner.rating.saturating_add(delta), now, params.history_limit);

    let mut l = loser.clone();
    l.streak = next_loss_streak(l.streak);
    l.record = l.record.with_loss();
    l.push_rating(
        loser.rating.saturating_sub(delta).max(params.rating_floor),
        now,
        params.history_limit,
    );

    Outcome {
        winner: w,
        loser: l,
    }
}

/// Restore a winner to the rating it had before `vote`. The streak is zeroed,
/// not reconstructed.
pub fn revert_winner(
    winner: &Competitor,
    vote: &VoteRecord,
    params: &LedgerParams,
    now: TimeMs,
) -> Competitor {
    let mut w = winner.clone();
    w.streak = 0;
    w.record = w.record.without_win();
    w.push_rating(vote.winner_rating_before, now, params.history_limit);
    w
}

/// Restore a loser to the rating it had before `vote`. The streak is zeroed.
pub fn revert_loser(
    loser: &Competitor,
    vote: &VoteRecord,
    params: &LedgerParams,
    now: TimeMs,
) -> Competitor {
    let mut l = loser.clone();
    l.streak = 0;
    l.record = l.record.without_loss();
    l.push_rating(vote.loser_rating_before, now, params.history_limit);
    l
}

pub fn revert_outcome(
    winner: &Competitor,
    loser: &Competitor,
    vote: &VoteRecord,
    params: &LedgerParams,
    now: TimeMs,
) -> Outcome {
    Outcome {
        winner: revert_winner(winner, vote, params, now),
        loser: revert_loser(loser, vote, params, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompetitorId, MatchupId, NewCompetitor, Record, Tier, VoteId, VoterId};

    fn competitor(id: &str, rating: i64, streak: i64) -> Competitor {
        let mut c = Competitor::new(
            CompetitorId::new(id),
            NewCompetitor::new(id, "desc", "img").unwrap(),
            TimeMs::new(0),
        );
        c.rating = rating;
        c.rating_history[0].rating = rating;
        c.streak = streak;
        c
    }

    fn vote_for(outcome: &Outcome, before_w: i64, before_l: i64) -> VoteRecord {
        VoteRecord {
            id: VoteId::new("v"),
            matchup_id: MatchupId::new("m"),
            winner_id: outcome.winner.id.clone(),
            loser_id: outcome.loser.id.clone(),
            winner_rating_before: before_w,
            winner_rating_after: outcome.winner.rating,
            loser_rating_before: before_l,
            loser_rating_after: outcome.loser.rating,
            timestamp: TimeMs::new(1),
            voter_id: VoterId::new("x"),
            influence_gained: 10,
            undo_expires_at: TimeMs::new(5001),
        }
    }

    #[test]
    fn test_apply_outcome_moves_rating_and_streaks() {
        let params = LedgerParams::default();
        let a = competitor("a", 1200, 0);
        let b = competitor("b", 1200, 0);
        let out = apply_outcome(&a, &b, 16, &params, TimeMs::new(1));
        assert_eq!(out.winner.rating, 1216);
        assert_eq!(out.loser.rating, 1184);
        assert_eq!(out.winner.streak, 1);
        assert_eq!(out.loser.streak, -1);
        assert_eq!(out.winner.record, Record::new(1, 0));
        assert_eq!(out.loser.record, Record::new(0, 1));
        assert_eq!(out.winner.rating_history.last().unwrap().rating, 1216);
        assert_eq!(out.loser.rating_history.last().unwrap().rating, 1184);
    }

    #[test]
    fn test_streak_resets_on_reversal() {
        let params = LedgerParams::default();
        let losing = competitor("a", 1200, -4);
        let winning = competitor("b", 1200, 3);
        let out = apply_outcome(&losing, &winning, 16, &params, TimeMs::new(1));
        assert_eq!(out.winner.streak, 1);
        assert_eq!(out.loser.streak, -1);

        let again = apply_outcome(&out.winner, &out.loser, 16, &params, TimeMs::new(2));
        assert_eq!(again.winner.streak, 2);
        assert_eq!(again.loser.streak, -2);
    }

    #[test]
    fn test_loser_clamped_at_floor() {
        let params = LedgerParams::default();
        let a = competitor("a", 900, 0);
        let b = competitor("b", 810, 0);
        let out = apply_outcome(&a, &b, 20, &params, TimeMs::new(1));
        assert_eq!(out.loser.rating, 800);
        assert_eq!(out.winner.rating, 920);
    }

    #[test]
    fn test_tier_follows_rating() {
        let params = LedgerParams::default();
        let a = competitor("a", 1395, 0);
        let b = competitor("b", 1205, 0);
        assert_eq!(a.tier(), Tier::Gold);
        let out = apply_outcome(&a, &b, 8, &params, TimeMs::new(1));
        assert_eq!(out.winner.tier(), Tier::Platinum);
        assert_eq!(out.loser.tier(), Tier::Silver);
    }

    #[test]
    fn test_revert_restores_ratings_and_zeroes_streaks() {
        let params = LedgerParams::default();
        let a = competitor("a", 1200, 2);
        let b = competitor("b", 1200, -1);
        let out = apply_outcome(&a, &b, 16, &params, TimeMs::new(1));
        let vote = vote_for(&out, 1200, 1200);

        let back = revert_outcome(&out.winner, &out.loser, &vote, &params, TimeMs::new(2));
        assert_eq!(back.winner.rating, 1200);
        assert_eq!(back.loser.rating, 1200);
        assert_eq!(back.winner.streak, 0);
        assert_eq!(back.loser.streak, 0);
        assert_eq!(back.winner.record, a.record);
        assert_eq!(back.loser.record, b.record);
        assert_eq!(back.winner.rating_history.last().unwrap().rating, 1200);
    }

    #[test]
    fn test_revert_restores_floored_loser_exactly() {
        let params = LedgerParams::default();
        let a = competitor("a", 900, 0);
        let b = competitor("b", 805, 0);
        let out = apply_outcome(&a, &b, 20, &params, TimeMs::new(1));
        let vote = vote_for(&out, 900, 805);
        let back = revert_loser(&out.loser, &vote, &params, TimeMs::new(2));
        assert_eq!(back.rating, 805);
    }
}
