//! Elo expectation and delta, influence reward and tier breakpoints.

use crate::domain::Tier;

/// K-factor used when none is configured.
pub const DEFAULT_K_FACTOR: i64 = 32;

/// Lowest rating a loser can be pushed down to by default.
pub const DEFAULT_RATING_FLOOR: i64 = 800;

/// Influence reward never drops below this, even for the heaviest favourite.
pub const MIN_INFLUENCE_REWARD: i64 = 1;

/// Expected score of `a` against `b`, in `(0, 1)`.
pub fn expected_score(a: i64, b: i64) -> f64 {
    1.0 / (1.0 + 10f64.powf((b as f64 - a as f64) / 400.0))
}

/// Rating points moved from loser to winner.
pub fn rating_delta(winner_rating: i64, loser_rating: i64, k_factor: i64) -> i64 {
    let expected = expected_score(winner_rating, loser_rating);
    (k_factor as f64 * (1.0 - expected)).round() as i64
}

/// Influence awarded to the voter who picked the winner. Upsets pay more.
pub fn influence_reward(winner_rating: i64, loser_rating: i64) -> i64 {
    let raw = 10.0 * (1.0 + (loser_rating as f64 - winner_rating as f64) / 200.0);
    (raw.round() as i64).max(MIN_INFLUENCE_REWARD)
}

pub fn tier_for_rating(rating: i64) -> Tier {
    match rating {
        r if r < 1000 => Tier::Bronze,
        r if r < 1200 => Tier::Silver,
        r if r < 1400 => Tier::Gold,
        r if r < 1600 => Tier::Platinum,
        r if r < 1800 => Tier::Diamond,
        _ => Tier::Challenger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_score_is_symmetric() {
        let ratings = [-400, 0, 800, 1000, 1199, 1200, 1450, 1800, 2600, 4000];
        for &a in &ratings {
            for &b in &ratings {
                let sum = expected_score(a, b) + expected_score(b, a);
                assert!((sum - 1.0).abs() < 1e-12, "a={} b={} sum={}", a, b, sum);
            }
        }
    }

    #[test]
    fn test_extreme_ratings_do_not_overflow() {
        assert_eq!(rating_delta(i64::MIN, i64::MAX, 32), 32);
        assert_eq!(rating_delta(i64::MAX, i64::MIN, 32), 0);
        assert_eq!(influence_reward(i64::MAX, i64::MIN), MIN_INFLUENCE_REWARD);
    }

    #[test]
    fn test_equal_ratings_move_sixteen_points() {
        assert_eq!(rating_delta(1200, 1200, 32), 16);
        assert_eq!(rating_delta(1750, 1750, 32), 16);
    }

    #[test]
    fn test_favourite_win_moves_eight_points() {
        // 1 - 1/(1 + 10^(-0.5)) = 0.2403, * 32 = 7.69
        assert_eq!(rating_delta(1400, 1200, 32), 8);
    }

    #[test]
    fn test_delta_shrinks_toward_zero_for_heavy_favourite() {
        assert!(rating_delta(1200, 1000, 32) > rating_delta(1600, 1000, 32));
        assert_eq!(rating_delta(4000, 800, 32), 0);
        assert!(rating_delta(800, 1600, 32) > 16);
    }

    #[test]
    fn test_influence_reward() {
        assert_eq!(influence_reward(1200, 1200), 10);
        assert_eq!(influence_reward(1200, 1400), 20);
        assert_eq!(influence_reward(1200, 1300), 15);
    }

    #[test]
    fn test_influence_reward_is_floored() {
        assert_eq!(influence_reward(1400, 1200), MIN_INFLUENCE_REWARD);
        assert_eq!(influence_reward(2400, 800), MIN_INFLUENCE_REWARD);
    }

    #[test]
    fn test_tier_breakpoints() {
        assert_eq!(tier_for_rating(i64::MIN), Tier::Bronze);
        assert_eq!(tier_for_rating(999), Tier::Bronze);
        assert_eq!(tier_for_rating(1000), Tier::Silver);
        assert_eq!(tier_for_rating(1200), Tier::Gold);
        assert_eq!(tier_for_rating(1400), Tier::Platinum);
        assert_eq!(tier_for_rating(1600), Tier::Diamond);
        assert_eq!(tier_for_rating(1799), Tier::Diamond);
        assert_eq!(tier_for_rating(1800), Tier::Challenger);
        assert_eq!(tier_for_rating(i64::MAX), Tier::Challenger);
    }

    #[test]
    fn test_tier_is_monotonic() {
        let mut previous = tier_for_rating(-5000);
        for rating in (-5000..5000).step_by(7) {
            let tier = tier_for_rating(rating);
            assert!(tier >= previous, "tier decreased at {}", rating);
            previous = tier;
        }
    }
}
