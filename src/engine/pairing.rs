use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::CompetitorId;

/// Pick one competitor uniformly at random, then a second uniformly from the rest.
///
/// Returns `None` when fewer than two competitors are available.
pub fn pick_random_pair<R: Rng>(
    pool: &[CompetitorId],
    rng: &mut R,
) -> Option<(CompetitorId, CompetitorId)> {
    if pool.len() < 2 {
        return None;
    }
    let first_idx = rng.gen_range(0..pool.len());
    let rest: Vec<&CompetitorId> = pool
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != first_idx)
        .map(|(_, id)| id)
        .collect();
    let second = rest.choose(rng)?;
    Some((pool[first_idx].clone(), (*second).clone()))
}
