use clash_arena::domain::{NewCompetitor, WorldSnapshot};
use clash_arena::{
    init_db, Arena, CastOutcome, Competitor, LedgerError, LedgerParams, ManualClock, Rejection,
    Repository, TimeMs, VoterId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tempfile::TempDir;

const START_MS: i64 = 1_700_000_000_000;

struct TestArena {
    arena: Arena,
    clock: ManualClock,
    db_path: String,
    _temp: TempDir,
}

async fn setup_arena() -> TestArena {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("ledger.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let clock = ManualClock::new(TimeMs::new(START_MS));
    let arena = Arena::with_rng(
        Arc::new(Repository::new(pool)),
        LedgerParams::default(),
        Arc::new(clock.clone()),
        StdRng::seed_from_u64(42),
    );

    TestArena {
        arena,
        clock,
        db_path,
        _temp: temp_dir,
    }
}

async fn create(arena: &Arena, name: &str) -> Competitor {
    arena
        .competitors
        .create(NewCompetitor::new(name, "A worthy rival", "https://example.com/img.png").unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_equal_ratings_vote_then_undo_restores_everything() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let voter = VoterId::new("device-1");

    let vote = match t.arena.votes.record(&m.id, &a.id, &voter).await.unwrap() {
        CastOutcome::Recorded(vote) => vote,
        other => panic!("expected a recorded vote, got {:?}", other),
    };
    assert_eq!(vote.influence_gained, 10);
    assert_eq!(vote.loser_id, b.id);
    assert_eq!(vote.undo_expires_at, TimeMs::new(START_MS + 5_000));

    let winner = t.arena.competitors.get(&a.id).await.unwrap().view.competitor;
    let loser = t.arena.competitors.get(&b.id).await.unwrap().view.competitor;
    assert_eq!((winner.rating, winner.streak), (1216, 1));
    assert_eq!((loser.rating, loser.streak), (1184, -1));
    assert_eq!(winner.record.wins, 1);
    assert_eq!(loser.record.losses, 1);
    assert_eq!(winner.rating_history.last().unwrap().rating, 1216);

    let account = t.arena.accounts.get(&voter).await.unwrap();
    assert_eq!(account.vote_count, 1);
    assert_eq!(account.influence, 110);
    assert_eq!(account.vote_history, vec![vote.id.clone()]);

    t.clock.advance_ms(2_500);
    assert!(t.arena.votes.undo(&vote.id).await.unwrap());

    let winner = t.arena.competitors.get(&a.id).await.unwrap().view.competitor;
    let loser = t.arena.competitors.get(&b.id).await.unwrap().view.competitor;
    assert_eq!((winner.rating, winner.streak), (1200, 0));
    assert_eq!((loser.rating, loser.streak), (1200, 0));
    assert_eq!(winner.record.total_matches, 0);
    assert_eq!(loser.record.total_matches, 0);
    assert_eq!(winner.rating_history.last().unwrap().rating, 1200);

    let account = t.arena.accounts.get(&voter).await.unwrap();
    assert_eq!(account.vote_count, 0);
    assert_eq!(account.influence, 100);
    assert!(account.vote_history.is_empty());

    assert!(!t.arena.votes.undo(&vote.id).await.unwrap());
}

#[tokio::test]
async fn test_favourite_beats_underdog() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;

    let mut snapshot: WorldSnapshot = t.arena.export_world().await.unwrap();
    for c in snapshot.competitors.iter_mut().filter(|c| c.id == b.id) {
        c.rating = 1400;
        c.rating_history.last_mut().unwrap().rating = 1400;
    }
    t.arena.import_world(snapshot).await.unwrap();

    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let outcome = t
        .arena
        .votes
        .record(&m.id, &b.id, &VoterId::new("device-1"))
        .await
        .unwrap();
    let vote = outcome.vote().unwrap();
    assert_eq!(vote.winner_rating_before, 1400);
    assert_eq!(vote.winner_rating_after, 1408);
    assert_eq!(vote.loser_rating_after, 1192);
    assert_eq!(vote.influence_gained, 1);
}

#[tokio::test]
async fn test_second_vote_is_rejected_without_mutation() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let voter = VoterId::new("device-1");

    t.arena.votes.record(&m.id, &a.id, &voter).await.unwrap();
    let before = t.arena.export_world().await.unwrap();
    let account_before = t.arena.accounts.get(&voter).await.unwrap();

    for winner in [&a.id, &b.id] {
        assert_eq!(
            t.arena.votes.record(&m.id, winner, &voter).await.unwrap(),
            CastOutcome::Rejected(Rejection::AlreadyVoted)
        );
    }

    assert_eq!(t.arena.export_world().await.unwrap(), before);
    assert_eq!(t.arena.accounts.get(&voter).await.unwrap(), account_before);
}

#[tokio::test]
async fn test_undo_after_deadline_changes_nothing() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let voter = VoterId::new("device-1");
    let vote = t
        .arena
        .votes
        .record(&m.id, &a.id, &voter)
        .await
        .unwrap()
        .vote()
        .cloned()
        .unwrap();
    let before = t.arena.export_world().await.unwrap();

    t.clock.advance_ms(5_001);
    assert!(!t.arena.votes.undo(&vote.id).await.unwrap());
    assert_eq!(t.arena.export_world().await.unwrap(), before);
    assert_eq!(t.arena.accounts.get(&voter).await.unwrap().vote_count, 1);
}

#[tokio::test]
async fn test_undo_exactly_at_deadline_is_allowed() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let vote = t
        .arena
        .votes
        .record(&m.id, &a.id, &VoterId::new("device-1"))
        .await
        .unwrap()
        .vote()
        .cloned()
        .unwrap();

    t.clock.advance_ms(5_000);
    assert!(t.arena.votes.undo(&vote.id).await.unwrap());
}

#[tokio::test]
async fn test_repeated_explicit_matchups_are_distinct() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let m = t
            .arena
            .matchups
            .create(Some(a.id.clone()), Some(b.id.clone()))
            .await
            .unwrap();
        ids.push(m.id);
    }
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
    assert_eq!(t.arena.analytics().await.unwrap().total_matchups, 3);
}

#[tokio::test]
async fn test_deleted_competitor_leaves_readable_history() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let voter = VoterId::new("device-1");
    let vote = t
        .arena
        .votes
        .record(&m.id, &a.id, &voter)
        .await
        .unwrap()
        .vote()
        .cloned()
        .unwrap();

    assert!(t.arena.competitors.delete(&b.id).await.unwrap());

    assert_eq!(t.arena.matchups.get(&m.id).await.unwrap(), m);
    let recent = t.arena.votes.recent(10).await.unwrap();
    assert_eq!(recent, vec![vote.clone()]);
    let leaderboard = t.arena.competitors.leaderboard().await.unwrap();
    assert_eq!(leaderboard.len(), 1);

    // Undo still reverses the surviving side and the voter's counters.
    assert!(t.arena.votes.undo(&vote.id).await.unwrap());
    let winner = t.arena.competitors.get(&a.id).await.unwrap().view.competitor;
    assert_eq!(winner.rating, 1200);
    assert_eq!(t.arena.accounts.get(&voter).await.unwrap().influence, 100);

    // Voting on the dangling matchup reports the missing competitor.
    let err = t
        .arena
        .votes
        .record(&m.id, &a.id, &voter)
        .await
        .unwrap_err();
    assert!(matches!(err, clash_arena::LedgerError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_duplicate_votes_record_once() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();

    // A second arena over the same file behaves like another process.
    let other = Arena::new(
        Arc::new(Repository::new(init_db(&t.db_path).await.unwrap())),
        LedgerParams::default(),
        Arc::new(t.clock.clone()),
    );

    let voter = VoterId::new("device-1");
    let mut handles = Vec::new();
    for i in 0..8 {
        let arena = if i % 2 == 0 {
            t.arena.clone()
        } else {
            other.clone()
        };
        let winner = if i % 3 == 0 { a.id.clone() } else { b.id.clone() };
        let (matchup, voter) = (m.id.clone(), voter.clone());
        handles.push(tokio::spawn(async move {
            arena.votes.record(&matchup, &winner, &voter).await.unwrap()
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            CastOutcome::Recorded(_) => recorded += 1,
            CastOutcome::Rejected(reason) => assert_eq!(reason, Rejection::AlreadyVoted),
        }
    }
    assert_eq!(recorded, 1);

    let account = t.arena.accounts.get(&voter).await.unwrap();
    assert_eq!(account.vote_count, 1);
    let ratings: i64 = t
        .arena
        .competitors
        .list()
        .await
        .unwrap()
        .iter()
        .map(|c| c.competitor.rating)
        .sum();
    assert_eq!(ratings, 2400);
}

#[tokio::test]
async fn test_claimed_achievements_are_revoked_by_undo() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    let voter = VoterId::new("device-1");
    let vote = t
        .arena
        .votes
        .record(&m.id, &a.id, &voter)
        .await
        .unwrap()
        .vote()
        .cloned()
        .unwrap();

    let unlocked = t.arena.accounts.claim_achievements(&voter).await.unwrap();
    assert!(unlocked.iter().any(|a| a.id == "first_vote"));

    assert!(t.arena.votes.undo(&vote.id).await.unwrap());
    let account = t.arena.accounts.get(&voter).await.unwrap();
    assert!(!account.unlocked_achievement_ids.contains("first_vote"));
    assert!(!account.unlocked_achievement_ids.contains("collector"));
}

#[tokio::test]
async fn test_stored_rating_history_keeps_latest_fifty() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();

    for i in 0..60 {
        t.clock.advance_ms(1);
        let voter = VoterId::new(format!("device-{}", i));
        assert!(t
            .arena
            .votes
            .record(&m.id, &a.id, &voter)
            .await
            .unwrap()
            .vote()
            .is_some());
    }

    for id in [&a.id, &b.id] {
        let c = t.arena.competitors.get(id).await.unwrap().view.competitor;
        assert_eq!(c.rating_history.len(), 50);
        assert_eq!(c.rating_history.last().unwrap().rating, c.rating);
        assert_eq!(c.record.total_matches, 60);
        // Oldest points were dropped: the creation point is gone.
        assert!(c.rating_history[0].timestamp > TimeMs::new(START_MS));
    }

    let exported = t.arena.export_world().await.unwrap();
    assert!(exported
        .competitors
        .iter()
        .all(|c| c.rating_history.len() == 50));
}

#[tokio::test]
async fn test_import_refuses_out_of_range_rating() {
    let t = setup_arena().await;
    let a = create(&t.arena, "A").await;
    let b = create(&t.arena, "B").await;
    let before = t.arena.export_world().await.unwrap();

    let mut snapshot = before.clone();
    for c in snapshot.competitors.iter_mut().filter(|c| c.id == a.id) {
        c.rating = i64::MIN;
        c.rating_history.last_mut().unwrap().rating = i64::MIN;
    }
    let err = t.arena.import_world(snapshot).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(t.arena.export_world().await.unwrap(), before);

    let m = t
        .arena
        .matchups
        .create(Some(a.id.clone()), Some(b.id.clone()))
        .await
        .unwrap();
    assert!(t
        .arena
        .votes
        .record(&m.id, &b.id, &VoterId::new("device-1"))
        .await
        .unwrap()
        .vote()
        .is_some());
}
