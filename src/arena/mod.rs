//! Arena services wired around one shared [`Repository`].
//!
//! Each service is cheap to clone and holds the same repository, clock,
//! change feed and write lock. Construct one [`Arena`] at startup and hand its
//! services to whoever needs them.

pub mod accounts;
pub mod competitors;
pub mod events;
pub mod ledger;
pub mod matchups;

pub use accounts::{UserAccounts, VoteExportRow};
pub use competitors::{CompetitorDetail, CompetitorView, EntityStore, LeaderboardEntry};
pub use events::{ChangeFeed, ChangeKind, StateChange};
pub use ledger::VoteLedger;
pub use matchups::MatchupStore;

use backoff::future::retry;
use backoff::ExponentialBackoff;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use crate::clock::Clock;
use crate::db::{Analytics, Repository};
use crate::domain::WorldSnapshot;
use crate::engine::LedgerParams;
use crate::error::LedgerError;

/// State shared by every service.
#[derive(Clone)]
pub(crate) struct Shared {
    pub repo: Arc<Repository>,
    pub params: LedgerParams,
    pub clock: Arc<dyn Clock>,
    pub feed: ChangeFeed,
    write_lock: Arc<Mutex<()>>,
}

impl Shared {
    /// Run a world mutation with in-process writers serialized, retrying
    /// SQLite busy errors with exponential backoff.
    pub async fn write<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let _guard = self.write_lock.lock().await;
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(250),
            max_elapsed_time: Some(Duration::from_secs(2)),
            ..Default::default()
        };

        retry(policy, || {
            let fut = attempt();
            async move {
                fut.await.map_err(|e| {
                    if e.is_transient() {
                        warn!(op, error = %e, "Store busy, retrying");
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }
}

/// Facade over the arena services.
#[derive(Clone)]
pub struct Arena {
    pub competitors: EntityStore,
    pub matchups: MatchupStore,
    pub votes: VoteLedger,
    pub accounts: UserAccounts,
    shared: Shared,
}

impl Arena {
    pub fn new(repo: Arc<Repository>, params: LedgerParams, clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(repo, params, clock, StdRng::from_entropy())
    }

    /// Like [`Arena::new`] with a caller-supplied random source for pairing.
    pub fn with_rng(
        repo: Arc<Repository>,
        params: LedgerParams,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let shared = Shared {
            repo,
            params,
            clock,
            feed: ChangeFeed::default(),
            write_lock: Arc::new(Mutex::new(())),
        };
        Arena {
            competitors: EntityStore::new(shared.clone()),
            matchups: MatchupStore::new(shared.clone(), rng),
            votes: VoteLedger::new(shared.clone()),
            accounts: UserAccounts::new(shared.clone()),
            shared,
        }
    }

    pub fn params(&self) -> &LedgerParams {
        &self.shared.params
    }

    /// Subscribe to committed changes.
    pub fn on_state_changed(&self) -> broadcast::Receiver<StateChange> {
        self.shared.feed.subscribe()
    }

    pub async fn ready(&self) -> Result<(), LedgerError> {
        self.shared.repo.ping().await
    }

    pub async fn analytics(&self) -> Result<Analytics, LedgerError> {
        self.shared.repo.analytics().await
    }

    pub async fn export_world(&self) -> Result<WorldSnapshot, LedgerError> {
        self.shared.repo.export_world().await
    }

    /// Replace the whole world with `snapshot`. Voter accounts are kept.
    pub async fn import_world(&self, snapshot: WorldSnapshot) -> Result<i64, LedgerError> {
        let limit = self.shared.params.history_limit;
        let committed = self
            .shared
            .write("import_world", || {
                self.shared.repo.import_world(snapshot.clone(), limit)
            })
            .await?;
        self.shared
            .feed
            .publish(committed.world_version, ChangeKind::WorldImported);
        Ok(committed.world_version)
    }
}
