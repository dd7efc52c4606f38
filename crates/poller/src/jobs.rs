//! Background polling: one driver task per tournament, owned by a
//! [`JobRegistry`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use scoring::dto::RoundCalculation;
use scoring::services::{Notifier, ScoreCalculator, ScoringRules};
use scoring::{Database, MemoryStore, ScoreStore};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PollSettings;
use crate::error::{PollerError, Result};
use crate::provider::{LeaderboardProvider, TournamentKey};
use crate::sync::{SyncReport, SyncService};

/// Hands the driver a store for one iteration.
#[async_trait]
pub trait StoreSource: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn ScoreStore>>;
}

#[async_trait]
impl StoreSource for Database {
    async fn acquire(&self) -> Result<Arc<dyn ScoreStore>> {
        // Surfaces pool exhaustion before any work starts.
        drop(self.pool().acquire().await?);
        Ok(Arc::new(self.store()))
    }
}

#[async_trait]
impl StoreSource for Arc<MemoryStore> {
    async fn acquire(&self) -> Result<Arc<dyn ScoreStore>> {
        let store: Arc<dyn ScoreStore> = self.clone();
        Ok(store)
    }
}

/// Everything a driver needs, shared with the task that runs it.
#[derive(Clone)]
pub struct PollContext {
    pub stores: Arc<dyn StoreSource>,
    pub provider: Arc<dyn LeaderboardProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub rules: Arc<ScoringRules>,
    pub settings: PollSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    OutsideActiveHours { hour: u32 },
    OutsideTournamentDates { day: NaiveDate },
    Polled {
        sync: SyncReport,
        calculation: RoundCalculation,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    Cancelled,
    TooManyFailures(u32),
}

const RETRY_ATTEMPTS: usize = 4;

/// One driver iteration at local time `now`: sync the current round and
/// recalculate it. Pool exhaustion is retried with backoff; any other error
/// is returned as is.
pub async fn poll_once(
    ctx: &PollContext,
    tournament_id: Uuid,
    lock: &AsyncMutex<()>,
    now: NaiveDateTime,
) -> Result<PollOutcome> {
    let hour = now.hour();
    if !ctx.settings.active_hours.contains(hour) {
        debug!(%tournament_id, hour, "Outside active hours, skipping poll");
        return Ok(PollOutcome::OutsideActiveHours { hour });
    }

    // 100ms, 200ms, 400ms, 800ms
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(50)
        .max_delay(Duration::from_secs(5))
        .take(RETRY_ATTEMPTS);

    RetryIf::start(
        strategy,
        || poll_tournament(ctx, tournament_id, lock, now.date()),
        |e: &PollerError| {
            let retry = e.is_pool_exhausted();
            if retry {
                warn!(%tournament_id, "Connection pool exhausted, retrying poll");
            }
            retry
        },
    )
    .await
}

async fn poll_tournament(
    ctx: &PollContext,
    tournament_id: Uuid,
    lock: &AsyncMutex<()>,
    day: NaiveDate,
) -> Result<PollOutcome> {
    let store = ctx.stores.acquire().await?;
    let tournament = store.tournament(tournament_id).await?;
    if !tournament.is_active_on(day) {
        debug!(%tournament_id, %day, "Tournament not in progress, skipping poll");
        return Ok(PollOutcome::OutsideTournamentDates { day });
    }

    let _guard = lock.lock().await;
    let sync = SyncService::new(store.as_ref(), ctx.provider.as_ref());
    let tournament = sync
        .sync_tournament(&TournamentKey::from(&tournament))
        .await?;
    let report = sync
        .sync_round(&tournament, tournament.current_round())
        .await?;

    let calculator = ScoreCalculator::new(store.as_ref(), &ctx.rules, ctx.notifier.as_ref());
    let calculation = calculator
        .calculate_scores_for_tournament(tournament.tournament_id, Some(report.round_id))
        .await?;

    Ok(PollOutcome::Polled {
        sync: report,
        calculation,
    })
}

/// Polls every `interval` until cancelled, or until
/// `max_consecutive_failures` iterations in a row have failed.
pub async fn run_driver(
    ctx: PollContext,
    tournament_id: Uuid,
    lock: Arc<AsyncMutex<()>>,
    token: CancellationToken,
) -> DriverExit {
    let max_failures = ctx.settings.max_consecutive_failures.max(1);
    let mut failures = 0;
    info!(
        %tournament_id,
        interval_secs = ctx.settings.interval.as_secs(),
        "Started poll job (active hours: {:02}:00 - {:02}:59)",
        ctx.settings.active_hours.start,
        ctx.settings.active_hours.stop
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!(%tournament_id, "Poll job cancelled");
                return DriverExit::Cancelled;
            }
            _ = tokio::time::sleep(ctx.settings.interval) => {}
        }

        let now = Local::now().naive_local();
        match poll_once(&ctx, tournament_id, &lock, now).await {
            Ok(PollOutcome::Polled { sync, calculation }) => {
                failures = 0;
                info!(
                    %tournament_id,
                    round_id = sync.round_id,
                    scorecards = sync.scorecards_fetched,
                    updated = calculation.report().map_or(0, |r| r.entries_updated),
                    "Poll complete"
                );
            }
            Ok(_) => failures = 0,
            Err(e) => {
                failures += 1;
                error!(%tournament_id, failures, "Poll failed: {}", e);
                if failures >= max_failures {
                    error!(
                        %tournament_id,
                        "Too many consecutive errors ({}). Stopping job.", failures
                    );
                    return DriverExit::TooManyFailures(failures);
                }
            }
        }
    }
}

struct Job {
    token: CancellationToken,
    handle: JoinHandle<DriverExit>,
}

/// Running poll jobs, at most one per tournament, and the per-tournament
/// lock that serializes polls with manual recalculation.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, Job>>,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Uuid, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tournament_lock(&self, tournament_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(tournament_id)
            .or_default()
            .clone()
    }

    /// Spawns the driver for `tournament_id`. A job that stopped on its own
    /// is replaced.
    pub fn start(&self, ctx: PollContext, tournament_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs();
        if jobs
            .get(&tournament_id)
            .is_some_and(|job| !job.handle.is_finished())
        {
            return Err(PollerError::JobAlreadyRunning(tournament_id));
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_driver(
            ctx,
            tournament_id,
            self.tournament_lock(tournament_id),
            token.clone(),
        ));
        jobs.insert(tournament_id, Job { token, handle });
        Ok(())
    }

    pub fn is_running(&self, tournament_id: Uuid) -> bool {
        self.jobs()
            .get(&tournament_id)
            .is_some_and(|job| !job.handle.is_finished())
    }

    pub fn running(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .jobs()
            .iter()
            .filter(|(_, job)| !job.handle.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Cancels the job and waits for it. `None` when there was no job.
    pub async fn stop(&self, tournament_id: Uuid) -> Option<DriverExit> {
        let job = self.jobs().remove(&tournament_id)?;
        job.token.cancel();
        match job.handle.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                error!(%tournament_id, "Poll job panicked: {}", e);
                None
            }
        }
    }

    /// Returns how many jobs were stopped.
    pub async fn stop_all(&self) -> usize {
        let jobs: Vec<Job> = self.jobs().drain().map(|(_, job)| job).collect();
        for job in &jobs {
            job.token.cancel();
        }
        let count = jobs.len();
        for job in jobs {
            let _ = job.handle.await;
        }
        info!("Stopped {} poll job(s)", count);
        count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Days;
    use scoring::models::Entry;
    use scoring::services::LogNotifier;
    use serde_json::json;

    use super::*;
    use crate::config::ActiveHours;
    use crate::provider::{FixtureProvider, ProviderLeaderboard, provider_fixture};

    /// Fails with pool exhaustion a set number of times, then hands out the store.
    struct ExhaustedPool {
        store: Arc<MemoryStore>,
        remaining_failures: AtomicU32,
    }

    #[async_trait]
    impl StoreSource for ExhaustedPool {
        async fn acquire(&self) -> Result<Arc<dyn ScoreStore>> {
            if self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(PollerError::DatabaseError(sqlx::Error::PoolTimedOut));
            }
            self.store.acquire().await
        }
    }

    fn leaderboard() -> ProviderLeaderboard {
        serde_json::from_value(json!({"roundId": 1, "leaderboardRows": [
            {"playerId": "p1", "position": "1", "status": "active", "currentRoundScore": "-4"},
            {"playerId": "p2", "position": "7", "status": "active", "currentRoundScore": "-1"}
        ]}))
        .unwrap()
    }

    async fn setup(settings: PollSettings) -> (PollContext, Arc<MemoryStore>, Arc<FixtureProvider>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FixtureProvider::new(&provider_fixture(leaderboard())));
        let tournament = SyncService::new(store.as_ref(), provider.as_ref())
            .sync_tournament(&TournamentKey::new("1", "014", 2025))
            .await
            .unwrap();
        let players = (1..=6).map(|n| format!("p{}", n)).collect();
        store
            .save_entry(&Entry::new(tournament.tournament_id, "Alice", players))
            .await
            .unwrap();

        let ctx = PollContext {
            stores: Arc::new(store.clone()),
            provider: provider.clone(),
            notifier: Arc::new(LogNotifier),
            rules: Arc::new(ScoringRules::default()),
            settings,
        };
        (ctx, store, provider, tournament.tournament_id)
    }

    fn settings(interval: Duration, active_hours: ActiveHours) -> PollSettings {
        PollSettings {
            interval,
            active_hours,
            max_consecutive_failures: 3,
        }
    }

    fn today_at(hour: u32) -> NaiveDateTime {
        Local::now().date_naive().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_poll_skips_outside_active_hours() {
        let (ctx, store, _, tournament_id) =
            setup(settings(Duration::from_secs(60), ActiveHours::new(6, 9).unwrap())).await;
        let lock = AsyncMutex::new(());

        let outcome = poll_once(&ctx, tournament_id, &lock, today_at(12)).await.unwrap();
        assert_eq!(outcome, PollOutcome::OutsideActiveHours { hour: 12 });
        assert!(store.latest_score_snapshot(tournament_id, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poll_skips_outside_tournament_dates() {
        let (ctx, _, _, tournament_id) =
            setup(settings(Duration::from_secs(60), ActiveHours::ALL_DAY)).await;
        let lock = AsyncMutex::new(());
        let later = today_at(12).checked_add_days(Days::new(10)).unwrap();

        let outcome = poll_once(&ctx, tournament_id, &lock, later).await.unwrap();
        assert!(matches!(outcome, PollOutcome::OutsideTournamentDates { .. }));
    }

    #[tokio::test]
    async fn test_poll_syncs_and_scores() {
        let (ctx, store, _, tournament_id) =
            setup(settings(Duration::from_secs(60), ActiveHours::ALL_DAY)).await;
        let lock = AsyncMutex::new(());

        let outcome = poll_once(&ctx, tournament_id, &lock, today_at(12)).await.unwrap();
        let PollOutcome::Polled { sync, calculation } = outcome else {
            panic!("expected a poll, got {:?}", outcome);
        };
        assert_eq!(sync.round_id, 1);
        assert_eq!(calculation.report().unwrap().entries_updated, 1);

        let entry = &store.entries(tournament_id).await.unwrap()[0];
        let score = store.daily_score(entry.entry_id, 1).await.unwrap().unwrap();
        assert_eq!(score.total_points, 8 + 3);
    }

    #[tokio::test]
    async fn test_pool_exhaustion_is_retried() {
        let (mut ctx, store, _, tournament_id) =
            setup(settings(Duration::from_secs(60), ActiveHours::ALL_DAY)).await;
        ctx.stores = Arc::new(ExhaustedPool {
            store,
            remaining_failures: AtomicU32::new(2),
        });
        let lock = AsyncMutex::new(());

        let outcome = poll_once(&ctx, tournament_id, &lock, today_at(12)).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Polled { .. }));
    }

    #[tokio::test]
    async fn test_driver_stops_after_consecutive_failures() {
        let (ctx, _, provider, tournament_id) =
            setup(settings(Duration::from_millis(1), ActiveHours::ALL_DAY)).await;
        provider.set_unavailable(true);

        let exit = run_driver(
            ctx,
            tournament_id,
            Arc::new(AsyncMutex::new(())),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(exit, DriverExit::TooManyFailures(3));
    }

    #[tokio::test]
    async fn test_registry_runs_one_job_per_tournament() {
        let (ctx, _, _, tournament_id) =
            setup(settings(Duration::from_secs(3600), ActiveHours::ALL_DAY)).await;
        let registry = JobRegistry::new();

        registry.start(ctx.clone(), tournament_id).unwrap();
        assert!(registry.is_running(tournament_id));
        assert!(matches!(
            registry.start(ctx, tournament_id),
            Err(PollerError::JobAlreadyRunning(id)) if id == tournament_id
        ));
        assert_eq!(registry.running(), vec![tournament_id]);

        assert_eq!(registry.stop(tournament_id).await, Some(DriverExit::Cancelled));
        assert!(!registry.is_running(tournament_id));
        assert_eq!(registry.stop(tournament_id).await, None);
        assert_eq!(registry.stop_all().await, 0);
    }

    #[test]
    fn test_tournament_lock_is_shared() {
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        assert!(Arc::ptr_eq(&registry.tournament_lock(id), &registry.tournament_lock(id)));
        assert!(!Arc::ptr_eq(
            &registry.tournament_lock(id),
            &registry.tournament_lock(Uuid::new_v4())
        ));
    }
}
