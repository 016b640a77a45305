//! The reconciliation loop.
//!
//! Startup runs baseline establishment: the checkpoint is cleared, the first
//! valid fingerprint is persisted, and the job is restarted unconditionally.
//! After a settle delay the steady-state loop polls on `poll_interval`:
//!
//! ```text
//! fetch ── sentinel/error ──► report fetch failure
//!   │
//!   ▼
//! compare with checkpoint ── equal ──► "unchanged"
//!   │ changed
//!   ▼
//! persist ── failure ──► report persist failure, sleep retry_interval, persist again
//!   │ ok
//!   ▼
//! restart (exactly once)
//! ```
//!
//! Everything runs on one control flow: a cycle's restart returns before the
//! next cycle's fetch begins. Failure counters belong to the [`Reconciler`]
//! and are handed to the [`AlertThrottle`] on each report.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::ScheduleConfig;
use crate::fingerprint::Fingerprint;
use crate::notify::Notifier;
use crate::restart::ActionInvoker;
use crate::source::{FingerprintSource, Snapshot};
use crate::throttle::{AlertThrottle, FailureCounters, FailureKind};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub poll_interval: Duration,
    pub retry_interval: Duration,
    pub settle: Duration,
    pub baseline_retry: Duration,
}

impl Schedule {
    /// No pauses at all. Useful for driving the loop in tests.
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            retry_interval: Duration::ZERO,
            settle: Duration::ZERO,
            baseline_retry: Duration::ZERO,
        }
    }
}

impl From<&ScheduleConfig> for Schedule {
    fn from(cfg: &ScheduleConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            retry_interval: Duration::from_secs(cfg.retry_interval_secs),
            settle: Duration::from_secs(cfg.settle_secs),
            baseline_retry: Duration::from_secs(cfg.baseline_retry_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// StepOutcome
// ---------------------------------------------------------------------------

/// What one steady-state cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// No valid fingerprint; nothing was compared or persisted.
    FetchFailed { reason: String },
    Unchanged { fingerprint: Fingerprint },
    /// The new fingerprint was persisted after `persist_attempts` tries and
    /// the job was restarted.
    Changed {
        previous: Fingerprint,
        current: Fingerprint,
        persist_attempts: u32,
    },
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<S, C, A, N> {
    source: S,
    store: C,
    invoker: A,
    throttle: AlertThrottle<N>,
    counters: FailureCounters,
    schedule: Schedule,
    job: String,
}

impl<S, C, A, N> Reconciler<S, C, A, N>
where
    S: FingerprintSource,
    C: CheckpointStore,
    A: ActionInvoker,
    N: Notifier,
{
    pub fn new(
        source: S,
        store: C,
        invoker: A,
        throttle: AlertThrottle<N>,
        schedule: Schedule,
        job: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            invoker,
            throttle,
            counters: FailureCounters::default(),
            schedule,
            job: job.into(),
        }
    }

    pub fn counters(&self) -> &FailureCounters {
        &self.counters
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn invoker(&self) -> &A {
        &self.invoker
    }

    pub fn throttle(&self) -> &AlertThrottle<N> {
        &self.throttle
    }

    /// Baseline, settle, then poll forever. Returns only if the surrounding
    /// task is cancelled.
    pub async fn run(&mut self) {
        info!(job = %self.job, "reconciler starting");
        self.establish_baseline().await;
        tokio::time::sleep(self.schedule.settle).await;
        loop {
            tokio::time::sleep(self.schedule.poll_interval).await;
            self.step().await;
        }
    }

    /// Clear the checkpoint, then retry until a valid fingerprint has been
    /// persisted, and restart the job once. Returns the persisted value.
    /// Both fetch and persist failures refetch after `baseline_retry`.
    pub async fn establish_baseline(&mut self) -> Fingerprint {
        self.counters.reset();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear checkpoint before baseline");
        }

        loop {
            let Ok(snapshot) = self.fetch().await else {
                tokio::time::sleep(self.schedule.baseline_retry).await;
                continue;
            };
            info!(
                fingerprint = %snapshot.fingerprint,
                services = ?snapshot.services,
                products = ?snapshot.products,
                "baseline snapshot"
            );

            if self.persist_once(&snapshot).await {
                self.trigger_restart().await;
                info!(fingerprint = %snapshot.fingerprint, "baseline established");
                return snapshot.fingerprint;
            }
            tokio::time::sleep(self.schedule.baseline_retry).await;
        }
    }

    /// One fetch/compare/persist/restart cycle against the stored checkpoint.
    pub async fn step(&mut self) -> StepOutcome {
        let snapshot = match self.fetch().await {
            Ok(snapshot) => snapshot,
            Err(reason) => return StepOutcome::FetchFailed { reason },
        };

        let previous = match self.store.read() {
            Ok(fp) => fp,
            Err(e) => {
                warn!(error = %e, "failed to read checkpoint; treating as empty");
                Fingerprint::sentinel()
            }
        };

        if snapshot.fingerprint == previous {
            info!(fingerprint = %previous, "checkpoint unchanged");
            return StepOutcome::Unchanged {
                fingerprint: previous,
            };
        }

        info!(
            current = %snapshot.fingerprint,
            previous = %previous,
            services = ?snapshot.services,
            products = ?snapshot.products,
            "checkpoint changed"
        );

        let mut attempts = 1;
        while !self.persist_once(&snapshot).await {
            tokio::time::sleep(self.schedule.retry_interval).await;
            attempts += 1;
        }
        self.trigger_restart().await;

        StepOutcome::Changed {
            previous,
            current: snapshot.fingerprint,
            persist_attempts: attempts,
        }
    }

    /// A valid snapshot, or the reported failure message.
    async fn fetch(&mut self) -> Result<Snapshot, String> {
        let message = match self.source.fetch().await {
            Ok(snapshot) if !snapshot.fingerprint.is_sentinel() => return Ok(snapshot),
            Ok(snapshot) => format!(
                "data source returned no rows (fingerprint {})",
                snapshot.fingerprint
            ),
            Err(e) => format!("data source fetch failed: {e}"),
        };
        self.throttle
            .report(&mut self.counters, FailureKind::Fetch, &message)
            .await;
        Err(message)
    }

    async fn persist_once(&mut self, snapshot: &Snapshot) -> bool {
        let message = match self.store.write(&snapshot.fingerprint) {
            Ok(true) => return true,
            Ok(false) => format!(
                "checkpoint refused fingerprint {}",
                snapshot.fingerprint
            ),
            Err(e) => format!(
                "cannot save checkpoint (fingerprint {}): {e}",
                snapshot.fingerprint
            ),
        };
        self.throttle
            .report(&mut self.counters, FailureKind::Persist, &message)
            .await;
        false
    }

    async fn trigger_restart(&self) {
        debug!(job = %self.job, "invoking restart action");
        if let Err(e) = self.invoker.restart(&self.job).await {
            error!(job = %self.job, error = %e, "restart action failed");
        }
    }
}
