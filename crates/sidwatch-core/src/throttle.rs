//! Alert throttling: every failure is logged, but only every Nth failure of a
//! kind is sent to the notifier.
//!
//! Counters live in [`FailureCounters`], owned by the caller and passed in on
//! each report. A counter is reset only when it reaches the threshold; a
//! success in between does not reset it.

use std::fmt;

use tracing::{error, warn};

use crate::notify::Notifier;

pub const DEFAULT_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The data source was unreachable or returned the sentinel.
    Fetch,
    /// The checkpoint could not be written.
    Persist,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch",
            FailureKind::Persist => "persist",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureCounters {
    fetch: u32,
    persist: u32,
}

impl FailureCounters {
    pub fn get(&self, kind: FailureKind) -> u32 {
        match kind {
            FailureKind::Fetch => self.fetch,
            FailureKind::Persist => self.persist,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn slot(&mut self, kind: FailureKind) -> &mut u32 {
        match kind {
            FailureKind::Fetch => &mut self.fetch,
            FailureKind::Persist => &mut self.persist,
        }
    }
}

pub struct AlertThrottle<N> {
    notifier: N,
    threshold: u32,
}

impl<N: Notifier> AlertThrottle<N> {
    /// A zero threshold is treated as 1 (notify on every failure).
    pub fn new(notifier: N, threshold: u32) -> Self {
        Self {
            notifier,
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Record one failure. Returns `true` if this report reached the
    /// threshold and was handed to the notifier.
    pub async fn report(
        &self,
        counters: &mut FailureCounters,
        kind: FailureKind,
        message: &str,
    ) -> bool {
        let count = counters.slot(kind);
        *count += 1;
        error!(kind = %kind, count = *count, "{message}");

        if *count < self.threshold {
            return false;
        }
        *count = 0;

        if let Err(e) = self.notifier.notify(message).await {
            warn!(kind = %kind, error = %e, "failed to deliver alert");
        }
        true
    }
}
