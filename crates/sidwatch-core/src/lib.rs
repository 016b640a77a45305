//! `sidwatch-core`: change detection for service configuration tables.
//!
//! The watchdog polls two row sets, reduces them to a [`Fingerprint`], and
//! compares it against the last value persisted by a [`CheckpointStore`].
//! When the fingerprint moves, the new value is persisted and the dependent
//! job is restarted through an [`ActionInvoker`].
//!
//! ```text
//! Reconciler ──► FingerprintSource ──► CheckpointStore (compare)
//!     │                                       │ changed
//!     │                                       ▼
//!     │                               CheckpointStore (persist, retry)
//!     │                                       │
//!     ▼                                       ▼
//! AlertThrottle ──► Notifier          ActionInvoker (stop → kill → start)
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod instance;
pub mod io;
pub mod notify;
pub mod reconcile;
pub mod restart;
pub mod source;
pub mod throttle;

pub use checkpoint::{CheckpointStore, FileCheckpoint};
pub use error::{Result, WatchError};
pub use fingerprint::{Fingerprint, HashAlgorithm, RowHasher};
pub use notify::{ConfiguredNotifier, Notifier};
pub use reconcile::{Reconciler, Schedule, StepOutcome};
pub use restart::{ActionInvoker, ScriptRestarter};
pub use source::{FingerprintSource, Snapshot, SqlSource};
pub use throttle::{AlertThrottle, FailureCounters, FailureKind};
