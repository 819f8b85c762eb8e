/*!
 * Scoped Resource Guards
 *
 * Acquire/use/release with guaranteed cleanup.
 *
 * ## Design Principles
 *
 * 1. **Exactly-once release**: A successful acquire is paired with exactly one release
 * 2. **Error precedence**: Body failures win, release failures are attached, never dropped
 * 3. **LIFO nesting**: Composite guards release inner-to-outer
 * 4. **Observable**: Guards can be wrapped to emit lifecycle events
 *
 * ## Guard Types
 *
 * - **ScopedGuard**: Generic acquire/release pair around a resource
 * - **CompositeGuard**: Nested guard chain released in reverse order
 * - **TransactionGuard**: Commit on success, rollback otherwise
 * - **FileGuard**: File handle flushed and synced on exit
 * - **ConfigScope**: Temporary configuration override, restored on exit
 *
 * ## Example
 *
 * ```rust
 * use scoped_guard::core::guard::scoped;
 *
 * let value = scoped(
 *     || Ok::<_, std::io::Error>(vec![1, 2, 3]),
 *     |_buf| Ok(()),
 *     |buf| Ok(buf.iter().sum::<i32>()),
 * )
 * .unwrap();
 * assert_eq!(value, 6);
 * ```
 */

mod composite;
mod config_scope;
mod file;
mod observe;
mod scope;
mod scoped;
mod suppress;
mod traits;
mod transaction;

pub use composite::{CompositeGuard, CompositeGuardBuilder};
pub use config_scope::{shared, ConfigScope, SharedConfig};
pub use file::FileGuard;
pub use observe::ObservableGuard;
pub use scope::{scoped, ScopeError};
pub use scoped::{set_slow_release_threshold, slow_release_threshold, ScopedGuard};
pub use suppress::{suppress, suppress_if};
pub use traits::{Guard, GuardDrop, Observable, Recoverable};
pub use transaction::{TransactionGuard, TransactionState};

use miette::Diagnostic;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GuardError {
    #[error("Resource already released")]
    #[diagnostic(
        code(guard::already_released),
        help("A released guard is terminal. Acquire a new guard instead of reusing this one.")
    )]
    AlreadyReleased,

    #[error("Acquisition failed: {0}")]
    #[diagnostic(
        code(guard::acquisition_failed),
        help("Nothing was acquired, so no release was attempted.")
    )]
    Acquisition(String),

    #[error("Release failed: {0}")]
    #[diagnostic(
        code(guard::release_failed),
        help("The resource may not have been cleaned up. Check the release operation's logs.")
    )]
    Release(String),

    #[error("Guard is poisoned: {0}")]
    #[diagnostic(code(guard::poisoned), help("Recover or roll back before using the guard again."))]
    Poisoned(String),

    #[error("Invalid state transition: {from} -> {to}")]
    #[diagnostic(code(guard::invalid_transition))]
    InvalidTransition { from: String, to: String },

    #[error("Operation failed: {0}")]
    #[diagnostic(code(guard::operation_failed))]
    OperationFailed(String),

    #[error("{} guard errors: {}", .0.len(), join_errors(.0))]
    #[diagnostic(
        code(guard::aggregate),
        help("Several guards in a chain failed to release. Each error is listed in release order.")
    )]
    Aggregate(Vec<GuardError>),
}

fn join_errors(errors: &[GuardError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl GuardError {
    /// Collapse a list of release errors into one
    ///
    /// Returns `None` for an empty list and the error itself for a single one.
    pub fn from_many(mut errors: Vec<GuardError>) -> Option<GuardError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(GuardError::Aggregate(errors)),
        }
    }
}

/// Lifecycle of a single guard
///
/// `Unacquired -> Acquired -> Released`. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Before acquire, and where a failed acquire leaves the attempt
    Unacquired,
    Acquired,
    Released,
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GuardState::Unacquired => "unacquired",
            GuardState::Acquired => "acquired",
            GuardState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub id: Uuid,
    pub resource_type: &'static str,
    pub creation_time: Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_type,
            creation_time: Instant::now(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        u64::try_from(self.creation_time.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
