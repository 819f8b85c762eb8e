/*!
 * Scope Execution
 *
 * Run a body of work between acquire and release, and settle the outcome
 */

use super::scoped::ScopedGuard;
use super::GuardState;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Failure of a scoped unit of work
///
/// The body's error always wins. A release failure that happens while a body
/// error is in flight is kept in `suppressed`, never discarded. A release
/// that fails and then fails again while compensating (a rejected commit
/// whose rollback also fails) keeps the second error the same way.
#[derive(Debug, Error)]
pub enum ScopeError<E> {
    /// Acquire failed; nothing was obtained and release never ran
    #[error("acquisition failed: {0}")]
    Acquire(E),

    /// The body failed; release ran before this was returned
    #[error("scope body failed: {error}")]
    Body { error: E, suppressed: Option<E> },

    /// The body succeeded but release failed
    #[error("release failed: {error}")]
    Release { error: E, suppressed: Option<E> },

    /// The guard was already released before the body could run
    #[error("guard already released")]
    AlreadyReleased,
}

impl<E> ScopeError<E> {
    /// The error the caller should act on
    pub fn primary(&self) -> Option<&E> {
        match self {
            ScopeError::Acquire(e) => Some(e),
            ScopeError::Body { error, .. } | ScopeError::Release { error, .. } => Some(error),
            ScopeError::AlreadyReleased => None,
        }
    }

    /// Secondary error attached to the primary one, if any
    pub fn suppressed(&self) -> Option<&E> {
        match self {
            ScopeError::Body { suppressed, .. } | ScopeError::Release { suppressed, .. } => {
                suppressed.as_ref()
            }
            _ => None,
        }
    }

    pub fn into_primary(self) -> Option<E> {
        match self {
            ScopeError::Acquire(e) => Some(e),
            ScopeError::Body { error, .. } | ScopeError::Release { error, .. } => Some(error),
            ScopeError::AlreadyReleased => None,
        }
    }

    /// State the guard was left in
    ///
    /// A failed acquire never leaves `Unacquired`; every other failure
    /// happens after release has run.
    pub fn guard_state(&self) -> GuardState {
        match self {
            ScopeError::Acquire(_) => GuardState::Unacquired,
            _ => GuardState::Released,
        }
    }

    pub fn is_acquire(&self) -> bool {
        matches!(self, ScopeError::Acquire(_))
    }

    pub fn is_body(&self) -> bool {
        matches!(self, ScopeError::Body { .. })
    }

    pub fn is_release(&self) -> bool {
        matches!(self, ScopeError::Release { .. })
    }

    /// Convert the carried errors into another type
    pub fn map<U, M>(self, mut f: M) -> ScopeError<U>
    where
        M: FnMut(E) -> U,
    {
        match self {
            ScopeError::Acquire(e) => ScopeError::Acquire(f(e)),
            ScopeError::Body { error, suppressed } => ScopeError::Body {
                error: f(error),
                suppressed: suppressed.map(f),
            },
            ScopeError::Release { error, suppressed } => ScopeError::Release {
                error: f(error),
                suppressed: suppressed.map(f),
            },
            ScopeError::AlreadyReleased => ScopeError::AlreadyReleased,
        }
    }
}

/// Combine a body outcome with its release outcome
pub(crate) fn settle<T, E: fmt::Display>(
    outcome: Result<T, E>,
    released: Result<(), E>,
) -> Result<T, ScopeError<E>> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(ScopeError::Release {
            error: release_err,
            suppressed: None,
        }),
        (Err(error), Ok(())) => Err(ScopeError::Body {
            error,
            suppressed: None,
        }),
        (Err(error), Err(release_err)) => {
            warn!(
                body_error = %error,
                release_error = %release_err,
                "release failed while body error was in flight"
            );
            Err(ScopeError::Body {
                error,
                suppressed: Some(release_err),
            })
        }
    }
}

/// Acquire a resource, run `body` with it, and release it
///
/// `release` runs exactly once when `acquire` succeeded, whether `body`
/// returns `Ok`, returns `Err`, or panics. It never runs when `acquire` fails.
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::{scoped, ScopeError};
///
/// let result: Result<i32, ScopeError<String>> = scoped(
///     || Ok("resource"),
///     |_r| Ok(()),
///     |_r| Err("boom".to_string()),
/// );
/// assert_eq!(result.unwrap_err().primary().map(String::as_str), Some("boom"));
/// ```
pub fn scoped<R, T, E, A, F, B>(acquire: A, release: F, body: B) -> Result<T, ScopeError<E>>
where
    A: FnOnce() -> Result<R, E>,
    F: FnOnce(R) -> Result<(), E>,
    B: FnOnce(&mut R) -> Result<T, E>,
    E: fmt::Display,
{
    let guard = ScopedGuard::acquire(acquire, release).map_err(ScopeError::Acquire)?;
    guard.run(body)
}
