/*!
 * Scoped Guards
 *
 * Pair an acquire step with a guaranteed release step
 */

use super::scope::{settle, ScopeError};
use super::traits::Guard;
use super::{GuardError, GuardMetadata, GuardResult, GuardState};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Slow release threshold in microseconds, 0 = disabled
static SLOW_RELEASE_MICROS: AtomicU64 = AtomicU64::new(0);

/// Set the duration after which a release is reported as slow
pub fn set_slow_release_threshold(threshold: Option<Duration>) {
    let micros = threshold.map_or(0, |t| {
        u64::try_from(t.as_micros().max(1)).unwrap_or(u64::MAX)
    });
    SLOW_RELEASE_MICROS.store(micros, Ordering::Relaxed);
}

/// Current slow release threshold, if enabled
pub fn slow_release_threshold() -> Option<Duration> {
    match SLOW_RELEASE_MICROS.load(Ordering::Relaxed) {
        0 => None,
        micros => Some(Duration::from_micros(micros)),
    }
}

/// Guard owning one acquired resource and its release operation
///
/// The release operation runs exactly once: on [`close`](Self::close),
/// at the end of [`run`](Self::run), through [`Guard::release`], or on drop,
/// whichever comes first. Drop covers early returns and panics.
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::ScopedGuard;
///
/// let guard = ScopedGuard::acquire(
///     || Ok::<_, String>(String::from("socket")),
///     |s| {
///         assert_eq!(s, "socket");
///         Ok(())
///     },
/// )?;
/// assert_eq!(guard.resource().unwrap(), "socket");
/// guard.close()?;
/// # Ok::<(), String>(())
/// ```
pub struct ScopedGuard<R, F, E>
where
    F: FnOnce(R) -> Result<(), E>,
    E: fmt::Display,
{
    resource: Option<R>,
    release_fn: Option<F>,
    metadata: GuardMetadata,
    _error: PhantomData<fn() -> E>,
}

impl<R, F, E> ScopedGuard<R, F, E>
where
    F: FnOnce(R) -> Result<(), E>,
    E: fmt::Display,
{
    /// Run `acquire` and guard its result
    ///
    /// On failure the error is returned and `release` is dropped unused.
    pub fn acquire<A>(acquire: A, release: F) -> Result<Self, E>
    where
        A: FnOnce() -> Result<R, E>,
    {
        Self::acquire_labeled("scoped", acquire, release)
    }

    /// Like [`acquire`](Self::acquire) with a resource type label for logs
    pub fn acquire_labeled<A>(label: &'static str, acquire: A, release: F) -> Result<Self, E>
    where
        A: FnOnce() -> Result<R, E>,
    {
        match acquire() {
            Ok(resource) => Ok(Self::armed(label, resource, release)),
            Err(e) => {
                debug!(resource_type = label, error = %e, "acquisition failed");
                Err(e)
            }
        }
    }

    /// Guard an already acquired resource
    pub fn new(resource: R, release: F) -> Self {
        Self::armed("scoped", resource, release)
    }

    fn armed(label: &'static str, resource: R, release: F) -> Self {
        let metadata = GuardMetadata::new(label);
        debug!(guard_id = %metadata.id, resource_type = label, "guard acquired");
        Self {
            resource: Some(resource),
            release_fn: Some(release),
            metadata,
            _error: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.metadata.resource_type = label;
        self
    }

    /// Borrow the resource
    pub fn resource(&self) -> GuardResult<&R> {
        self.resource.as_ref().ok_or(GuardError::AlreadyReleased)
    }

    /// Mutably borrow the resource
    pub fn resource_mut(&mut self) -> GuardResult<&mut R> {
        self.resource.as_mut().ok_or(GuardError::AlreadyReleased)
    }

    #[inline]
    pub fn state(&self) -> GuardState {
        if self.resource.is_some() {
            GuardState::Acquired
        } else {
            GuardState::Released
        }
    }

    #[inline]
    pub fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    /// Release now, surfacing the release error
    ///
    /// A guard already released through [`Guard::release`] has nothing left
    /// to do and returns `Ok(())`.
    pub fn close(mut self) -> Result<(), E> {
        self.release_once().unwrap_or(Ok(()))
    }

    /// Run `body` with the resource, then release it
    ///
    /// Errors follow scope precedence: a body error is primary and a
    /// release error raised alongside it is attached as suppressed.
    pub fn run<T, B>(mut self, body: B) -> Result<T, ScopeError<E>>
    where
        B: FnOnce(&mut R) -> Result<T, E>,
    {
        let outcome = match self.resource.as_mut() {
            Some(resource) => body(resource),
            None => return Err(ScopeError::AlreadyReleased),
        };
        let released = self.release_once().unwrap_or(Ok(()));
        settle(outcome, released)
    }

    /// Invoke the release operation if it has not run yet
    fn release_once(&mut self) -> Option<Result<(), E>> {
        let resource = self.resource.take()?;
        let release = self.release_fn.take()?;

        let started = Instant::now();
        let result = release(resource);
        let elapsed = started.elapsed();

        if let Some(threshold) = slow_release_threshold() {
            if elapsed > threshold {
                warn!(
                    guard_id = %self.metadata.id,
                    resource_type = self.metadata.resource_type,
                    release_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                    slow = true,
                    "slow release detected"
                );
            }
        }

        match &result {
            Ok(()) => debug!(
                guard_id = %self.metadata.id,
                resource_type = self.metadata.resource_type,
                lifetime_us = self.metadata.lifetime_micros(),
                "guard released"
            ),
            Err(e) => warn!(
                guard_id = %self.metadata.id,
                resource_type = self.metadata.resource_type,
                error = %e,
                "guard release failed"
            ),
        }

        Some(result)
    }
}

impl<R, F, E> Guard for ScopedGuard<R, F, E>
where
    R: Send,
    F: FnOnce(R) -> Result<(), E> + Send,
    E: fmt::Display,
{
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.resource.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        match self.release_once() {
            None => Err(GuardError::AlreadyReleased),
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(GuardError::Release(e.to_string())),
        }
    }
}

impl<R, F, E> Drop for ScopedGuard<R, F, E>
where
    F: FnOnce(R) -> Result<(), E>,
    E: fmt::Display,
{
    fn drop(&mut self) {
        if self.resource.is_none() {
            return;
        }
        if std::thread::panicking() {
            warn!(
                guard_id = %self.metadata.id,
                resource_type = self.metadata.resource_type,
                "releasing guard during unwind"
            );
        }
        if let Some(Err(e)) = self.release_once() {
            error!(
                guard_id = %self.metadata.id,
                resource_type = self.metadata.resource_type,
                error = %e,
                "guard drop failed to release resource"
            );
        }
    }
}

impl<R, F, E> fmt::Debug for ScopedGuard<R, F, E>
where
    F: FnOnce(R) -> Result<(), E>,
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedGuard")
            .field("id", &self.metadata.id)
            .field("resource_type", &self.metadata.resource_type)
            .field("state", &self.state())
            .finish()
    }
}
