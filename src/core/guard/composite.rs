/*!
 * Composite Guards
 *
 * Nested guard chains entered outer-to-inner and released inner-to-outer
 */

use super::scope::{settle, ScopeError};
use super::scoped::ScopedGuard;
use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use std::fmt;
use tracing::{debug, error, warn};

/// Composite guard that manages multiple guards as one
///
/// Guards are held in acquisition order and released in reverse (LIFO).
/// If acquiring an inner guard fails, every guard already in the chain is
/// still released when the composite is released or dropped.
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::{CompositeGuard, GuardResult};
///
/// fn chain() -> GuardResult<()> {
///     let mut chain = CompositeGuard::new();
///     chain.enter("power", || Ok::<_, String>(()), |_| Ok(()))?;
///     chain.enter("shutter", || Ok::<_, String>(()), |_| Ok(()))?;
///     // shutter released first, then power
///     Ok(())
/// }
/// chain().unwrap();
/// ```
pub struct CompositeGuard<'a> {
    guards: Vec<(String, Box<dyn Guard + 'a>)>,
    metadata: GuardMetadata,
    active: bool,
}

impl<'a> CompositeGuard<'a> {
    /// Create a new empty composite guard
    pub fn new() -> Self {
        Self {
            guards: Vec::new(),
            metadata: GuardMetadata::new("composite"),
            active: true,
        }
    }

    /// Add a guard to the composite
    ///
    /// A guard added to a chain that was already released is released on
    /// the spot instead of joining it.
    pub fn add<G: Guard + 'a>(mut self, guard: G) -> Self {
        if let Err(e) = self.push(guard) {
            warn!(composite_id = %self.metadata.id, error = %e, "guard added to released chain");
        }
        self
    }

    /// Push a guard as the new innermost entry
    ///
    /// Fails with `AlreadyReleased` once the chain has been released; the
    /// rejected guard is dropped, which releases it.
    pub fn push<G: Guard + 'a>(&mut self, guard: G) -> GuardResult<()> {
        if !self.active {
            return Err(GuardError::AlreadyReleased);
        }
        let name = guard.resource_type().to_string();
        self.push_named(name, Box::new(guard));
        Ok(())
    }

    fn push_named(&mut self, name: String, guard: Box<dyn Guard + 'a>) {
        debug!(
            composite_id = %self.metadata.id,
            guard = %name,
            depth = self.guards.len() + 1,
            "guard entered chain"
        );
        self.guards.push((name, guard));
    }

    /// Acquire a resource and push its guard as the new innermost entry
    ///
    /// On acquisition failure nothing is pushed; guards already in the
    /// chain stay held until the composite is released.
    pub fn enter<R, A, F, E>(
        &mut self,
        label: &'static str,
        acquire: A,
        release: F,
    ) -> GuardResult<()>
    where
        R: Send + 'a,
        A: FnOnce() -> Result<R, E>,
        F: FnOnce(R) -> Result<(), E> + Send + 'a,
        E: fmt::Display + 'a,
    {
        if !self.active {
            return Err(GuardError::AlreadyReleased);
        }
        let guard = ScopedGuard::acquire_labeled(label, acquire, release)
            .map_err(|e| GuardError::Acquisition(format!("{}: {}", label, e)))?;
        self.push_named(label.to_string(), Box::new(guard));
        Ok(())
    }

    /// Get number of guards in the composite
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Check if composite is empty
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Names of the guards in acquisition order
    pub fn guard_names(&self) -> Vec<&str> {
        self.guards.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Check if all guards are active
    pub fn all_active(&self) -> bool {
        self.guards.iter().all(|(_, g)| g.is_active())
    }

    /// Release all guards in reverse order (LIFO)
    ///
    /// Continues even if some guards fail, collecting all errors.
    /// Guards that were already released individually are skipped.
    pub fn release_all(&mut self) -> Vec<GuardError> {
        let mut errors = Vec::new();

        for (name, guard) in self.guards.iter_mut().rev() {
            if !guard.is_active() {
                continue;
            }
            if let Err(e) = guard.release() {
                error!(composite_id = %self.metadata.id, guard = %name, error = %e, "chain release failed");
                errors.push(e);
            }
        }

        self.active = false;
        errors
    }

    /// Run `body` inside the chain, then release every guard
    ///
    /// A body error is primary; release errors raised alongside it are
    /// attached as suppressed (several become [`GuardError::Aggregate`]).
    pub fn run<T, B>(mut self, body: B) -> Result<T, ScopeError<GuardError>>
    where
        B: FnOnce(&mut Self) -> GuardResult<T>,
    {
        if !self.active {
            return Err(ScopeError::AlreadyReleased);
        }
        let outcome = body(&mut self);
        let released = match GuardError::from_many(self.release_all()) {
            None => Ok(()),
            Some(e) => Err(e),
        };
        settle(outcome, released)
    }
}

impl Default for CompositeGuard<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Guard for CompositeGuard<'_> {
    fn resource_type(&self) -> &'static str {
        "composite"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.active && self.all_active()
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.active {
            return Err(GuardError::AlreadyReleased);
        }

        match GuardError::from_many(self.release_all()) {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

impl GuardDrop for CompositeGuard<'_> {
    fn on_drop(&mut self) {
        // Walk the whole chain even after release_all; it skips guards that
        // are no longer active
        if self.guards.iter().any(|(_, guard)| guard.is_active()) {
            let errors = self.release_all();
            if !errors.is_empty() {
                error!(
                    composite_id = %self.metadata.id,
                    error_count = errors.len(),
                    "composite guard drop had release errors"
                );
            }
        }
    }
}

impl Drop for CompositeGuard<'_> {
    fn drop(&mut self) {
        self.on_drop();
    }
}

/// Builder for composite guards with named guards
pub struct CompositeGuardBuilder<'a> {
    guards: Vec<(String, Box<dyn Guard + 'a>)>,
}

impl<'a> CompositeGuardBuilder<'a> {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Add a named guard; later guards are inner to earlier ones
    pub fn with<G: Guard + 'a>(mut self, name: impl Into<String>, guard: G) -> Self {
        self.guards.push((name.into(), Box::new(guard)));
        self
    }

    pub fn build(self) -> CompositeGuard<'a> {
        let mut composite = CompositeGuard::new();
        for (name, guard) in self.guards {
            composite.push_named(name, guard);
        }
        composite
    }
}

impl Default for CompositeGuardBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
