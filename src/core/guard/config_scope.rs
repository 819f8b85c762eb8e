/*!
 * Configuration Scopes
 *
 * Temporarily override shared settings and restore them on exit
 */

use super::traits::Guard;
use super::{GuardError, GuardMetadata, GuardResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Settings shared between the code that reads them and the scopes that override them
pub type SharedConfig<T> = Arc<RwLock<T>>;

/// Wrap settings for use with [`ConfigScope`]
pub fn shared<T>(value: T) -> SharedConfig<T> {
    Arc::new(RwLock::new(value))
}

/// Guard that overrides shared settings for the duration of a scope
///
/// The value seen at entry is snapshotted and written back on exit. Nested
/// scopes restore in reverse order, so the outermost original survives.
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::{shared, ConfigScope};
///
/// #[derive(Clone)]
/// struct PrintOptions { precision: usize }
///
/// let options = shared(PrintOptions { precision: 8 });
/// {
///     let _scope = ConfigScope::enter(&options, |o| o.precision = 3);
///     assert_eq!(options.read().precision, 3);
/// }
/// assert_eq!(options.read().precision, 8);
/// ```
pub struct ConfigScope<T: Clone> {
    target: SharedConfig<T>,
    previous: Option<T>,
    metadata: GuardMetadata,
}

impl<T: Clone> ConfigScope<T> {
    /// Snapshot the current settings and apply `apply` to them
    pub fn enter<F>(target: &SharedConfig<T>, apply: F) -> Self
    where
        F: FnOnce(&mut T),
    {
        let previous = {
            let mut current = target.write();
            let previous = (*current).clone();
            apply(&mut *current);
            previous
        };
        let metadata = GuardMetadata::new("config_scope");
        debug!(guard_id = %metadata.id, "configuration override applied");

        Self {
            target: Arc::clone(target),
            previous: Some(previous),
            metadata,
        }
    }

    /// Replace the settings wholesale for the duration of the scope
    pub fn replace(target: &SharedConfig<T>, value: T) -> Self {
        Self::enter(target, move |current| *current = value)
    }

    /// Settings as they were when the scope was entered
    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// Restore the snapshot now
    pub fn restore(mut self) {
        self.restore_once();
    }

    fn restore_once(&mut self) -> bool {
        match self.previous.take() {
            Some(previous) => {
                *self.target.write() = previous;
                debug!(guard_id = %self.metadata.id, "configuration restored");
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Send + Sync> Guard for ConfigScope<T> {
    fn resource_type(&self) -> &'static str {
        "config_scope"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.previous.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        if self.restore_once() {
            Ok(())
        } else {
            Err(GuardError::AlreadyReleased)
        }
    }
}

impl<T: Clone> Drop for ConfigScope<T> {
    fn drop(&mut self) {
        self.restore_once();
    }
}
