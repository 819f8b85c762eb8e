/*!
 * Guard Traits
 *
 * Core abstractions for scoped resource guards
 */

use super::{GuardError, GuardMetadata, GuardResult, GuardState};

/// Core guard trait
///
/// All guards must implement this to provide:
/// - Resource type identification
/// - Metadata access
/// - Manual release capability
///
/// `release` is the type-erased exit path used by composite and observable
/// guards. Implementations must run their cleanup at most once and answer
/// every later call with [`GuardError::AlreadyReleased`].
pub trait Guard: Send {
    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    /// Get guard metadata
    fn metadata(&self) -> &GuardMetadata;

    /// Check if guard still holds its resource
    fn is_active(&self) -> bool;

    /// Current lifecycle state
    fn state(&self) -> GuardState {
        if self.is_active() {
            GuardState::Acquired
        } else {
            GuardState::Released
        }
    }

    /// Manually release the resource
    ///
    /// Returns `Err` if already released or if cleanup failed
    fn release(&mut self) -> GuardResult<()>;
}

impl<G: Guard + ?Sized> Guard for Box<G> {
    fn resource_type(&self) -> &'static str {
        (**self).resource_type()
    }

    fn metadata(&self) -> &GuardMetadata {
        (**self).metadata()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn state(&self) -> GuardState {
        (**self).state()
    }

    fn release(&mut self) -> GuardResult<()> {
        (**self).release()
    }
}

/// Guards that can be dropped with custom cleanup
///
/// Separates Drop logic for better testability and observability
pub trait GuardDrop: Guard {
    /// Perform cleanup on drop
    ///
    /// # Panics
    ///
    /// Should NOT panic. Log errors instead.
    fn on_drop(&mut self);
}

/// Guards that can recover from poisoned state
pub trait Recoverable: Guard {
    /// Check if guard is poisoned
    fn is_poisoned(&self) -> bool;

    /// Attempt to recover from poisoned state
    fn recover(&mut self) -> GuardResult<()>;

    /// Get poison reason if poisoned
    fn poison_reason(&self) -> Option<&str>;

    /// Mark as poisoned with a reason
    fn poison(&mut self, reason: String);
}

/// Guards with observable lifecycle
pub trait Observable: Guard {
    fn emit_created(&self);

    fn emit_used(&self, operation: &str);

    fn emit_released(&self);

    fn emit_error(&self, error: &GuardError);
}
