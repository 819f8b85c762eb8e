/*!
 * Core Module
 * Scoped resource guards and their error types
 */

pub mod guard;

// Re-export for convenience
pub use guard::{
    scoped, suppress, suppress_if, CompositeGuard, ConfigScope, FileGuard, Guard, GuardError,
    GuardMetadata, GuardResult, GuardState, ObservableGuard, ScopeError, ScopedGuard,
    TransactionGuard, TransactionState,
};
