/*!
 * Scoped Guard Library
 * Acquire/use/release with guaranteed cleanup, plus the built-in scoped
 * utilities: file handles, configuration scopes, transactions, error
 * suppression
 */

pub mod config;
pub mod core;
pub mod monitoring;
pub mod sim;

// Re-exports
pub use config::{ConfigError, GuardConfig};
pub use crate::core::guard::{
    scoped, shared, suppress, suppress_if, CompositeGuard, CompositeGuardBuilder, ConfigScope,
    FileGuard, Guard, GuardError, GuardMetadata, GuardResult, GuardState, ObservableGuard,
    ScopeError, ScopedGuard, SharedConfig, TransactionGuard, TransactionState,
};
pub use monitoring::{init_tracing, Collector};
