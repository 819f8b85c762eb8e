/*!
 * Guard Monitoring
 * Lifecycle events, in-memory collection and tracing setup
 */

mod collector;
mod events;
mod tracer;

pub use collector::Collector;
pub use events::{Event, EventKind, Severity};
pub use tracer::{init_tracing, span_scope, ScopeSpan};
