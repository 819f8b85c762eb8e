/*!
 * Observable Guard Wrapper
 *
 * Wraps any guard to record its lifecycle in a collector
 */

use super::traits::{Guard, Observable};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::monitoring::{Collector, Event, EventKind};
use std::sync::Arc;

/// Wrapper that adds observability to any guard
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::{Guard, ObservableGuard, ScopedGuard};
/// use scoped_guard::monitoring::{Collector, EventKind};
/// use std::sync::Arc;
///
/// let collector = Arc::new(Collector::new());
/// let guard = ScopedGuard::new(5u8, |_| Ok::<_, String>(()));
/// let id = guard.metadata().id;
///
/// let mut observable = ObservableGuard::wrap(guard, collector.clone());
/// observable.release().unwrap();
/// assert_eq!(collector.kinds_for(id), vec![EventKind::Created, EventKind::Released]);
/// ```
pub struct ObservableGuard<G: Guard> {
    inner: G,
    collector: Arc<Collector>,
}

impl<G: Guard> ObservableGuard<G> {
    /// Wrap a guard to make it observable
    pub fn wrap(guard: G, collector: Arc<Collector>) -> Self {
        let wrapped = Self {
            inner: guard,
            collector,
        };

        wrapped.emit_created();
        wrapped
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut G {
        &mut self.inner
    }

    /// Execute an operation against the inner guard, recording its use
    pub fn with_operation<F, R>(&mut self, operation: &str, f: F) -> R
    where
        F: FnOnce(&mut G) -> R,
    {
        self.emit_used(operation);
        f(&mut self.inner)
    }

    fn event(&self, kind: EventKind) -> Event {
        let metadata = self.inner.metadata();
        Event::new(metadata.id, self.inner.resource_type(), kind)
    }
}

impl<G: Guard> Observable for ObservableGuard<G> {
    fn emit_created(&self) {
        self.collector.emit(self.event(EventKind::Created));
    }

    fn emit_used(&self, operation: &str) {
        self.collector
            .emit(self.event(EventKind::Used).with_detail(operation));
    }

    fn emit_released(&self) {
        let lifetime = self.inner.metadata().lifetime_micros();
        self.collector
            .emit(self.event(EventKind::Released).with_lifetime(lifetime));
    }

    fn emit_error(&self, error: &GuardError) {
        self.collector
            .emit(self.event(EventKind::Error).with_detail(error.to_string()));
    }
}

impl<G: Guard> Guard for ObservableGuard<G> {
    fn resource_type(&self) -> &'static str {
        self.inner.resource_type()
    }

    fn metadata(&self) -> &GuardMetadata {
        self.inner.metadata()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn release(&mut self) -> GuardResult<()> {
        let result = self.inner.release();
        match &result {
            Ok(()) => self.emit_released(),
            Err(e) => self.emit_error(e),
        }
        result
    }
}

impl<G: Guard> Drop for ObservableGuard<G> {
    fn drop(&mut self) {
        if self.is_active() {
            // Release here so the outcome is recorded before the inner drop
            let _ = self.release();
        }
    }
}
