/*!
 * Transaction Guards
 *
 * Transactional boundaries: commit on success, automatic rollback otherwise
 */

use super::scope::{settle, ScopeError};
use super::traits::{Guard, GuardDrop, Recoverable};
use super::{GuardError, GuardMetadata, GuardResult};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction in progress
    Active,
    /// Transaction committed successfully
    Committed,
    /// Transaction rolled back
    RolledBack,
    /// Transaction poisoned (panic during execution)
    Poisoned,
}

type Finisher<Op, E> = Box<dyn Fn(&[Op]) -> Result<(), E> + Send + Sync>;

/// Transaction guard with automatic rollback
///
/// Operations are staged with [`add_operation`](Self::add_operation) and
/// handed to the commit or rollback function exactly once. Dropping an
/// unfinished transaction rolls it back.
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::TransactionGuard;
///
/// let tx = TransactionGuard::<&str, String>::new(|_ops| Ok(()), |_ops| Ok(()));
/// let staged = tx
///     .scope(|tx| {
///         tx.add_operation("insert").map_err(|e| e.to_string())?;
///         Ok(tx.operations().len())
///     })
///     .unwrap();
/// assert_eq!(staged, 1);
/// ```
pub struct TransactionGuard<Op, E = GuardError>
where
    E: fmt::Display,
{
    state: TransactionState,
    operations: Vec<Op>,
    commit_fn: Finisher<Op, E>,
    rollback_fn: Finisher<Op, E>,
    metadata: GuardMetadata,
    poison_reason: Option<String>,
}

impl<Op, E> TransactionGuard<Op, E>
where
    E: fmt::Display,
{
    /// Create a new transaction guard
    pub fn new<C, R>(commit_fn: C, rollback_fn: R) -> Self
    where
        C: Fn(&[Op]) -> Result<(), E> + Send + Sync + 'static,
        R: Fn(&[Op]) -> Result<(), E> + Send + Sync + 'static,
    {
        let metadata = GuardMetadata::new("transaction");
        debug!(tx_id = %metadata.id, "transaction begun");

        Self {
            state: TransactionState::Active,
            operations: Vec::new(),
            commit_fn: Box::new(commit_fn),
            rollback_fn: Box::new(rollback_fn),
            metadata,
            poison_reason: None,
        }
    }

    fn ensure_active(&self, to: &str) -> GuardResult<()> {
        if self.state != TransactionState::Active {
            return Err(GuardError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Stage an operation
    pub fn add_operation(&mut self, operation: Op) -> GuardResult<()> {
        self.ensure_active("Active")?;
        self.operations.push(operation);
        Ok(())
    }

    /// Execute a function within the transaction
    ///
    /// If the function panics, the transaction is marked as poisoned
    pub fn execute<F, R>(&mut self, f: F) -> GuardResult<R>
    where
        F: FnOnce(&mut Self) -> GuardResult<R>,
    {
        self.ensure_active("Active")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(self)));

        match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.mark_poisoned(format!("Panic during transaction: {}", reason));
                Err(GuardError::Poisoned(
                    self.poison_reason.clone().unwrap_or_default(),
                ))
            }
        }
    }

    /// Commit the transaction
    ///
    /// A failed commit rolls the staged operations back before the commit
    /// error is returned.
    pub fn commit(mut self) -> GuardResult<()> {
        self.ensure_active("Committed")?;
        self.do_commit()
            .map_err(|(e, _)| GuardError::OperationFailed(e.to_string()))
    }

    /// Manually roll back the transaction
    pub fn rollback(mut self) -> GuardResult<()> {
        if !matches!(
            self.state,
            TransactionState::Active | TransactionState::Poisoned
        ) {
            return Err(GuardError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: "RolledBack".to_string(),
            });
        }
        self.do_rollback()
            .map_err(|e| GuardError::OperationFailed(e.to_string()))
    }

    /// Run `body` as a transactional boundary
    ///
    /// Commits when `body` returns `Ok`, rolls back when it returns `Err`
    /// or panics. A rollback failure alongside a body error is attached as
    /// suppressed; a commit failure after a successful body is the release
    /// error, with a failure of the rollback that follows it as suppressed.
    pub fn scope<T, B>(mut self, body: B) -> Result<T, ScopeError<E>>
    where
        B: FnOnce(&mut Self) -> Result<T, E>,
    {
        if self.state != TransactionState::Active {
            return Err(ScopeError::AlreadyReleased);
        }

        match body(&mut self) {
            Ok(value) => match self.do_commit() {
                Ok(()) => Ok(value),
                Err((error, suppressed)) => Err(ScopeError::Release { error, suppressed }),
            },
            Err(error) => {
                let rolled_back = self.do_rollback();
                settle(Err(error), rolled_back)
            }
        }
    }

    /// Commit, rolling back on failure; the second slot of the error is
    /// the rollback failure, if the rollback failed too
    fn do_commit(&mut self) -> Result<(), (E, Option<E>)> {
        match (self.commit_fn)(&self.operations) {
            Ok(()) => {
                self.state = TransactionState::Committed;
                info!(
                    tx_id = %self.metadata.id,
                    operations = self.operations.len(),
                    "transaction committed"
                );
                Ok(())
            }
            Err(commit_err) => match self.do_rollback() {
                Ok(()) => Err((commit_err, None)),
                Err(rollback_err) => {
                    error!(
                        tx_id = %self.metadata.id,
                        commit_error = %commit_err,
                        rollback_error = %rollback_err,
                        "rollback after failed commit also failed"
                    );
                    Err((commit_err, Some(rollback_err)))
                }
            },
        }
    }

    fn mark_poisoned(&mut self, reason: String) {
        warn!(tx_id = %self.metadata.id, reason = %reason, "transaction poisoned");
        self.state = TransactionState::Poisoned;
        self.poison_reason = Some(reason);
    }

    /// Internal rollback; the transaction is finished whatever the outcome
    fn do_rollback(&mut self) -> Result<(), E> {
        let result = (self.rollback_fn)(&self.operations);
        self.state = TransactionState::RolledBack;
        info!(
            tx_id = %self.metadata.id,
            operations = self.operations.len(),
            ok = result.is_ok(),
            "transaction rolled back"
        );
        result
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn operations(&self) -> &[Op] {
        &self.operations
    }
}

impl<Op: Send, E: fmt::Display> Guard for TransactionGuard<Op, E> {
    fn resource_type(&self) -> &'static str {
        "transaction"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        matches!(
            self.state,
            TransactionState::Active | TransactionState::Poisoned
        )
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.is_active() {
            return Err(GuardError::AlreadyReleased);
        }
        self.do_rollback()
            .map_err(|e| GuardError::Release(e.to_string()))
    }
}

impl<Op: Send, E: fmt::Display> GuardDrop for TransactionGuard<Op, E> {
    fn on_drop(&mut self) {
        drop_rollback(self);
    }
}

fn drop_rollback<Op, E: fmt::Display>(tx: &mut TransactionGuard<Op, E>) {
    if matches!(
        tx.state,
        TransactionState::Active | TransactionState::Poisoned
    ) {
        info!(
            tx_id = %tx.metadata.id,
            operations = tx.operations.len(),
            "transaction auto-rolling back"
        );
        if let Err(e) = tx.do_rollback() {
            error!(tx_id = %tx.metadata.id, error = %e, "transaction rollback failed");
        }
    }
}

impl<Op: Send, E: fmt::Display> Recoverable for TransactionGuard<Op, E> {
    fn is_poisoned(&self) -> bool {
        self.state == TransactionState::Poisoned
    }

    fn recover(&mut self) -> GuardResult<()> {
        if self.state != TransactionState::Poisoned {
            return Ok(());
        }

        self.do_rollback()
            .map_err(|e| GuardError::Release(e.to_string()))?;
        self.poison_reason = None;
        Ok(())
    }

    fn poison_reason(&self) -> Option<&str> {
        self.poison_reason.as_deref()
    }

    fn poison(&mut self, reason: String) {
        self.mark_poisoned(reason);
    }
}

impl<Op, E: fmt::Display> Drop for TransactionGuard<Op, E> {
    fn drop(&mut self) {
        drop_rollback(self);
    }
}
