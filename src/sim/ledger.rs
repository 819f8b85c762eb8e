/*!
 * Simulated Ledger
 *
 * In-memory key/value store whose writes only land through a committed
 * transaction.
 */

use crate::core::guard::{GuardError, TransactionGuard};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A staged write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Put { key: String, value: i64 },
    Delete { key: String },
}

impl LedgerOp {
    pub fn put(key: impl Into<String>, value: i64) -> Self {
        LedgerOp::Put {
            key: key.into(),
            value,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        LedgerOp::Delete { key: key.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("commit rejected by storage")]
    CommitRejected,

    #[error("transaction error: {0}")]
    Transaction(String),
}

impl From<GuardError> for LedgerError {
    fn from(e: GuardError) -> Self {
        LedgerError::Transaction(e.to_string())
    }
}

/// Transactional in-memory store
#[derive(Clone, Default)]
pub struct Ledger {
    entries: Arc<RwLock<BTreeMap<String, i64>>>,
    reject_commits: Arc<AtomicBool>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.read().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.entries.read().clone()
    }

    /// Make every following commit fail
    pub fn reject_commits(&self, reject: bool) {
        self.reject_commits.store(reject, Ordering::SeqCst);
    }

    /// Begin a transaction; staged operations apply atomically on commit
    pub fn transaction(&self) -> TransactionGuard<LedgerOp, LedgerError> {
        let entries = Arc::clone(&self.entries);
        let reject = Arc::clone(&self.reject_commits);

        TransactionGuard::new(
            move |ops: &[LedgerOp]| {
                if reject.load(Ordering::SeqCst) {
                    return Err(LedgerError::CommitRejected);
                }
                let mut entries = entries.write();
                let mut next = entries.clone();
                for op in ops {
                    match op {
                        LedgerOp::Put { key, value } => {
                            next.insert(key.clone(), *value);
                        }
                        LedgerOp::Delete { key } => {
                            next.remove(key)
                                .ok_or_else(|| LedgerError::NotFound(key.clone()))?;
                        }
                    }
                }
                *entries = next;
                Ok(())
            },
            // Staged operations never touched the store
            |_ops: &[LedgerOp]| Ok(()),
        )
    }
}
