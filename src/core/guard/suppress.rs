/*!
 * Error Suppression
 *
 * Scopes that swallow expected failures and let the rest propagate
 */

use std::fmt;
use tracing::{debug, warn};

/// Run `body`, turning errors accepted by `pred` into `Ok(None)`
///
/// Errors rejected by `pred` propagate unchanged.
///
/// # Example
///
/// ```rust
/// use scoped_guard::core::guard::suppress_if;
/// use std::io;
///
/// let removed = suppress_if(
///     |e: &io::Error| e.kind() == io::ErrorKind::NotFound,
///     || std::fs::remove_file("/definitely/not/here"),
/// )
/// .unwrap();
/// assert!(removed.is_none());
/// ```
pub fn suppress_if<T, E, P, B>(pred: P, body: B) -> Result<Option<T>, E>
where
    P: FnOnce(&E) -> bool,
    B: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    match body() {
        Ok(value) => Ok(Some(value)),
        Err(e) if pred(&e) => {
            debug!(error = %e, "suppressed expected error");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run `body` and swallow any error, logging it
pub fn suppress<T, E, B>(body: B) -> Option<T>
where
    B: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    match body() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "suppressed error");
            None
        }
    }
}
