/*!
 * Scoped Guard Tests
 *
 * Exactly-once release and error precedence
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use scoped_guard::core::guard::*;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum TestError {
    Value(String),
    Close(String),
    Open(String),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Value(m) => write!(f, "ValueError: {}", m),
            TestError::Close(m) => write!(f, "CloseError: {}", m),
            TestError::Open(m) => write!(f, "OpenError: {}", m),
        }
    }
}

/// A resource "R" whose open/close calls are recorded
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

#[test]
fn test_body_value_is_returned_and_resource_closed() {
    let journal = Journal::default();
    let (open, close) = (journal.clone(), journal.clone());

    let result = scoped(
        move || {
            open.push("open R");
            Ok::<_, TestError>("R")
        },
        move |_| {
            close.push("close R");
            Ok(())
        },
        |_| Ok(42),
    );

    assert_eq!(result.unwrap(), 42);
    assert_eq!(journal.entries(), vec!["open R", "close R"]);
}

#[test]
fn test_body_error_propagates_after_close() {
    let journal = Journal::default();
    let (open, close, body) = (journal.clone(), journal.clone(), journal.clone());

    let result: Result<(), ScopeError<TestError>> = scoped(
        move || {
            open.push("open R");
            Ok("R")
        },
        move |_| {
            close.push("close R");
            Ok(())
        },
        move |_| {
            body.push("raise");
            Err(TestError::Value("bad reading".into()))
        },
    );

    let err = result.unwrap_err();
    assert!(err.is_body());
    assert_eq!(err.primary(), Some(&TestError::Value("bad reading".into())));
    assert_eq!(journal.entries(), vec!["open R", "raise", "close R"]);
}

#[test]
fn test_failed_acquire_never_releases() {
    let journal = Journal::default();
    let close = journal.clone();

    let result: Result<(), ScopeError<TestError>> = scoped(
        || Err::<&str, _>(TestError::Open("busy".into())),
        move |_| {
            close.push("close R");
            Ok(())
        },
        |_| Ok(()),
    );

    let err = result.unwrap_err();
    assert!(err.is_acquire());
    assert_eq!(err.guard_state(), GuardState::Unacquired);
    assert_eq!(journal.count("close R"), 0);
}

#[test]
fn test_release_error_surfaces_when_body_succeeds() {
    let result: Result<u8, ScopeError<TestError>> = scoped(
        || Ok(()),
        |_| Err(TestError::Close("handle leaked".into())),
        |_| Ok(1),
    );

    let err = result.unwrap_err();
    assert!(err.is_release());
    assert_eq!(err.primary(), Some(&TestError::Close("handle leaked".into())));
}

#[test]
fn test_body_error_wins_and_release_error_is_kept() {
    let result: Result<u8, ScopeError<TestError>> = scoped(
        || Ok(()),
        |_| Err(TestError::Close("handle leaked".into())),
        |_| Err(TestError::Value("bad reading".into())),
    );

    let err = result.unwrap_err();
    assert_eq!(err.primary(), Some(&TestError::Value("bad reading".into())));
    assert_eq!(
        err.suppressed(),
        Some(&TestError::Close("handle leaked".into()))
    );
    assert_eq!(err.to_string(), "scope body failed: ValueError: bad reading");
}

#[test]
fn test_nested_scopes_release_inner_first() {
    let journal = Journal::default();
    let (a_open, a_close) = (journal.clone(), journal.clone());
    let (b_open, b_close) = (journal.clone(), journal.clone());

    let result: Result<(), ScopeError<TestError>> = scoped(
        move || {
            a_open.push("acquire A");
            Ok(())
        },
        move |_| {
            a_close.push("release A");
            Ok(())
        },
        move |_| {
            scoped(
                move || {
                    b_open.push("acquire B");
                    Ok(())
                },
                move |_| {
                    b_close.push("release B");
                    Ok(())
                },
                |_| Err(TestError::Value("inner".into())),
            )
            .map_err(|e| e.into_primary().unwrap_or(TestError::Value("released".into())))
        },
    );

    assert_eq!(
        result.unwrap_err().primary(),
        Some(&TestError::Value("inner".into()))
    );
    assert_eq!(
        journal.entries(),
        vec!["acquire A", "acquire B", "release B", "release A"]
    );
}

#[test]
fn test_early_return_releases() {
    let journal = Journal::default();

    fn first_positive(journal: &Journal, values: &[i32]) -> Option<i32> {
        let close = journal.clone();
        let guard = ScopedGuard::acquire(|| Ok::<_, TestError>(()), move |_| {
            close.push("close");
            Ok(())
        })
        .ok()?;
        for v in values {
            if *v > 0 {
                return Some(*v);
            }
        }
        drop(guard);
        None
    }

    assert_eq!(first_positive(&journal, &[-1, 3, 5]), Some(3));
    assert_eq!(journal.count("close"), 1);
}

#[test]
fn test_released_guard_is_not_reused() {
    let journal = Journal::default();
    let close = journal.clone();
    let mut guard = ScopedGuard::new("R", move |_| {
        close.push("close R");
        Ok::<_, TestError>(())
    });

    assert_eq!(guard.state(), GuardState::Acquired);
    guard.release().unwrap();
    assert_eq!(guard.state(), GuardState::Released);
    assert_eq!(guard.release(), Err(GuardError::AlreadyReleased));
    assert!(guard.resource_mut().is_err());
    drop(guard);

    assert_eq!(journal.count("close R"), 1);
}
