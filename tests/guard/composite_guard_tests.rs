/*!
 * Composite Guard Tests
 *
 * Nested guard chains and LIFO release
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use scoped_guard::core::guard::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type Log = Arc<Mutex<Vec<String>>>;

fn enter_logged(chain: &mut CompositeGuard<'_>, log: &Log, name: &'static str) -> GuardResult<()> {
    let on_acquire = log.clone();
    let on_release = log.clone();
    chain.enter(
        name,
        move || {
            on_acquire.lock().push(format!("acquire {}", name));
            Ok::<_, String>(())
        },
        move |_| {
            on_release.lock().push(format!("release {}", name));
            Ok(())
        },
    )
}

#[test]
fn test_three_level_chain_releases_lifo() {
    let log: Log = Arc::default();

    {
        let mut chain = CompositeGuard::new();
        enter_logged(&mut chain, &log, "power").unwrap();
        enter_logged(&mut chain, &log, "cooling").unwrap();
        enter_logged(&mut chain, &log, "shutter").unwrap();
        assert_eq!(chain.guard_names(), vec!["power", "cooling", "shutter"]);
    }

    assert_eq!(
        *log.lock(),
        vec![
            "acquire power",
            "acquire cooling",
            "acquire shutter",
            "release shutter",
            "release cooling",
            "release power",
        ]
    );
}

#[test]
fn test_body_failure_still_releases_lifo() {
    let log: Log = Arc::default();
    let mut chain = CompositeGuard::new();
    enter_logged(&mut chain, &log, "A").unwrap();
    enter_logged(&mut chain, &log, "B").unwrap();

    let body_log = log.clone();
    let result = chain.run(|_| {
        body_log.lock().push("body raises".to_string());
        Err::<(), _>(GuardError::OperationFailed("ValueError".into()))
    });

    let err = result.unwrap_err();
    assert!(err.is_body());
    assert_eq!(err.suppressed(), None);
    assert_eq!(
        *log.lock(),
        vec![
            "acquire A",
            "acquire B",
            "body raises",
            "release B",
            "release A"
        ]
    );
}

#[test]
fn test_body_panic_releases_lifo() {
    let log: Log = Arc::default();
    let mut chain = CompositeGuard::new();
    enter_logged(&mut chain, &log, "A").unwrap();
    enter_logged(&mut chain, &log, "B").unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        chain.run(|_| -> GuardResult<()> { panic!("detector overflow") })
    }));

    assert!(outcome.is_err());
    assert_eq!(
        *log.lock(),
        vec!["acquire A", "acquire B", "release B", "release A"]
    );
}

#[test]
fn test_nested_scoped_panic_releases_inner_first() {
    let log: Log = Arc::default();
    let push = |entry: &str| log.lock().push(entry.to_string());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        scoped(
            || Ok::<_, String>(push("acquire A")),
            |_| Ok(push("release A")),
            |_| {
                scoped(
                    || Ok(push("acquire B")),
                    |_| Ok(push("release B")),
                    |_| -> Result<(), String> { panic!("detector overflow") },
                )
                .map_err(|e| e.to_string())
            },
        )
    }));

    assert!(outcome.is_err());
    assert_eq!(
        *log.lock(),
        vec!["acquire A", "acquire B", "release B", "release A"]
    );
}

#[test]
fn test_inner_acquisition_failure_releases_outer() {
    let log: Log = Arc::default();

    let attempt = || -> GuardResult<()> {
        let mut chain = CompositeGuard::new();
        enter_logged(&mut chain, &log, "outer")?;
        chain.enter(
            "inner",
            || Err::<(), _>("device busy".to_string()),
            |_| Ok(()),
        )?;
        unreachable!("inner acquisition must fail");
    };

    assert_eq!(
        attempt(),
        Err(GuardError::Acquisition("inner: device busy".into()))
    );
    assert_eq!(*log.lock(), vec!["acquire outer", "release outer"]);
}

#[test]
fn test_release_failures_do_not_stop_the_chain() {
    let log: Log = Arc::default();
    let mut chain = CompositeGuard::new();
    enter_logged(&mut chain, &log, "outer").unwrap();
    chain
        .enter("flaky", || Ok::<_, String>(()), |_| Err("stuck".to_string()))
        .unwrap();

    let errors = chain.release_all();
    assert_eq!(errors, vec![GuardError::Release("stuck".into())]);
    assert_eq!(*log.lock(), vec!["acquire outer", "release outer"]);
    assert_eq!(chain.release(), Err(GuardError::AlreadyReleased));
}

#[test]
fn test_release_error_after_successful_body() {
    let mut chain = CompositeGuard::new();
    chain
        .enter("flaky", || Ok::<_, String>(()), |_| Err("stuck".to_string()))
        .unwrap();

    let err = chain.run(|_| Ok(7)).unwrap_err();
    assert!(err.is_release());
    assert_eq!(err.primary(), Some(&GuardError::Release("stuck".into())));
}

#[test]
fn test_mixed_guard_types() {
    let dir = tempfile::tempdir().unwrap();
    let settings = shared(10u32);

    let file = FileGuard::create(dir.path().join("out.txt")).unwrap();
    let scope = ConfigScope::enter(&settings, |v| *v = 99);

    let mut chain = CompositeGuardBuilder::new()
        .with("file", file)
        .with("settings", scope)
        .build();
    assert_eq!(*settings.read(), 99);
    assert!(chain.is_active());

    chain.release().unwrap();
    assert_eq!(*settings.read(), 10);
    assert!(!chain.is_active());
}
