/*!
 * Utility Guard Tests
 *
 * File handles, configuration scopes and error suppression
 */

use pretty_assertions::assert_eq;
use scoped_guard::core::guard::*;
use std::fmt;
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};

#[test]
fn test_file_guard_writes_and_closes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readings.csv");

    let mut out = FileGuard::create(&path).unwrap();
    writeln!(out.file_mut().unwrap(), "nm,absorbance").unwrap();
    writeln!(out.file_mut().unwrap(), "532,0.41").unwrap();
    out.close().unwrap();

    let mut contents = String::new();
    FileGuard::open(&path)
        .unwrap()
        .file_mut()
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "nm,absorbance\n532,0.41\n");
}

#[test]
fn test_file_guard_append_keeps_existing_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.log");
    std::fs::write(&path, "first\n").unwrap();

    {
        let mut journal = FileGuard::append(&path).unwrap();
        journal.file_mut().unwrap().write_all(b"second\n").unwrap();
    }

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn test_file_guard_failed_open_has_nothing_to_release() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileGuard::open(dir.path().join("missing.csv")).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[derive(Debug, Clone, PartialEq)]
struct PlotStyle {
    theme: String,
    line_width: f32,
}

fn default_style() -> PlotStyle {
    PlotStyle {
        theme: "default".into(),
        line_width: 1.0,
    }
}

#[test]
fn test_config_scope_restores_nested_changes() {
    let style = shared(default_style());

    {
        let _dark = ConfigScope::enter(&style, |s| s.theme = "dark".into());
        {
            let _bold = ConfigScope::enter(&style, |s| s.line_width = 3.0);
            assert_eq!(
                *style.read(),
                PlotStyle {
                    theme: "dark".into(),
                    line_width: 3.0
                }
            );
        }
        assert_eq!(style.read().line_width, 1.0);
        assert_eq!(style.read().theme, "dark");
    }

    assert_eq!(*style.read(), default_style());
}

#[test]
fn test_config_scope_restores_after_panic() {
    let style = shared(default_style());

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _scope = ConfigScope::replace(
            &style,
            PlotStyle {
                theme: "print".into(),
                line_width: 0.5,
            },
        );
        panic!("renderer crashed");
    }));

    assert!(result.is_err());
    assert_eq!(*style.read(), default_style());
}

#[test]
fn test_config_scope_explicit_restore() {
    let counter = shared(1u64);
    let scope = ConfigScope::enter(&counter, |c| *c += 41);
    assert_eq!(scope.previous(), Some(&1));
    assert_eq!(*counter.read(), 42);

    scope.restore();
    assert_eq!(*counter.read(), 1);
}

#[derive(Debug, PartialEq)]
enum CleanupError {
    Missing,
    Locked,
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupError::Missing => f.write_str("missing"),
            CleanupError::Locked => f.write_str("locked"),
        }
    }
}

#[test]
fn test_suppress_if_swallows_only_matching_errors() {
    let missing = suppress_if(
        |e: &CleanupError| *e == CleanupError::Missing,
        || Err::<(), _>(CleanupError::Missing),
    );
    assert_eq!(missing, Ok(None));

    let locked = suppress_if(
        |e: &CleanupError| *e == CleanupError::Missing,
        || Err::<(), _>(CleanupError::Locked),
    );
    assert_eq!(locked, Err(CleanupError::Locked));

    let done = suppress_if(|_: &CleanupError| true, || Ok::<_, CleanupError>(5));
    assert_eq!(done, Ok(Some(5)));
}

#[test]
fn test_suppress_real_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let removed = suppress(|| std::fs::remove_file(dir.path().join("stale.lock")));
    assert!(removed.is_none());
}
