/*!
 * Instrument Session Tests
 *
 * Connect/activate/measure scenarios against the simulated instrument
 */

use pretty_assertions::assert_eq;
use scoped_guard::core::guard::*;
use scoped_guard::sim::{Instrument, InstrumentError, Step};

#[test]
fn test_session_measures_then_tears_down() {
    let spectrometer = Instrument::new("uv-vis");

    let connection = spectrometer.connection().unwrap();
    let readings = spectrometer
        .activation()
        .unwrap()
        .run(|device| {
            [250, 500]
                .into_iter()
                .map(|nm| device.measure(nm))
                .collect::<Result<Vec<_>, _>>()
        })
        .unwrap();
    assert!(spectrometer.is_connected());
    assert!(!spectrometer.is_active());
    connection.close().unwrap();

    assert_eq!(readings, vec![4.0, 2.0]);
    assert_eq!(
        spectrometer.log(),
        vec!["connect", "activate", "measure", "measure", "deactivate", "disconnect"]
    );
}

#[test]
fn test_measurement_fault_still_releases_everything() {
    let spectrometer = Instrument::new("uv-vis");
    spectrometer.inject_fault(Step::Measure);

    let outcome = scoped(
        || spectrometer.connect().map(|()| &spectrometer),
        |device| device.disconnect(),
        |device| {
            scoped(
                || device.activate().map(|()| *device),
                |device| device.deactivate(),
                |device| device.measure(532),
            )
            .map_err(|e| e.into_primary().unwrap_or(InstrumentError::NotActive("?".into())))
        },
    );

    let err = outcome.unwrap_err();
    assert!(err.is_body());
    assert!(matches!(
        err.primary(),
        Some(InstrumentError::Fault {
            step: Step::Measure,
            ..
        })
    ));
    assert!(!spectrometer.is_connected());
    assert_eq!(
        spectrometer.log(),
        vec!["connect", "activate", "measure", "deactivate", "disconnect"]
    );
}

#[test]
fn test_failed_connect_never_disconnects() {
    let spectrometer = Instrument::new("uv-vis");
    spectrometer.inject_fault(Step::Connect);

    let err = spectrometer.connection().unwrap_err();
    assert_eq!(
        err,
        InstrumentError::Fault {
            name: "uv-vis".into(),
            step: Step::Connect
        }
    );
    assert_eq!(spectrometer.log(), vec!["connect"]);
}

#[test]
fn test_teardown_fault_surfaces_as_release_error() {
    let spectrometer = Instrument::new("uv-vis");
    spectrometer.inject_fault(Step::Disconnect);

    let err = spectrometer
        .connection()
        .unwrap()
        .run(|device| Ok(device.name().to_string()))
        .unwrap_err();

    assert!(err.is_release());
    assert_eq!(
        err.to_string(),
        "release failed: disconnect failed on instrument uv-vis"
    );
}

#[test]
fn test_body_error_beats_teardown_fault() {
    let spectrometer = Instrument::new("uv-vis");
    spectrometer.inject_fault(Step::Deactivate);

    let _connection = spectrometer.connection().unwrap();
    let err = spectrometer
        .activation()
        .unwrap()
        .run(|device| device.measure(5000))
        .unwrap_err();

    assert_eq!(err.primary(), Some(&InstrumentError::OutOfRange(5000)));
    assert!(matches!(
        err.suppressed(),
        Some(InstrumentError::Fault {
            step: Step::Deactivate,
            ..
        })
    ));
}
