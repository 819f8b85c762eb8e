/*!
 * Guard Tour - Main Entry Point
 *
 * Walks through scoped resource management:
 * - Controlling a simulated instrument with nested guards
 * - File handles
 * - Configuration scopes
 * - Transactional boundaries
 * - Error suppression
 */

use miette::{IntoDiagnostic, Result};
use scoped_guard::core::guard::{
    shared, suppress_if, CompositeGuard, ConfigScope, FileGuard, ObservableGuard,
    ScopedGuard,
};
use scoped_guard::monitoring::{span_scope, Collector};
use scoped_guard::sim::{Instrument, InstrumentError, Ledger, LedgerError, LedgerOp, Step};
use scoped_guard::{init_tracing, GuardConfig, GuardError};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = GuardConfig::from_env().into_diagnostic()?;
    config.install();
    init_tracing(&config);

    info!("Guard tour starting...");
    info!("================================================");

    let collector = Arc::new(Collector::with_capacity(config.event_capacity));

    instrument_session()?;
    instrument_fault()?;
    file_handles()?;
    configuration_scope();
    transactions()?;
    suppression()?;
    observed_chain(&collector)?;

    info!("================================================");
    info!(events = collector.len(), "Guard tour complete");
    println!("{}", collector.to_json().into_diagnostic()?);
    Ok(())
}

/// Connect and activate, measure, then tear down in reverse order
fn instrument_session() -> Result<()> {
    let _span = span_scope("instrument_session");
    let spectrometer = Instrument::new("spectrometer-1");

    let connection = spectrometer.connection().into_diagnostic()?;
    let readings = spectrometer
        .activation()
        .into_diagnostic()?
        .run(|device| {
            [400, 532, 650]
                .into_iter()
                .map(|nm| device.measure(nm))
                .collect::<std::result::Result<Vec<_>, InstrumentError>>()
        })
        .into_diagnostic()?;
    connection.close().into_diagnostic()?;

    info!(?readings, log = ?spectrometer.log(), "measurement session finished");
    Ok(())
}

/// A failing measurement still deactivates and disconnects
fn instrument_fault() -> Result<()> {
    let spectrometer = Instrument::new("spectrometer-2");
    spectrometer.inject_fault(Step::Measure);

    let mut chain = CompositeGuard::new();
    {
        let device = Arc::clone(&spectrometer);
        chain
            .enter("connection", move || device.connect().map(|()| device), |d| d.disconnect())
            .into_diagnostic()?;
    }
    {
        let device = Arc::clone(&spectrometer);
        chain
            .enter("activation", move || device.activate().map(|()| device), |d| d.deactivate())
            .into_diagnostic()?;
    }

    let outcome = chain.run(|_| {
        spectrometer
            .measure(532)
            .map_err(|e| GuardError::OperationFailed(e.to_string()))
    });

    match outcome {
        Ok(reading) => info!(reading, "unexpected reading"),
        Err(e) => warn!(error = %e, log = ?spectrometer.log(), "measurement failed, instrument released"),
    }
    Ok(())
}

fn file_handles() -> Result<()> {
    let path = std::env::temp_dir().join("guard-tour-readings.txt");
    let mut file = FileGuard::create(&path).into_diagnostic()?;
    writeln!(file.file_mut().into_diagnostic()?, "532nm 1.8797").into_diagnostic()?;
    file.close().into_diagnostic()?;
    info!(path = %path.display(), "readings written");
    Ok(())
}

#[derive(Clone)]
struct PlotStyle {
    theme: &'static str,
    line_width: f32,
}

fn configuration_scope() {
    let style = shared(PlotStyle {
        theme: "default",
        line_width: 1.0,
    });

    {
        let _dark = ConfigScope::enter(&style, |s| s.theme = "dark");
        let _bold = ConfigScope::enter(&style, |s| s.line_width = 2.5);
        let current = style.read().clone();
        info!(theme = current.theme, line_width = current.line_width, "plotting with temporary style");
    }

    let restored = style.read().clone();
    info!(theme = restored.theme, line_width = restored.line_width, "style restored");
}

fn transactions() -> Result<()> {
    let ledger = Ledger::new();

    ledger
        .transaction()
        .scope(|tx| {
            tx.add_operation(LedgerOp::put("sample-a", 12))?;
            tx.add_operation(LedgerOp::put("sample-b", 7))?;
            Ok(())
        })
        .into_diagnostic()?;

    let rejected = ledger.transaction().scope(|tx| {
        tx.add_operation(LedgerOp::put("sample-c", -1))?;
        Err::<(), _>(LedgerError::Constraint("counts must be positive".into()))
    });
    if let Err(e) = rejected {
        warn!(error = %e, "transaction rolled back");
    }

    info!(entries = ?ledger.snapshot(), "ledger state");
    Ok(())
}

fn suppression() -> Result<()> {
    let stale = std::env::temp_dir().join("guard-tour-stale.lock");
    let removed = suppress_if(
        |e: &io::Error| e.kind() == io::ErrorKind::NotFound,
        || std::fs::remove_file(&stale),
    )
    .into_diagnostic()?;
    info!(removed = removed.is_some(), "stale lock cleanup");
    Ok(())
}

fn observed_chain(collector: &Arc<Collector>) -> Result<()> {
    let buffer = ScopedGuard::new(Vec::<u8>::with_capacity(64), |buf: Vec<u8>| {
        info!(bytes = buf.len(), "buffer returned");
        Ok::<_, InstrumentError>(())
    })
    .with_label("buffer");

    let chain = CompositeGuard::new().add(ObservableGuard::wrap(buffer, Arc::clone(collector)));
    chain
        .run(|chain| {
            info!(guards = ?chain.guard_names(), "inside observed chain");
            Ok(())
        })
        .into_diagnostic()?;
    Ok(())
}
