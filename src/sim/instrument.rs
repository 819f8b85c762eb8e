/*!
 * Simulated Instrument
 *
 * A spectrometer-like device that must be connected, then activated,
 * before it can measure, and deactivated then disconnected afterwards.
 */

use crate::core::guard::ScopedGuard;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// A step of the instrument protocol that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Connect,
    Activate,
    Measure,
    Deactivate,
    Disconnect,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Connect => "connect",
            Step::Activate => "activate",
            Step::Measure => "measure",
            Step::Deactivate => "deactivate",
            Step::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstrumentError {
    #[error("instrument {0} is not connected")]
    NotConnected(String),

    #[error("instrument {0} is not active")]
    NotActive(String),

    #[error("instrument {0} is already connected")]
    AlreadyConnected(String),

    #[error("{step} failed on instrument {name}")]
    Fault { name: String, step: Step },

    #[error("wavelength {0} nm is out of range")]
    OutOfRange(u32),
}

#[derive(Debug, Default)]
struct Status {
    connected: bool,
    active: bool,
}

/// Simulated instrument with fault injection and a call log
pub struct Instrument {
    name: String,
    status: Mutex<Status>,
    faults: Mutex<HashSet<Step>>,
    log: Mutex<Vec<String>>,
}

impl Instrument {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            status: Mutex::new(Status::default()),
            faults: Mutex::new(HashSet::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `step` fail until cleared
    pub fn inject_fault(&self, step: Step) {
        self.faults.lock().insert(step);
    }

    pub fn clear_fault(&self, step: Step) {
        self.faults.lock().remove(&step);
    }

    /// Calls made so far, as "step" entries in order
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.lock().connected
    }

    pub fn is_active(&self) -> bool {
        self.status.lock().active
    }

    fn record(&self, step: Step) -> Result<(), InstrumentError> {
        self.log.lock().push(step.to_string());
        if self.faults.lock().contains(&step) {
            debug!(instrument = %self.name, step = %step, "injected fault");
            return Err(InstrumentError::Fault {
                name: self.name.clone(),
                step,
            });
        }
        Ok(())
    }

    pub fn connect(&self) -> Result<(), InstrumentError> {
        if self.is_connected() {
            return Err(InstrumentError::AlreadyConnected(self.name.clone()));
        }
        self.record(Step::Connect)?;
        self.status.lock().connected = true;
        info!(instrument = %self.name, "connected");
        Ok(())
    }

    pub fn activate(&self) -> Result<(), InstrumentError> {
        if !self.is_connected() {
            return Err(InstrumentError::NotConnected(self.name.clone()));
        }
        self.record(Step::Activate)?;
        self.status.lock().active = true;
        info!(instrument = %self.name, "activated");
        Ok(())
    }

    /// Take a reading at the given wavelength
    pub fn measure(&self, wavelength_nm: u32) -> Result<f64, InstrumentError> {
        if !self.is_active() {
            return Err(InstrumentError::NotActive(self.name.clone()));
        }
        if !(200..=1100).contains(&wavelength_nm) {
            return Err(InstrumentError::OutOfRange(wavelength_nm));
        }
        self.record(Step::Measure)?;
        Ok(1000.0 / f64::from(wavelength_nm))
    }

    pub fn deactivate(&self) -> Result<(), InstrumentError> {
        self.record(Step::Deactivate)?;
        self.status.lock().active = false;
        info!(instrument = %self.name, "deactivated");
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), InstrumentError> {
        self.record(Step::Disconnect)?;
        let mut status = self.status.lock();
        status.connected = false;
        status.active = false;
        info!(instrument = %self.name, "disconnected");
        Ok(())
    }

    /// Guard holding a connection; disconnects on release
    pub fn connection(
        self: &Arc<Self>,
    ) -> Result<
        ScopedGuard<
            Arc<Self>,
            impl FnOnce(Arc<Self>) -> Result<(), InstrumentError> + Send,
            InstrumentError,
        >,
        InstrumentError,
    > {
        let instrument = Arc::clone(self);
        ScopedGuard::acquire_labeled(
            "instrument_connection",
            move || instrument.connect().map(|()| instrument),
            |instrument: Arc<Self>| instrument.disconnect(),
        )
    }

    /// Guard holding an activation; deactivates on release
    pub fn activation(
        self: &Arc<Self>,
    ) -> Result<
        ScopedGuard<
            Arc<Self>,
            impl FnOnce(Arc<Self>) -> Result<(), InstrumentError> + Send,
            InstrumentError,
        >,
        InstrumentError,
    > {
        let instrument = Arc::clone(self);
        ScopedGuard::acquire_labeled(
            "instrument_activation",
            move || instrument.activate().map(|()| instrument),
            |instrument: Arc<Self>| instrument.deactivate(),
        )
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.lock();
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("connected", &status.connected)
            .field("active", &status.active)
            .finish()
    }
}
