/*!
 * Simulated Collaborators
 *
 * Stand-ins for the external systems guards are wrapped around: a
 * laboratory instrument and a transactional key/value ledger.
 */

mod instrument;
mod ledger;

pub use instrument::{Instrument, InstrumentError, Step};
pub use ledger::{Ledger, LedgerError, LedgerOp};
