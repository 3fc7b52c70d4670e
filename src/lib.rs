//! PSK Synchronization Front End
//!
//! Coarse frequency, carrier phase and symbol timing recovery for M-PSK
//! receivers working on buffered complex baseband captures.
//!
//! ## Architecture
//!
//! - `domain/` - Pure domain types, configuration and errors
//! - `dsp/` - Signal processing stages (FFT, FIR, NCO, estimators, loops)
//! - `modem/` - The synchronizer that chains the stages together

pub mod domain;
pub mod dsp;
pub mod modem;

pub use domain::{ComplexSample, SampleStream, SyncConfig, SyncError, SyncResult};
pub use modem::{SyncOutput, Synchronizer};
