//! Receiver front end
//!
//! Chains the DSP stages into one synchronization pass

pub mod synchronizer;

pub use synchronizer::{SyncOutput, Synchronizer};
