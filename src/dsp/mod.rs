//! Digital Signal Processing
//!
//! Pure functions and per-run loop state. No I/O dependencies.

pub mod fft;
pub mod filter;
pub mod nco;
pub mod coarse_freq;
pub mod costas_loop;
pub mod clock_recovery;

// Re-export commonly used items
pub use clock_recovery::{LoopFilter, TimingOutput, TimingRecoveryLoop};
pub use coarse_freq::CoarseFrequencyEstimator;
pub use costas_loop::{CarrierRecoveryLoop, CarrierTrack};
pub use fft::FftProcessor;
pub use filter::{FilterTaps, FirFilter};
pub use nco::Nco;
