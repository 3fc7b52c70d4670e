//! Core domain types

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::error::{SyncError, SyncResult};

/// One baseband I/Q measurement
pub type ComplexSample = Complex64;

/// Reject sample rates that would make every time axis meaningless
pub(crate) fn check_sample_rate(fs: f64) -> SyncResult<()> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(SyncError::Config(format!(
            "sample rate must be positive and finite, got {fs}"
        )))
    }
}

/// A contiguous block of complex samples captured at a fixed rate.
///
/// Index `k` corresponds to time `k / sample_rate`; there are no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStream {
    samples: Vec<ComplexSample>,
    sample_rate: f64,
}

impl SampleStream {
    pub fn new(samples: Vec<ComplexSample>, sample_rate: f64) -> SyncResult<Self> {
        check_sample_rate(sample_rate)?;
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Build a stream from interleaved `(I, Q)` pairs already scaled by the caller
    pub fn from_iq_pairs(pairs: &[(f64, f64)], sample_rate: f64) -> SyncResult<Self> {
        let samples = pairs
            .iter()
            .map(|&(i, q)| ComplexSample::new(i, q))
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[ComplexSample] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time in seconds of the sample at `index`
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate
    }
}

/// Carrier frequency offset produced by the coarse estimator.
///
/// Only meaningful for the sample rate and block it was computed from; re-estimate
/// if the offset is expected to drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEstimate {
    /// Estimated offset in Hz (signed)
    pub offset_hz: f64,
    /// DFT bin width `fs / fft_size` of the spectrum the estimate came from
    pub resolution_hz: f64,
    /// Power the samples were raised to before the DFT
    pub power: u32,
    /// DFT length used
    pub fft_size: usize,
}

impl FrequencyEstimate {
    /// True when `freq_hz` lies within one DFT bin of this estimate
    pub fn within_one_bin(&self, freq_hz: f64) -> bool {
        (self.offset_hz - freq_hz).abs() <= self.resolution_hz
    }

    /// De-rotate `samples` by `exp(-j·2π·offset·t)`
    pub fn correct(&self, samples: &[ComplexSample], fs: f64) -> SyncResult<Vec<ComplexSample>> {
        check_sample_rate(fs)?;
        let mut nco = crate::dsp::nco::Nco::new(-self.offset_hz, fs);
        Ok(nco.mix(samples))
    }
}
