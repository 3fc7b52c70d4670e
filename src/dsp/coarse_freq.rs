//! Coarse carrier frequency offset estimation
//!
//! Raising an M-PSK signal to the M-th power wipes out the modulation and
//! leaves a tone at M times the carrier offset. The strongest DFT bin of the
//! powered block, divided by M, is the estimate.

use crate::domain::{
    types::check_sample_rate, CoarseConfig, ComplexSample, FrequencyEstimate, SyncError,
    SyncResult,
};
use crate::dsp::fft::FftProcessor;

/// Nth-power spectral frequency estimator
pub struct CoarseFrequencyEstimator {
    fft: FftProcessor,
    power: u32,
}

impl CoarseFrequencyEstimator {
    pub fn new(config: &CoarseConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            fft: FftProcessor::new(config.fft_size),
            power: config.power,
        })
    }

    /// Estimate the carrier offset of `samples` captured at `fs`.
    ///
    /// Every complete `fft_size` window contributes its magnitude spectrum to a
    /// running sum; a trailing partial window is ignored. Ties go to the lowest
    /// (most negative) frequency.
    pub fn estimate(&self, samples: &[ComplexSample], fs: f64) -> SyncResult<FrequencyEstimate> {
        check_sample_rate(fs)?;

        let fft_size = self.fft.fft_size();
        if samples.len() < fft_size {
            return Err(SyncError::InsufficientData {
                required: fft_size,
                available: samples.len(),
            });
        }

        let mut spectrum = vec![0.0; fft_size];
        let mut windows = 0usize;
        for block in samples.chunks_exact(fft_size) {
            let powered: Vec<ComplexSample> = block.iter().map(|s| s.powu(self.power)).collect();
            for (acc, m) in spectrum.iter_mut().zip(self.fft.magnitude(&powered)) {
                *acc += m;
            }
            windows += 1;
        }

        let peak = self.peak_bin(&spectrum);
        if spectrum[peak] == 0.0 {
            log::warn!("coarse estimate: powered spectrum is all zero");
        }

        let offset_hz = self.fft.bin_frequency(peak, fs) / self.power as f64;
        log::debug!(
            "coarse estimate: peak bin {peak} over {windows} window(s) -> {offset_hz:.3} Hz"
        );

        Ok(FrequencyEstimate {
            offset_hz,
            resolution_hz: fs / fft_size as f64,
            power: self.power,
            fft_size,
        })
    }

    /// Strongest bin, scanning upward in frequency so the first maximum wins
    fn peak_bin(&self, spectrum: &[f64]) -> usize {
        let mut bins = self.fft.bins_by_frequency();
        let mut peak = bins.next().unwrap_or(0);
        for bin in bins {
            if spectrum[bin] > spectrum[peak] {
                peak = bin;
            }
        }
        peak
    }
}
