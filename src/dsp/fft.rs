//! FFT magnitude spectra for frequency estimation

use std::sync::Arc;

use rustfft::{Fft, FftPlanner};

use crate::domain::ComplexSample;

/// Forward FFT of a fixed size with the plan cached
pub struct FftProcessor {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
}

impl FftProcessor {
    /// Create a new FFT processor with the given size
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self { fft, fft_size }
    }

    /// Magnitude spectrum of one block in natural DFT order (bin 0 = DC).
    ///
    /// Shorter input is zero padded, longer input is truncated to `fft_size`.
    pub fn magnitude(&self, samples: &[ComplexSample]) -> Vec<f64> {
        let mut buffer: Vec<ComplexSample> =
            samples.iter().take(self.fft_size).copied().collect();
        buffer.resize(self.fft_size, ComplexSample::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer.iter().map(|c| c.norm()).collect()
    }

    /// Signed frequency in Hz of DFT bin `bin`
    pub fn bin_frequency(&self, bin: usize, sample_rate: f64) -> f64 {
        let n = self.fft_size as f64;
        if bin < self.fft_size.div_ceil(2) {
            bin as f64 * sample_rate / n
        } else {
            (bin as f64 - n) * sample_rate / n
        }
    }

    /// Bin indices from the most negative frequency up to the most positive
    pub fn bins_by_frequency(&self) -> impl Iterator<Item = usize> {
        let first_negative = self.fft_size.div_ceil(2);
        (first_negative..self.fft_size).chain(0..first_negative)
    }

    /// Get the FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, sample_rate: f64, len: usize) -> Vec<ComplexSample> {
        (0..len)
            .map(|k| {
                ComplexSample::from_polar(
                    1.0,
                    2.0 * std::f64::consts::PI * freq * k as f64 / sample_rate,
                )
            })
            .collect()
    }

    fn peak_bin(spectrum: &[f64]) -> usize {
        let mut best = 0;
        for (i, &m) in spectrum.iter().enumerate() {
            if m > spectrum[best] {
                best = i;
            }
        }
        best
    }

    #[test]
    fn test_fft_pure_tone() {
        let processor = FftProcessor::new(1024);
        let sample_rate = 48000.0;

        let spectrum = processor.magnitude(&tone(1500.0, sample_rate, 1024));
        let bin = peak_bin(&spectrum);

        // 1500 Hz * 1024 / 48000 = 32
        assert_eq!(bin, 32);
        assert!((processor.bin_frequency(bin, sample_rate) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn negative_tone_maps_to_negative_frequency() {
        let processor = FftProcessor::new(256);
        let sample_rate = 25600.0;

        let spectrum = processor.magnitude(&tone(-2000.0, sample_rate, 256));
        let bin = peak_bin(&spectrum);

        assert_eq!(bin, 256 - 20);
        assert!((processor.bin_frequency(bin, sample_rate) + 2000.0).abs() < 1e-9);
    }

    #[test]
    fn bins_by_frequency_is_ascending() {
        for size in [8, 9] {
            let processor = FftProcessor::new(size);
            let freqs: Vec<f64> = processor
                .bins_by_frequency()
                .map(|bin| processor.bin_frequency(bin, 1000.0))
                .collect();

            assert_eq!(freqs.len(), size);
            assert!(freqs.windows(2).all(|w| w[0] < w[1]), "{freqs:?}");
        }
        let even: Vec<usize> = FftProcessor::new(8).bins_by_frequency().collect();
        assert_eq!(even, vec![4, 5, 6, 7, 0, 1, 2, 3]);
    }

    #[test]
    fn compute_repeated_calls_give_identical_results() {
        let processor = FftProcessor::new(512);
        let samples = tone(700.0, 48000.0, 512);

        let first = processor.magnitude(&samples);
        let second = processor.magnitude(&samples);

        assert_eq!(first, second, "repeated calls must return identical results");
    }

    #[test]
    fn short_input_is_zero_padded() {
        let processor = FftProcessor::new(64);
        let spectrum = processor.magnitude(&[ComplexSample::new(1.0, 0.0)]);
        assert_eq!(spectrum.len(), 64);
        assert!(spectrum.iter().all(|&m| (m - 1.0).abs() < 1e-12));
    }
}
