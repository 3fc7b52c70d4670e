//! FIR filter taps and the ring-buffer history that convolves against them

use std::f64::consts::PI;
use std::sync::Arc;

use crate::domain::{SyncError, SyncResult};

/// Immutable, odd-length, linear-phase coefficient set.
///
/// Cloning shares the coefficients, so several filters can run off one design.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTaps {
    coefficients: Arc<[f64]>,
}

impl FilterTaps {
    /// Wrap caller-designed coefficients
    pub fn new(coefficients: Vec<f64>) -> SyncResult<Self> {
        if coefficients.is_empty() {
            return Err(SyncError::Config("filter needs at least one tap".into()));
        }
        if coefficients.len() % 2 == 0 {
            return Err(SyncError::Config(format!(
                "filter length must be odd, got {}",
                coefficients.len()
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SyncError::Config("filter taps must be finite".into()));
        }
        Ok(Self {
            coefficients: coefficients.into(),
        })
    }

    /// Windowed-sinc lowpass with unity DC gain.
    ///
    /// `cutoff` is a fraction of the sample rate in (0, 0.5).
    pub fn lowpass(cutoff: f64, num_taps: usize) -> SyncResult<Self> {
        if !(cutoff > 0.0 && cutoff < 0.5) {
            return Err(SyncError::Config(format!(
                "lowpass cutoff must lie in (0, 0.5), got {cutoff}"
            )));
        }
        if num_taps == 0 || num_taps % 2 == 0 {
            return Err(SyncError::Config(format!(
                "filter length must be odd, got {num_taps}"
            )));
        }

        let middle = (num_taps / 2) as f64;
        let mut coefficients: Vec<f64> = (0..num_taps)
            .map(|i| {
                let n = i as f64 - middle;
                let sinc = if n == 0.0 {
                    2.0 * cutoff
                } else {
                    (2.0 * PI * cutoff * n).sin() / (PI * n)
                };
                // Hann window without the zero end points
                let window =
                    0.5 * (1.0 - (2.0 * PI * (i + 1) as f64 / (num_taps + 1) as f64).cos());
                sinc * window
            })
            .collect();

        let sum: f64 = coefficients.iter().sum();
        if sum.abs() > 1e-12 {
            for c in &mut coefficients {
                *c /= sum;
            }
        }

        Self::new(coefficients)
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coefficients
    }
}

/// Sliding history of the most recent `taps.len()` inputs.
///
/// Fixed-size ring buffer: a push overwrites the oldest sample in O(1). Starts
/// zeroed, so the first `taps.len()` outputs are a start-up transient.
pub struct FirFilter {
    taps: FilterTaps,
    delay_line: Vec<f64>,
    position: usize,
}

impl FirFilter {
    pub fn new(taps: FilterTaps) -> Self {
        let len = taps.len();
        Self {
            taps,
            delay_line: vec![0.0; len],
            position: 0,
        }
    }

    /// Push one sample and return the filtered output
    pub fn process(&mut self, sample: f64) -> f64 {
        self.delay_line[self.position] = sample;

        let len = self.delay_line.len();
        let mut output = 0.0;
        for (i, &c) in self.taps.as_slice().iter().enumerate() {
            let delay_idx = (self.position + len - i) % len;
            output += c * self.delay_line[delay_idx];
        }

        self.position = (self.position + 1) % len;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = FirFilter::new(FilterTaps::lowpass(0.02, 63).unwrap());

        let mut output = 0.0;
        for _ in 0..200 {
            output = filter.process(1.0);
        }

        assert!(
            (output - 1.0).abs() < 1e-9,
            "DC should pass through unchanged, got {}",
            output
        );
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        // Cutoff at 0.02 fs, feed 0.2 fs
        let mut filter = FirFilter::new(FilterTaps::lowpass(0.02, 63).unwrap());

        let mut max_output = 0.0f64;
        for i in 0..1000 {
            let sample = (2.0 * PI * 0.2 * i as f64).sin();
            let out = filter.process(sample);
            if i > 100 {
                max_output = max_output.max(out.abs());
            }
        }

        assert!(
            max_output < 0.01,
            "0.2 fs tone should be attenuated, got {}",
            max_output
        );
    }

    #[test]
    fn lowpass_is_symmetric_and_normalized() {
        let taps = FilterTaps::lowpass(0.1, 7).unwrap();
        let c = taps.as_slice();
        for i in 0..c.len() {
            assert!((c[i] - c[c.len() - 1 - i]).abs() < 1e-15);
        }
        let sum: f64 = c.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn even_length_rejected() {
        assert!(FilterTaps::new(vec![0.5, 0.5]).is_err());
        assert!(FilterTaps::lowpass(0.1, 8).is_err());
        assert!(FilterTaps::new(vec![]).is_err());
        assert!(FilterTaps::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn bad_cutoff_rejected() {
        assert!(FilterTaps::lowpass(0.0, 7).is_err());
        assert!(FilterTaps::lowpass(0.5, 7).is_err());
    }

    #[test]
    fn impulse_response_matches_taps() {
        let taps = FilterTaps::new(vec![0.25, 0.5, 0.25]).unwrap();
        let mut filter = FirFilter::new(taps);
        let out: Vec<f64> = [1.0, 0.0, 0.0, 0.0]
            .iter()
            .map(|&x| filter.process(x))
            .collect();
        assert_eq!(out, vec![0.25, 0.5, 0.25, 0.0]);
    }
}
