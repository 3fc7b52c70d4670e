//! Costas loop for QPSK carrier phase tracking
//!
//! Four correlator branches mix the input against the local carrier at
//! 0, π/4, π/2 and 3π/4 past the current phase estimate. Each branch is
//! lowpassed through its own history buffer, and the product of the four
//! filtered outputs is a phase error that vanishes when the estimate sits on
//! a QPSK symbol phase (modulo π/2). The phase moves by `mu` times that error
//! on every sample.
//!
//! The loop never fails once configured: runaway or NaN phases come back in
//! the trajectory for the caller to inspect.

use std::f64::consts::PI;

use crate::domain::{
    types::check_sample_rate, BranchMixing, CarrierConfig, ComplexSample, SyncResult,
};
use crate::dsp::filter::{FilterTaps, FirFilter};
use crate::dsp::nco::Nco;

/// Branch phase offsets relative to the running estimate
const BRANCH_OFFSETS: [f64; 4] = [0.0, PI / 4.0, PI / 2.0, 3.0 * PI / 4.0];

/// Per-sample output of one Costas run
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierTrack {
    /// Local carrier `cos(2π·f0·t + θ)`
    pub carrier_estimate: Vec<f64>,
    /// Phase estimate θ applied at each sample
    pub theta: Vec<f64>,
    /// `exp(-j·(2π·f0·t + θ))`, multiplies the input down to baseband
    pub exponential: Vec<ComplexSample>,
    final_theta: f64,
}

impl CarrierTrack {
    pub fn len(&self) -> usize {
        self.theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    /// Phase after the last update
    pub fn final_phase(&self) -> f64 {
        self.final_theta
    }

    /// False once the trajectory has run off to NaN or infinity
    pub fn is_finite(&self) -> bool {
        self.final_theta.is_finite() && self.theta.iter().all(|t| t.is_finite())
    }

    /// Multiply `samples` by the estimated exponential, sample for sample
    pub fn demodulate(&self, samples: &[ComplexSample]) -> Vec<ComplexSample> {
        samples
            .iter()
            .zip(self.exponential.iter())
            .map(|(s, e)| s * e)
            .collect()
    }
}

/// Costas loop configuration plus its branch lowpass design
pub struct CarrierRecoveryLoop {
    mu: f64,
    initial_phase: f64,
    mixing: BranchMixing,
    taps: FilterTaps,
}

impl CarrierRecoveryLoop {
    /// Build a loop whose branch filter is designed from `config`
    pub fn new(config: &CarrierConfig) -> SyncResult<Self> {
        config.validate()?;
        let taps = FilterTaps::lowpass(config.lpf_cutoff, config.lpf_taps)?;
        Ok(Self::from_parts(config, taps))
    }

    /// Build a loop around caller-supplied branch taps
    pub fn with_taps(config: &CarrierConfig, taps: FilterTaps) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, taps))
    }

    fn from_parts(config: &CarrierConfig, taps: FilterTaps) -> Self {
        Self {
            mu: config.mu,
            initial_phase: config.initial_phase,
            mixing: config.mixing,
            taps,
        }
    }

    pub fn taps(&self) -> &FilterTaps {
        &self.taps
    }

    /// Track the carrier of `samples`, expected near `f0` Hz at rate `fs`.
    ///
    /// Always returns one output per input sample. Each call starts from fresh
    /// zeroed branch histories and the configured initial phase.
    pub fn run(&self, samples: &[ComplexSample], fs: f64, f0: f64) -> SyncResult<CarrierTrack> {
        check_sample_rate(fs)?;
        log::debug!(
            "Costas: {} samples, f0 {f0} Hz, mu {}, {} taps, {:?}",
            samples.len(),
            self.mu,
            self.taps.len(),
            self.mixing
        );

        let mut branches: [FirFilter; 4] =
            std::array::from_fn(|_| FirFilter::new(self.taps.clone()));
        let mut carrier = Nco::new(f0, fs);
        let mut theta = self.initial_phase;

        let n = samples.len();
        let mut track = CarrierTrack {
            carrier_estimate: Vec::with_capacity(n),
            theta: Vec::with_capacity(n),
            exponential: Vec::with_capacity(n),
            final_theta: theta,
        };

        for &x in samples {
            let phase = carrier.phase() + theta;
            track.carrier_estimate.push(phase.cos());
            track.theta.push(theta);
            track.exponential.push(ComplexSample::from_polar(1.0, -phase));

            let mut error = self.mu;
            for (filter, offset) in branches.iter_mut().zip(BRANCH_OFFSETS) {
                let branch = self.correlate(x, phase + offset);
                error *= filter.process(branch);
            }
            theta += error;
            carrier.advance();
        }

        track.final_theta = theta;
        if !track.is_finite() {
            log::warn!("Costas: phase trajectory diverged (non-finite estimate)");
        }
        Ok(track)
    }

    /// Track a real-valued passband signal
    pub fn run_real(&self, samples: &[f64], fs: f64, f0: f64) -> SyncResult<CarrierTrack> {
        let complex: Vec<ComplexSample> =
            samples.iter().map(|&s| ComplexSample::new(s, 0.0)).collect();
        self.run(&complex, fs, f0)
    }

    fn correlate(&self, x: ComplexSample, phase: f64) -> f64 {
        match self.mixing {
            BranchMixing::RealPart => x.re * phase.cos(),
            BranchMixing::Quadrature => x.re * phase.cos() + x.im * phase.sin(),
        }
    }
}
