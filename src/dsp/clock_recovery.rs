//! Symbol timing recovery
//!
//! Gardner / Mueller & Muller timing error detector driving a second-order
//! loop filter. The filter output `p2` is a fractional symbol offset in
//! [0, 1); the sample taken for each symbol is the nearest input sample to
//! `sample_index + p2·sps`. No fractional interpolation is done, so timing
//! resolution is one input sample.
//!
//! Every decision depends on all earlier ones through `p2`, so the input must
//! be consumed strictly in order.

use crate::domain::{ComplexSample, SyncError, SyncResult, TimingAlgorithm, TimingConfig};

/// `np.sign` semantics: zero has no sign
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x * 0.0
    }
}

/// Fold into [0, 1)
fn wrap_unit(x: f64) -> f64 {
    let wrapped = x.rem_euclid(1.0);
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

impl TimingAlgorithm {
    /// Timing error from the current symbol sample, the midpoint and the next symbol sample
    pub fn timing_error(
        &self,
        cur: ComplexSample,
        mid: ComplexSample,
        next: ComplexSample,
    ) -> f64 {
        match self {
            Self::Gardner => -((next.re - cur.re) * mid.re + (next.im - cur.im) * mid.im),
            Self::GardnerFreqTolerant => -((next.conj() - cur.conj()) * mid).re,
            Self::MuellerMuller => {
                -(cur.re * sign(next.re) - next.re * sign(cur.re) + cur.im * sign(next.im)
                    - next.im * sign(cur.im))
            }
        }
    }
}

/// Proportional and integral gains of the timing loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopFilter {
    k1: f64,
    k2: f64,
}

impl LoopFilter {
    /// Standard second-order PLL design from normalized bandwidth, damping and detector gain
    pub fn design(loop_bandwidth: f64, damping: f64, detector_gain: f64) -> Self {
        let theta = loop_bandwidth / (damping + 0.25 / damping);
        let denom = (1.0 + 2.0 * damping * theta + theta * theta) * detector_gain;
        Self {
            k1: -4.0 * damping * theta / denom,
            k2: -4.0 * theta * theta / denom,
        }
    }

    /// Use fixed gains instead of designing them
    pub fn from_gains(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }

    pub fn k1(&self) -> f64 {
        self.k1
    }

    pub fn k2(&self) -> f64 {
        self.k2
    }

    /// New fractional offset after one timing error
    fn update(&self, p2: f64, error: f64) -> f64 {
        let p1 = self.k1 * error;
        wrap_unit(p2 + p1 + self.k2 * error)
    }
}

/// Position of the loop in the input: coarse index plus fractional offset
#[derive(Debug, Clone, Copy, Default)]
struct LoopState {
    sample_index: usize,
    p2: f64,
}

/// Recovered symbols with per-symbol diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingOutput {
    pub symbols: Vec<ComplexSample>,
    /// Detector output for each symbol
    pub errors: Vec<f64>,
    /// Fractional offset `p2·sps` in samples after each update
    pub offsets: Vec<f64>,
}

impl TimingOutput {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Symbol clock recovery over an oversampled, carrier-corrected block
pub struct TimingRecoveryLoop {
    sps: usize,
    algorithm: TimingAlgorithm,
    filter: LoopFilter,
}

impl TimingRecoveryLoop {
    /// Validate `config` for `sps` samples per symbol and design the loop filter
    pub fn new(sps: usize, config: &TimingConfig) -> SyncResult<Self> {
        config.validate(sps)?;
        let filter = LoopFilter::design(config.loop_bandwidth, config.damping, config.detector_gain);
        log::debug!(
            "timing loop: {} at {sps} sps, k1 {:.6e}, k2 {:.6e}",
            config.algorithm,
            filter.k1,
            filter.k2
        );
        Ok(Self {
            sps,
            algorithm: config.algorithm,
            filter,
        })
    }

    /// Build around explicit loop gains
    pub fn with_loop_filter(
        sps: usize,
        algorithm: TimingAlgorithm,
        filter: LoopFilter,
    ) -> SyncResult<Self> {
        if sps == 0 {
            return Err(SyncError::Config("samples per symbol must be positive".into()));
        }
        if algorithm.needs_midpoint() && sps <= 2 {
            return Err(SyncError::Config(format!(
                "{algorithm} needs more than 2 samples per symbol, got {sps}"
            )));
        }
        if !(filter.k1.is_finite() && filter.k2.is_finite()) {
            return Err(SyncError::Config("loop gains must be finite".into()));
        }
        Ok(Self {
            sps,
            algorithm,
            filter,
        })
    }

    pub fn loop_filter(&self) -> LoopFilter {
        self.filter
    }

    pub fn algorithm(&self) -> TimingAlgorithm {
        self.algorithm
    }

    /// Samples needed past a symbol candidate before it can be processed
    pub fn lookahead(&self) -> usize {
        self.sps + self.sps / 2
    }

    /// Recover symbols from `samples`.
    ///
    /// Stops when the next lookahead window would run off the end of the
    /// input; a block shorter than one window yields no symbols.
    pub fn run(&self, samples: &[ComplexSample]) -> TimingOutput {
        let sps = self.sps;
        let mut state = LoopState::default();
        let mut out = TimingOutput::default();

        loop {
            let shift = (state.p2 * sps as f64).round_ties_even() as usize;
            let interpolated_index = state.sample_index + shift;
            if interpolated_index + self.lookahead() >= samples.len() {
                break;
            }

            let cur = samples[interpolated_index];
            let mid = samples[interpolated_index + sps / 2];
            let next = samples[interpolated_index + sps];

            let error = self.algorithm.timing_error(cur, mid, next);
            state.p2 = self.filter.update(state.p2, error);

            out.symbols.push(cur);
            out.errors.push(error);
            out.offsets.push(state.p2 * sps as f64);
            state.sample_index += sps;
        }

        log::debug!(
            "timing loop: {} symbols from {} samples",
            out.symbols.len(),
            samples.len()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn gardner(sps: usize) -> TimingRecoveryLoop {
        TimingRecoveryLoop::new(sps, &TimingConfig::default()).unwrap()
    }

    /// Alternating ±1 symbols through a band-limited pulse: a half-rate cosine
    /// on both rails, delayed by `delay` samples
    fn alternating(sps: usize, delay: f64, len: usize) -> Vec<ComplexSample> {
        (0..len)
            .map(|n| {
                let v = FRAC_1_SQRT_2 * (PI * (n as f64 - delay) / sps as f64).cos();
                ComplexSample::new(v, v)
            })
            .collect()
    }

    #[test]
    fn coefficients_follow_pll_design() {
        let bw = 0.01;
        let zeta = FRAC_1_SQRT_2;
        let kp = 2.7;
        let f = LoopFilter::design(bw, zeta, kp);

        let theta = bw / (zeta + 0.25 / zeta);
        let d = (1.0 + 2.0 * zeta * theta + theta * theta) * kp;
        assert!((f.k1() - (-4.0 * zeta * theta / d)).abs() < 1e-15);
        assert!((f.k2() - (-4.0 * theta * theta / d)).abs() < 1e-15);
        assert!(f.k1() < 0.0 && f.k2() < 0.0);
    }

    #[test]
    fn gardner_rejects_low_oversampling() {
        for algorithm in [TimingAlgorithm::Gardner, TimingAlgorithm::GardnerFreqTolerant] {
            let config = TimingConfig {
                algorithm,
                ..TimingConfig::default()
            };
            assert!(TimingRecoveryLoop::new(2, &config).is_err());
            assert!(TimingRecoveryLoop::new(3, &config).is_ok());
        }
        let mm = TimingConfig {
            algorithm: TimingAlgorithm::MuellerMuller,
            ..TimingConfig::default()
        };
        assert!(TimingRecoveryLoop::new(1, &mm).is_ok());
        assert!(TimingRecoveryLoop::new(0, &mm).is_err());
    }

    #[test]
    fn explicit_gains_checked() {
        let f = LoopFilter::from_gains(0.05, 0.02);
        assert!(TimingRecoveryLoop::with_loop_filter(16, TimingAlgorithm::Gardner, f).is_ok());
        assert!(TimingRecoveryLoop::with_loop_filter(2, TimingAlgorithm::Gardner, f).is_err());
        let nan = LoopFilter::from_gains(f64::NAN, 0.0);
        assert!(TimingRecoveryLoop::with_loop_filter(16, TimingAlgorithm::Gardner, nan).is_err());
    }

    #[test]
    fn gardner_error_formula() {
        let cur = ComplexSample::new(1.0, 1.0);
        let mid = ComplexSample::new(0.2, -0.1);
        let next = ComplexSample::new(-1.0, 1.0);
        let e = TimingAlgorithm::Gardner.timing_error(cur, mid, next);
        assert!((e - 0.4).abs() < 1e-12);
    }

    #[test]
    fn conjugate_gardner_matches_rail_form() {
        let cur = ComplexSample::new(0.7, -0.3);
        let mid = ComplexSample::new(-0.1, 0.4);
        let next = ComplexSample::new(-0.6, 0.9);
        let rails = TimingAlgorithm::Gardner.timing_error(cur, mid, next);
        let conj = TimingAlgorithm::GardnerFreqTolerant.timing_error(cur, mid, next);
        assert!((rails - conj).abs() < 1e-12);
    }

    #[test]
    fn mueller_muller_error_formula() {
        let cur = ComplexSample::new(1.0, -0.5);
        let next = ComplexSample::new(0.6, 0.4);
        let e = TimingAlgorithm::MuellerMuller.timing_error(cur, cur, next);
        assert!((e + 0.3).abs() < 1e-12);
    }

    #[test]
    fn mueller_muller_treats_zero_as_no_sign() {
        let zero = ComplexSample::new(0.0, 0.0);
        let next = ComplexSample::new(1.0, 1.0);
        let e = TimingAlgorithm::MuellerMuller.timing_error(zero, zero, next);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn short_input_yields_no_symbols() {
        let timing = gardner(10);
        assert_eq!(timing.lookahead(), 15);
        assert!(timing.run(&alternating(10, 0.0, 15)).is_empty());
        assert!(timing.run(&[]).is_empty());
        assert_eq!(timing.run(&alternating(10, 0.0, 16)).len(), 1);
    }

    #[test]
    fn recovers_one_symbol_per_period() {
        let sps = 10;
        for n in [500, 1003, 2048] {
            let out = gardner(sps).run(&alternating(sps, 3.0, n));
            let expected = n / sps;
            assert!(
                out.len() <= expected && expected - out.len() <= 3,
                "{} symbols from {n} samples",
                out.len()
            );
            assert_eq!(out.errors.len(), out.len());
            assert_eq!(out.offsets.len(), out.len());
        }
    }

    #[test]
    fn timing_error_settles_toward_zero() {
        let out = gardner(10).run(&alternating(10, 3.0, 2000));

        let first = out.errors[0].abs();
        let tail = &out.errors[out.len() - 20..];
        let tail_mean = tail.iter().map(|e| e.abs()).sum::<f64>() / tail.len() as f64;

        assert!(first > 0.5, "initial error {first} should be large");
        assert!(tail_mean < 0.01, "error should settle, tail mean {tail_mean}");
    }

    #[test]
    fn offsets_stay_within_one_symbol() {
        let out = gardner(10).run(&alternating(10, 6.0, 3000));
        assert!(out.offsets.iter().all(|&o| (0.0..10.0).contains(&o)));
    }

    #[test]
    fn mueller_muller_runs_at_one_sample_per_symbol() {
        let mm = TimingConfig {
            algorithm: TimingAlgorithm::MuellerMuller,
            ..TimingConfig::default()
        };
        let symbols: Vec<ComplexSample> = (0..100)
            .map(|k| {
                let s = if k % 3 == 0 { -1.0 } else { 1.0 };
                ComplexSample::new(s, -s)
            })
            .collect();

        let out = TimingRecoveryLoop::new(1, &mm).unwrap().run(&symbols);
        assert!(out.len() >= 98 && out.len() <= 99, "got {}", out.len());
    }

    #[test]
    fn rerun_is_bit_identical() {
        let signal = alternating(8, 2.5, 800);
        let timing = gardner(8);
        assert_eq!(timing.run(&signal), timing.run(&signal));
    }
}
