//! Receiver synchronization front end — raw I/Q in, symbols out
//!
//! Pipeline: peak normalization → coarse Nth-power frequency estimate →
//!           de-rotation → optional shift to an intermediate frequency →
//!           Costas loop → demodulation to baseband → symbol timing loop
//!
//! Every stage works on the whole buffered block (record, then process). A
//! streaming version would need `sps + sps/2` samples of lookahead for the
//! timing loop and none for the Costas loop.

use crate::domain::{
    types::check_sample_rate, ComplexSample, FrequencyEstimate, SampleStream, SyncConfig,
    SyncResult,
};
use crate::dsp::clock_recovery::{TimingOutput, TimingRecoveryLoop};
use crate::dsp::coarse_freq::CoarseFrequencyEstimator;
use crate::dsp::costas_loop::{CarrierRecoveryLoop, CarrierTrack};
use crate::dsp::nco::Nco;

/// Guards the peak normalization against an all-zero capture
const NORMALIZE_EPSILON: f64 = 1e-9;

/// Everything one synchronization run produced
#[derive(Debug, Clone)]
pub struct SyncOutput {
    pub coarse: FrequencyEstimate,
    pub carrier: CarrierTrack,
    /// Carrier-corrected samples fed to the timing loop
    pub baseband: Vec<ComplexSample>,
    pub timing: TimingOutput,
}

impl SyncOutput {
    /// Recovered symbols, one per detected symbol instant
    pub fn symbols(&self) -> &[ComplexSample] {
        &self.timing.symbols
    }
}

/// Composes the three synchronization stages
pub struct Synchronizer {
    config: SyncConfig,
    coarse: CoarseFrequencyEstimator,
    carrier: CarrierRecoveryLoop,
    timing: TimingRecoveryLoop,
}

impl Synchronizer {
    /// Validate the whole profile and build every stage up front
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let coarse = CoarseFrequencyEstimator::new(&config.coarse)?;
        let carrier = CarrierRecoveryLoop::new(&config.carrier)?;
        let timing = TimingRecoveryLoop::new(config.samples_per_symbol, &config.timing)?;

        Ok(Self {
            config,
            coarse,
            carrier,
            timing,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronize a raw capture taken at `fs` Hz.
    ///
    /// Each call builds fresh loop state, so independent captures can be
    /// processed concurrently from one `Synchronizer`.
    pub fn run(&self, samples: &[ComplexSample], fs: f64) -> SyncResult<SyncOutput> {
        check_sample_rate(fs)?;

        let normalized = if self.config.normalize {
            normalize_peak(samples)
        } else {
            samples.to_vec()
        };

        let coarse = self.coarse.estimate(&normalized, fs)?;
        let corrected = coarse.correct(&normalized, fs)?;

        let f_if = self.config.intermediate_freq_hz;
        let aligned = if f_if != 0.0 {
            Nco::new(f_if, fs).mix(&corrected)
        } else {
            corrected
        };

        let carrier = self.carrier.run(&aligned, fs, f_if)?;
        let baseband = carrier.demodulate(&aligned);
        let timing = self.timing.run(&baseband);

        log::debug!(
            "synchronizer: {} samples at {fs} Hz, coarse {:.1} Hz, final phase {:.4} rad, {} symbols",
            samples.len(),
            coarse.offset_hz,
            carrier.final_phase(),
            timing.len()
        );

        Ok(SyncOutput {
            coarse,
            carrier,
            baseband,
            timing,
        })
    }

    /// Synchronize a stream at its own sample rate
    pub fn run_stream(&self, stream: &SampleStream) -> SyncResult<SyncOutput> {
        self.run(stream.samples(), stream.sample_rate())
    }
}

/// Scale so the largest magnitude is (just under) one
fn normalize_peak(samples: &[ComplexSample]) -> Vec<ComplexSample> {
    let peak = samples.iter().map(|s| s.norm()).fold(0.0, f64::max);
    let scale = 1.0 / (peak + NORMALIZE_EPSILON);
    samples.iter().map(|s| s * scale).collect()
}
