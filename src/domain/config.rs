//! Synchronizer configuration
//!
//! Every tunable of the three stages lives here as a plain serde struct, so a
//! whole receiver setup can be stored as one JSON document. Missing fields fall
//! back to the defaults below, which are the values the lab captures were
//! processed with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{SyncError, SyncResult};

/// Timing error detector used by the symbol clock loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingAlgorithm {
    /// Gardner detector on the I and Q rails separately
    Gardner,
    /// Gardner detector in conjugate form, tolerant of residual frequency offset
    GardnerFreqTolerant,
    /// Sign-based Mueller & Muller detector
    MuellerMuller,
}

impl TimingAlgorithm {
    /// Gardner variants need a midpoint sample strictly between symbols
    pub fn needs_midpoint(&self) -> bool {
        matches!(self, Self::Gardner | Self::GardnerFreqTolerant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gardner => "gardner",
            Self::GardnerFreqTolerant => "gardner_freq_tolerant",
            Self::MuellerMuller => "mueller_muller",
        }
    }
}

impl fmt::Display for TimingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legacy numeric selectors: 3 = Gardner, 4 = frequency tolerant Gardner, 5 = M&M
impl TryFrom<u8> for TimingAlgorithm {
    type Error = SyncError;

    fn try_from(code: u8) -> SyncResult<Self> {
        match code {
            3 => Ok(Self::Gardner),
            4 => Ok(Self::GardnerFreqTolerant),
            5 => Ok(Self::MuellerMuller),
            other => Err(SyncError::Config(format!(
                "unsupported timing algorithm selector {other} (expected 3, 4 or 5)"
            ))),
        }
    }
}

impl FromStr for TimingAlgorithm {
    type Err = SyncError;

    fn from_str(s: &str) -> SyncResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gardner" => Ok(Self::Gardner),
            "gardner_freq_tolerant" | "gardner-freq-tolerant" => Ok(Self::GardnerFreqTolerant),
            "mueller_muller" | "mueller-muller" | "mm" => Ok(Self::MuellerMuller),
            other => Err(SyncError::Config(format!(
                "unsupported timing algorithm '{other}'"
            ))),
        }
    }
}

/// How the Costas correlator branches mix the input with the local carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchMixing {
    /// `Re(x)·cos(φ)`: real passband input, leaves a 2·f0 image for the lowpass
    RealPart,
    /// `Re(x·e^{-jφ})`: complex input, no image term, works at f0 = 0
    Quadrature,
}

/// Coarse (Nth-power spectral) frequency estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseConfig {
    /// DFT length; the input block must hold at least one full window
    pub fft_size: usize,
    /// Power the samples are raised to (4 for QPSK)
    pub power: u32,
}

impl Default for CoarseConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            power: 4,
        }
    }
}

impl CoarseConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if self.fft_size == 0 {
            return Err(SyncError::Config("fft_size must be at least 1".into()));
        }
        if self.power < 2 {
            return Err(SyncError::Config(format!(
                "power must be at least 2, got {}",
                self.power
            )));
        }
        Ok(())
    }
}

/// Costas loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    /// Phase update step size.
    ///
    /// Branches correlate against `x` rather than `2x`, so the error product is
    /// 16 times smaller than in loops that double the input; multiply a `mu`
    /// tuned for such a loop by 16 to get the same response.
    pub mu: f64,
    /// Initial phase estimate in radians
    pub initial_phase: f64,
    pub mixing: BranchMixing,
    /// Branch lowpass length (odd)
    pub lpf_taps: usize,
    /// Branch lowpass cutoff as a fraction of the sample rate
    pub lpf_cutoff: f64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            mu: 0.1,
            initial_phase: 0.0,
            mixing: BranchMixing::Quadrature,
            lpf_taps: 7,
            lpf_cutoff: 0.1,
        }
    }
}

impl CarrierConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.mu.is_finite() && self.mu > 0.0) {
            return Err(SyncError::Config(format!(
                "Costas step size mu must be positive and finite, got {}",
                self.mu
            )));
        }
        if !self.initial_phase.is_finite() {
            return Err(SyncError::Config("initial phase must be finite".into()));
        }
        if self.lpf_taps == 0 || self.lpf_taps % 2 == 0 {
            return Err(SyncError::Config(format!(
                "branch filter length must be odd, got {}",
                self.lpf_taps
            )));
        }
        if !(self.lpf_cutoff > 0.0 && self.lpf_cutoff < 0.5) {
            return Err(SyncError::Config(format!(
                "branch filter cutoff must lie in (0, 0.5) of the sample rate, got {}",
                self.lpf_cutoff
            )));
        }
        Ok(())
    }
}

/// Symbol timing loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub algorithm: TimingAlgorithm,
    /// Normalized loop bandwidth BnTs
    pub loop_bandwidth: f64,
    /// Damping factor ζ
    pub damping: f64,
    /// Detector gain Kp
    pub detector_gain: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            algorithm: TimingAlgorithm::Gardner,
            loop_bandwidth: 0.01,
            damping: std::f64::consts::FRAC_1_SQRT_2,
            detector_gain: 2.7,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self, sps: usize) -> SyncResult<()> {
        if sps == 0 {
            return Err(SyncError::Config("samples per symbol must be positive".into()));
        }
        if self.algorithm.needs_midpoint() && sps <= 2 {
            return Err(SyncError::Config(format!(
                "{} needs more than 2 samples per symbol, got {sps}",
                self.algorithm
            )));
        }
        if !(self.loop_bandwidth.is_finite() && self.loop_bandwidth > 0.0) {
            return Err(SyncError::Config(format!(
                "loop bandwidth must be positive, got {}",
                self.loop_bandwidth
            )));
        }
        if !(self.damping.is_finite() && self.damping > 0.0) {
            return Err(SyncError::Config(format!(
                "damping must be positive, got {}",
                self.damping
            )));
        }
        if !self.detector_gain.is_finite() || self.detector_gain == 0.0 {
            return Err(SyncError::Config(format!(
                "detector gain must be finite and non-zero, got {}",
                self.detector_gain
            )));
        }
        Ok(())
    }
}

/// Full synchronizer profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub samples_per_symbol: usize,
    /// Frequency the corrected signal is shifted to before the Costas loop (0 = stay at baseband)
    pub intermediate_freq_hz: f64,
    /// Scale the capture by its peak magnitude before processing
    pub normalize: bool,
    pub coarse: CoarseConfig,
    pub carrier: CarrierConfig,
    pub timing: TimingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            samples_per_symbol: 10,
            intermediate_freq_hz: 0.0,
            normalize: true,
            coarse: CoarseConfig::default(),
            carrier: CarrierConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if !self.intermediate_freq_hz.is_finite() {
            return Err(SyncError::Config("intermediate frequency must be finite".into()));
        }
        self.coarse.validate()?;
        self.carrier.validate()?;
        self.timing.validate(self.samples_per_symbol)
    }

    /// Parse and validate a JSON profile
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SyncError::Config(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SyncResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("Serialization error: {e}")))
    }
}
