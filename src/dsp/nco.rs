//! Numerically Controlled Oscillator

use std::f64::consts::PI;

use crate::domain::ComplexSample;

/// Phase accumulator producing `exp(j·2π·f·k/fs)` one sample at a time
pub struct Nco {
    phase: f64,
    phase_increment: f64,
}

impl Nco {
    /// Create a new NCO with the given frequency and sample rate
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        let phase_increment = 2.0 * PI * frequency / sample_rate;
        Self {
            phase: 0.0,
            phase_increment,
        }
    }

    /// Current phase in [0, 2π)
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Step to the next sample
    pub fn advance(&mut self) {
        self.phase += self.phase_increment;
        self.wrap_phase();
    }

    /// Current unit phasor, then advance
    pub fn next_phasor(&mut self) -> ComplexSample {
        let phasor = ComplexSample::from_polar(1.0, self.phase);
        self.advance();
        phasor
    }

    /// Multiply a block by the oscillator, continuing from the current phase
    pub fn mix(&mut self, samples: &[ComplexSample]) -> Vec<ComplexSample> {
        samples.iter().map(|&s| s * self.next_phasor()).collect()
    }

    fn wrap_phase(&mut self) {
        self.phase = self.phase.rem_euclid(2.0 * PI);
        // rem_euclid can round a tiny negative phase up to exactly 2π
        if self.phase >= 2.0 * PI {
            self.phase = 0.0;
        }
    }
}
