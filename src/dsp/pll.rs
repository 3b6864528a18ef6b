//! Phase-locked loop on an explicit reference tone.
//!
//! Unlike the Costas loop, the PLL emits its own oscillator `e^{j phi}`
//! rather than a derotated copy of the input. Callers multiply by it (or its
//! conjugate, or a power of it, e.g. tripling a 19 kHz pilot to 57 kHz).

use std::f32::consts::PI;

use num_complex::Complex;

use super::pcl::PhaseControlLoop;
use super::sample::{Sample, SampleExt};
use super::DspBlock;
use crate::error::{Error, Result};

/// Wrap an angle into `[-pi, pi)`.
#[inline]
pub fn wrap_angle(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

#[derive(Debug, Clone)]
pub struct Pll {
    pcl: PhaseControlLoop,
}

impl Pll {
    /// Create a PLL.
    ///
    /// # Arguments
    ///
    /// * `bandwidth` - loop bandwidth, normalised, in `(0, 1)`
    /// * `initial_frequency` - starting frequency in radians per sample
    /// * `frequency_range` - `(min, max)` the frequency estimate may take
    pub fn new(
        bandwidth: f32,
        initial_frequency: f32,
        frequency_range: (f32, f32),
    ) -> Result<Self> {
        if !(bandwidth > 0.0 && bandwidth < 1.0) {
            return Err(Error::invalid(format!(
                "PLL bandwidth must be in (0, 1), got {bandwidth}"
            )));
        }
        if !(frequency_range.0 <= frequency_range.1) {
            return Err(Error::invalid(format!(
                "empty PLL frequency range {:?}",
                frequency_range
            )));
        }
        let mut pcl = PhaseControlLoop::new((-PI, PI), frequency_range);
        pcl.set_bandwidth(bandwidth);
        pcl.set_frequency(initial_frequency);
        Ok(Self { pcl })
    }

    /// Reference locked PLL for a tone at `freq_hz` in a `sample_rate` stream.
    pub fn for_tone(
        bandwidth: f32,
        freq_hz: f32,
        sample_rate: f32,
        tolerance_hz: f32,
    ) -> Result<Self> {
        if !(sample_rate > 0.0) {
            return Err(Error::invalid(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        let to_rad = 2.0 * PI / sample_rate;
        Self::new(
            bandwidth,
            freq_hz * to_rad,
            ((freq_hz - tolerance_hz) * to_rad, (freq_hz + tolerance_hz) * to_rad),
        )
    }

    pub fn frequency(&self) -> f32 {
        self.pcl.frequency()
    }

    pub fn phase(&self) -> f32 {
        self.pcl.phase()
    }

    /// Emit the oscillator for this sample, then track `x`.
    #[inline]
    pub fn step(&mut self, x: Sample) -> Sample {
        let out = Sample::phasor(self.pcl.phase());
        let error = wrap_angle(x.phase() - self.pcl.phase());
        self.pcl.advance(error);
        self.pcl.wrap_phase();
        self.pcl.limit_frequency();
        out
    }

    /// Write the oscillator for each input sample into `output`.
    pub fn process_into(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<usize> {
        Error::check_capacity(input.len(), output.len())?;
        for (y, &x) in output.iter_mut().zip(input) {
            *y = self.step(x);
        }
        Ok(input.len())
    }

    /// Replace each sample of `buf` with the oscillator that tracked it.
    pub fn process_in_place(&mut self, buf: &mut [Sample]) {
        for x in buf.iter_mut() {
            *x = self.step(*x);
        }
    }
}

impl DspBlock for Pll {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        data.iter().map(|&x| self.step(x)).collect()
    }
}
