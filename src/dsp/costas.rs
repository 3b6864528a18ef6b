//! Costas loop carrier recovery.
//!
//! Decision-directed phase and frequency lock for suppressed-carrier BPSK
//! style signals. Each sample is derotated by the current loop phase, the
//! error `Re * Im` pushes the constellation onto the real axis.

use std::f32::consts::{FRAC_PI_4, PI};

use num_complex::Complex;

use super::pcl::{sign, PhaseControlLoop};
use super::sample::{Sample, SampleExt};
use super::DspBlock;
use crate::error::{Error, Result};

/// Costas loop around a [`PhaseControlLoop`] with phase wrapped to `[-pi, pi)`.
#[derive(Debug, Clone)]
pub struct Costas {
    pcl: PhaseControlLoop,
    /// Alternating +-pi/4 rotation state of [`Costas::process_pi4`]
    odd_symbol: bool,
}

impl Costas {
    /// Create a loop with the given bandwidth (radians per sample) and a
    /// frequency range of `+-1` radian per sample.
    pub fn new(bandwidth: f32) -> Result<Self> {
        Self::with_frequency_limit(bandwidth, 1.0)
    }

    pub fn with_frequency_limit(bandwidth: f32, max_frequency: f32) -> Result<Self> {
        if !(bandwidth > 0.0 && bandwidth < 1.0) {
            return Err(Error::invalid(format!(
                "Costas bandwidth must be in (0, 1), got {bandwidth}"
            )));
        }
        if !(max_frequency > 0.0) {
            return Err(Error::invalid(format!(
                "frequency limit must be positive, got {max_frequency}"
            )));
        }
        let mut pcl = PhaseControlLoop::new((-PI, PI), (-max_frequency, max_frequency));
        pcl.set_bandwidth(bandwidth);
        Ok(Self {
            pcl,
            odd_symbol: false,
        })
    }

    pub fn set_bandwidth(&mut self, bandwidth: f32) {
        self.pcl.set_bandwidth(bandwidth);
    }

    /// Current frequency estimate in radians per sample.
    pub fn frequency(&self) -> f32 {
        self.pcl.frequency()
    }

    pub fn phase(&self) -> f32 {
        self.pcl.phase()
    }

    pub fn pcl(&self) -> &PhaseControlLoop {
        &self.pcl
    }

    /// Derotate one sample and update the loop.
    #[inline]
    pub fn step(&mut self, x: Sample) -> Sample {
        let out = x * Sample::phasor(-self.pcl.phase());
        let error = (out.re * out.im).clamp(-1.0, 1.0);
        self.pcl.advance(error);
        self.pcl.wrap_phase();
        out
    }

    /// Derotate one pi/4-DQPSK symbol, removing the alternating +-pi/4 offset
    /// before the sign-based error.
    #[inline]
    pub fn step_pi4(&mut self, x: Sample) -> Sample {
        let offset = if self.odd_symbol { FRAC_PI_4 } else { -FRAC_PI_4 };
        self.odd_symbol = !self.odd_symbol;
        let out = x * Sample::phasor(-self.pcl.phase() + offset);
        let error = (sign(out.re) * out.im - sign(out.im) * out.re).clamp(-1.0, 1.0);
        self.pcl.advance(error);
        self.pcl.wrap_phase();
        out
    }

    /// Run every sample of `buf` through [`step`](Self::step) in place.
    pub fn process_in_place(&mut self, buf: &mut [Sample]) {
        for x in buf.iter_mut() {
            *x = self.step(*x);
        }
    }

    /// Run every sample of `buf` through [`step_pi4`](Self::step_pi4) in place.
    pub fn process_pi4(&mut self, buf: &mut [Sample]) {
        for x in buf.iter_mut() {
            *x = self.step_pi4(*x);
        }
    }
}

impl DspBlock for Costas {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        data.iter().map(|&x| self.step(x)).collect()
    }
}
