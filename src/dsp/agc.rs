//! Automatic Gain Control (AGC)
//!
//! Normalises the amplitude of the channel ahead of carrier and timing
//! recovery, which both assume a roughly unit-amplitude constellation.
//!
//! # Design
//!
//! - Exponential moving average of the output magnitude tracks the envelope
//! - Gain moves towards `target / envelope` by a bandwidth-scaled step
//! - The step is clamped to `[-1, 1]` and the gain to `[gain_min, gain_max]`,
//!   so silence or a sudden spike cannot make the gain run away
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use rdsrx::dsp::agc::Agc;
//!
//! let mut agc = Agc::new(0.01)?;
//! let mut samples = vec![Complex::new(1.0, 0.5), Complex::new(0.8, 0.6)];
//! agc.process_in_place(&mut samples);
//! # Ok::<(), rdsrx::Error>(())
//! ```

use num_complex::Complex;

use super::sample::Sample;
use super::DspBlock;
use crate::error::{Error, Result};

/// Automatic Gain Control for complex signals.
#[derive(Debug, Clone)]
pub struct Agc {
    /// Target output amplitude (default 1.0)
    target: f32,

    /// Loop bandwidth (controls attack/decay rate)
    bandwidth: f32,

    /// Current gain value
    gain: f32,

    /// Envelope estimate of the output
    envelope: f32,

    /// Minimum gain (to prevent instability)
    gain_min: f32,

    /// Maximum gain (to prevent noise amplification)
    gain_max: f32,

    /// When set, the gain is frozen
    is_locked: bool,
}

impl Agc {
    /// Create a new AGC with specified bandwidth in `(0, 1]`.
    pub fn new(bandwidth: f32) -> Result<Self> {
        Self::with_target(bandwidth, 1.0)
    }

    /// Create AGC with custom target amplitude.
    pub fn with_target(bandwidth: f32, target: f32) -> Result<Self> {
        if !(bandwidth > 0.0 && bandwidth <= 1.0) {
            return Err(Error::invalid(format!(
                "AGC bandwidth must be in (0, 1], got {bandwidth}"
            )));
        }
        if !(target > 0.0) {
            return Err(Error::invalid(format!(
                "AGC target must be positive, got {target}"
            )));
        }
        Ok(Self {
            target,
            bandwidth,
            gain: 1.0,
            envelope: target,
            gain_min: 1e-6,
            gain_max: 1e6,
            is_locked: false,
        })
    }

    /// Set the loop bandwidth, clamped to `[0, 1]`.
    pub fn set_bandwidth(&mut self, bandwidth: f32) {
        self.bandwidth = bandwidth.clamp(0.0, 1.0);
    }

    pub fn bandwidth(&self) -> f32 {
        self.bandwidth
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Set gain limits.
    pub fn set_gain_limits(&mut self, min: f32, max: f32) {
        self.gain_min = min.max(1e-10);
        self.gain_max = max.min(1e10).max(self.gain_min);
        self.gain = self.gain.clamp(self.gain_min, self.gain_max);
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Freeze the gain.
    pub fn lock(&mut self) {
        self.is_locked = true;
    }

    pub fn unlock(&mut self) {
        self.is_locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn reset(&mut self) {
        self.gain = 1.0;
        self.envelope = self.target;
    }

    /// Apply the current gain to one sample, then update the gain.
    #[inline]
    pub fn execute(&mut self, x: Sample) -> Sample {
        let out = x * self.gain;
        if self.is_locked {
            return out;
        }

        let mag = out.norm();
        if !mag.is_finite() {
            return out;
        }
        self.envelope = (1.0 - self.bandwidth) * self.envelope + self.bandwidth * mag;

        if self.envelope > 1e-10 {
            let step = (self.target / self.envelope - 1.0).clamp(-1.0, 1.0);
            self.gain *= 1.0 + self.bandwidth * step;
        } else {
            self.gain *= 1.0 + self.bandwidth;
        }
        self.gain = self.gain.clamp(self.gain_min, self.gain_max);

        out
    }

    pub fn process_in_place(&mut self, buf: &mut [Sample]) {
        for x in buf.iter_mut() {
            *x = self.execute(*x);
        }
    }

    /// Current gain in dB.
    pub fn gain_db(&self) -> f32 {
        20.0 * self.gain.log10()
    }
}

impl DspBlock for Agc {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        data.iter().map(|&x| self.execute(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agc_creation() {
        let agc = Agc::new(0.01).unwrap();
        assert!((agc.bandwidth() - 0.01).abs() < 1e-6);
        assert!((agc.target() - 1.0).abs() < 1e-6);
        assert!((agc.gain() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_agc_amplification() {
        let mut agc = Agc::new(0.1).unwrap();
        for _ in 0..1000 {
            agc.execute(Complex::new(0.1, 0.0));
        }
        assert!(agc.gain() > 1.0, "Gain {} should be > 1", agc.gain());
        let out = agc.execute(Complex::new(0.1, 0.0));
        assert!((out.norm() - 1.0).abs() < 0.05, "output {}", out.norm());
    }

    #[test]
    fn test_agc_attenuation() {
        let mut agc = Agc::new(0.1).unwrap();
        for _ in 0..1000 {
            agc.execute(Complex::new(10.0, 0.0));
        }
        assert!(agc.gain() < 1.0, "Gain {} should be < 1", agc.gain());
    }

    #[test]
    fn test_agc_silence_saturates_at_gain_max() {
        let mut agc = Agc::new(0.5).unwrap();
        agc.set_gain_limits(1e-3, 1e3);
        for _ in 0..10_000 {
            let out = agc.execute(Complex::new(0.0, 0.0));
            assert_eq!(out, Complex::new(0.0, 0.0));
        }
        assert_eq!(agc.gain(), 1e3);

        // A spike after silence is bounded by gain_max and the gain recovers.
        let spike = agc.execute(Complex::new(1.0, 0.0));
        assert!(spike.norm() <= 1e3);
        for _ in 0..200 {
            agc.execute(Complex::new(1.0, 0.0));
        }
        assert!(agc.gain() < 10.0);
    }

    #[test]
    fn test_agc_lock() {
        let mut agc = Agc::new(0.1).unwrap();
        for _ in 0..100 {
            agc.execute(Complex::new(0.5, 0.0));
        }
        let gain_before = agc.gain();

        agc.lock();
        assert!(agc.is_locked());
        for _ in 0..100 {
            agc.execute(Complex::new(2.0, 0.0));
        }
        assert!((agc.gain() - gain_before).abs() < 1e-6, "Gain changed while locked");

        agc.unlock();
        for _ in 0..100 {
            agc.execute(Complex::new(2.0, 0.0));
        }
        assert!((agc.gain() - gain_before).abs() > 0.01);
    }

    #[test]
    fn test_agc_complex_signal() {
        let mut agc = Agc::new(0.1).unwrap();
        for i in 0..1000 {
            let phase = i as f32 * 0.1;
            let amp = 0.5 + 0.3 * (i as f32 * 0.01).sin();
            let out = agc.execute(Complex::from_polar(amp, phase));
            if i > 500 {
                let mag = out.norm();
                assert!(mag < 2.0 && mag > 0.1, "Output magnitude {} out of range", mag);
            }
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Agc::new(0.0).is_err());
        assert!(Agc::new(1.5).is_err());
        assert!(Agc::with_target(0.1, 0.0).is_err());
    }
}
