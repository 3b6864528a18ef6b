//! Frequency shift by complex rotation.
//!
//! The `Rotate` block keeps a unit phasor (`rot`) and multiplies it by a
//! fixed per-sample step (`mult`) after every sample, shifting the spectrum
//! by the step's angle. The phasor is renormalised after each call so
//! rounding never lets its magnitude drift.
//!
//! # Example
//! ```
//! use num_complex::Complex;
//! use rdsrx::dsp::rotate::Rotate;
//! use rdsrx::dsp::DspBlock;
//!
//! // Bring the upper RDS lobe (57 kHz + 1187.5 Hz) of a 228 kHz multiplex to 0 Hz
//! let mut rotator = Rotate::from_frequency(-58_187.5, 228_000.0);
//! let input = vec![Complex::new(1.0, 0.0); 4];
//! let output = rotator.process(&input);
//! assert_eq!(output.len(), 4);
//! ```

use num_complex::Complex;

use super::sample::Sample;
use super::DspBlock;

#[derive(Debug, Clone)]
pub struct Rotate {
    /// Current complex rotation factor
    rot: Complex<f32>,
    /// Per-sample rotation multiplier
    mult: Complex<f32>,
}

impl Rotate {
    /// Create a Rotate block turning by `angle` radians per sample
    pub fn new(angle: f32) -> Self {
        Self {
            rot: Complex::new(1.0, 0.0),
            mult: Complex::new(angle.cos(), angle.sin()),
        }
    }

    /// Create a Rotate block shifting by `shift_hz` at `sample_rate`
    pub fn from_frequency(shift_hz: f64, sample_rate: f64) -> Self {
        let angle = 2.0 * std::f64::consts::PI * shift_hz / sample_rate;
        Self {
            rot: Complex::new(1.0, 0.0),
            mult: Complex::new(angle.cos() as f32, angle.sin() as f32),
        }
    }

    /// Rotate the samples of `buf` in place
    pub fn process_in_place(&mut self, buf: &mut [Sample]) {
        for s in buf.iter_mut() {
            *s *= self.rot;
            self.rot *= self.mult;
        }
        let norm = self.rot.norm();
        if norm > 0.0 {
            self.rot /= norm;
        }
    }
}

impl DspBlock for Rotate {
    /// Process a slice of complex samples, applying the rotation
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let mut out = data.to_vec();
        self.process_in_place(&mut out);
        out
    }
}
