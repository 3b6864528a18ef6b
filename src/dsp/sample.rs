//! Complex sample primitive shared by every block in the chain.
//!
//! Samples are plain `Complex<f32>` values: no implicit normalisation,
//! magnitude and phase are computed on demand.

use num_complex::Complex;

/// One complex baseband sample.
pub type Sample = Complex<f32>;

/// Operations used in the hot path on top of what `num_complex` provides.
pub trait SampleExt: Sized {
    /// `self * conj(other)`
    fn mul_conj(self, other: Self) -> Self;

    /// `self += a * conj(b)`
    fn mul_conj_acc(&mut self, a: Self, b: Self);

    /// Magnitude `|x|`.
    fn amplitude(self) -> f32;

    /// Angle in radians, in `(-pi, pi]`.
    fn phase(self) -> f32;

    /// Unit phasor `e^{j*angle}`.
    fn phasor(angle: f32) -> Self;
}

impl SampleExt for Sample {
    #[inline]
    fn mul_conj(self, other: Self) -> Self {
        Complex::new(
            self.re * other.re + self.im * other.im,
            self.im * other.re - self.re * other.im,
        )
    }

    #[inline]
    fn mul_conj_acc(&mut self, a: Self, b: Self) {
        *self += a.mul_conj(b);
    }

    #[inline]
    fn amplitude(self) -> f32 {
        self.norm()
    }

    #[inline]
    fn phase(self) -> f32 {
        self.im.atan2(self.re)
    }

    #[inline]
    fn phasor(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Complex::new(cos, sin)
    }
}

/// Dot product of complex samples against real taps.
#[inline]
pub fn dot(samples: &[Sample], taps: &[f32]) -> Sample {
    samples
        .iter()
        .zip(taps)
        .fold(Complex::new(0.0, 0.0), |acc, (&x, &t)| acc + x * t)
}

/// Dot product of complex samples against complex taps.
#[inline]
pub fn dot_complex(samples: &[Sample], taps: &[Sample]) -> Sample {
    samples
        .iter()
        .zip(taps)
        .fold(Complex::new(0.0, 0.0), |acc, (&x, &t)| acc + x * t)
}
