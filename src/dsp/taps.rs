//! Windowed-sinc tap design.
//!
//! Low-pass, high-pass, band-pass and half-band FIR taps sized either
//! explicitly or from a transition width and stop-band attenuation using
//! Harris's rule of thumb `N ~ attenuation / 22 * fs / transition_width`.
//!
//! # Example
//!
//! ```
//! use rdsrx::dsp::taps::{self, TapLength};
//! use rdsrx::dsp::window::Window;
//!
//! // 15 kHz low-pass at 240 kHz, 2 kHz transition, 90 dB stop band
//! let lp = taps::low_pass(240_000.0, 15_000.0, TapLength::transition(2_000.0), Window::Nuttall)?;
//! assert!(lp.is_symmetric());
//! assert!((lp.dc_gain() - 1.0).abs() < 1e-4);
//! # Ok::<(), rdsrx::Error>(())
//! ```

use std::f64::consts::PI;

use num_complex::Complex;

use super::sample::Sample;
use super::window::Window;
use crate::error::{Error, Result};

/// Stop-band attenuation used when none is given.
pub const DEFAULT_ATTENUATION_DB: f64 = 90.0;

/// Tolerance under which an even-offset tap counts as a structural zero.
pub const HALF_BAND_TOLERANCE: f32 = 1e-5;

/// How long a tap set should be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapLength {
    /// Estimate the count from a transition width (Hz) and attenuation (dB).
    Transition { width: f64, attenuation_db: f64 },
    /// Use exactly this many taps. Must be odd.
    Count(usize),
}

impl TapLength {
    /// Transition width with the default 90 dB attenuation.
    pub fn transition(width: f64) -> Self {
        TapLength::Transition {
            width,
            attenuation_db: DEFAULT_ATTENUATION_DB,
        }
    }

    fn resolve(self, sample_rate: f64) -> Result<usize> {
        match self {
            TapLength::Transition {
                width,
                attenuation_db,
            } => estimate_tap_count(attenuation_db, sample_rate, width),
            TapLength::Count(n) => {
                if n == 0 || n % 2 == 0 {
                    return Err(Error::invalid(format!("tap count must be odd, got {n}")));
                }
                Ok(n)
            }
        }
    }
}

/// An immutable set of real FIR coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Taps {
    coeffs: Vec<f32>,
}

impl Taps {
    pub fn new(coeffs: Vec<f32>) -> Self {
        Self { coeffs }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coeffs
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Sum of all coefficients.
    pub fn dc_gain(&self) -> f32 {
        self.coeffs.iter().map(|&t| t as f64).sum::<f64>() as f32
    }

    /// Odd length with `taps[i] == taps[N - 1 - i]`.
    pub fn is_symmetric(&self) -> bool {
        let n = self.coeffs.len();
        n % 2 == 1
            && (0..n / 2).all(|i| (self.coeffs[i] - self.coeffs[n - 1 - i]).abs() <= f32::EPSILON)
    }

    /// Symmetric with every even, non-zero offset from the centre at zero.
    pub fn is_half_band(&self) -> bool {
        let n = self.coeffs.len();
        if n < 3 || !self.is_symmetric() {
            return false;
        }
        let mid = n / 2;
        (2..=mid)
            .step_by(2)
            .all(|k| self.coeffs[mid + k].abs() <= HALF_BAND_TOLERANCE)
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.coeffs
    }
}

impl AsRef<[f32]> for Taps {
    fn as_ref(&self) -> &[f32] {
        &self.coeffs
    }
}

/// Harris's estimate of the tap count, rounded up to odd.
pub fn estimate_tap_count(
    attenuation_db: f64,
    sample_rate: f64,
    transition_width: f64,
) -> Result<usize> {
    if !(attenuation_db > 0.0) {
        return Err(Error::invalid(format!(
            "attenuation must be positive, got {attenuation_db}"
        )));
    }
    if !(sample_rate > 0.0) {
        return Err(Error::invalid(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if !(transition_width > 0.0) {
        return Err(Error::invalid(format!(
            "transition width must be positive, got {transition_width}"
        )));
    }
    let n = (attenuation_db / 22.0 * sample_rate / transition_width).ceil() as usize;
    Ok(n.max(1) | 1)
}

/// `sin(x) / x` with the removable singularity filled in.
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        x.sin() / x
    }
}

/// Windowed sinc of any length, centred on `(len - 1) / 2`, scaled so the
/// coefficients sum to `gain`.
///
/// `omega` is the cutoff in radians per sample (`2 pi fc / fs`).
pub(crate) fn windowed_sinc(len: usize, omega: f64, window: Window, gain: f64) -> Vec<f32> {
    let centre = (len as f64 - 1.0) / 2.0;
    let raw: Vec<f64> = (0..len)
        .map(|n| {
            let t = (n as f64 - centre).abs();
            sinc(omega * t) * window.value(n, len)
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|&v| (v * gain / sum) as f32).collect()
}

fn check_cutoff(sample_rate: f64, cutoff: f64) -> Result<()> {
    if !(sample_rate > 0.0) {
        return Err(Error::invalid(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if !(cutoff > 0.0) || cutoff >= sample_rate / 2.0 {
        return Err(Error::invalid(format!(
            "cutoff {cutoff} Hz outside (0, {}) Hz",
            sample_rate / 2.0
        )));
    }
    Ok(())
}

/// Low-pass taps with unity DC gain.
pub fn low_pass(sample_rate: f64, cutoff: f64, length: TapLength, window: Window) -> Result<Taps> {
    low_pass_with_gain(sample_rate, cutoff, length, window, 1.0)
}

/// Low-pass taps whose coefficients sum to `gain`.
pub fn low_pass_with_gain(
    sample_rate: f64,
    cutoff: f64,
    length: TapLength,
    window: Window,
    gain: f64,
) -> Result<Taps> {
    check_cutoff(sample_rate, cutoff)?;
    let n = length.resolve(sample_rate)?;
    let omega = 2.0 * PI * cutoff / sample_rate;
    Ok(Taps::new(windowed_sinc(n, omega, window, gain)))
}

/// High-pass taps: the mirrored low-pass with every other tap negated.
///
/// Passband gain at Nyquist is 1.
pub fn high_pass(sample_rate: f64, cutoff: f64, length: TapLength, window: Window) -> Result<Taps> {
    check_cutoff(sample_rate, cutoff)?;
    let mut taps = low_pass(sample_rate, sample_rate / 2.0 - cutoff, length, window)?.into_vec();
    let mid = taps.len() / 2;
    for (n, t) in taps.iter_mut().enumerate() {
        if n.abs_diff(mid) % 2 == 1 {
            *t = -*t;
        }
    }
    Ok(Taps::new(taps))
}

/// Band-pass taps between `low` and `high` Hz: a low-pass of half the
/// bandwidth shifted to the band centre with `2 cos(w0 n)`.
pub fn band_pass(
    sample_rate: f64,
    low: f64,
    high: f64,
    length: TapLength,
    window: Window,
) -> Result<Taps> {
    check_cutoff(sample_rate, high)?;
    if !(low > 0.0) || low >= high {
        return Err(Error::invalid(format!(
            "band edges must satisfy 0 < low < high, got {low}..{high}"
        )));
    }
    let half_width = (high - low) / 2.0;
    let centre = (high + low) / 2.0;
    let proto = low_pass(sample_rate, half_width, length, window)?.into_vec();
    let mid = (proto.len() / 2) as f64;
    let w0 = 2.0 * PI * centre / sample_rate;
    let taps = proto
        .iter()
        .enumerate()
        .map(|(n, &t)| (t as f64 * 2.0 * (w0 * (n as f64 - mid)).cos()) as f32)
        .collect();
    Ok(Taps::new(taps))
}

/// Half-band low-pass (cutoff at a quarter of the sample rate).
///
/// Estimated lengths are rounded up to `4k + 3` so the outermost taps are
/// non-zero. Even offsets other than the centre are set to exactly zero.
pub fn half_band(length: TapLength, window: Window) -> Result<Taps> {
    let n = match length {
        TapLength::Transition { .. } => {
            let n = length.resolve(1.0)?;
            if n % 4 == 1 {
                n + 2
            } else {
                n
            }
        }
        TapLength::Count(_) => length.resolve(1.0)?,
    };
    let mut taps = windowed_sinc(n, PI / 2.0, window, 1.0);
    let mid = n / 2;
    for (i, t) in taps.iter_mut().enumerate() {
        let k = i.abs_diff(mid);
        if k != 0 && k % 2 == 0 {
            *t = 0.0;
        }
    }
    let sum: f64 = taps.iter().map(|&t| t as f64).sum();
    for t in taps.iter_mut() {
        *t = (*t as f64 / sum) as f32;
    }
    Ok(Taps::new(taps))
}

/// Shift real taps to `freq` (cycles per sample): `taps[n] e^{j 2 pi f (n - mid)}`.
pub fn complex_shift(taps: &Taps, freq: f64) -> Vec<Sample> {
    let mid = (taps.len() as f64 - 1.0) / 2.0;
    taps.as_slice()
        .iter()
        .enumerate()
        .map(|(n, &t)| {
            let arg = 2.0 * PI * freq * (n as f64 - mid);
            Complex::new((t as f64 * arg.cos()) as f32, (t as f64 * arg.sin()) as f32)
        })
        .collect()
}
