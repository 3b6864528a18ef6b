//! Symbol timing recovery
//!
//! Polyphase interpolating timing recovery driven by a [`PhaseControlLoop`]
//! whose phase is a fractional sample position and whose frequency is the
//! number of samples per symbol.
//!
//! # Design
//!
//! - A 128-phase, 8-tap windowed-sinc bank interpolates between input
//!   samples with 1/128 sample resolution
//! - One output is produced per symbol; after each output the loop adds
//!   `samples_per_symbol` (plus the error correction) to the fractional
//!   position, and the integer part becomes a countdown of input samples
//! - Frequency is bounded to `+-1%` of the nominal samples per symbol
//!
//! Two error detectors plug into the same engine:
//! - [`MmDetector`]: Mueller & Mueller, decision directed
//! - [`FdDetector`]: derivative of the interpolated output with respect to
//!   the fractional phase, gated to once every `samples_per_symbol` inputs
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use rdsrx::dsp::timing::MuellerMuller;
//!
//! let mut mm = MuellerMuller::new(2.0, 0.01, 2.5e-5)?;
//! let mut symbols = Vec::new();
//! for n in 0..64 {
//!     let x = Complex::new(if (n / 2) % 2 == 0 { 1.0 } else { -1.0 }, 0.0);
//!     if let Some(y) = mm.push(x) {
//!         symbols.push(y);
//!     }
//! }
//! assert!((31..=33).contains(&symbols.len()));
//! # Ok::<(), rdsrx::Error>(())
//! ```

use std::f64::consts::PI;

use num_complex::Complex;

use super::fir::DelayLine;
use super::pcl::{sign, PhaseControlLoop};
use super::sample::{dot, Sample};
use super::window::Window;
use super::DspBlock;
use crate::error::{Error, Result};

/// Fractional phases in the interpolator bank.
pub const INTERP_PHASES: usize = 128;

/// Taps per interpolator phase.
pub const INTERP_TAPS: usize = 8;

/// Allowed drift of the symbol rate around its nominal value.
pub const FREQUENCY_TOLERANCE: f32 = 0.01;

/// Fractional-delay interpolator bank.
///
/// Applied to a window of 8 samples (oldest first), phase `p` returns the
/// signal at position `3 + p / 128` within the window.
#[derive(Debug, Clone)]
pub struct InterpolatorBank {
    phases: Vec<[f32; INTERP_TAPS]>,
}

impl InterpolatorBank {
    pub fn new() -> Self {
        let centre = (INTERP_TAPS / 2 - 1) as f64;
        let half_span = (INTERP_TAPS / 2) as f64;
        let phases = (0..INTERP_PHASES)
            .map(|p| {
                let mu = p as f64 / INTERP_PHASES as f64;
                let raw: Vec<f64> = (0..INTERP_TAPS)
                    .map(|j| {
                        let d = j as f64 - centre - mu;
                        let sinc = if d.abs() < 1e-12 {
                            1.0
                        } else {
                            (PI * d).sin() / (PI * d)
                        };
                        sinc * Window::BlackmanHarris.at((d + half_span) / (2.0 * half_span))
                    })
                    .collect();
                let sum: f64 = raw.iter().sum();
                let mut taps = [0.0f32; INTERP_TAPS];
                for (t, r) in taps.iter_mut().zip(&raw) {
                    *t = (r / sum) as f32;
                }
                taps
            })
            .collect();
        Self { phases }
    }

    /// Interpolate `window` (exactly [`INTERP_TAPS`] samples) at phase `p`.
    #[inline]
    pub fn interpolate(&self, window: &[Sample], p: usize) -> Sample {
        dot(window, &self.phases[p.min(INTERP_PHASES - 1)])
    }

    /// Derivative of the interpolated signal with respect to position, in
    /// units per sample. Central difference inside the bank, one-sided at
    /// either edge.
    #[inline]
    pub fn derivative(&self, window: &[Sample], p: usize) -> Sample {
        let scale = INTERP_PHASES as f32;
        match p {
            0 => (self.interpolate(window, 1) - self.interpolate(window, 0)) * scale,
            p if p >= INTERP_PHASES - 1 => {
                (self.interpolate(window, INTERP_PHASES - 1)
                    - self.interpolate(window, INTERP_PHASES - 2))
                    * scale
            }
            p => {
                (self.interpolate(window, p + 1) - self.interpolate(window, p - 1)) * (scale / 2.0)
            }
        }
    }
}

impl Default for InterpolatorBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Hard decision on both axes, `+-1 +-1j`.
#[inline]
fn decision(x: Sample) -> Sample {
    Complex::new(
        if x.re > 0.0 { 1.0 } else { -1.0 },
        if x.im > 0.0 { 1.0 } else { -1.0 },
    )
}

/// Timing error detector plugged into [`SymbolSync`].
pub trait TimingErrorDetector {
    /// Error for the symbol `out`, interpolated at `phase` from `window`.
    ///
    /// `inputs_since_last` counts input samples consumed since the detector
    /// last reported that it evaluated; return `None` to skip this symbol.
    fn error(
        &mut self,
        bank: &InterpolatorBank,
        window: &[Sample],
        phase: usize,
        out: Sample,
        inputs_since_last: usize,
    ) -> Option<f32>;
}

/// Mueller & Mueller detector over the last three symbols and decisions.
#[derive(Debug, Clone, Default)]
pub struct MmDetector {
    /// Interpolated symbols, newest first
    p: [Sample; 3],
    /// Their decisions, newest first
    c: [Sample; 3],
}

impl TimingErrorDetector for MmDetector {
    fn error(
        &mut self,
        _bank: &InterpolatorBank,
        _window: &[Sample],
        _phase: usize,
        out: Sample,
        _inputs_since_last: usize,
    ) -> Option<f32> {
        self.p = [out, self.p[0], self.p[1]];
        self.c = [decision(out), self.c[0], self.c[1]];
        let y = (self.p[0] - self.p[2]) * self.c[1].conj();
        let x = (self.c[0] - self.c[2]) * self.p[1].conj();
        Some((y - x).re.clamp(-1.0, 1.0))
    }
}

/// Fractional-delay (gradient) detector.
#[derive(Debug, Clone, Default)]
pub struct FdDetector {
    /// Minimum inputs between two evaluations, `floor(samples_per_symbol)`
    gate: usize,
}

impl TimingErrorDetector for FdDetector {
    fn error(
        &mut self,
        bank: &InterpolatorBank,
        window: &[Sample],
        phase: usize,
        out: Sample,
        inputs_since_last: usize,
    ) -> Option<f32> {
        if inputs_since_last < self.gate {
            return None;
        }
        let d = bank.derivative(window, phase);
        Some((sign(out.re) * d.re + sign(out.im) * d.im).clamp(-1.0, 1.0))
    }
}

/// Interpolating symbol synchroniser, generic over the error detector.
#[derive(Debug, Clone)]
pub struct SymbolSync<D> {
    bank: InterpolatorBank,
    history: DelayLine<Sample>,
    pcl: PhaseControlLoop,
    detector: D,
    samples_per_symbol: f32,
    /// Input samples to consume before the next output
    countdown: usize,
    /// Input samples since the detector last evaluated
    since_error: usize,
}

/// Mueller & Mueller timing recovery.
pub type MuellerMuller = SymbolSync<MmDetector>;

/// Fractional-delay derivative timing recovery.
pub type FractionalDelay = SymbolSync<FdDetector>;

impl SymbolSync<MmDetector> {
    /// # Arguments
    ///
    /// * `samples_per_symbol` - nominal oversampling, at least 2
    /// * `alpha` - proportional (phase) gain, in `(0, 0.5]`
    /// * `beta` - integral (rate) gain, non-negative
    pub fn new(samples_per_symbol: f32, alpha: f32, beta: f32) -> Result<Self> {
        Self::with_detector(samples_per_symbol, alpha, beta, MmDetector::default())
    }
}

impl SymbolSync<FdDetector> {
    /// Same arguments as [`MuellerMuller::new`].
    pub fn new(samples_per_symbol: f32, alpha: f32, beta: f32) -> Result<Self> {
        let gate = samples_per_symbol.floor().max(1.0) as usize;
        Self::with_detector(samples_per_symbol, alpha, beta, FdDetector { gate })
    }
}

impl<D: TimingErrorDetector> SymbolSync<D> {
    pub fn with_detector(
        samples_per_symbol: f32,
        alpha: f32,
        beta: f32,
        detector: D,
    ) -> Result<Self> {
        if !(samples_per_symbol >= 2.0) || !samples_per_symbol.is_finite() {
            return Err(Error::invalid(format!(
                "samples per symbol must be at least 2, got {samples_per_symbol}"
            )));
        }
        if !(alpha > 0.0 && alpha <= 0.5) {
            return Err(Error::invalid(format!(
                "timing alpha must be in (0, 0.5], got {alpha}"
            )));
        }
        if !(beta >= 0.0) || !beta.is_finite() {
            return Err(Error::invalid(format!(
                "timing beta must be non-negative, got {beta}"
            )));
        }
        let tolerance = FREQUENCY_TOLERANCE * samples_per_symbol;
        let mut pcl = PhaseControlLoop::new(
            (0.0, 1.0),
            (samples_per_symbol - tolerance, samples_per_symbol + tolerance),
        );
        pcl.set_alpha_beta(alpha, beta);
        pcl.set_frequency(samples_per_symbol);
        Ok(Self {
            bank: InterpolatorBank::new(),
            history: DelayLine::new(INTERP_TAPS),
            pcl,
            detector,
            samples_per_symbol,
            countdown: 0,
            since_error: 0,
        })
    }

    pub fn samples_per_symbol(&self) -> f32 {
        self.samples_per_symbol
    }

    /// Current samples-per-symbol estimate.
    pub fn rate(&self) -> f32 {
        self.pcl.frequency()
    }

    /// Current fractional sampling position in `[0, 1)`.
    pub fn mu(&self) -> f32 {
        self.pcl.phase()
    }

    pub fn pcl(&self) -> &PhaseControlLoop {
        &self.pcl
    }

    /// Smallest number of inputs between two outputs.
    fn min_step(&self) -> usize {
        let (min_rate, _) = self.pcl.frequency_bounds();
        (min_rate - self.pcl.alpha()).floor().max(1.0) as usize
    }

    /// Buffer size that fits the output of any call with `input_len` samples.
    pub fn max_output_len(&self, input_len: usize) -> usize {
        if input_len > self.countdown {
            (input_len - self.countdown - 1) / self.min_step() + 1
        } else {
            0
        }
    }

    /// Consume one input sample, returning a symbol when one is due.
    #[inline]
    pub fn push(&mut self, x: Sample) -> Option<Sample> {
        self.history.push(x);
        self.since_error += 1;

        let mut out = None;
        if self.countdown == 0 {
            let mu = self.pcl.phase();
            let phase = ((mu * INTERP_PHASES as f32) as usize).min(INTERP_PHASES - 1);
            let window = self.history.window();
            let y = self.bank.interpolate(window, phase);
            let error = self
                .detector
                .error(&self.bank, window, phase, y, self.since_error);
            if error.is_some() {
                self.since_error = 0;
            }

            self.pcl.advance(error.unwrap_or(0.0));
            let whole = self.pcl.phase().floor();
            self.pcl.set_phase(self.pcl.phase() - whole);
            // `whole >= 1` because the rate never drops below 1.98 and
            // alpha is at most 0.5.
            self.countdown = whole.max(1.0) as usize;
            out = Some(y);
        }
        self.countdown -= 1;
        out
    }

    /// Recover symbols from `input` into `output`, returning the count.
    ///
    /// `output` must hold [`max_output_len`](Self::max_output_len) samples.
    pub fn process_into(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<usize> {
        Error::check_capacity(self.max_output_len(input.len()), output.len())?;
        let mut n = 0;
        for &x in input {
            if let Some(y) = self.push(x) {
                output[n] = y;
                n += 1;
            }
        }
        Ok(n)
    }

    /// Recover symbols from the first `len` samples of `buf` in place.
    ///
    /// Symbol `j` is written after input `j` has been read.
    pub fn process_in_place(&mut self, buf: &mut [Sample], len: usize) -> usize {
        let mut n = 0;
        for i in 0..len.min(buf.len()) {
            if let Some(y) = self.push(buf[i]) {
                buf[n] = y;
                n += 1;
            }
        }
        n
    }
}

impl<D: TimingErrorDetector> DspBlock for SymbolSync<D> {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        data.iter().filter_map(|&x| self.push(x)).collect()
    }
}
