//! Rational polyphase resampler.
//!
//! Converts by `interpolation / decimation` using one low-pass kernel split
//! into `interpolation` sub-filters. A `(phase, offset)` cursor walks the
//! phases: each output advances `phase` by `decimation`, and every wrap past
//! `interpolation` moves the input position forward by one sample.

use num_complex::Complex;
use num_integer::Integer;
use tracing::debug;

use super::fir::DelayLine;
use super::sample::{dot, Sample};
use super::taps::windowed_sinc;
use super::window::Window;
use super::DspBlock;
use crate::error::{Error, Result};

/// Taps per polyphase sub-filter used when none is given.
pub const DEFAULT_TAPS_PER_PHASE: usize = 9;

/// Resampler from `input_rate` to `output_rate` with a polyphase filter bank.
#[derive(Debug, Clone)]
pub struct Polyphase {
    interpolation: usize,
    decimation: usize,
    /// `phases[p]` holds `kernel[p + k * interpolation]`, reversed
    phases: Vec<Vec<f32>>,
    history: DelayLine<Sample>,
    phase: usize,
    /// Input samples to consume before the next output
    offset: usize,
}

impl Polyphase {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        Self::with_taps_per_phase(input_rate, output_rate, DEFAULT_TAPS_PER_PHASE)
    }

    pub fn with_taps_per_phase(
        input_rate: u32,
        output_rate: u32,
        taps_per_phase: usize,
    ) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(Error::invalid(format!(
                "sample rates must be positive, got {input_rate} -> {output_rate}"
            )));
        }
        if taps_per_phase == 0 {
            return Err(Error::invalid("taps per phase must be at least 1"));
        }
        let g = input_rate.gcd(&output_rate);
        let interpolation = (output_rate / g) as usize;
        let decimation = (input_rate / g) as usize;

        // Kernel runs at the interpolated rate and compensates the implicit
        // zero stuffing with a gain of `interpolation`.
        let kernel_rate = input_rate as f64 * interpolation as f64;
        let cutoff = input_rate.min(output_rate) as f64 / 2.0;
        let omega = 2.0 * std::f64::consts::PI * cutoff / kernel_rate;
        let kernel = windowed_sinc(
            interpolation * taps_per_phase,
            omega,
            Window::Nuttall,
            interpolation as f64,
        );

        let phases = (0..interpolation)
            .map(|p| {
                let mut taps: Vec<f32> = kernel
                    .iter()
                    .skip(p)
                    .step_by(interpolation)
                    .copied()
                    .collect();
                taps.reverse();
                taps
            })
            .collect();

        debug!(
            input_rate,
            output_rate, interpolation, decimation, taps_per_phase, "polyphase resampler"
        );

        Ok(Self {
            interpolation,
            decimation,
            phases,
            history: DelayLine::new(taps_per_phase),
            phase: 0,
            offset: 0,
        })
    }

    pub fn interpolation(&self) -> usize {
        self.interpolation
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    pub fn taps_per_phase(&self) -> usize {
        self.history.len()
    }

    /// Exact number of outputs the next call with `input_len` samples yields.
    pub fn output_len(&self, input_len: usize) -> usize {
        let (mut phase, mut offset, mut n) = (self.phase, self.offset, 0);
        while offset < input_len {
            n += 1;
            phase += self.decimation;
            offset += phase / self.interpolation;
            phase %= self.interpolation;
        }
        n
    }

    /// Upper bound on the outputs of any call with `input_len` samples.
    pub fn max_output_len(&self, input_len: usize) -> usize {
        (input_len * self.interpolation).div_ceil(self.decimation) + 1
    }

    /// Push one input, handing every output it completes to `emit`.
    #[inline]
    fn push(&mut self, x: Sample, mut emit: impl FnMut(Sample)) {
        self.history.push(x);
        while self.offset == 0 {
            emit(dot(self.history.window(), &self.phases[self.phase]));
            self.phase += self.decimation;
            self.offset += self.phase / self.interpolation;
            self.phase %= self.interpolation;
        }
        self.offset -= 1;
    }

    /// Resample `input` into `output`, returning the number of samples written.
    ///
    /// `input` and `output` must be distinct: when interpolating, outputs
    /// run ahead of inputs.
    pub fn resample(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<usize> {
        Error::check_capacity(self.output_len(input.len()), output.len())?;
        let mut n = 0;
        for &x in input {
            self.push(x, |y| {
                output[n] = y;
                n += 1;
            });
        }
        Ok(n)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.phase = 0;
        self.offset = 0;
    }
}

impl DspBlock for Polyphase {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let mut out = Vec::with_capacity(self.output_len(data.len()));
        for &x in data {
            self.push(x, |y| out.push(y));
        }
        out
    }
}
