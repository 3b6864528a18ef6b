//! Streaming FIR filter with optional decimation.
//!
//! The delay line keeps the last `taps.len()` inputs between calls, so
//! splitting a stream into chunks yields the same output as a single call.
//! Symmetric half-band taps take a fast path that skips the structural
//! zeros and folds mirrored taps into one multiply.
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use rdsrx::dsp::fir::Fir;
//! use rdsrx::dsp::taps::{self, TapLength};
//! use rdsrx::dsp::window::Window;
//!
//! let taps = taps::half_band(TapLength::Count(31), Window::Nuttall)?;
//! let mut fir = Fir::with_decimation(taps, 2)?;
//!
//! let input = vec![Complex::new(1.0, 0.0); 64];
//! let mut output = vec![Complex::new(0.0, 0.0); 32];
//! let n = fir.filter(&input, &mut output)?;
//! assert_eq!(n, 32);
//! # Ok::<(), rdsrx::Error>(())
//! ```

use num_complex::Complex;

use super::sample::{dot, Sample};
use super::taps::Taps;
use super::DspBlock;
use crate::error::{Error, Result};

/// Fixed-length history of the most recent samples.
///
/// Every sample is written twice, `len` apart, so the newest `len` samples
/// are always one contiguous slice ordered oldest to newest.
#[derive(Debug, Clone)]
pub struct DelayLine<T> {
    buf: Vec<T>,
    len: usize,
    pos: usize,
}

impl<T: Copy + Default> DelayLine<T> {
    pub fn new(len: usize) -> Self {
        let len = len.max(1);
        Self {
            buf: vec![T::default(); 2 * len],
            len,
            pos: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, x: T) {
        self.buf[self.pos] = x;
        self.buf[self.pos + self.len] = x;
        self.pos += 1;
        if self.pos == self.len {
            self.pos = 0;
        }
    }

    /// The last `len` samples, oldest first.
    #[inline]
    pub fn window(&self) -> &[T] {
        &self.buf[self.pos..self.pos + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn clear(&mut self) {
        self.buf.fill(T::default());
        self.pos = 0;
    }
}

/// FIR filter over complex samples with a persistent delay line.
#[derive(Debug, Clone)]
pub struct Fir {
    /// Taps in delay-line order (reversed, newest sample last)
    reversed: Vec<f32>,
    history: DelayLine<Sample>,
    decimation: usize,
    /// Inputs since the last emitted output, modulo `decimation`
    phase: usize,
    half_band: bool,
}

impl Fir {
    /// Plain filter, one output per input.
    pub fn new(taps: Taps) -> Self {
        let half_band = taps.is_half_band();
        let len = taps.len();
        let mut reversed = taps.into_vec();
        reversed.reverse();
        Self {
            reversed,
            history: DelayLine::new(len),
            decimation: 1,
            phase: 0,
            half_band,
        }
    }

    /// Filter keeping one output every `decimation` inputs.
    pub fn with_decimation(taps: Taps, decimation: usize) -> Result<Self> {
        if taps.is_empty() {
            return Err(Error::invalid("FIR needs at least one tap"));
        }
        if decimation == 0 {
            return Err(Error::invalid("decimation must be at least 1"));
        }
        let mut fir = Self::new(taps);
        fir.decimation = decimation;
        Ok(fir)
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    pub fn is_half_band(&self) -> bool {
        self.half_band
    }

    pub fn tap_count(&self) -> usize {
        self.reversed.len()
    }

    /// Exact number of outputs the next call with `input_len` samples yields.
    pub fn output_len(&self, input_len: usize) -> usize {
        let first = (self.decimation - self.phase) % self.decimation;
        if input_len > first {
            (input_len - first - 1) / self.decimation + 1
        } else {
            0
        }
    }

    #[inline]
    fn convolve(&self) -> Sample {
        let x = self.history.window();
        if self.half_band {
            let mid = x.len() / 2;
            let mut acc = x[mid] * self.reversed[mid];
            let mut k = 1;
            while k <= mid {
                acc += (x[mid - k] + x[mid + k]) * self.reversed[mid + k];
                k += 2;
            }
            acc
        } else {
            dot(x, &self.reversed)
        }
    }

    /// Push one sample, returning an output on decimation-phase zero.
    #[inline]
    pub fn step(&mut self, x: Sample) -> Option<Sample> {
        self.history.push(x);
        let emit = self.phase == 0;
        self.phase += 1;
        if self.phase == self.decimation {
            self.phase = 0;
        }
        emit.then(|| self.convolve())
    }

    /// Filter `input` into `output`, returning the number of samples written.
    ///
    /// Fails without touching any state if `output` is too short.
    pub fn filter(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<usize> {
        Error::check_capacity(self.output_len(input.len()), output.len())?;
        let mut n = 0;
        for &x in input {
            if let Some(y) = self.step(x) {
                output[n] = y;
                n += 1;
            }
        }
        Ok(n)
    }

    /// Filter the first `len` samples of `buf` in place.
    ///
    /// Output `j` is only written after input `j` has been read, so the
    /// buffer can serve as both input and output.
    pub fn filter_in_place(&mut self, buf: &mut [Sample], len: usize) -> usize {
        let mut n = 0;
        for i in 0..len.min(buf.len()) {
            if let Some(y) = self.step(buf[i]) {
                buf[n] = y;
                n += 1;
            }
        }
        n
    }

    /// Clear the delay line and decimation phase.
    pub fn reset(&mut self) {
        self.history.clear();
        self.phase = 0;
    }
}

impl DspBlock for Fir {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        data.iter().filter_map(|&x| self.step(x)).collect()
    }
}
