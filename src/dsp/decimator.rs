//! Power-of-two decimator built from a cascade of half-band stages.
//!
//! Each stage halves the sample rate with a half-band FIR, so the filtering
//! work drops geometrically along the cascade. The stage nearest the output
//! has the narrowest transition band (10% of its input rate); every stage
//! further upstream doubles it, capped at 50%.
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex;
//! use rdsrx::dsp::decimator::Decimator;
//!
//! let mut decimator = Decimator::new(8, 60.0)?;
//! let input = vec![Complex::new(1.0, 0.0); 1024];
//! let mut output = vec![Complex::new(0.0, 0.0); decimator.output_len(input.len())];
//! let n = decimator.decimate(&input, &mut output)?;
//! assert_eq!(n, 128);
//! # Ok::<(), rdsrx::Error>(())
//! ```

use num_complex::Complex;

use super::fir::Fir;
use super::sample::Sample;
use super::taps::{self, TapLength};
use super::window::Window;
use super::DspBlock;
use crate::error::{Error, Result};

/// A decimator that reduces the sample rate by a power of two.
///
/// # Fields
/// - `ratio`: overall decimation factor
/// - `stages`: one decimate-by-2 half-band FIR per factor of two, input side first
/// - `scratch`: intermediate buffer reused across calls
#[derive(Debug, Clone)]
pub struct Decimator {
    ratio: usize,
    stages: Vec<Fir>,
    scratch: Vec<Sample>,
}

/// Transition width of a stage as a fraction of its input rate.
///
/// `from_output` is 0 for the last stage of the cascade.
pub fn stage_transition(from_output: usize) -> f64 {
    (0.1 * (1u64 << from_output.min(16)) as f64).min(0.5)
}

impl Decimator {
    /// Creates a decimator for `ratio`, which must be a power of two >= 2.
    pub fn new(ratio: usize, attenuation_db: f64) -> Result<Self> {
        if ratio < 2 || !ratio.is_power_of_two() {
            return Err(Error::invalid(format!(
                "decimation ratio must be a power of two >= 2, got {ratio}"
            )));
        }
        let count = ratio.trailing_zeros() as usize;
        let stages = (0..count)
            .map(|i| {
                let width = stage_transition(count - 1 - i);
                let taps = taps::half_band(
                    TapLength::Transition {
                        width,
                        attenuation_db,
                    },
                    Window::Nuttall,
                )?;
                Fir::with_decimation(taps, 2)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            ratio,
            stages,
            scratch: Vec::new(),
        })
    }

    /// Returns the overall decimation factor.
    pub fn ratio(&self) -> usize {
        self.ratio
    }

    /// Number of half-band stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Tap count of every stage, input side first.
    pub fn stage_taps(&self) -> Vec<usize> {
        self.stages.iter().map(Fir::tap_count).collect()
    }

    /// Exact number of outputs the next call with `input_len` samples yields.
    pub fn output_len(&self, input_len: usize) -> usize {
        self.stages
            .iter()
            .fold(input_len, |len, stage| stage.output_len(len))
    }

    /// Decimate `input` into `output`, returning the number of samples written.
    pub fn decimate(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<usize> {
        let required = self.output_len(input.len());
        Error::check_capacity(required, output.len())?;

        self.scratch.clear();
        self.scratch.extend_from_slice(input);
        let mut len = input.len();
        for stage in self.stages.iter_mut() {
            len = stage.filter_in_place(&mut self.scratch, len);
        }
        output[..len].copy_from_slice(&self.scratch[..len]);
        Ok(len)
    }

    /// Decimate the first `len` samples of `buf` in place.
    pub fn decimate_in_place(&mut self, buf: &mut [Sample], len: usize) -> usize {
        let mut len = len.min(buf.len());
        for stage in self.stages.iter_mut() {
            len = stage.filter_in_place(buf, len);
        }
        len
    }

    /// Resets every stage's delay line and phase.
    pub fn reset(&mut self) {
        self.stages.iter_mut().for_each(Fir::reset);
    }
}

impl DspBlock for Decimator {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let mut buf = data.to_vec();
        let n = self.decimate_in_place(&mut buf, data.len());
        buf.truncate(n);
        buf
    }
}
