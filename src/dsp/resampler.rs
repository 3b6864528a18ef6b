//! Integer-rate resampler: power-of-two half-band cascade, then a rational
//! polyphase stage for whatever ratio remains.
//!
//! Either stage is skipped when it has nothing to do, so equal rates pass
//! samples through untouched.
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use rdsrx::dsp::resampler::Resampler;
//!
//! let mut resampler = Resampler::new(228_000, 2_375)?;
//! let mut buf = vec![Complex::new(0.5, 0.0); 22_800];
//! let n = resampler.process_in_place(&mut buf, 22_800)?;
//! assert_eq!(n, 238);
//! # Ok::<(), rdsrx::Error>(())
//! ```

use num_complex::Complex;
use tracing::debug;

use super::decimator::Decimator;
use super::polyphase::Polyphase;
use super::sample::Sample;
use super::DspBlock;
use crate::config::ResamplerConfig;
use crate::error::{Error, Result};

/// Largest power of two `2^k <= input_rate / output_rate` that divides
/// `input_rate` exactly, or 1 when the ratio is below two.
pub fn power_of_two_ratio(input_rate: u32, output_rate: u32) -> u32 {
    let mut ratio = 1;
    while input_rate % (ratio * 2) == 0 && input_rate / (ratio * 2) >= output_rate {
        ratio *= 2;
    }
    ratio
}

#[derive(Debug, Clone)]
pub struct Resampler {
    input_rate: u32,
    output_rate: u32,
    decimator: Option<Decimator>,
    polyphase: Option<Polyphase>,
    scratch: Vec<Sample>,
    shadow: Vec<Sample>,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        Self::from_config(&ResamplerConfig {
            input_rate,
            output_rate,
            ..ResamplerConfig::default()
        })
    }

    pub fn from_config(config: &ResamplerConfig) -> Result<Self> {
        let (input_rate, output_rate) = (config.input_rate, config.output_rate);
        if input_rate == 0 || output_rate == 0 {
            return Err(Error::invalid(format!(
                "sample rates must be positive, got {input_rate} -> {output_rate}"
            )));
        }

        let ratio = power_of_two_ratio(input_rate, output_rate);
        let decimator = if ratio >= 2 {
            Some(Decimator::new(ratio as usize, config.attenuation_db)?)
        } else {
            None
        };

        let residual_rate = input_rate / ratio;
        let polyphase = if residual_rate != output_rate {
            Some(Polyphase::with_taps_per_phase(
                residual_rate,
                output_rate,
                config.taps_per_phase,
            )?)
        } else {
            None
        };

        debug!(
            input_rate,
            output_rate,
            decimation = ratio,
            stages = decimator.as_ref().map_or(0, Decimator::stage_count),
            interpolation = polyphase.as_ref().map_or(1, Polyphase::interpolation),
            polyphase_decimation = polyphase.as_ref().map_or(1, Polyphase::decimation),
            "resampler planned"
        );

        Ok(Self {
            input_rate,
            output_rate,
            decimator,
            polyphase,
            scratch: Vec::new(),
            shadow: Vec::new(),
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn decimator(&self) -> Option<&Decimator> {
        self.decimator.as_ref()
    }

    pub fn polyphase(&self) -> Option<&Polyphase> {
        self.polyphase.as_ref()
    }

    /// Exact number of outputs the next call with `input_len` samples yields.
    pub fn output_len(&self, input_len: usize) -> usize {
        let len = self
            .decimator
            .as_ref()
            .map_or(input_len, |d| d.output_len(input_len));
        self.polyphase.as_ref().map_or(len, |p| p.output_len(len))
    }

    /// Buffer size that fits the output of any call with `input_len` samples.
    pub fn max_output_len(&self, input_len: usize) -> usize {
        let len = match &self.decimator {
            Some(d) => input_len.div_ceil(d.ratio()),
            None => input_len,
        };
        match &self.polyphase {
            Some(p) => p.max_output_len(len),
            None => len,
        }
    }

    /// Resample `input` into a distinct `output`, returning the number of
    /// samples written.
    pub fn process_into(&mut self, input: &[Sample], output: &mut [Sample]) -> Result<usize> {
        Error::check_capacity(self.output_len(input.len()), output.len())?;
        let Self {
            decimator,
            polyphase,
            scratch,
            ..
        } = self;
        match (decimator, polyphase) {
            (None, None) => {
                output[..input.len()].copy_from_slice(input);
                Ok(input.len())
            }
            (Some(d), None) => d.decimate(input, output),
            (None, Some(p)) => p.resample(input, output),
            (Some(d), Some(p)) => {
                scratch.clear();
                scratch.extend_from_slice(input);
                let n = d.decimate_in_place(scratch, input.len());
                p.resample(&scratch[..n], output)
            }
        }
    }

    /// Resample the first `len` samples of `buf` in place.
    ///
    /// The whole of `buf` is the capacity; the input is staged in an
    /// internal shadow buffer, so interpolating ratios may grow the valid
    /// length up to `buf.len()`.
    pub fn process_in_place(&mut self, buf: &mut [Sample], len: usize) -> Result<usize> {
        let len = len.min(buf.len());
        let mut shadow = std::mem::take(&mut self.shadow);
        shadow.clear();
        shadow.extend_from_slice(&buf[..len]);
        let result = self.process_into(&shadow, buf);
        self.shadow = shadow;
        result
    }

    pub fn reset(&mut self) {
        if let Some(d) = self.decimator.as_mut() {
            d.reset();
        }
        if let Some(p) = self.polyphase.as_mut() {
            p.reset();
        }
    }
}

impl DspBlock for Resampler {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let mut out = vec![Complex::new(0.0, 0.0); self.output_len(data.len())];
        // Sized from `output_len`, so the capacity check cannot fail.
        let n = self.process_into(data, &mut out).unwrap_or(0);
        out.truncate(n);
        out
    }
}
