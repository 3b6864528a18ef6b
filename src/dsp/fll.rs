//! Band-edge frequency-locked loop.
//!
//! Two complex filters sit on the upper and lower edges of the expected
//! signal band, `+-(1 + rolloff) / 2` symbol rates from the centre. When the
//! signal is centred both see the same energy; any offset tips the balance
//! and `|upper| - |lower|` steers the loop frequency. The loop has no
//! proportional term, only frequency is corrected, which makes it a coarse
//! acquisition stage ahead of a Costas loop.

use std::f32::consts::PI;

use num_complex::Complex;

use super::fir::DelayLine;
use super::pcl::PhaseControlLoop;
use super::sample::{dot_complex, Sample, SampleExt};
use super::taps::{self, TapLength};
use super::window::Window;
use super::DspBlock;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct BandEdgeFll {
    pcl: PhaseControlLoop,
    history: DelayLine<Sample>,
    /// Upper and lower edge filters in delay-line order
    upper: Vec<Sample>,
    lower: Vec<Sample>,
}

impl BandEdgeFll {
    /// Create a band-edge FLL.
    ///
    /// # Arguments
    ///
    /// * `samples_per_symbol` - oversampling of the input, at least 2
    /// * `rolloff` - excess bandwidth of the signal, in `(0, 1]`
    /// * `tap_count` - length of each edge filter, odd
    /// * `bandwidth` - loop bandwidth, in `(0, 1)`
    pub fn new(
        samples_per_symbol: f32,
        rolloff: f32,
        tap_count: usize,
        bandwidth: f32,
    ) -> Result<Self> {
        if !(samples_per_symbol >= 2.0) {
            return Err(Error::invalid(format!(
                "samples per symbol must be at least 2, got {samples_per_symbol}"
            )));
        }
        if !(rolloff > 0.0 && rolloff <= 1.0) {
            return Err(Error::invalid(format!(
                "rolloff must be in (0, 1], got {rolloff}"
            )));
        }
        if !(bandwidth > 0.0 && bandwidth < 1.0) {
            return Err(Error::invalid(format!(
                "FLL bandwidth must be in (0, 1), got {bandwidth}"
            )));
        }

        // Symbol rate is 1, so the sample rate is `samples_per_symbol`.
        let sps = samples_per_symbol as f64;
        let proto = taps::low_pass(
            sps,
            rolloff as f64 / 2.0,
            TapLength::Count(tap_count),
            Window::BlackmanHarris,
        )?;
        let edge = (1.0 + rolloff as f64) / 2.0 / sps;
        let mut upper = taps::complex_shift(&proto, edge);
        let mut lower = taps::complex_shift(&proto, -edge);
        upper.reverse();
        lower.reverse();

        let max_freq = 2.0 * PI * edge as f32;
        let mut pcl = PhaseControlLoop::new((-PI, PI), (-max_freq, max_freq));
        let (_, beta) = super::pcl::loop_gains(bandwidth);
        pcl.set_alpha_beta(0.0, beta);

        Ok(Self {
            pcl,
            history: DelayLine::new(tap_count),
            upper,
            lower,
        })
    }

    /// Current frequency estimate in radians per sample.
    pub fn frequency(&self) -> f32 {
        self.pcl.frequency()
    }

    pub fn pcl(&self) -> &PhaseControlLoop {
        &self.pcl
    }

    /// Derotate one sample and update the frequency estimate.
    #[inline]
    pub fn step(&mut self, x: Sample) -> Sample {
        let out = x * Sample::phasor(-self.pcl.phase());
        self.history.push(out);
        let window = self.history.window();
        let upper = dot_complex(window, &self.upper).amplitude();
        let lower = dot_complex(window, &self.lower).amplitude();
        let error = (upper - lower).clamp(-1.0, 1.0);
        self.pcl.advance(error);
        self.pcl.wrap_phase();
        out
    }

    pub fn process_in_place(&mut self, buf: &mut [Sample]) {
        for x in buf.iter_mut() {
            *x = self.step(*x);
        }
    }
}

impl DspBlock for BandEdgeFll {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>> {
        data.iter().map(|&x| self.step(x)).collect()
    }
}
