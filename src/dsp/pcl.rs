//! Phase control loop (PCL)
//!
//! A second-order phase/frequency tracker shared by every recovery loop in
//! the chain: Costas, PLL, band-edge FLL and both symbol timing loops.
//!
//! # Design
//!
//! One update rule, driven by an error supplied by the caller:
//! - `frequency += beta * error`, clamped to the frequency bounds
//! - `phase += frequency + alpha * error`
//!
//! Carrier loops wrap `phase` into an angle range after every update.
//! Timing loops leave it unwrapped: there it is a fractional sample offset
//! that keeps accumulating.
//!
//! # Example
//!
//! ```
//! use std::f32::consts::PI;
//! use rdsrx::dsp::pcl::PhaseControlLoop;
//!
//! let mut pcl = PhaseControlLoop::new((-PI, PI), (-1.0, 1.0));
//! pcl.set_bandwidth(0.01);
//!
//! pcl.advance(0.2);
//! pcl.wrap_phase();
//! assert!(pcl.frequency() > 0.0);
//! ```

use std::f32::consts::FRAC_1_SQRT_2;

/// Damping factor used by [`PhaseControlLoop::set_bandwidth`].
pub const DAMPING: f32 = FRAC_1_SQRT_2;

/// Second-order tracking loop state.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseControlLoop {
    phase: f32,
    frequency: f32,
    /// Proportional gain (phase path)
    alpha: f32,
    /// Integral gain (frequency path)
    beta: f32,
    min_phase: f32,
    max_phase: f32,
    min_freq: f32,
    max_freq: f32,
}

impl PhaseControlLoop {
    /// Create a loop at zero phase and frequency with both gains at zero.
    ///
    /// # Arguments
    ///
    /// * `phase_bounds` - `[min, max)` range used by [`wrap_phase`](Self::wrap_phase)
    /// * `freq_bounds` - `[min, max]` range the frequency is clamped to
    pub fn new(phase_bounds: (f32, f32), freq_bounds: (f32, f32)) -> Self {
        Self {
            phase: 0.0,
            frequency: 0.0_f32.clamp(freq_bounds.0, freq_bounds.1),
            alpha: 0.0,
            beta: 0.0,
            min_phase: phase_bounds.0,
            max_phase: phase_bounds.1,
            min_freq: freq_bounds.0,
            max_freq: freq_bounds.1,
        }
    }

    /// Derive `alpha` and `beta` from a normalised loop bandwidth for a
    /// critically damped loop.
    pub fn set_bandwidth(&mut self, bandwidth: f32) {
        let (alpha, beta) = loop_gains(bandwidth);
        self.alpha = alpha;
        self.beta = beta;
    }

    /// Set both gains directly.
    pub fn set_alpha_beta(&mut self, alpha: f32, beta: f32) {
        self.alpha = alpha;
        self.beta = beta;
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase;
    }

    /// Set the frequency, clamped to the frequency bounds.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.clamp(self.min_freq, self.max_freq);
    }

    pub fn set_phase_bounds(&mut self, min: f32, max: f32) {
        self.min_phase = min;
        self.max_phase = max;
    }

    pub fn set_frequency_bounds(&mut self, min: f32, max: f32) {
        self.min_freq = min;
        self.max_freq = max;
        self.limit_frequency();
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn frequency_bounds(&self) -> (f32, f32) {
        (self.min_freq, self.max_freq)
    }

    /// Apply one error sample to the loop.
    #[inline]
    pub fn advance(&mut self, error: f32) {
        self.frequency += self.beta * error;
        self.limit_frequency();
        self.phase += self.frequency + self.alpha * error;
    }

    /// Bring `phase` back into `[min_phase, max_phase)`.
    ///
    /// Non-finite phases restart at `min_phase`.
    #[inline]
    pub fn wrap_phase(&mut self) {
        let range = self.max_phase - self.min_phase;
        if !self.phase.is_finite() || !(range > 0.0) {
            self.phase = self.min_phase;
            return;
        }
        if self.phase >= self.max_phase || self.phase < self.min_phase {
            let wrapped = self.min_phase + (self.phase - self.min_phase).rem_euclid(range);
            self.phase = if wrapped < self.max_phase {
                wrapped
            } else {
                self.min_phase
            };
        }
    }

    /// Clamp `frequency` into its bounds.
    #[inline]
    pub fn limit_frequency(&mut self) {
        self.frequency = self.frequency.clamp(self.min_freq, self.max_freq);
    }
}

/// `(alpha, beta)` for a critically damped second-order loop with the
/// given normalised bandwidth.
pub fn loop_gains(bandwidth: f32) -> (f32, f32) {
    let denom = 1.0 + 2.0 * DAMPING * bandwidth + bandwidth * bandwidth;
    let alpha = 4.0 * DAMPING * bandwidth / denom;
    let beta = 4.0 * bandwidth * bandwidth / denom;
    (alpha, beta)
}

/// `-1`, `0` or `1`; unlike `f32::signum`, zero maps to zero.
#[inline]
pub(crate) fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
