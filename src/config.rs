//! Parameter snapshots.
//!
//! Components never change rate or loop parameters mid-stream. A caller that
//! wants different settings builds a new snapshot and reconstructs the
//! component from it between processing calls.

use serde::{Deserialize, Serialize};

use crate::dsp::polyphase::DEFAULT_TAPS_PER_PHASE;

/// Settings for [`crate::dsp::resampler::Resampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerConfig {
    /// Source sample rate in Hz
    pub input_rate: u32,
    /// Target sample rate in Hz
    pub output_rate: u32,
    /// Taps per sub-filter in the polyphase stage
    pub taps_per_phase: usize,
    /// Stop-band attenuation of the half-band stages
    pub attenuation_db: f64,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            input_rate: 48_000,
            output_rate: 48_000,
            taps_per_phase: DEFAULT_TAPS_PER_PHASE,
            attenuation_db: 60.0,
        }
    }
}

/// Settings for [`crate::dsp::rds_demod::RdsDemodulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdsConfig {
    /// Sample rate of the incoming multiplex signal in Hz
    pub sample_rate: u32,
    /// RDS subcarrier frequency in Hz; the chain tunes 1187.5 Hz above it,
    /// onto the upper biphase lobe
    pub subcarrier_hz: f64,
    /// AGC loop bandwidth
    pub agc_bandwidth: f32,
    /// Costas loop bandwidth in radians per sample
    pub costas_bandwidth: f32,
    /// Proportional gain of the symbol timing loop
    pub timing_alpha: f32,
    /// Integral gain of the symbol timing loop
    pub timing_beta: f32,
}

impl Default for RdsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 228_000,
            subcarrier_hz: 57_000.0,
            agc_bandwidth: 0.01,
            costas_bandwidth: 0.01,
            timing_alpha: 0.01,
            timing_beta: 2.5e-5,
        }
    }
}
