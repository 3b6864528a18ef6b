//! Digital Signal Processing (DSP) module.
//!
//! Building blocks for a receive chain over complex baseband samples, from
//! filter design up to the RDS protocol decoder.
//!
//! # Modules
//! - `sample`, `window`, `taps`: primitives and filter design
//! - `fir`, `decimator`, `polyphase`, `resampler`: multirate filtering
//! - `pcl`, `costas`, `pll`, `fll`, `timing`: synchronisation loops
//! - `agc`, `rotate`: amplitude and frequency correction
//! - `rds`, `rds_demod`: Radio Data System decoding
//!
//! # Traits
//! - [`DspBlock`]: A trait representing a generic DSP processing block that
//!   operates on slices of complex samples.
use num_complex::Complex;

pub mod agc;
pub mod costas;
pub mod decimator;
pub mod fir;
pub mod fll;
pub mod pcl;
pub mod pll;
pub mod polyphase;
pub mod rds;
pub mod rds_demod;
pub mod resampler;
pub mod rotate;
pub mod sample;
pub mod taps;
pub mod timing;
pub mod window;

pub trait DspBlock {
    fn process(&mut self, data: &[Complex<f32>]) -> Vec<Complex<f32>>;
}
