//! Window functions for windowed-sinc filter design.
//!
//! All windows are evaluated in `f64` and are symmetric by construction:
//! sample `n` and sample `len - 1 - n` use the same argument, so kernels
//! built from them are exactly symmetric after rounding to `f32`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Cosine-sum window families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    /// 0.54 - 0.46 cos, about 43 dB sidelobes
    Hamming,
    /// 4-term Blackman-Harris, about 92 dB sidelobes
    BlackmanHarris,
    /// 4-term Nuttall (continuous first derivative)
    #[default]
    Nuttall,
    /// 5-term flat-top, for amplitude-accurate passbands
    FlatTop,
}

impl Window {
    fn terms(self) -> &'static [f64] {
        match self {
            Window::Hamming => &[0.54, 0.46],
            Window::BlackmanHarris => &[0.35875, 0.48829, 0.14128, 0.01168],
            Window::Nuttall => &[0.355768, 0.487396, 0.144232, 0.012604],
            Window::FlatTop => &[
                0.215_578_95,
                0.416_631_58,
                0.277_263_158,
                0.083_578_947,
                0.006_947_368,
            ],
        }
    }

    /// Evaluate the window at a continuous position `u` in `[0, 1]`.
    ///
    /// `u = 0` and `u = 1` are the two edges, `u = 0.5` the centre.
    pub fn at(self, u: f64) -> f64 {
        self.terms()
            .iter()
            .enumerate()
            .map(|(k, &a)| {
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                sign * a * (2.0 * PI * k as f64 * u).cos()
            })
            .sum()
    }

    /// Value of sample `n` of a `len`-point window.
    pub fn value(self, n: usize, len: usize) -> f64 {
        if len <= 1 {
            return 1.0;
        }
        // Mirror onto the first half so both sides evaluate identically.
        let n = n.min(len - 1 - n);
        self.at(n as f64 / (len - 1) as f64)
    }

    /// All `len` coefficients of the window.
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        (0..len).map(|n| self.value(n, len) as f32).collect()
    }
}
