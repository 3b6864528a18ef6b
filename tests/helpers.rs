//! Test helper utilities for generating synthetic complex baseband signals
#![allow(dead_code)]

use std::f64::consts::PI;

use num_complex::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdsrx::dsp::rds::{encode_block, BlockType, BLOCK_LENGTH, BIT_RATE};

/// Generate a complex tone at a specific frequency
///
/// # Arguments
/// * `frequency` - Frequency in Hz, negative for a tone below 0 Hz
/// * `sample_rate` - Sample rate in Hz
/// * `num_samples` - Number of samples to generate
/// * `amplitude` - Magnitude of every sample
pub fn generate_tone(
    frequency: f64,
    sample_rate: u32,
    num_samples: usize,
    amplitude: f32,
) -> Vec<Complex<f32>> {
    let step = 2.0 * PI * frequency / sample_rate as f64;
    (0..num_samples)
        .map(|n| {
            let phase = step * n as f64;
            Complex::new(phase.cos() as f32, phase.sin() as f32) * amplitude
        })
        .collect()
}

/// Generate uniform complex noise in `[-1, 1)` on both axes, reproducibly
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<Complex<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_samples)
        .map(|_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect()
}

/// Bits of an RDS group 0A stream cycling through all four segments of
/// `name`, `repeats` times
pub fn ps_group_bits(pi: u16, name: &[u8; 8], repeats: usize) -> Vec<u8> {
    let mut bits = Vec::new();
    for _ in 0..repeats {
        for (offset, chars) in name.chunks(2).enumerate() {
            let blocks = [
                (pi, BlockType::A),
                (offset as u16, BlockType::B),
                (0xE0CD, BlockType::C),
                (((chars[0] as u16) << 8) | chars[1] as u16, BlockType::D),
            ];
            for (data, kind) in blocks {
                let block = encode_block(data, kind);
                bits.extend((0..BLOCK_LENGTH).rev().map(|i| ((block >> i) & 1) as u8));
            }
        }
    }
    bits
}

/// Centred moving average over `span` samples, shorter at the edges
fn moving_average(x: &[f64], span: usize) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(x.len() + 1);
    prefix.push(0.0);
    for v in x {
        prefix.push(prefix[prefix.len() - 1] + v);
    }
    (0..x.len())
        .map(|n| {
            let first = n.saturating_sub(span / 2);
            let last = (n + span - span / 2).min(x.len());
            (prefix[last] - prefix[first]) / (last - first) as f64
        })
        .collect()
}

/// Generate an RDS subcarrier as broadcast: differentially encoded bits,
/// biphase coded (each bit is a half-bit of its polarity followed by a
/// half-bit of the opposite one), band-limited to about 2.4 kHz and
/// modulated onto the subcarrier
///
/// # Arguments
/// * `bits` - Data bits, before differential encoding
/// * `sample_rate` - Sample rate in Hz
/// * `subcarrier` - Carrier frequency in Hz (57 kHz on air)
/// * `amplitude` - Peak amplitude before band-limiting
/// * `phase` - Carrier phase at the first sample, in radians
pub fn generate_rds_subcarrier(
    bits: &[u8],
    sample_rate: u32,
    subcarrier: f64,
    amplitude: f32,
    phase: f64,
) -> Vec<Complex<f32>> {
    let mut level = 0u8;
    let symbols: Vec<f64> = bits
        .iter()
        .map(|&b| {
            level ^= b;
            if level == 1 { 1.0 } else { -1.0 }
        })
        .collect();
    if symbols.is_empty() {
        return Vec::new();
    }

    let samples_per_bit = sample_rate as f64 / BIT_RATE;
    let num_samples = (symbols.len() as f64 * samples_per_bit) as usize;
    let biphase: Vec<f64> = (0..num_samples)
        .map(|n| {
            let t = n as f64 / samples_per_bit;
            let k = (t as usize).min(symbols.len() - 1);
            if t.fract() < 0.5 { symbols[k] } else { -symbols[k] }
        })
        .collect();

    // Two boxcars with their first null at 2.4 kHz
    let span = (sample_rate as f64 / 2400.0).round().max(1.0) as usize;
    let shaped = moving_average(&moving_average(&biphase, span), span);

    let step = 2.0 * PI * subcarrier / sample_rate as f64;
    shaped
        .iter()
        .enumerate()
        .map(|(n, &v)| {
            let carrier = Complex::from_polar(1.0, phase + step * n as f64);
            Complex::new((v * carrier.re) as f32, (v * carrier.im) as f32) * amplitude
        })
        .collect()
}
