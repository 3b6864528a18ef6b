//! Integration tests for the resampler: tone position and level through
//! rate changes, and chunking independence

mod helpers;

use helpers::{generate_noise, generate_tone};
use num_complex::Complex;
use rdsrx::config::ResamplerConfig;
use rdsrx::dsp::resampler::Resampler;
use rustfft::FftPlanner;

const FFT_SIZE: usize = 4096;

fn resample(resampler: &mut Resampler, input: &[Complex<f32>]) -> Vec<Complex<f32>> {
    let mut output = vec![Complex::new(0.0, 0.0); resampler.max_output_len(input.len())];
    let n = resampler.process_into(input, &mut output).unwrap();
    output.truncate(n);
    output
}

/// Frequency of the strongest FFT bin over the last `FFT_SIZE` samples.
fn peak_frequency(signal: &[Complex<f32>], sample_rate: u32) -> f64 {
    let mut buffer = signal[signal.len() - FFT_SIZE..].to_vec();
    FftPlanner::<f32>::new()
        .plan_fft_forward(FFT_SIZE)
        .process(&mut buffer);
    let (bin, _) = buffer
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
        .unwrap();
    let bin = if bin > FFT_SIZE / 2 {
        bin as f64 - FFT_SIZE as f64
    } else {
        bin as f64
    };
    bin * sample_rate as f64 / FFT_SIZE as f64
}

/// Mean magnitude after the filters have settled.
fn steady_level(signal: &[Complex<f32>]) -> f32 {
    let tail = &signal[signal.len() / 2..];
    tail.iter().map(|x| x.norm()).sum::<f32>() / tail.len() as f32
}

fn assert_tone(signal: &[Complex<f32>], sample_rate: u32, frequency: f64) {
    let resolution = sample_rate as f64 / FFT_SIZE as f64;
    let peak = peak_frequency(signal, sample_rate);
    assert!(
        (peak - frequency).abs() <= 1.5 * resolution,
        "peak at {peak} Hz, expected {frequency} Hz"
    );
    let level = steady_level(signal);
    assert!((level - 1.0).abs() < 0.05, "level {level}");
}

#[test]
fn test_round_trip_48k_12k() {
    let input = generate_tone(1_000.0, 48_000, 48_000, 1.0);

    let mut down = Resampler::new(48_000, 12_000).unwrap();
    assert!(down.decimator().is_some());
    assert!(down.polyphase().is_none());
    let low = resample(&mut down, &input);
    assert_eq!(low.len(), 12_000);
    assert_tone(&low, 12_000, 1_000.0);

    let mut up = Resampler::new(12_000, 48_000).unwrap();
    assert!(up.decimator().is_none());
    let high = resample(&mut up, &low);
    assert_eq!(high.len(), 48_000);
    assert_tone(&high, 48_000, 1_000.0);
}

#[test]
fn test_round_trip_48k_44k1() {
    let input = generate_tone(-2_500.0, 48_000, 48_000, 1.0);

    let mut down = Resampler::new(48_000, 44_100).unwrap();
    let polyphase = down.polyphase().unwrap();
    assert_eq!((polyphase.interpolation(), polyphase.decimation()), (147, 160));
    let low = resample(&mut down, &input);
    assert!((44_099..=44_101).contains(&low.len()), "{}", low.len());
    assert_tone(&low, 44_100, -2_500.0);

    let mut up = Resampler::new(44_100, 48_000).unwrap();
    let high = resample(&mut up, &low);
    assert!((47_999..=48_001).contains(&high.len()), "{}", high.len());
    assert_tone(&high, 48_000, -2_500.0);
}

#[test]
fn test_same_rate_is_identity() {
    let input = generate_noise(1_000, 1);
    let mut resampler = Resampler::new(48_000, 48_000).unwrap();
    assert!(resampler.decimator().is_none());
    assert!(resampler.polyphase().is_none());
    assert_eq!(resample(&mut resampler, &input), input);
}

#[test]
fn test_chunked_matches_single_call() {
    let config = ResamplerConfig {
        input_rate: 250_000,
        output_rate: 48_000,
        ..ResamplerConfig::default()
    };
    let input = generate_noise(20_000, 2);

    let mut whole = Resampler::from_config(&config).unwrap();
    let expected = resample(&mut whole, &input);

    let mut chunked = Resampler::from_config(&config).unwrap();
    let mut got = Vec::new();
    for chunk in input.chunks(777) {
        got.extend(resample(&mut chunked, chunk));
    }
    assert_eq!(expected, got);
}

#[test]
fn test_in_place_matches_process_into() {
    let input = generate_tone(3_000.0, 228_000, 22_800, 0.5);

    let mut reference = Resampler::new(228_000, 2_375).unwrap();
    let expected = resample(&mut reference, &input);

    let mut resampler = Resampler::new(228_000, 2_375).unwrap();
    let mut buffer = input.clone();
    let n = resampler.process_in_place(&mut buffer, input.len()).unwrap();
    assert_eq!(&buffer[..n], &expected[..]);
}
