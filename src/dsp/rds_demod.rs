//! RDS demodulation chain
//!
//! Turns the FM multiplex (complex, at the multiplex sample rate) into RDS
//! text:
//!
//! 1. shift the upper biphase lobe of the 57 kHz subcarrier, 1187.5 Hz above
//!    it, down to 0 Hz ([`Rotate`])
//! 2. resample to 2375 Hz, two samples per bit ([`Resampler`])
//! 3. normalise the amplitude ([`Agc`])
//! 4. lock the carrier ([`Costas`])
//! 5. recover symbol timing ([`MuellerMuller`])
//! 6. hard-slice on the real part and decode differentially
//! 7. feed the bits to the [`RdsDecoder`]
//!
//! RDS bits are biphase coded: each bit is sent as a half-bit of one polarity
//! followed by a half-bit of the other. The spectrum therefore has two lobes
//! at +-1187.5 Hz around the subcarrier and a null at the subcarrier itself.
//! With one lobe centred and the other filtered away by the resampler, what
//! is left is plain BPSK at the bit rate.
//!
//! Any stage can be observed through [`Demodulator::demodulate`], which hands
//! back a copy of that stage's buffer.

use serde::Serialize;
use tracing::{debug, trace};

use super::agc::Agc;
use super::costas::Costas;
use super::rds::{RdsDecoder, BIT_RATE};
use super::resampler::Resampler;
use super::rotate::Rotate;
use super::sample::Sample;
use super::timing::MuellerMuller;
use crate::config::{RdsConfig, ResamplerConfig};
use crate::error::{Error, Result};

/// Sample rate of the symbol recovery stages: two samples per RDS bit.
pub const SYMBOL_RATE: u32 = 2375;

pub const SAMPLES_PER_SYMBOL: f32 = 2.0;

/// Intermediate point of a demodulation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    /// After the frequency shift
    Shifted,
    /// After resampling to the symbol recovery rate
    Resampled,
    /// After the AGC
    Gained,
    /// After carrier recovery
    CarrierLocked,
    /// Timing-recovered symbols
    Symbols,
    /// Differentially decoded bits
    Bits,
}

/// Copy of an observed stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Samples(Vec<Sample>),
    Bits(Vec<u8>),
}

/// Result of one [`Demodulator::demodulate`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct DemodOutput {
    /// Valid samples left at the front of the buffer
    pub len: usize,
    /// Buffer of the requested stage, if one was requested
    pub observed: Option<StageOutput>,
}

/// A demodulator working in place on a sample buffer.
pub trait Demodulator {
    /// Process the first `len` samples of `buffer`.
    ///
    /// The buffer is reused as scratch space by every stage; on return its
    /// first `output.len` samples hold the demodulator's final sample stage.
    fn demodulate(
        &mut self,
        buffer: &mut [Sample],
        len: usize,
        observe: Option<Stage>,
    ) -> Result<DemodOutput>;
}

/// Complete RDS receive chain.
#[derive(Debug, Clone)]
pub struct RdsDemodulator {
    rotate: Rotate,
    /// Frequency brought down to 0 Hz
    shift_hz: f64,
    resampler: Resampler,
    agc: Agc,
    costas: Costas,
    timing: MuellerMuller,
    /// Previous hard decision, for differential decoding
    last_symbol: u8,
    bits: Vec<u8>,
    decoder: RdsDecoder,
}

impl RdsDemodulator {
    /// Chain with default loop parameters for a multiplex at `sample_rate`.
    pub fn new(sample_rate: u32) -> Result<Self> {
        Self::from_config(&RdsConfig {
            sample_rate,
            ..RdsConfig::default()
        })
    }

    pub fn from_config(config: &RdsConfig) -> Result<Self> {
        if config.sample_rate == 0 {
            return Err(Error::invalid("sample rate must be positive"));
        }
        let nyquist = config.sample_rate as f64 / 2.0;
        let shift_hz = config.subcarrier_hz + BIT_RATE;
        if !(shift_hz.abs() < nyquist) {
            return Err(Error::invalid(format!(
                "RDS band at {shift_hz} Hz outside the +-{nyquist} Hz band",
            )));
        }

        let resampler = Resampler::from_config(&ResamplerConfig {
            input_rate: config.sample_rate,
            output_rate: SYMBOL_RATE,
            ..ResamplerConfig::default()
        })?;

        debug!(
            sample_rate = config.sample_rate,
            subcarrier_hz = config.subcarrier_hz,
            shift_hz,
            "RDS demodulator"
        );

        Ok(Self {
            rotate: Rotate::from_frequency(-shift_hz, config.sample_rate as f64),
            shift_hz,
            resampler,
            agc: Agc::new(config.agc_bandwidth)?,
            costas: Costas::new(config.costas_bandwidth)?,
            timing: MuellerMuller::new(
                SAMPLES_PER_SYMBOL,
                config.timing_alpha,
                config.timing_beta,
            )?,
            last_symbol: 0,
            bits: Vec::new(),
            decoder: RdsDecoder::new(),
        })
    }

    /// Frequency of the multiplex that ends up at 0 Hz.
    pub fn shift_hz(&self) -> f64 {
        self.shift_hz
    }

    pub fn decoder(&self) -> &RdsDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut RdsDecoder {
        &mut self.decoder
    }

    /// Updated display text, see [`RdsDecoder::text`].
    pub fn text(&mut self) -> Option<String> {
        self.decoder.text()
    }
}

fn observe_samples(
    observe: Option<Stage>,
    stage: Stage,
    samples: &[Sample],
) -> Option<StageOutput> {
    (observe == Some(stage)).then(|| StageOutput::Samples(samples.to_vec()))
}

impl Demodulator for RdsDemodulator {
    fn demodulate(
        &mut self,
        buffer: &mut [Sample],
        len: usize,
        observe: Option<Stage>,
    ) -> Result<DemodOutput> {
        Error::check_capacity(len, buffer.len())?;

        let mut observed = None;

        self.rotate.process_in_place(&mut buffer[..len]);
        observed = observed.or_else(|| observe_samples(observe, Stage::Shifted, &buffer[..len]));

        let n = self.resampler.process_in_place(buffer, len)?;
        observed = observed.or_else(|| observe_samples(observe, Stage::Resampled, &buffer[..n]));

        self.agc.process_in_place(&mut buffer[..n]);
        observed = observed.or_else(|| observe_samples(observe, Stage::Gained, &buffer[..n]));

        self.costas.process_in_place(&mut buffer[..n]);
        observed =
            observed.or_else(|| observe_samples(observe, Stage::CarrierLocked, &buffer[..n]));

        let n = self.timing.process_in_place(buffer, n);
        observed = observed.or_else(|| observe_samples(observe, Stage::Symbols, &buffer[..n]));

        self.bits.clear();
        for s in &buffer[..n] {
            let symbol = (s.re > 0.0) as u8;
            self.bits.push(symbol ^ self.last_symbol);
            self.last_symbol = symbol;
        }
        if observe == Some(Stage::Bits) {
            observed = Some(StageOutput::Bits(self.bits.clone()));
        }
        self.decoder.push_bits(&self.bits);

        trace!(
            input = len,
            symbols = n,
            confidence = self.decoder.confidence(),
            "RDS demodulate"
        );

        Ok(DemodOutput { len: n, observed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(n: usize, seed: u64) -> Vec<Sample> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    #[test]
    fn test_noise_only_reports_bler() {
        let mut demod = RdsDemodulator::new(228_000).unwrap();
        let mut input = noise(10_000, 3);
        let out = demod.demodulate(&mut input, 10_000, None).unwrap();
        assert!(out.len > 0);
        assert!(out.observed.is_none());
        if let Some(text) = demod.text() {
            assert!(text.starts_with("BLER: "), "unexpected text {text:?}");
        }
        assert_eq!(demod.decoder().program_service_name(), "");
    }

    #[test]
    fn test_observed_stage_lengths() {
        let input = noise(22_800, 5);
        for stage in [Stage::Shifted, Stage::Resampled, Stage::Symbols, Stage::Bits] {
            let mut demod = RdsDemodulator::new(228_000).unwrap();
            let mut buf = input.clone();
            let out = demod.demodulate(&mut buf, input.len(), Some(stage)).unwrap();
            match (stage, out.observed) {
                (Stage::Shifted, Some(StageOutput::Samples(s))) => assert_eq!(s.len(), 22_800),
                (Stage::Resampled, Some(StageOutput::Samples(s))) => {
                    assert!((236..=239).contains(&s.len()), "{} samples", s.len())
                }
                (Stage::Symbols, Some(StageOutput::Samples(s))) => assert_eq!(s.len(), out.len),
                (Stage::Bits, Some(StageOutput::Bits(b))) => {
                    assert_eq!(b.len(), out.len);
                    assert!(b.iter().all(|&bit| bit <= 1));
                }
                (stage, other) => panic!("{stage:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_upper_biphase_lobe_lands_at_dc() {
        let mut demod = RdsDemodulator::new(228_000).unwrap();
        assert_eq!(demod.shift_hz(), 58_187.5);
        let tone = |freq: f64| -> Vec<Sample> {
            (0..2_000)
                .map(|n| {
                    let phase = 2.0 * std::f64::consts::PI * freq * n as f64 / 228_000.0;
                    Complex::from_polar(1.0, phase as f32)
                })
                .collect()
        };
        let mut buf = tone(58_187.5);
        let out = demod.demodulate(&mut buf, 2_000, Some(Stage::Shifted)).unwrap();
        let Some(StageOutput::Samples(shifted)) = out.observed else {
            panic!("no shifted samples");
        };
        for s in &shifted[..1_000] {
            assert!((s - shifted[0]).norm() < 1e-2, "{s} drifted from {}", shifted[0]);
        }

        // The bare subcarrier sits half a bit rate below DC and keeps turning
        let mut demod = RdsDemodulator::new(228_000).unwrap();
        let mut buf = tone(57_000.0);
        let out = demod.demodulate(&mut buf, 2_000, Some(Stage::Shifted)).unwrap();
        let Some(StageOutput::Samples(shifted)) = out.observed else {
            panic!("no shifted samples");
        };
        assert!((shifted[96] - shifted[0]).norm() > 1.0);
    }

    #[test]
    fn test_symbol_count_follows_bit_rate() {
        let mut demod = RdsDemodulator::new(228_000).unwrap();
        let mut total = 0;
        for seed in 0..10 {
            let mut buf = noise(22_800, seed);
            total += demod.demodulate(&mut buf, 22_800, None).unwrap().len;
        }
        // One second of multiplex, 1187.5 bits
        assert!((1150..=1210).contains(&total), "{total} symbols");
    }

    #[test]
    fn test_len_beyond_buffer() {
        let mut demod = RdsDemodulator::new(228_000).unwrap();
        let mut buf = noise(100, 1);
        assert!(matches!(
            demod.demodulate(&mut buf, 200, None),
            Err(Error::Capacity { .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        assert!(RdsDemodulator::new(0).is_err());
        let config = RdsConfig {
            sample_rate: 96_000,
            ..RdsConfig::default()
        };
        assert!(RdsDemodulator::from_config(&config).is_err());
        let config = RdsConfig {
            costas_bandwidth: 0.0,
            ..RdsConfig::default()
        };
        assert!(RdsDemodulator::from_config(&config).is_err());
    }
}
