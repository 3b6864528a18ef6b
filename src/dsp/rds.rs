//! RDS (Radio Data System) bit-level decoder
//!
//! Takes differentially decoded bits and turns them into station metadata:
//! block synchronisation on the (26,16) shortened cyclic code, burst error
//! correction, group assembly, and decoding of groups 0 (program service
//! name, flags, alternative frequencies) and 2 (radiotext). A block error
//! rate is measured over each second of bits.
//!
//! # Example
//!
//! ```
//! use rdsrx::dsp::rds::{encode_block, BlockType, RdsDecoder};
//!
//! let mut decoder = RdsDecoder::new();
//! // Group 0A, segment 0: "AB"
//! for (data, kind) in [
//!     (0x1234, BlockType::A),
//!     (0x0000, BlockType::B),
//!     (0xE0CD, BlockType::C),
//!     (0x4142, BlockType::D),
//! ] {
//!     let block = encode_block(data, kind);
//!     for i in (0..26).rev() {
//!         decoder.push_bit(((block >> i) & 1) as u8);
//!     }
//! }
//! assert_eq!(decoder.program_service_name(), "AB");
//! ```

use serde::Serialize;
use tracing::{debug, trace};

/// Bits per block: 16 data bits and a 10-bit checkword.
pub const BLOCK_LENGTH: usize = 26;
pub const DATA_LENGTH: usize = 16;
pub const POLY_LENGTH: usize = 10;

/// RDS bit rate, 57 kHz / 48.
pub const BIT_RATE: f64 = 1187.5;

/// Bits in one block-error-rate measurement window (about one second).
pub const BLER_WINDOW_BITS: usize = 1188;

pub const PS_LENGTH: usize = 8;
pub const RT_LENGTH: usize = 64;

/// Highest block synchronisation confidence.
pub const MAX_CONFIDENCE: u8 = 4;

/// Syndrome feedback polynomial.
const LFSR_POLY: u16 = 0b0110111001;
/// Input injection polynomial.
const IN_POLY: u16 = 0b1100011011;
/// Generator polynomial g(x) = x^10 + x^8 + x^7 + x^5 + x^4 + x^3 + 1.
const GENERATOR: u32 = 0x5B9;

const SYNDROME_MASK: u16 = (1 << POLY_LENGTH) - 1;

/// Expected syndromes for A, B, C, C', D.
const SYNDROMES: [u16; 5] = [
    0b1111011000,
    0b1111010100,
    0b1001011100,
    0b1111001100,
    0b1001011000,
];

/// Offset words for A, B, C, C', D.
const OFFSETS: [u16; 5] = [
    0b0011111100,
    0b0110011000,
    0b0101101000,
    0b1101010000,
    0b0110110100,
];

/// Program type names (RDS, EN 50067).
const PTY_NAMES: [&str; 32] = [
    "None",
    "News",
    "Current Affairs",
    "Information",
    "Sport",
    "Education",
    "Drama",
    "Culture",
    "Science",
    "Varied",
    "Pop Music",
    "Rock Music",
    "Easy Listening",
    "Light Classical",
    "Serious Classical",
    "Other Music",
    "Weather",
    "Finance",
    "Children's Programmes",
    "Social Affairs",
    "Religion",
    "Phone-In",
    "Travel",
    "Leisure",
    "Jazz Music",
    "Country Music",
    "National Music",
    "Oldies Music",
    "Folk Music",
    "Documentary",
    "Alarm Test",
    "Alarm",
];

/// Name of a program type code, `"None"` for out-of-range codes.
pub fn pty_name(pty: u8) -> &'static str {
    PTY_NAMES.get(pty as usize).copied().unwrap_or(PTY_NAMES[0])
}

/// Position of a block within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockType {
    A,
    B,
    C,
    /// C' replaces C in version B groups
    CPrime,
    D,
}

impl BlockType {
    pub const ALL: [BlockType; 5] = [
        BlockType::A,
        BlockType::B,
        BlockType::C,
        BlockType::CPrime,
        BlockType::D,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn offset(self) -> u16 {
        OFFSETS[self.index()]
    }

    pub fn syndrome(self) -> u16 {
        SYNDROMES[self.index()]
    }

    /// Block type whose offset yields syndrome `s`.
    pub fn from_syndrome(s: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.syndrome() == s)
    }

    /// Block expected after this one; C and C' are both followed by D.
    pub fn next(self) -> Self {
        match self {
            BlockType::A => BlockType::B,
            BlockType::B => BlockType::C,
            BlockType::C | BlockType::CPrime => BlockType::D,
            BlockType::D => BlockType::A,
        }
    }

    fn is_c(self) -> bool {
        matches!(self, BlockType::C | BlockType::CPrime)
    }
}

/// One LFSR clock of the syndrome register.
#[inline]
fn lfsr_shift(s: u16) -> u16 {
    let out = (s >> (POLY_LENGTH - 1)) & 1;
    let s = (s << 1) & SYNDROME_MASK;
    if out == 1 {
        s ^ LFSR_POLY
    } else {
        s
    }
}

/// 10-bit syndrome of a 26-bit block, first transmitted bit in bit 25.
pub fn syndrome(block: u32) -> u16 {
    let mut s = 0u16;
    for i in (0..BLOCK_LENGTH).rev() {
        s = lfsr_shift(s);
        if (block >> i) & 1 == 1 {
            s ^= IN_POLY;
        }
    }
    s
}

/// Remainder of a 26-bit word divided by the generator polynomial.
fn poly_remainder(word: u32) -> u16 {
    let mut v = word;
    for i in (POLY_LENGTH..BLOCK_LENGTH).rev() {
        if (v >> i) & 1 != 0 {
            v ^= GENERATOR << (i - POLY_LENGTH);
        }
    }
    (v as u16) & SYNDROME_MASK
}

/// Build a transmittable 26-bit block: data plus checkword with offset.
pub fn encode_block(data: u16, kind: BlockType) -> u32 {
    let word = (data as u32) << POLY_LENGTH;
    word | (poly_remainder(word) ^ kind.offset()) as u32
}

/// Remove the offset of `kind` from `block` and correct a single error
/// burst of up to 5 bits in the data word.
///
/// Returns the data word and whether the block is clean after correction.
pub fn correct_block(block: u32, kind: BlockType) -> (u16, bool) {
    let block = block ^ kind.offset() as u32;
    let mut out = block;
    let mut s = syndrome(block);

    if s != 0 {
        // Clock the syndrome through the data bits; once the low five bits
        // clear, the burst is trapped and the top bit marks the bits to flip.
        let mut trapped = false;
        for i in (0..DATA_LENGTH).rev() {
            trapped |= s & 0b11111 == 0;
            if trapped && (s >> (POLY_LENGTH - 1)) & 1 == 1 {
                out ^= 1 << (i + POLY_LENGTH);
                s ^= 1 << (POLY_LENGTH - 1);
            }
            s = lfsr_shift(s);
        }
    }

    (((out >> POLY_LENGTH) & 0xFFFF) as u16, s & 0b11111 == 0)
}

/// Program identification code with its subfields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgramId {
    pub code: u16,
    /// Country code, bits 15..12
    pub country: u8,
    /// Area coverage, bits 11..8
    pub coverage: u8,
    /// Program reference number, bits 7..0
    pub reference: u8,
}

impl From<u16> for ProgramId {
    fn from(code: u16) -> Self {
        Self {
            code,
            country: (code >> 12) as u8,
            coverage: ((code >> 8) & 0xF) as u8,
            reference: (code & 0xFF) as u8,
        }
    }
}

/// Station metadata from groups 0A/0B.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationInfo {
    /// Traffic Program flag (TP)
    pub is_traffic_program: bool,
    /// Traffic Announcement flag (TA)
    pub is_traffic_announcement: bool,
    /// Program Type (0-31, see [`pty_name`])
    pub program_type: u8,
    /// Music (true) or speech (false)
    pub is_music: bool,
    /// Decoder identification bits, d3 in bit 3
    pub decoder_id: u8,
    /// Alternative frequencies in 10 kHz units (87.6 MHz = 8760)
    pub af_list: Vec<u16>,
}

/// Group version carried in block B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupVersion {
    A,
    B,
}

/// Bit-level RDS decoder.
#[derive(Debug, Clone)]
pub struct RdsDecoder {
    /// Last 26 received bits, newest in bit 0
    shift: u32,
    /// Bits to wait before the next syndrome check
    skip: usize,
    /// Block synchronisation confidence, 0..=4
    confidence: u8,
    last_type: BlockType,
    /// Consecutive blocks of the current group seen after A
    group_length: u8,

    blocks: [u16; 5],
    available: [bool; 5],

    pi: Option<ProgramId>,
    group_type: u8,
    group_version: GroupVersion,
    station: StationInfo,

    ps: [u8; PS_LENGTH],
    rt: [u8; RT_LENGTH],
    rt_ab: Option<bool>,
    dirty: bool,

    bits_in_window: usize,
    num_blocks: u32,
    bad_blocks: u32,
    /// Block error rate in percent
    bler: f32,
}

impl Default for RdsDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RdsDecoder {
    pub fn new() -> Self {
        Self {
            shift: 0,
            skip: BLOCK_LENGTH,
            confidence: 0,
            last_type: BlockType::D,
            group_length: 0,
            blocks: [0; 5],
            available: [false; 5],
            pi: None,
            group_type: 0,
            group_version: GroupVersion::A,
            station: StationInfo::default(),
            ps: [b' '; PS_LENGTH],
            rt: [b' '; RT_LENGTH],
            rt_ab: None,
            dirty: false,
            bits_in_window: 0,
            num_blocks: 0,
            bad_blocks: 0,
            bler: 100.0,
        }
    }

    /// Feed bits (0 or 1, any non-zero counts as 1) in transmission order.
    pub fn push_bits(&mut self, bits: &[u8]) {
        for &b in bits {
            self.push_bit(b);
        }
    }

    pub fn push_bit(&mut self, bit: u8) {
        self.shift = ((self.shift << 1) | (bit != 0) as u32) & ((1 << BLOCK_LENGTH) - 1);
        self.tick_bler();

        if self.skip > 0 {
            self.skip -= 1;
            if self.skip > 0 {
                return;
            }
        }

        let kind = BlockType::from_syndrome(syndrome(self.shift));
        let was_synced = self.confidence > 0;
        self.confidence = match kind {
            Some(_) => (self.confidence + 1).min(MAX_CONFIDENCE),
            None => self.confidence.saturating_sub(1),
        };
        if self.confidence == 0 {
            if was_synced {
                debug!(last = ?self.last_type, "RDS sync lost");
            }
            self.group_length = 0;
            return;
        }
        if !was_synced {
            debug!(block = ?kind, "RDS sync acquired");
        }

        let kind = kind.unwrap_or_else(|| self.last_type.next());
        let (data, clean) = correct_block(self.shift, kind);
        self.blocks[kind.index()] = data;
        self.available[kind.index()] = clean;

        self.num_blocks += 1;
        if !clean || syndrome(self.shift) != kind.syndrome() {
            self.bad_blocks += 1;
            trace!(block = ?kind, corrected = clean, "RDS block error");
        }

        match kind {
            BlockType::A => {
                self.decode_block_a();
                self.group_length = 0;
            }
            BlockType::B if self.last_type == BlockType::A => self.group_length = 1,
            k if k.is_c() && self.last_type == BlockType::B => self.group_length += 1,
            BlockType::D if self.last_type.is_c() => self.group_length += 1,
            _ => self.group_length = 0,
        }

        if self.group_length >= 3 {
            self.group_length = 0;
            self.decode_group();
        }

        self.last_type = kind;
        self.skip = BLOCK_LENGTH;
    }

    fn tick_bler(&mut self) {
        self.bits_in_window += 1;
        if self.bits_in_window < BLER_WINDOW_BITS {
            return;
        }
        let bler = if self.num_blocks == 0 {
            100.0
        } else {
            self.bad_blocks as f32 / self.num_blocks as f32 * 100.0
        };
        if (bler * 100.0).round() != (self.bler * 100.0).round() {
            self.dirty = true;
        }
        debug!(bler, blocks = self.num_blocks, bad = self.bad_blocks, "RDS block error rate");
        self.bler = bler;
        self.bits_in_window = 0;
        self.num_blocks = 0;
        self.bad_blocks = 0;
    }

    fn block(&self, kind: BlockType) -> Option<u16> {
        self.available[kind.index()].then_some(self.blocks[kind.index()])
    }

    fn decode_block_a(&mut self) {
        if let Some(code) = self.block(BlockType::A) {
            self.pi = Some(ProgramId::from(code));
        }
    }

    fn decode_group(&mut self) {
        let Some(b) = self.block(BlockType::B) else {
            return;
        };
        self.group_type = (b >> 12) as u8;
        self.group_version = if (b >> 11) & 1 == 0 {
            GroupVersion::A
        } else {
            GroupVersion::B
        };
        self.station.is_traffic_program = (b >> 10) & 1 == 1;
        self.station.program_type = ((b >> 5) & 0x1F) as u8;

        trace!(
            group_type = self.group_type,
            version = ?self.group_version,
            pi = self.pi.map(|p| p.code),
            "RDS group"
        );

        match self.group_type {
            0 => self.decode_group_0(b),
            2 => self.decode_group_2(b),
            _ => {}
        }
    }

    fn decode_group_0(&mut self, b: u16) {
        let offset = (b & 0b11) as usize;
        self.station.is_traffic_announcement = (b >> 4) & 1 == 1;
        self.station.is_music = (b >> 3) & 1 == 1;
        let di_bit = (b >> 2) & 1;
        let shift = 3 - offset;
        self.station.decoder_id =
            (self.station.decoder_id & !(1 << shift)) | ((di_bit as u8) << shift);

        if self.group_version == GroupVersion::A {
            if let Some(c) = self.block(BlockType::C) {
                for code in [(c >> 8) as u8, c as u8] {
                    // Codes 1..=204 are 87.6..=107.9 MHz
                    if (1..=204).contains(&code) {
                        let freq = 8750 + code as u16 * 10;
                        if !self.station.af_list.contains(&freq) {
                            self.station.af_list.push(freq);
                        }
                    }
                }
            }
        }

        if let Some(d) = self.block(BlockType::D) {
            self.write_ps(offset * 2, [(d >> 8) as u8, d as u8]);
        }
    }

    fn decode_group_2(&mut self, b: u16) {
        let ab = (b >> 4) & 1 == 1;
        if self.rt_ab.is_some_and(|prev| prev != ab) {
            if self.rt.iter().any(|&c| c != b' ') {
                self.dirty = true;
            }
            self.rt = [b' '; RT_LENGTH];
        }
        self.rt_ab = Some(ab);

        let offset = (b & 0xF) as usize;
        match self.group_version {
            GroupVersion::A => {
                if let (Some(c), Some(d)) = (self.block(BlockType::C), self.block(BlockType::D)) {
                    self.write_rt(offset * 4, &[(c >> 8) as u8, c as u8, (d >> 8) as u8, d as u8]);
                }
            }
            GroupVersion::B => {
                if let Some(d) = self.block(BlockType::D) {
                    self.write_rt(offset * 2, &[(d >> 8) as u8, d as u8]);
                }
            }
        }
    }

    fn write_ps(&mut self, at: usize, chars: [u8; 2]) {
        for (slot, c) in self.ps[at..at + 2].iter_mut().zip(chars) {
            if *slot != c {
                *slot = c;
                self.dirty = true;
            }
        }
    }

    fn write_rt(&mut self, at: usize, chars: &[u8]) {
        for (slot, &c) in self.rt[at..at + chars.len()].iter_mut().zip(chars) {
            if *slot != c {
                *slot = c;
                self.dirty = true;
            }
        }
    }

    /// Block synchronisation confidence, 0 (no sync) to 4.
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn is_synced(&self) -> bool {
        self.confidence > 0
    }

    /// Block error rate of the last full measurement window, in percent.
    pub fn bler(&self) -> f32 {
        self.bler
    }

    pub fn program_id(&self) -> Option<ProgramId> {
        self.pi
    }

    pub fn station_info(&self) -> &StationInfo {
        &self.station
    }

    /// Type and version of the last decoded group.
    pub fn last_group(&self) -> (u8, GroupVersion) {
        (self.group_type, self.group_version)
    }

    /// Program service name with surrounding blanks removed.
    pub fn program_service_name(&self) -> String {
        render(&self.ps)
    }

    /// Radiotext with surrounding blanks removed.
    pub fn radio_text(&self) -> String {
        render(&self.rt)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Displayable text, only when something changed since the last call.
    ///
    /// `"PS - RT (BLER: x.xx%)"`, with whichever of PS and RT is blank left
    /// out, or just `"BLER: x.xx%"` when both are blank.
    pub fn text(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        let ps = self.program_service_name();
        let rt = self.radio_text();
        let bler = format!("BLER: {:.2}%", self.bler);
        Some(match (ps.is_empty(), rt.is_empty()) {
            (false, false) => format!("{ps} - {rt} ({bler})"),
            (false, true) => format!("{ps} ({bler})"),
            (true, false) => format!("{rt} ({bler})"),
            (true, true) => bler,
        })
    }

    /// Forget all synchronisation and decoded data.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Printable ASCII kept, anything else shown as a blank.
fn render(chars: &[u8]) -> String {
    chars
        .iter()
        .map(|&c| if (0x20..0x7F).contains(&c) { c as char } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
#[path = "rds_tests.rs"]
mod tests;
