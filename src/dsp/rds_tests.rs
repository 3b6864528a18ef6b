// Unit tests for RDS decoder
// This file is included via #[cfg(test)] mod in rds.rs

use super::*;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PI_CODE: u16 = 0x1234;

fn push_block(decoder: &mut RdsDecoder, block: u32) {
    for i in (0..BLOCK_LENGTH).rev() {
        decoder.push_bit(((block >> i) & 1) as u8);
    }
}

fn push_group(decoder: &mut RdsDecoder, group: [(u16, BlockType); 4]) {
    for (data, kind) in group {
        push_block(decoder, encode_block(data, kind));
    }
}

fn pair(chars: &[u8]) -> u16 {
    ((chars[0] as u16) << 8) | chars[1] as u16
}

/// Group 0A carrying PS segment `offset`.
fn group_0a(offset: u16, chars: &[u8], flags: u16) -> [(u16, BlockType); 4] {
    [
        (PI_CODE, BlockType::A),
        (flags | offset, BlockType::B),
        (0xE0CD, BlockType::C),
        (pair(chars), BlockType::D),
    ]
}

/// Group 2A carrying radiotext segment `segment`.
fn group_2a(segment: u16, ab: u16, chars: &[u8]) -> [(u16, BlockType); 4] {
    [
        (PI_CODE, BlockType::A),
        ((2 << 12) | (ab << 4) | segment, BlockType::B),
        (pair(&chars[0..2]), BlockType::C),
        (pair(&chars[2..4]), BlockType::D),
    ]
}

/// Group 2B carrying radiotext segment `segment`.
fn group_2b(segment: u16, ab: u16, chars: &[u8]) -> [(u16, BlockType); 4] {
    [
        (PI_CODE, BlockType::A),
        ((2 << 12) | (1 << 11) | (ab << 4) | segment, BlockType::B),
        (PI_CODE, BlockType::CPrime),
        (pair(chars), BlockType::D),
    ]
}

fn send_ps(decoder: &mut RdsDecoder, name: &[u8; 8]) {
    for (offset, chars) in name.chunks(2).enumerate() {
        push_group(decoder, group_0a(offset as u16, chars, 0));
    }
}

#[test]
fn test_syndrome_of_zero() {
    assert_eq!(syndrome(0), 0);
}

#[test]
fn test_encoded_blocks_match_their_syndrome() {
    for kind in BlockType::ALL {
        for data in [0x0000, 0x1234, 0xABCD, 0xFFFF] {
            let block = encode_block(data, kind);
            assert_eq!(syndrome(block), kind.syndrome(), "{kind:?} {data:#06x}");
            assert_eq!(BlockType::from_syndrome(syndrome(block)), Some(kind));
        }
    }
}

#[test]
fn test_syndromes_are_distinct() {
    for a in BlockType::ALL {
        for b in BlockType::ALL {
            if a != b {
                assert_ne!(a.syndrome(), b.syndrome());
            }
        }
    }
    assert_eq!(BlockType::from_syndrome(0), None);
}

#[test]
fn test_block_sequence() {
    assert_eq!(BlockType::A.next(), BlockType::B);
    assert_eq!(BlockType::B.next(), BlockType::C);
    assert_eq!(BlockType::C.next(), BlockType::D);
    assert_eq!(BlockType::CPrime.next(), BlockType::D);
    assert_eq!(BlockType::D.next(), BlockType::A);
}

#[test]
fn test_correct_clean_block() {
    for kind in BlockType::ALL {
        let block = encode_block(0xBEEF, kind);
        assert_eq!(correct_block(block, kind), (0xBEEF, true));
    }
}

#[test]
fn test_correct_burst_errors() {
    let patterns = [0b1u32, 0b11, 0b101, 0b1011, 0b10001, 0b11111];
    for kind in BlockType::ALL {
        for data in [0x1234u16, 0xBEEF] {
            let block = encode_block(data, kind);
            for pattern in patterns {
                let width = 32 - pattern.leading_zeros() as usize;
                for pos in POLY_LENGTH..=(BLOCK_LENGTH - width) {
                    let corrupted = block ^ (pattern << pos);
                    assert_eq!(
                        correct_block(corrupted, kind),
                        (data, true),
                        "{kind:?} pattern {pattern:#b} at {pos}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_checkword_errors_keep_data() {
    let block = encode_block(0x1234, BlockType::A);
    for pos in 0..POLY_LENGTH {
        let (data, _) = correct_block(block ^ (1 << pos), BlockType::A);
        assert_eq!(data, 0x1234);
    }
}

#[test]
fn test_program_id_fields() {
    let pi = ProgramId::from(0xF201);
    assert_eq!(pi.country, 0xF);
    assert_eq!(pi.coverage, 0x2);
    assert_eq!(pi.reference, 0x01);
}

#[test]
fn test_pty_names() {
    assert_eq!(pty_name(0), "None");
    assert_eq!(pty_name(1), "News");
    assert_eq!(pty_name(10), "Pop Music");
    assert_eq!(pty_name(31), "Alarm");
    assert_eq!(pty_name(42), "None");
}

#[test]
fn test_new_decoder_is_unsynced() {
    let mut decoder = RdsDecoder::new();
    assert_eq!(decoder.confidence(), 0);
    assert!(!decoder.is_synced());
    assert_eq!(decoder.bler(), 100.0);
    assert_eq!(decoder.program_service_name(), "");
    assert_eq!(decoder.radio_text(), "");
    assert_eq!(decoder.text(), None);
}

#[test]
fn test_group_0_program_service_name() {
    let mut decoder = RdsDecoder::new();
    assert!(!decoder.is_dirty());

    send_ps(&mut decoder, b"ABCDEFGH");

    assert!(decoder.is_dirty());
    assert_eq!(decoder.program_service_name(), "ABCDEFGH");
    assert_eq!(decoder.confidence(), MAX_CONFIDENCE);
    assert_eq!(decoder.program_id().map(|p| p.code), Some(PI_CODE));
    assert_eq!(decoder.last_group(), (0, GroupVersion::A));

    assert_eq!(
        decoder.text().as_deref(),
        Some("ABCDEFGH (BLER: 100.00%)")
    );
    // Debounced until something changes
    assert_eq!(decoder.text(), None);

    // Same name again: nothing new to show
    send_ps(&mut decoder, b"ABCDEFGH");
    assert!(!decoder.is_dirty());
}

#[test]
fn test_group_0_after_misaligned_start() {
    let mut decoder = RdsDecoder::new();
    for c in "1011001110001".bytes() {
        decoder.push_bit(c - b'0');
    }
    send_ps(&mut decoder, b"ABCDEFGH");
    assert_eq!(decoder.program_service_name(), "ABCDEFGH");
}

#[test]
fn test_group_0_flags() {
    let mut decoder = RdsDecoder::new();
    // TP, PTY 10, TA, music, DI bit set on every segment
    let flags = (1 << 10) | (10 << 5) | (1 << 4) | (1 << 3) | (1 << 2);
    for offset in 0..4 {
        push_group(&mut decoder, group_0a(offset, b"XX", flags));
    }
    let info = decoder.station_info();
    assert!(info.is_traffic_program);
    assert!(info.is_traffic_announcement);
    assert!(info.is_music);
    assert_eq!(info.program_type, 10);
    assert_eq!(info.decoder_id, 0b1111);
}

#[test]
fn test_group_needs_block_a() {
    let mut decoder = RdsDecoder::new();
    send_ps(&mut decoder, b"ABCDEFGH");
    assert!(decoder.text().is_some());

    // A C block where A belongs, then the rest of a group: no PI, no decode
    push_block(&mut decoder, encode_block(0xE0CD, BlockType::C));
    for (data, kind) in &group_0a(0, b"XY", 0)[1..] {
        push_block(&mut decoder, encode_block(*data, *kind));
    }
    assert_eq!(decoder.program_service_name(), "ABCDEFGH");
    assert!(!decoder.is_dirty());

    push_group(&mut decoder, group_0a(0, b"XY", 0));
    assert_eq!(decoder.program_service_name(), "XYCDEFGH");
    assert!(decoder.is_dirty());
}

#[test]
fn test_group_0a_alternative_frequencies() {
    let mut decoder = RdsDecoder::new();
    // AF codes 1 and 204: 87.6 MHz and 107.9 MHz
    let group = [
        (PI_CODE, BlockType::A),
        (0, BlockType::B),
        ((1 << 8) | 204, BlockType::C),
        (pair(b"AB"), BlockType::D),
    ];
    push_group(&mut decoder, group);
    push_group(&mut decoder, group);
    assert_eq!(decoder.station_info().af_list, vec![8760, 10790]);
}

#[test]
fn test_bler_after_clean_second() {
    let mut decoder = RdsDecoder::new();
    for _ in 0..3 {
        send_ps(&mut decoder, b"ABCDEFGH");
    }
    assert_eq!(decoder.bler(), 0.0);
    assert_eq!(
        decoder.text().as_deref(),
        Some("ABCDEFGH (BLER: 0.00%)")
    );
}

#[test]
fn test_single_bit_error_is_corrected() {
    let mut decoder = RdsDecoder::new();
    for (offset, chars) in b"ABCDEFGH".chunks(2).enumerate() {
        let group = group_0a(offset as u16, chars, 0);
        for (i, (data, kind)) in group.into_iter().enumerate() {
            let mut block = encode_block(data, kind);
            if offset == 2 && i == 3 {
                block ^= 1 << 17;
            }
            push_block(&mut decoder, block);
        }
    }
    assert_eq!(decoder.program_service_name(), "ABCDEFGH");
    assert!(decoder.is_synced());
}

#[test]
fn test_group_2a_radio_text() {
    let mut decoder = RdsDecoder::new();
    for (segment, chars) in b"HELLO WORLD!".chunks(4).enumerate() {
        push_group(&mut decoder, group_2a(segment as u16, 0, chars));
    }
    assert_eq!(decoder.radio_text(), "HELLO WORLD!");
    assert_eq!(decoder.last_group(), (2, GroupVersion::A));
    assert_eq!(
        decoder.text().as_deref(),
        Some("HELLO WORLD! (BLER: 100.00%)")
    );
}

#[test]
fn test_group_2_ab_flip_clears_text() {
    let mut decoder = RdsDecoder::new();
    for (segment, chars) in b"HELLO WORLD!".chunks(4).enumerate() {
        push_group(&mut decoder, group_2a(segment as u16, 0, chars));
    }
    decoder.text();

    push_group(&mut decoder, group_2a(0, 1, b"BYE "));
    assert!(decoder.is_dirty());
    assert_eq!(decoder.radio_text(), "BYE");
}

#[test]
fn test_group_2b_radio_text() {
    let mut decoder = RdsDecoder::new();
    for (segment, chars) in b"HI THERE".chunks(2).enumerate() {
        push_group(&mut decoder, group_2b(segment as u16, 0, chars));
    }
    assert_eq!(decoder.radio_text(), "HI THERE");
    assert_eq!(decoder.last_group(), (2, GroupVersion::B));
}

#[test]
fn test_text_with_both_fields() {
    let mut decoder = RdsDecoder::new();
    send_ps(&mut decoder, b"RADIO 1 ");
    for (segment, chars) in b"NEWS".chunks(4).enumerate() {
        push_group(&mut decoder, group_2a(segment as u16, 0, chars));
    }
    assert_eq!(
        decoder.text().as_deref(),
        Some("RADIO 1 - NEWS (BLER: 100.00%)")
    );
}

#[test]
fn test_non_printable_characters_render_blank() {
    let mut decoder = RdsDecoder::new();
    send_ps(&mut decoder, b"A\x01B\x7FCDEF");
    assert_eq!(decoder.program_service_name(), "A B CDEF");
}

#[test]
fn test_noise_does_not_produce_text() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut decoder = RdsDecoder::new();
    let bits: Vec<u8> = (0..20_000).map(|_| rng.gen_range(0..2)).collect();
    for chunk in bits.chunks(1000) {
        decoder.push_bits(chunk);
        assert!(decoder.confidence() <= MAX_CONFIDENCE);
        if let Some(text) = decoder.text() {
            assert!(text.starts_with("BLER: "), "unexpected text {text:?}");
        }
    }
}

#[test]
fn test_sync_lost_on_garbage() {
    let mut decoder = RdsDecoder::new();
    send_ps(&mut decoder, b"ABCDEFGH");
    assert!(decoder.is_synced());
    // Blocks of zeros never match an offset syndrome
    for _ in 0..8 {
        push_block(&mut decoder, 0);
    }
    assert!(!decoder.is_synced());
    // Decoded text survives loss of sync
    assert_eq!(decoder.program_service_name(), "ABCDEFGH");
}

#[test]
fn test_reset() {
    let mut decoder = RdsDecoder::new();
    send_ps(&mut decoder, b"ABCDEFGH");
    decoder.reset();
    assert_eq!(decoder.program_service_name(), "");
    assert_eq!(decoder.confidence(), 0);
    assert_eq!(decoder.program_id(), None);
}
