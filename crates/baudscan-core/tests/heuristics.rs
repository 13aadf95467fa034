//! Classifier, scorer and candidate properties through the public API

use baudscan_core::classify::CONTROL_BYTES;
use baudscan_core::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_text_bytes_never_invalid() {
    let text_bytes = (0x20u8..=0x7E).chain([b' ', b'\t', b'\r', b'\n']);
    for b in text_bytes {
        assert_ne!(classify(b), ByteCategory::Invalid, "byte {:#04x}", b);
    }
}

#[test]
fn test_control_bytes_classified_as_control() {
    for b in CONTROL_BYTES {
        assert_eq!(classify(b), ByteCategory::Control);
    }
}

#[test]
fn test_stray_high_bit_bytes_invalid() {
    for b in 0x80u8..=0xFF {
        if !CONTROL_BYTES.contains(&b) {
            assert_eq!(classify(b), ByteCategory::Invalid, "byte {:#04x}", b);
        }
    }
}

#[test]
fn test_scorer_accepts_within_twenty_bytes() {
    let mut scorer = TrialScorer::default();
    let mut counted = 0;
    let mut accepted = false;
    for &b in b"Hello, world! This is a test.\n" {
        let category = classify(b);
        assert_ne!(category, ByteCategory::Invalid);
        if category.is_counted() {
            counted += 1;
        }
        if scorer.observe(category) == Decision::Accept {
            accepted = true;
            break;
        }
    }
    assert!(accepted);
    assert!(counted <= 20);
}

#[test]
fn test_scorer_rejects_on_the_invalid_byte() {
    let mut scorer = TrialScorer::default();
    for &b in b"Hi the" {
        assert_eq!(scorer.observe(classify(b)), Decision::Continue);
    }
    assert_eq!(scorer.observe(classify(0x9C)), Decision::Reject);
}

#[test]
fn test_incremental_candidates() {
    let speeds: Vec<Speed> = CandidateSource::incremental(300, 1200, 300).unwrap().collect();
    assert_eq!(speeds, vec![300, 600, 900]);
}

#[test]
fn test_list_candidates() {
    let speeds: Vec<Speed> = CandidateSource::parse_list("9600, 19200,38400").unwrap().collect();
    assert_eq!(speeds, vec![9600, 19200, 38400]);
}
