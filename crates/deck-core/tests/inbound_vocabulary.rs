//! Integration tests for the deck-core inbound path.
//!
//! These tests run complete raw serial lines through the public API the way
//! the bridge's command reader does: decode the bytes, then either validate a
//! single token or parse a panel scan and evaluate it.

use deck_core::protocol::command::{decode_line, parse_token, InboundToken, MediaCommand};
use deck_core::protocol::frame::{decode_length_prefix, encode_frame};
use deck_core::protocol::panel::{map_slider, EdgeDetector, PanelSnapshot};

/// Runs one raw line through the single-token path.
fn single(raw: &[u8]) -> Option<InboundToken> {
    decode_line(raw).and_then(|t| parse_token(&t))
}

#[test]
fn test_single_token_stream_yields_only_known_commands() {
    // Arrange: a realistic capture, including boot noise and a garbled line
    let stream: &[&[u8]] = &[
        b"ets Jun  8 2016 00:22:57\r\n",
        b"PLAY\r\n",
        b"ALIVE\n",
        &[0xFF, b'M', b'U', b'T', b'E', b'\n'],
        b"VOL_UP\n",
        b"\n",
        b"SKIP_PREV\n",
    ];

    // Act
    let tokens: Vec<InboundToken> = stream.iter().filter_map(|l| single(l)).collect();

    // Assert
    assert_eq!(
        tokens,
        vec![
            InboundToken::Command(MediaCommand::Play),
            InboundToken::Alive,
            InboundToken::Command(MediaCommand::VolUp),
            InboundToken::Command(MediaCommand::SkipPrev),
        ]
    );
}

#[test]
fn test_panel_stream_reports_presses_and_levels() {
    // Arrange: two switches followed by one slider
    let scans = ["4095|4095|5", "30|4095|2047", "20|4095|2047", "4095|40|4090"];
    let mut detector = EdgeDetector::with_default_thresholds(2);
    let mut presses = Vec::new();
    let mut levels = Vec::new();

    // Act
    for (scan_no, line) in scans.iter().enumerate() {
        let snap = PanelSnapshot::parse(line, 3).expect("well-formed scan");
        for (channel, reading) in snap.readings()[..2].iter().enumerate() {
            if detector.update(channel, *reading) {
                presses.push((scan_no, channel));
            }
        }
        levels.push(map_slider(snap.readings()[2]));
    }

    // Assert
    assert_eq!(presses, vec![(1, 0), (3, 1)]);
    assert_eq!(levels, vec![0, 50, 50, 100]);
}

#[test]
fn test_frame_prefix_matches_payload_length() {
    for len in [0usize, 1, 1023, 38_211] {
        let frame = encode_frame(&vec![0u8; len]).unwrap();
        assert_eq!(decode_length_prefix(&frame).unwrap() as usize, len);
        assert_eq!(frame.len(), len + 4);
    }
}
