//! End-to-end pipeline tests over synthesized containers
//!
//! These tests build `.ae3` containers byte-for-byte - records, lead blocks,
//! sector images, markup, gzip, AES-192-CBC - and run them through the full
//! decode pipeline.

use ae3_decoder::crypto::BLOCK_SIZE;
use ae3_decoder::{Ae3Decoder, CipherSpec, DecodeOptions, DecoderError};
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes192Enc, Block};
use chrono::{TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// Gzip, pad and AES-192-CBC encrypt markup text into container bytes
fn encrypt_container(markup: &str, spec: &CipherSpec) -> Vec<u8> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    // The vendor tooling writes a UTF-8 BOM ahead of the markup.
    gz.write_all("\u{feff}".as_bytes()).unwrap();
    gz.write_all(markup.as_bytes()).unwrap();
    let mut plain = gz.finish().unwrap();

    let pad = BLOCK_SIZE - (plain.len() % BLOCK_SIZE);
    plain.extend(std::iter::repeat(pad as u8).take(pad));

    let cipher = Aes192Enc::new((&spec.key).into());
    let mut out = Vec::with_capacity(plain.len());
    let mut prev = spec.iv;
    for chunk in plain.chunks_exact(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        for (i, b) in block.iter_mut().enumerate() {
            *b = chunk[i] ^ prev[i];
        }
        let mut block = Block::clone_from_slice(&block);
        cipher.encrypt_block(&mut block);
        out.extend_from_slice(&block);
        prev.copy_from_slice(&block);
    }
    out
}

/// Wrap a ring-buffer payload as one locked sector in markup text
fn markup_of(sectors: &[(u32, &[u8])]) -> String {
    let mut doc = String::from("<DUMP>");
    for &(id, payload) in sectors {
        let mut raw = vec![0x01, 0x02];
        raw.extend_from_slice(payload);
        raw.extend_from_slice(&[0u8; 4]);
        raw.extend_from_slice(&[0x00; 4]); // locked
        doc.push_str(&format!("<SECTOR ID=\"{}\">{}</SECTOR>", id, hex::encode(raw)));
    }
    doc.push_str("</DUMP>");
    doc
}

fn to_bcd(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

fn bcd_time(y: u8, mo: u8, d: u8, h: u8, mi: u8, s: u8) -> [u8; 6] {
    [to_bcd(y), to_bcd(mo), to_bcd(d), to_bcd(h), to_bcd(mi), to_bcd(s)]
}

/// Default 24-byte channel configuration (channels 800-815)
const CONFIG: [u8; 24] = [
    50, 3, 33, 50, 35, 35, 50, 67, 37, 50, 99, 39,
    50, 131, 41, 50, 163, 43, 50, 195, 45, 50, 227, 47,
];

/// 64-byte boundary: lead-out closing the previous run, lead-in opening the
/// next, with a valid lead-in checksum
fn boundary(close: [u8; 6], open: [u8; 6]) -> Vec<u8> {
    let mut bytes = vec![0u8; 25];
    bytes.extend_from_slice(&close);
    bytes.push(0xEE);

    let mut lead_in = Vec::with_capacity(32);
    lead_in.extend_from_slice(&open);
    lead_in.extend_from_slice(&CONFIG);
    let sum = lead_in.iter().fold(0u8, |s, &b| s.wrapping_add(b));
    lead_in.push(0xFFu8.wrapping_sub(sum).wrapping_sub(1));
    lead_in.push(1); // spare
    bytes.extend(lead_in);
    bytes
}

/// One 32-byte record of 16 big-endian samples
fn record(values: [u16; 16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// A benign record with small nonzero samples in every channel
fn filler_record(seed: u16) -> Vec<u8> {
    let mut values = [0u16; 16];
    for (i, v) in values.iter_mut().enumerate() {
        *v = 100 + seed + i as u16;
    }
    record(values)
}

/// Build the reference ring-buffer payload: 15 sessions, session ordinal 1
/// starting 2024-07-26 17:06 with 1525 records and Engine Status 18 in its
/// first record
fn reference_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    let times: Vec<[u8; 6]> = (0..15)
        .map(|i| bcd_time(24, 7, 26, 10 + (i / 4) as u8, (i % 4) as u8 * 15 + 3, 5))
        .collect();

    for (i, &open) in times.iter().enumerate() {
        let open = if i == 1 {
            bcd_time(24, 7, 26, 17, 6, 0)
        } else {
            open
        };
        let close = times[i.saturating_sub(1)];
        payload.extend(boundary(close, open));

        if i == 1 {
            let mut first = [0u16; 16];
            for (ch, v) in first.iter_mut().enumerate() {
                *v = 200 + ch as u16;
            }
            first[13] = 18; // Engine Status
            payload.extend(record(first));
            for s in 0..1524u16 {
                payload.extend(filler_record(s % 50));
            }
        } else {
            for s in 0..5u16 {
                payload.extend(filler_record(i as u16 + s));
            }
        }
    }
    payload
}

fn decode(container: &[u8]) -> ae3_decoder::DecodeOutput {
    Ae3Decoder::new()
        .decode_bytes(container, &DecodeOptions::new())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn decrypt_round_trip() {
    let markup = markup_of(&[(16, &[0x11u8; 64][..])]);
    let container = encrypt_container(&markup, &CipherSpec::embedded());
    let output = Ae3Decoder::new()
        .decode_bytes(&container, &DecodeOptions::new().with_markup(true))
        .unwrap();
    // The BOM is stripped; the markup otherwise survives verbatim.
    assert_eq!(output.markup.as_deref(), Some(markup.as_str()));
}

#[test]
fn reference_fixture_decodes_to_15_sessions() {
    let payload = reference_payload();
    let container = encrypt_container(&markup_of(&[(16, &payload)]), &CipherSpec::embedded());
    let output = decode(&container);

    assert_eq!(output.sessions.len(), 15);

    let session = &output.sessions[1];
    assert_eq!(session.index, 1);
    assert_eq!(
        session.start_time,
        Utc.with_ymd_and_hms(2024, 7, 26, 17, 6, 0).unwrap()
    );
    assert_eq!(session.record_count(), 1525);

    let status_column = session.channels.iter().position(|&c| c == 813).unwrap();
    assert_eq!(session.records[0].values[status_column], 18.0);

    // Every run but the newest was closed by a recorded engine stop; the
    // newest ends at the image edge and is still open.
    assert!(session.closed);
    assert!(session.start_decoded);
    assert!(!output.sessions.last().unwrap().closed);
}

#[test]
fn session_timestamps_are_strictly_consecutive() {
    let payload = reference_payload();
    let container = encrypt_container(&markup_of(&[(16, &payload)]), &CipherSpec::embedded());
    let output = decode(&container);

    for session in &output.sessions {
        for pair in session.records.windows(2) {
            assert_eq!(
                (pair[1].timestamp - pair[0].timestamp).num_seconds(),
                1,
                "non-consecutive timestamps in session {}",
                session.index
            );
        }
        let span = (session.end_time() - session.start_time).num_seconds();
        assert_eq!(span + 1, session.record_count() as i64);
    }
}

#[test]
fn assembly_is_invariant_under_markup_reordering() {
    // Split the payload across two sectors and swap their document order;
    // the assembler re-sorts by ID, so sessions must be identical.
    let payload = reference_payload();
    let (a, b) = payload.split_at(payload.len() / 2);

    let forward = encrypt_container(&markup_of(&[(16, a), (17, b)]), &CipherSpec::embedded());
    let reversed = encrypt_container(&markup_of(&[(17, b), (16, a)]), &CipherSpec::embedded());

    assert_eq!(decode(&forward).sessions, decode(&reversed).sessions);
}

#[test]
fn pipeline_is_idempotent() {
    let payload = reference_payload();
    let container = encrypt_container(&markup_of(&[(16, &payload)]), &CipherSpec::embedded());
    assert_eq!(decode(&container).sessions, decode(&container).sessions);
}

#[test]
fn leading_fragment_is_discarded() {
    let mut payload = vec![0x11u8; 40]; // torn tail of an overwritten session
    payload.extend(reference_payload());
    let container = encrypt_container(&markup_of(&[(16, &payload)]), &CipherSpec::embedded());
    assert_eq!(decode(&container).sessions.len(), 15);
}

#[test]
fn markerless_image_yields_zero_sessions() {
    let payload = vec![0x11u8; 4096];
    let container = encrypt_container(&markup_of(&[(16, &payload)]), &CipherSpec::embedded());
    let output = decode(&container);
    assert!(output.sessions.is_empty());
}

#[test]
fn substituted_cipher_material_is_honored() {
    let spec = CipherSpec::new([7u8; 24], [9u8; 16]);
    let payload = reference_payload();
    let container = encrypt_container(&markup_of(&[(16, &payload)]), &spec);

    let output = Ae3Decoder::new()
        .with_cipher(spec)
        .decode_bytes(&container, &DecodeOptions::new())
        .unwrap();
    assert_eq!(output.sessions.len(), 15);

    // The embedded key cannot open a fixture-keyed container.
    let result = Ae3Decoder::new().decode_bytes(&container, &DecodeOptions::new());
    assert!(matches!(result, Err(DecoderError::Decryption(_))));
}

#[test]
fn markup_is_withheld_by_default() {
    let container = encrypt_container(
        &markup_of(&[(16, &[0x11u8; 64][..])]),
        &CipherSpec::embedded(),
    );
    let output = decode(&container);
    assert!(output.markup.is_none());
}
