//! Fixed-width record decoding
//!
//! A session's data range holds one record per second: one big-endian 16-bit
//! sample per configured channel, 32 bytes per record for the standard
//! 16-channel layout. Samples are two's-complement signed except for the
//! status/bitfield class. Each raw sample is converted to a physical value
//! through the channel table's linear calibration.
//!
//! The logger never splits a record across a sector payload boundary; a
//! candidate position that would straddle one is advanced to the next
//! boundary. A partial record at the end of the range is dropped, not
//! zero-padded - truncation is policy here, not an error.

use crate::assembler::PayloadImage;
use crate::channels::ChannelTable;
use crate::markup::SECTOR_PAYLOAD_SIZE;
use crate::segmenter::SessionSlice;
use crate::types::{ChannelRecord, Session, Timestamp};
use byteorder::{BigEndian, ByteOrder};
use chrono::{Duration, TimeZone, Utc};

/// Bytes per raw sample
const SAMPLE_SIZE: usize = 2;

/// Decode one session slice into a [`Session`] with populated records
///
/// Timestamps are seeded from the slice's lead-in time; when that is
/// undecodable, from the closing lead-out time minus the record count; as a
/// last resort from a fixed far-future sentinel date. Returns `None` when
/// the range holds no complete record.
pub fn decode_session(
    image: &PayloadImage,
    slice: &SessionSlice,
    index: usize,
    table: &ChannelTable,
) -> Option<Session> {
    let stride = slice.channels.len() * SAMPLE_SIZE;
    if stride == 0 {
        return None;
    }

    let bytes = image.as_bytes();
    let mut raw_records = Vec::new();
    let mut pos = slice.data.start;

    while pos + stride <= slice.data.end {
        // Sector payload boundaries are multiples of the full-sector payload
        // size within the image; records never cross them.
        let start_sector = pos / SECTOR_PAYLOAD_SIZE;
        let end_sector = (pos + stride - 1) / SECTOR_PAYLOAD_SIZE;
        if start_sector != end_sector {
            pos = end_sector * SECTOR_PAYLOAD_SIZE;
            continue;
        }

        let mut values = Vec::with_capacity(slice.channels.len());
        for (i, &code) in slice.channels.iter().enumerate() {
            let off = pos + i * SAMPLE_SIZE;
            let raw = BigEndian::read_u16(&bytes[off..off + SAMPLE_SIZE]);
            let raw = if table.is_unsigned(code) {
                raw as f64
            } else {
                raw as i16 as f64
            };
            values.push(table.scale(code, raw));
        }
        raw_records.push(values);
        pos += stride;
    }

    if raw_records.is_empty() {
        return None;
    }

    let start_time = seed_start_time(slice, raw_records.len());
    let records = raw_records
        .into_iter()
        .enumerate()
        .map(|(second, values)| ChannelRecord {
            timestamp: start_time + Duration::seconds(second as i64),
            values,
        })
        .collect();

    Some(Session {
        index,
        start_time,
        start_decoded: slice.start_time.is_some(),
        closed: slice.closed,
        channels: slice.channels.clone(),
        records,
    })
}

/// Resolve the session start time from the available header timestamps
fn seed_start_time(slice: &SessionSlice, record_count: usize) -> Timestamp {
    slice
        .start_time
        .or_else(|| {
            slice
                .close_time
                .map(|end| end - Duration::seconds(record_count as i64))
        })
        .unwrap_or_else(sentinel_start)
}

/// Start time for sessions with no decodable timestamp at all
///
/// A far-future date, kept from the vendor tooling so such sessions are
/// immediately recognizable in output.
fn sentinel_start() -> Timestamp {
    Utc.with_ymd_and_hms(2049, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
