//! Session boundary detection
//!
//! Every engine start/stop writes a 64-byte boundary into the ring buffer:
//! a 32-byte lead-out block closing the previous run, immediately followed
//! by a 32-byte lead-in block opening the next one.
//!
//! ```text
//! lead-out: [25 zero bytes][6 BCD timestamp: end of previous run][checksum]
//! lead-in:  [6 BCD timestamp: start of next run][24 config bytes][checksum][spare]
//! ```
//!
//! The 25-zero run is the boundary marker. Record data can legitimately
//! contain shorter zero runs, so a marker is anchored at the *end* of each
//! zero run: a run of Z >= 25 zeros yields floor(Z / 25) markers counted
//! back from the run's end.
//!
//! Segmentation is an explicit state machine over the payload image. A
//! fragment before the first marker is a torn session from ring-buffer
//! wraparound and cannot be reliably bounded - it is discarded, never
//! emitted. Lead-ins whose checksum fails suppress the session they would
//! open. Byte-adjacent markers bound an empty range and emit nothing.

use crate::assembler::PayloadImage;
use crate::channels;
use crate::types::Timestamp;
use chrono::{TimeZone, Utc};
use std::ops::Range;

/// Length of the zero run forming a boundary marker
pub const BOUNDARY_ZERO_RUN: usize = 25;

/// Length of each lead block (lead-out and lead-in)
pub const LEAD_BLOCK_LEN: usize = 32;

/// Total header bytes consumed at a boundary
pub const BOUNDARY_HEADER_LEN: usize = 2 * LEAD_BLOCK_LEN;

/// One detected session: decoded header fields plus its data byte range
///
/// `start_time` is `None` when the lead-in timestamp is undecodable; the
/// record decoder then seeds timestamps from `close_time` or a sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSlice {
    /// Start timestamp from this session's lead-in, if decodable
    pub start_time: Option<Timestamp>,
    /// End timestamp from the closing boundary's lead-out, if any
    pub close_time: Option<Timestamp>,
    /// Channel codes recorded in this session
    pub channels: Vec<u16>,
    /// Record data range within the payload image
    pub data: Range<usize>,
    /// True when a following boundary closed this run; the newest run ends
    /// at the image edge and was still in progress when the dump was taken
    pub closed: bool,
}

/// Scanner state while walking the payload image
#[derive(Debug, Clone, PartialEq)]
enum ScanState {
    /// Between sessions, looking for the next boundary marker
    Scanning,
    /// A marker was found; its 64 header bytes are being decoded
    HeaderRead { boundary: usize },
    /// Collecting record bytes for an open session
    RecordRange { open: OpenSession },
}

/// Header fields of a session whose data range is still unbounded
#[derive(Debug, Clone, PartialEq)]
struct OpenSession {
    start_time: Option<Timestamp>,
    channels: Vec<u16>,
    data_start: usize,
}

/// Splits a payload image into ordered session slices
pub struct SessionSegmenter<'a> {
    image: &'a [u8],
    state: ScanState,
    slices: Vec<SessionSlice>,
}

impl<'a> SessionSegmenter<'a> {
    /// Scan the image and return session slices in physical byte order
    ///
    /// Zero markers in a well-formed image is a degenerate but valid file
    /// and yields an empty list, not an error.
    pub fn segment(image: &'a PayloadImage) -> Vec<SessionSlice> {
        let mut segmenter = Self {
            image: image.as_bytes(),
            state: ScanState::Scanning,
            slices: Vec::new(),
        };

        for boundary in find_markers(segmenter.image) {
            segmenter.on_marker(boundary);
        }
        segmenter.on_image_end();

        log::debug!("Segmented image into {} sessions", segmenter.slices.len());
        segmenter.slices
    }

    /// Transition on a boundary marker at `boundary`
    fn on_marker(&mut self, boundary: usize) {
        // A marker bounds the open session, if any.
        if let ScanState::RecordRange { open } =
            std::mem::replace(&mut self.state, ScanState::HeaderRead { boundary })
        {
            self.emit(open, boundary, self.lead_out_time(boundary), true);
        }
        self.state = self.read_header(boundary);
    }

    /// Transition at the end of the image: the final session is bounded by
    /// the image end rather than another marker
    fn on_image_end(&mut self) {
        if let ScanState::RecordRange { open } =
            std::mem::replace(&mut self.state, ScanState::Scanning)
        {
            self.emit(open, self.image.len(), None, false);
        }
    }

    /// Decode the lead-in block following the marker at `boundary`
    ///
    /// Returns the next state: a new open session, or back to scanning when
    /// the header is incomplete or its checksum fails.
    fn read_header(&self, boundary: usize) -> ScanState {
        let lead_in_start = boundary + LEAD_BLOCK_LEN;
        let header_end = boundary + BOUNDARY_HEADER_LEN;
        if header_end > self.image.len() {
            log::debug!("Boundary at {} has incomplete header, skipping", boundary);
            return ScanState::Scanning;
        }

        let lead_in = &self.image[lead_in_start..header_end];
        let checksum = lead_in.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
        if checksum != 0xFF {
            log::warn!(
                "Lead-in checksum mismatch at offset {} (got 0x{:02X}), session suppressed",
                lead_in_start,
                checksum
            );
            return ScanState::Scanning;
        }

        let start_time = parse_bcd_timestamp(&lead_in[..6]);

        let mut config = [0u8; 24];
        config.copy_from_slice(&lead_in[6..30]);
        let channels = if config.iter().all(|&b| b == 0) {
            channels::default_channels()
        } else {
            channels::parse_channel_config(&config)
        };

        ScanState::RecordRange {
            open: OpenSession {
                start_time,
                channels,
                data_start: header_end,
            },
        }
    }

    /// Decode the end timestamp of the lead-out block at `boundary`
    fn lead_out_time(&self, boundary: usize) -> Option<Timestamp> {
        let block = self
            .image
            .get(boundary..boundary + LEAD_BLOCK_LEN)?;
        parse_bcd_timestamp(&block[BOUNDARY_ZERO_RUN..BOUNDARY_ZERO_RUN + 6])
    }

    /// Close an open session ending at `data_end`
    fn emit(
        &mut self,
        open: OpenSession,
        data_end: usize,
        close_time: Option<Timestamp>,
        closed: bool,
    ) {
        // Adjacent markers bound a zero-length range: no session.
        if open.data_start >= data_end {
            return;
        }
        self.slices.push(SessionSlice {
            start_time: open.start_time,
            close_time,
            channels: open.channels,
            data: open.data_start..data_end,
            closed,
        });
    }
}

/// Find boundary marker offsets, ascending
///
/// Walks the image once tracking zero runs; each run of Z >= 25 zeros
/// contributes floor(Z / 25) markers anchored at the run's end, so trailing
/// data zeros ahead of a genuine lead-out never shift the marker position.
fn find_markers(image: &[u8]) -> Vec<usize> {
    let mut markers = Vec::new();
    let mut run_start = None;

    let close_run = |start: usize, end: usize, markers: &mut Vec<usize>| {
        let len = end - start;
        for k in (1..=len / BOUNDARY_ZERO_RUN).rev() {
            markers.push(end - k * BOUNDARY_ZERO_RUN);
        }
    };

    for (pos, &byte) in image.iter().enumerate() {
        match (byte, run_start) {
            (0, None) => run_start = Some(pos),
            (0, Some(_)) => {}
            (_, Some(start)) => {
                close_run(start, pos, &mut markers);
                run_start = None;
            }
            (_, None) => {}
        }
    }
    if let Some(start) = run_start {
        close_run(start, image.len(), &mut markers);
    }

    markers
}

/// Convert one BCD byte to its decimal value
fn bcd(byte: u8) -> u8 {
    (byte >> 4) * 10 + (byte & 0x0F)
}

/// Parse 6 BCD bytes (year-2000, month, day, hour, minute, second) into a
/// UTC timestamp; out-of-range fields yield `None`, not an error
fn parse_bcd_timestamp(bytes: &[u8]) -> Option<Timestamp> {
    let year = bcd(bytes[0]) as i32;
    let month = bcd(bytes[1]) as u32;
    let day = bcd(bytes[2]) as u32;
    let hour = bcd(bytes[3]) as u32;
    let minute = bcd(bytes[4]) as u32;
    let second = bcd(bytes[5]) as u32;

    if year >= 120 {
        return None;
    }
    Utc.with_ymd_and_hms(2000 + year, month, day, hour, minute, second)
        .single()
}
