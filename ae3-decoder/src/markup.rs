//! Sector markup parsing
//!
//! The decrypted container is a markup document describing the ECU's flash
//! memory sector by sector: each `SECTOR` element carries an integer `ID`
//! attribute and the sector's raw bytes as hex text. Containers reach tens of
//! megabytes, so the extractor streams events instead of materializing a
//! parse tree, yielding entries lazily in document order.
//!
//! Raw sector layout: 2 header bytes, the payload, 4 spare bytes and a 4-byte
//! status code. Only the payload and the decoded status survive extraction.

use crate::types::{DecoderError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Lowest sector ID carrying data-logger content
pub const DATA_SECTOR_MIN: u32 = 16;

/// Highest sector ID carrying data-logger content (closed range)
pub const DATA_SECTOR_MAX: u32 = 139;

/// Payload size of a full sector after trimming header and trailer
pub const SECTOR_PAYLOAD_SIZE: usize = 65528;

/// Bytes trimmed from the front of a raw sector image
const SECTOR_HEADER_LEN: usize = 2;

/// Bytes trimmed from the end of a raw sector image (spare + status)
const SECTOR_TRAILER_LEN: usize = 8;

/// Flash state of a sector, decoded from its 4-byte trailer code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorStatus {
    /// Currently being written (the ring buffer's write head lives here)
    Active,
    /// Full but not yet locked
    FullNotLocked,
    /// Full and locked
    Locked,
    /// Erased, awaiting reuse
    Erased,
    /// Never written
    NotModified,
    /// Unrecognized status code
    Unknown,
}

impl SectorStatus {
    /// Decode the 4-byte status code at the end of a raw sector
    fn from_code(code: &[u8]) -> Self {
        match code {
            [0xAA, 0xAA, 0xAA, 0xAA] => SectorStatus::Active,
            [0xA8, 0xA8, 0xA8, 0xA8] => SectorStatus::FullNotLocked,
            [0x00, 0x00, 0x00, 0x00] => SectorStatus::Locked,
            [0xFE, 0xFE, 0xFE, 0xFE] => SectorStatus::Erased,
            [0xFF, 0xFF, 0xFF, 0xFF] => SectorStatus::NotModified,
            _ => SectorStatus::Unknown,
        }
    }

    /// True if this sector contributes payload to the ring-buffer image
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            SectorStatus::Active | SectorStatus::Locked | SectorStatus::FullNotLocked
        )
    }
}

/// One extracted memory sector: ID, flash status and trimmed payload
#[derive(Debug, Clone, PartialEq)]
pub struct SectorEntry {
    /// Sector ID from the markup attribute
    pub id: u32,
    /// Flash state decoded from the sector trailer
    pub status: SectorStatus,
    /// Payload bytes (header and trailer removed)
    pub payload: Vec<u8>,
}

/// Streaming extractor for sector entries
pub struct SectorExtractor;

impl SectorExtractor {
    /// Stream sector entries out of markup text
    ///
    /// Entries are yielded lazily in document order; sectors outside the
    /// data-logger ID range are dropped. Document order is not guaranteed to
    /// match physical sector order - the assembler re-sorts by ID.
    pub fn extract(markup: &str) -> SectorIter<'_> {
        SectorIter {
            reader: Reader::from_str(markup),
            finished: false,
        }
    }
}

/// Lazy, finite, non-restartable iterator over sector entries
pub struct SectorIter<'a> {
    reader: Reader<&'a [u8]>,
    finished: bool,
}

impl<'a> SectorIter<'a> {
    /// Parse one complete SECTOR element, the start tag already consumed
    fn read_sector(&mut self, start: &BytesStart<'_>) -> Result<SectorEntry> {
        let id = sector_id(start)?;
        let mut hex_text = String::new();

        loop {
            match self.reader.read_event() {
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(markup_err)?;
                    hex_text.extend(text.chars().filter(|c| !c.is_ascii_whitespace()));
                }
                Ok(Event::End(end)) if end.name().as_ref() == b"SECTOR" => break,
                Ok(Event::Start(child)) => {
                    return Err(DecoderError::Markup(format!(
                        "unexpected element <{}> inside sector {}",
                        String::from_utf8_lossy(child.name().as_ref()),
                        id
                    )));
                }
                Ok(Event::Eof) => {
                    return Err(DecoderError::Markup(format!(
                        "markup ended inside sector {}",
                        id
                    )));
                }
                Ok(_) => continue,
                Err(e) => return Err(markup_err(e)),
            }
        }

        let raw = hex::decode(&hex_text).map_err(|e| {
            DecoderError::Markup(format!("sector {} payload is not valid hex: {}", id, e))
        })?;

        if raw.len() < SECTOR_HEADER_LEN + SECTOR_TRAILER_LEN {
            return Err(DecoderError::Markup(format!(
                "sector {} raw image is too short ({} bytes)",
                id,
                raw.len()
            )));
        }

        let status = SectorStatus::from_code(&raw[raw.len() - 4..]);
        let payload = raw[SECTOR_HEADER_LEN..raw.len() - SECTOR_TRAILER_LEN].to_vec();

        Ok(SectorEntry { id, status, payload })
    }
}

impl<'a> Iterator for SectorIter<'a> {
    type Item = Result<SectorEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(start)) if start.name().as_ref() == b"SECTOR" => {
                    let start = start.to_owned();
                    match self.read_sector(&start) {
                        Ok(entry) => {
                            if (DATA_SECTOR_MIN..=DATA_SECTOR_MAX).contains(&entry.id) {
                                return Some(Ok(entry));
                            }
                            log::trace!("Dropping sector {} outside data log range", entry.id);
                        }
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    }
                }
                Ok(Event::Empty(start)) if start.name().as_ref() == b"SECTOR" => {
                    self.finished = true;
                    return Some(Err(DecoderError::Markup(format!(
                        "sector element {:?} has no payload",
                        sector_id(&start).ok()
                    ))));
                }
                Ok(Event::Eof) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(markup_err(e)));
                }
            }
        }
    }
}

/// Read the integer ID attribute of a SECTOR element
fn sector_id(start: &BytesStart<'_>) -> Result<u32> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DecoderError::Markup(e.to_string()))?;
        if attr.key.as_ref() == b"ID" {
            let value = attr.unescape_value().map_err(markup_err)?;
            return value.parse::<u32>().map_err(|_| {
                DecoderError::Markup(format!("non-integer sector ID {:?}", value))
            });
        }
    }
    Err(DecoderError::Markup(
        "sector element without ID attribute".to_string(),
    ))
}

fn markup_err(e: quick_xml::Error) -> DecoderError {
    DecoderError::Markup(e.to_string())
}
