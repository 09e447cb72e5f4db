//! Payload reassembly
//!
//! Concatenates extracted sector payloads into one contiguous image of the
//! ECU's ring-buffer flash region. Sector markup order is not physical order:
//! entries are sorted by ID first. The ring buffer fills sectors in ID order
//! and wraps, so the image is rotated to start just after the active sector -
//! that puts the oldest surviving data first and the write head last.

use crate::markup::{SectorEntry, SectorStatus};

/// The reassembled ring-buffer memory, an owned contiguous byte arena
///
/// Sessions are byte ranges into this image; they never overlap and are never
/// updated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadImage {
    bytes: Vec<u8>,
}

impl PayloadImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Assemble sector entries into a payload image
///
/// Unusable sectors (erased, never written, unrecognized status) are
/// filtered out. Gaps in the ID range are tolerated - smaller dumps simply
/// skip that sector's byte range. Empty input yields an empty image; whether
/// a zero-session file is acceptable is the caller's decision.
pub fn assemble(mut entries: Vec<SectorEntry>) -> PayloadImage {
    entries.retain(|e| e.status.is_usable());
    entries.sort_by_key(|e| e.id);

    // Rotate so sectors after the last active one come first (oldest data
    // first); the active sector's run ends the image.
    if let Some(active) = entries.iter().rposition(|e| e.status == SectorStatus::Active) {
        let count = entries.len().max(1);
        entries.rotate_left((active + 1) % count);
    }

    let total: usize = entries.iter().map(|e| e.payload.len()).sum();
    let mut bytes = Vec::with_capacity(total);
    for entry in &entries {
        bytes.extend_from_slice(&entry.payload);
    }

    log::debug!(
        "Assembled {} byte payload image from {} sectors",
        bytes.len(),
        entries.len()
    );

    PayloadImage { bytes }
}
