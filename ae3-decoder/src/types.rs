//! Core types for the AE3 log decoder library
//!
//! This module defines the fundamental types the decoder produces when processing
//! `.ae3` containers, plus the error taxonomy. The decoder is a pure batch
//! transform - raw container bytes in, ordered sessions out.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Timestamp type used throughout the decoder (second resolution)
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur during decoding
///
/// Every error is terminal for the container it occurred in. A batch runner
/// is expected to log the failure and move on to the next file.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    /// Bad key material, corrupt/truncated ciphertext or decompression failure
    #[error("Failed to decrypt container: {0}")]
    Decryption(String),

    /// Malformed sector markup in the decrypted plaintext
    #[error("Failed to parse sector markup: {0}")]
    Markup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One second of telemetry: a timestamp plus one physical value per channel
///
/// Values are ordered to match the owning session's channel code list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    /// UTC timestamp of this record (1 Hz recording rate)
    pub timestamp: Timestamp,
    /// Physical values after per-channel linear scaling
    pub values: Vec<f64>,
}

/// One engine run, from start to shutdown
///
/// Sessions are immutable once returned by the pipeline. Ordinal 0 is the
/// oldest run in the ring buffer; record timestamps within a session are
/// strictly consecutive at one-second steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session ordinal (0 = oldest data in the ring buffer)
    pub index: usize,
    /// Decoded start timestamp of the run
    pub start_time: Timestamp,
    /// True when the start timestamp was decoded from the run's header,
    /// false when it was estimated or is the sentinel
    pub start_decoded: bool,
    /// True when the run was closed by a recorded engine stop; the newest
    /// run in the ring buffer may still have been in progress
    pub closed: bool,
    /// Channel codes recorded in this session, in record column order
    pub channels: Vec<u16>,
    /// Decoded records, one per second
    pub records: Vec<ChannelRecord>,
}

impl Session {
    /// Number of decoded records in this session
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Timestamp of the last record (start + record count - 1 seconds)
    pub fn end_time(&self) -> Timestamp {
        let last = self.records.len().saturating_sub(1) as i64;
        self.start_time + Duration::seconds(last)
    }

    /// Total duration of the run
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.records.len() as i64)
    }

    /// Maximum physical value recorded for a channel code, if present
    pub fn max_value(&self, channel_code: u16) -> Option<f64> {
        let column = self.channels.iter().position(|&c| c == channel_code)?;
        self.records
            .iter()
            .map(|r| r.values[column])
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session {} ({} records, {} - {})",
            self.index,
            self.records.len(),
            self.start_time.format("%Y-%m-%d %H:%M:%S"),
            self.end_time().format("%Y-%m-%d %H:%M:%S"),
        )
    }
}
