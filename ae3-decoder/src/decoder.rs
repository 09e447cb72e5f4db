//! Main decoder API
//!
//! [`Ae3Decoder`] is the entry point: it composes the pipeline stages in
//! sequence for one container - decrypt, extract sectors, assemble the
//! payload image, segment into sessions, decode records - and returns the
//! ordered session list.
//!
//! The pipeline is a synchronous, purely computational transform over one
//! in-memory container. A decoder instance holds only read-only tables, so
//! running independent invocations concurrently (one per file) is safe.

use crate::assembler;
use crate::channels::ChannelTable;
use crate::config::DecodeOptions;
use crate::crypto::{CipherSpec, Decryptor};
use crate::markup::SectorExtractor;
use crate::record_decoder;
use crate::segmenter::SessionSegmenter;
use crate::types::{Result, Session};
use std::path::Path;

/// Everything produced by one pipeline invocation
#[derive(Debug, Clone)]
pub struct DecodeOutput {
    /// Decoded sessions, ordinal 0 first (oldest data)
    pub sessions: Vec<Session>,
    /// Decrypted intermediate markup, verbatim, when requested
    pub markup: Option<String>,
}

/// The decode pipeline for `.ae3` containers
pub struct Ae3Decoder {
    decryptor: Decryptor,
    channels: ChannelTable,
}

impl Ae3Decoder {
    /// Create a decoder with the embedded cipher material and the builtin
    /// channel calibration tables
    pub fn new() -> Self {
        Self {
            decryptor: Decryptor::default(),
            channels: ChannelTable::builtin(),
        }
    }

    /// Builder method: substitute cipher material (test fixtures)
    pub fn with_cipher(mut self, spec: CipherSpec) -> Self {
        self.decryptor = Decryptor::new(spec);
        self
    }

    /// Builder method: substitute channel calibration tables
    pub fn with_channels(mut self, table: ChannelTable) -> Self {
        self.channels = table;
        self
    }

    /// The channel table this decoder scales with (name/unit lookups)
    pub fn channel_table(&self) -> &ChannelTable {
        &self.channels
    }

    /// Run the full pipeline over raw container bytes
    ///
    /// Returns the ordered session list; an empty list means a well-formed
    /// container with no boundary markers, which is valid. Decryption and
    /// markup failures are terminal for this container.
    pub fn decode_bytes(&self, container: &[u8], options: &DecodeOptions) -> Result<DecodeOutput> {
        let markup = self.decryptor.decrypt(container)?;

        let entries = SectorExtractor::extract(&markup).collect::<Result<Vec<_>>>()?;
        log::info!("Extracted {} data log sectors", entries.len());

        let image = assembler::assemble(entries);
        let slices = SessionSegmenter::segment(&image);

        let mut sessions = Vec::with_capacity(slices.len());
        for slice in &slices {
            if let Some(session) =
                record_decoder::decode_session(&image, slice, sessions.len(), &self.channels)
            {
                sessions.push(session);
            }
        }

        log::info!("Decoded {} sessions", sessions.len());

        Ok(DecodeOutput {
            sessions,
            markup: options.keep_markup.then_some(markup),
        })
    }

    /// Convenience wrapper: read a container file and decode it
    pub fn decode_file(&self, path: &Path, options: &DecodeOptions) -> Result<DecodeOutput> {
        log::info!("Decoding container: {:?}", path);
        let container = std::fs::read(path)?;
        self.decode_bytes(&container, options)
    }
}

impl Default for Ae3Decoder {
    fn default() -> Self {
        Self::new()
    }
}
