//! AE3 Data Log Decoder Library
//!
//! A stateless, reusable library for decoding encrypted AE300 engine data
//! logger containers (`.ae3` hex dump files) into per-second physical
//! telemetry grouped into engine-run sessions.
//!
//! # Architecture
//!
//! The pipeline runs five stages in sequence for one container:
//! 1. Decrypt the container (AES-192-CBC + gzip) into the sector markup
//! 2. Stream sector entries out of the markup
//! 3. Reassemble sector payloads into the ring-buffer image
//! 4. Detect session boundaries and split the image into runs
//! 5. Decode fixed-width records and apply per-channel calibration
//!
//! The library does NOT:
//! - Write CSV files or render summary tables
//! - Walk directories or handle command-line arguments
//! - Validate domain plausibility of decoded physical values
//!
//! All higher-level functionality is in the application layer (ae3-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use ae3_decoder::{Ae3Decoder, DecodeOptions};
//! use std::path::Path;
//!
//! let decoder = Ae3Decoder::new();
//! let output = decoder
//!     .decode_file(Path::new("MyHexDump.ae3"), &DecodeOptions::new())
//!     .unwrap();
//!
//! for session in &output.sessions {
//!     println!(
//!         "Session {}: {} records starting {}",
//!         session.index,
//!         session.record_count(),
//!         session.start_time
//!     );
//! }
//! ```

// Public modules
pub mod assembler;
pub mod channels;
pub mod config;
pub mod crypto;
pub mod decoder;
pub mod markup;
pub mod record_decoder;
pub mod segmenter;
pub mod types;

// Re-export main types for convenience
pub use channels::{ChannelDefinition, ChannelTable, SignalClass};
pub use config::DecodeOptions;
pub use crypto::CipherSpec;
pub use decoder::{Ae3Decoder, DecodeOutput};
pub use types::{ChannelRecord, DecoderError, Result, Session, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
