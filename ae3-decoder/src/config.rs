//! Decoder configuration types
//!
//! The decoder needs very little configuration - the cipher material and
//! channel tables are explicit constructor arguments on the decoder itself.
//! What remains here are per-invocation options.

use serde::{Deserialize, Serialize};

/// Per-invocation decode options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Whether to carry the decrypted intermediate markup text in the
    /// output (pass-through for callers that persist it)
    #[serde(default)]
    pub keep_markup: bool,
}

impl DecodeOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: keep the decrypted markup in the output
    pub fn with_markup(mut self, keep: bool) -> Self {
        self.keep_markup = keep;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DecodeOptions::new();
        assert!(!options.keep_markup);
        assert!(options.with_markup(true).keep_markup);
    }
}
