//! Container decryption and decompression
//!
//! `.ae3` containers are AES-192-CBC encrypted, PKCS#7 padded, and wrap a
//! gzip stream whose payload is the sector markup text. The cipher key is
//! not user-supplied: it is derived once from an embedded password/salt pair
//! via an iterated SHA-1 scheme, and the IV is likewise an embedded constant.
//!
//! All key material lives in an explicit [`CipherSpec`] handed to the
//! [`Decryptor`], so tests can substitute fixture keys.

use crate::types::{DecoderError, Result};
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::{Aes192Dec, Block};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use sha1::{Digest, Sha1};
use std::io::Read;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Derived key length in bytes (AES-192)
pub const KEY_SIZE: usize = 24;

// Embedded key material, base64 encoded as shipped in the vendor tooling.
const EMBEDDED_PASSWORD: &str = "RTRXdjExMDBQVw==";
const EMBEDDED_SALT: &str = "EBESExQVFhcYGQoLDA==";
const EMBEDDED_IV: &str = "EBESExQVFhcYGQoLDA0ODw==";

/// Key derivation rounds used by the vendor tooling
const KDF_ITERATIONS: usize = 100;

/// Immutable cipher material for one decryptor instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSpec {
    /// AES-192 key
    pub key: [u8; KEY_SIZE],
    /// CBC initialization vector
    pub iv: [u8; BLOCK_SIZE],
}

impl CipherSpec {
    /// Explicit key material (test fixtures)
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; BLOCK_SIZE]) -> Self {
        Self { key, iv }
    }

    /// The key material embedded in the vendor tooling
    ///
    /// The base64 constants are compile-time fixed, so decoding them cannot
    /// fail at runtime.
    pub fn embedded() -> Self {
        let password = STANDARD
            .decode(EMBEDDED_PASSWORD)
            .expect("embedded password is valid base64");
        let salt = STANDARD
            .decode(EMBEDDED_SALT)
            .expect("embedded salt is valid base64");
        let iv_bytes = STANDARD
            .decode(EMBEDDED_IV)
            .expect("embedded IV is valid base64");

        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(&iv_bytes);

        Self {
            key: derive_key(&password, &salt),
            iv,
        }
    }
}

impl Default for CipherSpec {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Derive the AES-192 key from a password/salt pair
///
/// Iterated SHA-1: hash password||salt, re-hash the digest for a total of
/// `KDF_ITERATIONS` rounds, then extend the final digest with counter-prefixed
/// hashes until the key length is reached.
pub fn derive_key(password: &[u8], salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(password);
    hasher.update(salt);
    let mut base: [u8; 20] = hasher.finalize().into();

    for _ in 0..KDF_ITERATIONS - 2 {
        base = Sha1::digest(base).into();
    }

    let mut material: Vec<u8> = Sha1::digest(base).to_vec();
    let mut counter = 1u32;
    while material.len() < KEY_SIZE {
        let mut hasher = Sha1::new();
        hasher.update(counter.to_string().as_bytes());
        hasher.update(base);
        material.extend_from_slice(&hasher.finalize());
        counter += 1;
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&material[..KEY_SIZE]);
    key
}

/// Reverses the container encryption and decompression
pub struct Decryptor {
    spec: CipherSpec,
}

impl Decryptor {
    /// Create a decryptor with explicit cipher material
    pub fn new(spec: CipherSpec) -> Self {
        Self { spec }
    }

    /// Decrypt and decompress a raw container into the markup text
    ///
    /// Fails with [`DecoderError::Decryption`] when the ciphertext length is
    /// not a whole number of cipher blocks, when the PKCS#7 padding is
    /// invalid after decryption, or when the plaintext is not a consistent
    /// gzip/UTF-8 stream. Any of these indicates a corrupt or truncated
    /// container (or wrong key material) and is terminal for this file.
    pub fn decrypt(&self, container: &[u8]) -> Result<String> {
        if container.is_empty() || container.len() % BLOCK_SIZE != 0 {
            return Err(DecoderError::Decryption(format!(
                "ciphertext length {} is not a multiple of the {}-byte block size",
                container.len(),
                BLOCK_SIZE
            )));
        }

        log::debug!("Decrypting {} byte container", container.len());

        let cipher = Aes192Dec::new((&self.spec.key).into());
        let mut plaintext = Vec::with_capacity(container.len());
        let mut prev = self.spec.iv;

        for chunk in container.chunks_exact(BLOCK_SIZE) {
            let mut block = Block::clone_from_slice(chunk);
            cipher.decrypt_block(&mut block);
            for (b, p) in block.iter().zip(prev.iter()) {
                plaintext.push(b ^ p);
            }
            prev.copy_from_slice(chunk);
        }

        strip_pkcs7(&mut plaintext)?;

        let mut decompressed = Vec::new();
        GzDecoder::new(plaintext.as_slice())
            .read_to_end(&mut decompressed)
            .map_err(|e| {
                DecoderError::Decryption(format!("decompression failed: {}", e))
            })?;

        log::debug!("Decompressed markup: {} bytes", decompressed.len());

        let markup = String::from_utf8(decompressed).map_err(|e| {
            DecoderError::Decryption(format!("plaintext is not valid UTF-8: {}", e))
        })?;

        // The vendor tooling emits a UTF-8 BOM ahead of the markup.
        Ok(markup
            .strip_prefix('\u{feff}')
            .map(str::to_owned)
            .unwrap_or(markup))
    }
}

impl Default for Decryptor {
    fn default() -> Self {
        Self::new(CipherSpec::embedded())
    }
}

/// Validate and remove PKCS#7 padding in place
fn strip_pkcs7(data: &mut Vec<u8>) -> Result<()> {
    let pad = *data.last().ok_or_else(|| {
        DecoderError::Decryption("empty plaintext after decryption".to_string())
    })? as usize;

    if pad == 0 || pad > BLOCK_SIZE || pad > data.len() {
        return Err(DecoderError::Decryption(format!(
            "invalid padding byte {} after decryption",
            pad
        )));
    }
    if data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(DecoderError::Decryption(
            "inconsistent padding bytes after decryption".to_string(),
        ));
    }

    data.truncate(data.len() - pad);
    Ok(())
}
