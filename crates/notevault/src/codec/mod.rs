//! # Compression Codec
//!
//! Envelope text is optionally compressed before it reaches the medium. Two
//! interchangeable strategies implement [`Compressor`]:
//!
//! - [`DeflateCompressor`] (`GZ:` prefix): the native gzip stream via flate2.
//! - [`DictionaryCompressor`] (`LZ:` prefix): a self-contained adaptive
//!   dictionary coder, used when native compression is turned off.
//!
//! Text carrying neither prefix is the raw serialized envelope. Decoding
//! dispatches on the prefix, so a store written with one strategy stays
//! readable after the configuration switches to the other.
//!
//! ## When To Compress
//!
//! [`Codec::smart_compress`] decides per payload:
//!
//! 1. Below the threshold (default 1024 chars) the text is stored as-is.
//! 2. The repetition ratio `chars / distinct chars` gives an estimated
//!    reduction: >10 → 70%, >5 → 50%, >2 → 30%, otherwise 10%.
//! 3. Compression is attempted only when the estimate beats 20%.
//! 4. If the real reduction is 15% or less, the original text is kept.
//!
//! Compression failures never reach the caller: they are logged and the text
//! is stored uncompressed.

use serde::Serialize;
use std::collections::HashSet;

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::model::EncodingMeta;

pub mod deflate;
pub mod dictionary;

pub use deflate::{DeflateCompressor, DEFLATE_TAG};
pub use dictionary::{DictionaryCompressor, DICTIONARY_TAG};

/// Estimated reduction must exceed this before compression is attempted.
pub const MIN_ESTIMATED_REDUCTION: f64 = 0.20;

/// Achieved reduction at or below this is discarded.
pub const MIN_ACHIEVED_REDUCTION: f64 = 0.15;

/// Ceiling on decoded output when no metadata records the original size.
pub const MAX_DECODED_BYTES: usize = 64 * 1024 * 1024;

/// One encode/decode strategy. Encoded output always starts with [`Self::tag`].
pub trait Compressor {
    fn tag(&self) -> &'static str;

    fn encode(&self, text: &str) -> Result<String>;

    /// Decodes `payload`, failing with `Decompression` as soon as the output
    /// would grow past `limit` bytes.
    fn decode_bounded(&self, payload: &str, limit: usize) -> Result<String>;

    fn decode(&self, payload: &str) -> Result<String> {
        self.decode_bounded(payload, MAX_DECODED_BYTES)
    }
}

/// Stored text plus the metadata describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub text: String,
    pub meta: EncodingMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    /// Fractional reduction, `1 - compressed / original`.
    pub ratio: f64,
    pub worth_compressing: bool,
}

#[derive(Debug, Clone)]
pub struct Codec {
    threshold: usize,
    native: bool,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(1024, true)
    }
}

impl Codec {
    pub fn new(threshold: usize, native: bool) -> Self {
        Self { threshold, native }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.compression_threshold, config.native_compression)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn preferred(&self) -> &'static dyn Compressor {
        if self.native {
            &DeflateCompressor
        } else {
            &DictionaryCompressor
        }
    }

    /// Expected fractional reduction, from the repetition ratio alone.
    pub fn estimate_reduction(&self, text: &str) -> f64 {
        let len = text.chars().count();
        let distinct = text.chars().collect::<HashSet<_>>().len();
        if distinct == 0 {
            return 0.0;
        }
        let ratio = len as f64 / distinct as f64;
        if ratio > 10.0 {
            0.7
        } else if ratio > 5.0 {
            0.5
        } else if ratio > 2.0 {
            0.3
        } else {
            0.1
        }
    }

    pub fn worth_compressing(&self, text: &str) -> bool {
        text.chars().count() > self.threshold
            && self.estimate_reduction(text) > MIN_ESTIMATED_REDUCTION
    }

    /// Encodes `text` for storage, compressing only when it pays off.
    pub fn smart_compress(&self, text: &str) -> Encoded {
        let raw = || Encoded {
            text: text.to_string(),
            meta: EncodingMeta::uncompressed(text.len()),
        };

        if !self.worth_compressing(text) {
            return raw();
        }

        let compressor = self.preferred();
        match compressor.encode(text) {
            Ok(compressed) => {
                let reduction = reduction(text.len(), compressed.len());
                if reduction <= MIN_ACHIEVED_REDUCTION {
                    log::debug!(
                        "Compression saved only {:.1}% of {} bytes, storing raw",
                        reduction * 100.0,
                        text.len()
                    );
                    return raw();
                }
                log::debug!(
                    "Compressed {} -> {} bytes with {}",
                    text.len(),
                    compressed.len(),
                    compressor.tag()
                );
                Encoded {
                    text: compressed,
                    meta: EncodingMeta {
                        compressed: true,
                        original_size: text.len(),
                    },
                }
            }
            Err(e) => {
                log::warn!("Compression failed, storing uncompressed: {}", e);
                raw()
            }
        }
    }

    /// Decodes stored text, dispatching on its tag prefix.
    pub fn decode(&self, payload: &str) -> Result<String> {
        self.decode_bounded(payload, MAX_DECODED_BYTES)
    }

    pub fn decode_bounded(&self, payload: &str, limit: usize) -> Result<String> {
        if payload.starts_with(DEFLATE_TAG) {
            DeflateCompressor.decode_bounded(payload, limit)
        } else if payload.starts_with(DICTIONARY_TAG) {
            DictionaryCompressor.decode_bounded(payload, limit)
        } else {
            Ok(payload.to_string())
        }
    }

    /// Decodes stored text and checks it against its metadata.
    ///
    /// Any disagreement (a tag without `compressed`, a size mismatch, a codec
    /// failure) is reported as corruption. Decoding stops once the output
    /// passes the recorded size.
    pub fn decode_verified(&self, payload: &str, meta: &EncodingMeta) -> Result<String> {
        if is_compressed(payload) != meta.compressed {
            return Err(VaultError::CorruptedData(format!(
                "metadata says compressed={} but payload {} a codec tag",
                meta.compressed,
                if meta.compressed { "lacks" } else { "carries" }
            )));
        }
        let limit = meta.original_size.min(MAX_DECODED_BYTES);
        let text = self.decode_bounded(payload, limit).map_err(|e| match e {
            VaultError::Decompression(msg) => VaultError::CorruptedData(msg),
            other => other,
        })?;
        if text.len() != meta.original_size {
            return Err(VaultError::CorruptedData(format!(
                "decoded {} bytes, metadata records {}",
                text.len(),
                meta.original_size
            )));
        }
        Ok(text)
    }

    /// Measures what the preferred strategy would achieve on `text`.
    pub fn compression_stats(&self, text: &str) -> Result<CompressionStats> {
        let compressed = self.preferred().encode(text)?;
        Ok(CompressionStats {
            original_size: text.len(),
            compressed_size: compressed.len(),
            ratio: reduction(text.len(), compressed.len()),
            worth_compressing: self.worth_compressing(text),
        })
    }
}

pub fn is_compressed(payload: &str) -> bool {
    payload.starts_with(DEFLATE_TAG) || payload.starts_with(DICTIONARY_TAG)
}

fn reduction(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    1.0 - compressed as f64 / original as f64
}
