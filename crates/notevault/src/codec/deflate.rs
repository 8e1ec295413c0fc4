use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use super::Compressor;
use crate::error::{Result, VaultError};

pub const DEFLATE_TAG: &str = "GZ:";

/// Native path: gzip stream, base64 wrapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeflateCompressor;

impl Compressor for DeflateCompressor {
    fn tag(&self) -> &'static str {
        DEFLATE_TAG
    }

    fn encode(&self, text: &str) -> Result<String> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(text.as_bytes())
            .map_err(|e| VaultError::Compression(e.to_string()))?;
        let bytes = enc
            .finish()
            .map_err(|e| VaultError::Compression(e.to_string()))?;
        Ok(format!("{}{}", DEFLATE_TAG, STANDARD.encode(bytes)))
    }

    fn decode_bounded(&self, payload: &str, limit: usize) -> Result<String> {
        let body = payload
            .strip_prefix(DEFLATE_TAG)
            .ok_or_else(|| VaultError::Decompression("missing gzip tag".to_string()))?;
        let bytes = STANDARD
            .decode(body)
            .map_err(|e| VaultError::Decompression(format!("bad base64: {}", e)))?;

        let mut out = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .take(limit as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| VaultError::Decompression(e.to_string()))?;
        if out.len() > limit {
            return Err(VaultError::Decompression(format!(
                "gzip output exceeds limit of {} bytes",
                limit
            )));
        }
        String::from_utf8(out)
            .map_err(|e| VaultError::Decompression(format!("decoded bytes are not UTF-8: {}", e)))
    }
}
