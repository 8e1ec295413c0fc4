//! Adaptive-dictionary compressor.
//!
//! A self-contained LZ78-family coder (the LZW variant): the dictionary starts
//! with the 256 single-byte strings, the encoder greedily extends the longest
//! known entry, emits its code and registers `match + next byte` as a new
//! entry. The decoder rebuilds the same dictionary one step behind the
//! encoder, which is why a code equal to the slot about to be assigned is
//! legal: it can only be `previous + previous[0]`.
//!
//! Wire form: `LZ:` followed by base64 of the codes as LEB128 varints.
//! Works on UTF-8 bytes, so any `&str` round-trips.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;

use super::Compressor;
use crate::error::{Result, VaultError};

pub const DICTIONARY_TAG: &str = "LZ:";

const SEED_ENTRIES: u32 = 256;

#[derive(Debug, Default, Clone, Copy)]
pub struct DictionaryCompressor;

impl Compressor for DictionaryCompressor {
    fn tag(&self) -> &'static str {
        DICTIONARY_TAG
    }

    fn encode(&self, text: &str) -> Result<String> {
        let codes = compress_bytes(text.as_bytes());
        let mut packed = Vec::with_capacity(codes.len() * 2);
        for code in codes {
            write_varint(code, &mut packed);
        }
        Ok(format!("{}{}", DICTIONARY_TAG, STANDARD.encode(packed)))
    }

    fn decode_bounded(&self, payload: &str, limit: usize) -> Result<String> {
        let body = payload
            .strip_prefix(DICTIONARY_TAG)
            .ok_or_else(|| VaultError::Decompression("missing dictionary tag".to_string()))?;
        let packed = STANDARD
            .decode(body)
            .map_err(|e| VaultError::Decompression(format!("bad base64: {}", e)))?;
        let codes = read_varints(&packed)?;
        let bytes = decompress_codes_bounded(&codes, limit)?;
        String::from_utf8(bytes)
            .map_err(|e| VaultError::Decompression(format!("decoded bytes are not UTF-8: {}", e)))
    }
}

pub fn compress_bytes(input: &[u8]) -> Vec<u32> {
    let Some((&first, rest)) = input.split_first() else {
        return Vec::new();
    };

    // (prefix code, next byte) -> code
    let mut dict: HashMap<(u32, u8), u32> = HashMap::new();
    let mut next_code = SEED_ENTRIES;
    let mut current = u32::from(first);
    let mut codes = Vec::new();

    for &byte in rest {
        match dict.get(&(current, byte)) {
            Some(&code) => current = code,
            None => {
                codes.push(current);
                dict.insert((current, byte), next_code);
                next_code += 1;
                current = u32::from(byte);
            }
        }
    }
    codes.push(current);
    codes
}

pub fn decompress_codes(codes: &[u32]) -> Result<Vec<u8>> {
    decompress_codes_bounded(codes, usize::MAX)
}

/// Output can grow quadratically in the code count, so `limit` is enforced
/// per step rather than on the finished buffer.
pub fn decompress_codes_bounded(codes: &[u32], limit: usize) -> Result<Vec<u8>> {
    let Some((&first, rest)) = codes.split_first() else {
        return Ok(Vec::new());
    };
    if first >= SEED_ENTRIES {
        return Err(VaultError::Decompression(format!(
            "first code {} is not a seed entry",
            first
        )));
    }

    let mut dict: Vec<Vec<u8>> = (0..=u8::MAX).map(|b| vec![b]).collect();
    let mut out = Vec::new();
    let mut prev = dict[first as usize].clone();
    out.extend_from_slice(&prev);

    for &code in rest {
        let code = code as usize;
        let entry = if code < dict.len() {
            dict[code].clone()
        } else if code == dict.len() {
            // next-slot case: the entry being defined by this very step
            let mut entry = prev.clone();
            entry.push(prev[0]);
            entry
        } else {
            return Err(VaultError::Decompression(format!(
                "code {} beyond dictionary size {}",
                code,
                dict.len()
            )));
        };

        if out.len() + entry.len() > limit {
            return Err(VaultError::Decompression(format!(
                "dictionary output exceeds limit of {} bytes",
                limit
            )));
        }
        out.extend_from_slice(&entry);
        let mut added = prev;
        added.push(entry[0]);
        dict.push(added);
        prev = entry;
    }

    Ok(out)
}

fn write_varint(mut value: u32, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varints(bytes: &[u8]) -> Result<Vec<u32>> {
    let mut values = Vec::new();
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut pending = false;

    for &byte in bytes {
        if shift > 28 {
            return Err(VaultError::Decompression("varint overflow".to_string()));
        }
        value |= u32::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            values.push(value);
            value = 0;
            shift = 0;
            pending = false;
        } else {
            shift += 7;
            pending = true;
        }
    }

    if pending {
        return Err(VaultError::Decompression("truncated varint".to_string()));
    }
    Ok(values)
}
