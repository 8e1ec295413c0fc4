//! Envelope checksum.
//!
//! The checksum is a 32-bit rolling hash (`hash * 31 + unit`, wrapping) over
//! the UTF-16 code units of the canonical JSON form of the `notes` array,
//! rendered as eight lowercase hex digits.
//!
//! Canonical form means object keys sorted at every level, no whitespace. It
//! makes the fingerprint independent of struct field order, so the same
//! collection hashes identically whether it was produced from typed [`Note`]s
//! or read back as untyped JSON.
//!
//! This detects accidental corruption only. It is not a MAC and collisions
//! are cheap to construct.

use serde_json::Value;

use crate::error::Result;
use crate::model::Note;

pub fn checksum_notes(notes: &[Note]) -> Result<String> {
    let value = serde_json::to_value(notes)?;
    Ok(checksum_value(&value))
}

pub fn checksum_value(notes: &Value) -> String {
    checksum_str(&canonical_json(notes))
}

pub fn checksum_str(text: &str) -> String {
    let hash = text.encode_utf16().fold(0i32, |hash, unit| {
        (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    });
    format!("{:08x}", hash as u32)
}

/// Serializes `value` with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_values() {
        assert_eq!(checksum_str(""), "00000000");
        // 'a' = 97
        assert_eq!(checksum_str("a"), "00000061");
        // 97 * 31 + 98
        assert_eq!(checksum_str("ab"), format!("{:08x}", 97 * 31 + 98));
    }

    #[test]
    fn test_wraps_to_32_bits() {
        let long = "z".repeat(10_000);
        let sum = checksum_str(&long);
        assert_eq!(sum.len(), 8);
        assert_eq!(sum, checksum_str(&long));
    }

    #[test]
    fn test_hashes_utf16_code_units() {
        // U+1F600 is a surrogate pair in UTF-16
        let expected = {
            let mut hash = 0i32;
            for unit in [0xD83Du16, 0xDE00u16] {
                hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit));
            }
            format!("{:08x}", hash as u32)
        };
        assert_eq!(checksum_str("😀"), expected);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"[{"b":1,"a":{"y":2,"x":[3]}}]"#).unwrap();
        let b: Value = serde_json::from_str(r#"[{"a":{"x":[3],"y":2},"b":1}]"#).unwrap();
        assert_eq!(checksum_value(&a), checksum_value(&b));
        assert_eq!(canonical_json(&a), r#"[{"a":{"x":[3],"y":2},"b":1}]"#);
    }

    #[test]
    fn test_array_order_matters() {
        assert_ne!(
            checksum_value(&json!([{ "title": "A" }, { "title": "B" }])),
            checksum_value(&json!([{ "title": "B" }, { "title": "A" }]))
        );
    }

    #[test]
    fn test_typed_and_untyped_agree() {
        let notes = vec![Note::new("A", "alpha"), Note::new("B", "beta")];
        let typed = checksum_notes(&notes).unwrap();

        let text = serde_json::to_string(&notes).unwrap();
        let untyped: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(typed, checksum_value(&untyped));
    }

    #[test]
    fn test_deterministic_over_time() {
        let notes = vec![Note::new("Same", "content")];
        let first = checksum_notes(&notes).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(first, checksum_notes(&notes).unwrap());
    }

    #[test]
    fn test_detects_single_character_change() {
        let mut notes = vec![Note::new("Title", "content")];
        let before = checksum_notes(&notes).unwrap();
        notes[0].content = "contend".into();
        assert_ne!(before, checksum_notes(&notes).unwrap());
    }
}
