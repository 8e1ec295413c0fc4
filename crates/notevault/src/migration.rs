//! # Schema Migration
//!
//! Envelopes written by older clients are upgraded in place before they are
//! deserialized. Migration runs on the untyped JSON form because an old
//! envelope is, by definition, not guaranteed to fit the current types.
//!
//! ## Versions
//!
//! | From | To | Change |
//! |------|----|--------|
//! | (absent), `1.0` | `1.1` | Backfill `id`, timestamps and `metadata.wordCount` / `readingTime` |
//! | `1.1` | `2.0` | Normalize `tags`, default `isPinned` / `isArchived` / `category` |
//!
//! Every step only adds or normalizes, and running it twice is the same as
//! running it once. An envelope already at [`CURRENT_VERSION`] is returned
//! untouched. An unknown version is logged and stamped current, leaving the
//! notes to typed deserialization.

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::model::{self, CURRENT_VERSION};

/// Version assumed when an envelope has no `version` field.
pub const LEGACY_VERSION: &str = "1.0";

pub fn envelope_version(envelope: &Value) -> &str {
    envelope
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or(LEGACY_VERSION)
}

pub fn needs_migration(envelope: &Value) -> bool {
    envelope_version(envelope) != CURRENT_VERSION
}

pub fn migrate(mut envelope: Value) -> Result<Value> {
    let from = envelope_version(&envelope).to_string();
    if from == CURRENT_VERSION {
        return Ok(envelope);
    }

    let fail = |reason: &str| VaultError::Migration {
        from: from.clone(),
        reason: reason.to_string(),
    };

    let saved_at = envelope
        .get("savedAt")
        .and_then(Value::as_str)
        .map(str::to_string);

    let obj = envelope
        .as_object_mut()
        .ok_or_else(|| fail("envelope is not an object"))?;
    let notes = obj
        .get_mut("notes")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| fail("envelope has no notes array"))?;

    let mut version = from.clone();
    loop {
        match version.as_str() {
            "1.0" => {
                for note in notes.iter_mut() {
                    let note = note
                        .as_object_mut()
                        .ok_or_else(|| fail("note is not an object"))?;
                    backfill_identity(note, saved_at.as_deref());
                    backfill_metadata(note);
                }
                version = "1.1".to_string();
            }
            "1.1" => {
                for note in notes.iter_mut() {
                    let note = note
                        .as_object_mut()
                        .ok_or_else(|| fail("note is not an object"))?;
                    normalize_flags(note);
                }
                version = CURRENT_VERSION.to_string();
            }
            v if v == CURRENT_VERSION => break,
            unknown => {
                log::warn!(
                    "Unknown envelope version '{}', passing notes through unchanged",
                    unknown
                );
                break;
            }
        }
    }

    log::info!(
        "Migrated {} notes from version {} to {}",
        notes.len(),
        from,
        CURRENT_VERSION
    );
    obj.insert(
        "version".to_string(),
        Value::String(CURRENT_VERSION.to_string()),
    );
    Ok(envelope)
}

fn backfill_identity(note: &mut Map<String, Value>, saved_at: Option<&str>) {
    if !note.get("id").is_some_and(Value::is_string) {
        note.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    if !note.get("createdAt").is_some_and(Value::is_string) {
        let stamp = saved_at
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        note.insert("createdAt".into(), Value::String(stamp));
    }
    if !note.get("updatedAt").is_some_and(Value::is_string) {
        let created = note["createdAt"].clone();
        note.insert("updatedAt".into(), created);
    }
}

fn backfill_metadata(note: &mut Map<String, Value>) {
    let words = model::word_count(note.get("content").and_then(Value::as_str).unwrap_or(""));

    if !note.get("metadata").is_some_and(Value::is_object) {
        note.insert("metadata".into(), Value::Object(Map::new()));
    }
    if let Some(meta) = note.get_mut("metadata").and_then(Value::as_object_mut) {
        meta.entry("wordCount").or_insert_with(|| words.into());
        meta.entry("readingTime")
            .or_insert_with(|| model::reading_time(words).into());
        meta.entry("version").or_insert_with(|| Value::from(1u32));
    }
}

fn normalize_flags(note: &mut Map<String, Value>) {
    let tags = match note.get("tags") {
        Some(Value::Array(raw)) => {
            let mut seen = HashSet::new();
            raw.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
                .map(|t| Value::String(t.to_string()))
                .collect()
        }
        _ => Vec::new(),
    };
    note.insert("tags".into(), Value::Array(tags));

    for flag in ["isPinned", "isArchived"] {
        if !note.get(flag).is_some_and(Value::is_boolean) {
            note.insert(flag.into(), Value::Bool(false));
        }
    }
    note.entry("category").or_insert(Value::Null);
}
