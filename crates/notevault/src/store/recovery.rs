//! # Recovery Chain
//!
//! When the primary envelope fails an integrity check, recovery tries each
//! tier in turn and stops at the first that yields notes:
//!
//! | Tier | Source | Writes |
//! |------|--------|--------|
//! | 1 | Newest backup that decodes cleanly | primary slot |
//! | 2 | Notes salvaged from the damaged envelope text | nothing |
//! | 3 | Empty collection | nothing |
//!
//! Tier 2 scans for the `"notes"` array and parses each complete element on
//! its own, so a truncated or partly garbled envelope still gives back every
//! note that survived intact. Salvaged notes are not persisted until the
//! next save.

use serde_json::Value;
use std::collections::HashSet;

use super::engine::Session;
use crate::medium::StorageMedium;
use crate::model::Note;

impl<M: StorageMedium> Session<'_, M> {
    /// Never fails: the last tier is an empty collection.
    pub fn recover(&mut self, damaged: &str) -> Vec<Note> {
        match self.restore_latest() {
            Ok(Some(notes)) => return notes,
            Ok(None) => log::warn!("No valid backup to restore from"),
            Err(e) => log::warn!("Restoring from backup failed: {}", e),
        }

        let text = self
            .codec
            .decode(damaged)
            .unwrap_or_else(|_| damaged.to_string());
        if let Some(notes) = salvage_notes(&text) {
            log::warn!("Salvaged {} notes from damaged envelope", notes.len());
            return notes;
        }

        log::error!("Recovery exhausted, continuing with no notes");
        Vec::new()
    }
}

/// Extracts every intact note from the `"notes"` array in `text`.
///
/// Returns None when no note could be salvaged.
pub fn salvage_notes(text: &str) -> Option<Vec<Note>> {
    let mut seen = HashSet::new();
    let notes: Vec<Note> = note_elements(text)
        .into_iter()
        .filter_map(|raw| serde_json::from_str::<Value>(raw).ok())
        .filter_map(|value| serde_json::from_value::<Note>(value).ok())
        .filter(|note| seen.insert(note.id))
        .collect();

    if notes.is_empty() {
        None
    } else {
        Some(notes)
    }
}

/// Slices of `text` holding the complete objects directly inside the first
/// `"notes": [ ... ]` array. Unterminated trailing elements are dropped.
fn note_elements(text: &str) -> Vec<&str> {
    let Some(start) = find_notes_array(text) else {
        return Vec::new();
    };

    let mut elements = Vec::new();
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut element_start = None;

    for (offset, c) in text[start..].char_indices() {
        let pos = start + offset;
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => {
                if depth == 1 && c == '{' {
                    element_start = Some(pos);
                }
                depth += 1;
            }
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                if depth == 1 && c == '}' {
                    if let Some(begin) = element_start.take() {
                        elements.push(&text[begin..=pos]);
                    }
                }
            }
            _ => {}
        }
    }
    elements
}

/// Byte offset just past the `[` that opens the notes array.
fn find_notes_array(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = text[from..].find("\"notes\"") {
        let after_key = from + found + "\"notes\"".len();
        let rest = text[after_key..].trim_start();
        if let Some(rest) = rest.strip_prefix(':') {
            let rest_trimmed = rest.trim_start();
            if rest_trimmed.starts_with('[') {
                return Some(text.len() - rest_trimmed.len() + 1);
            }
        }
        from = after_key;
    }
    None
}
