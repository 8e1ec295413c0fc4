//! # Domain Model
//!
//! This module defines the persisted data structures: [`Note`], its derived
//! [`NoteMetadata`], the [`Envelope`] that carries the whole collection, the
//! [`EncodingMeta`] sidecar and the [`BackupRecord`].
//!
//! ## On-Disk Shape
//!
//! Everything is serialized as camelCase JSON so the stored form stays
//! compatible with envelopes written by earlier clients:
//!
//! ```text
//! {
//!   "notes": [ { "id": "…", "title": "…", "isPinned": false, … } ],
//!   "version": "2.0",
//!   "savedAt": "2024-05-01T10:00:00Z",
//!   "checksum": "1a2b3c4d"
//! }
//! ```
//!
//! ## Derived Metadata
//!
//! `wordCount` and `readingTime` are derived from `content` and refreshed by
//! [`Note::touch`]. Unknown metadata keys are kept in [`NoteMetadata::extra`]
//! so a round trip through this crate never drops caller data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::validation::{self, ValidationReport};

/// Schema version written by this crate.
pub const CURRENT_VERSION: &str = "2.0";

/// Reading speed used to derive `readingTime`.
pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    #[serde(default)]
    pub word_count: usize,
    /// Minutes, rounded up.
    #[serde(default)]
    pub reading_time: usize,
    #[serde(default = "default_metadata_version")]
    pub version: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_metadata_version() -> u32 {
    1
}

impl Default for NoteMetadata {
    fn default() -> Self {
        Self {
            word_count: 0,
            reading_time: 0,
            version: default_metadata_version(),
            extra: Map::new(),
        }
    }
}

impl NoteMetadata {
    pub fn for_content(content: &str) -> Self {
        let mut meta = Self::default();
        meta.refresh(content);
        meta
    }

    /// Recomputes the content-derived fields, leaving `version` and `extra` alone.
    pub fn refresh(&mut self, content: &str) {
        self.word_count = word_count(content);
        self.reading_time = reading_time(self.word_count);
    }
}

pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

pub fn reading_time(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: NoteMetadata,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let content = content.into();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            metadata: NoteMetadata::for_content(&content),
            content,
            tags: Vec::new(),
            category: None,
            is_pinned: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Marks the note as modified now and refreshes derived metadata.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.metadata.refresh(&self.content);
    }

    /// Runs the document validator over this note's serialized form.
    pub fn validate(&self) -> ValidationReport {
        match serde_json::to_value(self) {
            Ok(value) => validation::validate(&value),
            Err(e) => {
                ValidationReport::single(validation::ValidationIssue::Malformed(e.to_string()))
            }
        }
    }
}

/// The single persisted unit holding the whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub notes: Vec<Note>,
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
}

impl Envelope {
    /// Builds a current-version envelope, checksumming `notes`.
    pub fn seal(notes: Vec<Note>) -> crate::error::Result<Self> {
        let checksum = crate::checksum::checksum_notes(&notes)?;
        Ok(Self {
            notes,
            version: CURRENT_VERSION.to_string(),
            saved_at: Utc::now(),
            checksum,
        })
    }
}

/// Sidecar describing how the stored envelope text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingMeta {
    pub compressed: bool,
    /// Byte length of the serialized envelope before compression.
    pub original_size: usize,
}

impl EncodingMeta {
    pub fn uncompressed(original_size: usize) -> Self {
        Self {
            compressed: false,
            original_size,
        }
    }
}

/// A retained prior envelope, stored under its own key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Encoded envelope text exactly as it sat in the primary slot.
    pub data: String,
    pub meta: EncodingMeta,
    pub created_at: DateTime<Utc>,
    pub version: String,
}
