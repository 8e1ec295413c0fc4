//! Save and load flows over a locked medium.
//!
//! A [`Session`] borrows the medium for the duration of one vault operation.
//! The backup, recovery and quota flows extend it in their own modules.

use serde_json::Value;
use std::collections::HashSet;

use super::StorageKeys;
use crate::checksum;
use crate::codec::{self, Codec, Encoded};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::medium::StorageMedium;
use crate::migration;
use crate::model::{EncodingMeta, Envelope, Note};
use crate::validation::{ValidationIssue, ValidationReport};

pub struct Session<'a, M: StorageMedium> {
    pub medium: &'a mut M,
    pub config: &'a VaultConfig,
    pub codec: &'a Codec,
    pub keys: &'a StorageKeys,
}

/// An envelope that passed every integrity check.
#[derive(Debug)]
pub struct Decoded {
    pub notes: Vec<Note>,
    /// Set when the envelope was written at an older version.
    pub migrated_from: Option<String>,
}

impl<M: StorageMedium> Session<'_, M> {
    pub fn save(&mut self, mut notes: Vec<Note>) -> Result<()> {
        for note in notes.iter_mut() {
            note.metadata.refresh(&note.content);
        }
        validate_collection(&notes)?;

        let status = self.check_quota()?;

        self.snapshot()
            .map_err(|e| VaultError::Save(format!("pre-write backup failed: {}", e)))?;

        if let Some(q) = status.critical() {
            log::warn!(
                "Storage at {:.1}% of capacity, refusing to write",
                q.usage_fraction() * 100.0
            );
            return Err(VaultError::QuotaExceeded {
                usage: q.usage,
                limit: q.limit,
            });
        }

        let count = notes.len();
        let envelope = Envelope::seal(notes)?;
        let text = serde_json::to_string(&envelope)?;
        let encoded = self.codec.smart_compress(&text);

        if let Err(first) = self.write_primary(&encoded) {
            log::warn!("Write failed ({}), restoring previous envelope", first);
            match self.restore_latest() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(VaultError::Save(format!(
                        "{}; no backup available to recover from",
                        first
                    )))
                }
                Err(e) => {
                    return Err(VaultError::Save(format!(
                        "{}; recovery failed: {}",
                        first, e
                    )))
                }
            }
            self.write_primary(&encoded).map_err(|retry| {
                VaultError::Save(format!("{}; retry after recovery failed: {}", first, retry))
            })?;
        }

        self.prune(self.config.max_backups)?;
        log::debug!(
            "Saved {} notes ({} bytes, compressed={})",
            count,
            encoded.text.len(),
            encoded.meta.compressed
        );
        Ok(())
    }

    pub fn load(&mut self) -> Result<Vec<Note>> {
        let Some(payload) = self.medium.get(&self.keys.data)? else {
            return Ok(Vec::new());
        };

        let decoded = self
            .read_meta()
            .and_then(|meta| self.decode_envelope(&payload, meta.as_ref()));

        match decoded {
            Ok(Decoded {
                notes,
                migrated_from: Some(from),
            }) => {
                log::info!("Re-saving {} notes migrated from version {}", notes.len(), from);
                if let Err(e) = self.save(notes.clone()) {
                    log::warn!("Could not persist migrated notes: {}", e);
                }
                Ok(notes)
            }
            Ok(decoded) => Ok(decoded.notes),
            Err(e) if e.is_integrity_failure() => {
                log::warn!("Stored notes failed integrity checks: {}", e);
                Ok(self.recover(&payload))
            }
            Err(e) => Err(e),
        }
    }

    /// Reads the encoding sidecar. A missing sidecar is not an error.
    pub fn read_meta(&self) -> Result<Option<EncodingMeta>> {
        match self.medium.get(&self.keys.meta)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn write_primary(&mut self, encoded: &Encoded) -> Result<()> {
        let meta = serde_json::to_string(&encoded.meta)?;
        self.medium.set(&self.keys.data, &encoded.text)?;
        self.medium.set(&self.keys.meta, &meta)?;
        Ok(())
    }

    /// Runs every integrity check on a stored envelope, then migrates it if
    /// it predates [`crate::model::CURRENT_VERSION`].
    ///
    /// Nothing here writes to the medium, so recovery can call it on backup
    /// candidates without recursing.
    pub fn decode_envelope(&self, payload: &str, meta: Option<&EncodingMeta>) -> Result<Decoded> {
        let text = match meta {
            Some(meta) => self.codec.decode_verified(payload, meta)?,
            None => {
                log::warn!("Envelope has no encoding metadata, decoding by tag");
                self.codec.decode(payload)?
            }
        };

        let mut envelope: Value = serde_json::from_str(&text)
            .map_err(|e| VaultError::CorruptedData(format!("envelope is not JSON: {}", e)))?;

        if !envelope.get("notes").is_some_and(Value::is_array) {
            return Err(VaultError::CorruptedData(
                "envelope has no notes array".to_string(),
            ));
        }

        match envelope.get("checksum").and_then(Value::as_str) {
            Some(expected) => {
                let actual = checksum::checksum_value(&envelope["notes"]);
                if actual != expected {
                    return Err(VaultError::ChecksumMismatch {
                        expected: expected.to_string(),
                        actual,
                    });
                }
            }
            None if envelope.get("version").is_some() => {
                return Err(VaultError::CorruptedData(
                    "envelope has no checksum".to_string(),
                ));
            }
            None => log::debug!("Legacy envelope without checksum"),
        }

        if migration::needs_migration(&envelope) {
            let from = migration::envelope_version(&envelope).to_string();
            let mut migrated = migration::migrate(envelope)?;
            let notes = serde_json::from_value(migrated["notes"].take()).map_err(|e| {
                VaultError::Migration {
                    from: from.clone(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(Decoded {
                notes,
                migrated_from: Some(from),
            });
        }

        let notes = serde_json::from_value(envelope["notes"].take())
            .map_err(|e| VaultError::CorruptedData(format!("notes do not deserialize: {}", e)))?;
        Ok(Decoded {
            notes,
            migrated_from: None,
        })
    }

    /// Describes the payload currently in the primary slot, for backups.
    pub fn primary_meta(&self, payload: &str) -> EncodingMeta {
        if let Ok(Some(meta)) = self.read_meta() {
            return meta;
        }
        let original_size = self
            .codec
            .decode(payload)
            .map(|text| text.len())
            .unwrap_or(0);
        EncodingMeta {
            compressed: codec::is_compressed(payload),
            original_size,
        }
    }
}

/// Validates each note and checks ids are unique across the collection.
pub fn validate_collection(notes: &[Note]) -> Result<()> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for note in notes {
        let report = note.validate();
        errors.extend(report.errors);
        if !seen.insert(note.id) {
            errors.push(ValidationIssue::DuplicateId(note.id.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(VaultError::Validation(ValidationReport::from_errors(errors)))
    }
}
