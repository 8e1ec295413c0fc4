//! # Rotating Backups
//!
//! Before every write the current envelope is copied, byte for byte, into a
//! [`BackupRecord`] under its own key. The index key lists backup keys oldest
//! first, so the newest is always last.
//!
//! ```text
//! notes_backups = ["notes_backup_1700000000000_1a2b3c4d", "notes_backup_…"]
//!                   ^ pruned first                        ^ restored first
//! ```
//!
//! A backup is only ever restored after it passes the same integrity checks
//! as the primary slot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::engine::Session;
use crate::error::Result;
use crate::medium::StorageMedium;
use crate::migration;
use crate::model::{BackupRecord, Note};

/// A backup as listed to callers, without its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub compressed: bool,
    /// Stored size of the whole record, in bytes.
    pub size: usize,
}

impl<M: StorageMedium> Session<'_, M> {
    /// Backup keys, oldest first. An unreadable index reads as empty.
    pub fn read_index(&self) -> Vec<String> {
        let raw = match self.medium.get(&self.keys.backups) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Could not read backup index: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Backup index is corrupt, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write_index(&mut self, index: &[String]) -> Result<()> {
        let raw = serde_json::to_string(index)?;
        self.medium.set(&self.keys.backups, &raw)
    }

    fn read_record(&self, key: &str) -> Option<BackupRecord> {
        match self.medium.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Backup {} is unreadable: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                log::warn!("Backup {} is listed but missing", key);
                None
            }
            Err(e) => {
                log::warn!("Could not read backup {}: {}", key, e);
                None
            }
        }
    }

    pub fn snapshot(&mut self) -> Result<Option<String>> {
        let Some(data) = self.medium.get(&self.keys.data)? else {
            return Ok(None);
        };

        let meta = self.primary_meta(&data);
        let version = self
            .codec
            .decode(&data)
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
            .map(|env| migration::envelope_version(&env).to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let key = self.keys.new_backup_key();
        let record = BackupRecord {
            data,
            meta,
            created_at: Utc::now(),
            version,
        };
        self.medium.set(&key, &serde_json::to_string(&record)?)?;

        let mut index = self.read_index();
        index.push(key.clone());
        if let Err(e) = self.write_index(&index) {
            let _ = self.medium.remove(&key);
            return Err(e);
        }

        log::debug!("Created backup {}", key);
        Ok(Some(key))
    }

    /// Walks backups newest first and restores the first one that decodes
    /// cleanly into the primary slot.
    pub fn restore_latest(&mut self) -> Result<Option<Vec<Note>>> {
        let index = self.read_index();
        for key in index.iter().rev() {
            let Some(record) = self.read_record(key) else {
                continue;
            };
            match self.decode_envelope(&record.data, Some(&record.meta)) {
                Ok(decoded) => {
                    let meta = serde_json::to_string(&record.meta)?;
                    self.medium.set(&self.keys.data, &record.data)?;
                    self.medium.set(&self.keys.meta, &meta)?;
                    log::info!(
                        "Restored {} notes from backup {}",
                        decoded.notes.len(),
                        key
                    );
                    return Ok(Some(decoded.notes));
                }
                Err(e) => log::warn!("Skipping backup {}: {}", key, e),
            }
        }
        Ok(None)
    }

    /// Drops the oldest backups until at most `max` remain.
    pub fn prune(&mut self, max: usize) -> Result<usize> {
        let mut index = self.read_index();
        if index.len() <= max {
            return Ok(0);
        }
        let excess = index.len() - max;
        for key in index.drain(..excess) {
            self.medium.remove(&key)?;
        }
        self.write_index(&index)?;
        log::debug!("Pruned {} old backups", excess);
        Ok(excess)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupSummary>> {
        let mut summaries = Vec::new();
        for key in self.read_index() {
            let Some(raw) = self.medium.get(&key)? else {
                continue;
            };
            let record: BackupRecord = match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(_) => continue,
            };
            summaries.push(BackupSummary {
                key,
                created_at: record.created_at,
                version: record.version,
                compressed: record.meta.compressed,
                size: raw.len(),
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::VaultError;
    use crate::medium::{MemMedium, StorageMedium};
    use crate::model::{Note, CURRENT_VERSION};
    use crate::store::NoteVault;

    fn vault() -> NoteVault<MemMedium> {
        NoteVault::with_medium(MemMedium::new())
    }

    fn index(v: &NoteVault<MemMedium>) -> Vec<String> {
        let raw = v
            .with_medium_mut(|m| m.get("notes_backups"))
            .unwrap()
            .unwrap()
            .unwrap_or_else(|| "[]".to_string());
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_first_save_has_nothing_to_back_up() {
        let v = vault();
        assert_eq!(v.snapshot().unwrap(), None);
        v.save_notes(vec![Note::new("a", "")]).unwrap();
        assert!(v.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_copies_primary_verbatim() {
        let v = vault();
        v.save_notes(vec![Note::new("a", "")]).unwrap();
        let key = v.snapshot().unwrap().unwrap();

        let (data, record) = v
            .with_medium_mut(|m| (m.get("notes_data").unwrap(), m.get(&key).unwrap()))
            .unwrap();
        let record: crate::model::BackupRecord =
            serde_json::from_str(&record.unwrap()).unwrap();
        assert_eq!(Some(record.data), data);
        assert_eq!(record.version, CURRENT_VERSION);
        assert_eq!(index(&v), vec![key]);
    }

    #[test]
    fn test_retention_keeps_newest() {
        let v = vault();
        for i in 0..9 {
            v.save_notes(vec![Note::new(format!("n{}", i), "")]).unwrap();
        }
        let backups = v.list_backups().unwrap();
        assert_eq!(backups.len(), 5);
        assert!(backups.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        // Pruned records are gone from the medium too
        let stored = v
            .with_medium_mut(|m| {
                m.keys()
                    .into_iter()
                    .filter(|k| k.starts_with("notes_backup_"))
                    .count()
            })
            .unwrap();
        assert_eq!(stored, 5);
    }

    #[test]
    fn test_prune_to_explicit_count() {
        let v = vault();
        for i in 0..4 {
            v.save_notes(vec![Note::new(format!("n{}", i), "")]).unwrap();
        }
        assert_eq!(v.prune_backups(1).unwrap(), 2);
        assert_eq!(v.prune_backups(1).unwrap(), 0);
        assert_eq!(v.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_restore_latest_skips_damaged_backups() {
        let v = vault();
        v.save_notes(vec![Note::new("one", "")]).unwrap();
        v.save_notes(vec![Note::new("two", "")]).unwrap();
        v.save_notes(vec![Note::new("three", "")]).unwrap();

        // Newest backup holds "two"; break it
        let newest = index(&v).last().unwrap().clone();
        v.with_medium_mut(|m| m.set(&newest, "garbage"))
            .unwrap()
            .unwrap();

        let restored = v.restore_latest().unwrap().unwrap();
        assert_eq!(restored[0].title, "one");
        assert_eq!(v.load_notes().unwrap()[0].title, "one");
    }

    #[test]
    fn test_restore_with_no_backups() {
        let v = vault();
        v.save_notes(vec![Note::new("only", "")]).unwrap();
        assert_eq!(v.restore_latest().unwrap(), None);
    }

    #[test]
    fn test_corrupt_index_reads_empty() {
        let v = vault();
        v.save_notes(vec![Note::new("a", "")]).unwrap();
        v.with_medium_mut(|m| m.set("notes_backups", "{oops"))
            .unwrap()
            .unwrap();
        assert!(v.list_backups().unwrap().is_empty());

        // The next save starts a fresh index
        v.save_notes(vec![Note::new("b", "")]).unwrap();
        assert_eq!(v.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_index_write_removes_orphan_record() {
        let v = vault();
        v.save_notes(vec![Note::new("a", "")]).unwrap();
        v.with_medium_mut(|m| m.fail_writes_to("notes_backups", 1))
            .unwrap();

        assert!(v.snapshot().is_err());
        let keys = v.with_medium_mut(|m| m.keys()).unwrap();
        assert!(!keys.iter().any(|k| k.starts_with("notes_backup_")));
    }

    #[test]
    fn test_snapshot_failure_aborts_save() {
        let v = vault();
        v.save_notes(vec![Note::new("a", "")]).unwrap();
        v.with_medium_mut(|m| m.fail_writes_to("notes_backups", 1))
            .unwrap();

        let err = v.save_notes(vec![Note::new("b", "")]).unwrap_err();
        assert!(matches!(err, VaultError::Save(_)));
        assert_eq!(v.load_notes().unwrap()[0].title, "a");
    }
}
