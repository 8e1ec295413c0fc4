//! # Persistence Engine
//!
//! [`NoteVault`] is the single entry point for reading and writing notes. It
//! owns its [`StorageMedium`] and is the only writer of every key it uses.
//!
//! ## Write Path
//!
//! ```text
//! save_notes(notes)
//!   1. validate every note + id uniqueness     (nothing written on failure)
//!   2. quota check                             (prunes backups under pressure)
//!   3. snapshot current envelope -> backup
//!   4. abort with QuotaExceeded if critical    (the backup is already safe)
//!   5. seal envelope {notes, version, savedAt, checksum}
//!   6. smart_compress, write data + meta
//!   7. prune backups to max_backups
//! ```
//!
//! If step 6 fails, the previous envelope is restored from the latest backup
//! and the write is retried once. Only when that also fails does the caller
//! see [`VaultError::Save`].
//!
//! ## Read Path
//!
//! ```text
//! load_notes()
//!   no data          -> empty collection
//!   decode (meta cross-checked) -> parse -> shape -> checksum
//!   stale version    -> migrate, re-save
//!   any integrity failure -> recovery chain (see [`recovery`])
//! ```
//!
//! A load never fails because of what is stored: the worst case is an empty
//! collection. Medium I/O failures and migration failures are surfaced.
//!
//! ## Concurrency
//!
//! The medium sits behind a mutex that every public operation holds for its
//! whole duration, so one vault can be shared across threads and two saves
//! can never interleave.

use chrono::Utc;
use serde::Serialize;
use std::sync::Mutex;
use uuid::Uuid;

use crate::codec::Codec;
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::medium::{QuotaEstimate, StorageMedium};
use crate::model::Note;

pub mod backup;
pub mod engine;
pub mod quota;
pub mod recovery;

pub use backup::BackupSummary;
pub use engine::Session;
pub use quota::QuotaStatus;

/// Keys a vault writes, derived from the configured namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub data: String,
    pub meta: String,
    pub backups: String,
    backup_prefix: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            data: format!("{}_data", namespace),
            meta: format!("{}_meta", namespace),
            backups: format!("{}_backups", namespace),
            backup_prefix: format!("{}_backup_", namespace),
        }
    }

    pub fn new_backup_key(&self) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!(
            "{}{}_{}",
            self.backup_prefix,
            Utc::now().timestamp_millis(),
            &nonce[..8]
        )
    }

    pub fn is_backup_key(&self, key: &str) -> bool {
        key.starts_with(&self.backup_prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub notes_count: usize,
    /// Envelope plus metadata, in bytes.
    pub data_size: usize,
    pub backup_count: usize,
    pub backup_size: usize,
    pub total_size: usize,
    pub compressed: bool,
    pub quota: Option<QuotaEstimate>,
    pub usage_percentage: Option<f64>,
}

/// The note store. Construct once and share by reference.
pub struct NoteVault<M: StorageMedium> {
    medium: Mutex<M>,
    config: VaultConfig,
    codec: Codec,
    keys: StorageKeys,
}

impl<M: StorageMedium> NoteVault<M> {
    pub fn new(medium: M, config: VaultConfig) -> Self {
        Self {
            codec: Codec::from_config(&config),
            keys: StorageKeys::new(&config.namespace),
            medium: Mutex::new(medium),
            config,
        }
    }

    pub fn with_medium(medium: M) -> Self {
        Self::new(medium, VaultConfig::default())
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session<'_, M>) -> Result<R>) -> Result<R> {
        let mut guard = self
            .medium
            .lock()
            .map_err(|_| VaultError::Store("vault lock poisoned".to_string()))?;
        let mut session = Session {
            medium: &mut *guard,
            config: &self.config,
            codec: &self.codec,
            keys: &self.keys,
        };
        f(&mut session)
    }

    /// Direct access to the medium, under the vault lock.
    pub fn with_medium_mut<R>(&self, f: impl FnOnce(&mut M) -> R) -> Result<R> {
        let mut guard = self
            .medium
            .lock()
            .map_err(|_| VaultError::Store("vault lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }

    pub fn into_medium(self) -> Result<M> {
        self.medium
            .into_inner()
            .map_err(|_| VaultError::Store("vault lock poisoned".to_string()))
    }

    /// Replaces the stored collection with `notes`.
    pub fn save_notes(&self, notes: Vec<Note>) -> Result<()> {
        self.with_session(|s| s.save(notes))
    }

    /// Inserts `note`, or replaces the stored note with the same id.
    pub fn save_note(&self, note: Note) -> Result<()> {
        self.with_session(|s| {
            let mut notes = s.load()?;
            match notes.iter_mut().find(|n| n.id == note.id) {
                Some(existing) => *existing = note,
                None => notes.push(note),
            }
            s.save(notes)
        })
    }

    pub fn load_notes(&self) -> Result<Vec<Note>> {
        self.with_session(|s| s.load())
    }

    /// Removes the note with `id` and returns it. Nothing is written if it is absent.
    pub fn delete_note(&self, id: &Uuid) -> Result<Note> {
        self.with_session(|s| {
            let mut notes = s.load()?;
            let pos = notes
                .iter()
                .position(|n| n.id == *id)
                .ok_or(VaultError::NoteNotFound(*id))?;
            let removed = notes.remove(pos);
            s.save(notes)?;
            Ok(removed)
        })
    }

    /// Removes the envelope, its metadata and every backup.
    pub fn clear_all(&self) -> Result<()> {
        self.with_session(|s| {
            for key in s.read_index() {
                s.medium.remove(&key)?;
            }
            s.medium.remove(&s.keys.backups)?;
            s.medium.remove(&s.keys.meta)?;
            s.medium.remove(&s.keys.data)?;
            log::info!("Cleared all notes and backups");
            Ok(())
        })
    }

    pub fn storage_info(&self) -> Result<StorageInfo> {
        self.with_session(|s| {
            let notes_count = s.load()?.len();
            let data = s.medium.get(&s.keys.data)?.unwrap_or_default();
            let meta = s.medium.get(&s.keys.meta)?.unwrap_or_default();
            let backups = s.list_backups()?;
            let backup_size: usize = backups.iter().map(|b| b.size).sum();
            let data_size = data.len() + meta.len();
            let quota = s.medium.estimate()?;

            Ok(StorageInfo {
                notes_count,
                data_size,
                backup_count: backups.len(),
                backup_size,
                total_size: data_size + backup_size,
                compressed: crate::codec::is_compressed(&data),
                usage_percentage: quota.map(|q| q.usage_fraction() * 100.0),
                quota,
            })
        })
    }

    /// Copies the current envelope into a new backup. Returns its key, or
    /// None when nothing is stored yet.
    pub fn snapshot(&self) -> Result<Option<String>> {
        self.with_session(|s| s.snapshot())
    }

    /// Restores the newest valid backup into the primary slot.
    pub fn restore_latest(&self) -> Result<Option<Vec<Note>>> {
        self.with_session(|s| s.restore_latest())
    }

    /// Drops the oldest backups until at most `max` remain. Returns how many went.
    pub fn prune_backups(&self, max: usize) -> Result<usize> {
        self.with_session(|s| s.prune(max))
    }

    pub fn list_backups(&self) -> Result<Vec<BackupSummary>> {
        self.with_session(|s| s.list_backups())
    }

    pub fn check_quota(&self) -> Result<QuotaStatus> {
        self.with_session(|s| s.check_quota())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemMedium;
    use std::sync::Arc;

    fn vault() -> NoteVault<MemMedium> {
        NoteVault::with_medium(MemMedium::new())
    }

    #[test]
    fn test_keys_follow_namespace() {
        let keys = StorageKeys::new("work");
        assert_eq!(keys.data, "work_data");
        assert_eq!(keys.meta, "work_meta");
        assert_eq!(keys.backups, "work_backups");

        let a = keys.new_backup_key();
        let b = keys.new_backup_key();
        assert!(keys.is_backup_key(&a));
        assert_ne!(a, b);
        assert!(!keys.is_backup_key("notes_backup_1"));
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        assert!(vault().load_notes().unwrap().is_empty());
    }

    #[test]
    fn test_save_note_upserts_by_id() {
        let v = vault();
        let mut note = Note::new("First", "v1");
        v.save_note(note.clone()).unwrap();
        v.save_note(Note::new("Second", "")).unwrap();

        note.content = "v2".into();
        v.save_note(note.clone()).unwrap();

        let notes = v.load_notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, note.id);
        assert_eq!(notes[0].content, "v2");
    }

    #[test]
    fn test_delete_returns_removed_note() {
        let v = vault();
        let keep = Note::new("Keep", "");
        let drop = Note::new("Drop", "");
        v.save_notes(vec![keep.clone(), drop.clone()]).unwrap();

        let removed = v.delete_note(&drop.id).unwrap();
        assert_eq!(removed.title, "Drop");
        let notes = v.load_notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, keep.id);
    }

    #[test]
    fn test_clear_all_removes_everything() {
        let v = vault();
        for i in 0..3 {
            v.save_notes(vec![Note::new(format!("n{}", i), "")]).unwrap();
        }
        assert_eq!(v.list_backups().unwrap().len(), 2);

        v.clear_all().unwrap();
        assert!(v.load_notes().unwrap().is_empty());
        assert!(v.list_backups().unwrap().is_empty());
        assert!(v.with_medium_mut(|m| m.is_empty()).unwrap());
    }

    #[test]
    fn test_storage_info() {
        let v = NoteVault::with_medium(MemMedium::with_capacity(1_000_000));
        v.save_notes(vec![Note::new("A", "alpha")]).unwrap();
        v.save_notes(vec![Note::new("A", "alpha"), Note::new("B", "beta")])
            .unwrap();

        let info = v.storage_info().unwrap();
        assert_eq!(info.notes_count, 2);
        assert_eq!(info.backup_count, 1);
        assert!(info.data_size > 0);
        assert!(info.backup_size > 0);
        assert_eq!(info.total_size, info.data_size + info.backup_size);
        assert!(!info.compressed);
        let pct = info.usage_percentage.unwrap();
        assert!(pct > 0.0 && pct < 1.0);
    }

    #[test]
    fn test_storage_info_reports_compression() {
        let v = vault();
        v.save_notes(vec![Note::new("Big", "same words again ".repeat(500))])
            .unwrap();
        let info = v.storage_info().unwrap();
        assert!(info.compressed);
        assert_eq!(info.quota, None);
        assert_eq!(info.usage_percentage, None);
    }

    #[test]
    fn test_vault_is_shareable_across_threads() {
        let v = Arc::new(vault());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let v = Arc::clone(&v);
                std::thread::spawn(move || {
                    v.save_note(Note::new(format!("thread {}", i), "")).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(v.load_notes().unwrap().len(), 8);
    }
}
