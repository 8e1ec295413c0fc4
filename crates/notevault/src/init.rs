//! # Composition Root
//!
//! [`open`] is the one place a production vault is assembled: it resolves
//! the data directory, loads configuration and wires a [`FsMedium`] into a
//! [`NoteVault`]. Everything below it takes its collaborators as arguments.
//!
//! ## Data Directory Resolution
//!
//! 1. `data_override`, when the caller passes one (the CLI's `--data`).
//! 2. The `NOTEVAULT_DATA` environment variable, mainly so tests can isolate state.
//! 3. The OS data directory from [`directories::ProjectDirs`].
//!
//! ## Configuration
//!
//! `notevault.toml` is searched for in the data directory. A missing or
//! unreadable file falls back to [`VaultConfig::default`]; a vault is never
//! refused because of its configuration.

use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;
use std::path::PathBuf;

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::medium::FsMedium;
use crate::store::NoteVault;

pub const DATA_ENV_VAR: &str = "NOTEVAULT_DATA";
pub const CONFIG_FILE: &str = "notevault.toml";

pub struct VaultContext {
    pub vault: NoteVault<FsMedium>,
    pub data_dir: PathBuf,
    pub config: VaultConfig,
}

pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DATA_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("com", "notevault", "notevault")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| VaultError::Store("Could not determine a data directory".to_string()))
}

pub fn load_config(data_dir: &std::path::Path) -> VaultConfig {
    Clapfig::builder()
        .app_name("notevault")
        .file_name(CONFIG_FILE)
        .search_paths(vec![SearchPath::Path(data_dir.to_path_buf())])
        .search_mode(SearchMode::Merge)
        .load()
        .unwrap_or_else(|e| {
            log::warn!("Could not load {}, using defaults: {}", CONFIG_FILE, e);
            VaultConfig::default()
        })
}

/// Opens the vault stored under the resolved data directory.
pub fn open(data_override: Option<PathBuf>) -> Result<VaultContext> {
    let data_dir = resolve_data_dir(data_override)?;
    let config = load_config(&data_dir);
    log::debug!(
        "Opening vault in {} (namespace '{}')",
        data_dir.display(),
        config.namespace
    );

    let medium = FsMedium::new(data_dir.clone()).with_capacity(config.capacity_bytes);
    let vault = NoteVault::new(medium, config.clone());

    Ok(VaultContext {
        vault,
        data_dir,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Note;
    use tempfile::TempDir;

    #[test]
    fn test_open_with_data_override() {
        let dir = TempDir::new().unwrap();
        let ctx = open(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(ctx.data_dir, dir.path());
        assert_eq!(ctx.config, VaultConfig::default());

        ctx.vault.save_notes(vec![Note::new("On disk", "")]).unwrap();
        assert!(dir.path().join("notes_data.dat").exists());
        assert!(dir.path().join("notes_meta.dat").exists());
    }

    #[test]
    fn test_open_reads_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "max_backups = 2\nnamespace = \"journal\"\n",
        )
        .unwrap();

        let ctx = open(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(ctx.config.max_backups, 2);
        assert_eq!(ctx.vault.keys().data, "journal_data");
    }

    #[test]
    fn test_reopen_sees_previous_notes() {
        let dir = TempDir::new().unwrap();
        let note = Note::new("Persistent", "survives a restart");
        open(Some(dir.path().to_path_buf()))
            .unwrap()
            .vault
            .save_notes(vec![note.clone()])
            .unwrap();

        let ctx = open(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(ctx.vault.load_notes().unwrap(), vec![note]);
    }
}
