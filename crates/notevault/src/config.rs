//! # Configuration
//!
//! Vault configuration is loaded by [`clapfig`] (see [`crate::init`]), which
//! layers a `notevault.toml` in the data directory and `NOTEVAULT__*`
//! environment variables over the compiled defaults below.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `max_backups` | `5` | Backup records retained |
//! | `compression_threshold` | `1024` | Payloads at or below this many chars are never compressed |
//! | `native_compression` | `true` | Use gzip; `false` selects the dictionary coder |
//! | `namespace` | `notes` | Prefix of every key written to the medium |
//! | `quota_high_water` | `0.8` | Usage fraction that triggers backup pruning |
//! | `quota_critical` | `0.9` | Usage fraction at which saves are refused |
//! | `capacity_bytes` | unset | Capacity reported by the directory medium |
//!
//! The settings are fixed for the lifetime of a [`crate::store::NoteVault`].

use confique::Config;
use serde::{Deserialize, Serialize};

/// Configuration for a vault, stored in `notevault.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VaultConfig {
    /// Number of backup records kept; older ones are pruned after each save.
    #[config(default = 5)]
    pub max_backups: usize,

    /// Envelopes at or below this many characters are stored uncompressed.
    #[config(default = 1024)]
    pub compression_threshold: usize,

    /// Prefer the gzip codec over the dictionary coder.
    #[config(default = true)]
    pub native_compression: bool,

    /// Key prefix, so several vaults can share one medium.
    #[config(default = "notes")]
    pub namespace: String,

    #[config(default = 0.8)]
    pub quota_high_water: f64,

    #[config(default = 0.9)]
    pub quota_critical: f64,

    /// Capacity reported by the directory medium. Unset means unlimited.
    pub capacity_bytes: Option<u64>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_backups: 5,
            compression_threshold: 1024,
            native_compression: true,
            namespace: "notes".to_string(),
            quota_high_water: 0.8,
            quota_critical: 0.9,
            capacity_bytes: None,
        }
    }
}

impl VaultConfig {
    /// Retention target used when usage crosses the high-water mark.
    pub fn pressure_retention(&self) -> usize {
        self.max_backups.div_ceil(2).max(1)
    }
}
