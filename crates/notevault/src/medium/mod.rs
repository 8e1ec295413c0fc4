//! # Storage Medium
//!
//! The vault persists into a host-provided key/value medium with a finite
//! capacity. [`StorageMedium`] is the "how" of storage (directory vs memory);
//! [`crate::store::NoteVault`] owns the "what" (envelopes, backups, recovery).
//!
//! Values are UTF-8 text. Compressed payloads are base64 wrapped by the
//! codec before they get here, so a medium never sees raw bytes.
//!
//! ## Implementations
//!
//! - [`fs::FsMedium`]: one file per key under a directory, atomic writes.
//! - [`memory::MemMedium`]: in-process map, for tests and embedding.
//!
//! ## Storage Layout
//!
//! ```text
//! {ns}_data                  # Envelope text (maybe GZ:/LZ: tagged)
//! {ns}_meta                  # {"compressed": bool, "originalSize": n}
//! {ns}_backups               # ["{ns}_backup_…", …] oldest first
//! {ns}_backup_{ms}_{rand}    # {"data", "meta", "createdAt", "version"}
//! ```

use serde::Serialize;

use crate::error::Result;

pub mod fs;
pub mod memory;

pub use fs::FsMedium;
pub use memory::MemMedium;

/// Usage and capacity as reported by the medium, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaEstimate {
    pub usage: u64,
    pub limit: u64,
}

impl QuotaEstimate {
    pub fn usage_fraction(&self) -> f64 {
        if self.limit == 0 {
            return 1.0;
        }
        self.usage as f64 / self.limit as f64
    }
}

/// Abstract interface for the key/value persistence medium.
pub trait StorageMedium {
    /// Returns Ok(None) if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    /// MUST be atomic: a failed write leaves the previous value intact.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Usage/capacity, or None when the medium cannot report one.
    fn estimate(&self) -> Result<Option<QuotaEstimate>>;
}
