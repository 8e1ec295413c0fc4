use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{QuotaEstimate, StorageMedium};
use crate::error::{Result, VaultError};

const VALUE_EXT: &str = "dat";

/// Directory-backed medium: each key is a `{key}.dat` file under `root`.
pub struct FsMedium {
    root: PathBuf,
    capacity: Option<u64>,
}

impl FsMedium {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: Option<u64>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(VaultError::Store(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.root.join(format!("{}.{}", key, VALUE_EXT)))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(VaultError::Io)?;
        }
        Ok(())
    }

    fn usage(&self) -> Result<u64> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut total = 0;
        for entry in fs::read_dir(&self.root).map_err(VaultError::Io)? {
            let path = entry.map_err(VaultError::Io)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == VALUE_EXT) {
                total += fs::metadata(&path).map_err(VaultError::Io)?.len();
            }
        }
        Ok(total)
    }
}

/// Writes `value` to `tmp` then renames it over `target`. `tmp` never
/// survives a failed write.
fn write_atomic(tmp: &Path, target: &Path, value: &str) -> Result<()> {
    let result = fs::write(tmp, value).and_then(|_| fs::rename(tmp, target));
    if let Err(e) = result {
        let _ = fs::remove_file(tmp);
        return Err(VaultError::Io(e));
    }
    Ok(())
}

impl StorageMedium for FsMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(VaultError::Io)?;
        let value = match String::from_utf8(bytes) {
            Ok(value) => value,
            // Damaged bytes surface as decode or checksum failures upstream
            Err(e) => {
                log::warn!("{} is not valid UTF-8, reading lossily", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let target = self.key_path(key)?;
        self.ensure_dir()?;

        let tmp = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        write_atomic(&tmp, &target, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(path).map_err(VaultError::Io)?;
        }
        Ok(())
    }

    fn estimate(&self) -> Result<Option<QuotaEstimate>> {
        match self.capacity {
            Some(limit) => Ok(Some(QuotaEstimate {
                usage: self.usage()?,
                limit,
            })),
            None => Ok(None),
        }
    }
}
