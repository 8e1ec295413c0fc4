use std::collections::BTreeMap;

use super::{QuotaEstimate, StorageMedium};
use crate::error::{Result, VaultError};

/// In-memory medium.
///
/// Usage is the summed byte length of keys and values, the way browser
/// storage accounts for it. Capacity is optional.
#[derive(Debug, Default, Clone)]
pub struct MemMedium {
    entries: BTreeMap<String, String>,
    capacity: Option<u64>,
    simulate_write_error: bool,
    failing_key: Option<(String, usize)>,
}

impl MemMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&mut self, simulate: bool) {
        self.simulate_write_error = simulate;
    }

    /// Makes the next `times` writes to `key` fail.
    pub fn fail_writes_to(&mut self, key: &str, times: usize) {
        self.failing_key = Some((key.to_string(), times));
    }

    pub fn set_capacity(&mut self, capacity: Option<u64>) {
        self.capacity = capacity;
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn usage(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl StorageMedium for MemMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error {
            return Err(VaultError::Store("Simulated write error".to_string()));
        }
        if let Some((failing, remaining)) = self.failing_key.as_mut() {
            if failing == key && *remaining > 0 {
                *remaining -= 1;
                return Err(VaultError::Store(format!("Simulated write error on '{}'", key)));
            }
        }
        if let Some(limit) = self.capacity {
            let replaced = self
                .entries
                .get(key)
                .map(|v| (key.len() + v.len()) as u64)
                .unwrap_or(0);
            let after = self.usage() - replaced + (key.len() + value.len()) as u64;
            if after > limit {
                return Err(VaultError::QuotaExceeded {
                    usage: after,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn estimate(&self) -> Result<Option<QuotaEstimate>> {
        Ok(self.capacity.map(|limit| QuotaEstimate {
            usage: self.usage(),
            limit,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_io() {
        let mut m = MemMedium::new();
        assert_eq!(m.get("k").unwrap(), None);
        m.set("k", "v").unwrap();
        assert_eq!(m.get("k").unwrap(), Some("v".to_string()));
        m.remove("k").unwrap();
        m.remove("k").unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_estimate_without_capacity() {
        let m = MemMedium::new();
        assert_eq!(m.estimate().unwrap(), None);
    }

    #[test]
    fn test_usage_counts_keys_and_values() {
        let mut m = MemMedium::with_capacity(100);
        m.set("ab", "cdef").unwrap();
        assert_eq!(
            m.estimate().unwrap(),
            Some(QuotaEstimate {
                usage: 6,
                limit: 100
            })
        );
    }

    #[test]
    fn test_write_beyond_capacity_fails_and_keeps_old_value() {
        let mut m = MemMedium::with_capacity(10);
        m.set("k", "small").unwrap();
        let err = m.set("k", "much too large").unwrap_err();
        assert!(matches!(err, VaultError::QuotaExceeded { .. }));
        assert_eq!(m.get("k").unwrap(), Some("small".to_string()));
    }

    #[test]
    fn test_overwrite_accounts_for_replaced_value() {
        let mut m = MemMedium::with_capacity(10);
        m.set("k", "123456789").unwrap();
        m.set("k", "987654321").unwrap();
    }

    #[test]
    fn test_simulated_write_error() {
        let mut m = MemMedium::new();
        m.set_simulate_write_error(true);
        assert!(m.set("k", "v").is_err());
        m.set_simulate_write_error(false);
        assert!(m.set("k", "v").is_ok());
    }

    #[test]
    fn test_targeted_write_failures_run_out() {
        let mut m = MemMedium::new();
        m.fail_writes_to("k", 2);
        assert!(m.set("other", "v").is_ok());
        assert!(m.set("k", "v").is_err());
        assert!(m.set("k", "v").is_err());
        assert!(m.set("k", "v").is_ok());
    }
}
