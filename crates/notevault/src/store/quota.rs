//! Quota monitoring.
//!
//! Checked before every save. Above the high-water mark old backups are
//! pruned down to [`VaultConfig::pressure_retention`]; above the critical mark
//! the save is refused once its backup has been taken.
//!
//! [`VaultConfig::pressure_retention`]: crate::config::VaultConfig::pressure_retention

use serde::Serialize;

use super::engine::Session;
use crate::error::Result;
use crate::medium::{QuotaEstimate, StorageMedium};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum QuotaStatus {
    /// The medium reports no capacity.
    Unknown,
    Normal(QuotaEstimate),
    /// Above the high-water mark. `pruned` backups were dropped.
    Pressure { estimate: QuotaEstimate, pruned: usize },
    Critical(QuotaEstimate),
}

impl QuotaStatus {
    pub fn estimate(&self) -> Option<QuotaEstimate> {
        match self {
            QuotaStatus::Unknown => None,
            QuotaStatus::Normal(q) | QuotaStatus::Critical(q) => Some(*q),
            QuotaStatus::Pressure { estimate, .. } => Some(*estimate),
        }
    }

    pub fn critical(&self) -> Option<QuotaEstimate> {
        match self {
            QuotaStatus::Critical(q) => Some(*q),
            _ => None,
        }
    }
}

impl<M: StorageMedium> Session<'_, M> {
    pub fn check_quota(&mut self) -> Result<QuotaStatus> {
        let Some(estimate) = self.medium.estimate()? else {
            return Ok(QuotaStatus::Unknown);
        };
        if estimate.usage_fraction() <= self.config.quota_high_water {
            return Ok(QuotaStatus::Normal(estimate));
        }

        let pruned = self.prune(self.config.pressure_retention())?;
        let estimate = match self.medium.estimate()? {
            Some(after) => after,
            None => estimate,
        };
        log::warn!(
            "Storage at {:.1}% of capacity, pruned {} backups",
            estimate.usage_fraction() * 100.0,
            pruned
        );

        if estimate.usage_fraction() > self.config.quota_critical {
            Ok(QuotaStatus::Critical(estimate))
        } else {
            Ok(QuotaStatus::Pressure { estimate, pruned })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::error::VaultError;
    use crate::medium::MemMedium;
    use crate::model::Note;
    use crate::store::NoteVault;

    fn usage_of(m: &MemMedium) -> u64 {
        m.keys()
            .iter()
            .map(|k| (k.len() + m.get(k).unwrap().unwrap().len()) as u64)
            .sum()
    }

    /// Fills a vault with `saves` saves, then shrinks capacity so current
    /// usage sits at `fraction` of it.
    fn vault_at(saves: usize, fraction: f64) -> NoteVault<MemMedium> {
        let v = NoteVault::with_medium(MemMedium::new());
        for i in 0..saves {
            v.save_notes(vec![Note::new(format!("note {}", i), "body text")])
                .unwrap();
        }
        v.with_medium_mut(|m| {
            let usage = usage_of(m);
            m.set_capacity(Some((usage as f64 / fraction) as u64));
        })
        .unwrap();
        v
    }

    #[test]
    fn test_unknown_without_capacity() {
        let v = NoteVault::with_medium(MemMedium::new());
        assert_eq!(v.check_quota().unwrap(), QuotaStatus::Unknown);
    }

    #[test]
    fn test_normal_usage_leaves_backups() {
        let v = vault_at(6, 0.5);
        assert!(matches!(v.check_quota().unwrap(), QuotaStatus::Normal(_)));
        assert_eq!(v.list_backups().unwrap().len(), 5);
    }

    #[test]
    fn test_pressure_prunes_to_half() {
        let v = vault_at(6, 0.85);
        match v.check_quota().unwrap() {
            QuotaStatus::Pressure { pruned, .. } => assert_eq!(pruned, 2),
            other => panic!("unexpected status: {other:?}"),
        }
        assert_eq!(
            v.list_backups().unwrap().len(),
            VaultConfig::default().pressure_retention()
        );
    }

    #[test]
    fn test_critical_refuses_save_after_backup() {
        let v = NoteVault::with_medium(MemMedium::new());
        let before = vec![Note::new("kept", "")];
        v.save_notes(before.clone()).unwrap();
        v.with_medium_mut(|m| {
            m.set("ballast", &"x".repeat(20_000)).unwrap();
            let usage = usage_of(m);
            m.set_capacity(Some((usage as f64 / 0.92) as u64));
        })
        .unwrap();

        let err = v.save_notes(vec![Note::new("new", "")]).unwrap_err();
        assert!(matches!(err, VaultError::QuotaExceeded { .. }), "{err:?}");
        assert_eq!(v.list_backups().unwrap().len(), 1);
        assert_eq!(v.load_notes().unwrap(), before);
    }

    #[test]
    fn test_status_accessors() {
        let q = QuotaEstimate {
            usage: 95,
            limit: 100,
        };
        assert_eq!(QuotaStatus::Critical(q).critical(), Some(q));
        assert_eq!(QuotaStatus::Normal(q).critical(), None);
        assert_eq!(
            QuotaStatus::Pressure {
                estimate: q,
                pruned: 1
            }
            .estimate(),
            Some(q)
        );
        assert_eq!(QuotaStatus::Unknown.estimate(), None);
    }
}
