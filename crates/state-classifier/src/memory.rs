//! Cross-window classification memory and hysteresis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::config::HysteresisConfig;
use crate::state::DriverState;

/// (session_id, driver_id)
pub type MemoryKey = (String, String);

/// Last reported state for one driver in one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub last_state: DriverState,
    pub last_timestamp: DateTime<Utc>,
    pub consecutive_downgrades: u32,
}

impl MemoryEntry {
    /// Seconds elapsed since this entry was written, negative for later entries
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_timestamp).num_milliseconds() as f64 / 1000.0
    }

    pub fn is_expired(&self, now: DateTime<Utc>, inactivity_seconds: f64) -> bool {
        self.age_seconds(now) > inactivity_seconds
    }
}

/// How the hysteresis step treated a raw classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HysteresisDecision {
    /// No previous entry for the key
    First,
    /// Previous entry older than the inactivity window
    Expired,
    Upgrade,
    Steady,
    /// Downgrade accepted
    Downgrade,
    /// Downgrade rejected, previous state kept
    Held,
}

/// Result of one hysteresis step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HysteresisOutcome {
    pub state: DriverState,
    pub decision: HysteresisDecision,
    pub consecutive_downgrades: u32,
}

/// Pure hysteresis transition
///
/// Upgrades are accepted at once. A downgrade is accepted when the risk is
/// below the configured ceiling or after enough consecutive lower buckets;
/// otherwise the previous state is kept and the counter advances.
pub fn apply_hysteresis(
    previous: Option<&MemoryEntry>,
    raw: DriverState,
    risk_score: u8,
    now: DateTime<Utc>,
    config: &HysteresisConfig,
) -> HysteresisOutcome {
    let fresh = |decision| HysteresisOutcome {
        state: raw,
        decision,
        consecutive_downgrades: 0,
    };

    let Some(prev) = previous else {
        return fresh(HysteresisDecision::First);
    };
    if prev.is_expired(now, config.inactivity_seconds) {
        return fresh(HysteresisDecision::Expired);
    }

    if raw > prev.last_state {
        fresh(HysteresisDecision::Upgrade)
    } else if raw < prev.last_state {
        let count = prev.consecutive_downgrades.saturating_add(1);
        if risk_score < config.downgrade_risk_ceiling || count >= config.downgrade_confirmations {
            fresh(HysteresisDecision::Downgrade)
        } else {
            HysteresisOutcome {
                state: prev.last_state,
                decision: HysteresisDecision::Held,
                consecutive_downgrades: count,
            }
        }
    } else {
        fresh(HysteresisDecision::Steady)
    }
}

/// Keyed store of the last reported state per (session, driver)
///
/// Each classification reads and writes its key under one lock acquisition.
/// Entries idle past the inactivity window are dropped on every update.
#[derive(Debug, Default)]
pub struct ClassificationMemory {
    entries: Mutex<HashMap<MemoryKey, MemoryEntry>>,
}

impl ClassificationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MemoryKey, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one hysteresis step for `key` and store the result
    ///
    /// Also drops every entry that has expired as of `now`.
    pub fn update(
        &self,
        key: &MemoryKey,
        raw: DriverState,
        risk_score: u8,
        now: DateTime<Utc>,
        config: &HysteresisConfig,
    ) -> HysteresisOutcome {
        let mut entries = self.lock();
        let previous = entries.get(key).copied();

        if let Some(prev) = &previous {
            if now < prev.last_timestamp {
                warn!(
                    "Out-of-order bucket for {}/{}: {} precedes {}",
                    key.0, key.1, now, prev.last_timestamp
                );
            }
        }

        let outcome = apply_hysteresis(previous.as_ref(), raw, risk_score, now, config);

        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now, config.inactivity_seconds));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} idle hysteresis entries", purged);
        }
        match outcome.decision {
            HysteresisDecision::Expired => {
                debug!("Hysteresis entry for {}/{} expired, accepting {}", key.0, key.1, raw)
            }
            HysteresisDecision::Held => debug!(
                "Holding {} for {}/{} (raw {}, risk {}, downgrades {})",
                outcome.state, key.0, key.1, raw, risk_score, outcome.consecutive_downgrades
            ),
            HysteresisDecision::Upgrade => {
                debug!("Upgrade to {} for {}/{} accepted", raw, key.0, key.1)
            }
            _ => {}
        }

        entries.insert(
            key.clone(),
            MemoryEntry {
                last_state: outcome.state,
                last_timestamp: now,
                consecutive_downgrades: outcome.consecutive_downgrades,
            },
        );
        outcome
    }

    /// Stored entry for `key`, if any
    pub fn entry(&self, key: &MemoryKey) -> Option<MemoryEntry> {
        self.lock().get(key).copied()
    }

    /// Drop entries idle for longer than `inactivity_seconds` as of `now`
    pub fn purge_expired(&self, now: DateTime<Utc>, inactivity_seconds: f64) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now, inactivity_seconds));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn key() -> MemoryKey {
        ("session".to_string(), "driver".to_string())
    }

    #[test]
    fn test_first_observation_accepted() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        let out = memory.update(&key(), DriverState::Drowsy, 35, t0(), &config);
        assert_eq!(out.state, DriverState::Drowsy);
        assert_eq!(out.decision, HysteresisDecision::First);
        assert_eq!(memory.entry(&key()).unwrap().consecutive_downgrades, 0);
    }

    #[test]
    fn test_downgrade_needs_two_buckets() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        memory.update(&key(), DriverState::Drowsy, 35, t0(), &config);

        let held = memory.update(&key(), DriverState::Lucid, 45, t0() + Duration::seconds(15), &config);
        assert_eq!(held.state, DriverState::Drowsy);
        assert_eq!(held.decision, HysteresisDecision::Held);
        assert_eq!(memory.entry(&key()).unwrap().consecutive_downgrades, 1);

        let accepted = memory.update(&key(), DriverState::Lucid, 60, t0() + Duration::seconds(30), &config);
        assert_eq!(accepted.state, DriverState::Lucid);
        assert_eq!(memory.entry(&key()).unwrap().consecutive_downgrades, 0);
    }

    #[test]
    fn test_low_risk_downgrade_immediate() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        memory.update(&key(), DriverState::Asleep, 95, t0(), &config);
        let out = memory.update(&key(), DriverState::Lucid, 12, t0() + Duration::seconds(15), &config);
        assert_eq!(out.state, DriverState::Lucid);
        assert_eq!(out.decision, HysteresisDecision::Downgrade);
    }

    #[test]
    fn test_upgrade_resets_counter() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        memory.update(&key(), DriverState::Drowsy, 50, t0(), &config);
        memory.update(&key(), DriverState::Lucid, 50, t0() + Duration::seconds(15), &config);
        let out = memory.update(&key(), DriverState::Asleep, 92, t0() + Duration::seconds(30), &config);
        assert_eq!(out.state, DriverState::Asleep);
        assert_eq!(out.consecutive_downgrades, 0);
    }

    #[test]
    fn test_expired_entry_replaced() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        memory.update(&key(), DriverState::Asleep, 95, t0(), &config);
        let out = memory.update(&key(), DriverState::Lucid, 50, t0() + Duration::seconds(301), &config);
        assert_eq!(out.state, DriverState::Lucid);
        assert_eq!(out.decision, HysteresisDecision::Expired);
    }

    #[test]
    fn test_keys_are_independent() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        let other = ("session".to_string(), "other".to_string());
        memory.update(&key(), DriverState::Asleep, 95, t0(), &config);
        let out = memory.update(&other, DriverState::Lucid, 50, t0(), &config);
        assert_eq!(out.decision, HysteresisDecision::First);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_update_drops_idle_entries() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        let other = ("session".to_string(), "other".to_string());
        memory.update(&key(), DriverState::Drowsy, 40, t0(), &config);
        memory.update(&other, DriverState::Lucid, 5, t0() + Duration::seconds(301), &config);

        assert_eq!(memory.len(), 1);
        assert!(memory.entry(&key()).is_none());
        assert!(memory.entry(&other).is_some());

        // at exactly the inactivity window the entry is still live
        memory.update(&key(), DriverState::Lucid, 5, t0() + Duration::seconds(601), &config);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_purge_expired() {
        let memory = ClassificationMemory::new();
        let config = HysteresisConfig::default();
        memory.update(&key(), DriverState::Lucid, 5, t0(), &config);
        let other = ("s2".to_string(), "d2".to_string());
        memory.update(&other, DriverState::Lucid, 5, t0() + Duration::seconds(200), &config);

        assert_eq!(memory.purge_expired(t0() + Duration::seconds(400), 300.0), 1);
        assert!(memory.entry(&key()).is_none());
        assert!(memory.entry(&other).is_some());
        memory.clear();
        assert!(memory.is_empty());
    }
}
