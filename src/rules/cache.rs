use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::loader::{default_rules, load_rules};
use super::types::RuleSet;
use crate::error::RuleLoadError;

/// Default window after which a file-backed rule set is re-read.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum RuleSource {
    /// Compiled-in rule set; never refreshed
    Embedded,
    File(PathBuf),
}

#[derive(Debug)]
struct Snapshot {
    loaded_at: Instant,
    rule_set: Arc<RuleSet>,
}

/// Rule-set cache with time-boxed refresh.
///
/// Readers get an `Arc<RuleSet>` snapshot. A refresh builds a complete new
/// rule set and swaps the snapshot pointer, so a reader never sees a
/// partially updated rule list. The lock is held only for the pointer read or
/// swap, never across a file read or an evaluation.
///
/// Only one caller re-reads a stale source at a time; concurrent callers keep
/// using the stale snapshot until the swap lands.
#[derive(Debug)]
pub struct RuleSetCache {
    source: RuleSource,
    staleness: Duration,
    current: RwLock<Arc<Snapshot>>,
    refreshing: Mutex<()>,
}

impl RuleSetCache {
    /// Load the rule set once from `source`.
    pub fn new(source: RuleSource, staleness: Duration) -> Result<Self, RuleLoadError> {
        let rule_set = load_from(&source)?;
        Ok(Self {
            source,
            staleness,
            current: RwLock::new(Arc::new(Snapshot {
                loaded_at: Instant::now(),
                rule_set: Arc::new(rule_set),
            })),
            refreshing: Mutex::new(()),
        })
    }

    /// File-backed cache with the default staleness window.
    pub fn from_file(path: &Path) -> Result<Self, RuleLoadError> {
        Self::new(RuleSource::File(path.to_path_buf()), DEFAULT_STALENESS)
    }

    /// Cache over the embedded MSCC5 rule set.
    pub fn embedded() -> Self {
        Self::from_rule_set(default_rules())
    }

    /// Cache over a fixed, in-memory rule set (never refreshed).
    pub fn from_rule_set(rule_set: RuleSet) -> Self {
        Self {
            source: RuleSource::Embedded,
            staleness: Duration::MAX,
            current: RwLock::new(Arc::new(Snapshot {
                loaded_at: Instant::now(),
                rule_set: Arc::new(rule_set),
            })),
            refreshing: Mutex::new(()),
        }
    }

    /// Current rule set, re-reading the source first if the snapshot is stale.
    ///
    /// A failed re-read is fatal for the caller that performed it; the
    /// previous snapshot stays in place for the next attempt. While another
    /// caller is re-reading, the stale snapshot is returned.
    pub fn current(&self) -> Result<Arc<RuleSet>, RuleLoadError> {
        let snapshot = self.snapshot();
        if !self.is_stale(&snapshot) {
            return Ok(snapshot.rule_set.clone());
        }

        let _refresh = match self.refreshing.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Rule set refresh in progress, using current snapshot");
                return Ok(snapshot.rule_set.clone());
            }
        };

        // Another caller may have swapped between our read and the lock
        let latest = self.snapshot();
        if !Arc::ptr_eq(&latest, &snapshot) {
            return Ok(latest.rule_set.clone());
        }
        self.reload()
    }

    /// Re-read the source unconditionally and swap the snapshot.
    pub fn reload(&self) -> Result<Arc<RuleSet>, RuleLoadError> {
        let rule_set = Arc::new(load_from(&self.source)?);
        let fresh = Arc::new(Snapshot {
            loaded_at: Instant::now(),
            rule_set: rule_set.clone(),
        });
        let previous_version = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, fresh).rule_set.version.clone()
        };
        if previous_version != rule_set.version {
            info!(
                "Rule set changed from {} to {}",
                previous_version, rule_set.version
            );
        } else {
            debug!("Refreshed rule set {}", rule_set.version);
        }
        Ok(rule_set)
    }

    /// When the current snapshot was loaded.
    pub fn last_loaded(&self) -> Instant {
        self.snapshot().loaded_at
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    fn is_stale(&self, snapshot: &Snapshot) -> bool {
        matches!(self.source, RuleSource::File(_)) && snapshot.loaded_at.elapsed() >= self.staleness
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn load_from(source: &RuleSource) -> Result<RuleSet, RuleLoadError> {
    match source {
        RuleSource::Embedded => Ok(default_rules()),
        RuleSource::File(path) => load_rules(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rules_json(version: &str, severity: u8) -> String {
        format!(
            r#"{{
                "version": "{version}",
                "defaults": {{ "unknown": {{ "recType": "reinspect", "severity": 1, "wrRef": "SRM", "rationale": "unknown" }} }},
                "rules": [
                    {{ "when": {{ "codeRegex": "^DER$" }},
                       "outcome": {{ "recType": "clean", "severity": {severity}, "wrRef": "SRM", "rationale": "jet" }} }}
                ]
            }}"#
        )
    }

    #[test]
    fn test_embedded_cache_never_reloads() {
        let cache = RuleSetCache::embedded();
        let loaded = cache.last_loaded();
        let a = cache.current().unwrap();
        let b = cache.current().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.last_loaded(), loaded);
    }

    #[test]
    fn test_fresh_snapshot_is_reused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, rules_json("v1", 2)).unwrap();

        let cache = RuleSetCache::new(RuleSource::File(path.clone()), Duration::from_secs(3600)).unwrap();
        std::fs::write(&path, rules_json("v2", 3)).unwrap();

        // Within the window, the edit is not yet visible
        assert_eq!(cache.current().unwrap().version, "v1");
    }

    #[test]
    fn test_stale_snapshot_picks_up_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, rules_json("v1", 2)).unwrap();

        let cache = RuleSetCache::new(RuleSource::File(path.clone()), Duration::ZERO).unwrap();
        let before = cache.current().unwrap();
        std::fs::write(&path, rules_json("v2", 3)).unwrap();
        let after = cache.current().unwrap();

        assert_eq!(after.version, "v2");
        assert_eq!(after.rules[0].outcome.severity, 3);
        // Old readers keep their complete snapshot
        assert_eq!(before.rules[0].outcome.severity, 2);
    }

    #[test]
    fn test_malformed_reload_is_fatal_and_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, rules_json("v1", 2)).unwrap();

        let cache = RuleSetCache::new(RuleSource::File(path.clone()), Duration::ZERO).unwrap();
        std::fs::write(&path, "{ broken").unwrap();
        assert!(matches!(cache.current(), Err(RuleLoadError::Parse(_))));

        std::fs::write(&path, rules_json("v3", 4)).unwrap();
        assert_eq!(cache.current().unwrap().version, "v3");
    }

    #[test]
    fn test_refresh_in_progress_serves_current_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, rules_json("v1", 2)).unwrap();

        let cache = RuleSetCache::new(RuleSource::File(path.clone()), Duration::ZERO).unwrap();
        let loaded = cache.last_loaded();
        std::fs::write(&path, "{ broken").unwrap();

        {
            let _refresh = cache.refreshing.lock().unwrap();
            // Stale, but someone else holds the refresh: no second read
            assert_eq!(cache.current().unwrap().version, "v1");
            assert_eq!(cache.last_loaded(), loaded);
        }

        assert!(matches!(cache.current(), Err(RuleLoadError::Parse(_))));
    }

    #[test]
    fn test_concurrent_readers_share_one_refresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, rules_json("v1", 2)).unwrap();

        let cache = RuleSetCache::new(RuleSource::File(path.clone()), Duration::ZERO).unwrap();
        std::fs::write(&path, rules_json("v2", 3)).unwrap();

        let versions: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.current().unwrap().version.clone()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(versions.iter().all(|v| v == "v1" || v == "v2"));
        assert!(versions.iter().any(|v| v == "v2"), "At least one caller refreshes");
        assert_eq!(cache.current().unwrap().version, "v2");
    }

    #[test]
    fn test_initial_load_failure() {
        let dir = TempDir::new().unwrap();
        let result = RuleSetCache::from_file(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(RuleLoadError::Io { .. })));
    }
}
