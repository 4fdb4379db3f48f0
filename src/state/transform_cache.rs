use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::state::settings::CacheSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    /// Insert time; drives expiry.
    created: DateTime<Utc>,
    /// Last insert or hit; drives eviction.
    last_access: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct PersistedCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

/// Hit/miss counters and occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Bounded memo of transform results keyed by `input::prompt`.
///
/// Full caches evict the least recently used entry. Entries older than
/// `max_age` (by insert time) are treated as absent. Persistence is explicit:
/// callers save after [`TransformCache::needs_persist`] reports that enough
/// writes have accumulated.
#[derive(Debug, Clone)]
pub struct TransformCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    capacity: usize,
    max_age: Duration,
    persist_every: usize,
    writes_since_persist: usize,
    hits: u64,
    misses: u64,
}

impl<V> TransformCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(capacity: usize, max_age: Duration, persist_every: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            max_age,
            persist_every,
            writes_since_persist: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(
            settings.capacity,
            Duration::days(i64::from(settings.max_age_days)),
            settings.persist_every,
        )
    }

    pub fn key(input: &str, prompt: &str) -> String {
        format!("{input}::{prompt}")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.created > self.max_age
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => self.is_expired(entry, now),
        };
        if expired {
            self.entries.remove(key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.last_access = now;
        Some(entry.value.clone())
    }

    pub fn set(&mut self, key: &str, value: V) {
        self.set_at(key, value, Utc::now());
    }

    pub fn set_at(&mut self, key: &str, value: V, now: DateTime<Utc>) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created: now,
                last_access: now,
            },
        );
        self.writes_since_persist += 1;
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by(|a, b| a.1.last_access.cmp(&b.1.last_access).then_with(|| a.0.cmp(b.0)))
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            tracing::debug!("Evicting cache entry {key:?}");
            self.entries.remove(&key);
        }
    }

    /// Remove entries past their max age; returns how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        self.prune_expired_at(Utc::now())
    }

    pub fn prune_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let max_age = self.max_age;
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.created <= max_age);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.writes_since_persist = 0;
    }

    /// Whether enough writes have happened since the last save.
    pub fn needs_persist(&self) -> bool {
        self.persist_every > 0 && self.writes_since_persist >= self.persist_every
    }

    /// Save to `path` if a save is due. Returns whether it saved.
    pub fn persist_if_due(&mut self, path: &Path) -> Result<bool> {
        if !self.needs_persist() {
            return Ok(false);
        }
        self.save(path)?;
        Ok(true)
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        let persisted = PersistedCache {
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string(&persisted)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
        self.writes_since_persist = 0;
        tracing::debug!("Saved {} cache entries to {:?}", self.entries.len(), path);
        Ok(())
    }

    /// Load a saved cache. A missing file gives an empty cache.
    pub fn load(path: &Path, settings: &CacheSettings) -> Result<Self> {
        Self::load_at(path, settings, Utc::now())
    }

    pub fn load_at(path: &Path, settings: &CacheSettings, now: DateTime<Utc>) -> Result<Self> {
        let mut cache = Self::from_settings(settings);
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(cache),
            Err(e) => return Err(Error::io(path, e)),
        };
        let persisted: PersistedCache<V> = serde_json::from_str(&json)?;
        cache.entries = persisted.entries;

        let expired = cache.prune_expired_at(now);
        while cache.entries.len() > cache.capacity {
            cache.evict_oldest();
        }
        tracing::info!(
            "Loaded {} cache entries from {:?} ({expired} expired)",
            cache.entries.len(),
            path
        );
        Ok(cache)
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn cache(capacity: usize) -> TransformCache<String> {
        TransformCache::new(capacity, Duration::days(7), 3)
    }

    #[test]
    fn key_joins_input_and_prompt() {
        assert_eq!(TransformCache::<String>::key("Fucus", "fix species"), "Fucus::fix species");
    }

    #[test]
    fn get_counts_hits_and_misses() {
        let mut c = cache(10);
        assert_eq!(c.get_at("a", t(0)), None);
        c.set_at("a", "alpha".to_string(), t(1));
        assert_eq!(c.get_at("a", t(2)), Some("alpha".to_string()));
        let stats = c.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn full_cache_evicts_least_recently_used() {
        let mut c = cache(2);
        c.set_at("a", "1".to_string(), t(1));
        c.set_at("b", "2".to_string(), t(2));
        assert!(c.get_at("a", t(3)).is_some());
        c.set_at("c", "3".to_string(), t(4));

        assert_eq!(c.len(), 2);
        assert!(c.get_at("b", t(5)).is_none());
        assert!(c.get_at("a", t(5)).is_some());
        assert!(c.get_at("c", t(5)).is_some());
    }

    #[test]
    fn overwriting_does_not_evict() {
        let mut c = cache(2);
        c.set_at("a", "1".to_string(), t(1));
        c.set_at("b", "2".to_string(), t(2));
        c.set_at("a", "1b".to_string(), t(3));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get_at("a", t(4)), Some("1b".to_string()));
    }

    #[test]
    fn expired_entries_are_misses_and_pruned() {
        let mut c = cache(10);
        c.set_at("old", "x".to_string(), t(0));
        c.set_at("new", "y".to_string(), t(0) + Duration::days(6));

        let later = t(0) + Duration::days(8);
        assert_eq!(c.prune_expired_at(later), 1);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get_at("new", t(0) + Duration::days(14)), None);
        assert!(c.is_empty());
    }

    #[test]
    fn persists_every_n_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut c = cache(10);

        c.set_at("a", "1".to_string(), t(1));
        c.set_at("b", "2".to_string(), t(2));
        assert!(!c.persist_if_due(&path).unwrap());
        c.set_at("c", "3".to_string(), t(3));
        assert!(c.needs_persist());
        assert!(c.persist_if_due(&path).unwrap());
        assert!(!c.needs_persist());

        let settings = CacheSettings {
            capacity: 2,
            max_age_days: 7,
            persist_every: 3,
        };
        let mut loaded = TransformCache::<String>::load_at(&path, &settings, t(4)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_at("a", t(5)), None);
        assert_eq!(loaded.get_at("c", t(5)), Some("3".to_string()));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.json");
        let c = TransformCache::<String>::load(&path, &CacheSettings::default()).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.stats().capacity, 100);
    }
}
