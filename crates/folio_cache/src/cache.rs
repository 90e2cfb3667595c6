//! Beat cache implementation.

use derive_getters::Getters;
use folio_core::{Beat, StoryConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    beat: Beat,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.created_at.elapsed())
    }
}

/// Cache key for unguided beats.
///
/// Two requests share a key when they target the same page with the same
/// amount of history, in the same genre and language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct BeatKey {
    page_number: u32,
    history_len: usize,
    genre: String,
    language: String,
}

impl BeatKey {
    /// Build a key from a page position and its story settings.
    pub fn new(page_number: u32, history_len: usize, config: &StoryConfig) -> Self {
        Self {
            page_number,
            history_len,
            genre: config.genre().clone(),
            language: config.language().clone(),
        }
    }
}

/// Configuration for the beat cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct BeatCacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    enabled: bool,

    /// TTL for cached entries (seconds)
    #[serde(default = "default_ttl_secs")]
    ttl_secs: u64,

    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_entries")]
    max_entries: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_max_entries() -> usize {
    64
}

impl Default for BeatCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

/// Cache for provider-written beats.
///
/// Stores beats with TTL-based expiration and evicts the least recently
/// used entry when full. The orchestrator owns one instance per session and
/// clears it on reset.
///
/// # Example
///
/// ```
/// use folio_cache::{BeatCache, BeatCacheConfig, BeatKey};
/// use folio_core::{Beat, FocusCharacter, StoryConfig};
///
/// let mut cache = BeatCache::new(BeatCacheConfig::default());
/// let key = BeatKey::new(3, 2, &StoryConfig::default());
///
/// cache.insert(key.clone(), Beat::new("A bridge at dawn", FocusCharacter::Hero));
///
/// assert_eq!(cache.get(&key).map(|beat| beat.scene), Some("A bridge at dawn".to_string()));
/// ```
#[derive(Debug)]
pub struct BeatCache {
    config: BeatCacheConfig,
    entries: HashMap<BeatKey, CacheEntry>,
    access_order: Vec<BeatKey>,
}

impl BeatCache {
    /// Create a new beat cache with configuration.
    pub fn new(config: BeatCacheConfig) -> Self {
        tracing::debug!(
            ttl_secs = config.ttl_secs,
            max_entries = config.max_entries,
            enabled = config.enabled,
            "Creating new BeatCache"
        );
        Self {
            config,
            entries: HashMap::new(),
            access_order: Vec::new(),
        }
    }

    /// Insert a beat into the cache.
    #[tracing::instrument(
        skip(self, beat),
        fields(page = key.page_number, cache_size = self.entries.len())
    )]
    pub fn insert(&mut self, key: BeatKey, beat: Beat) {
        if !self.config.enabled || self.config.max_entries == 0 {
            tracing::debug!("Cache disabled, skipping insert");
            return;
        }

        let entry = CacheEntry {
            beat,
            created_at: Instant::now(),
            ttl: Duration::from_secs(self.config.ttl_secs),
        };

        // Evict if at capacity
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_lru();
        }

        self.touch(&key);
        self.entries.insert(key, entry);
        tracing::debug!("Inserted beat into cache");
    }

    /// Get a cached beat.
    ///
    /// Returns None if:
    /// - Entry doesn't exist
    /// - Entry is expired
    /// - Cache is disabled
    #[tracing::instrument(
        skip(self),
        fields(page = key.page_number, cache_size = self.entries.len())
    )]
    pub fn get(&mut self, key: &BeatKey) -> Option<Beat> {
        if !self.config.enabled {
            return None;
        }

        let expired = self.entries.get(key)?.is_expired();
        if expired {
            tracing::debug!("Cache entry expired, removing");
            self.entries.remove(key);
            self.forget(key);
            return None;
        }

        self.touch(key);
        let entry = self.entries.get(key)?;
        tracing::debug!(time_remaining = ?entry.time_remaining(), "Cache hit");
        Some(entry.beat.clone())
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let entries = &self.entries;
        self.access_order.retain(|key| entries.contains_key(key));

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        removed
    }

    /// Clear all cache entries.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.access_order.clear();
        tracing::info!(cleared = count, "Cleared beat cache");
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move a key to the most recently used position.
    fn touch(&mut self, key: &BeatKey) {
        self.forget(key);
        self.access_order.push(key.clone());
    }

    fn forget(&mut self, key: &BeatKey) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    /// Evict least recently used entry.
    fn evict_lru(&mut self) {
        if self.access_order.is_empty() {
            return;
        }
        let key = self.access_order.remove(0);
        tracing::debug!(page = key.page_number, "Evicting LRU entry");
        self.entries.remove(&key);
    }
}

impl Default for BeatCache {
    fn default() -> Self {
        Self::new(BeatCacheConfig::default())
    }
}
