//! Content-addressed cache of parsed syntax trees.
//!
//! Entries are keyed by a 32-bit FNV-1a hash over the source text and the
//! options key. The stored source and options key are compared on lookup,
//! so a hash collision is a miss rather than a wrong tree. Eviction is least
//! recently used: a hit refreshes the entry.
//!
//! Documents below the configured minimum size are never cached; for them a
//! parse is cheaper than hashing and bookkeeping.

use crate::ir::nodes::Root;
use crate::options::PipelineOptions;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over a sequence of byte slices.
pub fn fnv1a_32<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for part in parts {
        for byte in part {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Cache key of a source parsed with `options`.
pub fn cache_key(source: &str, options: Option<&PipelineOptions>) -> (u32, String) {
    let options_key = PipelineOptions::cache_key(options);
    let hash = fnv1a_32([source.as_bytes(), &[0u8][..], options_key.as_bytes()]);
    (hash, options_key)
}

struct CacheEntry {
    source: String,
    options_key: String,
    tree: Arc<Root>,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct ParseCache {
    /// `None` when the capacity is zero.
    entries: Option<LruCache<u32, CacheEntry>>,
    min_bytes: usize,
    stats: CacheStats,
}

impl ParseCache {
    pub fn new(capacity: usize, min_bytes: usize) -> Self {
        ParseCache {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            min_bytes,
            stats: CacheStats::default(),
        }
    }

    /// Whether parses of `source` go through the cache at all.
    pub fn is_cacheable(&self, source: &str) -> bool {
        self.entries.is_some() && source.len() >= self.min_bytes
    }

    /// Look up a tree, refreshing its recency on a hit.
    pub fn get(&mut self, source: &str, options: Option<&PipelineOptions>) -> Option<Arc<Root>> {
        if !self.is_cacheable(source) {
            return None;
        }
        let (hash, options_key) = cache_key(source, options);
        let entries = self.entries.as_mut()?;
        let found = entries
            .get(&hash)
            .filter(|entry| entry.source == source && entry.options_key == options_key)
            .map(|entry| Arc::clone(&entry.tree));
        match found {
            Some(_) => {
                self.stats.hits += 1;
                debug!(hash, bytes = source.len(), "parse cache hit");
            }
            None => {
                self.stats.misses += 1;
                debug!(hash, bytes = source.len(), "parse cache miss");
            }
        }
        found
    }

    /// Store a tree, evicting the least recently used entry when full.
    pub fn insert(&mut self, source: &str, options: Option<&PipelineOptions>, tree: Arc<Root>) {
        if !self.is_cacheable(source) {
            return;
        }
        let (hash, options_key) = cache_key(source, options);
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        let entry = CacheEntry {
            source: source.to_string(),
            options_key,
            tree,
        };
        if let Some((evicted, _)) = entries.push(hash, entry) {
            if evicted != hash {
                self.stats.evictions += 1;
                debug!(evicted, "parse cache eviction");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.cap().get())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every entry, e.g. under memory pressure.
    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }
}
