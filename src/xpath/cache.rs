//! Compiled Pattern Cache
//!
//! Compiling a pattern set is cheap, but hosts that run the same handful of
//! patterns over thousands of documents compile them once here and share the
//! immutable result.

use super::pattern::{PatternSet, Patterns};
use crate::error::Result;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

type Key = (Patterns, bool);

/// LRU cache of compiled pattern sets keyed by (patterns, case folding)
pub struct PatternCache {
    inner: Mutex<LruCache<Key, Arc<PatternSet>>>,
}

impl PatternCache {
    /// Create a cache holding at most `capacity` sets (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PatternCache {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the compiled set for `patterns`, compiling on a miss.
    /// Compilation errors are not cached.
    pub fn get_or_compile(&self, patterns: &Patterns, case_insensitive: bool) -> Result<Arc<PatternSet>> {
        let key = (patterns.clone(), case_insensitive);
        if let Some(set) = self.lock().get(&key) {
            return Ok(Arc::clone(set));
        }

        let set = PatternSet::compile(patterns, case_insensitive)?.shared();
        self.lock().put(key, Arc::clone(&set));
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<Key, Arc<PatternSet>>> {
        // A poisoned cache only ever holds fully inserted entries
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_set() {
        let cache = PatternCache::new(4);
        let a = cache.get_or_compile(&Patterns::from("//shelf"), false).unwrap();
        let b = cache.get_or_compile(&Patterns::from("//shelf"), false).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // case folding is part of the key
        let c = cache.get_or_compile(&Patterns::from("//shelf"), true).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_eviction() {
        let cache = PatternCache::new(1);
        cache.get_or_compile(&Patterns::from("/a"), false).unwrap();
        cache.get_or_compile(&Patterns::from("/b"), false).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = PatternCache::new(4);
        assert!(cache.get_or_compile(&Patterns::from("/a/"), false).is_err());
        assert!(cache.is_empty());
    }
}
