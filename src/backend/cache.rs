// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for receipt listings.
//!
//! Caches the vaults listed for each receipt email so the import screen does
//! not hit the vault store on every refresh. Entries are dropped after an
//! import or a share that changes the listing.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::models::Vault;

/// Cached listing + insertion timestamp.
struct CacheEntry {
    vaults: Vec<Vault>,
    inserted_at: Instant,
}

/// In-process LRU cache of vault listings keyed by receipt email.
pub struct ListingCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ListingCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of receipt emails to cache.
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Get the cached listing for `email`.
    ///
    /// Returns `None` if not cached or expired.
    pub fn get(&self, email: &str) -> Option<Vec<Vault>> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(email) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.vaults.clone());
            }
            cache.pop(email);
        }
        None
    }

    /// Store the listing for `email`.
    pub fn put(&self, email: &str, vaults: Vec<Vault>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                email.to_string(),
                CacheEntry {
                    vaults,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the listing for `email`.
    pub fn invalidate(&self, email: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(email);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalStorageMap;
    use chrono::Utc;

    fn sample_vault() -> Vault {
        Vault {
            id: "8a6e0804-2bd0-4672-b79d-d97027f9071a".to_string(),
            domain: "bank_DOT_example".to_string(),
            cookies: Vec::new(),
            local_storage: LocalStorageMap::new(),
            shared_by: "owner@example.com".to_string(),
            receipts: vec!["friend@example.com".to_string()],
            imported: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cache_put_and_get() {
        let cache = ListingCache::new(10, Duration::from_secs(300));
        let email = "friend@example.com";

        assert!(cache.get(email).is_none());

        cache.put(email, vec![sample_vault()]);

        let result = cache.get(email).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].domain, "bank_DOT_example");
    }

    #[test]
    fn cache_invalidate() {
        let cache = ListingCache::new(10, Duration::from_secs(300));
        let email = "friend@example.com";
        cache.put(email, vec![sample_vault()]);
        assert!(cache.get(email).is_some());

        cache.invalidate(email);
        assert!(cache.get(email).is_none());
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = ListingCache::new(10, Duration::from_millis(1));
        cache.put("friend@example.com", vec![sample_vault()]);

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("friend@example.com").is_none());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = ListingCache::new(1, Duration::from_secs(300));
        cache.put("a@example.com", Vec::new());
        cache.put("b@example.com", Vec::new());

        assert!(cache.get("a@example.com").is_none());
        assert!(cache.get("b@example.com").is_some());
    }
}
