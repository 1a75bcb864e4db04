// src/services/cache.rs

//! Rating cache with a fixed freshness window.
//!
//! Entries are stored under `rating_{platform}_{username}` in the shared
//! [`KeyValueStore`]. Stale entries are not deleted, they are just ignored
//! by [`RatingCache::lookup`] until a new success overwrites them.
//!
//! Lookup and store never fail: a store fault is logged and treated as a
//! miss (lookup) or dropped (store).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Platform, RatingRecord};
use crate::storage::KeyValueStore;

/// Maximum age of an entry that is still served.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Namespace of rating entries inside the shared store.
pub const KEY_PREFIX: &str = "rating_";

/// A stored rating and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub record: RatingRecord,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age < FRESHNESS_WINDOW,
            // A timestamp ahead of the clock cannot be trusted to expire.
            Err(_) => false,
        }
    }
}

/// Summary of one cache entry, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRating {
    pub key: String,
    pub platform: Platform,
    pub username: String,
    pub stored_at: DateTime<Utc>,
    pub fresh: bool,
}

/// Cache of resolved ratings keyed by `(platform, username)`.
#[derive(Clone)]
pub struct RatingCache {
    store: Arc<dyn KeyValueStore>,
}

impl RatingCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store key for a `(platform, username)` pair.
    pub fn key(platform: Platform, username: &str) -> String {
        format!("{KEY_PREFIX}{platform}_{username}")
    }

    /// Inverse of [`RatingCache::key`]. Usernames may contain `_`.
    pub fn parse_key(key: &str) -> Option<(Platform, String)> {
        let rest = key.strip_prefix(KEY_PREFIX)?;
        let (platform, username) = rest.split_once('_')?;
        let platform = platform.parse().ok()?;
        Some((platform, username.to_string()))
    }

    /// Fresh record for the pair, if any.
    pub async fn lookup(&self, platform: Platform, username: &str) -> Option<RatingRecord> {
        self.lookup_at(platform, username, Utc::now()).await
    }

    pub(crate) async fn lookup_at(
        &self,
        platform: Platform,
        username: &str,
        now: DateTime<Utc>,
    ) -> Option<RatingRecord> {
        let key = Self::key(platform, username);
        let entry = self.read_entry(&key).await?;

        if entry.is_fresh_at(now) {
            log::debug!("Cache hit for {key} (stored {})", entry.stored_at);
            Some(entry.record)
        } else {
            log::debug!("Cache entry for {key} is stale (stored {})", entry.stored_at);
            None
        }
    }

    /// Overwrite the entry for the pair.
    pub async fn store(&self, platform: Platform, username: &str, record: &RatingRecord) {
        self.store_at(platform, username, record, Utc::now()).await;
    }

    pub(crate) async fn store_at(
        &self,
        platform: Platform,
        username: &str,
        record: &RatingRecord,
        stored_at: DateTime<Utc>,
    ) {
        let key = Self::key(platform, username);
        let entry = CacheEntry {
            record: record.clone(),
            stored_at,
        };

        let value = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to encode cache entry {key}: {e}");
                return;
            }
        };

        if let Err(e) = self.store.set(HashMap::from([(key.clone(), value)])).await {
            log::warn!("Failed to store cache entry {key}: {e}");
        }
    }

    async fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let mut found = match self.store.get(&[key.to_string()]).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Cache read failed for {key}: {e}");
                return None;
            }
        };

        let value = found.remove(key)?;
        match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {key}: {e}");
                None
            }
        }
    }

    /// Every rating entry in the store, fresh or not.
    pub async fn entries(&self) -> Result<Vec<CachedRating>> {
        let now = Utc::now();
        let keys: Vec<String> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .collect();
        let values = self.store.get(&keys).await?;

        let mut entries: Vec<CachedRating> = values
            .into_iter()
            .filter_map(|(key, value)| {
                let (platform, username) = Self::parse_key(&key)?;
                let entry: CacheEntry = serde_json::from_value(value).ok()?;
                Some(CachedRating {
                    fresh: entry.is_fresh_at(now),
                    stored_at: entry.stored_at,
                    key,
                    platform,
                    username,
                })
            })
            .collect();
        entries.sort_by(|a, b| (a.platform, &a.username).cmp(&(b.platform, &b.username)));
        Ok(entries)
    }

    /// Drop the entry for one pair. Returns the number removed.
    pub async fn clear_user(&self, platform: Platform, username: &str) -> Result<usize> {
        self.clear_where(|p, u| p == platform && u == username).await
    }

    /// Drop every entry of a platform.
    pub async fn clear_platform(&self, platform: Platform) -> Result<usize> {
        self.clear_where(|p, _| p == platform).await
    }

    /// Drop every entry of a username across platforms, ignoring case.
    pub async fn clear_username(&self, username: &str) -> Result<usize> {
        self.clear_where(|_, u| u.eq_ignore_ascii_case(username)).await
    }

    /// Drop every rating entry. Other keys in the store are untouched.
    pub async fn clear_all(&self) -> Result<usize> {
        self.clear_where(|_, _| true).await
    }

    async fn clear_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(Platform, &str) -> bool,
    {
        let doomed: Vec<String> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| {
                Self::parse_key(key).is_some_and(|(platform, username)| predicate(platform, &username))
            })
            .collect();

        if !doomed.is_empty() {
            self.store.remove(&doomed).await?;
            log::info!("Cleared {} cached rating(s)", doomed.len());
        }
        Ok(doomed.len())
    }
}
