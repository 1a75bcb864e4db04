// src/services/aggregator.rs

//! Aggregation façade: the single entry point for rating lookups.
//!
//! ```text
//! fetch_rating(platform, username)
//!   ├─ cache hit (fresh)  → Success(cached record)
//!   └─ miss → resolver → outcome
//!                         ├─ Success → store, return
//!                         └─ failure → return (never stored)
//! ```
//!
//! Nothing escapes this boundary: unknown platforms, empty usernames and
//! even resolver panics come back as a [`ResolutionOutcome`].

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;

use crate::models::{Config, Platform, RatingRequest, RatingResponse, ResolutionOutcome};
use crate::services::atcoder::AtCoderResolver;
use crate::services::cache::RatingCache;
use crate::services::codechef::CodeChefResolver;
use crate::services::codeforces::CodeforcesResolver;
use crate::services::leetcode::LeetCodeResolver;
use crate::services::resolver::Resolver;
use crate::storage::KeyValueStore;
use crate::utils::http::HttpTransport;

/// Cache-first rating lookups across all platforms.
pub struct RatingAggregator {
    cache: RatingCache,
    resolvers: HashMap<Platform, Arc<dyn Resolver>>,
}

impl RatingAggregator {
    /// Build an aggregator with the four platform resolvers.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        config: &Config,
    ) -> Self {
        let resolvers: [Arc<dyn Resolver>; 4] = [
            Arc::new(CodeforcesResolver::new(transport.clone(), config)),
            Arc::new(CodeChefResolver::new(transport.clone(), config)),
            Arc::new(LeetCodeResolver::new(transport.clone(), config)),
            Arc::new(AtCoderResolver::new(transport, config)),
        ];
        Self::with_resolvers(RatingCache::new(store), resolvers)
    }

    /// Build an aggregator from explicit resolvers. A later resolver for
    /// the same platform replaces an earlier one.
    pub fn with_resolvers(
        cache: RatingCache,
        resolvers: impl IntoIterator<Item = Arc<dyn Resolver>>,
    ) -> Self {
        let resolvers = resolvers
            .into_iter()
            .map(|resolver| (resolver.platform(), resolver))
            .collect();
        Self { cache, resolvers }
    }

    pub fn cache(&self) -> &RatingCache {
        &self.cache
    }

    /// Rating of `username` on `platform`, from cache when fresh.
    pub async fn fetch_rating(&self, platform: Platform, username: &str) -> ResolutionOutcome {
        let username = username.trim();
        if username.is_empty() {
            return ResolutionOutcome::ApiError(format!("{platform} username is required"));
        }

        if let Some(record) = self.cache.lookup(platform, username).await {
            log::debug!("{platform}: serving {username} from cache");
            return ResolutionOutcome::Success(record);
        }

        let Some(resolver) = self.resolvers.get(&platform) else {
            return ResolutionOutcome::UnsupportedPlatform(platform.to_string());
        };

        let outcome = match AssertUnwindSafe(resolver.resolve(username))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("{platform}: resolver for {username} panicked: {message}");
                ResolutionOutcome::ApiError(message)
            }
        };

        match (outcome.record(), outcome.failure_kind()) {
            (Some(record), _) if outcome.is_cacheable() => {
                self.cache.store(platform, username, record).await;
            }
            (_, Some(kind)) => {
                log::warn!("{platform}: {kind:?} failure for {username}, not caching")
            }
            _ => log::debug!("{platform}: not caching {username}: {outcome:?}"),
        }
        outcome
    }

    /// Resolve several pairs concurrently. Outcomes keep the input order.
    pub async fn fetch_many(&self, requests: &[(Platform, String)]) -> Vec<ResolutionOutcome> {
        join_all(
            requests
                .iter()
                .map(|(platform, username)| self.fetch_rating(*platform, username)),
        )
        .await
    }

    /// Answer a request that names its platform by tag.
    pub async fn handle(&self, request: RatingRequest) -> RatingResponse {
        let outcome = match request.platform.parse::<Platform>() {
            Ok(platform) => self.fetch_rating(platform, &request.username).await,
            Err(_) => {
                log::warn!("Rejected request for unsupported platform {:?}", request.platform);
                ResolutionOutcome::UnsupportedPlatform(request.platform)
            }
        };
        RatingResponse::from(outcome)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "resolver panicked".to_string()
    }
}
