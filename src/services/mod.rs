//! Service layer for the rating aggregator.
//!
//! This module contains the business logic for:
//! - Cache-first lookups across platforms (`RatingAggregator`)
//! - The rating cache (`RatingCache`)
//! - Per-platform resolvers (`CodeforcesResolver`, `CodeChefResolver`,
//!   `LeetCodeResolver`, `AtCoderResolver`)
//! - Focus-mode allow-listing (`is_allowed`)

pub mod aggregator;
pub mod atcoder;
pub mod cache;
pub mod codechef;
pub mod codeforces;
pub mod focus;
pub mod leetcode;
pub mod resolver;
pub mod sniff;

pub use aggregator::RatingAggregator;
pub use atcoder::AtCoderResolver;
pub use cache::{CacheEntry, CachedRating, FRESHNESS_WINDOW, RatingCache};
pub use codechef::CodeChefResolver;
pub use codeforces::CodeforcesResolver;
pub use focus::{host_of, is_allowed};
pub use leetcode::LeetCodeResolver;
pub use resolver::{Probe, Resolver, SourceAttempt, SourceChain, SourceRole};
