// src/models/mod.rs

//! Domain models for the rating aggregator.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod outcome;
mod platform;
mod rating;

// Re-export all public types
pub use config::{
    CacheConfig, Config, FocusConfig, HttpConfig, LoggingConfig, PlatformsConfig, SourceConfig,
    USERNAME_PLACEHOLDER,
};
pub use outcome::{FailureKind, RatingRequest, RatingResponse, ResolutionOutcome};
pub use platform::Platform;
pub use rating::{
    AtCoderColor, AtCoderRating, CodeChefRating, CodeforcesRating, LeetCodeRating, NOT_AVAILABLE,
    RatingRecord, RatingValue, atcoder_color, stars_from_rating,
};
