// src/lib.rs

//! Competitive-programming rating aggregator.
//!
//! Resolves "rating of user U on platform P" for Codeforces, CodeChef,
//! LeetCode and AtCoder into one normalized [`models::RatingRecord`],
//! falling back across sources and caching results for 30 minutes.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
