//! AtCoder resolver.
//!
//! The official history endpoint returns one entry per contest taken; the
//! current rating is the last rated entry and the max rating the highest.
//! An empty history is a user who exists but never played a rated contest.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{
    AtCoderRating, Config, Platform, RatingRecord, RatingValue, ResolutionOutcome, SourceConfig,
    atcoder_color,
};
use crate::services::resolver::{Probe, Resolver, SourceAttempt, SourceChain};
use crate::services::sniff::{self, FieldPath};
use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy};

/// Rating of one history entry.
const HISTORY_RATING: &[FieldPath] = &[&["NewRating"], &["newRating"], &["new_rating"]];

const OBJECT_RATING: &[FieldPath] = &[
    &["rating"],
    &["Rating"],
    &["current_rating"],
    &["data", "rating"],
    &["user", "rating"],
];

const OBJECT_MAX_RATING: &[FieldPath] = &[
    &["max_rating"],
    &["maxRating"],
    &["highest_rating"],
    &["data", "max_rating"],
    &["user", "maxRating"],
];

/// Fields that confirm the source knows the user even without a rating.
const OBJECT_IDENTITY: &[FieldPath] = &[
    &["user_id"],
    &["username"],
    &["data", "user_id"],
    &["user", "username"],
];

pub struct AtCoderResolver {
    chain: SourceChain,
    source: SourceConfig,
}

impl AtCoderResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        let source = config.source(Platform::AtCoder).clone();
        let policy = RetryPolicy::from_config(&config.http, source.timeout_ms);
        Self {
            chain: SourceChain::new(Platform::AtCoder, transport, policy),
            source,
        }
    }

    fn attempts(&self, username: &str) -> Vec<SourceAttempt> {
        let request = |template: &str| {
            HttpRequest::get(SourceConfig::expand(template, username))
                .header("Accept", "application/json")
                .header("Cache-Control", "no-cache")
        };

        std::iter::once(SourceAttempt::primary(request(&self.source.primary)))
            .chain(
                self.source
                    .mirrors
                    .iter()
                    .map(|mirror| SourceAttempt::mirror(request(mirror))),
            )
            .collect()
    }
}

#[async_trait]
impl Resolver for AtCoderResolver {
    fn platform(&self) -> Platform {
        Platform::AtCoder
    }

    async fn resolve(&self, username: &str) -> ResolutionOutcome {
        let attempts = self.attempts(username);
        self.chain
            .run(username, &attempts, |_, response| parse(username, response))
            .await
    }
}

fn parse(username: &str, response: &HttpResponse) -> Probe<RatingRecord> {
    let Ok(value) = response.json::<Value>() else {
        return Probe::Unusable("payload is not JSON".to_string());
    };

    match &value {
        // A lone object that is not a history entry is a wrapped profile.
        Value::Array(entries)
            if entries.len() == 1 && !sniff::has_any(&entries[0], HISTORY_RATING) =>
        {
            from_object(username, &entries[0])
        }
        Value::Array(entries)
            if !entries.is_empty()
                && !entries.iter().any(|entry| sniff::has_any(entry, HISTORY_RATING)) =>
        {
            Probe::Unusable(format!("no history entries in {} element(s)", entries.len()))
        }
        Value::Array(entries) => Probe::Found(from_history(username, entries)),
        Value::Object(_) => from_object(username, &value),
        other => Probe::Unusable(sniff::describe(other)),
    }
}

/// Ratings of rated entries, oldest first.
fn from_history(username: &str, entries: &[Value]) -> RatingRecord {
    let ratings: Vec<i64> = entries
        .iter()
        .filter(|entry| entry.get("IsRated").and_then(Value::as_bool) != Some(false))
        .filter_map(|entry| sniff::probe_integer(entry, HISTORY_RATING))
        .collect();

    log::debug!("AtCoder: {username} has {} rated contest(s)", ratings.len());
    RatingRecord::AtCoder(AtCoderRating::from_history(username, &ratings))
}

fn from_object(username: &str, value: &Value) -> Probe<RatingRecord> {
    if sniff::reports_not_found(value) {
        return Probe::NotFound;
    }
    if sniff::reports_failure(value) {
        return Probe::Unusable(format!("source reported failure: {}", sniff::describe(value)));
    }

    match sniff::probe_integer(value, OBJECT_RATING) {
        Some(rating) if rating > 0 => {
            let max_rating = sniff::probe_integer(value, OBJECT_MAX_RATING)
                .map_or(rating, |max| max.max(rating));
            Probe::Found(RatingRecord::AtCoder(AtCoderRating {
                rating: RatingValue::Rated(rating),
                max_rating: RatingValue::Rated(max_rating),
                color: atcoder_color(rating),
                username: username.to_string(),
            }))
        }
        _ if sniff::has_any(value, OBJECT_IDENTITY) => {
            Probe::Found(RatingRecord::AtCoder(AtCoderRating::unrated(username)))
        }
        _ => Probe::Unusable(sniff::describe(value)),
    }
}
