//! Codeforces resolver.
//!
//! The official `user.info` API is stable JSON and is the only default
//! source. A failed lookup comes back as `status: "FAILED"` with a comment
//! (usually on HTTP 400), which is where not-found is detected.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{
    CodeforcesRating, Config, Platform, RatingRecord, RatingValue, ResolutionOutcome, SourceConfig,
};
use crate::services::resolver::{Probe, Resolver, SourceAttempt, SourceChain, SourceRole};
use crate::services::sniff::{self, FieldPath};
use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy};

/// Rating paths probed on mirror payloads.
const MIRROR_RATING: &[FieldPath] = &[
    &["rating"],
    &["result", "*", "rating"],
    &["data", "rating"],
    &["user", "rating"],
];

const MIRROR_MAX_RATING: &[FieldPath] = &[
    &["maxRating"],
    &["max_rating"],
    &["result", "*", "maxRating"],
    &["data", "maxRating"],
    &["user", "maxRating"],
];

const MIRROR_RANK: &[FieldPath] = &[
    &["rank"],
    &["result", "*", "rank"],
    &["data", "rank"],
    &["user", "rank"],
];

const MIRROR_HANDLE: &[FieldPath] = &[
    &["handle"],
    &["result", "*", "handle"],
    &["data", "handle"],
    &["user", "handle"],
];

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    handle: Option<String>,
    rating: Option<i64>,
    max_rating: Option<i64>,
    rank: Option<String>,
}

pub struct CodeforcesResolver {
    chain: SourceChain,
    source: SourceConfig,
}

impl CodeforcesResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        let source = config.source(Platform::Codeforces).clone();
        let policy = RetryPolicy::from_config(&config.http, source.timeout_ms);
        Self {
            chain: SourceChain::new(Platform::Codeforces, transport, policy),
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
impl Resolver for CodeforcesResolver {
    fn platform(&self) -> Platform {
        Platform::Codeforces
    }

    async fn resolve(&self, username: &str) -> ResolutionOutcome {
        let attempts = self.attempts(username);
        self.chain
            .run(username, &attempts, |attempt, response| match attempt.role {
                SourceRole::Primary => parse_api(username, response),
                SourceRole::Mirror => parse_mirror(username, response),
            })
            .await
    }
}

/// Missing or zero ratings mean the account never played a rated round.
fn rating_value(rating: Option<i64>) -> RatingValue {
    match rating {
        Some(value) if value > 0 => RatingValue::Rated(value),
        _ => RatingValue::Unrated,
    }
}

fn build(
    username: &str,
    rating: Option<i64>,
    max_rating: Option<i64>,
    rank: Option<String>,
    handle: Option<String>,
) -> RatingRecord {
    let rating = rating_value(rating);
    let max_rating = match rating_value(max_rating) {
        RatingValue::Rated(max) => RatingValue::Rated(max),
        _ => rating,
    };

    RatingRecord::Codeforces(CodeforcesRating {
        rating,
        max_rating,
        rank: rank
            .filter(|rank| !rank.is_empty())
            .unwrap_or_else(|| "unrated".to_string()),
        handle: handle
            .filter(|handle| !handle.is_empty())
            .unwrap_or_else(|| username.to_string()),
    })
}

fn parse_api(username: &str, response: &HttpResponse) -> Probe<RatingRecord> {
    let envelope: ApiEnvelope = match response.json() {
        Ok(envelope) => envelope,
        Err(e) => return Probe::Unusable(format!("malformed user.info payload: {e}")),
    };

    match envelope.status.as_str() {
        "OK" => match envelope.result.into_iter().next() {
            Some(user) => Probe::Found(build(
                username,
                user.rating,
                user.max_rating,
                user.rank,
                user.handle,
            )),
            None => Probe::Found(RatingRecord::unrated(Platform::Codeforces, username)),
        },
        "FAILED" => {
            let comment = envelope.comment.unwrap_or_default();
            if sniff::is_not_found_message(&comment) {
                Probe::NotFound
            } else {
                Probe::Unusable(format!("user.info failed: {comment}"))
            }
        }
        other => Probe::Unusable(format!("unexpected status {other:?}")),
    }
}

fn parse_mirror(username: &str, response: &HttpResponse) -> Probe<RatingRecord> {
    let Ok(value) = response.json::<Value>() else {
        return Probe::Unusable("mirror payload is not JSON".to_string());
    };
    let value = sniff::unwrap_singleton(&value);

    if sniff::reports_not_found(value) {
        return Probe::NotFound;
    }
    if sniff::reports_failure(value) {
        return Probe::Unusable(format!("mirror reported failure: {}", sniff::describe(value)));
    }

    match sniff::probe_integer(value, MIRROR_RATING) {
        Some(rating) if rating > 0 => Probe::Found(build(
            username,
            Some(rating),
            sniff::probe_integer(value, MIRROR_MAX_RATING),
            sniff::probe_text(value, MIRROR_RANK),
            sniff::probe_text(value, MIRROR_HANDLE),
        )),
        // A handle without a rating confirms an unrated account.
        _ if sniff::has_any(value, MIRROR_HANDLE) => Probe::Found(build(
            username,
            None,
            None,
            None,
            sniff::probe_text(value, MIRROR_HANDLE),
        )),
        _ => Probe::Unusable(sniff::describe(value)),
    }
}
