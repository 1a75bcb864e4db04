// src/services/resolver.rs

//! Resolver contract and the shared source-chain loop.
//!
//! Every platform resolver owns an ordered list of sources: one primary,
//! authoritative source, then zero or more third-party mirrors. Sources are
//! tried strictly in order and the first usable answer wins.
//!
//! - A primary that says the user does not exist (HTTP 404 or an explicit
//!   not-found payload) ends the chain with `UserNotFound`.
//! - Anything else unusable (transport failure, bad status, unrecognised
//!   payload, a mirror's own not-found) moves on to the next source.
//! - When every source is spent, a mirror's not-found becomes
//!   `UserNotFound`. Otherwise a chain with mirrors degrades to an unrated
//!   `Success` and a primary-only chain reports the last failure,
//!   classified as network, timeout or API error.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{FailureKind, Platform, RatingRecord, ResolutionOutcome};
use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy, fetch_with_retry};

/// Turns a username into a rating outcome for one platform.
#[async_trait]
pub trait Resolver: Send + Sync {
    fn platform(&self) -> Platform;

    async fn resolve(&self, username: &str) -> ResolutionOutcome;
}

/// Trust level of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Primary,
    Mirror,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Primary => f.write_str("primary"),
            SourceRole::Mirror => f.write_str("mirror"),
        }
    }
}

/// One source to try, with its ready-to-send request.
#[derive(Debug, Clone)]
pub struct SourceAttempt {
    pub role: SourceRole,
    pub request: HttpRequest,
}

impl SourceAttempt {
    pub fn primary(request: HttpRequest) -> Self {
        Self {
            role: SourceRole::Primary,
            request,
        }
    }

    pub fn mirror(request: HttpRequest) -> Self {
        Self {
            role: SourceRole::Mirror,
            request,
        }
    }
}

/// What a parser made of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Usable answer
    Found(T),
    /// The source says the user does not exist
    NotFound,
    /// Unrecognised or placeholder payload; try the next source
    Unusable(String),
}

/// Transport, retry budget and ordered sources shared by a resolver.
pub struct SourceChain {
    platform: Platform,
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl SourceChain {
    pub fn new(platform: Platform, transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self {
            platform,
            transport,
            policy,
        }
    }

    /// Try each source in order and return the first usable outcome.
    pub async fn run<F>(
        &self,
        username: &str,
        attempts: &[SourceAttempt],
        parse: F,
    ) -> ResolutionOutcome
    where
        F: Fn(&SourceAttempt, &HttpResponse) -> Probe<RatingRecord>,
    {
        let platform = self.platform;
        let has_mirrors = attempts.iter().any(|a| a.role == SourceRole::Mirror);
        let mut last_failure: Option<(FailureKind, String)> = None;
        let mut mirror_not_found = false;

        for attempt in attempts {
            let url = &attempt.request.url;
            log::debug!("{platform}: trying {} source {url}", attempt.role);

            let response =
                match fetch_with_retry(self.transport.as_ref(), &attempt.request, &self.policy)
                    .await
                {
                    Ok(response) => response,
                    Err(error) => {
                        log::warn!("{platform}: {} source failed: {error}", attempt.role);
                        last_failure = Some((error.kind(), error.to_string()));
                        continue;
                    }
                };

            if !response.is_success()
                && attempt.role == SourceRole::Primary
                && (response.status == 404 || parse(attempt, &response) == Probe::NotFound)
            {
                log::info!("{platform}: {username} not found (HTTP {})", response.status);
                return ResolutionOutcome::UserNotFound;
            }

            let response = match response.error_for_status(url) {
                Ok(response) => response,
                Err(error) => {
                    log::warn!("{platform}: {} source failed: {error}", attempt.role);
                    last_failure = Some((error.kind(), error.to_string()));
                    continue;
                }
            };

            match parse(attempt, &response) {
                Probe::Found(record) => {
                    log::info!(
                        "{platform}: resolved {username} via {} source ({})",
                        attempt.role,
                        record.rating()
                    );
                    return ResolutionOutcome::Success(record);
                }
                Probe::NotFound if attempt.role == SourceRole::Primary => {
                    log::info!("{platform}: {username} not found");
                    return ResolutionOutcome::UserNotFound;
                }
                Probe::NotFound => {
                    log::debug!("{platform}: mirror {url} does not know {username}");
                    mirror_not_found = true;
                    last_failure = Some((FailureKind::Api, format!("{url}: user not found")));
                }
                Probe::Unusable(reason) => {
                    log::debug!("{platform}: skipping {url}: {reason}");
                    last_failure = Some((FailureKind::Api, format!("{url}: {reason}")));
                }
            }
        }

        if mirror_not_found {
            log::info!("{platform}: {username} not found by any reachable source");
            return ResolutionOutcome::UserNotFound;
        }

        if has_mirrors {
            log::warn!("{platform}: all sources exhausted for {username}, reporting unrated");
            return ResolutionOutcome::Success(RatingRecord::unrated(platform, username));
        }

        match last_failure {
            Some((kind, message)) => ResolutionOutcome::failure(kind, message),
            None => ResolutionOutcome::ApiError(format!("no {platform} sources configured")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AtCoderRating, RatingValue};
    use crate::utils::testing::{Reply, ScriptedTransport};
    use std::time::Duration;

    const PRIMARY: &str = "https://primary.test/u";
    const MIRROR_A: &str = "https://mirror-a.test/u";
    const MIRROR_B: &str = "https://mirror-b.test/u";

    fn chain(transport: Arc<ScriptedTransport>) -> SourceChain {
        let policy = RetryPolicy::new(1, Duration::from_millis(50)).with_backoff_base(Duration::ZERO);
        SourceChain::new(Platform::AtCoder, transport, policy)
    }

    fn attempts(with_mirrors: bool) -> Vec<SourceAttempt> {
        let mut list = vec![SourceAttempt::primary(HttpRequest::get(PRIMARY))];
        if with_mirrors {
            list.push(SourceAttempt::mirror(HttpRequest::get(MIRROR_A)));
            list.push(SourceAttempt::mirror(HttpRequest::get(MIRROR_B)));
        }
        list
    }

    // Body "rated:N" is usable, "missing" is not-found, anything else unusable.
    fn parse(_: &SourceAttempt, response: &HttpResponse) -> Probe<RatingRecord> {
        if let Some(value) = response.body.strip_prefix("rated:") {
            let rating = value.parse().unwrap();
            Probe::Found(RatingRecord::AtCoder(AtCoderRating::from_history("u", &[rating])))
        } else if response.body == "missing" {
            Probe::NotFound
        } else {
            Probe::Unusable("unrecognised".to_string())
        }
    }

    #[tokio::test]
    async fn test_primary_wins_without_touching_mirrors() {
        let transport = Arc::new(ScriptedTransport::new().on(PRIMARY, Reply::ok("rated:1500")));
        let outcome = chain(transport.clone()).run("u", &attempts(true), parse).await;

        assert_eq!(outcome.record().unwrap().rating(), RatingValue::Rated(1500));
        assert_eq!(transport.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_primary_404_short_circuits() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PRIMARY, Reply::status(404, ""))
                .on(MIRROR_A, Reply::ok("rated:1500")),
        );
        let outcome = chain(transport.clone()).run("u", &attempts(true), parse).await;

        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
        assert_eq!(transport.calls_to(MIRROR_A), 0);
    }

    #[tokio::test]
    async fn test_primary_not_found_payload_on_error_status() {
        let transport = Arc::new(ScriptedTransport::new().on(PRIMARY, Reply::status(400, "missing")));
        let outcome = chain(transport).run("u", &attempts(false), parse).await;
        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
    }

    #[tokio::test]
    async fn test_mirror_not_found_falls_through() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PRIMARY, Reply::timeout())
                .on(MIRROR_A, Reply::ok("missing"))
                .on(MIRROR_B, Reply::ok("rated:2000")),
        );
        let outcome = chain(transport.clone()).run("u", &attempts(true), parse).await;

        assert_eq!(outcome.record().unwrap().rating(), RatingValue::Rated(2000));
        assert_eq!(transport.calls_to(PRIMARY), 2);
    }

    #[tokio::test]
    async fn test_exhausted_chain_with_mirrors_is_unrated_success() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PRIMARY, Reply::timeout())
                .on(MIRROR_A, Reply::status(500, ""))
                .on(MIRROR_B, Reply::ok("<html>")),
        );
        let outcome = chain(transport).run("u", &attempts(true), parse).await;

        assert_eq!(
            outcome,
            ResolutionOutcome::Success(RatingRecord::unrated(Platform::AtCoder, "u"))
        );
    }

    #[tokio::test]
    async fn test_mirror_not_found_after_primary_failure_is_user_not_found() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PRIMARY, Reply::timeout())
                .on(MIRROR_A, Reply::ok("missing"))
                .on(MIRROR_B, Reply::status(502, "")),
        );
        let outcome = chain(transport.clone()).run("u", &attempts(true), parse).await;

        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
        assert_eq!(transport.calls_to(MIRROR_B), 1);
    }

    #[tokio::test]
    async fn test_primary_only_chain_classifies_failure() {
        let timeout = Arc::new(ScriptedTransport::new().on(PRIMARY, Reply::timeout()));
        assert!(matches!(
            chain(timeout).run("u", &attempts(false), parse).await,
            ResolutionOutcome::TimeoutError(_)
        ));

        let network = Arc::new(ScriptedTransport::new().on(PRIMARY, Reply::network("refused")));
        assert!(matches!(
            chain(network).run("u", &attempts(false), parse).await,
            ResolutionOutcome::NetworkError(_)
        ));

        let status = Arc::new(ScriptedTransport::new().on(PRIMARY, Reply::status(503, "")));
        assert!(matches!(
            chain(status).run("u", &attempts(false), parse).await,
            ResolutionOutcome::ApiError(message) if message.contains("503")
        ));

        let garbage = Arc::new(ScriptedTransport::new().on(PRIMARY, Reply::ok("garbage")));
        assert!(matches!(
            chain(garbage).run("u", &attempts(false), parse).await,
            ResolutionOutcome::ApiError(_)
        ));
    }
}
