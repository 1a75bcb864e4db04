//! LeetCode resolver.
//!
//! The primary source is LeetCode's own GraphQL endpoint, asked for the
//! contest ranking and the solve breakdown in one POST. Contest rating is
//! legitimately absent for users who never entered a rated contest; that is
//! `Unrated`, not a missing user.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::{
    Config, LeetCodeRating, Platform, RatingRecord, RatingValue, ResolutionOutcome, SourceConfig,
};
use crate::services::resolver::{Probe, Resolver, SourceAttempt, SourceChain, SourceRole};
use crate::services::sniff::{self, FieldPath};
use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy};

const SITE: &str = "https://leetcode.com";

const PROFILE_QUERY: &str = r#"
query getUserProfile($username: String!) {
  userContestRanking(username: $username) {
    rating
    globalRanking
    attendedContestsCount
  }
  matchedUser(username: $username) {
    profile {
      ranking
    }
    submitStatsGlobal {
      acSubmissionNum {
        difficulty
        count
      }
    }
  }
}
"#;

const MIRROR_RATING: &[FieldPath] = &[
    &["contestRating"],
    &["rating"],
    &["userContestRanking", "rating"],
    &["data", "userContestRanking", "rating"],
    &["data", "rating"],
];

const MIRROR_ATTENDED: &[FieldPath] = &[
    &["contestAttend"],
    &["attendedContestsCount"],
    &["userContestRanking", "attendedContestsCount"],
    &["data", "userContestRanking", "attendedContestsCount"],
];

const MIRROR_RANKING: &[FieldPath] = &[
    &["ranking"],
    &["contestGlobalRanking"],
    &["globalRanking"],
    &["userContestRanking", "globalRanking"],
    &["data", "userContestRanking", "globalRanking"],
];

const MIRROR_SOLVED: &[FieldPath] = &[
    &["totalSolved"],
    &["solvedProblem"],
    &["data", "totalSolved"],
];

/// Fields that confirm the mirror knows the user even without a rating.
const MIRROR_IDENTITY: &[FieldPath] = &[
    &["username"],
    &["matchedUser"],
    &["data", "matchedUser"],
    &["contestParticipation"],
];

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ProfileData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    user_contest_ranking: Option<ContestRanking>,
    matched_user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContestRanking {
    rating: Option<f64>,
    global_ranking: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    profile: Option<UserProfile>,
    submit_stats_global: Option<SubmitStats>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    ranking: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    #[serde(default)]
    ac_submission_num: Vec<SubmissionCount>,
}

#[derive(Debug, Deserialize)]
struct SubmissionCount {
    difficulty: String,
    count: u64,
}

pub struct LeetCodeResolver {
    chain: SourceChain,
    source: SourceConfig,
}

impl LeetCodeResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        let source = config.source(Platform::LeetCode).clone();
        let policy = RetryPolicy::from_config(&config.http, source.timeout_ms);
        Self {
            chain: SourceChain::new(Platform::LeetCode, transport, policy),
            source,
        }
    }

    fn attempts(&self, username: &str) -> Vec<SourceAttempt> {
        let query = json!({
            "query": PROFILE_QUERY,
            "variables": { "username": username },
        });
        let graphql =
            HttpRequest::post_json(SourceConfig::expand(&self.source.primary, username), &query)
                .header("Referer", SITE)
                .header("Origin", SITE);

        std::iter::once(SourceAttempt::primary(graphql))
            .chain(self.source.mirrors.iter().map(|mirror| {
                SourceAttempt::mirror(
                    HttpRequest::get(SourceConfig::expand(mirror, username))
                        .header("Accept", "application/json"),
                )
            }))
            .collect()
    }
}

#[async_trait]
impl Resolver for LeetCodeResolver {
    fn platform(&self) -> Platform {
        Platform::LeetCode
    }

    async fn resolve(&self, username: &str) -> ResolutionOutcome {
        let attempts = self.attempts(username);
        self.chain
            .run(username, &attempts, |attempt, response| match attempt.role {
                SourceRole::Primary => parse_graphql(username, response),
                SourceRole::Mirror => parse_mirror(username, response),
            })
            .await
    }
}

fn build(
    username: &str,
    rating: RatingValue,
    total_solved: u64,
    ranking: Option<String>,
) -> RatingRecord {
    RatingRecord::LeetCode(LeetCodeRating {
        rating,
        total_solved,
        ranking,
        acceptance_rate: None,
        username: username.to_string(),
    })
}

fn parse_graphql(username: &str, response: &HttpResponse) -> Probe<RatingRecord> {
    let payload: GraphQlResponse = match response.json() {
        Ok(payload) => payload,
        Err(e) => return Probe::Unusable(format!("malformed GraphQL payload: {e}")),
    };

    if payload
        .errors
        .iter()
        .any(|error| sniff::is_not_found_message(&error.message))
    {
        return Probe::NotFound;
    }
    if let Some(error) = payload.errors.first() {
        return Probe::Unusable(format!("GraphQL error: {}", error.message));
    }

    let Some(data) = payload.data else {
        return Probe::Unusable("GraphQL response without data".to_string());
    };
    let Some(user) = data.matched_user else {
        return Probe::NotFound;
    };

    let total_solved = user
        .submit_stats_global
        .and_then(|stats| {
            stats
                .ac_submission_num
                .into_iter()
                .find(|entry| entry.difficulty == "All")
        })
        .map_or(0, |entry| entry.count);

    let contest = data.user_contest_ranking;
    let rating = contest
        .as_ref()
        .and_then(|contest| contest.rating)
        .map_or(RatingValue::Unrated, |rating| {
            RatingValue::Rated(rating.round() as i64)
        });
    let ranking = user
        .profile
        .and_then(|profile| profile.ranking)
        .filter(|ranking| *ranking > 0)
        .or_else(|| contest.and_then(|contest| contest.global_ranking))
        .map(|ranking| ranking.to_string());

    Probe::Found(build(username, rating, total_solved, ranking))
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

    let total_solved = sniff::probe_integer(value, MIRROR_SOLVED)
        .and_then(|solved| u64::try_from(solved).ok())
        .unwrap_or(0);
    let ranking = sniff::probe_text(value, MIRROR_RANKING);
    let attended = sniff::probe_integer(value, MIRROR_ATTENDED);

    match (sniff::probe_integer(value, MIRROR_RATING), attended) {
        // Mirrors report the 1500 starting rating for users with no contests.
        (_, Some(0)) => Probe::Found(build(username, RatingValue::Unrated, total_solved, ranking)),
        (Some(rating), _) if rating > 0 => Probe::Found(build(
            username,
            RatingValue::Rated(rating),
            total_solved,
            ranking,
        )),
        _ if attended.is_some() || sniff::has_any(value, MIRROR_IDENTITY) => {
            Probe::Found(build(username, RatingValue::Unrated, total_solved, ranking))
        }
        _ => Probe::Unusable(sniff::describe(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::http::Method;
    use crate::utils::testing::{Reply, ScriptedTransport};

    const GRAPHQL: &str = "https://leetcode.com/graphql";
    const MIRROR: &str = "https://alfa-leetcode-api.onrender.com/lee215/contest";

    fn resolver(transport: Arc<ScriptedTransport>) -> LeetCodeResolver {
        let mut config = Config::default();
        config.http.backoff_base_ms = 0;
        config.http.max_retries = 0;
        config.platforms.leetcode.timeout_ms = 200;
        LeetCodeResolver::new(transport, &config)
    }

    fn leet(outcome: &ResolutionOutcome) -> &LeetCodeRating {
        match outcome.record() {
            Some(RatingRecord::LeetCode(record)) => record,
            _ => panic!("expected a leetcode record, got {outcome:?}"),
        }
    }

    const RATED: &str = r#"{"data":{
        "userContestRanking":{"rating":2412.87,"globalRanking":310,"attendedContestsCount":88},
        "matchedUser":{"profile":{"ranking":1204},"submitStatsGlobal":{"acSubmissionNum":[
            {"difficulty":"All","count":2390},{"difficulty":"Easy","count":600}]}}}}"#;

    #[tokio::test]
    async fn test_rated_user() {
        let transport = Arc::new(ScriptedTransport::new().on(GRAPHQL, Reply::ok(RATED)));
        let outcome = resolver(transport.clone()).resolve("lee215").await;

        let record = leet(&outcome);
        assert_eq!(record.rating, RatingValue::Rated(2413));
        assert_eq!(record.total_solved, 2390);
        assert_eq!(record.ranking.as_deref(), Some("1204"));
        assert_eq!(record.acceptance_rate, None);
        assert_eq!(transport.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = Arc::new(ScriptedTransport::new().on(GRAPHQL, Reply::ok(RATED)));
        resolver(transport.clone()).resolve("lee215").await;

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert!(request.headers.iter().any(|(k, v)| k == "Referer" && v == SITE));
        assert!(request.headers.iter().any(|(k, v)| k == "Origin" && v == SITE));

        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["variables"]["username"], "lee215");
        assert!(body["query"].as_str().unwrap().contains("userContestRanking"));
    }

    #[tokio::test]
    async fn test_never_competed_is_unrated_not_missing() {
        let body = r#"{"data":{"userContestRanking":null,
            "matchedUser":{"profile":{"ranking":0},"submitStatsGlobal":{"acSubmissionNum":[{"difficulty":"All","count":12}]}}}}"#;
        let transport = Arc::new(ScriptedTransport::new().on(GRAPHQL, Reply::ok(body)));
        let outcome = resolver(transport).resolve("lee215").await;

        let record = leet(&outcome);
        assert_eq!(record.rating, RatingValue::Unrated);
        assert_eq!(record.total_solved, 12);
        assert_eq!(record.ranking, None);
    }

    #[tokio::test]
    async fn test_missing_user_short_circuits() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(GRAPHQL, Reply::ok(r#"{"data":{"userContestRanking":null,"matchedUser":null}}"#))
                .on(MIRROR, Reply::ok(r#"{"contestAttend":3,"contestRating":1600}"#)),
        );
        let outcome = resolver(transport.clone()).resolve("lee215").await;

        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
        assert_eq!(transport.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_graphql_not_found_error() {
        let transport = Arc::new(ScriptedTransport::new().on(
            GRAPHQL,
            Reply::ok(r#"{"errors":[{"message":"User matching query does not exist."}],"data":{"matchedUser":null}}"#),
        ));
        let outcome = resolver(transport).resolve("lee215").await;
        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_mirror() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(GRAPHQL, Reply::status(403, "<html>blocked</html>"))
                .on(
                    MIRROR,
                    Reply::ok(r#"{"contestAttend":12,"contestRating":1834.6,"contestGlobalRanking":40211}"#),
                ),
        );
        let outcome = resolver(transport).resolve("lee215").await;

        let record = leet(&outcome);
        assert_eq!(record.rating, RatingValue::Rated(1835));
        assert_eq!(record.ranking.as_deref(), Some("40211"));
    }

    #[tokio::test]
    async fn test_mirror_with_no_contests_is_unrated() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(GRAPHQL, Reply::network("reset"))
                .on(MIRROR, Reply::ok(r#"{"contestAttend":0,"contestRating":1500}"#)),
        );
        let outcome = resolver(transport).resolve("lee215").await;
        assert_eq!(leet(&outcome).rating, RatingValue::Unrated);
    }
}
