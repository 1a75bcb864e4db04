//! CodeChef resolver.
//!
//! CodeChef has no public rating API, so the primary source is the
//! server-rendered profile page. Extraction runs in priority order:
//!
//! 1. the embedded `__NEXT_DATA__` JSON blob,
//! 2. profile markup (`.rating-number`, `.rating-star`, `.rating-ranks`),
//! 3. regexes over the raw HTML.
//!
//! A third-party JSON mirror is tried when the page is unusable.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::models::{
    CodeChefRating, Config, Platform, RatingRecord, RatingValue, ResolutionOutcome, SourceConfig,
    stars_from_rating,
};
use crate::services::resolver::{Probe, Resolver, SourceAttempt, SourceChain, SourceRole};
use crate::services::sniff::{self, FieldPath};
use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy};

/// Markers of CodeChef's "no such user" page.
const NOT_FOUND_MARKERS: [&str; 2] = ["Page Not Found", "page-not-found"];

/// Containers that only a real profile page renders.
const PROFILE_CONTAINERS: [&str; 3] = [
    ".user-details-container",
    ".user-profile-container",
    ".user-details",
];

/// Roots of the user object inside `__NEXT_DATA__`.
const NEXT_DATA_ROOTS: &[FieldPath] = &[
    &["props", "pageProps", "userData"],
    &["props", "pageProps", "data"],
    &["props", "pageProps"],
];

const RATING: &[FieldPath] = &[&["currentRating"], &["rating"]];
const STARS: &[FieldPath] = &[&["stars"], &["star"]];
const GLOBAL_RANK: &[FieldPath] = &[&["globalRank"], &["global_rank"]];
const COUNTRY_RANK: &[FieldPath] = &[&["countryRank"], &["country_rank"]];

/// Rating patterns over raw HTML, in priority order.
const RATING_PATTERNS: [&str; 3] = [
    r"(?i)rating-number[^>]*>\s*(\d+)",
    r#""currentRating"\s*:\s*(\d+)"#,
    r#""rating"\s*:\s*"?(\d+)"?"#,
];

const GLOBAL_RANK_PATTERNS: [&str; 2] = [
    r"(?i)Global\s*Rank[^<]*<[^>]*>\s*(\d+)",
    r#""globalRank"\s*:\s*"?(\d+)"?"#,
];

const COUNTRY_RANK_PATTERNS: [&str; 2] = [
    r"(?i)Country\s*Rank[^<]*<[^>]*>\s*(\d+)",
    r#""countryRank"\s*:\s*"?(\d+)"?"#,
];

const MIRROR_RATING: &[FieldPath] = &[
    &["currentRating"],
    &["rating"],
    &["data", "currentRating"],
    &["data", "rating"],
    &["user", "rating"],
];

const MIRROR_STARS: &[FieldPath] = &[&["stars"], &["data", "stars"], &["user", "stars"]];

const MIRROR_GLOBAL_RANK: &[FieldPath] = &[
    &["globalRank"],
    &["global_rank"],
    &["data", "globalRank"],
    &["user", "globalRank"],
];

const MIRROR_COUNTRY_RANK: &[FieldPath] = &[
    &["countryRank"],
    &["country_rank"],
    &["data", "countryRank"],
    &["user", "countryRank"],
];

/// Fields that confirm the mirror knows the user even without a rating.
const MIRROR_IDENTITY: &[FieldPath] = &[
    &["username"],
    &["name"],
    &["profile"],
    &["data", "username"],
    &["user", "username"],
];

pub struct CodeChefResolver {
    chain: SourceChain,
    source: SourceConfig,
}

impl CodeChefResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        let source = config.source(Platform::CodeChef).clone();
        let policy = RetryPolicy::from_config(&config.http, source.timeout_ms);
        Self {
            chain: SourceChain::new(Platform::CodeChef, transport, policy),
            source,
        }
    }

    fn attempts(&self, username: &str) -> Vec<SourceAttempt> {
        let page = HttpRequest::get(SourceConfig::expand(&self.source.primary, username))
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9");

        std::iter::once(SourceAttempt::primary(page))
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
impl Resolver for CodeChefResolver {
    fn platform(&self) -> Platform {
        Platform::CodeChef
    }

    async fn resolve(&self, username: &str) -> ResolutionOutcome {
        let attempts = self.attempts(username);
        self.chain
            .run(username, &attempts, |attempt, response| match attempt.role {
                SourceRole::Primary => parse_profile_page(username, response),
                SourceRole::Mirror => parse_mirror(username, response),
            })
            .await
    }
}

fn build(
    username: &str,
    rating: i64,
    stars: Option<i64>,
    global_rank: Option<String>,
    country_rank: Option<String>,
) -> RatingRecord {
    let stars = stars
        .and_then(|stars| u8::try_from(stars).ok())
        .filter(|stars| (1..=7).contains(stars))
        .unwrap_or_else(|| stars_from_rating(rating));

    RatingRecord::CodeChef(CodeChefRating {
        rating: RatingValue::Rated(rating),
        stars,
        global_rank,
        country_rank,
        username: username.to_string(),
    })
}

fn parse_profile_page(username: &str, response: &HttpResponse) -> Probe<RatingRecord> {
    if NOT_FOUND_MARKERS
        .iter()
        .any(|marker| response.body.contains(marker))
    {
        return Probe::NotFound;
    }

    let document = response.html();

    if let Some(record) = from_next_data(username, &document) {
        log::debug!("CodeChef: rating for {username} read from __NEXT_DATA__");
        return Probe::Found(record);
    }
    if let Some(record) = from_markup(username, &document, &response.body) {
        log::debug!("CodeChef: rating for {username} read from profile markup");
        return Probe::Found(record);
    }

    if has_profile_container(&document) {
        Probe::Found(RatingRecord::CodeChef(CodeChefRating::unrated(username)))
    } else {
        Probe::Unusable("no rating or profile markup on page".to_string())
    }
}

fn from_next_data(username: &str, document: &Html) -> Option<RatingRecord> {
    let selector = Selector::parse("script#__NEXT_DATA__").ok()?;
    let raw: String = document.select(&selector).next()?.text().collect();

    let data: Value = match serde_json::from_str(&raw) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("CodeChef: unreadable __NEXT_DATA__: {e}");
            return None;
        }
    };

    NEXT_DATA_ROOTS.iter().find_map(|root| {
        let user = sniff::lookup(&data, root)?;
        let rating = sniff::probe_integer(user, RATING).filter(|rating| *rating > 0)?;
        Some(build(
            username,
            rating,
            sniff::probe_integer(user, STARS),
            sniff::probe_text(user, GLOBAL_RANK),
            sniff::probe_text(user, COUNTRY_RANK),
        ))
    })
}

fn from_markup(username: &str, document: &Html, body: &str) -> Option<RatingRecord> {
    let rating = select_text(document, ".rating-number")
        .and_then(|text| sniff::leading_integer(&text))
        .or_else(|| first_capture(body, &RATING_PATTERNS))
        .filter(|rating| *rating > 0)?;

    let stars = select_text(document, ".rating-star")
        .map(|text| text.matches('★').count() as i64)
        .filter(|count| *count > 0);

    let (mut global_rank, mut country_rank) = ranks_from_list(document);
    if global_rank.is_none() {
        global_rank = first_capture(body, &GLOBAL_RANK_PATTERNS).map(|rank| rank.to_string());
    }
    if country_rank.is_none() {
        country_rank = first_capture(body, &COUNTRY_RANK_PATTERNS).map(|rank| rank.to_string());
    }

    Some(build(username, rating, stars, global_rank, country_rank))
}

/// `(global, country)` ranks from the `.rating-ranks` list.
fn ranks_from_list(document: &Html) -> (Option<String>, Option<String>) {
    let (Ok(selector), Ok(number)) = (Selector::parse(".rating-ranks li"), Regex::new(r"\d+"))
    else {
        return (None, None);
    };

    let mut global = None;
    let mut country = None;
    for item in document.select(&selector) {
        let text: String = item.text().collect();
        let Some(rank) = number.find(&text).map(|m| m.as_str().to_string()) else {
            continue;
        };
        let label = text.to_lowercase();
        if label.contains("global") {
            global.get_or_insert(rank);
        } else if label.contains("country") {
            country.get_or_insert(rank);
        }
    }
    (global, country)
}

fn has_profile_container(document: &Html) -> bool {
    PROFILE_CONTAINERS.iter().any(|css| {
        Selector::parse(css)
            .ok()
            .is_some_and(|selector| document.select(&selector).next().is_some())
    })
}

/// Trimmed text of the first element matching `css`.
fn select_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let text: String = document.select(&selector).next()?.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// First capture group of the first pattern that matches, as an integer.
fn first_capture(body: &str, patterns: &[&str]) -> Option<i64> {
    patterns.iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        re.captures(body)?.get(1)?.as_str().parse().ok()
    })
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
            rating,
            sniff::probe_integer(value, MIRROR_STARS),
            sniff::probe_text(value, MIRROR_GLOBAL_RANK),
            sniff::probe_text(value, MIRROR_COUNTRY_RANK),
        )),
        _ if sniff::has_any(value, MIRROR_IDENTITY) => {
            Probe::Found(RatingRecord::CodeChef(CodeChefRating::unrated(username)))
        }
        _ => Probe::Unusable(sniff::describe(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::{Reply, ScriptedTransport};

    const PAGE: &str = "https://www.codechef.com/users/chef";
    const MIRROR: &str = "https://codechef-api.vercel.app/handle/chef";

    fn resolver(transport: Arc<ScriptedTransport>) -> CodeChefResolver {
        let mut config = Config::default();
        config.http.backoff_base_ms = 0;
        config.http.max_retries = 0;
        config.platforms.codechef.timeout_ms = 200;
        CodeChefResolver::new(transport, &config)
    }

    fn chef(outcome: &ResolutionOutcome) -> &CodeChefRating {
        match outcome.record() {
            Some(RatingRecord::CodeChef(record)) => record,
            _ => panic!("expected a codechef record, got {outcome:?}"),
        }
    }

    #[tokio::test]
    async fn test_next_data_blob() {
        let html = r#"<html><head>
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"userData":{"currentRating":"1834","stars":4,"globalRank":5231,"countryRank":"312"}}}}
            </script></head><body></body></html>"#;
        let transport = Arc::new(ScriptedTransport::new().on(PAGE, Reply::ok(html)));
        let outcome = resolver(transport.clone()).resolve("chef").await;

        let record = chef(&outcome);
        assert_eq!(record.rating, RatingValue::Rated(1834));
        assert_eq!(record.stars, 4);
        assert_eq!(record.global_rank.as_deref(), Some("5231"));
        assert_eq!(record.country_rank.as_deref(), Some("312"));
        assert_eq!(transport.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_profile_markup() {
        let html = r#"<html><body><div class="user-details-container">
            <div class="rating-header">
              <div class="rating-number">2012</div>
              <span class="rating-star"><span>★</span><span>★</span><span>★</span><span>★</span><span>★</span></span>
            </div>
            <div class="rating-ranks"><ul>
              <li><a href="/ratings/all"><strong>1021</strong></a> Global Rank</li>
              <li><a href="/ratings/all?filterBy=Country"><strong>87</strong></a> Country Rank</li>
            </ul></div>
            </div></body></html>"#;
        let transport = Arc::new(ScriptedTransport::new().on(PAGE, Reply::ok(html)));
        let outcome = resolver(transport).resolve("chef").await;

        let record = chef(&outcome);
        assert_eq!(record.rating, RatingValue::Rated(2012));
        assert_eq!(record.stars, 5);
        assert_eq!(record.global_rank.as_deref(), Some("1021"));
        assert_eq!(record.country_rank.as_deref(), Some("87"));
    }

    #[tokio::test]
    async fn test_regex_fallback_derives_stars() {
        let html = r#"<html><body><script>window.state = {"currentRating": 1450};</script></body></html>"#;
        let transport = Arc::new(ScriptedTransport::new().on(PAGE, Reply::ok(html)));
        let outcome = resolver(transport).resolve("chef").await;

        let record = chef(&outcome);
        assert_eq!(record.rating, RatingValue::Rated(1450));
        assert_eq!(record.stars, 3);
        assert_eq!(record.global_rank, None);
    }

    #[tokio::test]
    async fn test_page_not_found_is_user_not_found() {
        let html = "<html><head><title>Page Not Found | CodeChef</title></head></html>";
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PAGE, Reply::ok(html))
                .on(MIRROR, Reply::ok(r#"{"currentRating":1500}"#)),
        );
        let outcome = resolver(transport.clone()).resolve("chef").await;

        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
        assert_eq!(transport.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_http_404_skips_mirror() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PAGE, Reply::status(404, ""))
                .on(MIRROR, Reply::ok(r#"{"currentRating":1500}"#)),
        );
        let outcome = resolver(transport.clone()).resolve("chef").await;

        assert_eq!(outcome, ResolutionOutcome::UserNotFound);
        assert_eq!(transport.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_profile_without_rating_is_unrated() {
        let html = r#"<html><body><div class="user-details-container"><h1>chef</h1></div></body></html>"#;
        let transport = Arc::new(ScriptedTransport::new().on(PAGE, Reply::ok(html)));
        let outcome = resolver(transport.clone()).resolve("chef").await;

        assert_eq!(
            outcome,
            ResolutionOutcome::Success(RatingRecord::CodeChef(CodeChefRating::unrated("chef")))
        );
        assert_eq!(transport.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_unrecognised_page_falls_back_to_mirror() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PAGE, Reply::ok("<html><body>Just a moment...</body></html>"))
                .on(
                    MIRROR,
                    Reply::ok(r#"{"success":true,"currentRating":1834,"stars":"4★","globalRank":5231,"countryRank":"N/A"}"#),
                ),
        );
        let outcome = resolver(transport).resolve("chef").await;

        let record = chef(&outcome);
        assert_eq!(record.rating, RatingValue::Rated(1834));
        assert_eq!(record.stars, 4);
        assert_eq!(record.global_rank.as_deref(), Some("5231"));
        assert_eq!(record.country_rank, None);
    }

    #[tokio::test]
    async fn test_everything_failing_degrades_to_unrated() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PAGE, Reply::timeout())
                .on(MIRROR, Reply::ok(r#"{"success":false,"error":"rate limited"}"#)),
        );
        let outcome = resolver(transport).resolve("chef").await;

        assert_eq!(
            outcome,
            ResolutionOutcome::Success(RatingRecord::unrated(Platform::CodeChef, "chef"))
        );
    }
}
