//! Resolution outcomes and the request/response message pair.

use serde::{Deserialize, Serialize};

use crate::models::RatingRecord;

/// Class of a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Connectivity failure (DNS, refused, reset)
    Network,
    /// An attempt exceeded its time budget
    Timeout,
    /// Anything else: bad status, malformed or unrecognised payload
    Api,
}

/// Result of resolving one `(platform, username)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum ResolutionOutcome {
    Success(RatingRecord),
    UserNotFound,
    NetworkError(String),
    TimeoutError(String),
    ApiError(String),
    UnsupportedPlatform(String),
}

impl ResolutionOutcome {
    /// Build the failure outcome for a classified fault.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FailureKind::Network => ResolutionOutcome::NetworkError(message),
            FailureKind::Timeout => ResolutionOutcome::TimeoutError(message),
            FailureKind::Api => ResolutionOutcome::ApiError(message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionOutcome::Success(_))
    }

    /// Only successes are cached; failures must be retried on the next call.
    pub fn is_cacheable(&self) -> bool {
        self.is_success()
    }

    pub fn record(&self) -> Option<&RatingRecord> {
        match self {
            ResolutionOutcome::Success(record) => Some(record),
            _ => None,
        }
    }

    /// Failure class, if this is a failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ResolutionOutcome::Success(_) | ResolutionOutcome::UserNotFound => None,
            ResolutionOutcome::NetworkError(_) => Some(FailureKind::Network),
            ResolutionOutcome::TimeoutError(_) => Some(FailureKind::Timeout),
            ResolutionOutcome::ApiError(_) | ResolutionOutcome::UnsupportedPlatform(_) => {
                Some(FailureKind::Api)
            }
        }
    }

    /// User-facing message for anything that is not a success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ResolutionOutcome::Success(_) => None,
            ResolutionOutcome::UserNotFound => Some("User not found".to_string()),
            ResolutionOutcome::NetworkError(detail) => Some(format!("Network error: {detail}")),
            ResolutionOutcome::TimeoutError(detail) => Some(format!("Request timeout: {detail}")),
            ResolutionOutcome::ApiError(detail) => Some(format!("API error: {detail}")),
            ResolutionOutcome::UnsupportedPlatform(tag) => {
                Some(format!("Unsupported platform: {tag}"))
            }
        }
    }
}

/// Incoming rating request from a display client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub platform: String,
    pub username: String,
}

/// Response to a [`RatingRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingResponse {
    pub success: bool,
    pub data: ResolutionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ResolutionOutcome> for RatingResponse {
    fn from(outcome: ResolutionOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            error: outcome.error_message(),
            data: outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, RatingRecord};

    #[test]
    fn test_only_success_is_cacheable() {
        let success = ResolutionOutcome::Success(RatingRecord::unrated(Platform::AtCoder, "a"));
        assert!(success.is_cacheable());

        for outcome in [
            ResolutionOutcome::UserNotFound,
            ResolutionOutcome::NetworkError("reset".into()),
            ResolutionOutcome::TimeoutError("8s".into()),
            ResolutionOutcome::ApiError("HTTP 500".into()),
        ] {
            assert!(!outcome.is_cacheable(), "{outcome:?}");
        }
    }

    #[test]
    fn test_failure_kind_round_trips_through_failure() {
        for kind in [FailureKind::Network, FailureKind::Timeout, FailureKind::Api] {
            assert_eq!(ResolutionOutcome::failure(kind, "x").failure_kind(), Some(kind));
        }
        assert_eq!(ResolutionOutcome::UserNotFound.failure_kind(), None);
        assert_eq!(
            ResolutionOutcome::UnsupportedPlatform("topcoder".into()).failure_kind(),
            Some(FailureKind::Api)
        );
    }

    #[test]
    fn test_not_found_is_distinct_from_unrated() {
        let unrated = ResolutionOutcome::Success(RatingRecord::unrated(Platform::LeetCode, "x"));
        assert!(unrated.error_message().is_none());
        assert_eq!(
            ResolutionOutcome::UserNotFound.error_message().as_deref(),
            Some("User not found")
        );
    }

    #[test]
    fn test_response_from_failure() {
        let response = RatingResponse::from(ResolutionOutcome::TimeoutError("10s".into()));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Request timeout: 10s"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["data"]["status"], "timeoutError");
    }

    #[test]
    fn test_response_from_success_omits_error() {
        let record = RatingRecord::unrated(Platform::Codeforces, "tourist");
        let response = RatingResponse::from(ResolutionOutcome::Success(record));
        assert!(response.success);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["data"]["detail"]["platform"], "codeforces");
    }
}
