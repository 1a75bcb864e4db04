//! Normalized rating records.
//!
//! Every resolver produces one [`RatingRecord`] variant. Rating values are a
//! tagged union instead of the `"Unrated"` / `"N/A"` strings the upstream
//! sites use, so nothing downstream string-matches on a rating. The serde
//! representation still emits those strings for display clients.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::Platform;

/// Placeholder rendered for absent ranks and ratings.
pub const NOT_AVAILABLE: &str = "N/A";

/// A rating that may legitimately be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingValue {
    /// A numeric rating.
    Rated(i64),
    /// The user exists but has no rating.
    Unrated,
    /// The value has no meaning for this record (e.g. max of an empty history).
    NotApplicable,
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingValue::Rated(value) => write!(f, "{value}"),
            RatingValue::Unrated => f.write_str("Unrated"),
            RatingValue::NotApplicable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for RatingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RatingValue::Rated(value) => serializer.serialize_i64(*value),
            RatingValue::Unrated => serializer.serialize_str("Unrated"),
            RatingValue::NotApplicable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for RatingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(value) => RatingValue::Rated(value),
            Raw::Text(text) if text == NOT_AVAILABLE => RatingValue::NotApplicable,
            Raw::Text(text) => match text.trim().parse::<i64>() {
                Ok(value) => RatingValue::Rated(value),
                Err(_) => RatingValue::Unrated,
            },
        })
    }
}

/// Serde helper: `None` is written as `"N/A"` and read back from it.
mod not_available {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::NOT_AVAILABLE;

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(NOT_AVAILABLE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Number(value)) => Some(value.to_string()),
            Some(Raw::Text(text)) if text != NOT_AVAILABLE && !text.is_empty() => Some(text),
            _ => None,
        })
    }
}

/// Serde helper for CodeChef: a rated value is written as a decimal string.
mod text_rating {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::RatingValue;

    pub fn serialize<S: Serializer>(value: &RatingValue, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            RatingValue::Rated(rating) => serializer.collect_str(rating),
            other => other.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RatingValue, D::Error> {
        RatingValue::deserialize(deserializer)
    }
}

/// Serde helper for LeetCode: unrated is written as lowercase `"unrated"`.
mod lowercase_unrated {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::RatingValue;

    pub fn serialize<S: Serializer>(value: &RatingValue, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            RatingValue::Unrated => serializer.serialize_str("unrated"),
            other => other.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RatingValue, D::Error> {
        RatingValue::deserialize(deserializer)
    }
}

/// AtCoder color tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtCoderColor {
    Gray,
    Brown,
    Green,
    Cyan,
    Blue,
    Yellow,
    Orange,
    Red,
}

/// CodeChef star tier for a numeric rating.
///
/// | rating | stars |
/// |--------|-------|
/// | ≥ 2500 | 7 |
/// | ≥ 2200 | 6 |
/// | ≥ 1900 | 5 |
/// | ≥ 1600 | 4 |
/// | ≥ 1400 | 3 |
/// | ≥ 1200 | 2 |
/// | ≥ 1000 | 1 |
/// | else   | 0 |
pub fn stars_from_rating(rating: i64) -> u8 {
    const BREAKPOINTS: [(i64, u8); 7] = [
        (2500, 7),
        (2200, 6),
        (1900, 5),
        (1600, 4),
        (1400, 3),
        (1200, 2),
        (1000, 1),
    ];

    BREAKPOINTS
        .iter()
        .find(|(floor, _)| rating >= *floor)
        .map_or(0, |(_, stars)| *stars)
}

/// AtCoder color tier for a numeric rating.
pub fn atcoder_color(rating: i64) -> AtCoderColor {
    const BREAKPOINTS: [(i64, AtCoderColor); 7] = [
        (3200, AtCoderColor::Red),
        (2800, AtCoderColor::Orange),
        (2400, AtCoderColor::Yellow),
        (2000, AtCoderColor::Blue),
        (1600, AtCoderColor::Cyan),
        (1200, AtCoderColor::Green),
        (800, AtCoderColor::Brown),
    ];

    BREAKPOINTS
        .iter()
        .find(|(floor, _)| rating >= *floor)
        .map_or(AtCoderColor::Gray, |(_, color)| *color)
}

/// Codeforces profile rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesRating {
    pub rating: RatingValue,
    pub max_rating: RatingValue,
    pub rank: String,
    pub handle: String,
}

/// CodeChef profile rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChefRating {
    #[serde(with = "text_rating")]
    pub rating: RatingValue,
    /// Star tier, 0 to 7
    pub stars: u8,
    #[serde(with = "not_available")]
    pub global_rank: Option<String>,
    #[serde(with = "not_available")]
    pub country_rank: Option<String>,
    pub username: String,
}

impl CodeChefRating {
    pub fn unrated(username: &str) -> Self {
        Self {
            rating: RatingValue::Unrated,
            stars: 0,
            global_rank: None,
            country_rank: None,
            username: username.to_string(),
        }
    }
}

/// LeetCode contest rating and solve count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeRating {
    /// Contest rating; `Unrated` when the user never entered a rated contest
    #[serde(with = "lowercase_unrated")]
    pub rating: RatingValue,
    pub total_solved: u64,
    #[serde(with = "not_available")]
    pub ranking: Option<String>,
    #[serde(with = "not_available")]
    pub acceptance_rate: Option<String>,
    pub username: String,
}

impl LeetCodeRating {
    pub fn unrated(username: &str) -> Self {
        Self {
            rating: RatingValue::Unrated,
            total_solved: 0,
            ranking: None,
            acceptance_rate: None,
            username: username.to_string(),
        }
    }
}

/// AtCoder rating derived from contest history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtCoderRating {
    pub rating: RatingValue,
    pub max_rating: RatingValue,
    pub color: AtCoderColor,
    pub username: String,
}

impl AtCoderRating {
    pub fn unrated(username: &str) -> Self {
        Self {
            rating: RatingValue::Unrated,
            max_rating: RatingValue::NotApplicable,
            color: AtCoderColor::Gray,
            username: username.to_string(),
        }
    }

    /// Build from a rating history (oldest first). Returns the unrated
    /// record for an empty history.
    pub fn from_history(username: &str, history: &[i64]) -> Self {
        match (history.last(), history.iter().max()) {
            (Some(&current), Some(&max)) => Self {
                rating: RatingValue::Rated(current),
                max_rating: RatingValue::Rated(max),
                color: atcoder_color(current),
                username: username.to_string(),
            },
            _ => Self::unrated(username),
        }
    }
}

/// A resolved rating, tagged by platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum RatingRecord {
    Codeforces(CodeforcesRating),
    CodeChef(CodeChefRating),
    LeetCode(LeetCodeRating),
    AtCoder(AtCoderRating),
}

impl RatingRecord {
    /// The unrated record a platform degrades to when every source fails.
    pub fn unrated(platform: Platform, username: &str) -> Self {
        match platform {
            Platform::Codeforces => RatingRecord::Codeforces(CodeforcesRating {
                rating: RatingValue::Unrated,
                max_rating: RatingValue::Unrated,
                rank: "unrated".to_string(),
                handle: username.to_string(),
            }),
            Platform::CodeChef => RatingRecord::CodeChef(CodeChefRating::unrated(username)),
            Platform::LeetCode => RatingRecord::LeetCode(LeetCodeRating::unrated(username)),
            Platform::AtCoder => RatingRecord::AtCoder(AtCoderRating::unrated(username)),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            RatingRecord::Codeforces(_) => Platform::Codeforces,
            RatingRecord::CodeChef(_) => Platform::CodeChef,
            RatingRecord::LeetCode(_) => Platform::LeetCode,
            RatingRecord::AtCoder(_) => Platform::AtCoder,
        }
    }

    /// Current rating, whatever the platform.
    pub fn rating(&self) -> RatingValue {
        match self {
            RatingRecord::Codeforces(r) => r.rating,
            RatingRecord::CodeChef(r) => r.rating,
            RatingRecord::LeetCode(r) => r.rating,
            RatingRecord::AtCoder(r) => r.rating,
        }
    }
}

impl fmt::Display for RatingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingRecord::Codeforces(r) => write!(
                f,
                "{} on Codeforces: {} (max {}, {})",
                r.handle, r.rating, r.max_rating, r.rank
            ),
            RatingRecord::CodeChef(r) => write!(
                f,
                "{} on CodeChef: {} ({}★, global {}, country {})",
                r.username,
                r.rating,
                r.stars,
                r.global_rank.as_deref().unwrap_or(NOT_AVAILABLE),
                r.country_rank.as_deref().unwrap_or(NOT_AVAILABLE)
            ),
            RatingRecord::LeetCode(r) => write!(
                f,
                "{} on LeetCode: {} ({} solved, ranking {})",
                r.username,
                r.rating,
                r.total_solved,
                r.ranking.as_deref().unwrap_or(NOT_AVAILABLE)
            ),
            RatingRecord::AtCoder(r) => write!(
                f,
                "{} on AtCoder: {} (max {}, {:?})",
                r.username, r.rating, r.max_rating, r.color
            ),
        }
    }
}
