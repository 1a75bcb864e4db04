//! Supported judge platforms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A competitive-programming platform with a rating resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Codeforces,
    CodeChef,
    LeetCode,
    AtCoder,
}

impl Platform {
    /// All platforms, in display order.
    pub const ALL: [Platform; 4] = [
        Platform::Codeforces,
        Platform::CodeChef,
        Platform::LeetCode,
        Platform::AtCoder,
    ];

    /// Lowercase wire tag (`"codeforces"`, `"codechef"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Codeforces => "codeforces",
            Platform::CodeChef => "codechef",
            Platform::LeetCode => "leetcode",
            Platform::AtCoder => "atcoder",
        }
    }

    /// Human-readable platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Codeforces => "Codeforces",
            Platform::CodeChef => "CodeChef",
            Platform::LeetCode => "LeetCode",
            Platform::AtCoder => "AtCoder",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "codeforces" => Ok(Platform::Codeforces),
            "codechef" => Ok(Platform::CodeChef),
            "leetcode" => Ok(Platform::LeetCode),
            "atcoder" => Ok(Platform::AtCoder),
            _ => Err(AppError::UnsupportedPlatform(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CodeForces".parse::<Platform>().unwrap(), Platform::Codeforces);
        assert_eq!(" atcoder ".parse::<Platform>().unwrap(), Platform::AtCoder);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "topcoder".parse::<Platform>().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedPlatform(tag) if tag == "topcoder"));
    }

    #[test]
    fn test_tag_round_trips_through_display() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string().parse::<Platform>().unwrap(), platform);
        }
    }
}
