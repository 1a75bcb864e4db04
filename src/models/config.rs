//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::{AppError, Result};
use crate::models::Platform;

/// Placeholder substituted with the encoded username in source templates.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and retry settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-platform data sources
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// Rating cache persistence
    #[serde(default)]
    pub cache: CacheConfig,

    /// Focus-mode allow-list
    #[serde(default)]
    pub focus: FocusConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Sources configured for a platform.
    pub fn source(&self, platform: Platform) -> &SourceConfig {
        self.platforms.get(platform)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.max_retries > 5 {
            return Err(AppError::validation("http.max_retries must be <= 5"));
        }
        for platform in Platform::ALL {
            let source = self.source(platform);
            if source.timeout_ms == 0 {
                return Err(AppError::validation(format!(
                    "platforms.{platform}.timeout_ms must be > 0"
                )));
            }
            url::Url::parse(&SourceConfig::expand(&source.primary, "probe"))?;
            for template in &source.mirrors {
                if !template.contains(USERNAME_PLACEHOLDER) {
                    return Err(AppError::validation(format!(
                        "platforms.{platform}: mirror '{template}' has no {USERNAME_PLACEHOLDER}"
                    )));
                }
                url::Url::parse(&SourceConfig::expand(template, "probe"))?;
            }
        }
        if self.cache.path.trim().is_empty() {
            return Err(AppError::validation("cache.path is empty"));
        }
        Ok(())
    }
}

/// HTTP client and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Extra attempts after the first one fails
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Backoff before retry `i` is `backoff_base_ms * 2^i`
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            max_retries: defaults::max_retries(),
            backoff_base_ms: defaults::backoff_base(),
        }
    }
}

/// Source list for every platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default = "defaults::codeforces")]
    pub codeforces: SourceConfig,

    #[serde(default = "defaults::codechef")]
    pub codechef: SourceConfig,

    #[serde(default = "defaults::leetcode")]
    pub leetcode: SourceConfig,

    #[serde(default = "defaults::atcoder")]
    pub atcoder: SourceConfig,
}

impl PlatformsConfig {
    pub fn get(&self, platform: Platform) -> &SourceConfig {
        match platform {
            Platform::Codeforces => &self.codeforces,
            Platform::CodeChef => &self.codechef,
            Platform::LeetCode => &self.leetcode,
            Platform::AtCoder => &self.atcoder,
        }
    }
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            codeforces: defaults::codeforces(),
            codechef: defaults::codechef(),
            leetcode: defaults::leetcode(),
            atcoder: defaults::atcoder(),
        }
    }
}

/// Ordered data sources for one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "defaults::timeout")]
    pub timeout_ms: u64,

    /// Authoritative source URL (template, or a fixed endpoint for GraphQL)
    pub primary: String,

    /// Third-party mirrors, in declining trust
    #[serde(default)]
    pub mirrors: Vec<String>,
}

impl SourceConfig {
    pub fn new(timeout_ms: u64, primary: impl Into<String>) -> Self {
        Self {
            timeout_ms,
            primary: primary.into(),
            mirrors: Vec::new(),
        }
    }

    pub fn with_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirrors.push(mirror.into());
        self
    }

    /// Expand a template for a username.
    ///
    /// The username is percent-encoded so it is safe in both path and
    /// query positions.
    pub fn expand(template: &str, username: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(username.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        template.replace(USERNAME_PLACEHOLDER, &encoded)
    }
}

/// Rating cache persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// JSON file backing the rating cache
    #[serde(default = "defaults::cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: defaults::cache_path(),
        }
    }
}

/// Focus-mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Whether navigation is restricted to the allow-list
    #[serde(default)]
    pub enabled: bool,

    /// Domains allowed in addition to the built-in list
    #[serde(default)]
    pub custom_domains: Vec<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when neither `--verbose` nor `RUST_LOG` is given
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use super::SourceConfig;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn backoff_base() -> u64 {
        1000
    }
    pub fn timeout() -> u64 {
        10_000
    }

    // Platform sources
    pub fn codeforces() -> SourceConfig {
        SourceConfig::new(8_000, "https://codeforces.com/api/user.info?handles={username}")
    }
    pub fn codechef() -> SourceConfig {
        SourceConfig::new(15_000, "https://www.codechef.com/users/{username}")
            .with_mirror("https://codechef-api.vercel.app/handle/{username}")
    }
    pub fn leetcode() -> SourceConfig {
        // GraphQL endpoint; the username travels in the POST body.
        SourceConfig::new(10_000, "https://leetcode.com/graphql")
            .with_mirror("https://alfa-leetcode-api.onrender.com/{username}/contest")
    }
    pub fn atcoder() -> SourceConfig {
        SourceConfig::new(10_000, "https://atcoder.jp/users/{username}/history/json")
            .with_mirror("https://kenkoooo.com/atcoder/atcoder-api/v2/user_info?user={username}")
    }

    // Cache defaults
    pub fn cache_path() -> String {
        "data/rating_cache.json".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
