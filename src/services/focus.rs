//! Focus-mode allow-list.
//!
//! While focus mode is on, only coding, learning and search sites are
//! reachable. The decision is a pure function of the hostname and the
//! [`FocusConfig`]; there is no global mode state.

use crate::models::FocusConfig;
use crate::utils::get_domain;

/// Sites allowed in focus mode without any configuration.
pub const ALLOWED_DOMAINS: &[&str] = &[
    // Search
    "google.com",
    "bing.com",
    "duckduckgo.com",
    "yandex.com",
    "baidu.com",
    "search.brave.com",
    // Judges and practice
    "codeforces.com",
    "codechef.com",
    "leetcode.com",
    "atcoder.jp",
    "hackerrank.com",
    "topcoder.com",
    "codewars.com",
    "exercism.org",
    "maang.in",
    // Learning
    "geeksforgeeks.org",
    "w3schools.com",
    "youtube.com",
    "freecodecamp.org",
    "codecademy.com",
    "edx.org",
    "coursera.org",
    "udemy.com",
    "khanacademy.org",
    "pluralsight.com",
    "lynda.com",
    "tutorialspoint.com",
    "javatpoint.com",
    "programiz.com",
    "cplusplus.com",
    // Documentation
    "python.org",
    "developer.mozilla.org",
    "javascript.info",
    "nodejs.org",
    "reactjs.org",
    "vuejs.org",
    "angular.io",
    "jquery.com",
    "bootstrap.com",
    "tailwindcss.com",
    "sass-lang.com",
    "lesscss.org",
    "webpack.js.org",
    "babeljs.io",
    "eslint.org",
    "prettier.io",
    "npmjs.com",
    "yarnpkg.com",
    "git-scm.com",
    "docker.com",
    "kubernetes.io",
    "mongodb.com",
    "mysql.com",
    "postgresql.org",
    "sqlite.org",
    "redis.io",
    "elastic.co",
    "apache.org",
    "nginx.org",
    "jenkins.io",
    // Code hosting and Q&A
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "stackoverflow.com",
    // Cloud
    "aws.amazon.com",
    "cloud.google.com",
    "azure.microsoft.com",
    "firebase.google.com",
    "heroku.com",
    "netlify.com",
    "vercel.com",
    "travis-ci.org",
    "circleci.com",
    // Online editors and compilers
    "replit.com",
    "codepen.io",
    "jsfiddle.net",
    "jsbin.com",
    "codesandbox.io",
    "stackblitz.com",
    "glitch.com",
    "trinket.io",
    "ideone.com",
    "onlinegdb.com",
    "paiza.io",
    "tio.run",
    "wandbox.org",
];

const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Whether navigation to `hostname` is allowed under `config`.
///
/// A host matches a domain when it is that domain or one of its
/// subdomains. Matching ignores case and a trailing dot.
pub fn is_allowed(hostname: &str, config: &FocusConfig) -> bool {
    if !config.enabled {
        return true;
    }

    let host = normalize(hostname);
    if host.is_empty() {
        return false;
    }
    if LOCAL_HOSTS.contains(&host.as_str()) {
        return true;
    }

    ALLOWED_DOMAINS
        .iter()
        .copied()
        .chain(config.custom_domains.iter().map(String::as_str))
        .map(normalize)
        .any(|domain| matches_domain(&host, &domain))
}

/// Hostname of a URL or bare host input (`https://a.b/c`, `a.b/c`, `a.b`).
pub fn host_of(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    get_domain(input)
        .or_else(|| get_domain(&format!("https://{input}")))
        .map(|host| normalize(&host))
        .filter(|host| !host.is_empty())
}

fn normalize(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn matches_domain(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focus(custom: &[&str]) -> FocusConfig {
        FocusConfig {
            enabled: true,
            custom_domains: custom.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_disabled_allows_everything() {
        assert!(is_allowed("reddit.com", &FocusConfig::default()));
    }

    #[test]
    fn test_builtin_domains_and_subdomains() {
        let config = focus(&[]);
        assert!(is_allowed("codeforces.com", &config));
        assert!(is_allowed("www.codeforces.com", &config));
        assert!(is_allowed("Docs.Python.org.", &config));
        assert!(!is_allowed("reddit.com", &config));
    }

    #[test]
    fn test_lookalike_hosts_are_rejected() {
        let config = focus(&[]);
        assert!(!is_allowed("google.com.evil.io", &config));
        assert!(!is_allowed("notgithub.com", &config));
        assert!(!is_allowed("", &config));
    }

    #[test]
    fn test_local_and_custom_hosts() {
        let config = focus(&["Internal.Example.org", ""]);
        assert!(is_allowed("localhost", &config));
        assert!(is_allowed("127.0.0.1", &config));
        assert!(is_allowed("wiki.internal.example.org", &config));
        assert!(!is_allowed("example.org", &config));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://www.codechef.com/users/chef"),
            Some("www.codechef.com".to_string())
        );
        assert_eq!(host_of("LeetCode.com/problems/two-sum"), Some("leetcode.com".to_string()));
        assert_eq!(host_of("atcoder.jp"), Some("atcoder.jp".to_string()));
        assert_eq!(host_of("   "), None);
    }
}
