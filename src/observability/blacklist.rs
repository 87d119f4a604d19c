//! Log blacklist.
//!
//! Request paths matching any configured pattern (health checks, polling
//! endpoints) are exempt from verbose request/response logging. The filter
//! never rejects a request.

use regex::Regex;

/// Compiled, ordered set of path patterns exempt from verbose logging.
#[derive(Debug, Clone, Default)]
pub struct LogBlacklist {
    patterns: Vec<Regex>,
}

impl LogBlacklist {
    /// Compile the given patterns, failing on the first invalid one.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if any pattern matches somewhere in `path`.
    pub fn is_blacklisted(&self, path: &str) -> bool {
        is_path_blacklisted(&self.patterns, path)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Unanchored match of `path` against each pattern in order.
pub fn is_path_blacklisted(patterns: &[Regex], path: &str) -> bool {
    patterns.iter().any(|p| p.is_match(path))
}

/// Split the comma-separated `WEBSERVER_LOG_BLACKLIST` form into patterns.
///
/// The empty string yields an empty list.
pub fn parse_log_blacklist(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_blacklist() {
        assert!(parse_log_blacklist("").is_empty());
        assert_eq!(parse_log_blacklist("/health"), vec!["/health"]);
        assert_eq!(
            parse_log_blacklist("/health,/metrics"),
            vec!["/health", "/metrics"]
        );
    }

    #[test]
    fn test_plain_pattern_matches_substring() {
        let blacklist = LogBlacklist::new(["/health"]).unwrap();
        assert!(blacklist.is_blacklisted("/health"));
        assert!(blacklist.is_blacklisted("/api/health"));
        assert!(!blacklist.is_blacklisted("/status"));
    }

    #[test]
    fn test_anchored_pattern() {
        let blacklist = LogBlacklist::new(["/health$", "/currencies/[a-zA-Z]{3}$"]).unwrap();
        assert!(blacklist.is_blacklisted("/health"));
        assert!(!blacklist.is_blacklisted("/healthcheck-other"));
        assert!(blacklist.is_blacklisted("/currencies/EUR"));
        assert!(!blacklist.is_blacklisted("/currencies/EURO"));
        assert!(!blacklist.is_blacklisted("/currencies/EU"));
    }

    #[test]
    fn test_empty_blacklist_matches_nothing() {
        let blacklist = LogBlacklist::default();
        assert!(blacklist.is_empty());
        assert!(!blacklist.is_blacklisted("/anything"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(LogBlacklist::new(["[unclosed"]).is_err());
    }
}
