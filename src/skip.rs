use std::collections::HashSet;

use regex::Regex;

use crate::error::ConfigError;

/// Decides which paths bypass the access log.
#[derive(Debug)]
pub(crate) struct SkipMatcher {
    paths: HashSet<String>,
    patterns: Vec<Regex>,
}

impl SkipMatcher {
    pub(crate) fn new<P, R>(paths: P, patterns: R) -> Result<Self, ConfigError>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| compile_full_match(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SkipMatcher {
            paths: paths.into_iter().map(Into::into).collect(),
            patterns,
        })
    }

    /// Patterns are tried in configuration order; the first match wins.
    pub(crate) fn is_match(&self, path: &str) -> bool {
        self.paths.contains(path) || self.patterns.iter().any(|r| r.is_match(path))
    }
}

fn compile_full_match(pattern: &str) -> Result<Regex, ConfigError> {
    let invalid = |source| ConfigError::InvalidSkipPattern {
        pattern: pattern.to_string(),
        source,
    };

    // must stand alone, otherwise `a)|(b` would compile once anchored
    Regex::new(pattern).map_err(invalid)?;
    Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SKIP_PATTERNS;

    fn defaults() -> SkipMatcher {
        SkipMatcher::new(Vec::<String>::new(), DEFAULT_SKIP_PATTERNS).unwrap()
    }

    #[test]
    fn test_default_patterns_skip_operational_paths() {
        let matcher = defaults();
        for path in [
            "/health",
            "/info",
            "/env",
            "/configprops",
            "/mappings",
            "/trace",
            "/hystrix.stream",
            "/metrics",
            "/metrics/jvm",
            "/api-docs/v3",
            "/swagger-ui/index.html",
            "/favicon.ico",
            "/static/logo.png",
            "/assets/app.js",
            "/theme.css",
            "/index.html",
        ] {
            assert!(matcher.is_match(path), "{path} should be skipped");
        }
    }

    #[test]
    fn test_patterns_require_full_match() {
        let matcher = defaults();
        for path in [
            "/api/users",
            "/healthz",
            "/api/health",
            "/favicon.icon",
            "/hystrix-stream",
            "/api/env",
            "/app.json",
            "/v1/info/details",
        ] {
            assert!(!matcher.is_match(path), "{path} should be logged");
        }
    }

    #[test]
    fn test_exact_paths() {
        let matcher = SkipMatcher::new(["/ping"], Vec::<String>::new()).unwrap();
        assert!(matcher.is_match("/ping"));
        assert!(!matcher.is_match("/ping/"));
        assert!(!matcher.is_match("/pinger"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = SkipMatcher::new(Vec::<String>::new(), ["/ok", "/broken["]).unwrap_err();
        match err {
            ConfigError::InvalidSkipPattern { pattern, .. } => assert_eq!(pattern, "/broken["),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pattern_cannot_escape_anchors() {
        let err = SkipMatcher::new(Vec::<String>::new(), ["/a)|(/b"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSkipPattern { .. }));
    }
}
