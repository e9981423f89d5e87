use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logger::AccessLog;

/// Default cap for captured request and response bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8192;

/// Operational and static-asset endpoints that are not worth an access log line.
pub const DEFAULT_SKIP_PATTERNS: &[&str] = &[
    "/health",
    "/info",
    "/autoconfig",
    "/env",
    "/configprops",
    "/dump",
    "/mappings",
    "/trace",
    r"/hystrix\.stream",
    "/metrics.*",
    "/api-docs.*",
    "/swagger.*",
    r"/favicon\.ico",
    r".*\.(png|css|js|html)",
];

/// Settings for the [`AccessLog`] middleware.
///
/// The struct is plain data so it can be deserialized from whatever
/// configuration source the host application uses. Missing fields take their
/// [`Default`] values. Call [`build`](AccessLogConfig::build) once at startup to
/// validate it.
///
/// # Examples
/// ```rust
/// use actix_web_middleware_accesslog::AccessLogConfig;
///
/// let access_log = AccessLogConfig::default()
///     .include_response_body(false)
///     .max_request_body_bytes(1024)
///     .skip_pattern("/internal/.*")
///     .build()
///     .unwrap();
///
/// assert!(access_log.should_skip("/internal/jobs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Capture the request payload consumed by downstream handlers.
    pub include_request_body: bool,
    /// Capture the response body for textual content types.
    pub include_response_body: bool,
    pub max_request_body_bytes: usize,
    pub max_response_body_bytes: usize,
    /// Paths excluded by exact comparison.
    pub skip_paths: Vec<String>,
    /// Regular expressions a path must match in full to be excluded.
    pub skip_patterns: Vec<String>,
    /// Header carrying the request id. A UUID is generated when the header is absent.
    pub request_id_header: Option<String>,
    /// Target of emitted records. Defaults to `actix_web_middleware_accesslog::logger`.
    pub log_target: Option<String>,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        AccessLogConfig {
            include_request_body: true,
            include_response_body: true,
            max_request_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_response_body_bytes: DEFAULT_MAX_BODY_BYTES,
            skip_paths: Vec::new(),
            skip_patterns: DEFAULT_SKIP_PATTERNS
                .iter()
                .map(|pattern| pattern.to_string())
                .collect(),
            request_id_header: None,
            log_target: None,
        }
    }
}

impl AccessLogConfig {
    pub fn include_request_body(mut self, enabled: bool) -> Self {
        self.include_request_body = enabled;
        self
    }

    pub fn include_response_body(mut self, enabled: bool) -> Self {
        self.include_response_body = enabled;
        self
    }

    pub fn max_request_body_bytes(mut self, limit: usize) -> Self {
        self.max_request_body_bytes = limit;
        self
    }

    pub fn max_response_body_bytes(mut self, limit: usize) -> Self {
        self.max_response_body_bytes = limit;
        self
    }

    /// Ignore and do not log access info for the specified path.
    pub fn skip_path<T: Into<String>>(mut self, path: T) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    /// Ignore and do not log access info for paths that fully match `pattern`.
    pub fn skip_pattern<T: Into<String>>(mut self, pattern: T) -> Self {
        self.skip_patterns.push(pattern.into());
        self
    }

    /// Drop the built-in skip patterns, including any added so far.
    pub fn clear_skip_patterns(mut self) -> Self {
        self.skip_patterns.clear();
        self
    }

    pub fn request_id_header<T: Into<String>>(mut self, header: T) -> Self {
        self.request_id_header = Some(header.into());
        self
    }

    /// Sets the logging target of emitted records.
    ///
    /// # Examples
    /// Using `.log_target("http_access")` would have this effect on request logs:
    /// ```diff
    /// - [2015-10-21T07:28:00Z INFO  actix_web_middleware_accesslog::logger] GET /api/users 200 3ms
    /// + [2015-10-21T07:28:00Z INFO  http_access] GET /api/users 200 3ms
    ///                               ^^^^^^^^^^^
    /// ```
    pub fn log_target<T: Into<String>>(mut self, target: T) -> Self {
        self.log_target = Some(target.into());
        self
    }

    /// Validate the settings and create the middleware.
    pub fn build(self) -> Result<AccessLog, ConfigError> {
        AccessLog::new(self)
    }
}
