use actix_web::http::header::InvalidHeaderName;
use thiserror::Error;

/// Errors raised while validating an [`AccessLogConfig`](crate::AccessLogConfig).
///
/// These are startup errors: a host that cannot build its [`AccessLog`](crate::AccessLog)
/// should refuse to start rather than run with exclusions that never match.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid skip pattern `{pattern}`: {source}")]
    InvalidSkipPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid request id header `{name}`: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },
}
