//! Actix-web middleware for access logs with request and response bodies.
//!
//! Every request that is not excluded produces exactly one record with the
//! method, path, status and elapsed milliseconds, plus a bounded copy of the
//! request and response bodies when enabled. Records are written through the
//! standard `log` crate with key-values, so any `log` backend can be used.
//!
//! # Examples:
//! ```bash
//! cargo add actix-web-middleware-accesslog
//! ```
//! Example usage with the `structured_logger` crate:
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use actix_web_middleware_accesslog::AccessLogConfig;
//! use structured_logger::{Builder, async_json::new_writer};
//!
//! #[actix_web::main] // or #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Builder::new()
//!         .with_target_writer("*", new_writer(tokio::io::stdout()))
//!         .init();
//!
//!     // validate once at startup, every worker shares the result
//!     let access_log = AccessLogConfig::default()
//!         .max_request_body_bytes(4096)
//!         .skip_pattern("/internal/.*")
//!         .build()
//!         .expect("invalid access log configuration");
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(access_log.clone())
//!             .route("/", web::post().to(|body: String| async move { body }))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```
//! ## `tracing-request-id` feature adds the request id set by `TracingLogger`.
//! ```bash
//! cargo add actix-web-middleware-accesslog --features tracing-request-id
//! ```
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use actix_web_middleware_accesslog::AccessLog;
//! use tracing_actix_web::TracingLogger;
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(AccessLog::default())
//!             .wrap(TracingLogger::default())
//!             .route("/", web::get().to(|| async { "Hello world!" }))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! # Configuration
//!
//! [`AccessLogConfig`] derives `serde::Deserialize`, so it can be embedded in
//! the host application's own settings. Missing fields keep their defaults:
//!
//! | field                     | default                      |
//! |---------------------------|------------------------------|
//! | `include_request_body`    | `true`                       |
//! | `include_response_body`   | `true`                       |
//! | `max_request_body_bytes`  | `8192`                       |
//! | `max_response_body_bytes` | `8192`                       |
//! | `skip_paths`              | empty                        |
//! | `skip_patterns`           | [`DEFAULT_SKIP_PATTERNS`]    |
//! | `request_id_header`       | none                         |
//! | `log_target`              | [`DEFAULT_LOG_TARGET`]       |
//!
//! ## Path Exclusions
//!
//! Skip patterns are regular expressions that must match the whole path, so
//! `/health` skips `/health` but not `/healthz`:
//!
//! ```rust
//! use actix_web_middleware_accesslog::AccessLogConfig;
//!
//! let logger = AccessLogConfig::default()
//!     .skip_path("/ping")
//!     .skip_pattern(r"/assets/.*")
//!     .build()
//!     .unwrap();
//!
//! assert!(logger.should_skip("/assets/app.css"));
//! assert!(logger.should_skip("/health"));
//! assert!(!logger.should_skip("/healthz"));
//! ```
//!
//! A pattern that does not compile makes [`AccessLogConfig::build`] fail.
//!
//! # Logged Fields
//!
//! - `method`, `path`, `params`, `version`
//! - `remote_addr`, `user_agent`, `datetime` (RFC3339, request start)
//! - `status`, `elapsed_ms` (time spent in downstream services)
//! - `request_id` - when `request_id_header` is configured
//! - `tracing_request_id` - with the `tracing-request-id` feature
//! - `error` - when downstream failed or attached an error to the response
//! - `request_body` - the part of the payload downstream consumed
//! - `response_body` - never for `image/*`, `video/*`, `audio/*`,
//!   `multipart/form-data` or `application/octet-stream` responses
//!
//! Bodies longer than their limit end with `...[truncated, N bytes]`; the
//! handler and the client still see every byte.
//!
//! # Feature Flags
//!
//! - `tracing-request-id` - Enable integration with `tracing-actix-web`'s request ID
//! - `uuid_v7` - Use UUIDv7 instead of UUIDv4 for generated request IDs

mod capture;
mod config;
mod entry;
mod error;
mod logger;
mod skip;
#[cfg(test)]
mod testing;
mod wrapper;

pub use crate::config::{AccessLogConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_SKIP_PATTERNS};
pub use crate::entry::RequestId;
pub use crate::error::ConfigError;
pub use crate::logger::{
    AccessLog, AccessLogBody, AccessLogMiddleware, AccessLogResponse, DEFAULT_LOG_TARGET,
};
