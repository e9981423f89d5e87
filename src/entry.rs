use std::fmt;
use std::panic::Location;

use actix_web::HttpMessage;
use actix_web::dev::ServiceRequest;
use actix_web::http::header::{self, HeaderName};
use log::kv::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Request id generated when the configured request id header is absent.
///
/// Stored in the request extensions so handlers can echo it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        #[cfg(not(feature = "uuid_v7"))]
        {
            Self(Uuid::new_v4())
        }
        #[cfg(feature = "uuid_v7")]
        {
            Self(Uuid::now_v7())
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.as_hyphenated(), f)
    }
}

/// One access log record.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LogEntry {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) version: &'static str,
    pub(crate) remote_addr: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) request_id: Option<String>,
    #[cfg(feature = "tracing-request-id")]
    pub(crate) tracing_request_id: Option<String>,
    pub(crate) datetime: Option<String>,
    pub(crate) status: Option<u16>,
    pub(crate) elapsed_ms: Option<u64>,
    pub(crate) error: Option<String>,
    pub(crate) request_body: Option<String>,
    pub(crate) response_body: Option<String>,
}

impl LogEntry {
    /// Snapshot of everything the request can tell before it is handed downstream.
    pub(crate) fn from_request(
        req: &ServiceRequest,
        started_at: OffsetDateTime,
        request_id_header: Option<&HeaderName>,
    ) -> Self {
        let version = match req.version() {
            actix_http::Version::HTTP_09 => "HTTP/0.9",
            actix_http::Version::HTTP_10 => "HTTP/1.0",
            actix_http::Version::HTTP_11 => "HTTP/1.1",
            actix_http::Version::HTTP_2 => "HTTP/2.0",
            actix_http::Version::HTTP_3 => "HTTP/3.0",
            _ => "unknown",
        };

        let datetime = match started_at.format(&Rfc3339) {
            Ok(datetime) => Some(datetime),
            Err(err) => {
                log::warn!("cannot format access log timestamp: {err}");
                None
            }
        };

        // connection info borrows the extensions, release it before a request id is stored
        let remote_addr = req.connection_info().peer_addr().map(str::to_string);
        let request_id = request_id_header.map(|header| request_id_for(req, header));
        #[cfg(feature = "tracing-request-id")]
        let tracing_request_id = req
            .extensions()
            .get::<tracing_actix_web::RequestId>()
            .map(|id| id.to_string());

        LogEntry {
            method: req.method().to_string(),
            path: req.path().to_string(),
            query: req.query_string().to_string(),
            version,
            remote_addr,
            user_agent: header_value(req, &header::USER_AGENT),
            request_id,
            #[cfg(feature = "tracing-request-id")]
            tracing_request_id,
            datetime,
            ..LogEntry::default()
        }
    }

    /// Key-values of the record. Bodies that were not captured are left out entirely.
    pub(crate) fn key_values(&self) -> Vec<(&'static str, Value<'_>)> {
        let mut kvs = vec![
            ("method", Value::from(self.method.as_str())),
            ("path", Value::from(self.path.as_str())),
            ("params", Value::from(self.query.as_str())),
            ("version", Value::from(self.version)),
            ("remote_addr", optional(&self.remote_addr)),
            ("user_agent", optional(&self.user_agent)),
            ("datetime", optional(&self.datetime)),
            ("status", self.status.map_or_else(Value::null, Value::from)),
            (
                "elapsed_ms",
                self.elapsed_ms.map_or_else(Value::null, Value::from),
            ),
        ];

        if let Some(request_id) = &self.request_id {
            kvs.push(("request_id", Value::from(request_id.as_str())));
        }
        #[cfg(feature = "tracing-request-id")]
        kvs.push(("tracing_request_id", optional(&self.tracing_request_id)));
        if let Some(error) = &self.error {
            kvs.push(("error", Value::from(error.as_str())));
        }
        if let Some(body) = &self.request_body {
            kvs.push(("request_body", Value::from(body.as_str())));
        }
        if let Some(body) = &self.response_body {
            kvs.push(("response_body", Value::from(body.as_str())));
        }

        kvs
    }

    #[track_caller]
    pub(crate) fn emit(&self, target: &str) {
        crate::wrapper::rust_log::log(
            log::Level::Info,
            target,
            module_path!(),
            Location::caller(),
            self,
            &self.key_values(),
        );
    }
}

/// Single line summary, e.g. `GET /api/users?page=2 200 3ms`.
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        match self.status {
            Some(status) => write!(f, " {status}")?,
            None => f.write_str(" -")?,
        }
        match self.elapsed_ms {
            Some(elapsed) => write!(f, " {elapsed}ms"),
            None => f.write_str(" -"),
        }
    }
}

fn optional(value: &Option<String>) -> Value<'_> {
    match value {
        Some(value) => Value::from(value.as_str()),
        None => Value::null(),
    }
}

fn header_value(req: &ServiceRequest, name: &HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .map(|v| v.to_str().unwrap_or_default().to_string())
}

fn request_id_for(req: &ServiceRequest, header: &HeaderName) -> String {
    match header_value(req, header) {
        Some(id) => id,
        None => {
            let id = RequestId::new();
            req.extensions_mut().insert(id);
            id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_entry_from_request() {
        let req = TestRequest::post()
            .uri("/api/users?page=2")
            .insert_header(("user-agent", "test-agent"))
            .peer_addr("127.0.0.1:4000".parse().unwrap())
            .to_srv_request();

        let now = OffsetDateTime::now_utc();
        let entry = LogEntry::from_request(&req, now, None);

        assert_eq!(entry.method, "POST");
        assert_eq!(entry.path, "/api/users");
        assert_eq!(entry.query, "page=2");
        assert_eq!(entry.version, "HTTP/1.1");
        assert!(entry.remote_addr.unwrap().starts_with("127.0.0.1"));
        assert_eq!(entry.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(entry.datetime, Some(now.format(&Rfc3339).unwrap()));
        assert!(entry.request_id.is_none());
        assert!(entry.status.is_none());
        assert!(entry.elapsed_ms.is_none());
    }

    #[test]
    fn test_request_id_from_header() {
        let header = HeaderName::from_static("x-request-id");
        let req = TestRequest::default()
            .insert_header(("x-request-id", "test-id"))
            .to_srv_request();

        let entry = LogEntry::from_request(&req, OffsetDateTime::now_utc(), Some(&header));
        assert_eq!(entry.request_id.as_deref(), Some("test-id"));
        assert!(req.extensions().get::<RequestId>().is_none());
    }

    #[test]
    fn test_request_id_generated() {
        let header = HeaderName::from_static("x-request-id");
        let req = TestRequest::default().to_srv_request();

        let entry = LogEntry::from_request(&req, OffsetDateTime::now_utc(), Some(&header));
        let stored = *req.extensions().get::<RequestId>().unwrap();
        assert_eq!(entry.request_id, Some(stored.to_string()));
    }

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_key_values_omit_absent_bodies() {
        let entry = LogEntry {
            method: "GET".to_string(),
            path: "/image.png".to_string(),
            status: Some(200),
            elapsed_ms: Some(4),
            request_body: Some(String::new()),
            ..LogEntry::default()
        };

        let kvs = entry.key_values();
        let keys: Vec<&str> = kvs.iter().map(|(k, _)| *k).collect();
        assert!(keys.contains(&"request_body"));
        assert!(!keys.contains(&"response_body"));
        assert!(!keys.contains(&"error"));
        assert!(!keys.contains(&"request_id"));

        let status = kvs.iter().find(|(k, _)| *k == "status").unwrap();
        assert_eq!(status.1.to_string(), "200");
    }

    #[test]
    fn test_display_single_line() {
        let mut entry = LogEntry {
            method: "GET".to_string(),
            path: "/api/users".to_string(),
            query: "page=2".to_string(),
            status: Some(200),
            elapsed_ms: Some(3),
            ..LogEntry::default()
        };
        assert_eq!(entry.to_string(), "GET /api/users?page=2 200 3ms");

        entry.query.clear();
        entry.status = None;
        assert_eq!(entry.to_string(), "GET /api/users - 3ms");
    }
}
