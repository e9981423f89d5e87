use std::{
    borrow::Cow,
    future::Future,
    marker::PhantomData,
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};

use bytes::Bytes;
use futures_core::ready;
use pin_project_lite::pin_project;
use time::OffsetDateTime;

use actix_http::BoxedPayloadStream;
use actix_service::{Service, Transform};
use actix_utils::future::{Ready, ready};
use actix_web::{Error, HttpMessage};
use actix_web::body::{BodySize, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header::{CONTENT_TYPE, HeaderName};

use crate::capture::{BoundedCapture, CapturePayload, SharedCapture, is_capturable};
use crate::config::AccessLogConfig;
use crate::entry::LogEntry;
use crate::error::ConfigError;
use crate::skip::SkipMatcher;

/// Log target used when none is configured.
pub const DEFAULT_LOG_TARGET: &str = "actix_web_middleware_accesslog::logger";

/// Middleware writing one access log record per request, optionally with the
/// request and response bodies.
///
/// Records go through the `log` crate: the message is a one line summary and
/// every field is attached as a key-value pair, so a structured backend such as
/// `structured-logger` renders them as JSON.
///
/// `AccessLog` is cheap to clone and can be shared by every worker of an
/// `HttpServer`.
///
/// # Examples
/// ```rust
/// use actix_web::App;
/// use actix_web_middleware_accesslog::AccessLog;
///
/// let app = App::new()
///     .wrap(AccessLog::default());
/// ```
#[derive(Clone, Debug)]
pub struct AccessLog(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    skip: SkipMatcher,
    include_request_body: bool,
    include_response_body: bool,
    max_request_body_bytes: usize,
    max_response_body_bytes: usize,
    request_id_header: Option<HeaderName>,
    log_target: Cow<'static, str>,
}

impl AccessLog {
    /// Create `AccessLog` middleware from `config`, compiling its skip patterns.
    pub fn new(config: AccessLogConfig) -> Result<AccessLog, ConfigError> {
        let skip = SkipMatcher::new(config.skip_paths, &config.skip_patterns)?;

        let request_id_header = match config.request_id_header {
            Some(name) => Some(
                HeaderName::try_from(name.as_str())
                    .map_err(|source| ConfigError::InvalidHeaderName { name, source })?,
            ),
            None => None,
        };

        Ok(AccessLog(Arc::new(Inner {
            skip,
            include_request_body: config.include_request_body,
            include_response_body: config.include_response_body,
            max_request_body_bytes: config.max_request_body_bytes,
            max_response_body_bytes: config.max_response_body_bytes,
            request_id_header,
            log_target: config
                .log_target
                .map_or(Cow::Borrowed(DEFAULT_LOG_TARGET), Cow::Owned),
        })))
    }

    /// Whether requests for `path` bypass the access log.
    pub fn should_skip(&self, path: &str) -> bool {
        self.0.skip.is_match(path)
    }
}

impl Default for AccessLog {
    /// Create `AccessLog` middleware with [`AccessLogConfig::default`]: both
    /// bodies captured up to 8 KiB, health, metrics, API docs and static assets
    /// skipped.
    fn default() -> Self {
        AccessLog::new(AccessLogConfig::default())
            .expect("built-in access log configuration is valid")
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<AccessLogBody<B>>;
    type Error = Error;
    type Transform = AccessLogMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessLogMiddleware {
            service,
            inner: Arc::clone(&self.0),
        }))
    }
}

/// Request extension set by the first access log that sees a request.
#[derive(Clone, Copy, Debug)]
struct Logged;

/// Access log middleware service.
pub struct AccessLogMiddleware<S> {
    inner: Arc<Inner>,
    service: S,
}

impl<S, B> Service<ServiceRequest> for AccessLogMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<AccessLogBody<B>>;
    type Error = Error;
    type Future = AccessLogResponse<S, B>;

    actix_service::forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        // skipped, or an access log further out already owns this request
        if self.inner.skip.is_match(req.path()) || req.extensions().contains::<Logged>() {
            return AccessLogResponse {
                fut: self.service.call(req),
                pending: None,
                _phantom: PhantomData,
            };
        }
        req.extensions_mut().insert(Logged);

        let started = Instant::now();
        let started_at = OffsetDateTime::now_utc();

        let request_capture = self.inner.include_request_body.then(|| {
            let capture = BoundedCapture::shared(self.inner.max_request_body_bytes);
            let payload: BoxedPayloadStream = Box::pin(CapturePayload::new(
                req.take_payload(),
                Rc::clone(&capture),
            ));
            req.set_payload(Payload::Stream { payload });
            capture
        });

        let entry = LogEntry::from_request(&req, started_at, self.inner.request_id_header.as_ref());

        AccessLogResponse {
            fut: self.service.call(req),
            pending: Some(PendingLog {
                entry,
                started,
                request_capture,
                response_limit: self
                    .inner
                    .include_response_body
                    .then_some(self.inner.max_response_body_bytes),
                log_target: self.inner.log_target.clone(),
            }),
            _phantom: PhantomData,
        }
    }
}

/// Entry of a request still being handled downstream.
struct PendingLog {
    entry: LogEntry,
    started: Instant,
    request_capture: Option<SharedCapture>,
    response_limit: Option<usize>,
    log_target: Cow<'static, str>,
}

pin_project! {
    pub struct AccessLogResponse<S, B>
    where
        B: MessageBody,
        S: Service<ServiceRequest>,
    {
        #[pin]
        fut: S::Future,
        pending: Option<PendingLog>,
        _phantom: PhantomData<B>,
    }
}

impl<S, B> Future for AccessLogResponse<S, B>
where
    B: MessageBody,
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Output = Result<ServiceResponse<AccessLogBody<B>>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let result = ready!(this.fut.poll(cx));

        let Some(PendingLog {
            mut entry,
            started,
            request_capture,
            response_limit,
            log_target,
        }) = this.pending.take()
        else {
            return Poll::Ready(result.map(|res| res.map_body(|_, body| AccessLogBody::new(body, None))));
        };

        entry.elapsed_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

        let res = match result {
            Ok(res) => res,
            Err(err) => {
                // the response was never built, so there is no body to capture
                entry.status = Some(err.error_response().status().as_u16());
                entry.error = Some(err.to_string());
                render_request_body(&mut entry, request_capture.as_ref());
                entry.emit(&log_target);
                return Poll::Ready(Err(err));
            }
        };

        entry.status = Some(res.status().as_u16());
        if let Some(error) = res.response().error() {
            log::debug!("Error in response: {:?}", error);
            entry.error = Some(error.to_string());
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        let pending = match response_limit.filter(|_| is_capturable(content_type)) {
            Some(limit) => Some(ResponseLog {
                entry,
                capture: BoundedCapture::new(limit),
                request_capture,
                log_target,
            }),
            None => {
                render_request_body(&mut entry, request_capture.as_ref());
                entry.emit(&log_target);
                None
            }
        };

        Poll::Ready(Ok(res.map_body(move |_, body| AccessLogBody::new(body, pending))))
    }
}

/// Request bytes are rendered at emission, so a payload still streamed
/// through the response body is complete.
fn render_request_body(entry: &mut LogEntry, capture: Option<&SharedCapture>) {
    if let Some(capture) = capture {
        entry.request_body = Some(capture.borrow().render());
    }
}

/// Entry waiting for the response body to finish streaming.
struct ResponseLog {
    entry: LogEntry,
    capture: BoundedCapture,
    request_capture: Option<SharedCapture>,
    log_target: Cow<'static, str>,
}

impl ResponseLog {
    fn finish(mut self) {
        render_request_body(&mut self.entry, self.request_capture.as_ref());
        self.entry.response_body = Some(self.capture.render());
        self.entry.emit(&self.log_target);
    }
}

pin_project! {
    /// Response body that keeps a bounded copy of what it streams and emits
    /// the pending record once it is finished or dropped.
    pub struct AccessLogBody<B> {
        #[pin]
        body: B,
        pending: Option<ResponseLog>,
    }

    impl<B> PinnedDrop for AccessLogBody<B> {
        fn drop(this: Pin<&mut Self>) {
            if let Some(pending) = this.project().pending.take() {
                pending.finish();
            }
        }
    }
}

impl<B> AccessLogBody<B> {
    fn new(body: B, pending: Option<ResponseLog>) -> Self {
        AccessLogBody { body, pending }
    }
}

impl<B: MessageBody> MessageBody for AccessLogBody<B> {
    type Error = B::Error;

    #[inline]
    fn size(&self) -> BodySize {
        self.body.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.project();

        match ready!(this.body.poll_next(cx)) {
            Some(Ok(chunk)) => {
                if let Some(pending) = this.pending {
                    pending.capture.record(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(err)) => {
                if let Some(pending) = this.pending {
                    log::warn!("response body capture interrupted by a body error");
                    pending.capture.fail("response body stream failed");
                }
                Poll::Ready(Some(Err(err)))
            }
            None => {
                if let Some(pending) = this.pending.take() {
                    pending.finish();
                }
                Poll::Ready(None)
            }
        }
    }
}
