use std::{
    cell::RefCell,
    fmt,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use actix_web::dev::Payload;
use actix_web::error::PayloadError;
use bytes::{Bytes, BytesMut};
use futures_core::{Stream, ready};
use pin_project_lite::pin_project;

/// Response content types whose bodies are never copied into the log.
const UNCAPTURED_CONTENT_TYPES: [&str; 5] = [
    "image",
    "video",
    "audio",
    "multipart/form-data",
    "application/octet-stream",
];

/// Returns `false` for binary and multipart content. A missing content type is capturable.
pub(crate) fn is_capturable(content_type: Option<&str>) -> bool {
    match content_type {
        Some(content_type) => {
            let content_type = content_type.trim_start().to_ascii_lowercase();
            !UNCAPTURED_CONTENT_TYPES
                .iter()
                .any(|prefix| content_type.starts_with(prefix))
        }
        None => true,
    }
}

/// Copy of the first `limit` bytes that passed through a stream.
#[derive(Debug)]
pub(crate) struct BoundedCapture {
    buf: BytesMut,
    limit: usize,
    seen: usize,
    failure: Option<String>,
}

pub(crate) type SharedCapture = Rc<RefCell<BoundedCapture>>;

impl BoundedCapture {
    pub(crate) fn new(limit: usize) -> Self {
        BoundedCapture {
            buf: BytesMut::new(),
            limit,
            seen: 0,
            failure: None,
        }
    }

    pub(crate) fn shared(limit: usize) -> SharedCapture {
        Rc::new(RefCell::new(Self::new(limit)))
    }

    pub(crate) fn record(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.buf.len());
        self.buf.extend_from_slice(&chunk[..room.min(chunk.len())]);
        self.seen += chunk.len();
    }

    pub(crate) fn fail(&mut self, reason: impl fmt::Display) {
        self.failure = Some(reason.to_string());
    }

    pub(crate) fn is_truncated(&self) -> bool {
        self.seen > self.buf.len()
    }

    /// Text for the log entry. Never fails: unusable captures become a bracketed note.
    pub(crate) fn render(&self) -> String {
        if let Some(reason) = &self.failure {
            return format!("[unavailable: {reason}]");
        }

        let text = match std::str::from_utf8(&self.buf) {
            Ok(text) => text,
            // a multi-byte character split by the limit
            Err(err) if err.error_len().is_none() && self.is_truncated() => {
                std::str::from_utf8(&self.buf[..err.valid_up_to()]).unwrap_or_default()
            }
            Err(_) => return format!("[binary content: {} bytes]", self.seen),
        };

        if self.is_truncated() {
            format!("{text}...[truncated, {} bytes]", self.seen)
        } else {
            text.to_owned()
        }
    }
}

pin_project! {
    /// Request payload that hands every chunk to the consumer and keeps a bounded copy.
    pub(crate) struct CapturePayload {
        #[pin]
        payload: Payload,
        capture: SharedCapture,
    }
}

impl CapturePayload {
    pub(crate) fn new(payload: Payload, capture: SharedCapture) -> Self {
        CapturePayload { payload, capture }
    }
}

impl Stream for CapturePayload {
    type Item = Result<Bytes, PayloadError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match ready!(this.payload.poll_next(cx)) {
            Some(Ok(chunk)) => {
                this.capture.borrow_mut().record(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(err)) => {
                log::warn!("request body capture interrupted: {err}");
                this.capture.borrow_mut().fail(&err);
                Poll::Ready(Some(Err(err)))
            }
            None => Poll::Ready(None),
        }
    }
}
