//! Request/response logging hook.
//!
//! Every request produces a `[REQ]` entry before it is sent and, when a
//! response arrives, a `[RES]` entry with the elapsed time taken from the
//! [`PerformanceCorrelator`]. Entries are handed to a [`LogSink`];
//! [`TracingSink`] is the default.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tracing::{Level, info, span, warn};

use super::correlator::PerformanceCorrelator;
use super::{RequestContext, RequestId};
use crate::{Method, Response};

/// Receiver of log entries.
pub trait LogSink: Send + Sync + 'static {
    /// Record one entry.
    fn record(&self, entry: &LogEntry);
}

/// Emits entries as `tracing` events.
///
/// Each entry is a span (`http_request` or `http_response`) holding the title
/// and detail events. Titles of responses with status ≥ 400 are emitted at
/// `WARN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: &LogEntry) {
        match entry {
            LogEntry::Request(log) => {
                let span = span!(
                    Level::INFO,
                    "http_request",
                    id = %log.id,
                    method = %log.method,
                    path = %log.path,
                );
                let _entered = span.enter();
                info!("{}", log.title());
                info!("Request Body: {}", log.body);
            }
            LogEntry::Response(log) => {
                let span = span!(
                    Level::INFO,
                    "http_response",
                    id = %log.id,
                    method = %log.method,
                    path = %log.path,
                    status = log.status,
                );
                let _entered = span.enter();
                if log.status >= 400 {
                    warn!("{}", log.title());
                } else {
                    info!("{}", log.title());
                }
                if let Some(elapsed) = log.elapsed {
                    info!("Time: {}", format_elapsed(elapsed));
                }
                info!("Response Body: {}", log.body);
            }
        }
    }
}

/// One log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// Emitted before the request is sent.
    Request(RequestLog),
    /// Emitted when a response arrives.
    Response(ResponseLog),
}

/// Before-request entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLog {
    /// Request identity, shared with the matching [`ResponseLog`].
    pub id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// URL path without scheme, host or query.
    pub path: String,
    /// Request body as sent.
    pub body: LogBody,
}

impl RequestLog {
    /// Group title, e.g. `[REQ] GET /users/me`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("[REQ] {} {}", upper(&self.method), self.path)
    }
}

/// After-response entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseLog {
    /// Request identity, shared with the matching [`RequestLog`].
    pub id: RequestId,
    /// HTTP method of the request.
    pub method: Method,
    /// URL path without scheme, host or query.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Time since the request started, when a start was recorded.
    pub elapsed: Option<Duration>,
    /// Response body.
    pub body: LogBody,
}

impl ResponseLog {
    /// Group title, e.g. `[RES] GET /users/me - 401`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("[RES] {} {} - {}", upper(&self.method), self.path, self.status)
    }
}

/// Extension methods keep the case they were built with.
fn upper(method: &Method) -> String {
    method.as_str().to_ascii_uppercase()
}

/// A logged body.
#[derive(Debug, Clone, PartialEq)]
pub enum LogBody {
    /// No body, or an empty one.
    Missing,
    /// Body decoded as JSON.
    Json(Value),
    /// Body decoded as text.
    Text(String),
    /// Request body that is not valid UTF-8.
    Binary(Bytes),
}

impl LogBody {
    /// Request bodies are kept verbatim: text when valid UTF-8, bytes otherwise.
    fn from_request(body: Option<&Bytes>) -> Self {
        match body {
            None => Self::Missing,
            Some(bytes) if bytes.is_empty() => Self::Missing,
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Self::Text(text.to_owned()),
                Err(_) => Self::Binary(bytes.clone()),
            },
        }
    }

    /// Response bodies are read as JSON first, then as lossy text.
    fn from_response(body: &Bytes) -> Self {
        if body.is_empty() {
            return Self::Text(String::new());
        }
        serde_json::from_slice(body).map_or_else(
            |_| Self::Text(String::from_utf8_lossy(body).into_owned()),
            Self::Json,
        )
    }
}

impl fmt::Display for LogBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("(No Request Body)"),
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Elapsed time as milliseconds with five decimals, e.g. `12.34567ms`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.5}ms", elapsed.as_secs_f64() * 1000.0)
}

/// The logging hook.
pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
    correlator: PerformanceCorrelator,
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("correlator", &self.correlator)
            .finish_non_exhaustive()
    }
}

impl RequestLogger {
    /// Logger writing to `sink`.
    pub fn new(sink: impl LogSink) -> Self {
        Self::with_sink(Arc::new(sink))
    }

    /// Logger writing to a shared sink.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            correlator: PerformanceCorrelator::new(),
        }
    }

    /// Start times of requests still waiting for a response.
    #[must_use]
    pub const fn correlator(&self) -> &PerformanceCorrelator {
        &self.correlator
    }

    pub(crate) fn before_request(&self, context: &RequestContext) {
        let request = context.request();
        self.correlator.record_start(context.id());

        self.sink.record(&LogEntry::Request(RequestLog {
            id: context.id(),
            method: request.method().clone(),
            path: request.path().to_owned(),
            body: LogBody::from_request(request.body()),
        }));
    }

    #[allow(clippy::needless_pass_by_value)]
    pub(crate) fn after_response(&self, context: &RequestContext, response: Response<Bytes>) {
        let request = context.request();
        let elapsed = self.correlator.consume_elapsed(context.id());

        self.sink.record(&LogEntry::Response(ResponseLog {
            id: context.id(),
            method: request.method().clone(),
            path: request.path().to_owned(),
            status: response.status(),
            elapsed,
            body: LogBody::from_response(response.body()),
        }));
    }

    pub(crate) fn discard(&self, context: &RequestContext) {
        self.correlator.discard(context.id());
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::super::testing::{RecordingSink, request, response};
    use super::*;

    fn logger() -> (RequestLogger, RecordingSink) {
        let sink = RecordingSink::default();
        (RequestLogger::new(sink.clone()), sink)
    }

    #[test]
    fn titles() {
        let id = RequestId::next();
        let req = RequestLog {
            id,
            method: Method::GET,
            path: "/users/me".to_owned(),
            body: LogBody::Missing,
        };
        let res = ResponseLog {
            id,
            method: Method::GET,
            path: "/users/me".to_owned(),
            status: 401,
            elapsed: None,
            body: LogBody::Text(String::new()),
        };

        check!(req.title() == "[REQ] GET /users/me");
        check!(res.title() == "[RES] GET /users/me - 401");
    }

    #[test]
    fn extension_methods_are_upper_cased() {
        let (logger, sink) = logger();
        let method = Method::from_bytes(b"purge").expect("valid method");
        let context = RequestContext::new(request(method, "/cache"));

        logger.before_request(&context);
        logger.after_response(&context, response(200, ""));

        let entries = sink.entries();
        let_assert!([LogEntry::Request(req), LogEntry::Response(res)] = entries.as_slice());
        check!(req.title() == "[REQ] PURGE /cache");
        check!(res.title() == "[RES] PURGE /cache - 200");
    }

    #[test]
    fn elapsed_has_five_decimals() {
        check!(format_elapsed(Duration::from_micros(1_500)) == "1.50000ms");
        check!(format_elapsed(Duration::from_nanos(12_345_678)) == "12.34568ms");
    }

    #[test]
    fn request_body_is_logged_verbatim() {
        let (logger, sink) = logger();
        let url = url::Url::parse("https://api.example.com/sessions?x=1").expect("valid url");
        let req = crate::Request::builder(Method::POST, url)
            .body(Bytes::from_static(br#"{"user": "ada"}"#))
            .build();

        logger.before_request(&RequestContext::new(req));

        let entries = sink.entries();
        let_assert!([LogEntry::Request(log)] = entries.as_slice());
        check!(log.path == "/sessions");
        check!(log.body == LogBody::Text(r#"{"user": "ada"}"#.to_owned()));
    }

    #[test]
    fn missing_request_body_has_placeholder() {
        let (logger, sink) = logger();

        logger.before_request(&RequestContext::new(request(Method::GET, "/me")));

        let entries = sink.entries();
        let_assert!([LogEntry::Request(log)] = entries.as_slice());
        check!(log.body.to_string() == "(No Request Body)");
    }

    #[test]
    fn response_body_prefers_json() {
        let (logger, sink) = logger();
        let context = RequestContext::new(request(Method::GET, "/me"));

        logger.before_request(&context);
        logger.after_response(&context, response(200, r#"{"id": 7}"#));

        let entries = sink.entries();
        let_assert!([_, LogEntry::Response(log)] = entries.as_slice());
        check!(log.body == LogBody::Json(json!({ "id": 7 })));
        check!(log.elapsed.is_some());
    }

    #[test]
    fn response_body_falls_back_to_text() {
        let (logger, sink) = logger();
        let context = RequestContext::new(request(Method::GET, "/health"));

        logger.after_response(&context, response(200, "OK"));

        let entries = sink.entries();
        let_assert!([LogEntry::Response(log)] = entries.as_slice());
        check!(log.body == LogBody::Text("OK".to_owned()));
        check!(log.elapsed.is_none());
    }

    #[test]
    fn logged_response_is_a_copy() {
        let (logger, _sink) = logger();
        let context = RequestContext::new(request(Method::GET, "/me"));
        let original = response(200, "OK");

        logger.after_response(&context, original.clone());

        check!(original.text() == "OK");
    }
}
