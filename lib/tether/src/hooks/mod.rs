//! Request-lifecycle hooks.
//!
//! The hook chain is a tower layer wrapped around the transport. It has two
//! fixed slots, run in this order:
//!
//! ```text
//! request  → [logger: REQ entry, start timer] → transport
//! response ← [refresh coordinator] ← [logger: RES entry, elapsed] ← transport
//! ```
//!
//! The logger always sees the request before the coordinator can replay it,
//! and the original response before the coordinator can replace it. An empty
//! slot is a no-op.
//!
//! Each request entering the chain gets a [`RequestContext`] carrying its
//! [`RequestId`] and whether it already went through a refresh.

pub mod classify;
pub mod correlator;
pub mod logging;
pub mod refresh;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use derive_more::Display;
use tower::{Layer, Service};

use self::logging::RequestLogger;
use self::refresh::RefreshCoordinator;
use crate::{Error, Request, Response, Result, ServiceFuture};

/// Boxed future returned by pluggable hooks (classifier, refresh procedure).
pub type HookFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one request passing through the hook chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("req-{_0}")]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Request extension marking a replay issued by [`refresh::Replay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RefreshMarker;

/// Per-request state threaded through the hook chain.
#[derive(Debug)]
pub struct RequestContext {
    id: RequestId,
    request: Request<Bytes>,
    refresh_attempted: bool,
}

impl RequestContext {
    pub(crate) fn new(request: Request<Bytes>) -> Self {
        let refresh_attempted = request.extensions().get::<RefreshMarker>().is_some();
        Self {
            id: RequestId::next(),
            request,
            refresh_attempted,
        }
    }

    /// Identity of this request.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The request as it entered the chain.
    #[must_use]
    pub const fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Whether this request already went through a refresh.
    #[must_use]
    pub const fn refresh_attempted(&self) -> bool {
        self.refresh_attempted
    }

    pub(crate) fn mark_refresh_attempted(&mut self) {
        self.refresh_attempted = true;
    }
}

/// The two hook slots.
pub(crate) struct HookChain {
    logger: Option<Arc<RequestLogger>>,
    refresh: Option<RefreshCoordinator>,
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("logging", &self.logger.is_some())
            .field("refresh", &self.refresh.is_some())
            .finish()
    }
}

impl HookChain {
    pub(crate) fn new(
        logger: Option<Arc<RequestLogger>>,
        refresh: Option<RefreshCoordinator>,
    ) -> Self {
        Self { logger, refresh }
    }

    fn before_request(&self, context: &RequestContext) {
        if let Some(logger) = &self.logger {
            logger.before_request(context);
        }
    }

    fn abandon(&self, context: &RequestContext) {
        if let Some(logger) = &self.logger {
            logger.discard(context);
        }
    }

    async fn after_response(
        &self,
        context: &mut RequestContext,
        response: Response<Bytes>,
    ) -> Result<Response<Bytes>> {
        if let Some(logger) = &self.logger {
            logger.after_response(context, response.clone());
        }

        match &self.refresh {
            Some(coordinator) => {
                let (_, response) = coordinator.coordinate(context, response).await?;
                Ok(response)
            }
            None => Ok(response),
        }
    }
}

/// Layer installing a [`HookChain`] around a service.
#[derive(Debug, Clone)]
pub(crate) struct HooksLayer {
    chain: Arc<HookChain>,
}

impl HooksLayer {
    pub(crate) fn new(chain: HookChain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }
}

impl<S> Layer<S> for HooksLayer {
    type Service = Hooks<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Hooks {
            inner,
            chain: Arc::clone(&self.chain),
        }
    }
}

/// Service running the hook chain around each call.
#[derive(Debug, Clone)]
pub(crate) struct Hooks<S> {
    inner: S,
    chain: Arc<HookChain>,
}

impl<S> Service<Request<Bytes>> for Hooks<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let chain = Arc::clone(&self.chain);

        Box::pin(async move {
            let mut context = RequestContext::new(request);
            chain.before_request(&context);

            let response = match inner.call(context.request().clone()).await {
                Ok(response) => response,
                Err(error) => {
                    chain.abandon(&context);
                    return Err(error);
                }
            };

            chain.after_response(&mut context, response).await
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles shared by the unit tests of this crate.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::task::{Context, Poll};

    use bytes::Bytes;
    use tower::Service;

    use super::logging::{LogEntry, LogSink};
    use crate::{Error, Method, Request, Response, Result, ServiceFuture};

    type Responder = dyn Fn(&Request<Bytes>) -> Result<Response<Bytes>> + Send + Sync;

    /// Transport double answering from a closure and recording every request.
    #[derive(Clone)]
    pub(crate) struct MockTransport {
        respond: Arc<Responder>,
        seen: Arc<Mutex<Vec<Request<Bytes>>>>,
    }

    impl MockTransport {
        pub(crate) fn new(
            respond: impl Fn(&Request<Bytes>) -> Result<Response<Bytes>> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Arc::new(respond),
                seen: Arc::default(),
            }
        }

        /// Always answers `status` with `body`.
        pub(crate) fn fixed(status: u16, body: &'static str) -> Self {
            Self::new(move |_| Ok(response(status, body)))
        }

        /// Answers 200 to `Bearer fresh`, 401 to anything else.
        pub(crate) fn bearer() -> Self {
            Self::new(|request| {
                if request.header("Authorization") == Some("Bearer fresh") {
                    Ok(response(200, r#"{"ok":true}"#))
                } else {
                    Ok(response(401, r#"{"error":"invalid_token"}"#))
                }
            })
        }

        pub(crate) fn requests(&self) -> Vec<Request<Bytes>> {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.requests().len()
        }
    }

    impl Service<Request<Bytes>> for MockTransport {
        type Response = Response<Bytes>;
        type Error = Error;
        type Future = ServiceFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: Request<Bytes>) -> Self::Future {
            let result = (self.respond)(&request);
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            Box::pin(async move { result })
        }
    }

    /// Log sink keeping every entry in memory.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        entries: Arc<Mutex<Vec<LogEntry>>>,
    }

    impl RecordingSink {
        pub(crate) fn entries(&self) -> Vec<LogEntry> {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl LogSink for RecordingSink {
        fn record(&self, entry: &LogEntry) {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(entry.clone());
        }
    }

    pub(crate) fn response(status: u16, body: &'static str) -> Response<Bytes> {
        Response::new(status, HashMap::new(), Bytes::from_static(body.as_bytes()))
    }

    pub(crate) fn request(method: Method, path: &str) -> Request<Bytes> {
        let url = url::Url::parse("https://api.example.com")
            .and_then(|base| base.join(path))
            .expect("valid url");
        Request::builder(method, url).build()
    }
}
