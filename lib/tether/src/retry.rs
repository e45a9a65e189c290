//! Transport retry policy.
//!
//! Retries idempotent requests on transient failures. Requests replayed after
//! a refresh carry [`RetryDisabled`] and are never retried, so a refresh never
//! compounds the retry budget of the request it replaces.

use std::future;

use bytes::Bytes;
use tower::retry::Policy;

use crate::{Error, Request, Response};

/// Status codes worth retrying: timeouts, throttling and gateway failures.
const RETRY_STATUS_CODES: [u16; 7] = [408, 413, 429, 500, 502, 503, 504];

/// Request extension opting a request out of transport retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDisabled;

/// Retry policy for idempotent requests.
///
/// `tower::retry::Retry` clones the policy per request, so every request
/// starts with the full budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    remaining: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with the given maximum number of retries.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            remaining: max_retries,
        }
    }

    fn is_retryable_request(request: &Request<Bytes>) -> bool {
        request.method().is_idempotent() && request.extensions().get::<RetryDisabled>().is_none()
    }

    fn should_retry_response(response: &Response<Bytes>) -> bool {
        RETRY_STATUS_CODES.contains(&response.status())
    }

    fn should_retry_error(error: &Error) -> bool {
        error.is_connection() || error.is_timeout()
    }
}

impl Policy<Request<Bytes>, Response<Bytes>, Error> for RetryPolicy {
    type Future = future::Ready<()>;

    fn retry(
        &mut self,
        req: &mut Request<Bytes>,
        result: &mut Result<Response<Bytes>, Error>,
    ) -> Option<Self::Future> {
        if self.remaining == 0 || !Self::is_retryable_request(req) {
            return None;
        }

        let should_retry = match result {
            Ok(response) => Self::should_retry_response(response),
            Err(error) => Self::should_retry_error(error),
        };

        if should_retry {
            self.remaining -= 1;
            tracing::debug!(
                method = %req.method(),
                path = req.path(),
                remaining = self.remaining,
                "retrying request"
            );
            Some(future::ready(()))
        } else {
            None
        }
    }

    fn clone_request(&mut self, req: &Request<Bytes>) -> Option<Request<Bytes>> {
        Self::is_retryable_request(req).then(|| req.clone())
    }
}
