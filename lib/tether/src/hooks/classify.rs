//! Deciding whether a response means the caller's credentials expired.

use std::future::Future;

use bytes::Bytes;

use super::HookFuture;
use crate::{Response, Result};

/// Decides whether a response should trigger a refresh.
///
/// Receives an owned copy of the response; the one handed downstream is
/// untouched. Implemented for async closures:
///
/// ```ignore
/// let classifier = |response: Response| async move {
///     Ok::<_, tether::Error>(response.status() == 401)
/// };
/// ```
pub trait UnauthorizedClassifier: Send + Sync + 'static {
    /// Whether `response` is an authorization failure.
    fn is_unauthorized(&self, response: Response<Bytes>) -> HookFuture<'_, bool>;
}

impl<F, Fut> UnauthorizedClassifier for F
where
    F: Fn(Response<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    fn is_unauthorized(&self, response: Response<Bytes>) -> HookFuture<'_, bool> {
        Box::pin(self(response))
    }
}

/// Classifies responses by status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusClassifier {
    status: u16,
}

impl StatusClassifier {
    /// Treat responses with `status` as unauthorized.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self { status }
    }
}

impl UnauthorizedClassifier for StatusClassifier {
    fn is_unauthorized(&self, response: Response<Bytes>) -> HookFuture<'_, bool> {
        let matches = response.status() == self.status;
        Box::pin(async move { Ok(matches) })
    }
}

/// Classifier built from a synchronous predicate, see [`from_fn`].
#[derive(Debug, Clone, Copy)]
pub struct Predicate<F> {
    predicate: F,
}

/// Wrap a synchronous predicate as a classifier.
pub fn from_fn<F>(predicate: F) -> Predicate<F>
where
    F: Fn(&Response<Bytes>) -> bool + Send + Sync + 'static,
{
    Predicate { predicate }
}

impl<F> UnauthorizedClassifier for Predicate<F>
where
    F: Fn(&Response<Bytes>) -> bool + Send + Sync + 'static,
{
    fn is_unauthorized(&self, response: Response<Bytes>) -> HookFuture<'_, bool> {
        let matches = (self.predicate)(&response);
        Box::pin(async move { Ok(matches) })
    }
}
