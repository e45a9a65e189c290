//! The HTTP execution seam.

use std::future::Future;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Anything that can execute a fully built request.
///
/// `tether::Client` implements this trait; so can test doubles.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    /// - Hook failures (classifier or refresh procedure)
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}
