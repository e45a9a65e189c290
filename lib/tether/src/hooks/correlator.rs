//! Start-time bookkeeping for request/response pairs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::RequestId;

/// Keyed start times, one per in-flight request.
///
/// A record lives from [`record_start`](Self::record_start) until it is either
/// consumed by the matching response or discarded when the request fails
/// without one. Safe to share across concurrent requests.
#[derive(Debug, Default)]
pub struct PerformanceCorrelator {
    pending: Mutex<HashMap<RequestId, Instant>>,
}

impl PerformanceCorrelator {
    /// Empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of `id`, replacing any earlier record for it.
    pub fn record_start(&self, id: RequestId) {
        self.lock().insert(id, Instant::now());
    }

    /// Take the record for `id` and return the time since it started.
    ///
    /// Returns `None` when nothing was recorded for `id`.
    pub fn consume_elapsed(&self, id: RequestId) -> Option<Duration> {
        self.lock().remove(&id).map(|start| start.elapsed())
    }

    /// Drop the record for `id`, if any.
    pub fn discard(&self, id: RequestId) {
        self.lock().remove(&id);
    }

    /// Number of requests still waiting for a response.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, Instant>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn consume_returns_elapsed_once() {
        let correlator = PerformanceCorrelator::new();
        let id = RequestId::next();

        correlator.record_start(id);
        std::thread::sleep(Duration::from_millis(5));

        let_assert!(Some(elapsed) = correlator.consume_elapsed(id));
        check!(elapsed >= Duration::from_millis(5));
        check!(correlator.consume_elapsed(id).is_none());
        check!(correlator.pending() == 0);
    }

    #[test]
    fn unknown_id_has_no_elapsed() {
        let correlator = PerformanceCorrelator::new();
        check!(correlator.consume_elapsed(RequestId::next()).is_none());
    }

    #[test]
    fn records_are_independent() {
        let correlator = PerformanceCorrelator::new();
        let first = RequestId::next();
        let second = RequestId::next();

        correlator.record_start(first);
        correlator.record_start(second);
        correlator.discard(first);

        check!(correlator.pending() == 1);
        check!(correlator.consume_elapsed(first).is_none());
        check!(correlator.consume_elapsed(second).is_some());
    }
}
