//! Credential refresh and replay.
//!
//! When the classifier flags a response as unauthorized, the coordinator hands
//! the original request to the caller's [`Refresh`] procedure together with a
//! [`Replay`] handle and a recovery [`Client`]. The procedure typically obtains
//! a new token through the recovery client, rewrites `Authorization` and replays
//! the request.
//!
//! A request is refreshed at most once: the request handed to the procedure
//! carries a marker, and a marked request goes straight to
//! [`RefreshState::Done`] whatever its response, however it is sent again.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use derive_more::Display;
use tracing::debug;

use super::classify::UnauthorizedClassifier;
use super::{HookFuture, RefreshMarker, RequestContext};
use crate::client::ClientSlot;
use crate::retry::RetryDisabled;
use crate::{Client, Request, Response, Result};

/// Caller-supplied recovery procedure.
///
/// Returns the response that should replace the unauthorized one, or `None`
/// to let the original response through. Implemented for async closures:
///
/// ```ignore
/// let refresh = |mut request: Request, replay: Replay, client: Client| async move {
///     let token: Token = client.post_json("auth/refresh", &Credentials::load()).await?.json()?;
///     request.set_header("Authorization", format!("Bearer {}", token.access));
///     replay.send(request).await.map(Some)
/// };
/// ```
pub trait Refresh: Send + Sync + 'static {
    /// Recover from an unauthorized response to `request`.
    fn refresh(
        &self,
        request: Request<Bytes>,
        replay: Replay,
        client: Client,
    ) -> HookFuture<'_, Option<Response<Bytes>>>;
}

impl<F, Fut> Refresh for F
where
    F: Fn(Request<Bytes>, Replay, Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Response<Bytes>>>> + Send + 'static,
{
    fn refresh(
        &self,
        request: Request<Bytes>,
        replay: Replay,
        client: Client,
    ) -> HookFuture<'_, Option<Response<Bytes>>> {
        Box::pin(self(request, replay, client))
    }
}

/// Re-dispatches a request through the live client's hook chain.
///
/// Replayed requests are marked as already refreshed and are not retried by
/// the transport.
#[derive(Clone)]
pub struct Replay {
    target: ClientSlot,
}

impl fmt::Debug for Replay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replay")
            .field("bound", &self.target.is_bound())
            .finish()
    }
}

impl Replay {
    pub(crate) fn new(target: ClientSlot) -> Self {
        Self { target }
    }

    /// Send `request` again.
    ///
    /// The request is dispatched as-is: client defaults and the HTTP-error
    /// policy are not applied, so an unauthorized replay comes back as a
    /// response.
    ///
    /// # Errors
    ///
    /// [`Error::ClientReleased`](crate::Error::ClientReleased) when the client
    /// was dropped, otherwise whatever the hook chain and transport return.
    pub async fn send(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>> {
        let shared = self.target.resolve()?;
        request.extensions_mut().insert(RefreshMarker);
        request.extensions_mut().insert(RetryDisabled);

        debug!(
            state = %RefreshState::Replaying,
            method = %request.method(),
            path = request.path(),
            "replaying request"
        );
        shared.dispatch(request).await
    }
}

/// Stages of one refresh sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RefreshState {
    /// Nothing happened yet.
    Idle,
    /// Waiting on the classifier.
    Classifying,
    /// Waiting on the recovery procedure.
    Recovering,
    /// Waiting on the replayed request.
    Replaying,
    /// Finished.
    Done,
}

/// How a refresh sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RefreshOutcome {
    /// The request was itself a replay; nothing was attempted.
    AlreadyRefreshed,
    /// The classifier did not flag the response.
    Authorized,
    /// The recovery procedure declined to replay.
    Declined,
    /// The response was replaced by the replay's.
    Replayed,
}

/// The refresh hook.
pub(crate) struct RefreshCoordinator {
    classifier: Arc<dyn UnauthorizedClassifier>,
    refresh: Arc<dyn Refresh>,
    replay: Replay,
    recovery: Client,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        classifier: Arc<dyn UnauthorizedClassifier>,
        refresh: Arc<dyn Refresh>,
        replay: Replay,
        recovery: Client,
    ) -> Self {
        Self {
            classifier,
            refresh,
            replay,
            recovery,
        }
    }

    pub(crate) async fn coordinate(
        &self,
        context: &mut RequestContext,
        response: Response<Bytes>,
    ) -> Result<(RefreshOutcome, Response<Bytes>)> {
        let id = context.id();

        if context.refresh_attempted() {
            debug!(%id, state = %RefreshState::Done, "request already refreshed");
            return Ok((RefreshOutcome::AlreadyRefreshed, response));
        }

        debug!(%id, state = %RefreshState::Classifying, status = response.status());
        if !self.classifier.is_unauthorized(response.clone()).await? {
            debug!(%id, state = %RefreshState::Done, outcome = %RefreshOutcome::Authorized);
            return Ok((RefreshOutcome::Authorized, response));
        }

        context.mark_refresh_attempted();
        let mut request = context.request().clone();
        request.extensions_mut().insert(RefreshMarker);

        debug!(%id, state = %RefreshState::Recovering);
        let replayed = self
            .refresh
            .refresh(request, self.replay.clone(), self.recovery.clone())
            .await?;

        let (outcome, response) = match replayed {
            Some(replayed) => (RefreshOutcome::Replayed, replayed),
            None => (RefreshOutcome::Declined, response),
        };
        debug!(%id, state = %RefreshState::Done, %outcome, status = response.status());
        Ok((outcome, response))
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("replay", &self.replay)
            .field("recovery", &self.recovery)
            .finish_non_exhaustive()
    }
}
