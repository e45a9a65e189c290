//! Client factory.
//!
//! [`create_client`] assembles, from the inside out:
//!
//! ```text
//! HookChain(logger, refresh) → caller layers → retry → transport
//! ```
//!
//! The refresh coordinator needs to replay through the client it belongs to,
//! which does not exist yet while the chain is built. It gets a [`Replay`]
//! over an unbound slot; the slot is bound to the client's shared state once
//! that exists.
//!
//! When refresh is configured, a second, recovery client is built over the
//! same transport with the logger only: no refresh hook, no retries, no caller
//! layers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tower::Layer;
use tower::retry::RetryLayer;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::debug;

use crate::client::{ClientSlot, Shared};
use crate::hooks::classify::UnauthorizedClassifier;
use crate::hooks::logging::{LogSink, RequestLogger, TracingSink};
use crate::hooks::refresh::{Refresh, RefreshCoordinator, Replay};
use crate::hooks::{HookChain, HooksLayer};
use crate::retry::RetryPolicy;
use crate::transport::{BoxedService, Transport};
use crate::{
    Client, ClientConfig, Credentials, Error, Request, RequestDefaults, Response, Result,
    TransportConfig, TransportConfigBuilder,
};

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Options for [`create_client`].
///
/// ```ignore
/// let options = ClientOptions::new()
///     .logging(true)
///     .header("Authorization", format!("Bearer {token}"))
///     .is_unauthorized_response(StatusClassifier::new(401))
///     .refresh(refresh_token);
/// ```
#[derive(Default)]
pub struct ClientOptions {
    logging: bool,
    log_sink: Option<Arc<dyn LogSink>>,
    classifier: Option<Arc<dyn UnauthorizedClassifier>>,
    refresh: Option<Arc<dyn Refresh>>,
    defaults: RequestDefaults,
    transport: TransportConfigBuilder,
    layers: Vec<LayerFn>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("logging", &self.logging)
            .field("classifier", &self.classifier.is_some())
            .field("refresh", &self.refresh.is_some())
            .field("defaults", &self.defaults)
            .field("transport", &self.transport)
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl ClientOptions {
    /// Defaults: no logging, no refresh, default transport settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Log every request and response.
    #[must_use]
    pub const fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Where log entries go; [`TracingSink`] by default.
    ///
    /// Has no effect unless [`logging`](Self::logging) is enabled.
    #[must_use]
    pub fn log_sink(mut self, sink: impl LogSink) -> Self {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    /// Decide which responses trigger a refresh.
    ///
    /// Refresh is only installed when [`refresh`](Self::refresh) is set too.
    #[must_use]
    pub fn is_unauthorized_response(mut self, classifier: impl UnauthorizedClassifier) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Recovery procedure run on unauthorized responses.
    ///
    /// Refresh is only installed when
    /// [`is_unauthorized_response`](Self::is_unauthorized_response) is set too.
    #[must_use]
    pub fn refresh(mut self, refresh: impl Refresh) -> Self {
        self.refresh = Some(Arc::new(refresh));
        self
    }

    // ========================================================================
    // Request defaults
    // ========================================================================

    /// Add a default header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults = self.defaults.header(name, value);
        self
    }

    /// Set the credential-forwarding policy.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.defaults = self.defaults.credentials(credentials);
        self
    }

    /// Set whether non-2xx responses become errors (on by default).
    #[must_use]
    pub fn throw_http_errors(mut self, throw: bool) -> Self {
        self.defaults = self.defaults.throw_http_errors(throw);
        self
    }

    /// Merge `defaults` over the defaults set so far.
    #[must_use]
    pub fn defaults(mut self, defaults: &RequestDefaults) -> Self {
        self.defaults = self.defaults.merge(defaults);
        self
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.transport = self.transport.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.pool_idle_timeout(timeout);
        self
    }

    /// Set the retry limit for idempotent requests; 0 disables retries.
    #[must_use]
    pub fn retry(mut self, limit: u32) -> Self {
        self.transport = self.transport.retry_limit(limit);
        self
    }

    /// Add a tower layer between the hook chain and the retry layer.
    ///
    /// Later layers wrap earlier ones. Replays go through these layers;
    /// the recovery client does not.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    fn transport_config(&self) -> TransportConfig {
        self.transport.clone().build()
    }
}

/// Create a client for `base_url`.
///
/// # Errors
///
/// [`Error::InvalidUrl`] or [`Error::InvalidRequest`] when `base_url` is not
/// a usable base URL.
pub fn create_client(base_url: impl AsRef<str>, options: ClientOptions) -> Result<Client> {
    let transport = Transport::new(options.transport_config());
    build_client(base_url.as_ref(), options, BoxCloneService::new(transport))
}

/// Assemble a client over an arbitrary transport service.
pub(crate) fn build_client(
    base_url: &str,
    options: ClientOptions,
    transport: BoxedService,
) -> Result<Client> {
    let config = Arc::new(ClientConfig::new(base_url, options.transport_config())?);
    let ClientOptions {
        logging,
        log_sink,
        classifier,
        refresh,
        defaults,
        layers,
        ..
    } = options;
    let defaults = Arc::new(defaults);

    let logger = logging.then(|| {
        let sink = log_sink.unwrap_or_else(|| Arc::new(TracingSink));
        Arc::new(RequestLogger::with_sink(sink))
    });

    let slot = ClientSlot::default();
    let coordinator = match (classifier, refresh) {
        (Some(classifier), Some(refresh)) => {
            let recovery = recovery_client(&config, &defaults, logger.clone(), transport.clone());
            Some(RefreshCoordinator::new(
                classifier,
                refresh,
                Replay::new(slot.clone()),
                recovery,
            ))
        }
        (None, None) => None,
        (classifier, refresh) => {
            debug!(
                classifier = classifier.is_some(),
                refresh = refresh.is_some(),
                "refresh needs both a classifier and a procedure; not installed"
            );
            None
        }
    };
    let refreshing = coordinator.is_some();

    let retry = RetryPolicy::new(config.transport().retry_limit);
    let mut service: BoxedService = BoxCloneService::new(RetryLayer::new(retry).layer(transport));
    for layer_fn in layers {
        service = layer_fn(service);
    }
    let service = BoxCloneService::new(
        HooksLayer::new(HookChain::new(logger, coordinator)).layer(service),
    );

    let shared = Arc::new(Shared::new(Arc::clone(&config), service));
    slot.bind(&shared);

    debug!(
        base_url = %config.base_url(),
        logging,
        refresh = refreshing,
        "client created"
    );
    Ok(Client::from_shared(shared, defaults))
}

fn recovery_client(
    config: &Arc<ClientConfig>,
    defaults: &Arc<RequestDefaults>,
    logger: Option<Arc<RequestLogger>>,
    transport: BoxedService,
) -> Client {
    let service = BoxCloneService::new(HooksLayer::new(HookChain::new(logger, None)).layer(transport));
    let shared = Shared::new(Arc::clone(config), service);
    Client::from_shared(Arc::new(shared), Arc::clone(defaults))
}
