//! The client handle.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::transport::{BoxedService, ServiceFuture, SyncService};
use crate::{
    ClientConfig, Error, HttpClient, Method, Request, RequestBuilder, RequestDefaults, Response,
    Result,
};

/// State shared by a client and every handle derived from it.
pub(crate) struct Shared {
    config: Arc<ClientConfig>,
    service: SyncService,
}

impl Shared {
    pub(crate) fn new(config: Arc<ClientConfig>, service: BoxedService) -> Self {
        Self {
            config,
            service: SyncService::new(service),
        }
    }

    /// Send through the hook chain, bypassing request defaults.
    pub(crate) fn dispatch(&self, request: Request<Bytes>) -> ServiceFuture {
        self.service.call(request)
    }
}

/// Late-bound weak reference to a client's shared state.
///
/// Lets the hook chain reach the client that owns it without an `Arc` cycle.
#[derive(Clone, Default)]
pub(crate) struct ClientSlot {
    target: Arc<OnceLock<Weak<Shared>>>,
}

impl ClientSlot {
    /// Bind the slot. Later calls are ignored.
    pub(crate) fn bind(&self, shared: &Arc<Shared>) {
        if self.target.set(Arc::downgrade(shared)).is_err() {
            debug!("client slot already bound");
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }

    pub(crate) fn resolve(&self) -> Result<Arc<Shared>> {
        self.target
            .get()
            .and_then(Weak::upgrade)
            .ok_or(Error::ClientReleased)
    }
}

/// HTTP client with request hooks.
///
/// Created by [`create_client`](crate::create_client). Cloning is cheap and
/// clones share the connection pool and the hook chain.
///
/// Paths are relative to the base URL and must not begin with `/`:
///
/// ```ignore
/// let client = create_client("https://api.example.com/v1", ClientOptions::new())?;
/// let me: User = client.get("users/me").await?.json()?;
/// ```
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
    defaults: Arc<RequestDefaults>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.shared.config)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub(crate) fn from_shared(shared: Arc<Shared>, defaults: Arc<RequestDefaults>) -> Self {
        Self { shared, defaults }
    }

    #[cfg(test)]
    pub(crate) const fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Base URL, always ending with `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.shared.config.base_url()
    }

    /// Configuration shared with derived handles.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Request defaults of this handle.
    #[must_use]
    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// Derive a handle with `defaults` merged over this one's.
    ///
    /// The derived handle shares the transport, the base URL and the hook
    /// chain.
    #[must_use]
    pub fn extend(&self, defaults: &RequestDefaults) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            defaults: Arc::new(self.defaults.merge(defaults)),
        }
    }

    /// Resolve `path` against the base URL.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] when `path` begins with `/`,
    /// [`Error::InvalidUrl`] when it does not parse.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with('/') {
            return Err(Error::invalid_request(format!(
                "path `{path}` must not begin with `/` when a base URL is set"
            )));
        }
        Ok(self.base_url().join(path)?)
    }

    /// Start a request to `path`.
    ///
    /// # Errors
    ///
    /// See [`Client::url`].
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(Request::builder(method, self.url(path)?))
    }

    /// Send a request through the hook chain.
    ///
    /// Default headers the request does not set are added first. With the
    /// HTTP-error policy on, a non-2xx final response becomes
    /// [`Error::Http`].
    ///
    /// # Errors
    ///
    /// Transport, hook and HTTP errors.
    pub async fn send(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.defaults.apply(&mut request, self.base_url());

        let response = self.shared.dispatch(request).await?;
        if self.defaults.throws_http_errors() && !response.is_success() {
            let status = response.status();
            let message = response.reason().unwrap_or("Unknown Status").to_owned();
            return Err(Error::http_with_body(status, message, response.into_body()));
        }

        Ok(response)
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub async fn get(&self, path: &str) -> Result<Response<Bytes>> {
        self.send(self.request(Method::GET, path)?.build()).await
    }

    /// `HEAD path`.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub async fn head(&self, path: &str) -> Result<Response<Bytes>> {
        self.send(self.request(Method::HEAD, path)?.build()).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub async fn delete(&self, path: &str) -> Result<Response<Bytes>> {
        self.send(self.request(Method::DELETE, path)?.build()).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Serialization errors, then see [`Client::send`].
    pub async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response<Bytes>> {
        self.send_json(Method::POST, path, body).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Serialization errors, then see [`Client::send`].
    pub async fn put_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response<Bytes>> {
        self.send_json(Method::PUT, path, body).await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Serialization errors, then see [`Client::send`].
    pub async fn patch_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response<Bytes>> {
        self.send_json(Method::PATCH, path, body).await
    }

    async fn send_json<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<Response<Bytes>> {
        let request = self.request(method, path)?.json(body)?.build();
        self.send(request).await
    }
}

impl HttpClient for Client {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;
    use tower::util::BoxCloneService;

    use super::*;
    use crate::hooks::testing::MockTransport;
    use crate::{Credentials, TransportConfig};

    fn client(transport: &MockTransport, defaults: RequestDefaults) -> Client {
        let config = ClientConfig::new("https://api.example.com/v1", TransportConfig::default())
            .expect("config");
        let shared = Shared::new(Arc::new(config), BoxCloneService::new(transport.clone()));
        Client::from_shared(Arc::new(shared), Arc::new(defaults))
    }

    #[test]
    fn paths_are_relative_to_the_base_url() {
        let client = client(&MockTransport::fixed(200, ""), RequestDefaults::new());

        let_assert!(Ok(url) = client.url("users/me?verbose=1"));
        check!(url.as_str() == "https://api.example.com/v1/users/me?verbose=1");
    }

    #[test]
    fn leading_slash_is_rejected() {
        let client = client(&MockTransport::fixed(200, ""), RequestDefaults::new());

        let_assert!(Err(Error::InvalidRequest(message)) = client.url("/users/me"));
        check!(message.contains("/users/me"));
    }

    #[tokio::test]
    async fn non_success_becomes_http_error() {
        let transport = MockTransport::fixed(404, r#"{"error":"missing"}"#);
        let client = client(&transport, RequestDefaults::new());

        let_assert!(Err(error) = client.get("users/42").await);
        check!(error.status() == Some(404));
        check!(error.body().map(|body| body.as_ref()) == Some(&br#"{"error":"missing"}"#[..]));
    }

    #[tokio::test]
    async fn http_errors_can_be_returned_as_responses() {
        let transport = MockTransport::fixed(404, "");
        let client = client(&transport, RequestDefaults::new().throw_http_errors(false));

        let_assert!(Ok(response) = client.get("users/42").await);
        check!(response.status() == 404);
    }

    #[tokio::test]
    async fn json_helpers_set_body_and_content_type() {
        let transport = MockTransport::fixed(201, "{}");
        let client = client(&transport, RequestDefaults::new());

        client
            .post_json("users", &json!({ "name": "ada" }))
            .await
            .expect("response");

        let requests = transport.requests();
        let_assert!([request] = requests.as_slice());
        check!(*request.method() == Method::POST);
        check!(request.header("content-type") == Some("application/json"));
        check!(request.body().map(|body| body.as_ref()) == Some(&br#"{"name":"ada"}"#[..]));
    }

    #[tokio::test]
    async fn extend_merges_defaults_and_shares_the_chain() {
        let transport = MockTransport::fixed(200, "");
        let base = client(&transport, RequestDefaults::new().header("Accept", "application/json"));
        let admin = base.extend(
            &RequestDefaults::new()
                .header("Authorization", "Bearer admin")
                .credentials(Credentials::Include),
        );

        admin.get("admin/stats").await.expect("response");
        base.get("status").await.expect("response");

        let requests = transport.requests();
        check!(requests.len() == 2);
        check!(requests[0].header("authorization") == Some("Bearer admin"));
        check!(requests[0].header("accept") == Some("application/json"));
        check!(requests[1].header("authorization").is_none());
        check!(admin.defaults().credentials_policy() == Credentials::Include);
        check!(base.defaults().credentials_policy() == Credentials::SameOrigin);
    }

    #[tokio::test]
    async fn released_slot_fails_to_resolve() {
        let slot = ClientSlot::default();
        check!(!slot.is_bound());

        {
            let client = client(&MockTransport::fixed(200, ""), RequestDefaults::new());
            slot.bind(&client.shared);
            check!(slot.resolve().is_ok());
        }

        check!(slot.is_bound());
        let_assert!(Err(Error::ClientReleased) = slot.resolve());
    }
}
