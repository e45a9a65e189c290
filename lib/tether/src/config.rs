//! Client configuration types.
//!
//! - [`ClientConfig`] (base URL and [`TransportConfig`]) is fixed when the
//!   client is created and shared by every handle derived from it.
//! - [`RequestDefaults`] travels with each [`Client`](crate::Client) handle and
//!   can be merged through [`Client::extend`](crate::Client::extend).

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::Request;

/// Headers that carry ambient credentials, governed by [`Credentials`].
const CREDENTIAL_HEADERS: [&str; 3] = ["authorization", "cookie", "proxy-authorization"];

/// Configuration for the underlying transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Request timeout duration.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Maximum retries for idempotent requests (0 disables retrying).
    pub retry_limit: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            retry_limit: 2,
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    retry_limit: Option<u32>,
}

impl TransportConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the retry limit for idempotent requests.
    #[must_use]
    pub const fn retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            retry_limit: self.retry_limit.unwrap_or(defaults.retry_limit),
        }
    }
}

/// Immutable configuration shared by a client, its derived handles and its
/// recovery client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    transport: TransportConfig,
}

impl ClientConfig {
    /// Parse `base_url`, ensuring it ends with a slash so relative paths
    /// extend it instead of replacing its last segment.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`](crate::Error::InvalidUrl) when `base_url` does
    /// not parse, [`Error::InvalidRequest`](crate::Error::InvalidRequest) when
    /// it cannot be a base (e.g. `mailto:`).
    pub fn new(base_url: &str, transport: TransportConfig) -> crate::Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(crate::Error::invalid_request(format!(
                "`{base_url}` cannot be used as a base URL"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            transport,
        })
    }

    /// Base URL, always ending with `/`.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Transport settings.
    #[must_use]
    pub const fn transport(&self) -> &TransportConfig {
        &self.transport
    }
}

/// When default credential headers are forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Never attach default credential headers.
    Omit,
    /// Attach them only to requests on the base URL's origin.
    #[default]
    SameOrigin,
    /// Always attach them.
    Include,
}

impl Credentials {
    fn allows(self, base_url: &Url, target: &Url) -> bool {
        match self {
            Self::Omit => false,
            Self::SameOrigin => base_url.origin() == target.origin(),
            Self::Include => true,
        }
    }
}

/// Per-handle request defaults.
///
/// Unset fields fall back to: no headers, [`Credentials::SameOrigin`], and
/// throwing on non-2xx responses.
#[derive(Debug, Clone, Default)]
pub struct RequestDefaults {
    headers: HashMap<String, String>,
    credentials: Option<Credentials>,
    throw_http_errors: Option<bool>,
}

impl RequestDefaults {
    /// Empty defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Set the credential-forwarding policy.
    #[must_use]
    pub const fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set whether non-2xx responses become [`Error::Http`](crate::Error::Http).
    #[must_use]
    pub const fn throw_http_errors(mut self, throw: bool) -> Self {
        self.throw_http_errors = Some(throw);
        self
    }

    /// Default headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Effective credential policy.
    #[must_use]
    pub fn credentials_policy(&self) -> Credentials {
        self.credentials.unwrap_or_default()
    }

    /// Effective HTTP-error policy.
    #[must_use]
    pub fn throws_http_errors(&self) -> bool {
        self.throw_http_errors.unwrap_or(true)
    }

    /// Merge `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &other.headers {
            merged = merged.header(name.clone(), value.clone());
        }
        merged.credentials = other.credentials.or(self.credentials);
        merged.throw_http_errors = other.throw_http_errors.or(self.throw_http_errors);
        merged
    }

    /// Fill in default headers the request does not already carry.
    ///
    /// Credential headers are only added when the policy allows it for the
    /// request's origin.
    pub(crate) fn apply(&self, request: &mut Request, base_url: &Url) {
        let forward_credentials = self.credentials_policy().allows(base_url, request.url());

        for (name, value) in &self.headers {
            if request.header(name).is_some() {
                continue;
            }
            if is_credential_header(name) && !forward_credentials {
                continue;
            }
            request.set_header(name.clone(), value.clone());
        }
    }
}

fn is_credential_header(name: &str) -> bool {
    CREDENTIAL_HEADERS
        .iter()
        .any(|header| header.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;
    use crate::Method;

    fn request(url: &str) -> Request {
        Request::builder(Method::GET, Url::parse(url).expect("valid URL")).build()
    }

    fn base() -> Url {
        Url::parse("https://api.example.com/v1/").expect("valid URL")
    }

    #[test]
    fn default_transport_config() {
        let config = TransportConfig::default();
        check!(config.timeout == Duration::from_secs(30));
        check!(config.connect_timeout == Duration::from_secs(10));
        check!(config.retry_limit == 2);
    }

    #[test]
    fn transport_builder_overrides() {
        let config = TransportConfig::builder()
            .timeout(Duration::from_secs(5))
            .retry_limit(0)
            .build();

        check!(config.timeout == Duration::from_secs(5));
        check!(config.retry_limit == 0);
        check!(config.pool_idle_per_host == 32);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ClientConfig::new("https://api.example.com/v1", TransportConfig::default())
            .expect("config");
        check!(config.base_url().as_str() == "https://api.example.com/v1/");

        let config = ClientConfig::new("https://api.example.com", TransportConfig::default())
            .expect("config");
        check!(config.base_url().as_str() == "https://api.example.com/");
    }

    #[test]
    fn base_url_must_be_a_base() {
        check!(ClientConfig::new("not a url", TransportConfig::default()).is_err());
        check!(ClientConfig::new("mailto:ops@example.com", TransportConfig::default()).is_err());
    }

    #[test]
    fn request_defaults_fallbacks() {
        let defaults = RequestDefaults::new();
        check!(defaults.credentials_policy() == Credentials::SameOrigin);
        check!(defaults.throws_http_errors());
    }

    #[test]
    fn merge_prefers_other() {
        let base_defaults = RequestDefaults::new()
            .header("Accept", "application/json")
            .header("X-Client", "web")
            .throw_http_errors(false);
        let extra = RequestDefaults::new()
            .header("x-client", "cli")
            .credentials(Credentials::Include);

        let merged = base_defaults.merge(&extra);

        check!(merged.headers().len() == 2);
        check!(merged.headers().get("x-client").map(String::as_str) == Some("cli"));
        check!(merged.credentials_policy() == Credentials::Include);
        check!(!merged.throws_http_errors());
    }

    #[test]
    fn apply_keeps_explicit_headers() {
        let defaults = RequestDefaults::new().header("Accept", "application/json");
        let mut req = request("https://api.example.com/v1/me");
        req.set_header("accept", "text/plain");

        defaults.apply(&mut req, &base());

        check!(req.headers().len() == 1);
        check!(req.header("Accept") == Some("text/plain"));
    }

    #[test]
    fn same_origin_credentials() {
        let defaults = RequestDefaults::new().header("Authorization", "Bearer t0k3n");

        let mut same = request("https://api.example.com/v1/me");
        defaults.apply(&mut same, &base());
        check!(same.header("authorization") == Some("Bearer t0k3n"));

        let mut other = request("https://cdn.example.com/avatar.png");
        defaults.apply(&mut other, &base());
        check!(other.header("authorization").is_none());
    }

    #[test]
    fn omit_and_include_credentials() {
        let omit = RequestDefaults::new()
            .header("Cookie", "sid=1")
            .header("Accept", "application/json")
            .credentials(Credentials::Omit);
        let mut req = request("https://api.example.com/v1/me");
        omit.apply(&mut req, &base());
        check!(req.header("cookie").is_none());
        check!(req.header("accept") == Some("application/json"));

        let include = RequestDefaults::new()
            .header("Cookie", "sid=1")
            .credentials(Credentials::Include);
        let mut req = request("https://cdn.example.com/avatar.png");
        include.apply(&mut req, &base());
        check!(req.header("cookie") == Some("sid=1"));
    }
}
