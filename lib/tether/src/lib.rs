//! HTTP client factory with request logging and transparent re-authentication.
//!
//! [`create_client`] builds a [`Client`] bound to a base URL. Two optional
//! hooks run around every request:
//!
//! - a logger emitting a `[REQ]` entry before each request and a `[RES]` entry
//!   with the elapsed time after each response,
//! - a refresh coordinator that, when a response is classified as
//!   unauthorized, runs a caller-supplied recovery procedure (typically a
//!   token refresh) and replays the request once.
//!
//! # Example
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let client = create_client(
//!     "https://api.example.com/v1",
//!     ClientOptions::new()
//!         .logging(true)
//!         .header("Authorization", "Bearer stale")
//!         .is_unauthorized_response(StatusClassifier::new(401))
//!         .refresh(|mut request: Request, replay: Replay, client: Client| async move {
//!             let token: Token = client.post_json("auth/refresh", &refresh_token).await?.json()?;
//!             request.set_header("Authorization", format!("Bearer {}", token.access));
//!             replay.send(request).await.map(Some)
//!         }),
//! )?;
//!
//! let me: User = client.get("users/me").await?.json()?;
//! ```
//!
//! See the [tutorial][_tutorial] for a walkthrough.

pub mod _tutorial;
mod client;
mod config;
mod factory;
pub mod hooks;
pub mod prelude;
mod retry;
mod transport;

pub use client::Client;
pub use config::{ClientConfig, Credentials, RequestDefaults, TransportConfig, TransportConfigBuilder};
pub use factory::{ClientOptions, create_client};
pub use hooks::classify::{StatusClassifier, UnauthorizedClassifier, from_fn};
pub use hooks::logging::{LogBody, LogEntry, LogSink, RequestLog, ResponseLog, TracingSink};
pub use hooks::refresh::{Refresh, RefreshOutcome, RefreshState, Replay};
pub use hooks::{RequestContext, RequestId};
pub use retry::{RetryDisabled, RetryPolicy};
pub use transport::{BoxedService, ServiceFuture};

// Re-export tower for caller layers
pub use tower;

// Re-export core types
pub use tether_core::{
    Error, Extensions, HttpClient, JSON_CONTENT_TYPE, Method, Request, RequestBuilder, Response,
    Result, StatusCode, from_json, header, to_json,
};

pub use url;
