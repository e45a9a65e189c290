//! # Chapter 2: Refresh
//!
//! Recover from expired credentials without the caller noticing.
//!
//! ## The Pieces
//!
//! | Option | Role |
//! |--------|------|
//! | `is_unauthorized_response` | Decides whether a response means "credentials expired" |
//! | `refresh` | Gets new credentials and replays the request |
//!
//! Both are needed; with only one of them, nothing is installed.
//!
//! ## Example
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct Token {
//!     access: String,
//! }
//!
//! let client = create_client(
//!     "https://api.example.com",
//!     ClientOptions::new()
//!         .header("Authorization", "Bearer stale")
//!         .is_unauthorized_response(StatusClassifier::new(401))
//!         .refresh(|mut request: Request, replay: Replay, client: Client| async move {
//!             let token: Token = client
//!                 .post_json("auth/refresh", &serde_json::json!({ "grant": "refresh_token" }))
//!                 .await?
//!                 .json()?;
//!             request.set_header("Authorization", format!("Bearer {}", token.access));
//!             replay.send(request).await.map(Some)
//!         }),
//! )?;
//! ```
//!
//! The `client` handed to the procedure is a recovery client: same base URL,
//! defaults and logging, but no refresh hook, so a failing refresh call cannot
//! trigger another refresh.
//!
//! ## Rules
//!
//! - A request is refreshed at most once. If the replay is unauthorized too,
//!   that response is final.
//! - Returning `Ok(None)` keeps the original response.
//! - Errors from the classifier or the procedure reach the caller.
//! - Replays are not retried by the transport.
//!
//! ## Classifiers
//!
//! Besides [`StatusClassifier`](crate::StatusClassifier), any async closure
//! works, and [`from_fn`](crate::from_fn) wraps a synchronous predicate:
//!
//! ```ignore
//! let expired = tether::from_fn(|response: &Response| {
//!     response.status() == 400 && response.text().contains("token_expired")
//! });
//! ```
