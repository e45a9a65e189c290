//! # Chapter 0: Getting Started
//!
//! Your first tether client.
//!
//! ## What You'll Learn
//!
//! - Create a client bound to a base URL
//! - Set default headers and the credential policy
//! - Handle non-2xx responses
//!
//! ## Prerequisites
//!
//! Add to `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tether = "0.1"
//! serde = { version = "1.0", features = ["derive"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Your First Client
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct User {
//!     pub id: u64,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> tether::Result<()> {
//!     let client = create_client(
//!         "https://api.example.com/v1",
//!         ClientOptions::new().header("Accept", "application/json"),
//!     )?;
//!
//!     let user: User = client.get("users/42").await?.json()?;
//!     println!("User: {user:?}");
//!     Ok(())
//! }
//! ```
//!
//! Paths are joined onto the base URL, so `users/42` becomes
//! `https://api.example.com/v1/users/42`. A path starting with `/` is
//! rejected with [`Error::InvalidRequest`](crate::Error::InvalidRequest).
//!
//! ## Credentials
//!
//! Default `Authorization`, `Cookie` and `Proxy-Authorization` headers follow
//! the [`Credentials`](crate::Credentials) policy. With the default,
//! `SameOrigin`, they are only sent to the base URL's origin:
//!
//! ```ignore
//! let client = create_client(
//!     "https://api.example.com",
//!     ClientOptions::new()
//!         .header("Authorization", "Bearer t0k3n")
//!         .credentials(Credentials::SameOrigin),
//! )?;
//! ```
//!
//! ## Errors
//!
//! A non-2xx response is turned into [`Error::Http`](crate::Error::Http)
//! carrying the status and the body:
//!
//! ```ignore
//! match client.get("users/0").await {
//!     Err(error) if error.status() == Some(404) => println!("no such user"),
//!     Err(error) => return Err(error),
//!     Ok(response) => println!("{}", response.text()),
//! }
//! ```
//!
//! Turn this off with `.throw_http_errors(false)` to inspect every response
//! yourself.
//!
//! ## Derived Clients
//!
//! [`Client::extend`](crate::Client::extend) returns a handle with extra
//! defaults that shares the connection pool and hooks:
//!
//! ```ignore
//! let admin = client.extend(&RequestDefaults::new().header("X-Role", "admin"));
//! ```
//!
//! ## Next Steps
//!
//! - [Chapter 1: Logging][super::chapter_1] - See every request and response
