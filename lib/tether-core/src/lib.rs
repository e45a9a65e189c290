//! Core types and traits for the tether HTTP client.
//!
//! This crate provides the value types shared by the transport and the hook
//! chain:
//! - [`Method`] - HTTP method (re-exported from `http`)
//! - [`Request`] and [`RequestBuilder`] - requests with typed extensions
//! - [`Response`] - buffered HTTP response
//! - [`Error`] and [`Result`] - error handling
//! - [`HttpClient`] - the execution seam

mod body;
mod client;
mod error;
pub mod prelude;
mod request;
mod response;

pub use body::{JSON_CONTENT_TYPE, from_json, to_json};
pub use client::HttpClient;
pub use error::{Error, Result};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for methods, status codes, headers and extensions
pub use http::{Extensions, Method, StatusCode, header};
