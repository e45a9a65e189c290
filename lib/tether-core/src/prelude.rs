//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tether_core::prelude::*;
//! ```

pub use crate::{Error, HttpClient, Method, Request, RequestBuilder, Response, Result, from_json, to_json};
