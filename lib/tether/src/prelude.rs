//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tether::prelude::*;
//! ```

pub use crate::{
    Client, ClientOptions, Credentials, Error, HttpClient, LogSink, Method, Refresh,
    RequestDefaults, Replay, Request, RequestBuilder, Response, Result, StatusClassifier,
    StatusCode, UnauthorizedClassifier, create_client, from_json, header, to_json,
};
pub use serde::{Deserialize, Serialize};
