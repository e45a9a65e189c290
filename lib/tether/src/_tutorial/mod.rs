//! # Tutorial: HTTP Clients with tether
//!
//! Build a client, watch its traffic, and let it recover from expired tokens.
//!
//! ## Chapters
//!
//! 1. [Getting Started][chapter_0] - Base URL, defaults, errors
//! 2. [Logging][chapter_1] - Request/response entries and custom sinks
//! 3. [Refresh][chapter_2] - Classifying, refreshing and replaying
//!
//! Ready? Start with [Chapter 0: Getting Started][chapter_0].

pub mod chapter_0;
pub mod chapter_1;
pub mod chapter_2;
