//! # Chapter 1: Logging
//!
//! Turn on request/response logging.
//!
//! ```ignore
//! let client = create_client(
//!     "https://api.example.com",
//!     ClientOptions::new().logging(true),
//! )?;
//! ```
//!
//! Entries go to `tracing`; install any subscriber to see them:
//!
//! ```text
//! INFO http_request{id=req-1 method=POST path=/sessions}: [REQ] POST /sessions
//! INFO http_request{id=req-1 method=POST path=/sessions}: Request Body: {"user":"ada"}
//! INFO http_response{id=req-1 method=POST path=/sessions status=201}: [RES] POST /sessions - 201
//! INFO http_response{id=req-1 method=POST path=/sessions status=201}: Time: 42.13370ms
//! INFO http_response{id=req-1 method=POST path=/sessions status=201}: Response Body: {"token":"..."}
//! ```
//!
//! Responses with status 400 and above log their title at `WARN`. Response
//! bodies are shown as JSON when they parse, as text otherwise.
//!
//! ## Custom Sinks
//!
//! Implement [`LogSink`](crate::LogSink) to route entries elsewhere:
//!
//! ```ignore
//! struct Stdout;
//!
//! impl LogSink for Stdout {
//!     fn record(&self, entry: &LogEntry) {
//!         match entry {
//!             LogEntry::Request(log) => println!("{}", log.title()),
//!             LogEntry::Response(log) => println!("{} ({:?})", log.title(), log.elapsed),
//!         }
//!     }
//! }
//!
//! let options = ClientOptions::new().logging(true).log_sink(Stdout);
//! ```
//!
//! ## Next Steps
//!
//! - [Chapter 2: Refresh][super::chapter_2] - Recover from expired tokens
