//! Outbound JSON-over-HTTP request helper.
//!
//! # Overview
//! A `Client` is configured once with a base address and default headers,
//! then runs one request per `Client::execute` call: it joins the URI path
//! onto the base address, merges per-call headers over the defaults, sends
//! the request under a caller-supplied `Context`, and decodes a 2xx JSON
//! body into the caller's destination.
//!
//! # Design
//! - Configuration is a list of `ClientOption`s applied in order; nothing is
//!   mutable afterwards.
//! - At most one request per `Client` is in flight. Callers take
//!   `Client::lock` before `execute`; the executor asserts this.
//! - Each pipeline stage fails with its own `Error` variant. Non-2xx
//!   responses are `ClientError`s, never transport errors.
//! - Cancellation and deadlines come from `Context`; a finished context
//!   abandons the in-flight request.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;

pub use client::{Client, FlightGuard};
pub use config::{with_base_url, with_default_headers, ClientConfig, ClientOption};
pub use context::{Context, ContextError};
pub use error::{BuildRequestError, ClientError, DecodeError, Error, TransportError};
pub use crate::http::{compose_url, merge_headers, Headers, QueryParams, RequestDetails};
