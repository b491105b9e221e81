//! Error types for the request executor.
//!
//! # Design
//! Each step of `Client::execute` fails with its own `Error` variant so the
//! caller can tell which stage broke. `ClientError` is kept separate from the
//! transport failures: it describes a round-trip that completed but carried a
//! non-2xx status. Lower-level causes stay reachable through `source()`.

use thiserror::Error;

use crate::context::ContextError;

/// Errors returned by `Client::execute`.
#[derive(Debug, Error)]
pub enum Error {
    /// Base address and URI path could not be composed into a valid URL.
    #[error("failed to build url")]
    BuildUrl(#[source] url::ParseError),

    /// The outbound request could not be assembled.
    #[error("failed to create http request")]
    BuildRequest(#[source] BuildRequestError),

    /// Network failure, or the context was cancelled or hit its deadline.
    #[error("failed to execute http request")]
    Transport(#[source] TransportError),

    /// The server answered with a status outside 200..=299.
    #[error(transparent)]
    Status(#[from] ClientError),

    /// The success body was not the expected JSON.
    #[error("failed to decode response")]
    Decode(#[source] DecodeError),
}

/// A completed round-trip with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status_code}: {status}")]
pub struct ClientError {
    pub status_code: u16,
    /// Canonical reason phrase, empty for codes without one.
    pub status: String,
}

#[derive(Debug, Error)]
pub enum BuildRequestError {
    #[error("invalid method {method:?}")]
    Method {
        method: String,
        #[source]
        source: ::http::method::InvalidMethod,
    },

    #[error("invalid header name {name:?}")]
    HeaderName {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },

    #[error("invalid value for header {name:?}")]
    HeaderValue {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error(transparent)]
    Request(reqwest::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Context(#[from] ContextError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty response body")]
    Empty,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Status code of a non-success response, if that is what this error is.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status(e) => Some(e.status_code),
            _ => None,
        }
    }

    /// True when the call was abandoned because its context finished.
    pub fn is_context(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Context(_)))
    }
}
