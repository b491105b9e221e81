//! The request executor.
//!
//! # Design
//! `Client` holds a base address, default headers and a pooled
//! `reqwest::Client`, all fixed at construction. One call runs as a straight
//! pipeline: compose the URL, merge headers, build the request, send it,
//! classify the status, decode the body. Every stage maps its failure to its
//! own `Error` variant and stops there.
//!
//! A client allows one request in flight at a time. The caller enforces this
//! by holding the guard from `Client::lock` across `Client::execute`; the
//! executor only checks that the lock is taken and panics if it is not.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::{ClientConfig, ClientOption, Settings};
use crate::context::Context;
use crate::error::{BuildRequestError, ClientError, DecodeError, Error, TransportError};
use crate::http::{compose_url, merge_headers, Headers, RequestDetails};

/// HTTP client for a single JSON API.
///
/// The base address and default headers never change after construction.
#[derive(Debug)]
pub struct Client {
    base_url: String,
    default_headers: Headers,
    transport: reqwest::Client,
    flight: Mutex<()>,
}

/// Proof that the caller holds a client's flight lock. Released on drop.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Client {
    pub fn new(options: impl IntoIterator<Item = ClientOption>) -> Self {
        let settings = Settings::from_options(options);
        Self {
            base_url: settings.base_url,
            default_headers: settings.default_headers,
            transport: reqwest::Client::new(),
            flight: Mutex::new(()),
        }
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::new(config.into_options())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// Waits for this client's flight lock. Hold the guard for the whole
    /// `execute` call.
    pub async fn lock(&self) -> FlightGuard<'_> {
        FlightGuard {
            _guard: self.flight.lock().await,
        }
    }

    /// Sends the request described by `details` and decodes a 2xx JSON body
    /// into `details.response_out`.
    ///
    /// # Panics
    /// If the flight lock from `Client::lock` is not held.
    #[tracing::instrument(skip_all, fields(method = %details.method, uri = %details.uri))]
    pub async fn execute<T>(&self, ctx: &Context, details: RequestDetails<'_, T>) -> Result<(), Error>
    where
        T: DeserializeOwned,
    {
        assert!(
            self.flight.try_lock().is_err(),
            "dev error: forgot to lock client mutex"
        );

        let RequestDetails {
            method,
            uri,
            query,
            extra_headers,
            body,
            response_out,
        } = details;

        let url = compose_url(&self.base_url, &uri, query.as_ref()).map_err(Error::BuildUrl)?;
        let headers = merge_headers(&self.default_headers, extra_headers.as_ref());

        let method = parse_method(&method).map_err(Error::BuildRequest)?;
        let headers = header_map(&headers).map_err(Error::BuildRequest)?;
        let mut builder = self.transport.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder
            .build()
            .map_err(|e| Error::BuildRequest(BuildRequestError::Request(e)))?;

        tracing::debug!(url = %request.url(), "sending request");
        let response = ctx
            .run(self.transport.execute(request))
            .await
            .map_err(transport_error)?
            .map_err(transport_error)?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "received response");
        check_status(status)?;

        // The response is dropped at the end of this scope on every path.
        let bytes = ctx
            .run(response.bytes())
            .await
            .map_err(transport_error)?
            .map_err(transport_error)?;

        *response_out = decode(&bytes).map_err(Error::Decode)?;
        Ok(())
    }
}

fn transport_error(err: impl Into<TransportError>) -> Error {
    Error::Transport(err.into())
}

fn parse_method(method: &str) -> Result<Method, BuildRequestError> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes()).map_err(|source| BuildRequestError::Method {
        method: method.to_string(),
        source,
    })
}

fn header_map(headers: &Headers) -> Result<HeaderMap, BuildRequestError> {
    let mut map = HeaderMap::new();
    for (name, values) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|source| BuildRequestError::HeaderName {
                name: name.clone(),
                source,
            })?;
        for value in values {
            let header_value =
                HeaderValue::from_str(value).map_err(|source| BuildRequestError::HeaderValue {
                    name: name.clone(),
                    source,
                })?;
            map.append(header_name.clone(), header_value);
        }
    }
    Ok(map)
}

/// Anything outside 200..=299 is a `ClientError`.
fn check_status(status: StatusCode) -> Result<(), ClientError> {
    let code = status.as_u16();
    if !(200..=299).contains(&code) {
        return Err(ClientError {
            status_code: code,
            status: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }
    Ok(())
}

/// Decodes the first JSON value in `body`. Trailing bytes are not read.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<T>();
    match values.next() {
        Some(value) => Ok(value?),
        None => Err(DecodeError::Empty),
    }
}
