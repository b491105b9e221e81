//! Client configuration.
//!
//! # Design
//! A client is built by applying `ClientOption`s in order to an empty
//! `Settings`, so a later option of the same kind overwrites an earlier one.
//! Options only assign fields; nothing is validated until a request is made.
//! `ClientConfig` is the serde-friendly form for callers that keep their
//! settings in a file or environment.

use serde::Deserialize;

use crate::http::Headers;

/// One configuration effect, applied by `Client::new`.
#[derive(Debug, Clone)]
pub enum ClientOption {
    BaseUrl(String),
    /// Replaces the whole default-header mapping.
    DefaultHeaders(Headers),
}

pub fn with_base_url(base_url: impl Into<String>) -> ClientOption {
    ClientOption::BaseUrl(base_url.into())
}

pub fn with_default_headers(headers: Headers) -> ClientOption {
    ClientOption::DefaultHeaders(headers)
}

#[derive(Debug, Default)]
pub(crate) struct Settings {
    pub(crate) base_url: String,
    pub(crate) default_headers: Headers,
}

impl Settings {
    pub(crate) fn from_options(options: impl IntoIterator<Item = ClientOption>) -> Self {
        let mut settings = Settings::default();
        for option in options {
            settings.apply(option);
        }
        settings
    }

    fn apply(&mut self, option: ClientOption) {
        match option {
            ClientOption::BaseUrl(base_url) => {
                tracing::trace!(%base_url, "setting base url");
                self.base_url = base_url;
            }
            ClientOption::DefaultHeaders(headers) => {
                tracing::trace!(count = headers.len(), "setting default headers");
                self.default_headers = headers;
            }
        }
    }
}

/// Deserializable client settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub default_headers: Headers,
}

impl ClientConfig {
    pub fn into_options(self) -> Vec<ClientOption> {
        vec![
            with_base_url(self.base_url),
            with_default_headers(self.default_headers),
        ]
    }
}
