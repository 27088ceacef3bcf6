//! A search provider backed by the Exa search API.
//!
//! Each query is one `POST /search` with highlighted page contents, so a
//! hit carries a few relevant snippets instead of the full page text.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use research_agent_search::{
    ErrorKind, SearchProvider, SearchProviderError, SearchResults,
};

pub use config::{ExaConfig, ExaConfigBuilder};

/// Error type for [`ExaProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() || err.is_request() {
            ErrorKind::Network
        } else if err.is_decode() {
            ErrorKind::MalformedResponse
        } else {
            ErrorKind::Other
        };
        Self::new(err.to_string(), kind)
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ErrorKind::Unauthorized
            }
            StatusCode::PAYMENT_REQUIRED => ErrorKind::QuotaExceeded,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            status if status.is_server_error() => ErrorKind::Unavailable,
            _ => ErrorKind::Other,
        };
        let detail = serde_json::from_str::<proto::ErrorBody>(body)
            .map(|body| body.error)
            .unwrap_or_else(|_| body.trim().to_owned());
        let message = if detail.is_empty() {
            format!("server responded with {status}")
        } else {
            format!("server responded with {status}: {detail}")
        };
        Self::new(message, kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl SearchProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Exa search provider.
#[derive(Clone, Debug)]
pub struct ExaProvider {
    client: Client,
    config: Arc<ExaConfig>,
}

impl ExaProvider {
    /// Creates a new `ExaProvider` with the given configuration.
    #[inline]
    pub fn new(config: ExaConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &ExaConfig {
        &self.config
    }
}

impl SearchProvider for ExaProvider {
    type Error = Error;

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<SearchResults, Self::Error>> + Send + 'static
    {
        let resp_fut = (!query.trim().is_empty()).then(|| {
            let exa_req = proto::create_request(query, &self.config);
            self.client
                .post(format!("{}/search", self.config.base_url))
                .header("x-api-key", &self.config.api_key)
                .timeout(self.config.request_timeout)
                .json(&exa_req)
                .send()
        });
        let query = query.to_owned();

        async move {
            let Some(resp_fut) = resp_fut else {
                return Err(Error::new(
                    "query must not be empty",
                    ErrorKind::InvalidQuery,
                ));
            };
            let resp = resp_fut.await.map_err(Error::from_reqwest)?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let err = Error::from_status(status, &body);
                debug!("search rejected: {err}");
                return Err(err);
            }

            let body = resp.bytes().await.map_err(Error::from_reqwest)?;
            let exa_resp: proto::SearchResponse = serde_json::from_slice(&body)
                .map_err(|err| {
                    Error::new(
                        format!("failed to decode search response: {err}"),
                        ErrorKind::MalformedResponse,
                    )
                })?;
            trace!(
                "search for {query:?} returned {} results",
                exa_resp.results.len()
            );
            Ok(proto::into_results(&query, exa_resp))
        }
    }
}
