use crate::config::FetchConfig;
use crate::feed::article::Article;
use crate::feed::location::FeedLocation;
use crate::feed::options::FeedOptions;
use crate::feed::parser::{Diagnostic, ParseResult};
use crate::feed::reader::parse_bytes;
use crate::util::UrlValidationError;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use std::future::Future;
use thiserror::Error;
use tokio::time::Instant;

/// Errors that can occur while retrieving a feed.
///
/// Every way a fetch can fail is reported here; a fetch that returns `Ok`
/// always carries a complete body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The feed URL, or a redirect target, failed validation
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request or body transfer exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response that is neither 200 nor a 301/302 redirect
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The redirect chain was longer than the configured bound
    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),
    /// Redirect response without a usable `Location` header
    #[error("Redirect status {0} without a Location header")]
    MissingLocation(u16),
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A fully buffered response body.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    /// URL the body was finally served from, after redirects.
    pub final_url: String,
    /// Number of redirect hops followed.
    pub redirects: usize,
}

/// Retrieves feed documents over HTTP(S), following redirects itself.
///
/// The underlying client never follows redirects on its own so that the
/// hop bound, logging and host policy apply to every hop.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

/// Only 301 and 302 are followed; every other non-200 status is a failure.
fn is_redirect(status: StatusCode) -> bool {
    matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND)
}

/// Runs `fut` unless `deadline` passes first.
///
/// One deadline is shared by the request and its body transfer, so a slow
/// server cannot stretch a hop past the configured timeout.
async fn before_deadline<F: Future>(deadline: Instant, fut: F) -> Result<F::Output, FetchError> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| FetchError::Timeout)
}

impl Fetcher {
    /// Builds a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be constructed
    /// (for example, when the TLS backend fails to initialize).
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Retrieves the complete body at `url`, following up to
    /// `max_redirects` redirect hops.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] - bad URL or redirect target
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] - transport failure (not retried)
    /// - [`FetchError::TooManyRedirects`] - redirect bound exceeded
    /// - [`FetchError::MissingLocation`] - redirect without a target
    /// - [`FetchError::HttpStatus`] - any status other than 200, 301 or 302
    /// - [`FetchError::ResponseTooLarge`] / [`FetchError::IncompleteResponse`] - body problems
    pub async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let mut location = FeedLocation::parse(url, self.config.host_policy())?;
        let mut redirects = 0;

        loop {
            tracing::debug!(
                host = %location.host(),
                port = location.port(),
                path = %location.path_and_query(),
                "Requesting feed"
            );

            let deadline = Instant::now() + self.config.request_timeout();
            let response = before_deadline(deadline, self.client.get(location.as_str()).send())
                .await?
                .map_err(FetchError::Network)?;

            let status = response.status();

            if status == StatusCode::OK {
                let bytes = before_deadline(
                    deadline,
                    read_limited_bytes(response, self.config.max_feed_size),
                )
                .await??;

                return Ok(FetchedBody {
                    bytes,
                    final_url: location.to_string(),
                    redirects,
                });
            }

            if is_redirect(status) {
                if redirects >= self.config.max_redirects {
                    tracing::warn!(
                        url = %location,
                        limit = self.config.max_redirects,
                        "Too many redirects, abandoning fetch"
                    );
                    return Err(FetchError::TooManyRedirects(self.config.max_redirects));
                }

                let target = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(FetchError::MissingLocation(status.as_u16()))?;
                let next = location.join(target)?;

                redirects += 1;
                tracing::info!(
                    from = %location,
                    to = %next,
                    status = status.as_u16(),
                    hop = redirects,
                    "Following redirect"
                );
                location = next;
                continue;
            }

            return Err(FetchError::HttpStatus(status.as_u16()));
        }
    }

    /// Fetches `url` and parses the body as a feed.
    ///
    /// Malformed markup does not fail the call; check
    /// [`ParseResult::is_partial`] and the diagnostics instead.
    pub async fn fetch_feed(
        &self,
        url: &str,
        options: &FeedOptions,
    ) -> Result<ParseResult, FetchError> {
        let body = self.fetch(url).await?;
        let result = parse_bytes(&body.bytes, options);

        if result.is_partial() {
            tracing::warn!(
                url = %body.final_url,
                articles = result.articles.len(),
                diagnostics = result.diagnostics.len(),
                "Feed parsed with errors, results may be incomplete"
            );
        }

        Ok(result)
    }

    /// Callback form of [`fetch_feed`](Self::fetch_feed).
    ///
    /// `on_complete` runs exactly once with the article list when the fetch
    /// succeeds and is never called when it fails. Parse diagnostics are
    /// returned to the caller.
    pub async fn fetch_feed_with<F>(
        &self,
        url: &str,
        options: &FeedOptions,
        on_complete: F,
    ) -> Result<Vec<Diagnostic>, FetchError>
    where
        F: FnOnce(Vec<Article>),
    {
        let ParseResult {
            articles,
            diagnostics,
        } = self.fetch_feed(url, options).await?;
        on_complete(articles);
        Ok(diagnostics)
    }
}

/// Buffers the body in arrival order, enforcing a size limit and checking
/// the received length against `Content-Length`.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
