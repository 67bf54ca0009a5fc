use crate::util::{check_url, validate_url, HostPolicy, UrlValidationError};
use std::fmt;
use url::Url;

/// A validated feed URL, broken into the parts an HTTP request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLocation {
    url: Url,
    policy: HostPolicy,
}

impl FeedLocation {
    /// Parses and validates `url_str` under the given host policy.
    pub fn parse(url_str: &str, policy: HostPolicy) -> Result<Self, UrlValidationError> {
        let url = validate_url(url_str, policy)?;
        Ok(Self { url, policy })
    }

    /// Resolves a redirect target (absolute or relative) against this location.
    ///
    /// The target is held to the same host policy as the original URL.
    pub fn join(&self, target: &str) -> Result<Self, UrlValidationError> {
        let url = self.url.join(target)?;
        check_url(&url, self.policy)?;
        Ok(Self {
            url,
            policy: self.policy,
        })
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        // validate_url guarantees a host
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or 443 for `https` and 80 otherwise.
    pub fn port(&self) -> u16 {
        self.url
            .port()
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    /// Request target: the path with the query string appended when present.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_owned(),
        }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for FeedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
