use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
///
/// These errors cover both parsing failures and the optional SSRF
/// (Server-Side Request Forgery) policy.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Which hosts a fetch may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostPolicy {
    /// Any host, including loopback and private ranges.
    #[default]
    Any,
    /// Public hosts only: localhost and private IP ranges are rejected.
    PublicOnly,
}

/// Validates a URL string for use as a feed source.
///
/// Only `http` and `https` are accepted. With [`HostPolicy::PublicOnly`],
/// localhost (`localhost`, `127.0.0.1`, `::1`) and private IP ranges
/// (RFC 1918, link-local, unique local IPv6) are rejected as well, which
/// matters when the URL comes from untrusted input such as a redirect.
///
/// # Examples
///
/// ```
/// use feedstream::util::{validate_url, HostPolicy};
///
/// let url = validate_url("https://example.com/feed.xml", HostPolicy::PublicOnly).unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("http://localhost/feed", HostPolicy::Any).is_ok());
/// assert!(validate_url("http://localhost/feed", HostPolicy::PublicOnly).is_err());
/// assert!(validate_url("file:///etc/passwd", HostPolicy::Any).is_err());
/// ```
pub fn validate_url(url_str: &str, policy: HostPolicy) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    check_url(&url, policy)?;
    Ok(url)
}

/// Applies the scheme and host checks of [`validate_url`] to an already parsed URL.
pub fn check_url(url: &Url, policy: HostPolicy) -> Result<(), UrlValidationError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;

    if policy == HostPolicy::Any {
        return Ok(());
    }

    if host == "localhost" {
        return Err(UrlValidationError::Localhost);
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}
