//! URL validation shared by the fetcher and feed locations.

mod url_validator;

pub use url_validator::{check_url, validate_url, HostPolicy, UrlValidationError};
