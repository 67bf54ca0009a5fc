//! RSS/Atom ingestion: fetching and streaming article extraction.
//!
//! - **Parsing**: SAX-style extraction of `item`/`entry` elements into
//!   [`Article`] records, without building a document tree
//! - **Fetching**: HTTP(S) retrieval with bounded, logged redirect following
//!
//! # Architecture
//!
//! - [`parser`] - the per-document state machine, independent of any tokenizer
//! - [`reader`] - drives `quick-xml` events into the state machine
//! - [`fetcher`] - buffers a complete response body, then hands it to the reader
//!
//! # Example
//!
//! ```no_run
//! use feedstream::feed::{parse_url, FeedOptions};
//!
//! # async fn run() -> Result<(), feedstream::feed::FetchError> {
//! let options = FeedOptions::new().with_field("feed_id", 7);
//! let result = parse_url("https://example.com/rss.xml", &options).await?;
//! for article in &result.articles {
//!     println!("{:?}", article.title());
//! }
//! # Ok(())
//! # }
//! ```

mod article;
pub mod fetcher;
mod location;
mod options;
pub mod parser;
pub mod reader;

pub use article::{Article, FeedDate, FieldValue};
pub use fetcher::{FetchError, FetchedBody, Fetcher};
pub use location::FeedLocation;
pub use options::FeedOptions;
pub use parser::{Diagnostic, FeedParser, ParseResult, Severity};
pub use reader::{parse_bytes, parse_file, parse_file_with, parse_reader, parse_str, ParseError};

use crate::config::FetchConfig;

/// Fetches and parses a feed with the default [`FetchConfig`].
///
/// Use a [`Fetcher`] directly to reuse its connection pool across feeds
/// or to change limits.
pub async fn parse_url(url: &str, options: &FeedOptions) -> Result<ParseResult, FetchError> {
    Fetcher::new(FetchConfig::default())?
        .fetch_feed(url, options)
        .await
}
