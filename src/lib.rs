//! Streaming RSS/Atom ingestion.
//!
//! Fetch a feed over HTTP(S) with bounded redirect following, or read one
//! from disk, and turn its `item`/`entry` elements into ordered
//! [`feed::Article`] records using event-driven parsing.

pub mod config;
pub mod feed;
pub mod util;
