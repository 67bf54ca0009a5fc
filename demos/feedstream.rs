//! Demo: fetch or read a feed and print its articles as JSON.
//!
//! Run with `cargo run --example feedstream -- <URL|FILE> [--field KEY=VALUE]`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedstream::config::FetchConfig;
use feedstream::feed::{self, FeedOptions, Fetcher, ParseResult};

#[derive(Parser, Debug)]
#[command(
    name = "feedstream",
    about = "Fetch or read an RSS/Atom feed and print its articles as JSON"
)]
struct Args {
    /// Feed URL (http:// or https://) or path to a local feed file
    source: String,

    /// Fetch settings (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Extra field attached to every article; VALUE is parsed as JSON when possible
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    fields: Vec<(String, serde_json::Value)>,
}

fn parse_field(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FetchConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => FetchConfig::default(),
    };
    let options = FeedOptions::from_pairs(args.fields);

    let result: ParseResult = if is_remote(&args.source) {
        let fetcher = Fetcher::new(config).context("Failed to build HTTP client")?;
        fetcher
            .fetch_feed(&args.source, &options)
            .await
            .with_context(|| format!("Failed to fetch {}", args.source))?
    } else {
        feed::parse_file(&args.source, &options)?
    };

    if result.is_partial() {
        tracing::warn!(
            diagnostics = result.diagnostics.len(),
            "Feed contained markup errors; output may be incomplete"
        );
    }

    let json = serde_json::to_string_pretty(&result.articles)?;
    println!("{json}");
    Ok(())
}
