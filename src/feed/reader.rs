use crate::feed::article::Article;
use crate::feed::options::FeedOptions;
use crate::feed::parser::{FeedParser, ParseResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that prevent a local feed from being parsed at all.
///
/// Malformed markup is not an error here; it is reported through
/// [`ParseResult::diagnostics`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to open feed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parses a feed held in memory as a string.
pub fn parse_str(content: &str, options: &FeedOptions) -> ParseResult {
    parse_reader(content.as_bytes(), options)
}

/// Parses a feed held in memory as raw bytes (for example, an HTTP body).
pub fn parse_bytes(bytes: &[u8], options: &FeedOptions) -> ParseResult {
    parse_reader(bytes, options)
}

/// Parses a feed from a local file, streaming it through a buffered reader.
///
/// # Errors
///
/// Returns [`ParseError::Io`] if the file cannot be opened. Read failures
/// after that point are recorded as diagnostics on the result.
pub fn parse_file(path: impl AsRef<Path>, options: &FeedOptions) -> Result<ParseResult, ParseError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Parsing local feed");
    Ok(parse_reader(BufReader::new(file), options))
}

/// Callback form of [`parse_file`]: `on_complete` runs once with the
/// article list when the end of the document is reached.
pub fn parse_file_with<F>(
    path: impl AsRef<Path>,
    options: &FeedOptions,
    on_complete: F,
) -> Result<(), ParseError>
where
    F: FnOnce(Vec<Article>),
{
    let result = parse_file(path, options)?;
    on_complete(result.articles);
    Ok(())
}

/// Streams any buffered source through the tokenizer and into a fresh [`FeedParser`].
///
/// The tokenizer is configured leniently (mismatched or unmatched closing
/// tags are tolerated) because real-world feeds are frequently sloppy.
/// Errors it still reports are recorded and reading resumes; if the reader
/// stops making progress the document is treated as ended.
pub fn parse_reader<R: BufRead>(source: R, options: &FeedOptions) -> ParseResult {
    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations, so a
    // hostile DOCTYPE cannot pull in external content. Only the five XML
    // builtins are unescaped in text and attribute values.
    let mut reader = Reader::from_reader(source);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.expand_empty_elements = true;

    let mut parser = FeedParser::new(options);
    let mut buf = Vec::new();
    let mut last_error_at: Option<u64> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let attributes = collect_attributes(&e, &reader, &mut parser);
                let local_name = e.local_name();
                parser.start_element(&String::from_utf8_lossy(local_name.as_ref()), attributes);
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                parser.end_element(
                    &String::from_utf8_lossy(name.local_name().as_ref()),
                    name.prefix().is_some(),
                );
            }
            Ok(Event::Text(e)) => match e.unescape() {
                Ok(text) => parser.characters(&text),
                Err(err) => {
                    parser.warning(
                        format!("Unescape failed, keeping raw text: {err}"),
                        reader.buffer_position(),
                    );
                    parser.characters(&String::from_utf8_lossy(&e));
                }
            },
            Ok(Event::CData(e)) => parser.cdata(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                let position = reader.buffer_position();
                parser.error(err.to_string(), position);
                if last_error_at == Some(position) {
                    break;
                }
                last_error_at = Some(position);
            }
        }
        buf.clear();
    }

    parser.finish()
}

/// Decodes attributes into (local name, value) pairs.
///
/// Malformed attributes are skipped with a warning rather than failing the element.
fn collect_attributes<R>(
    e: &BytesStart<'_>,
    reader: &Reader<R>,
    parser: &mut FeedParser<'_>,
) -> Vec<(String, String)> {
    let mut attributes = Vec::new();

    // Duplicate names are passed through so the parser can keep the last one.
    for attr_result in e.attributes().with_checks(false) {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                parser.warning(
                    format!("Skipping malformed attribute: {err}"),
                    reader.buffer_position(),
                );
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => attributes.push((key, value.into_owned())),
            Err(err) => parser.warning(
                format!("Skipping undecodable attribute {key}: {err}"),
                reader.buffer_position(),
            ),
        }
    }

    attributes
}
