use crate::feed::article::{Article, FeedDate, FieldValue};
use crate::feed::options::FeedOptions;
use std::collections::HashMap;

/// How the text or attributes of a recognized element become an article field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRule {
    /// Timestamp, stored under the element name.
    Date,
    /// Trimmed text, stored under the element name.
    Text,
    /// Trimmed text, stored under `content`.
    Content,
    /// `href` attribute when present, otherwise trimmed text of unprefixed elements.
    HrefOrText,
}

/// Recognized elements, keyed by lowercased local name.
///
/// `encoded` is the local name of the vendor `content:encoded` element.
const FIELD_TABLE: &[(&str, FieldRule)] = &[
    ("pubdate", FieldRule::Date),
    ("published", FieldRule::Date),
    ("description", FieldRule::Text),
    ("summary", FieldRule::Text),
    ("content", FieldRule::Content),
    ("encoded", FieldRule::Content),
    ("link", FieldRule::HrefOrText),
    ("title", FieldRule::HrefOrText),
];

const CONTENT_FIELD: &str = "content";

fn field_rule(name: &str) -> Option<FieldRule> {
    FIELD_TABLE
        .iter()
        .find(|(element, _)| *element == name)
        .map(|(_, rule)| *rule)
}

/// `item` (RSS) and `entry` (Atom) delimit one article.
fn is_article_boundary(local_name: &str) -> bool {
    local_name.eq_ignore_ascii_case("item") || local_name.eq_ignore_ascii_case("entry")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A tokenizer complaint recorded during a parse.
///
/// Diagnostics never stop the parse; they explain why a result may be partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Byte offset into the document where the tokenizer noticed the problem.
    pub position: u64,
}

/// Outcome of parsing one feed document.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Articles in document order.
    pub articles: Vec<Article>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// True when the tokenizer reported an error, meaning some of the
    /// document may not be reflected in `articles`.
    pub fn is_partial(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Streaming parse state for a single feed document.
///
/// Receives SAX-style events (start element, text, end element) and builds
/// one [`Article`] per `item`/`entry`. Only the element currently open is
/// tracked, not a full stack: the recognized fields never nest inside each
/// other, so the closing tag of the current element is enough to know where
/// the accumulated text belongs.
///
/// A `FeedParser` is owned by one parse. Independent documents each get
/// their own instance, so their events can be interleaved freely.
#[derive(Debug)]
pub struct FeedParser<'a> {
    options: &'a FeedOptions,
    articles: Vec<Article>,
    /// Lowercased local name of the most recently opened element, cleared on any close.
    current_element: Option<String>,
    current_attrs: HashMap<String, String>,
    in_item: bool,
    text: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> FeedParser<'a> {
    pub fn new(options: &'a FeedOptions) -> Self {
        Self {
            options,
            articles: Vec::new(),
            current_element: None,
            current_attrs: HashMap::new(),
            in_item: false,
            text: String::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Handles an opening tag. `local_name` excludes any namespace prefix.
    ///
    /// Repeated attribute names keep the last value.
    pub fn start_element<I>(&mut self, local_name: &str, attributes: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let name = local_name.to_lowercase();
        self.current_attrs = attributes.into_iter().collect();

        if is_article_boundary(&name) {
            self.in_item = true;
            let article = self.seeded_article();
            self.articles.push(article);
            self.text.clear();
        }

        self.current_element = Some(name);
    }

    pub fn characters(&mut self, text: &str) {
        if self.in_item {
            self.text.push_str(text);
        }
    }

    /// CDATA shares the text buffer with character data, in arrival order.
    pub fn cdata(&mut self, text: &str) {
        self.characters(text);
    }

    /// Handles a closing tag. `prefixed` is true for names such as `media:title`.
    pub fn end_element(&mut self, local_name: &str, prefixed: bool) {
        if !self.in_item {
            return;
        }

        if let Some(name) = self.current_element.take() {
            self.store_field(&name, prefixed);
        }
        self.text.clear();
        self.current_attrs.clear();

        if is_article_boundary(local_name) {
            self.in_item = false;
        }
    }

    pub fn warning(&mut self, message: impl Into<String>, position: u64) {
        let message = message.into();
        tracing::warn!(position = position, detail = %message, "Feed markup warning");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            position,
        });
    }

    pub fn error(&mut self, message: impl Into<String>, position: u64) {
        let message = message.into();
        tracing::warn!(position = position, detail = %message, "Feed markup error, continuing");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            position,
        });
    }

    /// Ends the document and hands back everything collected, even if empty.
    pub fn finish(self) -> ParseResult {
        tracing::debug!(
            articles = self.articles.len(),
            diagnostics = self.diagnostics.len(),
            "Feed parse complete"
        );
        ParseResult {
            articles: self.articles,
            diagnostics: self.diagnostics,
        }
    }

    fn seeded_article(&self) -> Article {
        let mut article = Article::new();
        for (key, value) in self.options.extra_fields() {
            article.set(key, FieldValue::Meta(value.clone()));
        }
        article
    }

    fn store_field(&mut self, name: &str, prefixed: bool) {
        let Some(rule) = field_rule(name) else {
            return;
        };
        let Some(article) = self.articles.last_mut() else {
            return;
        };
        let text = self.text.trim();

        match rule {
            FieldRule::Date => article.set(name, FieldValue::Date(FeedDate::parse(text))),
            FieldRule::Text => article.set(name, FieldValue::Text(text.to_owned())),
            FieldRule::Content => article.set(CONTENT_FIELD, FieldValue::Text(text.to_owned())),
            FieldRule::HrefOrText => {
                if let Some(href) = self.current_attrs.get("href") {
                    article.set(name, FieldValue::Text(href.clone()));
                } else if !prefixed {
                    // Extension namespaces reuse these names (media:title)
                    article.set(name, FieldValue::Text(text.to_owned()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_attrs() -> Vec<(String, String)> {
        Vec::new()
    }

    fn href(value: &str) -> Vec<(String, String)> {
        vec![("href".to_string(), value.to_string())]
    }

    /// Feeds `<name>text</name>` into the parser.
    fn element(parser: &mut FeedParser<'_>, name: &str, text: &str) {
        parser.start_element(name, no_attrs());
        parser.characters(text);
        parser.end_element(name, false);
    }

    #[test]
    fn test_item_produces_article() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("item", no_attrs());
        element(&mut parser, "title", "  Hello  ");
        element(&mut parser, "description", "\n  Body text\n");
        parser.end_element("item", false);

        let result = parser.finish();
        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].title(), Some("Hello"));
        assert_eq!(result.articles[0].text("description"), Some("Body text"));
        assert!(!result.is_partial());
    }

    #[test]
    fn test_text_outside_item_is_ignored() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        element(&mut parser, "title", "Channel title");
        parser.start_element("item", no_attrs());
        parser.end_element("item", false);

        let result = parser.finish();
        assert_eq!(result.articles.len(), 1);
        assert!(result.articles[0].is_empty());
    }

    #[test]
    fn test_encoded_folds_into_content() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("item", no_attrs());
        parser.start_element("encoded", no_attrs());
        parser.cdata("<p>Full</p>");
        parser.characters(" text ");
        parser.end_element("encoded", true);
        parser.end_element("item", false);

        let result = parser.finish();
        assert_eq!(result.articles[0].content(), Some("<p>Full</p> text"));
        assert!(result.articles[0].get("encoded").is_none());
    }

    #[test]
    fn test_href_wins_over_text() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("entry", no_attrs());
        parser.start_element("link", href("https://example.com/a"));
        parser.characters("https://example.com/ignored");
        parser.end_element("link", false);
        parser.end_element("entry", false);

        let result = parser.finish();
        assert_eq!(result.articles[0].link(), Some("https://example.com/a"));
    }

    #[test]
    fn test_prefixed_title_does_not_override() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("item", no_attrs());
        element(&mut parser, "title", "Real title");
        parser.start_element("title", no_attrs());
        parser.characters("Media title");
        parser.end_element("title", true);
        parser.end_element("item", false);

        let result = parser.finish();
        assert_eq!(result.articles[0].title(), Some("Real title"));
    }

    #[test]
    fn test_extra_fields_seeded_and_overridden() {
        let options = FeedOptions::new()
            .with_field("feed", "hn")
            .with_field("title", "placeholder");
        let mut parser = FeedParser::new(&options);

        parser.start_element("item", no_attrs());
        parser.end_element("item", false);
        parser.start_element("item", no_attrs());
        element(&mut parser, "title", "Actual");
        parser.end_element("item", false);

        let result = parser.finish();
        let first = &result.articles[0];
        let second = &result.articles[1];
        assert_eq!(
            first.get("title"),
            Some(&FieldValue::Meta(serde_json::json!("placeholder")))
        );
        assert_eq!(second.title(), Some("Actual"));
        assert_eq!(
            second.get("feed"),
            Some(&FieldValue::Meta(serde_json::json!("hn")))
        );
    }

    #[test]
    fn test_date_fields_stored_under_lowercased_name() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("item", no_attrs());
        element(&mut parser, "pubDate", " Tue, 10 Jun 2003 04:00:00 GMT ");
        element(&mut parser, "published", "not a date");
        parser.end_element("item", false);

        let result = parser.finish();
        let article = &result.articles[0];
        assert!(article.date("pubdate").unwrap().is_valid());
        assert_eq!(
            article.date("published"),
            Some(&FeedDate::Invalid("not a date".to_string()))
        );
    }

    #[test]
    fn test_uppercase_boundary_closes_item() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("ITEM", no_attrs());
        parser.end_element("ITEM", false);
        element(&mut parser, "title", "after item");

        let result = parser.finish();
        assert_eq!(result.articles.len(), 1);
        assert!(result.articles[0].title().is_none());
    }

    #[test]
    fn test_unrecognized_element_clears_buffer() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);

        parser.start_element("item", no_attrs());
        element(&mut parser, "guid", "abc-123");
        element(&mut parser, "title", "Title");
        parser.end_element("item", false);

        let result = parser.finish();
        assert_eq!(result.articles[0].title(), Some("Title"));
        assert!(result.articles[0].get("guid").is_none());
    }

    #[test]
    fn test_interleaved_parsers_stay_isolated() {
        let options_a = FeedOptions::new().with_field("source", "a");
        let options_b = FeedOptions::new().with_field("source", "b");
        let mut a = FeedParser::new(&options_a);
        let mut b = FeedParser::new(&options_b);

        a.start_element("item", no_attrs());
        b.start_element("entry", no_attrs());
        a.start_element("title", no_attrs());
        b.start_element("title", no_attrs());
        a.characters("From A");
        b.characters("From B");
        b.end_element("title", false);
        a.end_element("title", false);
        b.end_element("entry", false);
        b.start_element("entry", no_attrs());
        b.end_element("entry", false);
        a.end_element("item", false);

        let a = a.finish();
        let b = b.finish();
        assert_eq!(a.articles.len(), 1);
        assert_eq!(b.articles.len(), 2);
        assert_eq!(a.articles[0].title(), Some("From A"));
        assert_eq!(b.articles[0].title(), Some("From B"));
        assert_eq!(
            b.articles[1].get("source"),
            Some(&FieldValue::Meta(serde_json::json!("b")))
        );
    }

    #[test]
    fn test_errors_mark_result_partial() {
        let options = FeedOptions::new();
        let mut parser = FeedParser::new(&options);
        parser.warning("odd entity", 3);
        assert!(!FeedParser::new(&options).finish().is_partial());

        parser.error("unexpected eof", 10);
        let result = parser.finish();
        assert!(result.is_partial());
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[1].position, 10);
    }

    #[test]
    fn test_empty_document_yields_empty_list() {
        let options = FeedOptions::new();
        let result = FeedParser::new(&options).finish();
        assert!(result.articles.is_empty());
    }
}
