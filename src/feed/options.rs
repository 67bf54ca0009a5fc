use serde_json::Value;
use std::collections::BTreeMap;

/// Constant metadata attached to every article produced by one parse.
///
/// Typical use is tagging articles with the feed they came from:
///
/// ```
/// use feedstream::feed::FeedOptions;
///
/// let options = FeedOptions::new()
///     .with_field("feed_id", 42)
///     .with_field("source", "hn");
/// assert_eq!(options.len(), 2);
/// ```
///
/// Fields are seeded when an article opens, so values read from the feed
/// itself (for example `title`) replace a seeded value with the same key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedOptions {
    extra_fields: BTreeMap<String, Value>,
}

impl FeedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_fields.insert(key.into(), value.into());
        self
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            extra_fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn extra_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extra_fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.extra_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extra_fields.is_empty()
    }
}
