//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use std::fmt;

/// Syndication format a feed is served in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// RSS 2.0 (default)
    Rss,
    /// Atom 1.0
    Atom,
    /// JSON Feed 1.1
    Json,
}

impl OutputFormat {
    /// Parse the `format` query parameter.
    ///
    /// Absent or unrecognized values fall back to RSS 2.0.
    ///
    /// # Examples
    /// ```
    /// use feed_relay::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::from_query(Some("atom")), OutputFormat::Atom);
    /// assert_eq!(OutputFormat::from_query(Some("xml")), OutputFormat::Rss);
    /// assert_eq!(OutputFormat::from_query(None), OutputFormat::Rss);
    /// ```
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("atom") => Self::Atom,
            Some("json") => Self::Json,
            _ => Self::Rss,
        }
    }

    /// Query value understood by the backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::Atom => "atom",
            Self::Json => "json",
        }
    }

    /// HTTP Content-Type of a response in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Rss => "application/rss+xml",
            Self::Atom => "application/atom+xml",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item field subject to translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslatedField {
    Title,
    Description,
    Content,
}

impl TranslatedField {
    pub const ALL: [TranslatedField; 3] = [Self::Title, Self::Description, Self::Content];

    /// Name used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Content => "content",
        }
    }

    /// Whether the provider must preserve markup for this field.
    pub fn is_html(&self) -> bool {
        !matches!(self, Self::Title)
    }
}

impl fmt::Display for TranslatedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a cached translation.
///
/// Layout: `{prefix}translate:{platform}:{item_id}:{field}:{lang}`. Existing
/// cache contents depend on this exact format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        prefix: &str,
        platform: &str,
        item_id: &str,
        field: TranslatedField,
        target_lang: &str,
    ) -> Self {
        Self(format!(
            "{}translate:{}:{}:{}:{}",
            prefix,
            platform,
            item_id,
            field.as_str(),
            target_lang
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the target language from the request host.
///
/// The host is split on the first occurrence of `host_base` and the part in
/// front of it is the language tag, with the separating dot removed. Returns
/// `None` when `host_base` is empty, absent from the host, or leaves no tag.
///
/// # Examples
/// ```
/// use feed_relay::target_language;
///
/// assert_eq!(target_language("fr.example.com", "example.com"), Some("fr".to_string()));
/// assert_eq!(target_language("www.other.com", "example.com"), None);
/// ```
pub fn target_language(host: &str, host_base: &str) -> Option<String> {
    if host_base.is_empty() {
        return None;
    }
    let (prefix, _) = host.split_once(host_base)?;
    let lang = prefix.trim_end_matches('.');
    if lang.is_empty() {
        return None;
    }
    Some(lang.to_string())
}
