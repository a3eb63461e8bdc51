//! Domain Entities - Core business objects
//!
//! These entities represent the feed model the relay works on and the
//! backend instances it fetches from. They carry no I/O and are independent
//! of any wire format (RSS, Atom or JSON Feed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backend feed-generating endpoint.
///
/// Instances are built once from configuration and never mutated. They are
/// referenced everywhere by their index in the load balancer's instance list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Base URL, without trailing slash (e.g. `https://rsshub.example.com`)
    pub url: String,
    /// Platform tags this instance is preferred for
    pub platforms: Vec<String>,
    /// Whether this instance belongs to the fallback group
    pub fallback: bool,
}

impl Instance {
    pub fn new(url: impl Into<String>, platforms: Vec<String>, fallback: bool) -> Self {
        let url = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            platforms,
            fallback,
        }
    }
}

/// A hyperlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// Author of a feed or an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Media attached to an item (only the URL is tracked).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
}

impl Enclosure {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A syndication feed.
///
/// Item order is the upstream order and is preserved through enrichment and
/// serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: Option<Link>,
    pub author: Option<Author>,
    pub items: Vec<Item>,
}

impl Feed {
    /// Most recent updated/created timestamp among the items.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.items
            .iter()
            .filter_map(|item| item.updated.or(item.created))
            .max()
    }
}

/// A single feed entry.
///
/// Created fresh per request, mutated in place by translation and image
/// rewriting, then discarded after serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Stable upstream identifier, never rewritten
    pub id: String,
    pub title: String,
    /// Short summary (may contain HTML)
    pub description: String,
    /// Full HTML content
    pub content: String,
    pub link: Option<Link>,
    pub source: Option<Link>,
    pub author: Option<Author>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub enclosure: Option<Enclosure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_instance_new_trims_trailing_slash() {
        let instance = Instance::new("https://rsshub.example.com/", vec![], true);
        assert_eq!(instance.url, "https://rsshub.example.com");
        assert!(instance.fallback);
    }

    #[test]
    fn test_instance_keeps_platforms() {
        let instance = Instance::new(
            "https://a.example.com",
            vec!["twitter".to_string(), "bilibili".to_string()],
            false,
        );
        assert_eq!(instance.platforms.len(), 2);
        assert!(!instance.fallback);
    }

    #[test]
    fn test_feed_latest_timestamp_prefers_updated() {
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let feed = Feed {
            items: vec![
                Item {
                    id: "1".to_string(),
                    created: Some(older),
                    ..Default::default()
                },
                Item {
                    id: "2".to_string(),
                    created: Some(older),
                    updated: Some(newer),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(feed.latest_timestamp(), Some(newer));
    }

    #[test]
    fn test_feed_latest_timestamp_empty() {
        let feed = Feed::default();
        assert_eq!(feed.latest_timestamp(), None);
    }

    #[test]
    fn test_item_default_is_empty() {
        let item = Item::default();
        assert!(item.title.is_empty());
        assert!(item.enclosure.is_none());
    }
}
