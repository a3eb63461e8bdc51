//! JSON Feed document model
//!
//! Backends are always queried with `format=json` so their responses share
//! this shape. The same model is used when a client asks for JSON output.

use crate::domain::entities::{Author, Enclosure, Feed, Item, Link};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Seconds from the Unix epoch to 0001-01-01T00:00:00Z, the zero timestamp
/// some backends emit for unset dates.
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonAuthor {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub external_url: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub content_html: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub content_text: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub banner_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<JsonAuthor>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<JsonAuthor>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonFeed {
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub home_page_url: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub feed_url: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub favicon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<JsonAuthor>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<JsonAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<JsonItem>,
}

/// Decode `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Pick the author: first entry of `authors`, else the singular `author`.
fn pick_author(authors: &[JsonAuthor], author: Option<&JsonAuthor>) -> Option<Author> {
    authors
        .first()
        .or(author)
        .map(|a| Author::new(a.name.clone()))
}

fn non_zero(ts: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    ts.filter(|t| t.timestamp() > ZERO_TIMESTAMP_SECS)
}

fn non_empty_link(url: String) -> Option<Link> {
    if url.is_empty() {
        None
    } else {
        Some(Link::new(url))
    }
}

impl JsonItem {
    pub fn into_item(self) -> Item {
        let author = pick_author(&self.authors, self.author.as_ref());
        Item {
            id: self.id,
            title: self.title,
            description: self.summary,
            content: self.content_html,
            link: non_empty_link(self.url),
            source: non_empty_link(self.external_url),
            author,
            created: non_zero(self.date_published),
            updated: non_zero(self.date_modified),
            enclosure: if self.image.is_empty() {
                None
            } else {
                Some(Enclosure::new(self.image))
            },
        }
    }

    pub fn from_item(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            url: item.link.as_ref().map(|l| l.href.clone()).unwrap_or_default(),
            external_url: item
                .source
                .as_ref()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            title: item.title.clone(),
            content_html: item.content.clone(),
            summary: item.description.clone(),
            image: item
                .enclosure
                .as_ref()
                .map(|e| e.url.clone())
                .unwrap_or_default(),
            date_published: item.created,
            date_modified: item.updated,
            authors: item
                .author
                .iter()
                .map(|a| JsonAuthor {
                    name: a.name.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}

impl JsonFeed {
    /// Convert the backend document into the feed model.
    pub fn into_feed(self) -> Feed {
        let author = pick_author(&self.authors, self.author.as_ref());
        Feed {
            title: self.title,
            description: self.description,
            link: non_empty_link(self.home_page_url),
            author,
            items: self.items.into_iter().map(JsonItem::into_item).collect(),
        }
    }

    pub fn from_feed(feed: &Feed) -> Self {
        Self {
            version: JSON_FEED_VERSION.to_string(),
            title: feed.title.clone(),
            home_page_url: feed
                .link
                .as_ref()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            description: feed.description.clone(),
            authors: feed
                .author
                .iter()
                .map(|a| JsonAuthor {
                    name: a.name.clone(),
                    ..Default::default()
                })
                .collect(),
            items: feed.items.iter().map(JsonItem::from_item).collect(),
            ..Default::default()
        }
    }
}
