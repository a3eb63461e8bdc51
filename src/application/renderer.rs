//! Feed Renderer
//!
//! Serializes an enriched feed into the output format the client asked for.

use crate::domain::entities::{Feed, Item};
use crate::domain::json_feed::JsonFeed;
use crate::domain::value_objects::OutputFormat;
use chrono::{DateTime, Utc};
use thiserror::Error;

const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// Failure to serialize a feed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write rss: {0}")]
    Rss(#[from] rss::Error),

    #[error("failed to write atom: {0}")]
    Atom(#[from] atom_syndication::Error),

    #[error("failed to write json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rendered document is not utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Serialized feed document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeed {
    pub content_type: &'static str,
    pub body: String,
}

/// Render `feed` as `format`.
pub fn render(feed: &Feed, format: OutputFormat) -> Result<RenderedFeed, RenderError> {
    let body = match format {
        OutputFormat::Rss => render_rss(feed)?,
        OutputFormat::Atom => render_atom(feed)?,
        OutputFormat::Json => render_json(feed)?,
    };

    Ok(RenderedFeed {
        content_type: format.content_type(),
        body,
    })
}

fn href(link: &Option<crate::domain::entities::Link>) -> String {
    link.as_ref().map(|l| l.href.clone()).unwrap_or_default()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ===== RSS 2.0 =====

fn render_rss(feed: &Feed) -> Result<String, RenderError> {
    let mut channel = rss::Channel::default();
    channel.set_title(feed.title.clone());
    channel.set_link(href(&feed.link));
    channel.set_description(feed.description.clone());
    channel.set_managing_editor(feed.author.as_ref().map(|a| a.name.clone()));
    channel.set_pub_date(feed.latest_timestamp().map(|t| t.to_rfc2822()));

    if feed.items.iter().any(|i| !i.content.is_empty()) {
        let mut namespaces = channel.namespaces().clone();
        namespaces.insert("content".to_string(), CONTENT_NAMESPACE.to_string());
        channel.set_namespaces(namespaces);
    }

    channel.set_items(feed.items.iter().map(rss_item).collect::<Vec<_>>());

    let buf = channel.write_to(Vec::new())?;
    Ok(String::from_utf8(buf)?)
}

fn rss_item(item: &Item) -> rss::Item {
    let mut out = rss::Item::default();
    out.set_title(non_empty(&item.title));
    out.set_link(item.link.as_ref().map(|l| l.href.clone()));
    out.set_description(non_empty(&item.description));
    out.set_content(non_empty(&item.content));
    out.set_author(item.author.as_ref().map(|a| a.name.clone()));
    out.set_pub_date(item.created.map(|t| t.to_rfc2822()));

    if !item.id.is_empty() {
        let mut guid = rss::Guid::default();
        guid.set_value(item.id.clone());
        guid.set_permalink(false);
        out.set_guid(Some(guid));
    }

    if let Some(source) = &item.source {
        let mut src = rss::Source::default();
        src.set_url(source.href.clone());
        out.set_source(Some(src));
    }

    if let Some(enclosure) = &item.enclosure {
        let mut enc = rss::Enclosure::default();
        enc.set_url(enclosure.url.clone());
        enc.set_length("0");
        out.set_enclosure(Some(enc));
    }

    out
}

// ===== Atom 1.0 =====

fn render_atom(feed: &Feed) -> Result<String, RenderError> {
    let latest = feed.latest_timestamp().unwrap_or_else(Utc::now);

    let mut out = atom_syndication::Feed::default();
    out.set_title(feed.title.clone());
    out.set_id(href(&feed.link));
    out.set_updated(latest);
    out.set_subtitle(non_empty(&feed.description).map(atom_syndication::Text::plain));

    if let Some(link) = &feed.link {
        out.set_links(vec![atom_link(&link.href, "alternate")]);
    }
    if let Some(author) = &feed.author {
        out.set_authors(vec![atom_person(&author.name)]);
    }

    out.set_entries(
        feed.items
            .iter()
            .map(|item| atom_entry(item, latest))
            .collect::<Vec<_>>(),
    );

    let buf = out.write_to(Vec::new())?;
    Ok(String::from_utf8(buf)?)
}

fn atom_link(href: &str, rel: &str) -> atom_syndication::Link {
    let mut link = atom_syndication::Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

fn atom_person(name: &str) -> atom_syndication::Person {
    let mut person = atom_syndication::Person::default();
    person.set_name(name);
    person
}

fn atom_entry(item: &Item, feed_latest: DateTime<Utc>) -> atom_syndication::Entry {
    let mut entry = atom_syndication::Entry::default();
    entry.set_id(item.id.clone());
    entry.set_title(item.title.clone());
    entry.set_updated(item.updated.or(item.created).unwrap_or(feed_latest));
    entry.set_published(item.created.map(atom_syndication::FixedDateTime::from));
    entry.set_summary(non_empty(&item.description).map(atom_syndication::Text::html));

    if !item.content.is_empty() {
        let mut content = atom_syndication::Content::default();
        content.set_value(Some(item.content.clone()));
        content.set_content_type(Some("html".to_string()));
        entry.set_content(Some(content));
    }

    let mut links = Vec::new();
    if let Some(link) = &item.link {
        links.push(atom_link(&link.href, "alternate"));
    }
    if let Some(enclosure) = &item.enclosure {
        links.push(atom_link(&enclosure.url, "enclosure"));
    }
    entry.set_links(links);

    if let Some(author) = &item.author {
        entry.set_authors(vec![atom_person(&author.name)]);
    }

    entry
}

// ===== JSON Feed 1.1 =====

fn render_json(feed: &Feed) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(&JsonFeed::from_feed(feed))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Author, Enclosure, Link};
    use chrono::TimeZone;

    fn sample_feed() -> Feed {
        Feed {
            title: "Timeline".to_string(),
            description: "Posts".to_string(),
            link: Some(Link::new("https://example.com/user")),
            author: Some(Author::new("someone")),
            items: vec![
                Item {
                    id: "first".to_string(),
                    title: "One".to_string(),
                    description: "<p>summary one</p>".to_string(),
                    content: "<p>content one</p>".to_string(),
                    link: Some(Link::new("https://example.com/p/1")),
                    created: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
                    enclosure: Some(Enclosure::new("https://img.example.com/1.png")),
                    ..Default::default()
                },
                Item {
                    id: "second".to_string(),
                    title: "Two".to_string(),
                    updated: Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()),
                    ..Default::default()
                },
            ],
        }
    }

    // ===== Format Selection Tests =====

    #[test]
    fn test_render_content_types() {
        let feed = sample_feed();
        assert_eq!(
            render(&feed, OutputFormat::Rss).unwrap().content_type,
            "application/rss+xml"
        );
        assert_eq!(
            render(&feed, OutputFormat::Atom).unwrap().content_type,
            "application/atom+xml"
        );
        assert_eq!(
            render(&feed, OutputFormat::Json).unwrap().content_type,
            "application/json"
        );
    }

    // ===== RSS Tests =====

    #[test]
    fn test_render_rss() {
        let out = render(&sample_feed(), OutputFormat::Rss).unwrap().body;
        let channel = rss::Channel::read_from(out.as_bytes()).unwrap();

        assert_eq!(channel.title(), "Timeline");
        assert_eq!(channel.link(), "https://example.com/user");
        assert_eq!(channel.items().len(), 2);

        let first = &channel.items()[0];
        assert_eq!(first.title(), Some("One"));
        assert_eq!(first.content(), Some("<p>content one</p>"));
        assert_eq!(first.guid().map(|g| g.value()), Some("first"));
        assert_eq!(first.guid().map(|g| g.is_permalink()), Some(false));
        assert_eq!(
            first.enclosure().map(|e| e.url()),
            Some("https://img.example.com/1.png")
        );
        let published = DateTime::parse_from_rfc2822(first.pub_date().unwrap()).unwrap();
        assert_eq!(
            published.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_render_rss_preserves_item_order() {
        let out = render(&sample_feed(), OutputFormat::Rss).unwrap().body;
        let channel = rss::Channel::read_from(out.as_bytes()).unwrap();
        let titles: Vec<_> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn test_render_rss_empty_feed() {
        let out = render(&Feed::default(), OutputFormat::Rss).unwrap().body;
        let channel = rss::Channel::read_from(out.as_bytes()).unwrap();
        assert!(channel.items().is_empty());
    }

    // ===== Atom Tests =====

    #[test]
    fn test_render_atom() {
        let out = render(&sample_feed(), OutputFormat::Atom).unwrap().body;
        let feed = atom_syndication::Feed::read_from(out.as_bytes()).unwrap();

        assert_eq!(feed.title().value, "Timeline");
        assert_eq!(feed.id(), "https://example.com/user");
        assert_eq!(feed.entries().len(), 2);

        let first = &feed.entries()[0];
        assert_eq!(first.id(), "first");
        assert_eq!(
            first.content().and_then(|c| c.value()),
            Some("<p>content one</p>")
        );
        assert_eq!(first.content().and_then(|c| c.content_type()), Some("html"));
        // falls back to created when there is no update time
        assert_eq!(
            first.updated().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_render_atom_feed_updated_is_latest_item() {
        let out = render(&sample_feed(), OutputFormat::Atom).unwrap().body;
        let feed = atom_syndication::Feed::read_from(out.as_bytes()).unwrap();
        assert_eq!(
            feed.updated().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()
        );
    }

    // ===== JSON Tests =====

    #[test]
    fn test_render_json() {
        let out = render(&sample_feed(), OutputFormat::Json).unwrap().body;
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["version"], "https://jsonfeed.org/version/1.1");
        assert_eq!(value["title"], "Timeline");
        assert_eq!(value["items"][0]["id"], "first");
        assert_eq!(value["items"][0]["content_html"], "<p>content one</p>");
        assert_eq!(value["items"][1]["id"], "second");
    }
}
