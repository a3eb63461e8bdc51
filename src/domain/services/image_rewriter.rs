//! Image Rewriter Service
//!
//! Points image references inside feed items at the relay endpoint so that
//! readers load them through this server, which can attach the headers the
//! image host expects.

use crate::domain::entities::Item;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{namespace_url, ns, parse_fragment, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use url::form_urlencoded;

/// Rewrites image URLs to go through the relay path.
#[derive(Debug, Clone)]
pub struct ImageRewriter {
    path: String,
}

impl ImageRewriter {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Build the relay URL for `src`.
    ///
    /// The result is scheme-relative (`//host/path?p=..&s=..`) so it follows
    /// whatever scheme the reader used to reach this server.
    pub fn process_link(&self, src: &str, host: &str, platform: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("p", platform)
            .append_pair("s", src)
            .finish();

        format!("//{}{}?{}", host, self.path, query)
    }

    /// Rewrite the `src` of every `img` element in an HTML fragment.
    ///
    /// Tag soup is repaired the way a browser would before rewriting. The
    /// input is returned unchanged only when the parsed tree cannot be
    /// rendered back.
    pub fn process_html(&self, fragment: &str, host: &str, platform: &str) -> String {
        tracing::debug!("start process html");

        let dom = match parse_fragment(
            RcDom::default(),
            Default::default(),
            QualName::new(None, ns!(html), LocalName::from("body")),
            Vec::new(),
        )
        .from_utf8()
        .read_from(&mut fragment.as_bytes())
        {
            Ok(dom) => dom,
            Err(e) => {
                tracing::error!("failed to parse html: {}", e);
                return fragment.to_string();
            }
        };

        for e in dom.errors.borrow().iter() {
            tracing::trace!("html parse warning: {}", e);
        }

        // parse_fragment puts the fragment under a synthetic <html> root
        let root = match dom.document.children.borrow().first() {
            Some(root) => root.clone(),
            None => return fragment.to_string(),
        };

        self.traverse(&root, host, platform);

        let mut buf: Vec<u8> = Vec::new();
        let serializable: SerializableHandle = root.into();
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        };
        if let Err(e) = serialize(&mut buf, &serializable, opts) {
            tracing::error!("failed to render html: {}", e);
            return fragment.to_string();
        }

        match String::from_utf8(buf) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("rendered html is not utf-8: {}", e);
                fragment.to_string()
            }
        }
    }

    fn traverse(&self, node: &Handle, host: &str, platform: &str) {
        if let NodeData::Element { name, attrs, .. } = &node.data {
            if &*name.local == "img" {
                for attr in attrs.borrow_mut().iter_mut() {
                    if &*attr.name.local == "src" {
                        let proxied = self.process_link(&attr.value, host, platform);
                        tracing::debug!("replace src old={} new={}", &*attr.value, proxied);
                        attr.value.clear();
                        attr.value.push_slice(&proxied);
                    }
                }
            }
        }

        for child in node.children.borrow().iter() {
            self.traverse(child, host, platform);
        }
    }

    /// Rewrite content, description and enclosure of one item in place.
    pub fn rewrite_item(&self, item: &mut Item, host: &str, platform: &str) {
        if !item.content.is_empty() {
            item.content = self.process_html(&item.content, host, platform);
        }
        if !item.description.is_empty() {
            item.description = self.process_html(&item.description, host, platform);
        }
        if let Some(enclosure) = item.enclosure.as_mut() {
            enclosure.url = self.process_link(&enclosure.url, host, platform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Enclosure;

    fn rewriter() -> ImageRewriter {
        ImageRewriter::new("/image")
    }

    // ===== Link Tests =====

    #[test]
    fn test_process_link() {
        let link = rewriter().process_link("http://a/b.png", "host.example", "platformX");
        assert_eq!(
            link,
            "//host.example/image?p=platformX&s=http%3A%2F%2Fa%2Fb.png"
        );
    }

    #[test]
    fn test_process_link_encodes_query_characters() {
        let link = rewriter().process_link("https://a/b.png?w=1&h=2", "h", "x y");
        assert_eq!(link, "//h/image?p=x+y&s=https%3A%2F%2Fa%2Fb.png%3Fw%3D1%26h%3D2");
    }

    // ===== HTML Tests =====

    #[test]
    fn test_process_html_rewrites_img_src() {
        let out = rewriter().process_html(
            r#"<p><img src="http://a/b.png"></p>"#,
            "host.example",
            "platformX",
        );
        assert_eq!(
            out,
            r#"<p><img src="//host.example/image?p=platformX&amp;s=http%3A%2F%2Fa%2Fb.png"></p>"#
        );
    }

    #[test]
    fn test_process_html_leaves_other_attributes() {
        let out = rewriter().process_html(
            r#"<a href="http://a/page"><img alt="pic" src="http://a/b.png"></a>"#,
            "h",
            "x",
        );
        assert!(out.starts_with(r#"<a href="http://a/page"><img alt="pic" src="//h/image?"#));
        assert!(out.ends_with("</a>"));
    }

    #[test]
    fn test_process_html_nested_images() {
        let out = rewriter().process_html(
            r#"<div><p><img src="http://a/1.png"></p><span><img src="http://a/2.png"></span></div>"#,
            "h",
            "x",
        );
        assert_eq!(out.matches("//h/image?").count(), 2);
        assert!(!out.contains(r#"src="http://"#));
    }

    #[test]
    fn test_process_html_without_images() {
        let out = rewriter().process_html("<p>hello <b>world</b></p>", "h", "x");
        assert_eq!(out, "<p>hello <b>world</b></p>");
    }

    #[test]
    fn test_process_html_plain_text() {
        assert_eq!(rewriter().process_html("just text", "h", "x"), "just text");
    }

    #[test]
    fn test_process_html_tag_soup_is_rewritten() {
        let inputs = [
            r#"<p>a &nbsp b<img src="http://a/b.png"></p>"#,
            r#"<div/><img src="http://a/b.png">"#,
            r#"<img src="http://a/b.png" alt="x" alt="y">"#,
            r#"</br><img src="http://a/b.png">"#,
            r#"<p><img src="http://a/b.png">unclosed"#,
            r#"</b>stray end tag<img src="http://a/b.png">"#,
        ];

        for input in inputs {
            let out = rewriter().process_html(input, "h", "x");
            assert!(
                out.contains(r#"src="//h/image?p=x&amp;s=http%3A%2F%2Fa%2Fb.png""#),
                "{} -> {}",
                input,
                out
            );
            assert!(!out.contains(r#"src="http://a/b.png""#), "{} -> {}", input, out);
        }
    }

    #[test]
    fn test_process_html_duplicate_attribute_keeps_first() {
        let out = rewriter().process_html(r#"<img src="http://a/b.png" alt="x" alt="y">"#, "h", "x");
        assert!(out.contains(r#"alt="x""#));
        assert!(!out.contains(r#"alt="y""#));
    }

    #[test]
    fn test_process_html_empty_fragment() {
        assert_eq!(rewriter().process_html("", "h", "x"), "");
    }

    // ===== Item Tests =====

    #[test]
    fn test_rewrite_item() {
        let mut item = Item {
            id: "1".to_string(),
            title: r#"<img src="http://a/t.png">"#.to_string(),
            description: r#"<img src="http://a/d.png">"#.to_string(),
            content: r#"<img src="http://a/c.png">"#.to_string(),
            enclosure: Some(Enclosure::new("http://a/e.png")),
            ..Default::default()
        };

        rewriter().rewrite_item(&mut item, "h", "x");

        assert!(item.content.contains("//h/image?p=x&amp;s=http%3A%2F%2Fa%2Fc.png"));
        assert!(item.description.contains("//h/image?p=x&amp;s=http%3A%2F%2Fa%2Fd.png"));
        assert_eq!(
            item.enclosure,
            Some(Enclosure::new("//h/image?p=x&s=http%3A%2F%2Fa%2Fe.png"))
        );
        // title is plain text and never rewritten
        assert_eq!(item.title, r#"<img src="http://a/t.png">"#);
    }

    #[test]
    fn test_rewrite_item_empty_fields_untouched() {
        let mut item = Item {
            id: "1".to_string(),
            ..Default::default()
        };
        rewriter().rewrite_item(&mut item, "h", "x");
        assert!(item.content.is_empty());
        assert!(item.description.is_empty());
        assert!(item.enclosure.is_none());
    }
}
