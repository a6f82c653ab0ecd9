//! External stylesheet proxying.
//!
//! Rasterizers can only fetch stylesheets same-origin. Every cross-origin
//! `<link>` is replaced by a clone whose `href` routes through the proxy
//! endpoint; the clone goes to the end of `<head>`.

use super::{ResourceKind, Rewrite};
use crate::dom::{DomMutation, ElementSpec, NodeId};
use crate::{CaptureConfig, Result};

/// Whether `href` must be tunnelled through the proxy
pub fn needs_proxy(href: &str, config: &CaptureConfig) -> bool {
    let href = href.trim();
    if href.is_empty() {
        return false;
    }
    if !config.home_url.is_empty() && href.starts_with(config.home_url.as_str()) {
        return false;
    }
    if config
        .exclude_css_urls
        .iter()
        .any(|prefix| !prefix.is_empty() && href.starts_with(prefix.as_str()))
    {
        return false;
    }
    if href.starts_with("//") {
        return true;
    }
    // Relative references are already same-origin
    match url::Url::parse(href) {
        Ok(u) => matches!(u.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

fn is_stylesheet_link(rel: Option<&str>) -> bool {
    match rel {
        None => true,
        Some(rel) => rel
            .split_whitespace()
            .any(|r| r.eq_ignore_ascii_case("stylesheet")),
    }
}

pub(crate) fn proxy_stylesheets(rw: &mut Rewrite, config: &CaptureConfig) -> Result<()> {
    let target = rw.document.head().unwrap_or_else(|| rw.document.root());
    let links: Vec<NodeId> = rw.document.descendants_by_tag(rw.document.root(), "link");

    for link in links {
        let Some(el) = rw.document.element(link) else {
            continue;
        };
        if !is_stylesheet_link(el.attr("rel")) {
            continue;
        }
        let Some(href) = el.attr("href").map(str::to_string) else {
            continue;
        };
        if !needs_proxy(&href, config) {
            continue;
        }
        let Some(clone) = ElementSpec::from_element(&rw.document, link) else {
            continue;
        };

        let proxied = config.proxy_url(&href);
        log::debug!("proxying stylesheet {}", href);
        rw.request(proxied.clone(), ResourceKind::Stylesheet, false);
        rw.emit(DomMutation::AppendChild {
            parent: target,
            element: clone.attr("href", &proxied),
        })?;
        rw.emit(DomMutation::Remove { node: link })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::normalize::normalize;

    fn cfg() -> CaptureConfig {
        CaptureConfig {
            selector: "#root".into(),
            home_url: "https://site.test".into(),
            nonce: "n1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn needs_proxy_rules() {
        let c = cfg();
        assert!(needs_proxy("https://fonts.test/css?family=A", &c));
        assert!(needs_proxy("//cdn.test/a.css", &c));
        assert!(!needs_proxy("https://site.test/wp-content/a.css", &c));
        assert!(!needs_proxy("https://kit-pro.fontawesome.com/releases/kit.css", &c));
        assert!(!needs_proxy("/wp-content/a.css", &c));
        assert!(!needs_proxy("data:text/css,body{}", &c));
        assert!(!needs_proxy("", &c));
    }

    #[test]
    fn cross_origin_links_are_cloned_through_proxy() {
        let doc = Document::parse_html(
            r#"<html><head>
                <link rel="stylesheet" id="ext" href="https://fonts.test/a.css" media="all">
                <link rel="stylesheet" href="https://site.test/local.css">
                <link rel="icon" href="https://cdn.test/favicon.ico">
                <title>t</title>
            </head><body><div id="root"></div>
                <link rel="stylesheet" href="https://cdn.test/late.css">
            </body></html>"#,
        );
        let n = normalize(&doc, &cfg()).unwrap();
        let out = &n.document;
        let head = out.head().unwrap();
        let hrefs: Vec<String> = out
            .descendants_by_tag(out.root(), "link")
            .into_iter()
            .filter_map(|l| out.element(l).and_then(|e| e.attr("href")).map(String::from))
            .collect();
        assert_eq!(
            hrefs,
            vec![
                "https://site.test/local.css",
                "https://cdn.test/favicon.ico",
                "https://site.test?screenshot_proxy&nonce=n1&href=https://fonts.test/a.css",
                "https://site.test?screenshot_proxy&nonce=n1&href=https://cdn.test/late.css",
            ]
        );

        let last = *out.element_children(head).last().unwrap();
        let moved = out.element_children(head)[out.element_children(head).len() - 2];
        assert_eq!(out.element(moved).unwrap().attr("id"), Some("ext"));
        assert_eq!(out.element(moved).unwrap().attr("media"), Some("all"));
        assert!(out.element(last).unwrap().attr("href").unwrap().ends_with("late.css"));
        assert_eq!(n.resources.len(), 2);
    }

    #[test]
    fn second_pass_leaves_proxied_links_alone() {
        let doc = Document::parse_html(
            r#"<html><head><link rel="stylesheet" href="https://fonts.test/a.css"></head><body><div id="root"></div></body></html>"#,
        );
        let first = normalize(&doc, &cfg()).unwrap();
        let second = normalize(&first.document, &cfg()).unwrap();
        assert!(second.resources.is_empty());
    }

    #[test]
    fn headless_document_gets_links_on_the_root_element() {
        let mut doc = Document::parse_html(
            r#"<html><head><title>t</title></head><body><div id="root"></div><link rel="stylesheet" href="https://fonts.test/b.css"></body></html>"#,
        );
        let head = doc.head().unwrap();
        doc.apply(&DomMutation::Remove { node: head }).unwrap();
        assert_eq!(doc.head(), None);

        let body_root = CaptureConfig {
            selector: "body".into(),
            ..cfg()
        };
        let n = normalize(&doc, &body_root).unwrap();
        let out = &n.document;
        let root_kids = out.element_children(out.root());
        assert_eq!(root_kids.len(), 2);
        assert_eq!(root_kids[0], out.body().unwrap());
        let link = out.element(root_kids[1]).unwrap();
        assert_eq!(link.tag(), "link");
        assert_eq!(
            link.attr("href"),
            Some("https://site.test?screenshot_proxy&nonce=n1&href=https://fonts.test/b.css")
        );
        assert!(out.descendants_by_tag(out.body().unwrap(), "link").is_empty());
        assert!(n.mutations.contains(&DomMutation::AppendChild {
            parent: out.root(),
            element: ElementSpec::new("link")
                .attr("rel", "stylesheet")
                .attr("href", "https://site.test?screenshot_proxy&nonce=n1&href=https://fonts.test/b.css"),
        }));
    }
}
