//! Iframe replacement.
//!
//! Rasterizers cannot paint iframe contents, so every iframe under the root is
//! swapped for a same-sized block. In priority order the block shows the
//! background image of a following embed overlay, a proxied thumbnail for a
//! recognized video host, or nothing (a plain gray block).

use super::{ResourceKind, Rewrite};
use crate::config::CompiledProvider;
use crate::dom::style::parse_px;
use crate::dom::{Document, DomMutation, ElementSpec, NodeId, Size, Style};
use crate::{CaptureConfig, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Class of the sibling element that overlays a custom embed image on an iframe
pub const OVERLAY_CLASS: &str = "elementor-custom-embed-image-overlay";

const PLACEHOLDER_BACKGROUND: &str = "gray";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementKind {
    /// Image taken from the overlay sibling's background; `None` when the
    /// background held no `url(...)`
    OverlayImage { url: Option<String> },
    /// Proxied thumbnail of a recognized video embed
    VideoThumbnail {
        provider: String,
        video_id: String,
        url: String,
    },
    /// Plain colored block
    Block,
}

/// What an iframe was replaced with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IframeReplacement {
    pub iframe: NodeId,
    pub size: Size,
    pub kind: ReplacementKind,
    pub placeholder: ElementSpec,
}

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]+))\s*\)"#).expect("static regex")
    })
}

/// First `url(...)` target in a CSS value
pub fn extract_css_url(value: &str) -> Option<String> {
    let caps = css_url_regex().captures(value)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string())
        .filter(|u| !u.is_empty())
}

/// Rendered size of an element: host layout, then `width`/`height`
/// attributes, then inline style, else 0.
pub fn measure(doc: &Document, id: NodeId) -> Size {
    let Some(el) = doc.element(id) else {
        return Size { width: 0, height: 0 };
    };
    if let Some(size) = el.layout() {
        return size;
    }
    let style = el.style();
    let dim = |name: &str| {
        el.attr(name)
            .and_then(parse_px)
            .or_else(|| style.get(name).and_then(parse_px))
            .unwrap_or(0)
    };
    Size {
        width: dim("width"),
        height: dim("height"),
    }
}

fn sized_style(size: Size) -> Style {
    let mut style = Style::new();
    style.set("width", &format!("{}px", size.width));
    style.set("height", &format!("{}px", size.height));
    style
}

fn image_spec(src: &str, size: Size) -> ElementSpec {
    ElementSpec::new("img")
        .attr("src", src)
        .attr("style", &sized_style(size).to_string())
}

/// Replace every attached iframe under `root`
pub(crate) fn replace_iframes(
    rw: &mut Rewrite,
    root: NodeId,
    config: &CaptureConfig,
    providers: &[CompiledProvider],
) -> Result<Vec<IframeReplacement>> {
    let frames = rw.document.descendants_by_tag(root, "iframe");
    let mut out = Vec::with_capacity(frames.len());

    for frame in frames {
        if !rw.document.is_attached(frame) {
            continue;
        }
        let size = measure(&rw.document, frame);
        let mut block_style = Style::new();
        block_style.set("background", PLACEHOLDER_BACKGROUND);
        for (p, v) in sized_style(size).iter() {
            block_style.set(p, v);
        }

        let overlay = rw
            .document
            .next_element_sibling(frame)
            .filter(|s| rw.document.element(*s).map(|e| e.has_class(OVERLAY_CLASS)).unwrap_or(false));

        let (kind, placeholder) = if let Some(overlay) = overlay {
            overlay_placeholder(rw, overlay, size, block_style)
        } else if let Some((provider, video_id)) = detect_video(&rw.document, frame, providers) {
            let url = config.proxy_url(&provider.thumbnail_url(&video_id));
            rw.request(url.clone(), ResourceKind::Image, true);
            let placeholder = ElementSpec::new("div")
                .attr("style", &block_style.to_string())
                .child(image_spec(&url, size).attr("crossorigin", "anonymous"));
            (
                ReplacementKind::VideoThumbnail {
                    provider: provider.name.clone(),
                    video_id,
                    url,
                },
                placeholder,
            )
        } else {
            let placeholder = ElementSpec::new("div").attr("style", &block_style.to_string());
            (ReplacementKind::Block, placeholder)
        };

        rw.emit(DomMutation::InsertBefore {
            reference: frame,
            element: placeholder.clone(),
        })?;
        rw.emit(DomMutation::Remove { node: frame })?;
        if let (ReplacementKind::OverlayImage { .. }, Some(overlay)) = (&kind, overlay) {
            rw.emit(DomMutation::Remove { node: overlay })?;
        }

        log::debug!("replaced iframe {:?} ({}x{}): {:?}", frame, size.width, size.height, kind);
        out.push(IframeReplacement {
            iframe: frame,
            size,
            kind,
            placeholder,
        });
    }
    Ok(out)
}

fn overlay_placeholder(
    rw: &mut Rewrite,
    overlay: NodeId,
    size: Size,
    mut block_style: Style,
) -> (ReplacementKind, ElementSpec) {
    let overlay_style = rw
        .document
        .element(overlay)
        .map(|e| e.effective_style())
        .unwrap_or_default();

    let background: Vec<(String, String)> = overlay_style
        .iter()
        .filter(|(p, _)| p.starts_with("background"))
        .map(|(p, v)| (p.to_string(), v.to_string()))
        .collect();
    if !background.is_empty() {
        block_style.remove("background");
        for (p, v) in &background {
            block_style.set(p, v);
        }
    }

    let url = overlay_style
        .get("background-image")
        .and_then(extract_css_url)
        .or_else(|| overlay_style.get("background").and_then(extract_css_url));

    let mut placeholder = ElementSpec::new("div").attr("style", &block_style.to_string());
    if let Some(url) = &url {
        rw.request(url.clone(), ResourceKind::Image, false);
        placeholder = placeholder.child(image_spec(url, size));
    }
    (ReplacementKind::OverlayImage { url }, placeholder)
}

fn detect_video<'p>(
    doc: &Document,
    frame: NodeId,
    providers: &'p [CompiledProvider],
) -> Option<(&'p CompiledProvider, String)> {
    let src = doc.element(frame)?.attr("src")?;
    providers
        .iter()
        .find_map(|p| p.video_id(src).map(|id| (p, id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn config() -> CaptureConfig {
        CaptureConfig {
            selector: ".page".into(),
            home_url: "https://site.test".into(),
            nonce: "abc".into(),
            ..Default::default()
        }
    }

    fn only_placeholder(doc: &Document) -> NodeId {
        let root = crate::normalize::find_root(doc, ".page").unwrap();
        doc.element_children(root)[0]
    }

    #[test]
    fn overlay_background_becomes_image() {
        let doc = Document::parse_html(
            r#"<body><div class="page"><iframe src="https://player.test/x" width="560" height="315"></iframe><div class="elementor-custom-embed-image-overlay" style="background-image: url(&quot;https://cdn.test/poster.jpg&quot;); background-color: #000"></div></div></body>"#,
        );
        let n = normalize(&doc, &config()).unwrap();
        let out = &n.document;
        let root = crate::normalize::find_root(out, ".page").unwrap();
        assert_eq!(out.element_children(root).len(), 1, "overlay sibling removed");

        let block = only_placeholder(out);
        let style = out.element(block).unwrap().style();
        assert_eq!(style.get("background-color"), Some("#000"));
        assert_eq!(style.get("background"), None);
        assert_eq!(style.get("width"), Some("560px"));

        let img = out.element_children(block)[0];
        assert_eq!(out.element(img).unwrap().attr("src"), Some("https://cdn.test/poster.jpg"));
        assert_eq!(
            n.replacements[0].kind,
            ReplacementKind::OverlayImage { url: Some("https://cdn.test/poster.jpg".into()) }
        );
    }

    #[test]
    fn overlay_without_url_keeps_its_background() {
        let doc = Document::parse_html(
            r#"<body><div class="page"><iframe width="400" height="300"></iframe><div class="elementor-custom-embed-image-overlay" style="background: #123456"></div></div></body>"#,
        );
        let n = normalize(&doc, &config()).unwrap();
        let out = &n.document;
        let root = crate::normalize::find_root(out, ".page").unwrap();
        assert_eq!(out.element_children(root).len(), 1, "overlay sibling removed");

        let block = only_placeholder(out);
        let el = out.element(block).unwrap();
        assert_eq!(el.style().get("background"), Some("#123456"));
        assert_eq!(el.style().get("height"), Some("300px"));
        assert!(out.element_children(block).is_empty());
        assert!(out.descendants_by_tag(root, "img").is_empty());
        assert_eq!(n.replacements[0].kind, ReplacementKind::OverlayImage { url: None });
        assert!(n.resources.is_empty());
    }

    #[test]
    fn overlay_prefers_computed_style() {
        let mut doc = Document::parse_html(
            r#"<body><div class="page"><iframe></iframe><div class="elementor-custom-embed-image-overlay"></div></div></body>"#,
        );
        let overlay = doc.descendants(doc.root()).into_iter()
            .find(|n| doc.element(*n).map(|e| e.has_class(OVERLAY_CLASS)).unwrap_or(false))
            .unwrap();
        doc.set_computed_style(overlay, Style::parse(r#"background-image: url("https://cdn.test/c.png")"#));
        let n = normalize(&doc, &config()).unwrap();
        assert_eq!(
            n.replacements[0].kind,
            ReplacementKind::OverlayImage { url: Some("https://cdn.test/c.png".into()) }
        );
    }

    #[test]
    fn youtube_iframe_gets_proxied_thumbnail() {
        let mut doc = Document::parse_html(
            r#"<body><div class="page"><iframe src="https://www.youtube.com/embed/ID_1?rel=0"></iframe></div></body>"#,
        );
        let frame = doc.descendants_by_tag(doc.root(), "iframe")[0];
        doc.set_layout(frame, Size { width: 800, height: 450 });

        let n = normalize(&doc, &config()).unwrap();
        let out = &n.document;
        let block = only_placeholder(out);
        let img = out.element(out.element_children(block)[0]).unwrap();
        assert_eq!(
            img.attr("src"),
            Some("https://site.test?screenshot_proxy&nonce=abc&href=https://img.youtube.com/vi/ID_1/0.jpg")
        );
        assert_eq!(img.attr("crossorigin"), Some("anonymous"));
        assert_eq!(img.style().get("height"), Some("450px"));
        assert!(n.resources.iter().any(|r| r.cross_origin && r.kind == ResourceKind::Image));
    }

    #[test]
    fn unknown_iframe_becomes_plain_block() {
        let doc = Document::parse_html(
            r#"<body><div class="page"><iframe src="https://maps.test/embed" style="width: 300px; height: 200px"></iframe><iframe></iframe></div></body>"#,
        );
        let n = normalize(&doc, &config()).unwrap();
        assert_eq!(n.replacements.len(), 2);
        assert!(n.replacements.iter().all(|r| r.kind == ReplacementKind::Block));
        assert_eq!(n.replacements[0].size, Size { width: 300, height: 200 });
        assert_eq!(n.replacements[1].size, Size { width: 0, height: 0 });

        let block = only_placeholder(&n.document);
        let el = n.document.element(block).unwrap();
        assert_eq!(el.style().get("background"), Some("gray"));
        assert!(n.document.element_children(block).is_empty());
    }

    #[test]
    fn css_url_extraction() {
        assert_eq!(extract_css_url(r#"url("https://a.test/x.png")"#).as_deref(), Some("https://a.test/x.png"));
        assert_eq!(extract_css_url("url('b.png') no-repeat").as_deref(), Some("b.png"));
        assert_eq!(extract_css_url("#fff url(c.png)").as_deref(), Some("c.png"));
        assert_eq!(extract_css_url("none"), None);
    }
}
