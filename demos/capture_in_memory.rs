//! Drive a full capture over an in-memory document.
//! Run with: cargo run --example capture_in_memory
//!
//! The rasterizer paints one stripe per top-level element of the target and
//! the persistence backend writes the PNG to the temp directory.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rfshot::data_uri::DataUri;
use rfshot::{
    CaptureConfig, Collaborators, CompletionMessage, Document, InMemoryDom, NodeId, Persistence,
    Rasterizer, RawBitmap, RenderOptions, SaveRequest,
};
use std::io::Cursor;
use std::sync::Arc;

const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<link rel="stylesheet" href="https://fonts.example.net/inter.css">
</head><body>
<header id="masthead">Site header</header>
<div class="elementor elementor-7" data-elementor-type="wp-page">
  <h1>Spring launch</h1>
  <iframe src="https://www.youtube.com/embed/launch01" width="960" height="540"></iframe>
  <div class="elementor-slides"><div>One</div><div>Two</div><div>Three</div></div>
</div>
<footer>Footer</footer>
</body></html>"#;

struct StripeRasterizer;

#[async_trait(?Send)]
impl Rasterizer for StripeRasterizer {
    async fn render(&self, document: &Document, target: NodeId, options: &RenderOptions) -> rfshot::Result<RawBitmap> {
        let stripes = document.element_children(target).len().max(1) as u32;
        println!("rendering {} stripes\n{}", stripes, document.to_html());

        let img = RgbaImage::from_fn(1440, stripes * 600, |_, y| {
            let shade = (255 * (y / 600 + 1) / stripes) as u8;
            Rgba([shade, 64, 255 - shade, 255])
        });
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut png, ImageFormat::Png)?;
        Ok(RawBitmap::from_bytes(&options.mime_type, png.get_ref()))
    }
}

struct TempDirPersistence;

#[async_trait]
impl Persistence for TempDirPersistence {
    async fn save(&self, request: &SaveRequest) -> rfshot::Result<String> {
        let png = DataUri::parse(&request.screenshot)?;
        let path = std::env::temp_dir().join("rfshot capture.png");
        tokio::fs::write(&path, &png.data)
            .await
            .map_err(|e| rfshot::Error::Persistence(e.to_string()))?;
        Ok(format!("file://{}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = CaptureConfig::from_json(
        r#"{
            "selector": "[data-elementor-type~=\"wp-page\"]",
            "home_url": "https://shop.example.com",
            "nonce": "demo",
            "post_id": 7,
            "isDebug": true
        }"#,
    )?;
    let collaborators = Collaborators {
        rasterizer: Arc::new(StripeRasterizer),
        persistence: Arc::new(TempDirPersistence),
        notifier: Arc::new(|m: &CompletionMessage| println!("notified: {}", m.name)),
    };

    let mut dom = InMemoryDom::from_html(PAGE);
    let report = rfshot::run_capture(config, collaborators, &mut dom, async {}).await?;

    println!(
        "{}x{} canvas, {} iframes replaced, {} resources, {:?} ({:?})",
        report.width,
        report.height,
        report.replacements.len(),
        report.resources.len(),
        report.outcome,
        report.elapsed
    );
    Ok(())
}
