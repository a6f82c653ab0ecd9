//! Post-processing: decode the raw bitmap and normalize it to the crop geometry.
//!
//! The source is scaled uniformly so its width equals the crop width, and
//! drawn at the top-left of a transparent crop-sized canvas. Taller results
//! are clipped at the bottom; shorter ones leave the remainder transparent.

use crate::capture::RawBitmap;
use crate::config::Crop;
use crate::data_uri::DataUri;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use std::io::Cursor;

/// The output artifact: always exactly the configured crop size
#[derive(Debug, Clone, PartialEq)]
pub struct FinalCanvas {
    image: RgbaImage,
}

impl FinalCanvas {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(self.image.clone())
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Encode as a PNG data URI, the form handed to persistence
    pub fn to_data_uri(&self) -> Result<String> {
        Ok(DataUri::encode("image/png", &self.to_png()?))
    }
}

/// Decode a raw bitmap data URI into an image
pub fn decode_bitmap(raw: &RawBitmap) -> Result<DynamicImage> {
    let uri = raw.decode()?;
    let image = image::load_from_memory(&uri.data)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::Decode("bitmap has no pixels".into()));
    }
    Ok(image)
}

/// Scale `image` to the crop width and clip/pad it to the crop height
pub fn crop_to_canvas(image: &DynamicImage, crop: Crop) -> Result<FinalCanvas> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::Decode("bitmap has no pixels".into()));
    }
    if crop.width == 0 || crop.height == 0 {
        return Err(Error::Config("crop dimensions must be positive".into()));
    }

    if crop.area().is_none() {
        return Err(Error::Config(format!(
            "crop {}x{} exceeds the canvas limit",
            crop.width, crop.height
        )));
    }
    let mut canvas = RgbaImage::from_raw(crop.width, crop.height, vec![0; rgba_len(crop.width, crop.height)?])
        .ok_or_else(|| Error::Config(format!("cannot allocate a {}x{} canvas", crop.width, crop.height)))?;

    // Only the source rows that land on the canvas are resampled
    let ratio = crop.width as f64 / w as f64;
    let visible_rows = ((crop.height as f64 / ratio).ceil() as u32).clamp(1, h);
    let dest_height = ((visible_rows as f64 * ratio).round() as u32).max(1);
    rgba_len(crop.width, dest_height)?;

    let source = image.crop_imm(0, 0, w, visible_rows).to_rgba8();
    let scaled = if (w, visible_rows) == (crop.width, dest_height) {
        source
    } else {
        imageops::resize(&source, crop.width, dest_height, FilterType::Triangle)
    };
    imageops::replace(&mut canvas, &scaled, 0, 0);

    log::debug!(
        "cropped {}x{} -> {}x{} (ratio {:.3}, {} source rows)",
        w,
        h,
        crop.width,
        crop.height,
        ratio,
        visible_rows
    );
    Ok(FinalCanvas { image: canvas })
}

/// Byte length of a `width` x `height` RGBA buffer
fn rgba_len(width: u32, height: u32) -> Result<usize> {
    u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|px| px.checked_mul(4))
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(|| Error::Config(format!("{}x{} image is too large", width, height)))
}

/// Decode and crop off the async executor
pub async fn postprocess(raw: RawBitmap, crop: Crop) -> Result<FinalCanvas> {
    tokio::task::spawn_blocking(move || {
        let image = decode_bitmap(&raw)?;
        crop_to_canvas(&image, crop)
    })
    .await
    .map_err(|e| Error::Other(format!("postprocess task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn two_tone(width: u32, height: u32, split: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |_, y| if y < split { RED } else { BLUE });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn upscales_and_clips_tall_pages() {
        // 8x20 into 12x15: ratio 1.5, scaled 12x30, only the top 10 rows fit
        let src = two_tone(8, 20, 10);
        let canvas = crop_to_canvas(&src, Crop { width: 12, height: 15 }).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (12, 15));
        for (x, y) in [(0, 0), (11, 0), (6, 14), (11, 14)] {
            let p = canvas.pixels().get_pixel(x, y);
            assert!(p[0] > 250 && p[2] < 5 && p[3] == 255, "pixel {},{} = {:?}", x, y, p);
        }
    }

    #[test]
    fn pads_short_pages_with_transparency() {
        let src = two_tone(10, 5, 5);
        let canvas = crop_to_canvas(&src, Crop { width: 20, height: 20 }).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (20, 20));
        assert_eq!(canvas.pixels().get_pixel(3, 4)[3], 255);
        assert_eq!(canvas.pixels().get_pixel(3, 10)[3], 0);
        assert_eq!(canvas.pixels().get_pixel(19, 19)[3], 0);
    }

    #[test]
    fn downscales_wide_pages() {
        let src = two_tone(400, 100, 100);
        let canvas = crop_to_canvas(&src, Crop { width: 100, height: 60 }).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (100, 60));
        assert_eq!(canvas.pixels().get_pixel(50, 24)[3], 255);
        assert_eq!(canvas.pixels().get_pixel(50, 30)[3], 0);
    }

    #[test]
    fn output_geometry_is_fixed_for_any_input() {
        let crop = Crop { width: 30, height: 40 };
        for (w, h) in [(1, 1), (7, 300), (300, 7), (30, 40), (61, 81)] {
            let canvas = crop_to_canvas(&two_tone(w, h, h / 2), crop).unwrap();
            assert_eq!((canvas.width(), canvas.height()), (30, 40), "source {}x{}", w, h);
        }
    }

    #[test]
    fn oversized_crop_is_rejected_before_allocating() {
        let src = two_tone(2, 2, 1);
        for crop in [
            Crop { width: u32::MAX, height: u32::MAX },
            Crop { width: Crop::MAX_SIDE + 1, height: 1 },
            Crop { width: 32_767, height: 8_193 },
        ] {
            assert!(
                matches!(crop_to_canvas(&src, crop), Err(Error::Config(_))),
                "crop {:?}",
                crop
            );
        }
        assert!(rgba_len(u32::MAX, u32::MAX).is_err());
        assert_eq!(rgba_len(3, 2).unwrap(), 24);
    }

    #[test]
    fn canvas_hands_back_its_pixels() {
        let canvas = crop_to_canvas(&two_tone(4, 4, 2), Crop { width: 4, height: 8 }).unwrap();
        let image = canvas.clone().into_image();
        assert_eq!(image.dimensions(), (4, 8));
        assert_eq!(&image, canvas.pixels());
        assert_eq!(image.get_pixel(0, 0), &RED);
        assert_eq!(image.get_pixel(0, 7)[3], 0);
    }

    #[tokio::test]
    async fn postprocess_decodes_png_data_uri() {
        let mut png = Cursor::new(Vec::new());
        two_tone(16, 16, 8).write_to(&mut png, ImageFormat::Png).unwrap();
        let raw = RawBitmap::from_bytes("image/png", png.get_ref());

        let canvas = postprocess(raw, Crop { width: 8, height: 4 }).await.unwrap();
        assert_eq!((canvas.width(), canvas.height()), (8, 4));

        let uri = canvas.to_data_uri().unwrap();
        let back = DataUri::parse(&uri).unwrap();
        assert_eq!(back.mime_type, "image/png");
        assert_eq!(&back.data[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn postprocess_rejects_garbage() {
        let raw = RawBitmap::from_bytes("image/png", b"definitely not a png");
        assert!(matches!(postprocess(raw, Crop::default()).await, Err(Error::Decode(_))));
    }
}
