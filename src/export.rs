//! Drawing the crop onto an offscreen surface and serializing it as JPEG.
//!
//! Two scale corrections are applied and kept apart:
//!
//! - `scale_x`/`scale_y` map displayed pixels to natural pixels, since the
//!   image is usually shown smaller (or larger) than its real resolution;
//! - `pixel_ratio` maps displayed (logical) pixels to physical ones, so the
//!   surface is sized for the screen and the result is not blurry.
//!
//! The source rectangle only ever sees the first, the surface only the second.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView as _, Rgb, RgbImage, RgbaImage};
use log::debug;

use crate::{CropError, CropRect, PixelRect, Size};

pub const JPEG_MIME: &str = "image/jpeg";

/// Everything needed to draw one export, computed up front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportPlan {
    pub scale_x: f32,
    pub scale_y: f32,
    pub pixel_ratio: f32,
    /// Region to read, in natural pixels.
    pub source: PixelRect,
    /// Destination size before the pixel-ratio transform.
    pub dest: Size,
}

impl ExportPlan {
    pub fn new(crop: CropRect, natural: Size, displayed: Size, pixel_ratio: f32) -> Self {
        let crop = crop.to_pixels(displayed);
        let scale_x = natural.width / displayed.width;
        let scale_y = natural.height / displayed.height;
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };

        Self {
            scale_x,
            scale_y,
            pixel_ratio,
            source: PixelRect {
                x: crop.x * scale_x,
                y: crop.y * scale_y,
                width: crop.width * scale_x,
                height: crop.height * scale_y,
            },
            dest: Size::new(crop.width, crop.height),
        }
    }

    /// Surface size in physical pixels: `dest` scaled by the pixel ratio.
    pub fn surface(&self) -> (u32, u32) {
        (
            surface_side(self.dest.width, self.pixel_ratio),
            surface_side(self.dest.height, self.pixel_ratio),
        )
    }
}

fn surface_side(len: f32, pixel_ratio: f32) -> u32 {
    (len * pixel_ratio).round().max(1.0) as u32
}

/// Integer source window `(x, y, w, h)`: edges rounded, clamped to the image.
fn source_window(source: PixelRect, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let edge = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
    let left = edge(source.x, width.saturating_sub(1));
    let top = edge(source.y, height.saturating_sub(1));
    let right = edge(source.x + source.width, width).max(left + 1);
    let bottom = edge(source.y + source.height, height).max(top + 1);
    (left, top, right - left, bottom - top)
}

/// A fresh canvas is transparent black and JPEG has no alpha, so
/// translucent pixels end up over black.
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Flattens `region` onto [`BACKGROUND`].
fn flatten(region: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(region.width(), region.height(), |x, y| {
        let [r, g, b, a] = region.get_pixel(x, y).0;
        let over = |c: u8, bg: u8| {
            let (c, bg, a) = (u32::from(c), u32::from(bg), u32::from(a));
            ((c * a + bg * (255 - a) + 127) / 255) as u8
        };
        Rgb([
            over(r, BACKGROUND.0[0]),
            over(g, BACKGROUND.0[1]),
            over(b, BACKGROUND.0[2]),
        ])
    })
}

/// Draws the planned source region onto a fresh surface.
pub fn render(image: &DynamicImage, plan: &ExportPlan, filter: FilterType) -> RgbImage {
    let (w, h) = image.dimensions();
    let (x, y, cw, ch) = source_window(plan.source, w, h);
    let cropped = image.crop_imm(x, y, cw, ch);
    let region = if cropped.color().has_alpha() {
        flatten(&cropped.to_rgba8())
    } else {
        cropped.to_rgb8()
    };
    let (sw, sh) = plan.surface();
    if region.dimensions() == (sw, sh) {
        return region;
    }
    imageops::resize(&region, sw, sh, filter)
}

pub fn encode_jpeg(surface: &RgbImage, quality: u8) -> Result<Vec<u8>, CropError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    surface
        .write_with_encoder(encoder)
        .map_err(CropError::Encode)?;
    Ok(buf)
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// One exported crop. Replaced wholesale by the next export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportResult {
    pub data_uri: String,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ExportResult {
    pub fn produce(
        image: &DynamicImage,
        plan: &ExportPlan,
        filter: FilterType,
        quality: u8,
    ) -> Result<Self, CropError> {
        let surface = render(image, plan, filter);
        let jpeg = encode_jpeg(&surface, quality)?;
        debug!(
            "exported {}x{} from source {:?} ({} bytes)",
            surface.width(),
            surface.height(),
            plan.source,
            jpeg.len()
        );
        Ok(Self {
            data_uri: to_data_uri(JPEG_MIME, &jpeg),
            jpeg,
            width: surface.width(),
            height: surface.height(),
        })
    }

    /// Decodes the JPEG back for the inline preview.
    pub fn decode_preview(&self) -> Result<eframe::egui::ColorImage, CropError> {
        let img = image::load_from_memory_with_format(&self.jpeg, image::ImageFormat::Jpeg)
            .map_err(CropError::Decode)?
            .to_rgba8();
        let size = [img.width() as usize, img.height() as usize];
        Ok(eframe::egui::ColorImage::from_rgba_unmultiplied(
            size,
            img.as_flat_samples().as_slice(),
        ))
    }

    /// Writes the JPEG where the user asked. Never called implicitly.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), CropError> {
        std::fs::write(path, &self.jpeg)?;
        Ok(())
    }
}
