//! Square photo crop.
//!
//! Produces the 600x600 JPEG stored as a member's photo. The source is scaled
//! to cover the square, multiplied by the zoom, then shifted by the offsets
//! (percent of half the output side). Uncovered area is white.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

pub const OUTPUT_SIZE: u32 = 600;
pub const JPEG_QUALITY: u8 = 90;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;
pub const MAX_OFFSET: f64 = 100.0;

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Invalid crop parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid data URI")]
    InvalidDataUri,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// User-chosen framing.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropParams {
    pub zoom: f64,
    /// Horizontal shift in percent of half the output side.
    pub offset_x: f64,
    /// Vertical shift in percent of half the output side.
    pub offset_y: f64,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl CropParams {
    pub fn validate(&self) -> Result<(), CropError> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom) {
            return Err(CropError::InvalidParams(format!(
                "zoom {} is outside {MIN_ZOOM}..={MAX_ZOOM}",
                self.zoom
            )));
        }
        for (axis, offset) in [("x", self.offset_x), ("y", self.offset_y)] {
            if !(-MAX_OFFSET..=MAX_OFFSET).contains(&offset) {
                return Err(CropError::InvalidParams(format!(
                    "{axis} offset {offset} is outside -{MAX_OFFSET}..={MAX_OFFSET}"
                )));
            }
        }
        Ok(())
    }
}

/// Where the scaled source lands on the output square.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    scale: f64,
    dx: f64,
    dy: f64,
    width: f64,
    height: f64,
}

fn place(source_width: u32, source_height: u32, params: &CropParams) -> Placement {
    let size = OUTPUT_SIZE as f64;
    let (w, h) = (source_width as f64, source_height as f64);
    let scale = (size / w).max(size / h) * params.zoom;
    let width = w * scale;
    let height = h * scale;
    let half = size / 2.0;
    Placement {
        scale,
        dx: half - width / 2.0 + params.offset_x / 100.0 * half,
        dy: half - height / 2.0 + params.offset_y / 100.0 * half,
        width,
        height,
    }
}

/// Crop encoded image bytes (PNG, JPEG or WebP) to the square JPEG.
pub fn crop_to_square(source: &[u8], params: &CropParams) -> Result<Vec<u8>, CropError> {
    params.validate()?;
    let image = image::load_from_memory(source)?;
    let canvas = render(&image, params);

    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).write_image(
        rgb.as_raw(),
        OUTPUT_SIZE,
        OUTPUT_SIZE,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out.into_inner())
}

fn render(image: &DynamicImage, params: &CropParams) -> RgbaImage {
    let size = OUTPUT_SIZE as f64;
    let mut canvas = RgbaImage::from_pixel(OUTPUT_SIZE, OUTPUT_SIZE, Rgba([255, 255, 255, 255]));
    if image.width() == 0 || image.height() == 0 {
        return canvas;
    }
    let p = place(image.width(), image.height(), params);

    // Visible part of the scaled image, in output pixels.
    let left = p.dx.max(0.0);
    let top = p.dy.max(0.0);
    let right = (p.dx + p.width).min(size);
    let bottom = (p.dy + p.height).min(size);
    let out_w = (right - left).round() as u32;
    let out_h = (bottom - top).round() as u32;
    if out_w == 0 || out_h == 0 {
        return canvas;
    }

    // The same region in source pixels.
    let src_x = ((left - p.dx) / p.scale).floor().max(0.0) as u32;
    let src_y = ((top - p.dy) / p.scale).floor().max(0.0) as u32;
    let src_w = (((right - left) / p.scale).ceil() as u32)
        .clamp(1, image.width().saturating_sub(src_x).max(1));
    let src_h = (((bottom - top) / p.scale).ceil() as u32)
        .clamp(1, image.height().saturating_sub(src_y).max(1));

    let region = imageops::crop_imm(&image.to_rgba8(), src_x, src_y, src_w, src_h).to_image();
    let scaled = imageops::resize(&region, out_w, out_h, FilterType::CatmullRom);
    imageops::overlay(&mut canvas, &scaled, left.round() as i64, top.round() as i64);
    canvas
}

/// Wrap JPEG bytes as a `data:` URI suitable for `photoUrl`.
pub fn to_data_uri(jpeg: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
    format!("{JPEG_DATA_URI_PREFIX}{encoded}")
}

/// Decode the payload of a base64 `data:` URI.
pub fn from_data_uri(uri: &str) -> Result<Vec<u8>, CropError> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(CropError::InvalidDataUri)?;
    if !header.ends_with(";base64") {
        return Err(CropError::InvalidDataUri);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| CropError::InvalidDataUri)
}
