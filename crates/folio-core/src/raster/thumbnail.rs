//! Resampling: uniform scaling and aspect-preserving thumbnails.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

use super::convert::luma;
use super::{ColorMode, Image};
use crate::error::ImageError;

/// Border color used when padding a thumbnail to an exact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl FillColor {
    pub const WHITE: FillColor = FillColor::rgb(255, 255, 255);
    pub const BLACK: FillColor = FillColor::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }
}

impl Default for FillColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Largest size that fits within `(max_w, max_h)` keeping the aspect ratio.
/// Never larger than the source.
pub(crate) fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let (w, h, mw, mh) = (width as u64, height as u64, max_w as u64, max_h as u64);
    // Width binds when max_w / w <= max_h / h.
    if mw * h <= mh * w {
        let nh = (h * mw * 2 + w) / (w * 2);
        (max_w, nh.clamp(1, mh) as u32)
    } else {
        let nw = (w * mh * 2 + h) / (h * 2);
        (nw.clamp(1, mw) as u32, max_h)
    }
}

impl Image {
    /// Resample by `factor` in both directions. Non-positive or non-finite
    /// factors leave the image unchanged.
    pub fn scaled(&self, factor: f32) -> Result<Image, ImageError> {
        if !factor.is_finite() || factor <= 0.0 || factor == 1.0 {
            return Ok(self.clone());
        }
        let scale = |v: u32| ((v as f64 * factor as f64).round() as u32).max(1);
        let (nw, nh) = (scale(self.width()), scale(self.height()));
        if (nw, nh) == self.size() {
            return Ok(self.clone());
        }
        Ok(Image::from_dynamic(
            self.to_dynamic()?
                .resize_exact(nw, nh, FilterType::CatmullRom),
        ))
    }

    /// Scale down to fit within `(max_width, max_height)` keeping the aspect
    /// ratio. With `exact_fit`, the result is centered on a canvas of exactly
    /// `(max_width, max_height)` filled with `fill`.
    ///
    /// The image content is never upscaled.
    pub fn thumbnail(
        &self,
        max_width: u32,
        max_height: u32,
        exact_fit: bool,
        fill: FillColor,
    ) -> Result<Image, ImageError> {
        if max_width == 0 || max_height == 0 {
            return Err(ImageError::InvalidDimensions {
                width: max_width,
                height: max_height,
                mode: self.mode().to_string(),
                expected: 1,
                actual: 0,
            });
        }

        let (nw, nh) = fit_within(self.width(), self.height(), max_width, max_height);
        let scaled = if (nw, nh) == self.size() {
            self.to_dynamic()?
        } else {
            self.to_dynamic()?
                .resize_exact(nw, nh, FilterType::CatmullRom)
        };

        if !exact_fit || (nw, nh) == (max_width, max_height) {
            return Ok(Image::from_dynamic(scaled));
        }

        let mut canvas = blank_canvas(self.mode(), max_width, max_height, fill);
        let x = ((max_width - nw) / 2) as i64;
        let y = ((max_height - nh) / 2) as i64;
        imageops::replace(&mut canvas, &scaled, x, y);
        Ok(Image::from_dynamic(canvas))
    }
}

fn blank_canvas(mode: ColorMode, width: u32, height: u32, fill: FillColor) -> DynamicImage {
    match mode {
        ColorMode::L => DynamicImage::ImageLuma8(GrayImage::from_pixel(
            width,
            height,
            Luma([luma(fill.r, fill.g, fill.b)]),
        )),
        ColorMode::Rgb => DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([fill.r, fill.g, fill.b]),
        )),
        ColorMode::Rgba => DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([fill.r, fill.g, fill.b, fill.a]),
        )),
    }
}
