//! Color-mode conversion and interop with `image` and `ndarray` types.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use super::{ColorMode, Image};
use crate::error::ImageError;

/// ITU-R 601-2 luma, fixed-point. Equal channels map back to themselves.
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

fn length_mismatch(width: u32, height: u32, mode: ColorMode, actual: usize) -> ImageError {
    ImageError::InvalidDimensions {
        width,
        height,
        mode: mode.to_string(),
        expected: width as usize * height as usize * mode.channels(),
        actual,
    }
}

impl Image {
    /// Convert to another color mode.
    ///
    /// Lossless: `L -> RGB`, `L -> RGBA`, `RGB -> RGBA`, and any conversion
    /// back to the source mode from those. Lossy: `RGB -> L` and `RGBA -> L`
    /// (luma reduction), `RGBA -> RGB` (alpha dropped).
    pub fn convert_color_mode(&self, target: ColorMode) -> Image {
        if target == self.mode {
            return self.clone();
        }

        let src = &self.data;
        let mut out = Vec::with_capacity(self.pixel_count() * target.channels());

        match (self.mode, target) {
            (ColorMode::L, ColorMode::Rgb) => {
                for &v in src {
                    out.extend_from_slice(&[v, v, v]);
                }
            }
            (ColorMode::L, ColorMode::Rgba) => {
                for &v in src {
                    out.extend_from_slice(&[v, v, v, 255]);
                }
            }
            (ColorMode::Rgb, ColorMode::L) => {
                out.extend(src.chunks_exact(3).map(|p| luma(p[0], p[1], p[2])));
            }
            (ColorMode::Rgb, ColorMode::Rgba) => {
                for p in src.chunks_exact(3) {
                    out.extend_from_slice(&[p[0], p[1], p[2], 255]);
                }
            }
            (ColorMode::Rgba, ColorMode::L) => {
                out.extend(src.chunks_exact(4).map(|p| luma(p[0], p[1], p[2])));
            }
            (ColorMode::Rgba, ColorMode::Rgb) => {
                for p in src.chunks_exact(4) {
                    out.extend_from_slice(&p[..3]);
                }
            }
            _ => unreachable!("identical modes handled above"),
        }

        Image::from_parts(out, self.width, self.height, target)
    }

    /// Convert to a mode given by name.
    ///
    /// Fails with [`ImageError::UnsupportedConversion`] when the name is not
    /// a known mode.
    pub fn convert_named(&self, target: &str) -> Result<Image, ImageError> {
        let mode = ColorMode::parse(target).ok_or_else(|| ImageError::UnsupportedConversion {
            from: self.mode.to_string(),
            to: target.to_string(),
        })?;
        Ok(self.convert_color_mode(mode))
    }

    /// Shorthand for `convert_color_mode(ColorMode::Rgb)`.
    pub fn as_rgb(&self) -> Image {
        self.convert_color_mode(ColorMode::Rgb)
    }

    /// Shorthand for `convert_color_mode(ColorMode::Rgba)`.
    pub fn as_rgba(&self) -> Image {
        self.convert_color_mode(ColorMode::Rgba)
    }

    /// Bitwise-invert every color sample. Alpha is left untouched, so
    /// inverting twice yields the original image.
    pub fn invert(&self) -> Image {
        let data = match self.mode {
            ColorMode::L | ColorMode::Rgb => self.data.iter().map(|v| !v).collect(),
            ColorMode::Rgba => self
                .data
                .chunks_exact(4)
                .flat_map(|p| [!p[0], !p[1], !p[2], p[3]])
                .collect(),
        };
        Image::from_parts(data, self.width, self.height, self.mode)
    }

    // ── image crate interop ────────────────────────────────────────────────

    /// Wrap a decoded [`DynamicImage`].
    ///
    /// 8-bit L/RGB/RGBA buffers are moved without copying. Luma+alpha is
    /// widened to RGBA; 16-bit and float images are narrowed to 8 bits.
    pub fn from_dynamic(image: DynamicImage) -> Image {
        let (width, height) = (image.width(), image.height());
        let (data, mode) = match image {
            DynamicImage::ImageLuma8(buf) => (buf.into_raw(), ColorMode::L),
            DynamicImage::ImageRgb8(buf) => (buf.into_raw(), ColorMode::Rgb),
            DynamicImage::ImageRgba8(buf) => (buf.into_raw(), ColorMode::Rgba),
            other @ DynamicImage::ImageLuma16(_) => (other.to_luma8().into_raw(), ColorMode::L),
            other if other.color().has_alpha() => (other.to_rgba8().into_raw(), ColorMode::Rgba),
            other => (other.to_rgb8().into_raw(), ColorMode::Rgb),
        };
        Image::from_parts(data, width, height, mode)
    }

    /// Copy into a [`DynamicImage`] of the matching 8-bit variant.
    pub fn to_dynamic(&self) -> Result<DynamicImage, ImageError> {
        self.clone().into_dynamic()
    }

    /// Move into a [`DynamicImage`] without copying the samples.
    pub fn into_dynamic(self) -> Result<DynamicImage, ImageError> {
        let Image {
            data,
            width,
            height,
            mode,
        } = self;
        let actual = data.len();
        let dynamic = match mode {
            ColorMode::L => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
            ColorMode::Rgb => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
            ColorMode::Rgba => {
                RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8)
            }
        };
        dynamic.ok_or_else(|| length_mismatch(width, height, mode, actual))
    }

    // ── ndarray interop ────────────────────────────────────────────────────

    /// Copy into an `(height, width, channels)` array.
    pub fn to_array(&self) -> Result<Array3<u8>, ImageError> {
        self.clone().into_array()
    }

    /// Move into an `(height, width, channels)` array without copying.
    pub fn into_array(self) -> Result<Array3<u8>, ImageError> {
        let (width, height, mode, actual) = (self.width, self.height, self.mode, self.data.len());
        let shape = (height as usize, width as usize, mode.channels());
        Array3::from_shape_vec(shape, self.data)
            .map_err(|_| length_mismatch(width, height, mode, actual))
    }

    /// Build from an `(height, width, channels)` array of any memory layout.
    ///
    /// Channel count selects the mode (1, 3 or 4); anything else is an
    /// [`ImageError::UnsupportedConversion`].
    pub fn from_array(array: ArrayView3<'_, u8>) -> Result<Image, ImageError> {
        let (height, width, channels) = array.dim();
        let mode =
            ColorMode::from_channels(channels).ok_or_else(|| ImageError::UnsupportedConversion {
                from: format!("{channels}-channel array"),
                to: "Image".to_string(),
            })?;
        let data: Vec<u8> = array.iter().copied().collect();
        Image::from_raster(data, width as u32, height as u32, mode)
    }

    /// Single-channel `(height, width)` array.
    ///
    /// Color images are reduced directly with the same luma weights as
    /// `convert_color_mode(ColorMode::L)`; nothing is re-encoded.
    pub fn to_gray_array(&self) -> Result<Array2<u8>, ImageError> {
        let gray = match self.mode {
            ColorMode::L => self.data.clone(),
            ColorMode::Rgb => self
                .data
                .chunks_exact(3)
                .map(|p| luma(p[0], p[1], p[2]))
                .collect(),
            ColorMode::Rgba => self
                .data
                .chunks_exact(4)
                .map(|p| luma(p[0], p[1], p[2]))
                .collect(),
        };
        let actual = gray.len();
        Array2::from_shape_vec((self.height as usize, self.width as usize), gray)
            .map_err(|_| length_mismatch(self.width, self.height, ColorMode::L, actual))
    }

    /// Build a grayscale image from a `(height, width)` array.
    pub fn from_gray_array(array: ArrayView2<'_, u8>) -> Result<Image, ImageError> {
        let (height, width) = array.dim();
        let data: Vec<u8> = array.iter().copied().collect();
        Image::from_raster(data, width as u32, height as u32, ColorMode::L)
    }
}
