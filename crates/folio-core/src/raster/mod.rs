//! In-memory page image representation.
//!
//! [`Image`] holds decoded 8-bit pixel data plus its geometry and color mode.
//! It is the currency between a document renderer, which produces a
//! [`RawPixmap`], and a recognition engine, which wants either an
//! [`image::DynamicImage`], a numeric array, or an encoded file.
//!
//! Every conversion is an explicit named function:
//!
//! | conversion                         | cost        | lossless |
//! |------------------------------------|-------------|----------|
//! | `from_pixmap` / `into_pixmap`      | O(1) move   | yes      |
//! | `to_pixmap`                        | O(pixels)   | yes      |
//! | `from_dynamic`                     | O(1)/O(px)  | 8-bit yes, 16-bit/float narrowed |
//! | `to_dynamic` / `into_dynamic`      | O(px)/O(1)  | yes      |
//! | `to_array` / `into_array`          | O(px)/O(1)  | yes      |
//! | `from_array`                       | O(pixels)   | yes      |
//! | `to_gray_array`                    | O(pixels)   | no (colorimetric reduction) |
//! | `to_encoded` / `from_encoded`      | codec       | PNG/BMP/TIFF/WebP yes, JPEG no |
//! | `scaled` / `thumbnail`             | O(pixels)   | no (resampled) |
//!
//! Images are never mutated after construction; every transformation returns
//! a new value, so an `Image` can be moved between worker threads freely.

mod codec;
mod convert;
mod pixmap;
mod thumbnail;

pub use codec::EncodeFormat;
pub use pixmap::RawPixmap;
pub use thumbnail::FillColor;

use crate::error::ImageError;
use std::fmt;

/// Channel layout of the pixel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// Single-channel 8-bit grayscale
    L,
    /// Three-channel 8-bit RGB
    Rgb,
    /// Four-channel 8-bit RGB with alpha
    Rgba,
}

impl ColorMode {
    /// Number of samples per pixel.
    pub fn channels(self) -> usize {
        match self {
            ColorMode::L => 1,
            ColorMode::Rgb => 3,
            ColorMode::Rgba => 4,
        }
    }

    /// Mode for a given channel count, if one exists.
    pub fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(ColorMode::L),
            3 => Some(ColorMode::Rgb),
            4 => Some(ColorMode::Rgba),
            _ => None,
        }
    }

    /// Parse a mode name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "l" | "gray" | "grey" | "grayscale" | "luma" => Some(ColorMode::L),
            "rgb" => Some(ColorMode::Rgb),
            "rgba" => Some(ColorMode::Rgba),
            _ => None,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::L => write!(f, "L"),
            ColorMode::Rgb => write!(f, "RGB"),
            ColorMode::Rgba => write!(f, "RGBA"),
        }
    }
}

/// An immutable decoded raster image.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
    mode: ColorMode,
}

impl Image {
    /// Wrap raw pixel data without copying.
    ///
    /// Fails with [`ImageError::InvalidDimensions`] if `data.len()` is not
    /// `width * height * channels(mode)` or if either dimension is zero.
    pub fn from_raster(
        data: Vec<u8>,
        width: u32,
        height: u32,
        mode: ColorMode,
    ) -> Result<Self, ImageError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(mode.channels()));

        match expected {
            Some(expected) if expected == data.len() && expected > 0 => Ok(Self {
                data,
                width,
                height,
                mode,
            }),
            _ => Err(ImageError::InvalidDimensions {
                width,
                height,
                mode: mode.to_string(),
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            }),
        }
    }

    /// Construct from parts already known to satisfy the length invariant.
    pub(crate) fn from_parts(data: Vec<u8>, width: u32, height: u32, mode: ColorMode) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * mode.channels()
        );
        Self {
            data,
            width,
            height,
            mode,
        }
    }

    /// Raw interleaved samples, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image and return its sample buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Image: width={}, height={}, mode={}>",
            self.width, self.height, self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raster_accepts_exact_length() {
        let img = Image::from_raster(vec![0; 2 * 3 * 3], 2, 3, ColorMode::Rgb).unwrap();
        assert_eq!(img.size(), (2, 3));
        assert_eq!(img.mode(), ColorMode::Rgb);
        assert_eq!(img.data().len(), 18);
    }

    #[test]
    fn test_from_raster_rejects_wrong_length() {
        let err = Image::from_raster(vec![0; 10], 2, 2, ColorMode::Rgb).unwrap_err();
        match err {
            ImageError::InvalidDimensions {
                expected, actual, ..
            } => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_raster_rejects_zero_area() {
        assert!(Image::from_raster(vec![], 0, 4, ColorMode::L).is_err());
    }

    #[test]
    fn test_color_mode_parse() {
        assert_eq!(ColorMode::parse("RGB"), Some(ColorMode::Rgb));
        assert_eq!(ColorMode::parse("gray"), Some(ColorMode::L));
        assert_eq!(ColorMode::parse("rgba"), Some(ColorMode::Rgba));
        assert_eq!(ColorMode::parse("CMYK"), None);
    }

    #[test]
    fn test_debug_does_not_dump_pixels() {
        let img = Image::from_raster(vec![7; 4], 2, 2, ColorMode::L).unwrap();
        assert_eq!(format!("{img:?}"), "<Image: width=2, height=2, mode=L>");
    }
}
