//! Encoding to and decoding from file-exchange formats.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use super::{ColorMode, Image};
use crate::error::ImageError;

/// Default JPEG quality, matching common library defaults.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Target format for [`Image::to_encoded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Png,
    /// Lossy; alpha is dropped before encoding
    Jpeg { quality: u8 },
    Bmp,
    Tiff,
    /// Lossless WebP
    WebP,
}

impl EncodeFormat {
    /// Parse a format name (case-insensitive). JPEG uses the default quality.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            }),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::parse)
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg { .. } => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

impl Image {
    /// Decode an encoded image, detecting the format from its content.
    pub fn from_encoded(bytes: &[u8]) -> Result<Image, ImageError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("Cannot detect image format: {e}")))?;
        if reader.format().is_none() {
            return Err(ImageError::Decode("Unrecognized image format".to_string()));
        }
        let decoded = reader
            .decode()
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(Image::from_dynamic(decoded))
    }

    /// Encode to the given format. Output is deterministic for identical
    /// input and parameters.
    pub fn to_encoded(&self, format: EncodeFormat) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Cursor::new(Vec::new());

        match format {
            EncodeFormat::Jpeg { quality } => {
                let source = match self.mode() {
                    ColorMode::Rgba => self.as_rgb(),
                    _ => self.clone(),
                };
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                source
                    .into_dynamic()?
                    .write_with_encoder(encoder)
                    .map_err(|e| ImageError::Encode(e.to_string()))?;
            }
            other => {
                self.to_dynamic()?
                    .write_to(&mut buffer, other.image_format())
                    .map_err(|e| ImageError::Encode(e.to_string()))?;
            }
        }

        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Image {
        let data = (0..width * height)
            .flat_map(|i| {
                let v = if (i % width + i / width) % 2 == 0 { 0 } else { 255 };
                [v, 128, 255 - v]
            })
            .collect();
        Image::from_raster(data, width, height, ColorMode::Rgb).unwrap()
    }

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let img = checker(8, 6);
        let png = img.to_encoded(EncodeFormat::Png).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        assert_eq!(Image::from_encoded(&png).unwrap(), img);
    }

    #[test]
    fn test_gray_png_stays_gray() {
        let img = checker(4, 4).convert_color_mode(ColorMode::L);
        let png = img.to_encoded(EncodeFormat::Png).unwrap();
        let back = Image::from_encoded(&png).unwrap();
        assert_eq!(back.mode(), ColorMode::L);
        assert_eq!(back, img);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let img = checker(16, 16);
        for format in [
            EncodeFormat::Png,
            EncodeFormat::Jpeg { quality: 90 },
            EncodeFormat::Bmp,
        ] {
            assert_eq!(
                img.to_encoded(format).unwrap(),
                img.to_encoded(format).unwrap()
            );
        }
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let img = checker(8, 8).as_rgba();
        let jpeg = img.to_encoded(EncodeFormat::Jpeg { quality: 80 }).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let back = Image::from_encoded(&jpeg).unwrap();
        assert_eq!(back.mode(), ColorMode::Rgb);
        assert_eq!(back.size(), (8, 8));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = Image::from_encoded(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let png = checker(8, 8).to_encoded(EncodeFormat::Png).unwrap();
        let err = Image::from_encoded(&png[..png.len() / 2]).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(EncodeFormat::parse("PNG"), Some(EncodeFormat::Png));
        assert_eq!(
            EncodeFormat::parse("jpg"),
            Some(EncodeFormat::Jpeg {
                quality: DEFAULT_JPEG_QUALITY
            })
        );
        assert_eq!(
            EncodeFormat::from_path(Path::new("page.webp")),
            Some(EncodeFormat::WebP)
        );
        assert_eq!(EncodeFormat::parse("gif"), None);
    }
}
