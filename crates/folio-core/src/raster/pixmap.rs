//! The renderer-side pixel buffer.

use super::{ColorMode, Image};
use crate::error::ImageError;

/// Raw interleaved samples as produced by a page renderer.
///
/// Rows are tightly packed (no stride padding), 8 bits per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPixmap {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel (1, 3 or 4)
    pub channels: u8,
    pub samples: Vec<u8>,
}

impl Image {
    /// Take ownership of a rendered pixmap's samples without copying.
    pub fn from_pixmap(pixmap: RawPixmap) -> Result<Image, ImageError> {
        let mode = ColorMode::from_channels(pixmap.channels as usize).ok_or_else(|| {
            ImageError::UnsupportedConversion {
                from: format!("{}-channel pixmap", pixmap.channels),
                to: "Image".to_string(),
            }
        })?;
        Image::from_raster(pixmap.samples, pixmap.width, pixmap.height, mode)
    }

    /// Copy into a renderer pixmap.
    pub fn to_pixmap(&self) -> RawPixmap {
        self.clone().into_pixmap()
    }

    /// Move into a renderer pixmap without copying.
    pub fn into_pixmap(self) -> RawPixmap {
        let (width, height) = self.size();
        let channels = self.mode().channels() as u8;
        RawPixmap {
            width,
            height,
            channels,
            samples: self.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixmap_roundtrip() {
        let pixmap = RawPixmap {
            width: 3,
            height: 2,
            channels: 3,
            samples: (0..18).collect(),
        };
        let img = Image::from_pixmap(pixmap.clone()).unwrap();
        assert_eq!(img.mode(), ColorMode::Rgb);
        assert_eq!(img.into_pixmap(), pixmap);
    }

    #[test]
    fn test_pixmap_with_bad_length() {
        let pixmap = RawPixmap {
            width: 3,
            height: 2,
            channels: 1,
            samples: vec![0; 5],
        };
        assert!(matches!(
            Image::from_pixmap(pixmap),
            Err(ImageError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_pixmap_with_unknown_channel_count() {
        let pixmap = RawPixmap {
            width: 1,
            height: 1,
            channels: 2,
            samples: vec![0; 2],
        };
        assert!(matches!(
            Image::from_pixmap(pixmap),
            Err(ImageError::UnsupportedConversion { .. })
        ));
    }
}
