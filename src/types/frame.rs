//! Captured frame pixels

use std::path::Path;

use crate::error::SourceError;

/// RGBA8 pixel buffer for one captured frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FrameBuffer {
    /// Wrap raw RGBA bytes; length must be width * height * 4
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, SourceError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(SourceError::InvalidFrame(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// Single-color frame
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let rgba = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(width as usize * height as usize)
            .flatten()
            .collect();
        Self { width, height, rgba }
    }

    /// Decode an image file
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let img = image::open(path)
            .map_err(|e| SourceError::InvalidFrame(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from(img.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.rgba.len() / 4
    }

    /// RGBA of the i-th pixel in row-major order
    pub fn pixel(&self, i: usize) -> Option<[u8; 4]> {
        let p = self.rgba.get(i * 4..i * 4 + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

impl From<image::RgbaImage> for FrameBuffer {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        assert!(FrameBuffer::new(2, 2, vec![0; 15]).is_err());
        assert!(FrameBuffer::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_solid_pixels() {
        let frame = FrameBuffer::solid(3, 2, [10, 20, 30]);
        assert_eq!(frame.pixel_count(), 6);
        assert_eq!(frame.pixel(5), Some([10, 20, 30, 255]));
        assert_eq!(frame.pixel(6), None);
    }

    #[test]
    fn test_from_rgba_image() {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 4]));
        let frame = FrameBuffer::from(img);
        assert_eq!((frame.width(), frame.height()), (4, 4));
        assert_eq!(frame.pixel(0), Some([1, 2, 3, 4]));
    }
}
