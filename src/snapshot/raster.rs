use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::scene::resources::RenderError;

pub type Rgba8 = [u8; 4];

/// RGBA8 pixel buffer, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, fill: Rgba8) -> Self {
        let pixels = fill
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        let i = self.offset(x, y)?;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i..i + 4].copy_from_slice(&color);
        }
    }

    /// Pixels as texels, top row first.
    pub fn texels(&self) -> Vec<Rgba8> {
        self.pixels
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect()
    }

    /// Number of pixels equal to `color`.
    pub fn count(&self, color: Rgba8) -> usize {
        self.pixels.chunks_exact(4).filter(|px| *px == color).count()
    }

    pub fn to_image(&self) -> Result<RgbaImage, RenderError> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| RenderError::Encode("pixel buffer does not match raster size".to_string()))
    }

    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut out = Cursor::new(Vec::new());
        self.to_image()?
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        self.to_image()?
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| RenderError::Encode(format!("{}: {e}", path.display())))
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self, RenderError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?
            .to_rgba8();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels() {
        let mut r = Raster::new(3, 2, [1, 2, 3, 255]);
        assert_eq!(r.pixels().len(), 24);
        r.set_pixel(2, 1, [9, 9, 9, 255]);
        r.set_pixel(5, 5, [0, 0, 0, 0]);
        assert_eq!(r.pixel(2, 1), Some([9, 9, 9, 255]));
        assert_eq!(r.pixel(3, 0), None);
        assert_eq!(r.count([1, 2, 3, 255]), 5);
    }

    #[test]
    fn test_texels_follow_rows() {
        let mut r = Raster::new(2, 2, [0, 0, 0, 255]);
        r.set_pixel(1, 0, [255, 0, 0, 255]);
        r.set_pixel(0, 1, [0, 0, 255, 255]);
        let texels = r.texels();
        assert_eq!(texels.len(), 4);
        assert_eq!(texels[1], [255, 0, 0, 255]);
        assert_eq!(texels[2], [0, 0, 255, 255]);
        assert_eq!(texels[3], [0, 0, 0, 255]);
    }

    #[test]
    fn test_png_encoding() -> Result<(), RenderError> {
        let mut r = Raster::new(4, 4, [200, 10, 10, 255]);
        r.set_pixel(0, 3, [0, 0, 255, 255]);
        let png = r.to_png()?;
        assert_eq!(&png[1..4], b"PNG");
        let back = Raster::from_png(&png)?;
        assert_eq!(back, r);
        Ok(())
    }
}
