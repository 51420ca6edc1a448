//! Decoded raster images with multi-format pixel buffers.
//!
//! Decal sources arrive as PNG/JPEG/TIFF/TGA files or raw byte blobs and
//! are decoded to 8-bit RGBA. The composite's bump layer works in f32, so
//! the buffer enum carries both precisions:
//!
//! - `PixelBuffer::U8`: LDR decal sources and the composite texture
//! - `PixelBuffer::F32`: height/bump data
//!
//! Unlike cached video frames there is no load-status lifecycle here - a
//! `PixelImage` is immutable once decoded; async decode bookkeeping lives
//! in the session, not the pixels.

use std::path::Path;

use log::debug;

use crate::error::MapperError;

/// Pixel buffer - stores different precision levels.
#[derive(Debug, Clone)]
pub enum PixelBuffer {
    /// 8-bit RGBA, 4 bytes/pixel.
    U8(Vec<u8>),
    /// 32-bit float RGBA, 16 bytes/pixel.
    F32(Vec<f32>),
}

/// Pixel format type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    RgbaF32,
}

/// Immutable decoded image.
#[derive(Debug, Clone)]
pub struct PixelImage {
    buffer: PixelBuffer,
    width: usize,
    height: usize,
}

impl PixelImage {
    pub fn from_u8_buffer(buffer: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(buffer.len(), width * height * 4);
        Self {
            buffer: PixelBuffer::U8(buffer),
            width,
            height,
        }
    }

    pub fn from_f32_buffer(buffer: Vec<f32>, width: usize, height: usize) -> Self {
        debug_assert_eq!(buffer.len(), width * height * 4);
        Self {
            buffer: PixelBuffer::F32(buffer),
            width,
            height,
        }
    }

    /// Uniform-color image (programmatic shape decals, tests).
    pub fn solid(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let mut buffer = vec![0u8; width * height * 4];
        for px in buffer.chunks_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Self::from_u8_buffer(buffer, width, height)
    }

    /// Decode an image file to RGBA8.
    pub fn decode_path(path: &Path) -> Result<Self, MapperError> {
        debug!("Decoding image: {}", path.display());
        let img = image::open(path).map_err(|e| MapperError::ImageDecode(e.to_string()))?;
        Ok(Self::from_dynamic(img))
    }

    /// Decode an in-memory byte blob (upload payloads) to RGBA8.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, MapperError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| MapperError::ImageDecode(e.to_string()))?;
        Ok(Self::from_dynamic(img))
    }

    fn from_dynamic(img: image::DynamicImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let rgba = img.to_rgba8();
        Self::from_u8_buffer(rgba.into_raw(), width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Width / height ratio; 1.0 for degenerate images.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Zero-area images cannot be drawn (corrupt or placeholder input).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match self.buffer {
            PixelBuffer::U8(_) => PixelFormat::Rgba8,
            PixelBuffer::F32(_) => PixelFormat::RgbaF32,
        }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Memory size in bytes.
    pub fn mem(&self) -> usize {
        match &self.buffer {
            PixelBuffer::U8(vec) => vec.len(),
            PixelBuffer::F32(vec) => vec.len() * 4,
        }
    }

    /// Nearest-neighbor sample. Returns `[R, G, B, A]` in 0-1 range, or
    /// transparent if outside bounds.
    pub fn sample_nearest(&self, x: f32, y: f32) -> [f32; 4] {
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return [0.0, 0.0, 0.0, 0.0];
        }
        let xi = x.floor() as usize;
        let yi = y.floor() as usize;
        self.texel(xi.min(self.width - 1), yi.min(self.height - 1))
    }

    /// Bilinear sample. Returns `[R, G, B, A]` in 0-1 range, or
    /// transparent if outside bounds.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> [f32; 4] {
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return [0.0, 0.0, 0.0, 0.0];
        }

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let c00 = self.texel(x0, y0);
        let c10 = self.texel(x1, y0);
        let c01 = self.texel(x0, y1);
        let c11 = self.texel(x1, y1);

        let mut result = [0.0f32; 4];
        for c in 0..4 {
            let top = c00[c] * (1.0 - fx) + c10[c] * fx;
            let bottom = c01[c] * (1.0 - fx) + c11[c] * fx;
            result[c] = top * (1.0 - fy) + bottom * fy;
        }
        result
    }

    #[inline]
    fn texel(&self, x: usize, y: usize) -> [f32; 4] {
        let idx = (y * self.width + x) * 4;
        match &self.buffer {
            PixelBuffer::U8(buf) => [
                buf[idx] as f32 / 255.0,
                buf[idx + 1] as f32 / 255.0,
                buf[idx + 2] as f32 / 255.0,
                buf[idx + 3] as f32 / 255.0,
            ],
            PixelBuffer::F32(buf) => [buf[idx], buf[idx + 1], buf[idx + 2], buf[idx + 3]],
        }
    }
}
