//! Pixel storage
//!
//! Flat, fixed-size pixel arrays: 8-bit palette indices for the world view and
//! 32-bit RGBA for graphics, pages and the composited frame.

use std::fmt;
use std::path::Path;

/// Byte length of a PLAYPAL-style palette: 256 RGB triples
pub const PALETTE_BYTES: usize = 256 * 3;

/// Error for palette blobs of the wrong size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteError {
    pub len: usize,
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "palette needs {} bytes, got {}", PALETTE_BYTES, self.len)
    }
}

impl std::error::Error for PaletteError {}

/// 256-entry RGB palette
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    bytes: [u8; PALETTE_BYTES],
}

impl fmt::Debug for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Palette").field("first", &self.rgb(0)).finish()
    }
}

impl Palette {
    /// Build from the first 768 bytes of a blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PaletteError> {
        let src = bytes
            .get(..PALETTE_BYTES)
            .ok_or(PaletteError { len: bytes.len() })?;
        let mut out = [0u8; PALETTE_BYTES];
        out.copy_from_slice(src);
        Ok(Self { bytes: out })
    }

    /// Grayscale ramp, handy as a fallback and in tests
    pub fn grayscale() -> Self {
        let mut bytes = [0u8; PALETTE_BYTES];
        for i in 0..256 {
            bytes[i * 3] = i as u8;
            bytes[i * 3 + 1] = i as u8;
            bytes[i * 3 + 2] = i as u8;
        }
        Self { bytes }
    }

    #[inline]
    pub fn rgb(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.bytes[i], self.bytes[i + 1], self.bytes[i + 2]]
    }

    pub fn as_bytes(&self) -> &[u8; PALETTE_BYTES] {
        &self.bytes
    }

    /// Expand into 256 opaque RGBA entries (one row of a palette texture)
    pub fn to_rgba_lut(&self) -> Vec<u8> {
        let mut lut = Vec::with_capacity(256 * 4);
        for i in 0..=255u8 {
            let [r, g, b] = self.rgb(i);
            lut.extend_from_slice(&[r, g, b, 0xFF]);
        }
        lut
    }

    /// Index of the closest colour by squared RGB distance
    pub fn nearest(&self, r: u8, g: u8, b: u8) -> u8 {
        let mut best = 0u8;
        let mut best_dist = u32::MAX;
        for i in 0..=255u8 {
            let [pr, pg, pb] = self.rgb(i);
            let dr = pr as i32 - r as i32;
            let dg = pg as i32 - g as i32;
            let db = pb as i32 - b as i32;
            let dist = (dr * dr + dg * dg + db * db) as u32;
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best
    }
}

/// A buffer of 8-bit palette indices that knows its own resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PalettedBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of bytes in the buffer
    #[inline]
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Raw write access; the rasterizer writes straight into this
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Offset of (x, y). Bounds are only checked with `rangecheck` or in
    /// debug builds.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        #[cfg(any(debug_assertions, feature = "rangecheck"))]
        if x >= self.width || y >= self.height {
            panic!(
                "PalettedBuffer::index: ({}, {}) outside {}x{}",
                x, y, self.width, self.height
            );
        }
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        let i = self.index(x, y);
        self.pixels[i] = value;
    }

    pub fn fill(&mut self, value: u8) {
        self.pixels.fill(value);
    }

    /// Change dimensions. Contents are cleared to index 0.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, 0);
    }

    /// Resolve every index through a palette
    pub fn to_rgba(&self, palette: &Palette) -> RgbaBuffer {
        let mut out = RgbaBuffer::new(self.width, self.height);
        for (dst, &index) in out.pixels.chunks_exact_mut(4).zip(&self.pixels) {
            let [r, g, b] = palette.rgb(index);
            dst.copy_from_slice(&[r, g, b, 0xFF]);
        }
        out
    }
}

/// A buffer of truecolor + transparency pixels that knows its own resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>, // RGBA, 4 bytes per pixel
}

impl RgbaBuffer {
    /// Fully transparent buffer
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    /// Wrap existing RGBA bytes; `None` if the length does not match
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() == width * height * 4 {
            Some(Self { width, height, pixels })
        } else {
            None
        }
    }

    /// Decode a PNG (or anything else the image crate is built with)
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels: img.into_raw(),
        })
    }

    /// Write the buffer out as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width as u32,
            self.height as u32,
            image::ExtendedColorType::Rgba8,
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Byte offset of pixel (x, y)
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        #[cfg(any(debug_assertions, feature = "rangecheck"))]
        if x >= self.width || y >= self.height {
            panic!(
                "RgbaBuffer::index: ({}, {}) outside {}x{}",
                x, y, self.width, self.height
            );
        }
        (y * self.width + x) * 4
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 4] {
        let i = self.index(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Write one pixel, ignoring coordinates outside the buffer
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let i = (y as usize * self.width + x as usize) * 4;
            self.pixels[i..i + 4].copy_from_slice(&color);
        }
    }

    /// Copy `src` in at (x, y), clipped to this buffer
    pub fn blit(&mut self, src: &RgbaBuffer, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = src.width.min(self.width - x);
        let h = src.height.min(self.height - y);
        for row in 0..h {
            let s = row * src.width * 4;
            let d = ((y + row) * self.width + x) * 4;
            self.pixels[d..d + w * 4].copy_from_slice(&src.pixels[s..s + w * 4]);
        }
    }

    /// Draw a line from (x0, y0) to (x1, y1) using Bresenham's algorithm
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 4]) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}
