//! Frame composition
//!
//! The `Renderer` trait is everything the engine needs from a display
//! backend: an 8-bit world view shown through a palette, a truecolor
//! fullscreen page, automap lines, and 2D graphics batched from a texture
//! atlas. Two backends exist: `GlRenderer` draws through macroquad, and
//! `SoftwareRenderer` composites into an RGBA buffer on the CPU.

mod batch;
mod gl;
mod overlay;
mod software;

pub use batch::*;
pub use gl::*;
pub use overlay::*;
pub use software::*;

use std::fmt;

use log::debug;

use crate::rasterizer::{Palette, PalettedBuffer, RgbaBuffer};
use crate::video::{AtlasError, Graphic, PatchError};

/// Number of colours in the automap palette
pub const MAP_PALETTE_LEN: usize = 11;

/// Which fullscreen source `render` draws first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderSource {
    #[default]
    None,
    World,
    Page,
    Map,
}

/// A rectangle in screen fractions, origin top left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl NormRect {
    pub const FULL: NormRect = NormRect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Pixel rectangle `(x, y, w, h)` for a viewport size
    pub fn to_pixels(&self, width: i32, height: i32) -> (f32, f32, f32, f32) {
        let (w, h) = (width as f32, height as f32);
        (self.x * w, self.y * h, self.w * w, self.h * h)
    }

    /// Map a point given in fractions of this rectangle to viewport pixels
    pub fn point_to_pixels(&self, u: f32, v: f32, width: i32, height: i32) -> (f32, f32) {
        let (x, y, w, h) = self.to_pixels(width, height);
        (x + u * w, y + v * h)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    Atlas(AtlasError),
    /// Shader or texture creation failed on the GPU side
    Gpu(String),
    Patch(PatchError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Atlas(e) => write!(f, "atlas error: {}", e),
            RenderError::Gpu(msg) => write!(f, "GPU error: {}", msg),
            RenderError::Patch(e) => write!(f, "patch error: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<AtlasError> for RenderError {
    fn from(e: AtlasError) -> Self {
        RenderError::Atlas(e)
    }
}

impl From<PatchError> for RenderError {
    fn from(e: PatchError) -> Self {
        RenderError::Patch(e)
    }
}

/// Display backend interface
pub trait Renderer {
    /// Compose and present the frame, then reset the per-frame batches
    fn render(&mut self) -> Result<(), RenderError>;

    /// Viewport width in pixels
    fn width(&self) -> i32;

    /// Viewport height in pixels
    fn height(&self) -> i32;

    /// Change the viewport. Atlas contents are kept.
    fn set_resolution(&mut self, width: i32, height: i32);

    /// Place the world view inside the viewport, in screen fractions
    fn set_world_size(&mut self, rect: NormRect);

    /// Show a paletted world frame
    fn set_world_pixels(&mut self, pixels: &PalettedBuffer);

    fn set_world_palette(&mut self, palette: &Palette);

    /// Show a truecolor fullscreen page
    fn set_page_pixels(&mut self, pixels: &RgbaBuffer);

    /// Show a graphic as the fullscreen page
    fn set_page_graphic(&mut self, graphic: &Graphic) {
        self.set_page_pixels(&graphic.pixels);
    }

    /// Place a graphic in the overlay atlas. Adding twice is a no-op.
    fn add_graphic(&mut self, graphic: &Graphic) -> Result<(), RenderError>;

    fn check_graphic(&self, graphic: &Graphic) -> bool;

    /// Queue a graphic at viewport pixel (x, y), adding it to the atlas if
    /// needed
    fn draw_graphic(
        &mut self,
        graphic: &Graphic,
        x: i32,
        y: i32,
        scalex: f32,
        scaley: f32,
    ) -> Result<(), RenderError>;

    /// Show the automap inside `rect`
    fn set_map_geometry(&mut self, rect: NormRect);

    /// Automap colours; entry 0 is the background
    fn set_map_palette(&mut self, palette: &[[u8; 3]]);

    /// Queue an automap line. Coordinates are fractions of the map
    /// rectangle, y down.
    fn draw_map_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: u8);
}

/// State shared by every backend: the latest inputs and this frame's
/// batches. Backends only decide how to put it on screen.
#[derive(Debug)]
pub struct FrameState {
    pub width: i32,
    pub height: i32,
    pub world: PalettedBuffer,
    pub world_palette: Palette,
    pub world_rect: NormRect,
    pub world_dirty: bool,
    pub palette_dirty: bool,
    pub page: Option<RgbaBuffer>,
    pub page_dirty: bool,
    pub map_rect: NormRect,
    pub map_palette: [[u8; 3]; MAP_PALETTE_LEN],
    pub source: RenderSource,
    pub overlay: OverlayAtlas,
    pub arena: FrameArena,
}

impl FrameState {
    pub fn new(width: i32, height: i32, world_w: usize, world_h: usize, atlas_size: i32) -> Self {
        Self {
            width,
            height,
            world: PalettedBuffer::new(world_w, world_h),
            world_palette: Palette::grayscale(),
            world_rect: NormRect::FULL,
            world_dirty: true,
            palette_dirty: true,
            page: None,
            page_dirty: false,
            map_rect: NormRect::FULL,
            map_palette: [[0; 3]; MAP_PALETTE_LEN],
            source: RenderSource::None,
            overlay: OverlayAtlas::new(atlas_size, atlas_size),
            arena: FrameArena::new(),
        }
    }

    pub fn set_resolution(&mut self, width: i32, height: i32) {
        if (width, height) != (self.width, self.height) {
            debug!("viewport {}x{} -> {}x{}", self.width, self.height, width, height);
        }
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn set_world_size(&mut self, rect: NormRect) {
        self.world_rect = rect;
    }

    pub fn set_world_pixels(&mut self, pixels: &PalettedBuffer) {
        if pixels.width() != self.world.width() || pixels.height() != self.world.height() {
            debug!(
                "world buffer {}x{} -> {}x{}",
                self.world.width(),
                self.world.height(),
                pixels.width(),
                pixels.height()
            );
            self.world.resize(pixels.width(), pixels.height());
        }
        self.world.pixels_mut().copy_from_slice(pixels.pixels());
        self.world_dirty = true;
        self.source = RenderSource::World;
    }

    pub fn set_world_palette(&mut self, palette: &Palette) {
        self.world_palette = palette.clone();
        self.palette_dirty = true;
    }

    pub fn set_page_pixels(&mut self, pixels: &RgbaBuffer) {
        self.page = Some(pixels.clone());
        self.page_dirty = true;
        self.source = RenderSource::Page;
    }

    pub fn set_map_geometry(&mut self, rect: NormRect) {
        self.map_rect = rect;
        self.source = RenderSource::Map;
    }

    pub fn set_map_palette(&mut self, palette: &[[u8; 3]]) {
        for (dst, src) in self.map_palette.iter_mut().zip(palette) {
            *dst = *src;
        }
    }

    pub fn map_color(&self, index: u8) -> [u8; 3] {
        self.map_palette[(index as usize).min(MAP_PALETTE_LEN - 1)]
    }

    pub fn draw_graphic(
        &mut self,
        graphic: &Graphic,
        x: i32,
        y: i32,
        scalex: f32,
        scaley: f32,
    ) -> Result<(), RenderError> {
        let entry = self.overlay.add(graphic)?;
        let (w, h) = (self.width as f32, self.height as f32);

        let px = x as f32 + graphic.xoff as f32 * scalex;
        let py = y as f32 + graphic.yoff as f32 * scaley;
        let pw = entry.w as f32 * scalex;
        let ph = entry.h as f32 * scaley;

        let (x0, y0) = pixel_to_ndc(px, py, w, h);
        let (x1, y1) = pixel_to_ndc(px + pw, py + ph, w, h);
        let uv = entry.uv(self.overlay.width(), self.overlay.height());
        self.arena.push_quad([x0, y0, x1, y1], uv);
        Ok(())
    }

    pub fn draw_map_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: u8) {
        self.arena.map_lines.push(MapLineCmd { x1, y1, x2, y2, color });
    }

    /// Map line endpoints in viewport pixels
    pub fn map_line_pixels(&self, line: &MapLineCmd) -> (f32, f32, f32, f32) {
        let (x1, y1) = self.map_rect.point_to_pixels(line.x1, line.y1, self.width, self.height);
        let (x2, y2) = self.map_rect.point_to_pixels(line.x2, line.y2, self.width, self.height);
        (x1, y1, x2, y2)
    }

    /// Called at the end of `render`
    pub fn end_frame(&mut self) {
        self.arena.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_setter_selects_source() {
        let mut st = FrameState::new(320, 200, 320, 200, 256);
        assert_eq!(st.source, RenderSource::None);
        st.set_page_pixels(&RgbaBuffer::new(4, 4));
        assert_eq!(st.source, RenderSource::Page);
        st.set_world_pixels(&PalettedBuffer::new(320, 200));
        assert_eq!(st.source, RenderSource::World);
        st.set_map_geometry(NormRect::new(0.0, 0.0, 1.0, 0.84));
        assert_eq!(st.source, RenderSource::Map);
        // Palette and resolution changes do not switch sources
        st.set_world_palette(&Palette::grayscale());
        st.set_resolution(640, 400);
        assert_eq!(st.source, RenderSource::Map);
    }

    #[test]
    fn test_world_pixels_resize_buffer() {
        let mut st = FrameState::new(320, 200, 320, 200, 256);
        let mut frame = PalettedBuffer::new(160, 100);
        frame.fill(3);
        st.set_world_pixels(&frame);
        assert_eq!((st.world.width(), st.world.height()), (160, 100));
        assert!(st.world.pixels().iter().all(|&p| p == 3));
    }

    #[test]
    fn test_map_palette_partial_update() {
        let mut st = FrameState::new(320, 200, 320, 200, 256);
        st.set_map_palette(&[[1, 2, 3], [4, 5, 6]]);
        assert_eq!(st.map_color(1), [4, 5, 6]);
        assert_eq!(st.map_color(2), [0, 0, 0]);
        // Out of range indices use the last entry
        assert_eq!(st.map_color(200), st.map_palette[MAP_PALETTE_LEN - 1]);
    }

    #[test]
    fn test_map_line_in_rect() {
        let mut st = FrameState::new(200, 100, 320, 200, 256);
        st.set_map_geometry(NormRect::new(0.0, 0.0, 1.0, 0.5));
        let line = MapLineCmd { x1: 0.5, y1: 0.5, x2: 1.0, y2: 1.0, color: 0 };
        assert_eq!(st.map_line_pixels(&line), (100.0, 25.0, 200.0, 50.0));
    }
}
