//! CPU compositor
//!
//! Implements `Renderer` by compositing into an RGBA buffer. Used for
//! screenshots, headless runs and tests.

use std::path::Path;

use log::info;

use super::{FrameState, NormRect, RenderError, RenderSource, Renderer, ndc_to_pixel};
use crate::rasterizer::{Palette, PalettedBuffer, RgbaBuffer};
use crate::video::Graphic;

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

#[derive(Debug)]
pub struct SoftwareRenderer {
    state: FrameState,
    output: RgbaBuffer,
}

impl SoftwareRenderer {
    pub fn new(width: i32, height: i32, world_w: usize, world_h: usize, atlas_size: i32) -> Self {
        info!("software renderer {}x{}, world {}x{}", width, height, world_w, world_h);
        let state = FrameState::new(width, height, world_w, world_h, atlas_size);
        let output = RgbaBuffer::new(state.width as usize, state.height as usize);
        Self { state, output }
    }

    /// The last composited frame
    pub fn frame(&self) -> &RgbaBuffer {
        &self.output
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn save_screenshot<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.output.save_png(path)
    }

    fn draw_world(&mut self) {
        let world = &self.state.world;
        let palette = &self.state.world_palette;
        let (ww, wh) = (world.width(), world.height());
        let (rx, ry, rw, rh) = self.state.world_rect.to_pixels(self.state.width, self.state.height);
        let (x0, y0) = (rx.round() as i32, ry.round() as i32);
        let (w, h) = ((rx + rw).round() as i32 - x0, (ry + rh).round() as i32 - y0);
        if ww == 0 || wh == 0 || w <= 0 || h <= 0 {
            return;
        }
        let (w, h) = (w as usize, h as usize);
        for y in 0..h {
            let sy = y * wh / h;
            for x in 0..w {
                let sx = x * ww / w;
                let [r, g, b] = palette.rgb(world.get(sx, sy));
                self.output
                    .set_pixel(x0 + x as i32, y0 + y as i32, [r, g, b, 0xFF]);
            }
        }
    }

    fn draw_page(&mut self) {
        let Some(page) = self.state.page.as_ref() else {
            return;
        };
        let (pw, ph) = (page.width(), page.height());
        let (w, h) = (self.output.width(), self.output.height());
        if pw == 0 || ph == 0 {
            return;
        }
        for y in 0..h {
            let sy = y * ph / h;
            for x in 0..w {
                let sx = x * pw / w;
                self.output.set_pixel(x as i32, y as i32, page.get(sx, sy));
            }
        }
    }

    fn draw_map_background(&mut self) {
        let [r, g, b] = self.state.map_color(0);
        let (x, y, w, h) = self.state.map_rect.to_pixels(self.state.width, self.state.height);
        let (x0, y0) = (x.round() as i32, y.round() as i32);
        let (x1, y1) = ((x + w).round() as i32, (y + h).round() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.output.set_pixel(px, py, [r, g, b, 0xFF]);
            }
        }
    }

    fn draw_map_lines(&mut self) {
        for line in &self.state.arena.map_lines {
            let (x1, y1, x2, y2) = self.state.map_line_pixels(line);
            let [r, g, b] = self.state.map_color(line.color);
            self.output.draw_line(
                x1.round() as i32,
                y1.round() as i32,
                x2.round() as i32,
                y2.round() as i32,
                [r, g, b, 0xFF],
            );
        }
    }

    fn draw_overlay(&mut self) {
        let page = self.state.overlay.page();
        let (aw, ah) = (page.width() as f32, page.height() as f32);
        let (w, h) = (self.state.width as f32, self.state.height as f32);

        for quad in self.state.arena.quads() {
            let (px0, py0) = ndc_to_pixel(quad.ndc[0], quad.ndc[1], w, h);
            let (px1, py1) = ndc_to_pixel(quad.ndc[2], quad.ndc[3], w, h);
            if px1 <= px0 || py1 <= py0 {
                continue;
            }
            let tx0 = (quad.uv[0] * aw).round() as i32;
            let ty0 = (quad.uv[1] * ah).round() as i32;
            let tx1 = (quad.uv[2] * aw).round() as i32;
            let ty1 = (quad.uv[3] * ah).round() as i32;
            if tx1 <= tx0 || ty1 <= ty0 {
                continue;
            }

            for y in py0.round() as i32..py1.round() as i32 {
                let fy = (y as f32 + 0.5 - py0) / (py1 - py0);
                let ty = (ty0 + (fy * (ty1 - ty0) as f32).floor() as i32).clamp(ty0, ty1 - 1);
                for x in px0.round() as i32..px1.round() as i32 {
                    let fx = (x as f32 + 0.5 - px0) / (px1 - px0);
                    let tx = (tx0 + (fx * (tx1 - tx0) as f32).floor() as i32).clamp(tx0, tx1 - 1);
                    let texel = page.get(tx as usize, ty as usize);
                    if texel[3] != 0 {
                        self.output.set_pixel(x, y, texel);
                    }
                }
            }
        }
    }
}

impl Renderer for SoftwareRenderer {
    fn render(&mut self) -> Result<(), RenderError> {
        self.output.clear(CLEAR_COLOR);

        match self.state.source {
            RenderSource::None => {}
            RenderSource::World => self.draw_world(),
            RenderSource::Page => self.draw_page(),
            RenderSource::Map => self.draw_map_background(),
        }
        self.draw_map_lines();
        self.draw_overlay();

        self.state.world_dirty = false;
        self.state.palette_dirty = false;
        self.state.page_dirty = false;
        self.state.overlay.take_dirty();
        self.state.end_frame();
        Ok(())
    }

    fn width(&self) -> i32 {
        self.state.width
    }

    fn height(&self) -> i32 {
        self.state.height
    }

    fn set_resolution(&mut self, width: i32, height: i32) {
        self.state.set_resolution(width, height);
        self.output = RgbaBuffer::new(self.state.width as usize, self.state.height as usize);
    }

    fn set_world_size(&mut self, rect: NormRect) {
        self.state.set_world_size(rect);
    }

    fn set_world_pixels(&mut self, pixels: &PalettedBuffer) {
        self.state.set_world_pixels(pixels);
    }

    fn set_world_palette(&mut self, palette: &Palette) {
        self.state.set_world_palette(palette);
    }

    fn set_page_pixels(&mut self, pixels: &RgbaBuffer) {
        self.state.set_page_pixels(pixels);
    }

    fn add_graphic(&mut self, graphic: &Graphic) -> Result<(), RenderError> {
        self.state.overlay.add(graphic)?;
        Ok(())
    }

    fn check_graphic(&self, graphic: &Graphic) -> bool {
        self.state.overlay.check(graphic)
    }

    fn draw_graphic(
        &mut self,
        graphic: &Graphic,
        x: i32,
        y: i32,
        scalex: f32,
        scaley: f32,
    ) -> Result<(), RenderError> {
        self.state.draw_graphic(graphic, x, y, scalex, scaley)
    }

    fn set_map_geometry(&mut self, rect: NormRect) {
        self.state.set_map_geometry(rect);
    }

    fn set_map_palette(&mut self, palette: &[[u8; 3]]) {
        self.state.set_map_palette(palette);
    }

    fn draw_map_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: u8) {
        self.state.draw_map_line(x1, y1, x2, y2, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::GraphicId;

    fn solid_graphic(id: u32, w: usize, h: usize, color: [u8; 4]) -> Graphic {
        let mut pixels = RgbaBuffer::new(w, h);
        pixels.clear(color);
        Graphic {
            id: GraphicId(id),
            pixels,
            width: w as i32,
            height: h as i32,
            xoff: 0,
            yoff: 0,
        }
    }

    #[test]
    fn test_world_scaled_through_palette() {
        let mut r = SoftwareRenderer::new(4, 4, 2, 2, 64);
        let mut world = PalettedBuffer::new(2, 2);
        world.set(1, 0, 100);
        world.set(0, 1, 200);
        r.set_world_palette(&Palette::grayscale());
        r.set_world_pixels(&world);
        r.render().unwrap();

        let f = r.frame();
        assert_eq!(f.get(0, 0), [0, 0, 0, 255]);
        assert_eq!(f.get(3, 1), [100, 100, 100, 255]);
        assert_eq!(f.get(1, 3), [200, 200, 200, 255]);
    }

    #[test]
    fn test_world_inside_rect() {
        let mut r = SoftwareRenderer::new(8, 8, 2, 2, 64);
        let mut world = PalettedBuffer::new(2, 2);
        world.fill(50);
        r.set_world_size(NormRect::new(0.5, 0.0, 0.5, 0.5));
        r.set_world_pixels(&world);
        r.render().unwrap();

        let f = r.frame();
        assert_eq!(f.get(4, 0), [50, 50, 50, 255]);
        assert_eq!(f.get(7, 3), [50, 50, 50, 255]);
        assert_eq!(f.get(3, 0), [0, 0, 0, 255]);
        assert_eq!(f.get(4, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn test_page_replaces_world() {
        let mut r = SoftwareRenderer::new(4, 4, 2, 2, 64);
        let mut world = PalettedBuffer::new(2, 2);
        world.fill(255);
        r.set_world_pixels(&world);
        let mut page = RgbaBuffer::new(1, 1);
        page.clear([9, 8, 7, 255]);
        r.set_page_pixels(&page);
        r.render().unwrap();
        assert!(r.frame().pixels().chunks_exact(4).all(|p| p == [9, 8, 7, 255]));
    }

    #[test]
    fn test_map_background_and_lines() {
        let mut r = SoftwareRenderer::new(10, 10, 2, 2, 64);
        r.set_map_palette(&[[10, 20, 30], [255, 255, 255]]);
        r.set_map_geometry(NormRect::new(0.0, 0.0, 1.0, 0.5));
        r.draw_map_line(0.0, 0.2, 0.9, 0.2, 1);
        r.render().unwrap();

        let f = r.frame();
        assert_eq!(f.get(0, 0), [10, 20, 30, 255]);
        assert_eq!(f.get(9, 4), [10, 20, 30, 255]);
        // Below the map rectangle stays cleared
        assert_eq!(f.get(0, 5), [0, 0, 0, 255]);
        // Line at 20% of a 5 pixel tall map is row 1
        assert_eq!(f.get(4, 1), [255, 255, 255, 255]);
        assert_eq!(f.get(9, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn test_overlay_drawn_and_alpha_tested() {
        let mut r = SoftwareRenderer::new(8, 8, 2, 2, 32);
        let mut g = solid_graphic(0, 2, 2, [255, 0, 0, 255]);
        // One transparent texel
        g.pixels.set_pixel(1, 1, [0, 0, 0, 0]);
        r.draw_graphic(&g, 2, 2, 1.0, 1.0).unwrap();
        r.render().unwrap();

        let f = r.frame();
        assert_eq!(f.get(2, 2), [255, 0, 0, 255]);
        assert_eq!(f.get(3, 2), [255, 0, 0, 255]);
        assert_eq!(f.get(3, 3), [0, 0, 0, 255]);
        assert_eq!(f.get(4, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn test_overlay_offsets_and_scale() {
        let mut r = SoftwareRenderer::new(8, 8, 2, 2, 32);
        let mut g = solid_graphic(0, 1, 1, [0, 255, 0, 255]);
        g.xoff = -1;
        g.yoff = -1;
        r.draw_graphic(&g, 4, 4, 2.0, 2.0).unwrap();
        r.render().unwrap();

        let f = r.frame();
        // Offset scales with the graphic: origin moves to (2, 2), size 2x2
        assert_eq!(f.get(2, 2), [0, 255, 0, 255]);
        assert_eq!(f.get(3, 3), [0, 255, 0, 255]);
        assert_eq!(f.get(4, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn test_draw_graphic_batches_one_quad() {
        let mut r = SoftwareRenderer::new(8, 8, 2, 2, 32);
        let g = solid_graphic(0, 2, 2, [1, 1, 1, 255]);
        assert!(!r.check_graphic(&g));
        r.draw_graphic(&g, 0, 0, 1.0, 1.0).unwrap();
        assert!(r.check_graphic(&g));
        assert_eq!(r.state().arena.vertices.len(), 4);
        assert_eq!(r.state().arena.indices.len(), 6);

        r.render().unwrap();
        assert!(r.state().arena.is_empty());
    }

    #[test]
    fn test_resolution_change_keeps_atlas() {
        let mut r = SoftwareRenderer::new(8, 8, 2, 2, 32);
        let g = solid_graphic(5, 4, 4, [1, 2, 3, 255]);
        r.add_graphic(&g).unwrap();
        r.add_graphic(&g).unwrap();
        assert_eq!(r.state().overlay.atlas().len(), 1);

        r.set_resolution(16, 12);
        assert!(r.check_graphic(&g));
        assert_eq!((r.width(), r.height()), (16, 12));
        r.render().unwrap();
        assert_eq!((r.frame().width(), r.frame().height()), (16, 12));
    }

    #[test]
    fn test_atlas_full_is_reported() {
        let mut r = SoftwareRenderer::new(8, 8, 2, 2, 8);
        let big = solid_graphic(0, 9, 1, [0; 4]);
        assert!(matches!(r.draw_graphic(&big, 0, 0, 1.0, 1.0), Err(RenderError::Atlas(_))));
    }
}
