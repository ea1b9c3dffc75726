//! OpenGL backend
//!
//! Draws through macroquad. The paletted world frame is uploaded with the
//! index in the red channel and resolved on the GPU by a palette lookup
//! material. World textures are double buffered so an upload never touches
//! the texture the previous frame drew from.

use log::{debug, info};
use macroquad::prelude::*;

use super::{FrameState, NormRect, RenderError, RenderSource, Renderer, ndc_to_pixel};
use crate::rasterizer::{Palette, PalettedBuffer, RgbaBuffer};
use crate::video::Graphic;

const PALETTE_VERTEX: &str = include_str!("shaders/palette.vert");
const PALETTE_FRAGMENT: &str = include_str!("shaders/palette.frag");

/// Expand palette indices to RGBA with the index in red
pub fn indices_to_rgba(src: &[u8], dst: &mut Vec<u8>) {
    dst.clear();
    dst.reserve(src.len() * 4);
    for &index in src {
        dst.extend_from_slice(&[index, 0, 0, 0xFF]);
    }
}

fn nearest_texture(width: usize, height: usize, bytes: &[u8]) -> Texture2D {
    let texture = Texture2D::from_rgba8(width as u16, height as u16, bytes);
    texture.set_filter(FilterMode::Nearest);
    texture
}

/// Upload into `slot`, recreating the texture when the size changed
fn upload(slot: &mut Option<Texture2D>, width: usize, height: usize, bytes: &[u8]) {
    match slot {
        Some(tex) if tex.width() as usize == width && tex.height() as usize == height => {
            tex.update_from_bytes(width as u32, height as u32, bytes);
        }
        _ => {
            debug!("gl: creating {}x{} texture", width, height);
            *slot = Some(nearest_texture(width, height, bytes));
        }
    }
}

fn rgb_color([r, g, b]: [u8; 3]) -> Color {
    Color::from_rgba(r, g, b, 255)
}

pub struct GlRenderer {
    state: FrameState,
    material: Material,
    world_textures: [Option<Texture2D>; 2],
    front: usize,
    palette_texture: Texture2D,
    page_texture: Option<Texture2D>,
    atlas_texture: Texture2D,
    scratch: Vec<u8>,
    mesh_vertices: Vec<Vertex>,
    mesh_indices: Vec<u16>,
}

impl GlRenderer {
    /// Needs a live macroquad context. Shader failures are returned as
    /// `RenderError::Gpu` and should be treated as fatal.
    pub fn new(
        width: i32,
        height: i32,
        world_w: usize,
        world_h: usize,
        atlas_size: i32,
    ) -> Result<Self, RenderError> {
        let material = load_material(
            ShaderSource::Glsl {
                vertex: PALETTE_VERTEX,
                fragment: PALETTE_FRAGMENT,
            },
            MaterialParams {
                textures: vec!["Palette".to_string()],
                ..Default::default()
            },
        )
        .map_err(|e| RenderError::Gpu(format!("palette material: {:?}", e)))?;

        let state = FrameState::new(width, height, world_w, world_h, atlas_size);
        let palette_texture = nearest_texture(256, 1, &state.world_palette.to_rgba_lut());
        let page = state.overlay.page();
        let atlas_texture = nearest_texture(page.width(), page.height(), page.pixels());

        info!(
            "gl renderer {}x{}, world {}x{}, atlas {}",
            width, height, world_w, world_h, atlas_size
        );

        Ok(Self {
            state,
            material,
            world_textures: [None, None],
            front: 0,
            palette_texture,
            page_texture: None,
            atlas_texture,
            scratch: Vec::new(),
            mesh_vertices: Vec::new(),
            mesh_indices: Vec::new(),
        })
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    fn upload_dirty(&mut self) {
        if self.state.world_dirty {
            let back = 1 - self.front;
            let (w, h) = (self.state.world.width(), self.state.world.height());
            indices_to_rgba(self.state.world.pixels(), &mut self.scratch);
            upload(&mut self.world_textures[back], w, h, &self.scratch);
            self.front = back;
            self.state.world_dirty = false;
        }

        if self.state.palette_dirty {
            let lut = self.state.world_palette.to_rgba_lut();
            self.palette_texture.update_from_bytes(256, 1, &lut);
            self.state.palette_dirty = false;
        }

        if self.state.page_dirty {
            if let Some(page) = self.state.page.as_ref() {
                upload(&mut self.page_texture, page.width(), page.height(), page.pixels());
            }
            self.state.page_dirty = false;
        }

        if self.state.overlay.take_dirty() {
            let page = self.state.overlay.page();
            self.atlas_texture
                .update_from_bytes(page.width() as u32, page.height() as u32, page.pixels());
        }
    }

    fn draw_stretched(texture: &Texture2D, x: f32, y: f32, w: f32, h: f32) {
        draw_texture_ex(
            texture,
            x,
            y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            },
        );
    }

    fn draw_overlay(&mut self, sx: f32, sy: f32) {
        let (w, h) = (self.state.width as f32, self.state.height as f32);

        for (vertices, indices) in self.state.arena.mesh_chunks() {
            self.mesh_vertices.clear();
            self.mesh_indices.clear();
            self.mesh_vertices.extend(vertices.iter().map(|v| {
                let (x, y) = ndc_to_pixel(v.pos[0], v.pos[1], w, h);
                Vertex::new(x * sx, y * sy, 0.0, v.uv[0], v.uv[1], WHITE)
            }));
            self.mesh_indices.extend_from_slice(indices);

            // Lend the scratch vectors to the mesh, then take them back
            let mesh = Mesh {
                vertices: std::mem::take(&mut self.mesh_vertices),
                indices: std::mem::take(&mut self.mesh_indices),
                texture: Some(self.atlas_texture.clone()),
            };
            draw_mesh(&mesh);
            self.mesh_vertices = mesh.vertices;
            self.mesh_indices = mesh.indices;
        }
    }
}

impl Renderer for GlRenderer {
    fn render(&mut self) -> Result<(), RenderError> {
        self.upload_dirty();

        let (sw, sh) = (screen_width(), screen_height());
        let sx = sw / self.state.width as f32;
        let sy = sh / self.state.height as f32;

        clear_background(BLACK);

        match self.state.source {
            RenderSource::None => {}
            RenderSource::World => {
                if let Some(world) = self.world_textures[self.front].as_ref() {
                    self.material.set_texture("Palette", self.palette_texture.clone());
                    let (x, y, w, h) =
                        self.state.world_rect.to_pixels(self.state.width, self.state.height);
                    gl_use_material(&self.material);
                    Self::draw_stretched(world, x * sx, y * sy, w * sx, h * sy);
                    gl_use_default_material();
                }
            }
            RenderSource::Page => {
                if let Some(page) = self.page_texture.as_ref() {
                    Self::draw_stretched(page, 0.0, 0.0, sw, sh);
                }
            }
            RenderSource::Map => {
                let (x, y, w, h) = self.state.map_rect.to_pixels(self.state.width, self.state.height);
                draw_rectangle(x * sx, y * sy, w * sx, h * sy, rgb_color(self.state.map_color(0)));
            }
        }

        for line in &self.state.arena.map_lines {
            let (x1, y1, x2, y2) = self.state.map_line_pixels(line);
            let color = rgb_color(self.state.map_color(line.color));
            draw_line(x1 * sx, y1 * sy, x2 * sx, y2 * sy, sx.max(1.0), color);
        }

        self.draw_overlay(sx, sy);

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
