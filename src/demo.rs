//! Demo scene
//!
//! A synthetic level that exercises every part of the renderer: walls with
//! a 100 texel tall texture, textured floor and ceiling spans, translated
//! and fuzz columns, an automap of a small map, a title page and console
//! text drawn from the atlas.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fs;

use log::{error, info, warn};
use macroquad::prelude::*;

use theta_render::automap::{
    AutomapEvent, AutomapKeys, AutomapScene, AutomapView, MapColor, MapLine, MapPoint, MapThing,
    poll_events,
};
use theta_render::config::EngineConfig;
use theta_render::rasterizer::{
    Angle, ColorTable, ColumnJob, Colormaps, FLAT_SIZE, FRACUNIT, FuzzState, NUM_LIGHT_LEVELS,
    Palette, PalettedBuffer, SpanJob, TranslationTables, ViewWindow, draw_column,
    draw_fuzz_column, draw_span, draw_translated_column, float_to_fixed_saturating, int_to_fixed,
};
use theta_render::renderer::{NormRect, RenderError, Renderer, SoftwareRenderer};
use theta_render::video::{DrawList, GraphicId, GraphicsManager, LineCache, encode_patch};

const WALL_WIDTH: usize = 64;
/// Deliberately not a power of two
const WALL_HEIGHT: usize = 100;
const SPRITE_HEIGHT: usize = 64;

const GLYPH_W: usize = 6;
const GLYPH_H: usize = 8;
const CONSOLE_ROWS: usize = 6;

/// Level size in map units
const LEVEL_SIZE: i32 = 1024;

/// 16 ramps of 16 shades, brightest first
fn demo_palette() -> Palette {
    const BASES: [[u32; 3]; 16] = [
        [255, 255, 255],
        [255, 200, 150],
        [255, 40, 40],
        [255, 150, 150],
        [190, 120, 60],
        [230, 210, 170],
        [200, 200, 200],
        [60, 255, 60],
        [130, 90, 50],
        [160, 160, 60],
        [255, 255, 100],
        [70, 70, 255],
        [255, 150, 40],
        [200, 60, 200],
        [60, 220, 220],
        [40, 120, 120],
    ];
    let mut bytes = Vec::with_capacity(768);
    for i in 0..256usize {
        let base = BASES[i >> 4];
        let shade = 16 - (i & 15) as u32;
        for c in base {
            bytes.push((c * shade / 16) as u8);
        }
    }
    // 768 bytes by construction
    Palette::from_bytes(&bytes).unwrap_or_else(|_| Palette::grayscale())
}

/// Column-major brick texture
fn wall_texture() -> Vec<u8> {
    let mut texels = vec![0u8; WALL_WIDTH * WALL_HEIGHT];
    for x in 0..WALL_WIDTH {
        for y in 0..WALL_HEIGHT {
            let row = y / 10;
            let shift = if row % 2 == 0 { 0 } else { 16 };
            let mortar = y % 10 == 9 || (x + shift) % 32 == 31;
            texels[x * WALL_HEIGHT + y] = if mortar { 0x06 } else { 0x42 + ((x ^ y) & 3) as u8 };
        }
    }
    texels
}

/// Row-major checkerboard flat
fn flat_texture() -> Vec<u8> {
    let mut texels = vec![0u8; FLAT_SIZE * FLAT_SIZE];
    for y in 0..FLAT_SIZE {
        for x in 0..FLAT_SIZE {
            let check = ((x / 8) + (y / 8)) % 2 == 0;
            texels[y * FLAT_SIZE + x] = if check { 0x52 } else { 0x88 };
        }
    }
    texels
}

/// Column-major sprite using the green ramp so translations show
fn sprite_texture() -> Vec<u8> {
    (0..WALL_WIDTH * SPRITE_HEIGHT)
        .map(|i| 0x70 + ((i % SPRITE_HEIGHT) / 4) as u8)
        .collect()
}

fn glyph_image(c: char) -> PalettedBuffer {
    let mut image = PalettedBuffer::new(GLYPH_W, GLYPH_H);
    if c == ' ' {
        return image;
    }
    // Not a real font: a box with a pattern from the character code
    let code = c as u32;
    for y in 1..GLYPH_H - 1 {
        for x in 0..GLYPH_W - 1 {
            let edge = x == 0 || x == GLYPH_W - 2 || y == 1 || y == GLYPH_H - 2;
            let bit = (code >> ((x + y) % 7)) & 1 == 1;
            if edge || bit {
                image.set(x, y, 0x01);
            }
        }
    }
    image
}

/// Darker with distance
fn light(colormaps: &Colormaps, distance: f64) -> &ColorTable {
    let level = (distance / 24.0) as usize;
    colormaps.get(level.min(NUM_LIGHT_LEVELS - 1))
}

struct DemoLevel {
    vertices: Vec<MapPoint>,
    scene: AutomapScene,
}

fn demo_level() -> DemoLevel {
    let u = |v: i32| v * FRACUNIT;
    let s = LEVEL_SIZE;
    let vertices: Vec<MapPoint> = [
        (0, 0),
        (s, 0),
        (s, s),
        (0, s),
        (384, 384),
        (640, 384),
        (640, 640),
        (384, 640),
    ]
    .iter()
    .map(|&(x, y)| MapPoint::new(u(x), u(y)))
    .collect();

    let wall = |a: usize, b: usize, color: MapColor| {
        (
            MapLine {
                a: vertices[a],
                b: vertices[b],
            },
            color,
        )
    };
    let walls = vec![
        wall(0, 1, MapColor::Walls),
        wall(1, 2, MapColor::Walls),
        wall(2, 3, MapColor::Walls),
        wall(3, 0, MapColor::Walls),
        wall(4, 5, MapColor::FdWalls),
        wall(5, 6, MapColor::CdWalls),
        wall(6, 7, MapColor::TsWalls),
        wall(7, 4, MapColor::Teles),
    ];

    let things = (0..6)
        .map(|i| MapThing {
            pos: MapPoint::new(u(128 + i * 150), u(900)),
            angle: Angle::from_degrees(i as f64 * 60.0),
        })
        .collect();

    DemoLevel {
        vertices,
        scene: AutomapScene {
            walls,
            players: Vec::new(),
            things,
            block_origin: MapPoint::default(),
        },
    }
}

pub struct Demo {
    config: EngineConfig,
    palette: Palette,
    colormaps: Colormaps,
    translations: TranslationTables,
    wall: Vec<u8>,
    flat: Vec<u8>,
    sprite: Vec<u8>,
    world: PalettedBuffer,
    view: ViewWindow,
    fuzz: FuzzState,

    graphics: GraphicsManager,
    glyphs: HashMap<char, GraphicId>,
    status_bar: GraphicId,
    title: GraphicId,
    console: LineCache,

    automap: AutomapView,
    keys: AutomapKeys,
    level: DemoLevel,
    player: MapThing,

    show_page: bool,
    time: f64,
    tic_accum: f64,
}

impl Demo {
    pub fn new(config: &EngineConfig) -> Result<Self, RenderError> {
        let palette = demo_palette();
        let colormaps = Colormaps::generate(&palette, NUM_LIGHT_LEVELS);

        let mut graphics = GraphicsManager::new();
        let mut glyphs = HashMap::new();
        for c in ' '..='~' {
            let bytes = encode_patch(&glyph_image(c), 0, 0, 0)?;
            glyphs.insert(c, graphics.add_patch(&bytes, &palette)?);
        }

        let mut bar = PalettedBuffer::new(config.world_width.min(i16::MAX as usize), 32);
        bar.fill(0x8A);
        for x in 0..bar.width() {
            bar.set(x, 0, 0x80);
        }
        let bar_bytes = encode_patch(&bar, 0xFF, 0, 0)?;
        let status_bar = graphics.add_patch(&bar_bytes, &palette)?;

        let mut page = PalettedBuffer::new(config.world_width, config.world_height);
        for y in 0..page.height() {
            for x in 0..page.width() {
                page.set(x, y, 0xB0 + ((x + y) / 24 % 16) as u8);
            }
        }
        let title = graphics.add_rgba(Some("TITLEPIC"), page.to_rgba(&palette), 0, 0);

        let mut console = LineCache::new(config.console_lines);
        console.append(&format!("theta-render v{}", theta_render::VERSION));
        console.append("tab: automap  p: title page  f12: screenshot  esc: quit");

        let level = demo_level();
        let mut automap = AutomapView::new(&config.automap);
        let aspect = config
            .automap
            .frame_aspect(config.window_width, config.window_height);
        automap.level_init(&level.vertices, aspect);

        let world = PalettedBuffer::new(config.world_width, config.world_height);
        let view = ViewWindow::full(config.world_width, config.world_height);

        info!("demo: {} graphics, {} map lines", graphics.len(), level.scene.walls.len());

        Ok(Self {
            config: config.clone(),
            palette,
            colormaps,
            translations: TranslationTables::new(),
            wall: wall_texture(),
            flat: flat_texture(),
            sprite: sprite_texture(),
            world,
            view,
            fuzz: FuzzState::new(),
            graphics,
            glyphs,
            status_bar,
            title,
            console,
            automap,
            keys: AutomapKeys::default(),
            level,
            player: MapThing::default(),
            show_page: false,
            time: 0.0,
            tic_accum: 0.0,
        })
    }

    /// Feed keyboard input. Returns false when the demo should quit.
    pub fn handle_input(&mut self) -> bool {
        for event in poll_events(&self.keys) {
            let was_active = self.automap.is_active();
            if self.automap.responder(event) && !was_active {
                self.console.append("automap on");
            } else if was_active && !self.automap.is_active() {
                self.console.append("automap off");
            } else if let AutomapEvent::KeyDown(cmd) = event {
                if self.automap.is_active() {
                    self.console.append(&format!("automap: {:?}", cmd));
                }
            }
        }

        if is_key_pressed(KeyCode::P) {
            self.show_page = !self.show_page;
        }
        !is_key_pressed(KeyCode::Escape)
    }

    pub fn on_resolution_change(&mut self, width: i32, height: i32) {
        let aspect = self.config.automap.frame_aspect(width, height);
        self.automap.on_resolution_change(aspect);
    }

    /// Advance the clock and run whole automap tics
    pub fn update(&mut self, dt: f64) {
        self.time += dt;

        // Circle the inner room
        let t = self.time * 0.3;
        let half = LEVEL_SIZE as f64 / 2.0;
        let pos = MapPoint::new(
            float_to_fixed_saturating(half + t.cos() * 300.0),
            float_to_fixed_saturating(half + t.sin() * 300.0),
        );
        self.player = MapThing {
            pos,
            angle: Angle::from_degrees((t / TAU * 360.0) + 90.0),
        };

        let tic = 1.0 / self.config.automap.tic_rate.max(1) as f64;
        self.tic_accum += dt;
        while self.tic_accum >= tic {
            self.automap.ticker(self.player.pos);
            self.tic_accum -= tic;
        }
    }

    /// Software render of the world view into the paletted buffer
    pub fn render_world(&mut self) {
        let (w, h) = (self.view.width as i32, self.view.height as i32);
        let centery = self.view.centery;
        self.world.fill(0);

        // Floor and ceiling
        let cam = (self.time * 24.0) % FLAT_SIZE as f64;
        for y in 0..h {
            let dy = (y - centery) as f64 + 0.5;
            let distance = 32.0 * centery as f64 / dy.abs();
            let step = distance / (w as f64 / 2.0);
            let job = SpanJob {
                y,
                x1: 0,
                x2: w - 1,
                xfrac: float_to_fixed_saturating(cam - step * w as f64 / 2.0),
                yfrac: float_to_fixed_saturating(distance + if dy < 0.0 { 0.0 } else { cam }),
                xstep: float_to_fixed_saturating(step),
                ystep: 0,
                source: &self.flat,
                colormap: light(&self.colormaps, distance * 4.0),
            };
            draw_span(&mut self.world, &self.view, &job);
        }

        // Walls
        for x in 0..w {
            let dist = 1.6 + (x as f64 * 0.015 + self.time).sin() * 0.6;
            let half = centery as f64 / dist;
            let yl = (centery - half as i32).max(0);
            let yh = (centery + half as i32).min(h - 1);
            let iscale = float_to_fixed_saturating(WALL_HEIGHT as f64 / (2.0 * half));
            let column = (x as usize + (self.time * 20.0) as usize) % WALL_WIDTH;
            let job = ColumnJob {
                x,
                yl,
                yh,
                iscale,
                texturemid: int_to_fixed(WALL_HEIGHT as i32 / 2 + (self.time * 8.0) as i32 % 1000),
                source: &self.wall[column * WALL_HEIGHT..(column + 1) * WALL_HEIGHT],
                texheight: WALL_HEIGHT as i32,
                colormap: light(&self.colormaps, dist * 40.0),
            };
            draw_column(&mut self.world, &self.view, &job);
        }

        // Three translated sprites and one fuzzy one
        let sprite_top = centery - SPRITE_HEIGHT as i32 / 2;
        for x in 0..(w / 4) {
            let band = x / (w / 16).max(1);
            let column = (x as usize) % WALL_WIDTH;
            let job = ColumnJob {
                x: x + w / 8,
                yl: sprite_top,
                yh: sprite_top + SPRITE_HEIGHT as i32 - 1,
                iscale: FRACUNIT,
                texturemid: (centery - sprite_top) * FRACUNIT,
                source: &self.sprite[column * SPRITE_HEIGHT..(column + 1) * SPRITE_HEIGHT],
                texheight: SPRITE_HEIGHT as i32,
                colormap: self.colormaps.get(0),
            };
            if band == 0 {
                draw_column(&mut self.world, &self.view, &job);
            } else {
                let table = self.translations.get(band as usize - 1);
                draw_translated_column(&mut self.world, &self.view, &job, table);
            }
        }
        for x in (w * 5 / 8)..(w * 3 / 4) {
            let job = ColumnJob {
                x,
                yl: 0,
                yh: h - 1,
                iscale: FRACUNIT,
                texturemid: 0,
                source: &self.sprite[..SPRITE_HEIGHT],
                texheight: SPRITE_HEIGHT as i32,
                colormap: self.colormaps.get(0),
            };
            draw_fuzz_column(&mut self.world, &self.view, &job, &self.colormaps, &mut self.fuzz);
        }
    }

    /// Queue this frame on `renderer`
    pub fn draw<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Result<(), RenderError> {
        let (rw, rh) = (renderer.width(), renderer.height());

        if self.show_page {
            if let Some(page) = self.graphics.get(self.title) {
                renderer.set_page_graphic(page);
            }
        } else if self.automap.is_active() {
            let mut scene = self.level.scene.clone();
            scene.players.push(self.player);
            self.automap.draw(renderer, &scene);
        } else {
            self.render_world();
            // Leave the bottom of the screen for the status bar
            renderer.set_world_size(NormRect::new(0.0, 0.0, 1.0, self.config.automap.map_height));
            renderer.set_world_palette(&self.palette);
            renderer.set_world_pixels(&self.world);
        }

        let scale = rw as f32 / self.config.world_width.max(1) as f32;
        if let Some(bar) = self.graphics.get(self.status_bar) {
            let y = rh - (bar.height as f32 * scale) as i32;
            renderer.draw_graphic(bar, 0, y, scale, scale)?;
        }

        let first = self.console.len().saturating_sub(CONSOLE_ROWS);
        let mut y = 4;
        for index in first..self.console.len() {
            let (graphics, glyphs) = (&self.graphics, &self.glyphs);
            let list = self.console.drawer(index, rw, |text, width| {
                DrawList::layout_text(text, width, graphics, |c| glyphs.get(&c).copied())
            });
            if let Some(list) = list {
                list.draw(renderer, graphics, 4, y)?;
                y += list.height.max(GLYPH_H as i32);
            }
        }
        Ok(())
    }

    /// Draw the current frame with the software renderer and save it as PNG
    pub fn screenshot(&mut self, width: i32, height: i32) {
        let mut software = SoftwareRenderer::new(
            width,
            height,
            self.config.world_width,
            self.config.world_height,
            self.config.atlas_size,
        );
        if let Err(e) = self.draw(&mut software).and_then(|_| software.render()) {
            error!("screenshot: {}", e);
            return;
        }

        let dir = &self.config.screenshot_dir;
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("screenshot: cannot create {}: {}", dir.display(), e);
            return;
        }
        let path = dir.join(format!("theta-{:.0}.png", self.time * 1000.0));
        match software.save_screenshot(&path) {
            Ok(()) => {
                info!("screenshot saved to {}", path.display());
                self.console.append(&format!("saved {}", path.display()));
            }
            Err(e) => warn!("screenshot: {}", e),
        }
    }
}
