//! Automap
//!
//! Top-down line map of the level. `AutomapView` owns the pan/zoom/follow
//! window and projects and clips map lines into it; `AutomapScene` is what
//! the game hands over each frame.

mod clip;
mod input;
mod shapes;
mod view;

pub use clip::*;
pub use input::*;
pub use shapes::*;
pub use view::*;

use crate::renderer::{MAP_PALETTE_LEN, Renderer};

/// Index into the automap palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MapColor {
    Background = 0,
    You,
    Walls,
    /// Teleporter lines
    Teles,
    /// Two-sided lines with no height change
    TsWalls,
    /// Floor height change
    FdWalls,
    /// Ceiling height change
    CdWalls,
    /// Secret lines seen with the map powerup
    PwWalls,
    Things,
    Grid,
    XHair,
}

pub const MAP_PALETTE: [[u8; 3]; MAP_PALETTE_LEN] = [
    [0, 0, 0],
    [255, 255, 255],
    [255, 0, 0],
    [155, 0, 0],
    [131, 131, 131],
    [179, 115, 71],
    [255, 255, 0],
    [111, 111, 111],
    [119, 255, 111],
    [131, 131, 131],
    [131, 131, 131],
];

/// One frame's worth of things to put on the map
#[derive(Debug, Clone, Default)]
pub struct AutomapScene {
    pub walls: Vec<(MapLine, MapColor)>,
    pub players: Vec<MapThing>,
    pub things: Vec<MapThing>,
    /// Grid lines are aligned to this point
    pub block_origin: MapPoint,
}

impl AutomapView {
    /// Queue the whole map on `renderer`. Does nothing while closed.
    pub fn draw<R: Renderer + ?Sized>(&self, renderer: &mut R, scene: &AutomapScene) {
        if !self.is_active() {
            return;
        }
        renderer.set_map_geometry(self.geometry());
        renderer.set_map_palette(&MAP_PALETTE);

        if self.grid_enabled() {
            self.draw_grid(renderer, scene.block_origin, MapColor::Grid);
        }
        for (line, color) in &scene.walls {
            self.draw_line(renderer, line, *color);
        }
        for player in &scene.players {
            self.draw_line_character(renderer, &PLAYER_ARROW, 0, player.angle, MapColor::You, player.pos);
        }
        for thing in &scene.things {
            self.draw_line_character(
                renderer,
                &THIN_TRIANGLE_GUY,
                THING_SCALE,
                thing.angle,
                MapColor::Things,
                thing.pos,
            );
        }
        self.draw_crosshair(renderer, MapColor::XHair);
        self.draw_marks(renderer, MapColor::You);
    }
}
