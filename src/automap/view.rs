//! Automap view window
//!
//! Tracks which part of the level is on screen. The window lives in map
//! units (`m_*`, 16.16 fixed); the frame is measured in screen heights, so
//! `f_h` is 1 and `f_w` is the viewport aspect ratio. `scale_mtof` converts
//! map units to frame units and is clamped between a zoom that shows the
//! whole level and one that shows a couple of player widths.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::clip::{
    FrameLine, FramePoint, MapLine, MapPoint, MapWindow, clip_frame_line, trivial_reject,
};
use super::input::{AutomapCommand, AutomapEvent};
use super::shapes::{MAP_BLOCK_UNITS, PLAYER_RADIUS};
use super::MapColor;
use crate::rasterizer::{
    Angle, Fixed, fixed_mul, fixed_to_float, float_to_fixed_saturating, rotate,
};
use crate::renderer::{NormRect, Renderer};

/// Number of remembered map marks
pub const NUM_MARKS: usize = 10;

/// Half-size of a mark cross, in map-rectangle fractions
const MARK_SIZE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomapConfig {
    /// Scale before the first level is loaded
    pub init_scale_mtof: f64,
    /// Pan speed in screen heights per second
    pub pan_speed: f64,
    /// Ticker calls per second
    pub tic_rate: u32,
    /// Per-tic scale multiplier while zoom in is held
    pub zoom_in: f64,
    /// Per-tic scale multiplier while zoom out is held
    pub zoom_out: f64,
    /// Entering a level shows the whole map divided by this
    pub entry_zoom: f64,
    /// Fraction of the screen height the map covers; the rest is status bar
    pub map_height: f32,
}

impl Default for AutomapConfig {
    fn default() -> Self {
        Self {
            init_scale_mtof: 0.2,
            pan_speed: 140.0 / 200.0,
            tic_rate: 35,
            zoom_in: 1.02,
            zoom_out: 0.98,
            entry_zoom: 0.7,
            map_height: 168.0 / 200.0,
        }
    }
}

impl AutomapConfig {
    /// Frame units panned per tic
    pub fn pan_inc(&self) -> f64 {
        self.pan_speed / self.tic_rate.max(1) as f64
    }

    /// Frame aspect for a `width` x `height` screen. The map only gets the
    /// top `map_height` of it, so map units stay square.
    pub fn frame_aspect(&self, width: i32, height: i32) -> f64 {
        width as f64 / (height.max(1) as f64 * self.map_height as f64)
    }
}

/// A player or thing on the map
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MapThing {
    pub pos: MapPoint,
    pub angle: Angle,
}

#[derive(Debug, Clone)]
pub struct AutomapView {
    config: AutomapConfig,
    active: bool,
    following: bool,
    grid: bool,
    /// Zoomed all the way out with the previous window saved
    bigstate: bool,

    // Frame, in screen heights
    f_x: f64,
    f_y: f64,
    f_w: f64,
    f_h: f64,

    // Window, in map units
    m_x: Fixed,
    m_y: Fixed,
    m_w: Fixed,
    m_h: Fixed,
    m_x2: Fixed,
    m_y2: Fixed,

    old_m_x: Fixed,
    old_m_y: Fixed,
    old_m_w: Fixed,
    old_m_h: Fixed,

    // Level bounds
    min_x: Fixed,
    min_y: Fixed,
    max_x: Fixed,
    max_y: Fixed,
    max_w: Fixed,
    max_h: Fixed,

    scale_mtof: f64,
    scale_ftom: f64,
    min_scale_mtof: f64,
    max_scale_mtof: f64,

    paninc: MapPoint,
    mtof_zoommul: f64,

    /// Followed position at the last recenter
    f_oldloc: Option<MapPoint>,
    player: MapPoint,

    marks: [Option<MapPoint>; NUM_MARKS],
    next_mark: usize,
}

impl AutomapView {
    pub fn new(config: &AutomapConfig) -> Self {
        let scale_mtof = config.init_scale_mtof;
        Self {
            config: config.clone(),
            active: false,
            following: true,
            grid: false,
            bigstate: false,
            f_x: 0.0,
            f_y: 0.0,
            f_w: 1.0,
            f_h: 1.0,
            m_x: 0,
            m_y: 0,
            m_w: 0,
            m_h: 0,
            m_x2: 0,
            m_y2: 0,
            old_m_x: 0,
            old_m_y: 0,
            old_m_w: 0,
            old_m_h: 0,
            min_x: 0,
            min_y: 0,
            max_x: 0,
            max_y: 0,
            max_w: 0,
            max_h: 0,
            scale_mtof,
            scale_ftom: 1.0 / scale_mtof,
            min_scale_mtof: scale_mtof,
            max_scale_mtof: scale_mtof,
            paninc: MapPoint::default(),
            mtof_zoommul: 1.0,
            f_oldloc: None,
            player: MapPoint::default(),
            marks: [None; NUM_MARKS],
            next_mark: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn grid_enabled(&self) -> bool {
        self.grid
    }

    pub fn scale_mtof(&self) -> f64 {
        self.scale_mtof
    }

    pub fn scale_limits(&self) -> (f64, f64) {
        (self.min_scale_mtof, self.max_scale_mtof)
    }

    /// Visible map window
    pub fn window(&self) -> MapWindow {
        MapWindow {
            x1: self.m_x,
            y1: self.m_y,
            x2: self.m_x2,
            y2: self.m_y2,
        }
    }

    /// Center of the visible window, in map units
    pub fn center(&self) -> MapPoint {
        MapPoint::new(self.m_x + self.m_w / 2, self.m_y + self.m_h / 2)
    }

    pub fn frame_size(&self) -> (f64, f64) {
        (self.f_w, self.f_h)
    }

    pub fn marks(&self) -> impl Iterator<Item = MapPoint> + '_ {
        self.marks.iter().flatten().copied()
    }

    /// Where the map goes on screen
    pub fn geometry(&self) -> NormRect {
        NormRect::new(0.0, 0.0, 1.0, self.config.map_height)
    }

    /// Map distance to frame distance
    #[inline]
    pub fn mtof(&self, x: Fixed) -> f64 {
        fixed_to_float(x) * self.scale_mtof
    }

    /// Frame distance to map distance
    #[inline]
    pub fn ftom(&self, x: f64) -> Fixed {
        float_to_fixed_saturating(x * self.scale_ftom)
    }

    #[inline]
    pub fn cx_mtof(&self, x: Fixed) -> f64 {
        self.f_x + self.mtof(x.wrapping_sub(self.m_x))
    }

    #[inline]
    pub fn cy_mtof(&self, y: Fixed) -> f64 {
        self.f_y + (self.f_h - self.mtof(y.wrapping_sub(self.m_y)))
    }

    pub fn world_to_frame(&self, p: MapPoint) -> FramePoint {
        FramePoint {
            x: self.cx_mtof(p.x),
            y: self.cy_mtof(p.y),
        }
    }

    /// Set up for a new level. `aspect` is the viewport width over height.
    pub fn level_init(&mut self, vertices: &[MapPoint], aspect: f64) {
        self.f_x = 0.0;
        self.f_y = 0.0;
        self.f_w = aspect;
        self.f_h = 1.0;

        self.clear_marks();
        self.find_bounds(vertices);
        self.find_scale_limits();

        self.scale_mtof = self.min_scale_mtof / self.config.entry_zoom;
        if self.scale_mtof > self.max_scale_mtof {
            self.scale_mtof = self.min_scale_mtof;
        }
        self.scale_ftom = 1.0 / self.scale_mtof;

        info!(
            "automap: {} vertices, bounds {}x{}, scale {:.6} in [{:.6}, {:.6}]",
            vertices.len(),
            fixed_to_float(self.max_w),
            fixed_to_float(self.max_h),
            self.scale_mtof,
            self.min_scale_mtof,
            self.max_scale_mtof
        );
    }

    fn find_bounds(&mut self, vertices: &[MapPoint]) {
        let mut points = vertices.iter();
        let Some(first) = points.next() else {
            self.min_x = 0;
            self.min_y = 0;
            self.max_x = 0;
            self.max_y = 0;
            self.max_w = 2 * PLAYER_RADIUS;
            self.max_h = 2 * PLAYER_RADIUS;
            return;
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        self.min_x = min_x;
        self.min_y = min_y;
        self.max_x = max_x;
        self.max_y = max_y;
        self.max_w = max_x.wrapping_sub(min_x).max(2 * PLAYER_RADIUS);
        self.max_h = max_y.wrapping_sub(min_y).max(2 * PLAYER_RADIUS);
    }

    fn find_scale_limits(&mut self) {
        let a = self.f_w / fixed_to_float(self.max_w);
        let b = self.f_h / fixed_to_float(self.max_h);
        self.min_scale_mtof = a.min(b);
        self.max_scale_mtof = self.f_h / fixed_to_float(2 * PLAYER_RADIUS);
    }

    pub fn on_resolution_change(&mut self, aspect: f64) {
        self.f_w = aspect;
        self.find_scale_limits();
        if self.scale_mtof > self.max_scale_mtof || self.scale_mtof < self.min_scale_mtof {
            self.scale_mtof = self.min_scale_mtof;
        }
        self.scale_ftom = 1.0 / self.scale_mtof;
        self.activate_new_scale();
    }

    /// Open the map centered on `player`
    pub fn start(&mut self, player: MapPoint) {
        self.player = player;
        self.active = true;
        self.f_oldloc = None;
        self.paninc = MapPoint::default();
        self.mtof_zoommul = 1.0;

        self.m_w = self.ftom(self.f_w);
        self.m_h = self.ftom(self.f_h);
        self.m_x = player.x.wrapping_sub(self.m_w / 2);
        self.m_y = player.y.wrapping_sub(self.m_h / 2);
        self.change_window_loc();

        self.save_scale_and_loc();
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn add_mark(&mut self) {
        let center = self.center();
        self.marks[self.next_mark] = Some(center);
        debug!("automap: mark {} at {:?}", self.next_mark, center);
        self.next_mark = (self.next_mark + 1) % NUM_MARKS;
    }

    pub fn clear_marks(&mut self) {
        self.marks = [None; NUM_MARKS];
        self.next_mark = 0;
    }

    fn save_scale_and_loc(&mut self) {
        self.old_m_x = self.m_x;
        self.old_m_y = self.m_y;
        self.old_m_w = self.m_w;
        self.old_m_h = self.m_h;
    }

    fn restore_scale_and_loc(&mut self) {
        self.m_w = self.old_m_w;
        self.m_h = self.old_m_h;
        if self.following {
            self.m_x = self.player.x.wrapping_sub(self.m_w / 2);
            self.m_y = self.player.y.wrapping_sub(self.m_h / 2);
        } else {
            self.m_x = self.old_m_x;
            self.m_y = self.old_m_y;
        }
        self.m_x2 = self.m_x.saturating_add(self.m_w);
        self.m_y2 = self.m_y.saturating_add(self.m_h);

        self.scale_mtof = self.f_w / fixed_to_float(self.m_w.max(1));
        self.scale_ftom = 1.0 / self.scale_mtof;
    }

    /// Resize the window around its center for the current scale
    fn activate_new_scale(&mut self) {
        self.m_x = self.m_x.wrapping_add(self.m_w / 2);
        self.m_y = self.m_y.wrapping_add(self.m_h / 2);
        self.m_w = self.ftom(self.f_w);
        self.m_h = self.ftom(self.f_h);
        self.m_x = self.m_x.wrapping_sub(self.m_w / 2);
        self.m_y = self.m_y.wrapping_sub(self.m_h / 2);
        self.m_x2 = self.m_x.saturating_add(self.m_w);
        self.m_y2 = self.m_y.saturating_add(self.m_h);
    }

    fn min_out_window_scale(&mut self) {
        self.scale_mtof = self.min_scale_mtof;
        self.scale_ftom = 1.0 / self.scale_mtof;
        self.activate_new_scale();
    }

    fn max_out_window_scale(&mut self) {
        self.scale_mtof = self.max_scale_mtof;
        self.scale_ftom = 1.0 / self.scale_mtof;
        self.activate_new_scale();
    }

    /// Apply the pan velocity, keeping the center inside the level
    fn change_window_loc(&mut self) {
        if self.paninc.x != 0 || self.paninc.y != 0 {
            self.following = false;
            self.f_oldloc = None;
        }

        self.m_x = self.m_x.wrapping_add(self.paninc.x);
        self.m_y = self.m_y.wrapping_add(self.paninc.y);

        let (half_w, half_h) = (self.m_w / 2, self.m_h / 2);
        if self.m_x + half_w > self.max_x {
            self.m_x = self.max_x - half_w;
        } else if self.m_x + half_w < self.min_x {
            self.m_x = self.min_x - half_w;
        }
        if self.m_y + half_h > self.max_y {
            self.m_y = self.max_y - half_h;
        } else if self.m_y + half_h < self.min_y {
            self.m_y = self.min_y - half_h;
        }

        self.m_x2 = self.m_x.saturating_add(self.m_w);
        self.m_y2 = self.m_y.saturating_add(self.m_h);
    }

    fn change_window_scale(&mut self) {
        self.scale_mtof *= self.mtof_zoommul;
        self.scale_ftom = 1.0 / self.scale_mtof;

        if self.scale_mtof < self.min_scale_mtof {
            self.min_out_window_scale();
        } else if self.scale_mtof > self.max_scale_mtof {
            self.max_out_window_scale();
        } else {
            self.activate_new_scale();
        }
    }

    fn follow_player(&mut self, player: MapPoint) {
        if self.f_oldloc == Some(player) {
            return;
        }
        self.m_x = self.ftom(self.mtof(player.x)).wrapping_sub(self.m_w / 2);
        self.m_y = self.ftom(self.mtof(player.y)).wrapping_sub(self.m_h / 2);
        self.m_x2 = self.m_x.saturating_add(self.m_w);
        self.m_y2 = self.m_y.saturating_add(self.m_h);
        self.f_oldloc = Some(player);
    }

    /// Handle a key event. Returns true when the event was consumed.
    pub fn responder(&mut self, event: AutomapEvent) -> bool {
        use AutomapCommand::*;

        if !self.active {
            if event == AutomapEvent::KeyDown(Toggle) {
                self.start(self.player);
                return true;
            }
            return false;
        }

        match event {
            AutomapEvent::KeyDown(cmd) => {
                let pan = self.ftom(self.config.pan_inc());
                match cmd {
                    PanRight | PanLeft | PanUp | PanDown if self.following => return false,
                    PanRight => self.paninc.x = pan,
                    PanLeft => self.paninc.x = -pan,
                    PanUp => self.paninc.y = pan,
                    PanDown => self.paninc.y = -pan,
                    ZoomOut => self.mtof_zoommul = self.config.zoom_out,
                    ZoomIn => self.mtof_zoommul = self.config.zoom_in,
                    Toggle => {
                        self.bigstate = false;
                        self.stop();
                    }
                    MaxZoom => {
                        self.bigstate = !self.bigstate;
                        if self.bigstate {
                            self.save_scale_and_loc();
                            self.min_out_window_scale();
                        } else {
                            self.restore_scale_and_loc();
                        }
                    }
                    Follow => {
                        self.following = !self.following;
                        self.f_oldloc = None;
                        debug!("automap: follow {}", if self.following { "on" } else { "off" });
                    }
                    Grid => {
                        self.grid = !self.grid;
                        debug!("automap: grid {}", if self.grid { "on" } else { "off" });
                    }
                    Mark => self.add_mark(),
                    ClearMarks => {
                        self.clear_marks();
                        debug!("automap: marks cleared");
                    }
                }
                true
            }
            AutomapEvent::KeyUp(cmd) => {
                match cmd {
                    PanRight | PanLeft if !self.following => self.paninc.x = 0,
                    PanUp | PanDown if !self.following => self.paninc.y = 0,
                    ZoomIn | ZoomOut => self.mtof_zoommul = 1.0,
                    _ => {}
                }
                false
            }
        }
    }

    /// Advance one tic: follow, then zoom, then pan
    pub fn ticker(&mut self, player: MapPoint) {
        if !self.active {
            return;
        }
        self.player = player;

        if self.following {
            self.follow_player(player);
        }
        if self.mtof_zoommul != 1.0 {
            self.change_window_scale();
        }
        if self.paninc.x != 0 || self.paninc.y != 0 {
            self.change_window_loc();
        }
    }

    pub fn trivial_reject(&self, line: &MapLine) -> bool {
        trivial_reject(line, &self.window())
    }

    /// Project and clip a map line. `None` when it is off screen.
    pub fn clip_line(&self, line: &MapLine) -> Option<FrameLine> {
        if self.trivial_reject(line) {
            return None;
        }
        let projected = FrameLine {
            a: self.world_to_frame(line.a),
            b: self.world_to_frame(line.b),
        };
        clip_frame_line(projected, self.f_w, self.f_h)
    }

    fn draw_frame_line<R: Renderer + ?Sized>(&self, renderer: &mut R, line: &FrameLine, color: MapColor) {
        renderer.draw_map_line(
            (line.a.x / self.f_w) as f32,
            line.a.y as f32,
            (line.b.x / self.f_w) as f32,
            line.b.y as f32,
            color as u8,
        );
    }

    /// Clip a map line and queue whatever is visible
    pub fn draw_line<R: Renderer + ?Sized>(&self, renderer: &mut R, line: &MapLine, color: MapColor) {
        if let Some(frame) = self.clip_line(line) {
            self.draw_frame_line(renderer, &frame, color);
        }
    }

    /// Blockmap grid lines. `origin` is the blockmap origin.
    pub fn draw_grid<R: Renderer + ?Sized>(&self, renderer: &mut R, origin: MapPoint, color: MapColor) {
        let start = self.m_x - self.m_x.wrapping_sub(origin.x).rem_euclid(MAP_BLOCK_UNITS);
        let end = self.m_x.saturating_add(self.m_w);
        let mut x = start;
        while x < end {
            let line = MapLine::new(x, self.m_y, x, self.m_y.saturating_add(self.m_h));
            self.draw_line(renderer, &line, color);
            x = x.saturating_add(MAP_BLOCK_UNITS);
        }

        let start = self.m_y - self.m_y.wrapping_sub(origin.y).rem_euclid(MAP_BLOCK_UNITS);
        let end = self.m_y.saturating_add(self.m_h);
        let mut y = start;
        while y < end {
            let line = MapLine::new(self.m_x, y, self.m_x.saturating_add(self.m_w), y);
            self.draw_line(renderer, &line, color);
            y = y.saturating_add(MAP_BLOCK_UNITS);
        }
    }

    /// Draw a shape scaled by `scale` (0 keeps it as is), rotated by
    /// `angle` and moved to `at`
    pub fn draw_line_character<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        lines: &[MapLine],
        scale: Fixed,
        angle: Angle,
        color: MapColor,
        at: MapPoint,
    ) {
        let place = |p: MapPoint| {
            let (mut x, mut y) = (p.x, p.y);
            if scale != 0 {
                x = fixed_mul(scale, x);
                y = fixed_mul(scale, y);
            }
            if !angle.is_zero() {
                (x, y) = rotate(x, y, angle);
            }
            MapPoint::new(x.wrapping_add(at.x), y.wrapping_add(at.y))
        };

        for line in lines {
            let placed = MapLine {
                a: place(line.a),
                b: place(line.b),
            };
            self.draw_line(renderer, &placed, color);
        }
    }

    pub fn draw_crosshair<R: Renderer + ?Sized>(&self, renderer: &mut R, color: MapColor) {
        renderer.draw_map_line(0.49, 0.5, 0.51, 0.5, color as u8);
        renderer.draw_map_line(0.5, 0.49, 0.5, 0.51, color as u8);
    }

    /// Marks inside the frame, as small crosses
    pub fn draw_marks<R: Renderer + ?Sized>(&self, renderer: &mut R, color: MapColor) {
        for mark in self.marks() {
            let p = self.world_to_frame(mark);
            if p.x < 0.0 || p.x > self.f_w || p.y < 0.0 || p.y > self.f_h {
                continue;
            }
            let (x, y) = ((p.x / self.f_w) as f32, p.y as f32);
            renderer.draw_map_line(x - MARK_SIZE, y - MARK_SIZE, x + MARK_SIZE, y + MARK_SIZE, color as u8);
            renderer.draw_map_line(x - MARK_SIZE, y + MARK_SIZE, x + MARK_SIZE, y - MARK_SIZE, color as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::FRACUNIT;
    use crate::renderer::{Renderer, SoftwareRenderer};

    fn square_level(size: i32) -> Vec<MapPoint> {
        let s = size * FRACUNIT;
        vec![
            MapPoint::new(0, 0),
            MapPoint::new(s, 0),
            MapPoint::new(s, s),
            MapPoint::new(0, s),
        ]
    }

    fn open_view(aspect: f64, player: MapPoint) -> AutomapView {
        let mut view = AutomapView::new(&AutomapConfig::default());
        view.level_init(&square_level(1024), aspect);
        view.start(player);
        view
    }

    fn mid() -> MapPoint {
        MapPoint::new(512 * FRACUNIT, 512 * FRACUNIT)
    }

    #[test]
    fn test_level_init_scale() {
        let mut view = AutomapView::new(&AutomapConfig::default());
        view.level_init(&square_level(1024), 1.6);
        let (min, max) = view.scale_limits();
        assert!((min - 1.0 / 1024.0).abs() < 1e-12);
        assert!((max - 1.0 / 32.0).abs() < 1e-12);
        assert!((view.scale_mtof() - min / 0.7).abs() < 1e-12);
        assert_eq!(view.frame_size(), (1.6, 1.0));
    }

    #[test]
    fn test_empty_level_does_not_divide_by_zero() {
        let mut view = AutomapView::new(&AutomapConfig::default());
        view.level_init(&[], 1.0);
        assert!(view.scale_mtof().is_finite());
        view.start(MapPoint::default());
        assert!(view.clip_line(&MapLine::new(0, 0, FRACUNIT, 0)).is_some());
    }

    #[test]
    fn test_start_centers_on_player() {
        let view = open_view(1.0, mid());
        assert!(view.is_active());
        let c = view.center();
        assert!((c.x - mid().x).abs() <= 1);
        assert!((c.y - mid().y).abs() <= 1);

        let p = view.world_to_frame(mid());
        assert!((p.x - 0.5).abs() < 1e-3);
        assert!((p.y - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_frame_y_points_down() {
        let view = open_view(1.0, mid());
        let above = view.world_to_frame(MapPoint::new(mid().x, mid().y + 64 * FRACUNIT));
        assert!(above.y < 0.5);
    }

    #[test]
    fn test_inactive_only_toggle() {
        let mut view = AutomapView::new(&AutomapConfig::default());
        view.level_init(&square_level(256), 1.0);
        assert!(!view.responder(AutomapEvent::KeyDown(AutomapCommand::Grid)));
        assert!(!view.grid_enabled());
        assert!(view.responder(AutomapEvent::KeyDown(AutomapCommand::Toggle)));
        assert!(view.is_active());
        assert!(view.responder(AutomapEvent::KeyDown(AutomapCommand::Toggle)));
        assert!(!view.is_active());
    }

    #[test]
    fn test_zoom_clamps_to_limits() {
        let mut view = open_view(1.0, mid());
        let (min, max) = view.scale_limits();

        assert!(view.responder(AutomapEvent::KeyDown(AutomapCommand::ZoomOut)));
        for _ in 0..100 {
            view.ticker(mid());
        }
        assert_eq!(view.scale_mtof(), min);

        view.responder(AutomapEvent::KeyUp(AutomapCommand::ZoomOut));
        view.responder(AutomapEvent::KeyDown(AutomapCommand::ZoomIn));
        for _ in 0..400 {
            view.ticker(mid());
        }
        assert_eq!(view.scale_mtof(), max);

        // Released: scale stays put
        view.responder(AutomapEvent::KeyUp(AutomapCommand::ZoomIn));
        view.ticker(mid());
        assert_eq!(view.scale_mtof(), max);
    }

    #[test]
    fn test_pan_ignored_while_following() {
        let mut view = open_view(1.0, mid());
        assert!(view.is_following());
        view.ticker(mid());
        assert!(!view.responder(AutomapEvent::KeyDown(AutomapCommand::PanRight)));
        let before = view.center();
        view.ticker(mid());
        assert_eq!(view.center(), before);
    }

    #[test]
    fn test_pan_clamps_center_to_level() {
        let mut view = open_view(1.0, mid());
        view.responder(AutomapEvent::KeyDown(AutomapCommand::Follow));
        assert!(!view.is_following());

        assert!(view.responder(AutomapEvent::KeyDown(AutomapCommand::PanRight)));
        assert!(view.responder(AutomapEvent::KeyDown(AutomapCommand::PanDown)));
        for _ in 0..500 {
            view.ticker(mid());
        }
        let c = view.center();
        assert_eq!(c.x, 1024 * FRACUNIT);
        assert_eq!(c.y, 0);

        view.responder(AutomapEvent::KeyUp(AutomapCommand::PanRight));
        view.responder(AutomapEvent::KeyUp(AutomapCommand::PanDown));
        view.responder(AutomapEvent::KeyDown(AutomapCommand::PanLeft));
        view.ticker(mid());
        assert!(view.center().x < 1024 * FRACUNIT);
        assert_eq!(view.center().y, 0);
    }

    #[test]
    fn test_follow_tracks_player() {
        let mut view = open_view(1.0, mid());
        let target = MapPoint::new(700 * FRACUNIT, 300 * FRACUNIT);
        view.ticker(target);
        let c = view.center();
        assert!((c.x - target.x).abs() <= 2);
        assert!((c.y - target.y).abs() <= 2);

        // Panning drops follow mode
        view.responder(AutomapEvent::KeyDown(AutomapCommand::Follow));
        view.responder(AutomapEvent::KeyDown(AutomapCommand::PanUp));
        view.ticker(mid());
        assert!(!view.is_following());
        let moved = view.center();
        view.ticker(MapPoint::new(0, 0));
        assert_ne!(view.center(), moved);
        assert!(view.center().y > moved.y);
    }

    #[test]
    fn test_max_zoom_round_trip() {
        let mut view = open_view(1.0, mid());
        let scale = view.scale_mtof();
        let window = view.window();

        view.responder(AutomapEvent::KeyDown(AutomapCommand::MaxZoom));
        assert_eq!(view.scale_mtof(), view.scale_limits().0);

        view.responder(AutomapEvent::KeyDown(AutomapCommand::MaxZoom));
        assert_eq!((view.window().x2 - view.window().x1), (window.x2 - window.x1));
        assert!((view.scale_mtof() - scale).abs() / scale < 1e-4);
    }

    #[test]
    fn test_marks_ring() {
        let mut view = open_view(1.0, mid());
        for _ in 0..NUM_MARKS + 1 {
            view.add_mark();
        }
        assert_eq!(view.marks().count(), NUM_MARKS);
        view.responder(AutomapEvent::KeyDown(AutomapCommand::ClearMarks));
        assert_eq!(view.marks().count(), 0);
    }

    #[test]
    fn test_clip_line_rejects_and_clips() {
        let view = open_view(1.0, mid());
        let w = view.window();

        let above = MapLine::new(w.x1, w.y2 + FRACUNIT, w.x2, w.y2 + 8 * FRACUNIT);
        assert!(view.trivial_reject(&above));
        assert_eq!(view.clip_line(&above), None);

        let across = MapLine::new(w.x1 - 100 * FRACUNIT, mid().y, w.x2 + 100 * FRACUNIT, mid().y);
        let clipped = view.clip_line(&across).unwrap();
        assert_eq!(clipped.a.x, 0.0);
        assert_eq!(clipped.b.x, 1.0);
        assert!((clipped.a.y - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_resolution_change_keeps_scale_in_range() {
        let mut view = open_view(1.0, mid());
        view.on_resolution_change(2.0);
        let (min, max) = view.scale_limits();
        assert!(view.scale_mtof() >= min && view.scale_mtof() <= max);
        assert_eq!(view.frame_size().0, 2.0);
    }

    #[test]
    fn test_frame_aspect_keeps_map_units_square() {
        let config = AutomapConfig {
            map_height: 0.5,
            ..AutomapConfig::default()
        };
        assert_eq!(config.frame_aspect(800, 400), 4.0);

        let mut view = AutomapView::new(&config);
        view.level_init(&square_level(1024), config.frame_aspect(800, 400));
        view.start(mid());

        let mut r = SoftwareRenderer::new(800, 400, 8, 8, 64);
        r.set_map_geometry(view.geometry());
        let c = mid();
        let d = 64 * FRACUNIT;
        view.draw_line(&mut r, &MapLine::new(c.x, c.y, c.x + d, c.y), MapColor::Walls);
        view.draw_line(&mut r, &MapLine::new(c.x, c.y, c.x, c.y + d), MapColor::Walls);

        let lines = &r.state().arena.map_lines;
        assert_eq!(lines.len(), 2);
        let (ax1, _, ax2, _) = r.state().map_line_pixels(&lines[0]);
        let (_, by1, _, by2) = r.state().map_line_pixels(&lines[1]);
        let (across, down) = ((ax2 - ax1).abs(), (by2 - by1).abs());
        assert!(across > 1.0);
        assert!((across - down).abs() < 1.0, "{} vs {}", across, down);
    }

    #[test]
    fn test_draw_grid_lines_on_block_edges() {
        let mut view = open_view(1.0, mid());
        view.responder(AutomapEvent::KeyDown(AutomapCommand::Grid));
        assert!(view.grid_enabled());

        let mut r = SoftwareRenderer::new(64, 64, 8, 8, 64);
        view.draw_grid(&mut r, MapPoint::default(), MapColor::Grid);
        let lines = &r.state().arena.map_lines;
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| l.color == MapColor::Grid as u8));
        // Horizontal or vertical only
        assert!(lines.iter().all(|l| l.x1 == l.x2 || l.y1 == l.y2));
    }

    #[test]
    fn test_draw_marks_as_crosses() {
        let mut view = open_view(1.0, mid());
        view.add_mark();
        let mut r = SoftwareRenderer::new(64, 64, 8, 8, 64);
        view.draw_marks(&mut r, MapColor::You);
        assert_eq!(r.state().arena.map_lines.len(), 2);
    }
}
