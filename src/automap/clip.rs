//! Outcode line clipping
//!
//! Lines are rejected in two phases. A cheap test against the world window
//! throws away anything fully off one side without dividing. Survivors are
//! projected to frame space and clipped there against `[0, f_w] x [0, f_h]`.

use crate::rasterizer::Fixed;

pub const LEFT: u8 = 1;
pub const RIGHT: u8 = 2;
pub const BOTTOM: u8 = 4;
pub const TOP: u8 = 8;

/// Every iteration clears at least one outcode bit
const MAX_CLIP_STEPS: usize = 4;

/// A point in world (map) space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MapPoint {
    pub x: Fixed,
    pub y: Fixed,
}

impl MapPoint {
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapLine {
    pub a: MapPoint,
    pub b: MapPoint,
}

impl MapLine {
    pub const fn new(ax: Fixed, ay: Fixed, bx: Fixed, by: Fixed) -> Self {
        Self {
            a: MapPoint::new(ax, ay),
            b: MapPoint::new(bx, by),
        }
    }
}

/// A point in frame space: x in `[0, f_w]`, y in `[0, f_h]` growing down
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FramePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameLine {
    pub a: FramePoint,
    pub b: FramePoint,
}

/// World-space window, inclusive on all sides. y grows up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapWindow {
    pub x1: Fixed,
    pub y1: Fixed,
    pub x2: Fixed,
    pub y2: Fixed,
}

impl MapWindow {
    pub fn outcode(&self, p: MapPoint) -> u8 {
        let mut code = 0;
        if p.y > self.y2 {
            code |= TOP;
        } else if p.y < self.y1 {
            code |= BOTTOM;
        }
        if p.x < self.x1 {
            code |= LEFT;
        } else if p.x > self.x2 {
            code |= RIGHT;
        }
        code
    }
}

/// True when both endpoints lie outside the same side of `window`
pub fn trivial_reject(line: &MapLine, window: &MapWindow) -> bool {
    // Vertical test first; most rejected lines fail it
    let vertical = |p: MapPoint| {
        if p.y > window.y2 {
            TOP
        } else if p.y < window.y1 {
            BOTTOM
        } else {
            0
        }
    };
    if vertical(line.a) & vertical(line.b) != 0 {
        return true;
    }
    window.outcode(line.a) & window.outcode(line.b) != 0
}

/// Frame-space outcode. Frame y grows down, so TOP means y < 0.
pub fn frame_outcode(p: FramePoint, f_w: f64, f_h: f64) -> u8 {
    let mut code = 0;
    if p.y < 0.0 {
        code |= TOP;
    } else if p.y > f_h {
        code |= BOTTOM;
    }
    if p.x < 0.0 {
        code |= LEFT;
    } else if p.x > f_w {
        code |= RIGHT;
    }
    code
}

/// Clip a projected line to the frame. `None` when nothing is visible.
pub fn clip_frame_line(line: FrameLine, f_w: f64, f_h: f64) -> Option<FrameLine> {
    let FrameLine { mut a, mut b } = line;
    let mut code_a = frame_outcode(a, f_w, f_h);
    let mut code_b = frame_outcode(b, f_w, f_h);

    for _ in 0..MAX_CLIP_STEPS {
        if code_a & code_b != 0 {
            return None;
        }
        if code_a | code_b == 0 {
            return Some(FrameLine { a, b });
        }

        let outside = if code_a != 0 { code_a } else { code_b };
        let tmp = if outside & TOP != 0 {
            let dy = a.y - b.y;
            let dx = b.x - a.x;
            FramePoint {
                x: a.x + dx * a.y / dy,
                y: 0.0,
            }
        } else if outside & BOTTOM != 0 {
            let dy = a.y - b.y;
            let dx = b.x - a.x;
            FramePoint {
                x: a.x + dx * (a.y - f_h) / dy,
                y: f_h,
            }
        } else if outside & RIGHT != 0 {
            let dy = b.y - a.y;
            let dx = b.x - a.x;
            FramePoint {
                x: f_w,
                y: a.y + dy * (f_w - a.x) / dx,
            }
        } else {
            let dy = b.y - a.y;
            let dx = b.x - a.x;
            FramePoint {
                x: 0.0,
                y: a.y + dy * -a.x / dx,
            }
        };

        if outside == code_a {
            a = tmp;
            code_a = frame_outcode(a, f_w, f_h);
        } else {
            b = tmp;
            code_b = frame_outcode(b, f_w, f_h);
        }
    }

    if code_a | code_b == 0 {
        Some(FrameLine { a, b })
    } else {
        None
    }
}
