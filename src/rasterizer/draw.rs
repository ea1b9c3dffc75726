//! Column and span drawers
//!
//! The inner loops of the software view: vertical wall/sprite columns and
//! horizontal floor/ceiling spans, written into a paletted buffer through a
//! colormap. Callers supply everything per call in a job struct.
//!
//! Coordinates are validated only when `debug_assertions` or the
//! `rangecheck` feature is on; a failed check panics with a `RangeError`.

use std::fmt;

use super::buffer::PalettedBuffer;
use super::colormap::{ColorTable, Colormaps, FUZZ_COLORMAP, FUZZ_OFFSETS, FUZZ_TABLE_LEN};
use super::fixed::{Fixed, FRACBITS};

/// Rows kept clear for the status bar when the view is not full width
pub const STATUS_BAR_HEIGHT: usize = 32;

/// Flats are 64x64 texels
pub const FLAT_SIZE: usize = 64;

/// The view sub-rectangle of a destination buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// Screen row of the horizon, relative to the view
    pub centery: i32,
}

impl ViewWindow {
    /// View covering a whole buffer
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            centery: (height / 2) as i32,
        }
    }

    /// Center a view inside a buffer. A narrower view also leaves room for
    /// the status bar at the bottom.
    pub fn centered(buffer_w: usize, buffer_h: usize, view_w: usize, view_h: usize) -> Self {
        let view_w = view_w.min(buffer_w);
        let view_h = view_h.min(buffer_h);
        let x = (buffer_w - view_w) >> 1;
        let y = if view_w == buffer_w {
            0
        } else {
            buffer_h.saturating_sub(STATUS_BAR_HEIGHT + view_h) >> 1
        };
        Self {
            x,
            y,
            width: view_w,
            height: view_h,
            centery: (view_h / 2) as i32,
        }
    }

    #[inline]
    fn offset(&self, stride: usize, x: usize, y: usize) -> usize {
        (self.y + y) * stride + self.x + x
    }
}

/// A coordinate outside the view window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    Column { yl: i32, yh: i32, x: i32 },
    Span { x1: i32, x2: i32, y: i32 },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::Column { yl, yh, x } => {
                write!(f, "draw_column: {} to {} at {}", yl, yh, x)
            }
            RangeError::Span { x1, x2, y } => {
                write!(f, "draw_span: {} to {} at {}", x1, x2, y)
            }
        }
    }
}

impl std::error::Error for RangeError {}

/// One vertical column of a wall or sprite
#[derive(Debug, Clone, Copy)]
pub struct ColumnJob<'a> {
    pub x: i32,
    pub yl: i32,
    pub yh: i32,
    /// Texture step per screen row
    pub iscale: Fixed,
    /// Texture row at the horizon
    pub texturemid: Fixed,
    /// Texels of one texture column, at least `texheight` long
    pub source: &'a [u8],
    pub texheight: i32,
    pub colormap: &'a ColorTable,
}

impl ColumnJob<'_> {
    pub fn check(&self, view: &ViewWindow) -> Result<(), RangeError> {
        if self.x < 0
            || self.x as usize >= view.width
            || self.yl < 0
            || self.yh as i64 >= view.height as i64
        {
            return Err(RangeError::Column {
                yl: self.yl,
                yh: self.yh,
                x: self.x,
            });
        }
        Ok(())
    }

    #[inline]
    fn start_frac(&self, centery: i32) -> Fixed {
        self.texturemid
            .wrapping_add((self.yl - centery).wrapping_mul(self.iscale))
    }
}

/// One horizontal span of a floor or ceiling
#[derive(Debug, Clone, Copy)]
pub struct SpanJob<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    /// 64x64 flat, row major
    pub source: &'a [u8],
    pub colormap: &'a ColorTable,
}

impl SpanJob<'_> {
    pub fn check(&self, view: &ViewWindow) -> Result<(), RangeError> {
        if self.x2 < self.x1
            || self.x1 < 0
            || self.x2 as i64 >= view.width as i64
            || self.y < 0
            || self.y as i64 >= view.height as i64
        {
            return Err(RangeError::Span {
                x1: self.x1,
                x2: self.x2,
                y: self.y,
            });
        }
        Ok(())
    }
}

/// Cyclic position in the fuzz pattern, carried across columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuzzState {
    pub pos: usize,
}

impl FuzzState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
        if self.pos == FUZZ_TABLE_LEN {
            self.pos = 0;
        }
    }
}

#[inline]
fn range_check(result: Result<(), RangeError>) {
    #[cfg(any(debug_assertions, feature = "rangecheck"))]
    if let Err(e) = result {
        panic!("{}", e);
    }
    #[cfg(not(any(debug_assertions, feature = "rangecheck")))]
    let _ = result;
}

/// Draw a textured column
pub fn draw_column(dest: &mut PalettedBuffer, view: &ViewWindow, job: &ColumnJob) {
    column_loop(dest, view, job, None);
}

/// Draw a column with the green ramp remapped through `translation`
pub fn draw_translated_column(
    dest: &mut PalettedBuffer,
    view: &ViewWindow,
    job: &ColumnJob,
    translation: &ColorTable,
) {
    column_loop(dest, view, job, Some(translation));
}

fn column_loop(
    dest: &mut PalettedBuffer,
    view: &ViewWindow,
    job: &ColumnJob,
    translation: Option<&ColorTable>,
) {
    let count = job.yh - job.yl;
    if count < 0 {
        return;
    }
    range_check(job.check(view));

    let stride = dest.width();
    let mut at = view.offset(stride, job.x as usize, job.yl as usize);
    let pixels = dest.pixels_mut();

    let texheight = job.texheight.max(1);
    let fracstep = job.iscale;
    let mut frac = job.start_frac(view.centery);

    let texel = |index: usize| -> u8 {
        let raw = job.source[index];
        match translation {
            Some(t) => job.colormap[t[raw as usize] as usize],
            None => job.colormap[raw as usize],
        }
    };

    if texheight & (texheight - 1) != 0 {
        // Not a power of two: keep frac inside [0, height) explicitly so the
        // texture repeats cleanly instead of reading past the column.
        let heightmask: Fixed = texheight << FRACBITS;
        frac = frac.rem_euclid(heightmask);

        for _ in 0..=count {
            pixels[at] = texel((frac >> FRACBITS) as usize);
            at += stride;

            frac = frac.wrapping_add(fracstep);
            if frac >= heightmask {
                frac -= heightmask;
                if frac >= heightmask {
                    frac = frac.rem_euclid(heightmask);
                }
            } else if frac < 0 {
                frac = frac.rem_euclid(heightmask);
            }
        }
    } else {
        let heightmask = texheight - 1;
        for _ in 0..=count {
            pixels[at] = texel(((frac >> FRACBITS) & heightmask) as usize);
            at += stride;
            frac = frac.wrapping_add(fracstep);
        }
    }
}

/// Spectre/invisibility effect: darken each pixel from the row above or
/// below it, stepping through the fuzz pattern.
pub fn draw_fuzz_column(
    dest: &mut PalettedBuffer,
    view: &ViewWindow,
    job: &ColumnJob,
    colormaps: &Colormaps,
    fuzz: &mut FuzzState,
) {
    // The pattern reads one row either side, so never touch the view edges
    let yl = job.yl.max(1);
    let yh = job.yh.min(view.height as i32 - 2);

    let count = yh - yl;
    if count < 0 {
        return;
    }
    range_check(ColumnJob { yl, yh, ..*job }.check(view));

    let stride = dest.width();
    let mut at = view.offset(stride, job.x as usize, yl as usize);
    let pixels = dest.pixels_mut();
    let table = colormaps.get(FUZZ_COLORMAP);

    for _ in 0..=count {
        let neighbour = if FUZZ_OFFSETS[fuzz.pos] < 0 {
            at - stride
        } else {
            at + stride
        };
        pixels[at] = table[pixels[neighbour] as usize];
        fuzz.advance();
        at += stride;
    }
}

#[inline]
fn span_spot(xfrac: Fixed, yfrac: Fixed) -> usize {
    (((yfrac >> 10) & 0x0FC0) | ((xfrac >> FRACBITS) & 0x3F)) as usize
}

/// Draw a textured span from a 64x64 flat
pub fn draw_span(dest: &mut PalettedBuffer, view: &ViewWindow, job: &SpanJob) {
    range_check(job.check(view));

    let mut count = job.x2 - job.x1;
    if count < 0 {
        return;
    }

    let stride = dest.width();
    let mut at = view.offset(stride, job.x1 as usize, job.y as usize);
    let pixels = dest.pixels_mut();
    let src = job.source;
    let cmap = job.colormap;

    let mut xfrac = job.xfrac;
    let mut yfrac = job.yfrac;
    let (xstep, ystep) = (job.xstep, job.ystep);

    while count >= 3 {
        let s1 = span_spot(xfrac, yfrac);
        let s2 = span_spot(xfrac.wrapping_add(xstep), yfrac.wrapping_add(ystep));
        let s3 = span_spot(
            xfrac.wrapping_add(xstep.wrapping_mul(2)),
            yfrac.wrapping_add(ystep.wrapping_mul(2)),
        );
        let s4 = span_spot(
            xfrac.wrapping_add(xstep.wrapping_mul(3)),
            yfrac.wrapping_add(ystep.wrapping_mul(3)),
        );

        pixels[at] = cmap[src[s1] as usize];
        pixels[at + 1] = cmap[src[s2] as usize];
        pixels[at + 2] = cmap[src[s3] as usize];
        pixels[at + 3] = cmap[src[s4] as usize];

        xfrac = xfrac.wrapping_add(xstep.wrapping_mul(4));
        yfrac = yfrac.wrapping_add(ystep.wrapping_mul(4));
        at += 4;
        count -= 4;
    }

    while count >= 0 {
        pixels[at] = cmap[src[span_spot(xfrac, yfrac)] as usize];
        xfrac = xfrac.wrapping_add(xstep);
        yfrac = yfrac.wrapping_add(ystep);
        at += 1;
        count -= 1;
    }
}
