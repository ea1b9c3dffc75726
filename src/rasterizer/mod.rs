//! Software rasterizer
//!
//! 16.16 fixed point math, pixel buffers, colormaps and the column/span
//! drawers that fill the paletted world view.

mod buffer;
mod colormap;
mod draw;
mod fixed;

pub use buffer::*;
pub use colormap::*;
pub use draw::*;
pub use fixed::*;

/// Classic world view resolution
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 200;
