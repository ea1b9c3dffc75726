//! 2D graphics
//!
//! Patch decoding, the graphic registry, shelf atlas packing and recorded
//! draw lists for text.

mod atlas;
mod draw_list;
mod graphics;
mod patch;

pub use atlas::*;
pub use draw_list::*;
pub use graphics::*;
pub use patch::*;
