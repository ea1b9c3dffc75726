//! theta-render: Doom-style renderer core
//!
//! Fixed point math and a paletted column/span rasterizer, patch decoding
//! and a shelf atlas for 2D graphics, a `Renderer` trait with OpenGL
//! (macroquad) and software backends, and an automap projector/clipper.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod automap;
pub mod config;
pub mod rasterizer;
pub mod renderer;
pub mod video;
