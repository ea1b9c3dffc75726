//! Graphic registry
//!
//! Owns every decoded 2D graphic. Graphics are identified by the id handed
//! out when they are added, never by their contents.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use super::patch::{Patch, PatchError};
use crate::rasterizer::{Palette, RgbaBuffer};

/// Handle to a graphic owned by a `GraphicsManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphicId(pub u32);

/// A decoded graphic ready for the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graphic {
    pub id: GraphicId,
    pub pixels: RgbaBuffer,
    pub width: i32,
    pub height: i32,
    /// Added to the draw position; the negated patch left offset
    pub xoff: i32,
    /// Added to the draw position; the negated patch top offset
    pub yoff: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicError {
    /// The loader had no data for this name
    NotFound(String),
    Patch(PatchError),
}

impl fmt::Display for GraphicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicError::NotFound(name) => write!(f, "graphic '{}' not found", name),
            GraphicError::Patch(e) => write!(f, "patch error: {}", e),
        }
    }
}

impl std::error::Error for GraphicError {}

impl From<PatchError> for GraphicError {
    fn from(e: PatchError) -> Self {
        GraphicError::Patch(e)
    }
}

/// Registry of graphics, created once and passed to whoever draws
#[derive(Debug, Default)]
pub struct GraphicsManager {
    graphics: Vec<Graphic>,
    names: HashMap<String, GraphicId>,
}

impl GraphicsManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, pixels: RgbaBuffer, xoff: i32, yoff: i32) -> GraphicId {
        let id = GraphicId(self.graphics.len() as u32);
        self.graphics.push(Graphic {
            id,
            width: pixels.width() as i32,
            height: pixels.height() as i32,
            pixels,
            xoff,
            yoff,
        });
        id
    }

    /// Decode a patch and register it. Every call creates a new graphic,
    /// even for identical bytes.
    pub fn add_patch(&mut self, bytes: &[u8], palette: &Palette) -> Result<GraphicId, PatchError> {
        let patch = Patch::parse(bytes, palette)?;
        let id = self.push(patch.pixels, -patch.left_offset, -patch.top_offset);
        debug!("added patch graphic {:?} ({}x{})", id, patch.width, patch.height);
        Ok(id)
    }

    /// Return the graphic registered under `name`, or fetch its bytes with
    /// `loader` and register it.
    pub fn load_patch<F>(
        &mut self,
        name: &str,
        palette: &Palette,
        loader: F,
    ) -> Result<GraphicId, GraphicError>
    where
        F: FnOnce(&str) -> Option<Vec<u8>>,
    {
        if let Some(&id) = self.names.get(name) {
            return Ok(id);
        }
        let bytes = loader(name).ok_or_else(|| GraphicError::NotFound(name.to_string()))?;
        let id = self.add_patch(&bytes, palette)?;
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register an already decoded image, optionally under a name
    pub fn add_rgba(
        &mut self,
        name: Option<&str>,
        pixels: RgbaBuffer,
        xoff: i32,
        yoff: i32,
    ) -> GraphicId {
        if let Some(&id) = name.and_then(|n| self.names.get(n)) {
            return id;
        }
        let id = self.push(pixels, xoff, yoff);
        if let Some(n) = name {
            self.names.insert(n.to_string(), id);
        }
        id
    }

    pub fn get(&self, id: GraphicId) -> Option<&Graphic> {
        self.graphics.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<GraphicId> {
        self.names.get(name).copied()
    }

    /// Reverse name lookup. Scans every name, so keep it to diagnostics.
    pub fn debug_name_of(&self, id: GraphicId) -> &str {
        self.names
            .iter()
            .find(|(_, &v)| v == id)
            .map(|(k, _)| k.as_str())
            .unwrap_or("(unknown)")
    }

    pub fn len(&self) -> usize {
        self.graphics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Graphic> {
        self.graphics.iter()
    }
}
