//! Overlay atlas page
//!
//! Shelf atlas of graphics plus the RGBA page holding their pixels. The page
//! is uploaded by the backend whenever something new lands in it.

use log::debug;

use crate::rasterizer::RgbaBuffer;
use crate::video::{Atlas, AtlasEntry, AtlasError, Graphic, GraphicId};

#[derive(Debug)]
pub struct OverlayAtlas {
    atlas: Atlas<GraphicId>,
    page: RgbaBuffer,
    dirty: bool,
}

impl OverlayAtlas {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            atlas: Atlas::new(width, height),
            page: RgbaBuffer::new(width.max(0) as usize, height.max(0) as usize),
            dirty: true,
        }
    }

    pub fn width(&self) -> i32 {
        self.atlas.width()
    }

    pub fn height(&self) -> i32 {
        self.atlas.height()
    }

    /// Copy a graphic into the page if it is not there yet
    pub fn add(&mut self, graphic: &Graphic) -> Result<AtlasEntry, AtlasError> {
        if let Some(entry) = self.atlas.find(&graphic.id) {
            return Ok(entry);
        }
        let entry = self.atlas.add(
            graphic.id,
            graphic.width,
            graphic.height,
            graphic.xoff,
            graphic.yoff,
        )?;
        self.page.blit(&graphic.pixels, entry.x as usize, entry.y as usize);
        self.dirty = true;
        debug!(
            "overlay: {:?} {}x{} at ({}, {})",
            graphic.id, entry.w, entry.h, entry.x, entry.y
        );
        Ok(entry)
    }

    pub fn check(&self, graphic: &Graphic) -> bool {
        self.atlas.check(&graphic.id)
    }

    pub fn find(&self, graphic: &Graphic) -> Option<AtlasEntry> {
        self.atlas.find(&graphic.id)
    }

    pub fn page(&self) -> &RgbaBuffer {
        &self.page
    }

    pub fn atlas(&self) -> &Atlas<GraphicId> {
        &self.atlas
    }

    /// True once after each change to the page
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphic(id: u32, w: usize, h: usize, fill: [u8; 4]) -> Graphic {
        let mut pixels = RgbaBuffer::new(w, h);
        pixels.clear(fill);
        Graphic {
            id: GraphicId(id),
            pixels,
            width: w as i32,
            height: h as i32,
            xoff: 0,
            yoff: 0,
        }
    }

    #[test]
    fn test_add_copies_pixels() {
        let mut overlay = OverlayAtlas::new(32, 32);
        assert!(overlay.take_dirty());
        let a = graphic(0, 8, 4, [255, 0, 0, 255]);
        let b = graphic(1, 4, 4, [0, 255, 0, 255]);
        overlay.add(&a).unwrap();
        let eb = overlay.add(&b).unwrap();
        assert_eq!((eb.x, eb.y), (8, 0));
        assert_eq!(overlay.page().get(0, 0), [255, 0, 0, 255]);
        assert_eq!(overlay.page().get(9, 3), [0, 255, 0, 255]);
        assert_eq!(overlay.page().get(0, 5), [0, 0, 0, 0]);
        assert!(overlay.take_dirty());
        assert!(!overlay.take_dirty());
    }

    #[test]
    fn test_re_add_leaves_page_clean() {
        let mut overlay = OverlayAtlas::new(32, 32);
        let a = graphic(3, 8, 8, [1, 1, 1, 1]);
        let first = overlay.add(&a).unwrap();
        overlay.take_dirty();
        assert_eq!(overlay.add(&a).unwrap(), first);
        assert!(!overlay.take_dirty());
        assert!(overlay.check(&a));
    }

    #[test]
    fn test_too_big() {
        let mut overlay = OverlayAtlas::new(16, 16);
        let big = graphic(0, 17, 2, [0; 4]);
        assert_eq!(overlay.add(&big), Err(AtlasError::Oversized { w: 17, h: 2 }));
        assert!(!overlay.check(&big));
    }
}
