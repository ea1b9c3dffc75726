//! Recorded draw lists
//!
//! A `DrawList` is a prebuilt sequence of graphic placements that can be
//! replayed at any screen position, such as a laid out line of text.
//! `LineCache` keeps a scrollback of text lines, each with a lazily built
//! draw list.

use std::collections::VecDeque;

use log::warn;

use super::graphics::{GraphicId, GraphicsManager};
use crate::renderer::{RenderError, Renderer};

/// Default number of lines kept by a `LineCache`
pub const DEFAULT_LINE_CAPACITY: usize = 2048;

/// One recorded placement, relative to the list origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawEdict {
    pub graphic: GraphicId,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawList {
    edicts: Vec<DrawEdict>,
    /// Total space the list covers; set by whoever builds it
    pub width: i32,
    pub height: i32,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, graphic: GraphicId, x: i32, y: i32) {
        self.edicts.push(DrawEdict { graphic, x, y });
    }

    pub fn edicts(&self) -> &[DrawEdict] {
        &self.edicts
    }

    pub fn is_empty(&self) -> bool {
        self.edicts.is_empty()
    }

    /// Empty the list for reuse
    pub fn clear(&mut self) {
        self.edicts.clear();
        self.width = 0;
        self.height = 0;
    }

    /// Replay every edict with its position offset by (x, y)
    pub fn draw<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        graphics: &GraphicsManager,
        x: i32,
        y: i32,
    ) -> Result<(), RenderError> {
        for edict in &self.edicts {
            match graphics.get(edict.graphic) {
                Some(g) => renderer.draw_graphic(g, x + edict.x, y + edict.y, 1.0, 1.0)?,
                None => warn!("draw list refers to unknown graphic {:?}", edict.graphic),
            }
        }
        Ok(())
    }

    /// Lay out `text` left to right, wrapping to a new row when the next
    /// glyph would pass `max_width`. Characters without a glyph use the
    /// space glyph, or are skipped if there is none.
    pub fn layout_text<F>(text: &str, max_width: i32, graphics: &GraphicsManager, mut glyph: F) -> Self
    where
        F: FnMut(char) -> Option<GraphicId>,
    {
        let mut list = DrawList::new();
        let (mut dx, mut dy) = (0, 0);
        let mut max_line_height = 0;

        for c in text.chars() {
            let Some(id) = glyph(c).or_else(|| glyph(' ')) else {
                continue;
            };
            let Some(g) = graphics.get(id) else {
                continue;
            };

            if dx > 0 && g.width + dx > max_width {
                dx = 0;
                dy += max_line_height;
                max_line_height = 0;
            }

            list.add(id, dx, dy);
            dx += g.width;
            list.width = list.width.max(dx);
            max_line_height = max_line_height.max(g.height);
        }

        list.height = dy + max_line_height;
        list
    }
}

#[derive(Debug, Clone, Default)]
struct CachedLine {
    text: String,
    drawer: Option<DrawList>,
}

/// Scrollback of text lines with cached draw lists.
///
/// A cached list is dropped when its line is appended to, when the slot is
/// recycled, or on `clear`. Changing the output resolution does not drop
/// it; callers that lay out by width must call `clear` themselves.
#[derive(Debug, Clone)]
pub struct LineCache {
    lines: VecDeque<CachedLine>,
    capacity: usize,
}

impl Default for LineCache {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_CAPACITY)
    }
}

impl LineCache {
    pub fn new(capacity: usize) -> Self {
        let mut lines = VecDeque::with_capacity(capacity.max(1));
        lines.push_back(CachedLine::default());
        Self {
            lines,
            capacity: capacity.max(1),
        }
    }

    /// Append text, splitting on newlines. Text before the first newline
    /// continues the current line.
    pub fn append(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.extend_current(first);
        }
        for part in parts {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(CachedLine::default());
            self.extend_current(part);
        }
    }

    fn extend_current(&mut self, part: &str) {
        if let Some(line) = self.lines.back_mut() {
            if !part.is_empty() {
                line.text.push_str(part);
                line.drawer = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.lines.push_back(CachedLine::default());
    }

    /// Number of lines, including the current unfinished one
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].text.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.text.as_str())
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.text.as_str())
    }

    /// Draw list for a line, building it with `build(text, width)` the first
    /// time it is asked for.
    pub fn drawer<F>(&mut self, index: usize, width: i32, build: F) -> Option<&DrawList>
    where
        F: FnOnce(&str, i32) -> DrawList,
    {
        let line = self.lines.get_mut(index)?;
        if line.drawer.is_none() {
            line.drawer = Some(build(&line.text, width));
        }
        line.drawer.as_ref()
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.lines.get(index).is_some_and(|l| l.drawer.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::RgbaBuffer;

    fn font(gm: &mut GraphicsManager) -> (GraphicId, GraphicId) {
        let a = gm.add_rgba(Some("A"), RgbaBuffer::new(8, 8), 0, 0);
        let space = gm.add_rgba(Some(" "), RgbaBuffer::new(4, 8), 0, 0);
        (a, space)
    }

    #[test]
    fn test_layout_wraps() {
        let mut gm = GraphicsManager::new();
        let (a, space) = font(&mut gm);
        let glyph = |c: char| match c {
            'A' => Some(a),
            ' ' => Some(space),
            _ => None,
        };

        let list = DrawList::layout_text("AAA", 20, &gm, glyph);
        assert_eq!(list.edicts().len(), 3);
        assert_eq!((list.edicts()[1].x, list.edicts()[1].y), (8, 0));
        // Third glyph would reach 24 > 20, so it wraps
        assert_eq!((list.edicts()[2].x, list.edicts()[2].y), (0, 8));
        assert_eq!((list.width, list.height), (16, 16));

        // Unknown characters fall back to the space glyph
        let list = DrawList::layout_text("A?", 100, &gm, glyph);
        assert_eq!(list.edicts()[1].graphic, space);
        assert_eq!(list.width, 12);
    }

    #[test]
    fn test_clear_resets_size() {
        let mut list = DrawList::new();
        list.add(GraphicId(0), 1, 2);
        list.width = 10;
        list.clear();
        assert!(list.is_empty());
        assert_eq!((list.width, list.height), (0, 0));
    }

    #[test]
    fn test_append_splits_lines() {
        let mut cache = LineCache::new(16);
        assert!(cache.is_empty());
        cache.append("hello ");
        cache.append("world\nsecond\n");
        let lines: Vec<&str> = cache.lines().collect();
        assert_eq!(lines, vec!["hello world", "second", ""]);
    }

    #[test]
    fn test_ring_drops_oldest() {
        let mut cache = LineCache::new(3);
        cache.append("a\nb\nc\nd");
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.line(0), Some("b"));
        assert_eq!(cache.line(2), Some("d"));
    }

    #[test]
    fn test_append_invalidates_drawer() {
        let mut cache = LineCache::new(8);
        cache.append("abc");
        cache.drawer(0, 320, |_, _| DrawList::new());
        assert!(cache.is_cached(0));
        cache.append("d");
        assert!(!cache.is_cached(0));
    }

    #[test]
    fn test_drawer_survives_resolution_change() {
        let mut cache = LineCache::new(8);
        cache.append("status\n");

        let built_width = cache
            .drawer(0, 320, |_, w| DrawList { width: w, ..DrawList::new() })
            .map(|d| d.width);
        assert_eq!(built_width, Some(320));

        // Asking again at a new width hands back the stale list
        let mut rebuilt = false;
        let again = cache
            .drawer(0, 640, |_, w| {
                rebuilt = true;
                DrawList { width: w, ..DrawList::new() }
            })
            .map(|d| d.width);
        assert!(!rebuilt);
        assert_eq!(again, Some(320));

        cache.clear();
        assert!(!cache.is_cached(0));
    }
}
