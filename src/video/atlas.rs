//! Shelf texture atlas
//!
//! Packs rectangles into a fixed-size page using horizontal shelves. Each
//! shelf takes the height of the first rectangle placed on it. Placement is
//! first fit: the first shelf that is tall enough and has room left wins,
//! otherwise a new shelf opens below the last one. Entries are never moved
//! or evicted.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use log::debug;

/// Where a rectangle landed in the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasEntry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub xoff: i32,
    pub yoff: i32,
}

impl AtlasEntry {
    /// Normalized texture coordinates `[u0, v0, u1, v1]`
    pub fn uv(&self, atlas_w: i32, atlas_h: i32) -> [f32; 4] {
        let aw = atlas_w as f32;
        let ah = atlas_h as f32;
        [
            self.x as f32 / aw,
            self.y as f32 / ah,
            (self.x + self.w) as f32 / aw,
            (self.y + self.h) as f32 / ah,
        ]
    }

    fn overlaps(&self, other: &AtlasEntry) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// A horizontal strip of the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasShelf {
    /// Width already used
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtlasError {
    /// No shelf and no vertical space left for the rectangle
    Full { w: i32, h: i32 },
    /// The rectangle is larger than the whole atlas
    Oversized { w: i32, h: i32 },
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasError::Full { w, h } => write!(f, "no space left in texture atlas for {}x{}", w, h),
            AtlasError::Oversized { w, h } => write!(f, "{}x{} is too big for the texture atlas", w, h),
        }
    }
}

impl std::error::Error for AtlasError {}

#[derive(Debug, Clone)]
pub struct Atlas<K> {
    width: i32,
    height: i32,
    entries: HashMap<K, AtlasEntry>,
    shelves: Vec<AtlasShelf>,
}

impl<K: Eq + Hash + Clone> Atlas<K> {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            entries: HashMap::new(),
            shelves: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn shelves(&self) -> &[AtlasShelf] {
        &self.shelves
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Place a rectangle for `key`. If the key is already present its
    /// existing entry is returned and nothing changes.
    pub fn add(&mut self, key: K, w: i32, h: i32, xoff: i32, yoff: i32) -> Result<AtlasEntry, AtlasError> {
        if let Some(entry) = self.entries.get(&key) {
            return Ok(*entry);
        }

        if w > self.width || h > self.height || w < 0 || h < 0 {
            return Err(AtlasError::Oversized { w, h });
        }

        let mut y = 0;
        for shelf in self.shelves.iter_mut() {
            if h <= shelf.h && w <= self.width - shelf.w {
                let entry = AtlasEntry { x: shelf.w, y, w, h, xoff, yoff };
                shelf.w += w;
                self.entries.insert(key, entry);
                return Ok(entry);
            }
            y += shelf.h;
        }

        if h <= self.height - y {
            debug!("atlas: new shelf {} at y={} (h={})", self.shelves.len(), y, h);
            self.shelves.push(AtlasShelf { w, h });
            let entry = AtlasEntry { x: 0, y, w, h, xoff, yoff };
            self.entries.insert(key, entry);
            return Ok(entry);
        }

        Err(AtlasError::Full { w, h })
    }

    pub fn find(&self, key: &K) -> Option<AtlasEntry> {
        self.entries.get(key).copied()
    }

    pub fn check(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&K, &AtlasEntry)> {
        self.entries.iter()
    }

    /// True if no two entries share a texel
    pub fn is_disjoint(&self) -> bool {
        let all: Vec<&AtlasEntry> = self.entries.values().collect();
        all.iter().enumerate().all(|(i, a)| {
            all[i + 1..].iter().all(|b| !a.overlaps(b))
        })
    }
}
