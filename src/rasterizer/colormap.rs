//! Colormaps and remap tables
//!
//! Light-level colormaps, the player colour translations and the fuzz
//! offset pattern used by the column drawers.

use std::fmt;

use super::buffer::Palette;

/// A single 256-entry index remap
pub type ColorTable = [u8; 256];

/// Number of light levels in a stock COLORMAP lump
pub const NUM_LIGHT_LEVELS: usize = 32;

/// Light level the fuzz effect reads through
pub const FUZZ_COLORMAP: usize = 6;

/// Length of the fuzz offset pattern
pub const FUZZ_TABLE_LEN: usize = 50;

/// Fuzz pattern: +1 reads the row below, -1 the row above. Scaled by the
/// destination stride at draw time.
pub const FUZZ_OFFSETS: [i8; FUZZ_TABLE_LEN] = [
    1, -1, 1, -1, 1, 1, -1,
    1, 1, -1, 1, 1, 1, -1,
    1, 1, 1, -1, -1, -1, -1,
    1, -1, -1, 1, 1, 1, 1, -1,
    1, -1, 1, 1, -1, -1, 1,
    1, -1, -1, -1, -1, 1, 1,
    1, 1, -1, 1, 1, -1, 1,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColormapError {
    /// Blob length is zero or not a multiple of 256
    BadLength(usize),
}

impl fmt::Display for ColormapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColormapError::BadLength(n) => {
                write!(f, "colormap blob of {} bytes is not a whole number of tables", n)
            }
        }
    }
}

impl std::error::Error for ColormapError {}

/// Stack of light-level tables, brightest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colormaps {
    tables: Vec<ColorTable>,
}

impl Colormaps {
    /// Parse a COLORMAP-style blob of N * 256 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ColormapError> {
        if bytes.is_empty() || bytes.len() % 256 != 0 {
            return Err(ColormapError::BadLength(bytes.len()));
        }
        let tables = bytes
            .chunks_exact(256)
            .map(|chunk| {
                let mut t = [0u8; 256];
                t.copy_from_slice(chunk);
                t
            })
            .collect();
        Ok(Self { tables })
    }

    /// Build `levels` darkening ramps for a palette. Level 0 is the palette
    /// itself, the last level is close to black.
    pub fn generate(palette: &Palette, levels: usize) -> Self {
        let levels = levels.max(1);
        let mut tables = Vec::with_capacity(levels);
        for level in 0..levels {
            let scale = (levels - level) as f32 / levels as f32;
            let mut table = [0u8; 256];
            for (i, slot) in table.iter_mut().enumerate() {
                let [r, g, b] = palette.rgb(i as u8);
                *slot = palette.nearest(
                    (r as f32 * scale) as u8,
                    (g as f32 * scale) as u8,
                    (b as f32 * scale) as u8,
                );
            }
            tables.push(table);
        }
        Self { tables }
    }

    /// One table that maps every index to itself
    pub fn identity() -> Self {
        Self {
            tables: vec![identity_table()],
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table for a light level; levels past the end use the darkest table
    pub fn get(&self, level: usize) -> &ColorTable {
        let last = self.tables.len() - 1;
        &self.tables[level.min(last)]
    }
}

pub fn identity_table() -> ColorTable {
    let mut t = [0u8; 256];
    for (i, slot) in t.iter_mut().enumerate() {
        *slot = i as u8;
    }
    t
}

/// The three player translations: green ramp to gray, brown and red
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTables {
    tables: [ColorTable; 3],
}

impl TranslationTables {
    pub fn new() -> Self {
        let mut tables = [identity_table(); 3];
        for i in 0x70..=0x7Fusize {
            let n = (i & 0x0F) as u8;
            tables[0][i] = 0x60 | n;
            tables[1][i] = 0x40 | n;
            tables[2][i] = 0x20 | n;
        }
        Self { tables }
    }

    /// Translation for a player colour index (0..3). Out of range wraps.
    pub fn get(&self, which: usize) -> &ColorTable {
        &self.tables[which % 3]
    }
}

impl Default for TranslationTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_ramps() {
        let t = TranslationTables::new();
        assert_eq!(t.get(0)[0x70], 0x60);
        assert_eq!(t.get(1)[0x75], 0x45);
        assert_eq!(t.get(2)[0x7F], 0x2F);
        // Everything outside the green ramp is untouched
        for i in (0..0x70).chain(0x80..256) {
            assert_eq!(t.get(0)[i], i as u8);
            assert_eq!(t.get(2)[i], i as u8);
        }
    }

    #[test]
    fn test_fuzz_table_shape() {
        assert_eq!(FUZZ_OFFSETS.len(), 50);
        assert!(FUZZ_OFFSETS.iter().all(|&o| o == 1 || o == -1));
    }

    #[test]
    fn test_from_bytes_lengths() {
        assert_eq!(Colormaps::from_bytes(&[]), Err(ColormapError::BadLength(0)));
        assert_eq!(Colormaps::from_bytes(&[0; 300]), Err(ColormapError::BadLength(300)));
        let maps = Colormaps::from_bytes(&[7; 512]).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps.get(1)[0], 7);
        // Past the end clamps to the darkest table
        assert_eq!(maps.get(99)[3], 7);
    }

    #[test]
    fn test_generate_darkens() {
        let pal = Palette::grayscale();
        let maps = Colormaps::generate(&pal, NUM_LIGHT_LEVELS);
        assert_eq!(maps.len(), NUM_LIGHT_LEVELS);
        assert_eq!(maps.get(0)[200], 200);
        assert!(maps.get(16)[200] < 200);
        assert!(maps.get(31)[200] < maps.get(16)[200]);
    }
}
