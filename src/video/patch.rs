//! Patch codec
//!
//! Column-major, run-length encoded sprite format. A patch starts with a
//! small header and a table of column offsets; each column is a list of
//! posts (`topdelta, length, pad, pixels[length], pad`) ending in 0xFF.

use std::fmt;

use crate::rasterizer::{Palette, PalettedBuffer, RgbaBuffer};

const HEADER_BYTES: usize = 8;
const POST_END: u8 = 0xFF;

/// Error while reading or writing a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Data ends before the header or column table does
    Truncated { needed: usize, len: usize },
    /// Negative or zero size in the header
    BadDimensions { width: i32, height: i32 },
    /// Column offset table does not match the width
    ColumnCount { expected: usize, got: usize },
    /// A column offset points outside the data
    BadColumnOffset { column: usize, offset: usize },
    /// A post runs past the end of the data or has no terminator
    PostPastEnd { column: usize, offset: usize },
    /// A post extends below the patch height
    PostOutOfBounds { column: usize, top: usize, length: usize },
    /// Image too large for the classic post encoding
    TooLarge { width: usize, height: usize },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Truncated { needed, len } => {
                write!(f, "patch truncated: need {} bytes, have {}", needed, len)
            }
            PatchError::BadDimensions { width, height } => {
                write!(f, "bad patch size {}x{}", width, height)
            }
            PatchError::ColumnCount { expected, got } => {
                write!(f, "expected {} column offsets, got {}", expected, got)
            }
            PatchError::BadColumnOffset { column, offset } => {
                write!(f, "column {} offset {} is outside the patch", column, offset)
            }
            PatchError::PostPastEnd { column, offset } => {
                write!(f, "column {} post at {} runs past the end of the patch", column, offset)
            }
            PatchError::PostOutOfBounds { column, top, length } => {
                write!(
                    f,
                    "column {} post {}+{} extends below the patch",
                    column, top, length
                )
            }
            PatchError::TooLarge { width, height } => {
                write!(f, "{}x{} image cannot be stored as a patch", width, height)
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// Fixed part of a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchHeader {
    pub width: i32,
    pub height: i32,
    pub left_offset: i32,
    pub top_offset: i32,
    pub column_offsets: Vec<u32>,
}

impl PatchHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, PatchError> {
        if bytes.len() < HEADER_BYTES {
            return Err(PatchError::Truncated {
                needed: HEADER_BYTES,
                len: bytes.len(),
            });
        }
        let short = |at: usize| i16::from_le_bytes([bytes[at], bytes[at + 1]]) as i32;
        let width = short(0);
        let height = short(2);
        if width <= 0 || height <= 0 {
            return Err(PatchError::BadDimensions { width, height });
        }

        let table_end = HEADER_BYTES + width as usize * 4;
        if bytes.len() < table_end {
            return Err(PatchError::Truncated {
                needed: table_end,
                len: bytes.len(),
            });
        }
        let column_offsets = bytes[HEADER_BYTES..table_end]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self {
            width,
            height,
            left_offset: short(4),
            top_offset: short(6),
            column_offsets,
        })
    }
}

/// A decoded patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub width: i32,
    pub height: i32,
    pub left_offset: i32,
    pub top_offset: i32,
    pub pixels: RgbaBuffer,
}

impl Patch {
    /// Read the header and column table, then decode every column
    pub fn parse(bytes: &[u8], palette: &Palette) -> Result<Self, PatchError> {
        let header = PatchHeader::parse(bytes)?;
        let pixels = decode_patch(
            bytes,
            &header.column_offsets,
            header.width as usize,
            header.height as usize,
            palette,
        )?;
        Ok(Self {
            width: header.width,
            height: header.height,
            left_offset: header.left_offset,
            top_offset: header.top_offset,
            pixels,
        })
    }
}

/// Expand patch posts into a fresh RGBA buffer. Drawn pixels get alpha 0xFF,
/// gaps between posts stay fully transparent.
pub fn decode_patch(
    bytes: &[u8],
    column_offsets: &[u32],
    width: usize,
    height: usize,
    palette: &Palette,
) -> Result<RgbaBuffer, PatchError> {
    if column_offsets.len() != width {
        return Err(PatchError::ColumnCount {
            expected: width,
            got: column_offsets.len(),
        });
    }

    let mut out = RgbaBuffer::new(width, height);
    let row_bytes = width * 4;
    let pixels = out.pixels_mut();

    for (column, &start) in column_offsets.iter().enumerate() {
        let mut at = start as usize;
        if at >= bytes.len() {
            return Err(PatchError::BadColumnOffset { column, offset: at });
        }

        loop {
            let topdelta = *bytes
                .get(at)
                .ok_or(PatchError::PostPastEnd { column, offset: at })?;
            if topdelta == POST_END {
                break;
            }
            let length = *bytes
                .get(at + 1)
                .ok_or(PatchError::PostPastEnd { column, offset: at })? as usize;

            let top = topdelta as usize;
            if top + length > height {
                return Err(PatchError::PostOutOfBounds { column, top, length });
            }

            // Pixels sit after topdelta, length and a pad byte
            let source = bytes
                .get(at + 3..at + 3 + length)
                .ok_or(PatchError::PostPastEnd { column, offset: at })?;

            let mut dest = top * row_bytes + column * 4;
            for &index in source {
                let [r, g, b] = palette.rgb(index);
                pixels[dest..dest + 4].copy_from_slice(&[r, g, b, 0xFF]);
                dest += row_bytes;
            }

            at += length + 4;
        }
    }

    Ok(out)
}

/// Build a patch from an indexed image. Pixels equal to `transparent`
/// become gaps between posts.
pub fn encode_patch(
    image: &PalettedBuffer,
    transparent: u8,
    left_offset: i16,
    top_offset: i16,
) -> Result<Vec<u8>, PatchError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 || width > i16::MAX as usize || height > 255 {
        return Err(PatchError::TooLarge { width, height });
    }

    let mut columns: Vec<Vec<u8>> = Vec::with_capacity(width);
    for x in 0..width {
        let mut column = Vec::new();
        let mut y = 0;
        while y < height {
            if image.get(x, y) == transparent {
                y += 1;
                continue;
            }
            let top = y;
            while y < height && image.get(x, y) != transparent {
                y += 1;
            }
            column.push(top as u8);
            column.push((y - top) as u8);
            column.push(0);
            column.extend((top..y).map(|row| image.get(x, row)));
            column.push(0);
        }
        column.push(POST_END);
        columns.push(column);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&(width as i16).to_le_bytes());
    out.extend_from_slice(&(height as i16).to_le_bytes());
    out.extend_from_slice(&left_offset.to_le_bytes());
    out.extend_from_slice(&top_offset.to_le_bytes());

    let mut offset = HEADER_BYTES + width * 4;
    for column in &columns {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += column.len();
    }
    for column in columns {
        out.extend(column);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1x4 patch with one post of two pixels starting at row 1
    fn one_post_patch() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&1i16.to_le_bytes());
        b.extend_from_slice(&4i16.to_le_bytes());
        b.extend_from_slice(&3i16.to_le_bytes());
        b.extend_from_slice(&(-2i16).to_le_bytes());
        b.extend_from_slice(&12u32.to_le_bytes());
        b.extend_from_slice(&[1, 2, 0, 10, 20, 0, 0xFF]);
        b
    }

    #[test]
    fn test_decode_one_post() {
        let pal = Palette::grayscale();
        let patch = Patch::parse(&one_post_patch(), &pal).unwrap();
        assert_eq!((patch.width, patch.height), (1, 4));
        assert_eq!((patch.left_offset, patch.top_offset), (3, -2));

        let px = &patch.pixels;
        assert_eq!(px.get(0, 0), [0, 0, 0, 0]);
        assert_eq!(px.get(0, 1), [10, 10, 10, 0xFF]);
        assert_eq!(px.get(0, 2), [20, 20, 20, 0xFF]);
        assert_eq!(px.get(0, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn test_multiple_posts_per_column() {
        let mut img = PalettedBuffer::new(2, 6);
        img.fill(0);
        img.set(0, 0, 5);
        img.set(0, 4, 6);
        img.set(0, 5, 7);
        img.set(1, 2, 8);
        let bytes = encode_patch(&img, 0, 0, 0).unwrap();

        let pal = Palette::grayscale();
        let patch = Patch::parse(&bytes, &pal).unwrap();
        let px = &patch.pixels;
        assert_eq!(px.get(0, 0), [5, 5, 5, 0xFF]);
        assert_eq!(px.get(0, 1)[3], 0);
        assert_eq!(px.get(0, 4), [6, 6, 6, 0xFF]);
        assert_eq!(px.get(0, 5), [7, 7, 7, 0xFF]);
        assert_eq!(px.get(1, 2), [8, 8, 8, 0xFF]);
        assert_eq!(px.get(1, 3)[3], 0);
    }

    #[test]
    fn test_fully_transparent_column() {
        let img = PalettedBuffer::new(3, 3);
        let bytes = encode_patch(&img, 0, 0, 0).unwrap();
        let patch = Patch::parse(&bytes, &Palette::grayscale()).unwrap();
        assert!(patch.pixels.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(
            PatchHeader::parse(&[1, 0, 1]),
            Err(PatchError::Truncated { needed: 8, len: 3 })
        );
        let mut b = one_post_patch();
        b[0] = 5; // claims five columns, offset table needs 28 bytes
        assert_eq!(b.len(), 19);
        assert_eq!(PatchHeader::parse(&b), Err(PatchError::Truncated { needed: 28, len: 19 }));
    }

    #[test]
    fn test_bad_dimensions() {
        let mut b = one_post_patch();
        b[2] = 0;
        assert!(matches!(PatchHeader::parse(&b), Err(PatchError::BadDimensions { .. })));
    }

    #[test]
    fn test_bad_column_offset() {
        let mut b = one_post_patch();
        b[8..12].copy_from_slice(&500u32.to_le_bytes());
        assert_eq!(
            Patch::parse(&b, &Palette::grayscale()),
            Err(PatchError::BadColumnOffset { column: 0, offset: 500 })
        );
    }

    #[test]
    fn test_post_below_height() {
        let mut b = one_post_patch();
        b[12] = 3; // topdelta 3 + length 2 > height 4
        assert_eq!(
            Patch::parse(&b, &Palette::grayscale()),
            Err(PatchError::PostOutOfBounds { column: 0, top: 3, length: 2 })
        );
    }

    #[test]
    fn test_missing_terminator() {
        let b = one_post_patch();
        let cut = &b[..b.len() - 1];
        assert!(matches!(
            Patch::parse(cut, &Palette::grayscale()),
            Err(PatchError::PostPastEnd { column: 0, .. })
        ));
    }

    #[test]
    fn test_encode_rejects_tall_images() {
        let img = PalettedBuffer::new(1, 300);
        assert_eq!(
            encode_patch(&img, 0, 0, 0),
            Err(PatchError::TooLarge { width: 1, height: 300 })
        );
    }
}
