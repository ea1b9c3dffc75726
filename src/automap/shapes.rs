//! Automap line characters
//!
//! Vector shapes drawn for players and things, in map units around the
//! origin, pointing east.

use super::clip::MapLine;
use crate::rasterizer::{FRACUNIT, Fixed};

pub const PLAYER_RADIUS: Fixed = 16 * FRACUNIT;

/// Map units per blockmap cell; the grid is drawn on cell edges
pub const MAP_BLOCK_UNITS: Fixed = 128 * FRACUNIT;

/// Things are drawn with the unit triangle scaled up to this size
pub const THING_SCALE: Fixed = 16 * FRACUNIT;

const R: Fixed = 8 * PLAYER_RADIUS / 7;

/// Arrow for the player, about one player diameter long
pub const PLAYER_ARROW: [MapLine; 7] = [
    MapLine::new(-R + R / 8, 0, R, 0),
    MapLine::new(R, 0, R - R / 2, R / 4),
    MapLine::new(R, 0, R - R / 2, -R / 4),
    MapLine::new(-R + R / 8, 0, -R - R / 8, R / 4),
    MapLine::new(-R + R / 8, 0, -R - R / 8, -R / 4),
    MapLine::new(-R + 3 * R / 8, 0, -R + R / 8, R / 4),
    MapLine::new(-R + 3 * R / 8, 0, -R + R / 8, -R / 4),
];

// 0.867, 0.5 and 0.7 in 16.16
const F867: Fixed = 56819;
const F5: Fixed = FRACUNIT / 2;
const F7: Fixed = 45875;

/// Equilateral unit triangle
pub const TRIANGLE_GUY: [MapLine; 3] = [
    MapLine::new(-F867, -F5, F867, -F5),
    MapLine::new(F867, -F5, 0, FRACUNIT),
    MapLine::new(0, FRACUNIT, -F867, -F5),
];

/// Narrow unit triangle pointing east
pub const THIN_TRIANGLE_GUY: [MapLine; 3] = [
    MapLine::new(-F5, -F7, FRACUNIT, 0),
    MapLine::new(FRACUNIT, 0, -F5, F7),
    MapLine::new(-F5, F7, -F5, -F7),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_points_east() {
        let tip = PLAYER_ARROW[0].b;
        assert!(PLAYER_ARROW.iter().all(|l| l.a.x <= tip.x && l.b.x <= tip.x));
        assert_eq!(tip.y, 0);
        // Symmetric about the x axis
        for pair in PLAYER_ARROW[1..].chunks(2) {
            assert_eq!(pair[0].b.y, -pair[1].b.y);
        }
    }

    #[test]
    fn test_triangles_closed() {
        for shape in [&TRIANGLE_GUY, &THIN_TRIANGLE_GUY] {
            for i in 0..shape.len() {
                assert_eq!(shape[i].b, shape[(i + 1) % shape.len()].a);
            }
        }
    }
}
