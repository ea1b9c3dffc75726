//! Per-frame batches
//!
//! Growable vertex/index storage that is cleared after every frame but keeps
//! its allocation, so steady-state frames do not allocate.

/// Overlay vertex: NDC position and atlas texcoord
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Automap line queued for this frame, in map-rectangle fractions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapLineCmd {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: u8,
}

/// Screen-space overlay quad, recovered from the arena
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadRef {
    /// `[x0, y0, x1, y1]` in NDC
    pub ndc: [f32; 4],
    /// `[u0, v0, u1, v1]`
    pub uv: [f32; 4],
}

/// Quads per mesh chunk; keeps vertex indices inside u16
pub const QUADS_PER_MESH: usize = 512;

/// Overlay quads are stored as interleaved vertices plus six `u16` indices
/// per quad. Indices restart at zero every `QUADS_PER_MESH` quads, so each
/// chunk can be handed to the GPU as its own mesh.
#[derive(Debug, Default)]
pub struct FrameArena {
    pub vertices: Vec<QuadVertex>,
    pub indices: Vec<u16>,
    pub map_lines: Vec<MapLineCmd>,
}

/// Pixel coordinate to NDC (y up)
#[inline]
pub fn pixel_to_ndc(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    (x / width * 2.0 - 1.0, 1.0 - y / height * 2.0)
}

/// NDC back to pixels (y down)
#[inline]
pub fn ndc_to_pixel(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    ((x + 1.0) * 0.5 * width, (1.0 - y) * 0.5 * height)
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one quad: four corners clockwise from top left, two triangles
    pub fn push_quad(&mut self, ndc: [f32; 4], uv: [f32; 4]) {
        let base = (self.vertices.len() % (QUADS_PER_MESH * 4)) as u16;
        let [x0, y0, x1, y1] = ndc;
        let [u0, v0, u1, v1] = uv;
        self.vertices.extend_from_slice(&[
            QuadVertex { pos: [x0, y0], uv: [u0, v0] },
            QuadVertex { pos: [x1, y0], uv: [u1, v0] },
            QuadVertex { pos: [x1, y1], uv: [u1, v1] },
            QuadVertex { pos: [x0, y1], uv: [u0, v1] },
        ]);
        self.indices
            .extend([0u16, 1, 2, 2, 3, 0].iter().map(|i| base + i));
    }

    /// Vertex and index slices for each mesh chunk, in draw order
    pub fn mesh_chunks(&self) -> impl Iterator<Item = (&[QuadVertex], &[u16])> + '_ {
        self.vertices
            .chunks(QUADS_PER_MESH * 4)
            .zip(self.indices.chunks(QUADS_PER_MESH * 6))
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn quads(&self) -> impl Iterator<Item = QuadRef> + '_ {
        self.vertices.chunks_exact(4).map(|q| QuadRef {
            ndc: [q[0].pos[0], q[0].pos[1], q[2].pos[0], q[2].pos[1]],
            uv: [q[0].uv[0], q[0].uv[1], q[2].uv[0], q[2].uv[1]],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.map_lines.is_empty()
    }

    /// Drop this frame's contents, keeping capacity
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.map_lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_quad_layout() {
        let mut arena = FrameArena::new();
        arena.push_quad([-1.0, 1.0, 0.0, 0.0], [0.0, 0.0, 0.5, 0.5]);
        arena.push_quad([0.0, 0.0, 1.0, -1.0], [0.5, 0.5, 1.0, 1.0]);
        assert_eq!(arena.vertices.len(), 8);
        assert_eq!(arena.indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(arena.quad_count(), 2);

        let second = arena.quads().nth(1).unwrap();
        assert_eq!(second.ndc, [0.0, 0.0, 1.0, -1.0]);
        assert_eq!(second.uv, [0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_indices_restart_per_chunk() {
        let mut arena = FrameArena::new();
        for _ in 0..QUADS_PER_MESH + 1 {
            arena.push_quad([0.0; 4], [0.0; 4]);
        }
        let chunks: Vec<_> = arena.mesh_chunks().collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0.len(), QUADS_PER_MESH * 4);
        assert_eq!(chunks[0].1.len(), QUADS_PER_MESH * 6);
        assert_eq!(*chunks[0].1.iter().max().unwrap() as usize, QUADS_PER_MESH * 4 - 1);
        assert_eq!(chunks[1].0.len(), 4);
        assert_eq!(chunks[1].1, &[0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut arena = FrameArena::new();
        for _ in 0..100 {
            arena.push_quad([0.0; 4], [0.0; 4]);
        }
        arena.map_lines.push(MapLineCmd { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0, color: 2 });
        let cap = arena.vertices.capacity();
        let index_cap = arena.indices.capacity();
        arena.reset();
        assert!(arena.is_empty());
        assert!(arena.indices.is_empty());
        assert_eq!(arena.vertices.capacity(), cap);
        assert_eq!(arena.indices.capacity(), index_cap);
    }

    #[test]
    fn test_ndc_round_trip() {
        let (nx, ny) = pixel_to_ndc(80.0, 50.0, 320.0, 200.0);
        assert_eq!((nx, ny), (-0.5, 0.5));
        assert_eq!(ndc_to_pixel(nx, ny, 320.0, 200.0), (80.0, 50.0));
        assert_eq!(pixel_to_ndc(0.0, 0.0, 320.0, 200.0), (-1.0, 1.0));
    }
}
