use crate::constants::QUAD_INDICES;
use crate::vertex::PackedVertex;

/// One layer's vertex and index buffers.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct MeshBuild {
    pub vertices: Vec<PackedVertex>,
    pub indices: Vec<u32>,
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across builds.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Pre-reserve capacity for approximately `n_quads` quads worth of data.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        self.vertices.reserve(n_quads * 4);
        self.indices.reserve(n_quads * QUAD_INDICES);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.indices.len() / QUAD_INDICES
    }

    /// Appends four vertices already in triangulation order; the quad is split along
    /// the `0-2` diagonal.
    #[inline]
    pub fn push_quad(&mut self, verts: [PackedVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&verts);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Raw bytes of the vertex buffer, ready for upload.
    #[inline]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
