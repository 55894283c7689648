//! Indexed triangle meshes produced by surface extraction.
//!
//! A mesh is a flat vertex buffer plus a `u32` index buffer, three indices per
//! triangle. Vertices on a shared grid edge are emitted once and referenced by
//! every triangle that uses them.

use crate::engine_state::{rendering::Vertex, voxels::bounds::Aabb};

/// Triangle geometry for one chunk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    /// The vertex data
    pub vertices: Vec<Vertex>,
    /// Three indices into `vertices` per triangle
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
    }

    /// Raw vertex buffer contents, ready for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index buffer contents, ready for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Box enclosing every vertex, usable as a coarse collision proxy.
    ///
    /// # Returns
    /// `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::enclosing(self.vertices.iter().map(Vertex::point))
    }
}
