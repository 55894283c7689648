//! Marching cubes surface extraction over a chunk's density grid.
//!
//! Each cell of the sample lattice is classified by which of its eight corners are
//! solid (density below the threshold). Crossed edges get one vertex each, placed
//! by linear interpolation, and the lookup tables stitch those vertices into
//! triangles.
//!
//! Vertices are keyed by the grid edge they sit on, so the four cells sharing an
//! edge reuse a single vertex and the resulting mesh is closed wherever the surface
//! does not leave the chunk.

use std::collections::HashMap;

use bitvec::vec::BitVec;
use cgmath::{InnerSpace, Point3, Vector3};

use crate::engine_state::{
    rendering::Vertex,
    voxels::chunk::{chunk_iteration::ChunkLatticeIterator, DensityChunk},
};

use super::{
    mesh::Mesh,
    tables::{CORNER_OFFSETS, EDGE_CONNECTIONS, EDGE_TABLE, TRI_TABLE},
};

/// A grid edge, named by its lower sample's flat index and the axis it runs along.
type EdgeKey = (usize, u8);

/// Read-only view of a chunk's samples with the lattice arithmetic attached.
struct SampleGrid<'a> {
    densities: &'a [f32],
    n: usize,
}

impl SampleGrid<'_> {
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.n * y + self.n * self.n * z
    }

    fn at(&self, x: usize, y: usize, z: usize) -> f32 {
        self.densities[self.index(x, y, z)]
    }

    /// Density gradient at a sample, central differences inside the grid and
    /// one-sided differences on its faces.
    fn gradient(&self, p: Point3<usize>) -> Vector3<f32> {
        let last = self.n - 1;
        let axis = |lo: f32, hi: f32, span: usize| (hi - lo) / span.max(1) as f32;

        let (x0, x1) = (p.x.saturating_sub(1), (p.x + 1).min(last));
        let (y0, y1) = (p.y.saturating_sub(1), (p.y + 1).min(last));
        let (z0, z1) = (p.z.saturating_sub(1), (p.z + 1).min(last));

        Vector3::new(
            axis(self.at(x0, p.y, p.z), self.at(x1, p.y, p.z), x1 - x0),
            axis(self.at(p.x, y0, p.z), self.at(p.x, y1, p.z), y1 - y0),
            axis(self.at(p.x, p.y, z0), self.at(p.x, p.y, z1), z1 - z0),
        )
    }
}

/// Extracts the `threshold` isosurface of `chunk`.
///
/// # Returns
/// `None` when every sample lies on the same side of the threshold, otherwise the
/// triangulated surface in world coordinates. Vertex normals follow the density
/// gradient and point from solid towards air, and every triangle is wound
/// counter-clockwise when seen from the air side.
pub fn marching_cubes(chunk: &DensityChunk, threshold: f32) -> Option<Mesh> {
    let n = chunk.samples_per_axis();
    if n < 2 {
        return None;
    }

    let grid = SampleGrid {
        densities: chunk.densities(),
        n,
    };

    let solid: BitVec = grid.densities.iter().map(|d| *d < threshold).collect();
    if solid.not_any() || solid.all() {
        return None;
    }

    let mut mesh = Mesh::new();
    let mut edge_vertices: HashMap<EdgeKey, u32> = HashMap::new();

    for (cell, _) in ChunkLatticeIterator::new(n - 1) {
        let corners: [Point3<usize>; 8] = std::array::from_fn(|i| {
            let [dx, dy, dz] = CORNER_OFFSETS[i];
            Point3::new(cell.x + dx, cell.y + dy, cell.z + dz)
        });

        let mut cube_index = 0usize;
        for (i, corner) in corners.iter().enumerate() {
            if solid[grid.index(corner.x, corner.y, corner.z)] {
                cube_index |= 1 << i;
            }
        }

        let crossed = EDGE_TABLE[cube_index];
        if crossed == 0 {
            continue;
        }

        let mut cell_vertices = [0u32; 12];
        for (edge, [c0, c1]) in EDGE_CONNECTIONS.iter().enumerate() {
            if crossed & (1 << edge) == 0 {
                continue;
            }
            cell_vertices[edge] = edge_vertex(
                &grid,
                chunk,
                threshold,
                corners[*c0],
                corners[*c1],
                &mut edge_vertices,
                &mut mesh,
            );
        }

        for triple in TRI_TABLE[cube_index].chunks_exact(3) {
            if triple[0] < 0 {
                break;
            }
            let triangle = [
                cell_vertices[triple[0] as usize],
                cell_vertices[triple[1] as usize],
                cell_vertices[triple[2] as usize],
            ];
            push_triangle(&mut mesh, triangle);
        }
    }

    Some(mesh)
}

/// Returns the vertex on the edge between two adjacent samples, creating it on
/// first use.
fn edge_vertex(
    grid: &SampleGrid,
    chunk: &DensityChunk,
    threshold: f32,
    a: Point3<usize>,
    b: Point3<usize>,
    cache: &mut HashMap<EdgeKey, u32>,
    mesh: &mut Mesh,
) -> u32 {
    // Always interpolate from the lower sample so shared edges agree exactly.
    let (lo, hi) = if (a.x, a.y, a.z) <= (b.x, b.y, b.z) { (a, b) } else { (b, a) };
    let axis = if lo.x != hi.x {
        0
    } else if lo.y != hi.y {
        1
    } else {
        2
    };
    let key = (grid.index(lo.x, lo.y, lo.z), axis);

    *cache.entry(key).or_insert_with(|| {
        let v0 = grid.at(lo.x, lo.y, lo.z);
        let v1 = grid.at(hi.x, hi.y, hi.z);
        let t = if (v1 - v0).abs() > f32::EPSILON {
            ((threshold - v0) / (v1 - v0)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let p0 = chunk.world_position(lo);
        let p1 = chunk.world_position(hi);
        let position = p0 + (p1 - p0) * t;
        let normal = grid.gradient(lo) * (1.0 - t) + grid.gradient(hi) * t;

        mesh.vertices.push(Vertex::new(position, normal));
        (mesh.vertices.len() - 1) as u32
    })
}

/// Appends a triangle, flipping its winding if it faces into the solid.
fn push_triangle(mesh: &mut Mesh, [a, b, c]: [u32; 3]) {
    let va = &mesh.vertices[a as usize];
    let vb = &mesh.vertices[b as usize];
    let vc = &mesh.vertices[c as usize];

    let face = (vb.point() - va.point()).cross(vc.point() - va.point());
    let outward = Vector3::from(va.normal) + Vector3::from(vb.normal) + Vector3::from(vc.normal);

    if face.dot(outward) < 0.0 {
        mesh.indices.extend_from_slice(&[a, c, b]);
    } else {
        mesh.indices.extend_from_slice(&[a, b, c]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::TerrainConfig;
    use approx::assert_abs_diff_eq;
    use cgmath::MetricSpace;
    use web_time::Instant;

    fn unit_chunk(fill: impl FnMut(Point3<f32>) -> f32) -> DensityChunk {
        let config = TerrainConfig {
            chunk_size: 4.0,
            voxel_resolution: 1.0,
            ..Default::default()
        };
        let mut chunk = DensityChunk::new(Point3::new(0, 0, 0), &config, Instant::now());
        chunk.fill_with(fill);
        chunk
    }

    #[test]
    fn uniform_fields_have_no_surface() {
        assert!(marching_cubes(&unit_chunk(|_| 1.0), 0.5).is_none());
        assert!(marching_cubes(&unit_chunk(|_| -1.0), 0.5).is_none());
    }

    #[test]
    fn single_solid_sample_gives_closed_octahedron() {
        let centre = Point3::new(2.0, 2.0, 2.0);
        let chunk = unit_chunk(|p| if p == centre { -1.0 } else { 1.0 });
        let mesh = marching_cubes(&chunk, 0.5).unwrap();

        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(mesh.vertices.len(), 6);

        // Every undirected edge must be shared by exactly two triangles.
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for [a, b, c] in mesh.triangles() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edges.entry((u.min(v), u.max(v))).or_default() += 1;
            }
        }
        assert_eq!(edges.len(), 12);
        assert!(edges.values().all(|count| *count == 2));

        for vertex in &mesh.vertices {
            assert_abs_diff_eq!(vertex.point().distance(centre), 0.75, epsilon = 1e-5);
            // Normals point away from the solid sample.
            let outward = vertex.point() - centre;
            assert!(Vector3::from(vertex.normal).dot(outward) > 0.0);
        }
    }

    #[test]
    fn horizontal_ground_is_flat_with_upward_normals() {
        let chunk = unit_chunk(|p| p.y - 1.0);
        let mesh = marching_cubes(&chunk, 0.5).unwrap();

        assert_eq!(mesh.triangle_count(), 32);
        assert_eq!(mesh.vertices.len(), 25);
        for vertex in &mesh.vertices {
            assert_abs_diff_eq!(vertex.position[1], 1.5, epsilon = 1e-6);
            assert_abs_diff_eq!(vertex.normal[1], 1.0, epsilon = 1e-6);
        }
        for [a, b, c] in mesh.triangles() {
            let pa = mesh.vertices[a as usize].point();
            let pb = mesh.vertices[b as usize].point();
            let pc = mesh.vertices[c as usize].point();
            assert!((pb - pa).cross(pc - pa).y > 0.0);
        }

        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 1.5, 0.0));
        assert_eq!(bounds.max, Point3::new(4.0, 1.5, 4.0));
        assert_eq!(mesh.index_bytes().len(), mesh.indices.len() * 4);
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertices.len() * 24);
    }
}
