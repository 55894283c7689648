//! # World Module
//!
//! This module provides `SpatialIndex`, which partitions the unbounded world into
//! a sparse set of cubic chunks and keeps a bounded octree alongside them.
//!
//! ## Two Views of Space
//!
//! - The chunk map is a hash map from chunk coordinate to `DensityChunk`. It is
//!   the only view deformation and eviction rely on, and lookups are O(1).
//! - The octree covers a fixed root volume around the origin and answers
//!   point-containment and region queries. It holds no voxel data.
//!
//! The two never reference each other.
//!
//! ## Chunk Ownership
//!
//! Chunk `(x, y, z)` covers the closed world box
//! `[x * size, (x + 1) * size]` (and likewise for y and z). Neighbouring chunks
//! share their common face, so a world point on a chunk boundary belongs to every
//! chunk touching that face.

use std::collections::HashMap;

use cgmath::{Point3, Vector3};
use log::debug;
use noise::NoiseFn;
use web_time::Instant;

use crate::engine_state::config::TerrainConfig;

use super::{
    bounds::Aabb,
    chunk::{ChunkCoord, DensityChunk},
    octree::Octree,
};

/// Sparse chunk storage plus a bounded octree.
pub struct SpatialIndex {
    /// A mapping from chunk coordinates to chunk data.
    chunks: HashMap<ChunkCoord, DensityChunk>,
    /// Region index over the configured root volume.
    octree: Octree,
    chunk_size: f32,
}

impl SpatialIndex {
    /// Creates an empty index for the given configuration.
    pub fn new(config: &TerrainConfig) -> Self {
        SpatialIndex {
            chunks: HashMap::new(),
            octree: Octree::new(
                Point3::new(0.0, 0.0, 0.0),
                config.octree_half_size,
                config.octree_max_depth,
            ),
            chunk_size: config.chunk_size,
        }
    }

    /// Edge length of every chunk.
    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Coordinate of the chunk whose half-open box `[c * size, (c + 1) * size)`
    /// contains `point`.
    pub fn world_to_chunk(&self, point: Point3<f32>) -> ChunkCoord {
        Point3::new(
            (point.x / self.chunk_size).floor() as i32,
            (point.y / self.chunk_size).floor() as i32,
            (point.z / self.chunk_size).floor() as i32,
        )
    }

    /// World-space box covered by the chunk at `coord`.
    pub fn chunk_bounds(&self, coord: ChunkCoord) -> Aabb {
        let s = self.chunk_size;
        let min = Point3::new(coord.x as f32 * s, coord.y as f32 * s, coord.z as f32 * s);
        Aabb::new(min, min + Vector3::new(s, s, s))
    }

    /// Inclusive chunk coordinate range whose closed boxes intersect `region`.
    ///
    /// Chunks that only share a face with the region are included, since their
    /// boundary samples lie inside it. Returns `None` when the range does not fit
    /// in chunk coordinates, or the region is not a finite box.
    pub fn overlap_range(&self, region: &Aabb) -> Option<(ChunkCoord, ChunkCoord)> {
        let (x0, x1) = self.axis_range(region.min.x, region.max.x)?;
        let (y0, y1) = self.axis_range(region.min.y, region.max.y)?;
        let (z0, z1) = self.axis_range(region.min.z, region.max.z)?;
        Some((Point3::new(x0, y0, z0), Point3::new(x1, y1, z1)))
    }

    fn axis_range(&self, min: f32, max: f32) -> Option<(i32, i32)> {
        let lo = (f64::from(min) / f64::from(self.chunk_size)).ceil() - 1.0;
        let hi = (f64::from(max) / f64::from(self.chunk_size)).floor();
        let representable = |v: f64| (i32::MIN as f64..=i32::MAX as f64).contains(&v);
        (representable(lo) && representable(hi) && lo <= hi).then(|| (lo as i32, hi as i32))
    }

    /// Number of chunk coordinates [`chunks_overlapping`](Self::chunks_overlapping)
    /// would return, computed without enumerating them.
    pub fn overlap_count(&self, region: &Aabb) -> u64 {
        let Some((lo, hi)) = self.overlap_range(region) else {
            return 0;
        };
        let span = |a: i32, b: i32| (i64::from(b) - i64::from(a) + 1) as u64;
        span(lo.x, hi.x)
            .saturating_mul(span(lo.y, hi.y))
            .saturating_mul(span(lo.z, hi.z))
    }

    /// Every chunk coordinate in [`overlap_range`](Self::overlap_range), whether or
    /// not the chunk exists yet.
    pub fn chunks_overlapping(&self, region: &Aabb) -> Vec<ChunkCoord> {
        let Some((lo, hi)) = self.overlap_range(region) else {
            return Vec::new();
        };

        let mut coords = Vec::new();
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    coords.push(Point3::new(x, y, z));
                }
            }
        }
        coords
    }

    /// Returns the chunk at `coord`, generating it from `noise` first if it does
    /// not exist yet.
    ///
    /// # Returns
    /// The chunk and whether it was created by this call.
    pub fn get_or_generate(
        &mut self,
        coord: ChunkCoord,
        config: &TerrainConfig,
        noise: &impl NoiseFn<f64, 3>,
        now: Instant,
    ) -> (&mut DensityChunk, bool) {
        let mut created = false;
        let chunk = self.chunks.entry(coord).or_insert_with(|| {
            created = true;
            let mut chunk = DensityChunk::new(coord, config, now);
            chunk.generate(noise);
            debug!("Created chunk {:?}", coord);
            chunk
        });
        (chunk, created)
    }

    /// Inserts a chunk, replacing any chunk at the same coordinate.
    pub fn insert(&mut self, chunk: DensityChunk) -> Option<DensityChunk> {
        self.chunks.insert(chunk.coord, chunk)
    }

    /// Whether a chunk exists at `coord`.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// The chunk at `coord`, if loaded.
    pub fn get(&self, coord: ChunkCoord) -> Option<&DensityChunk> {
        self.chunks.get(&coord)
    }

    /// Mutable access to the chunk at `coord`, if loaded.
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut DensityChunk> {
        self.chunks.get_mut(&coord)
    }

    /// Removes and returns the chunk at `coord`.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<DensityChunk> {
        self.chunks.remove(&coord)
    }

    /// Number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks are loaded.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterates over every loaded chunk.
    pub fn iter(&self) -> impl Iterator<Item = &DensityChunk> {
        self.chunks.values()
    }

    /// Iterates mutably over every loaded chunk.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DensityChunk> {
        self.chunks.values_mut()
    }

    /// The octree view.
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Mutable access to the octree view.
    pub fn octree_mut(&mut self) -> &mut Octree {
        &mut self.octree
    }

    /// Drops every chunk and collapses the octree.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.octree.clear();
    }
}
