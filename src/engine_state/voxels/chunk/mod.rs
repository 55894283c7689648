//! # Chunk Module
//!
//! This module provides `DensityChunk`, a fixed-size cube of world space holding
//! a dense grid of scalar density samples.
//!
//! ## Density Convention
//!
//! Negative density is solid, positive density is air, and the rendered surface
//! is wherever density crosses the configured threshold. Every stored sample is
//! clamped to `[-2, 2]`.
//!
//! ## Grid Layout
//!
//! A chunk of edge length `size` sampled every `resolution` units stores
//! `size / resolution + 1` samples per axis. The extra sample means neighbouring
//! chunks both hold the samples on their shared face. Brush strokes are applied
//! in world space to each chunk's own copy, so shared samples always agree and
//! surfaces meet without cracks.
//!
//! Samples are stored flat, x fastest, then y, then z:
//! `index = x + n * y + n * n * z`.

use std::sync::Arc;

use cgmath::{MetricSpace, Point3};
use chunk_iteration::ChunkLatticeIterator;
use noise::NoiseFn;
use web_time::Instant;

use crate::engine_state::{
    brush::BrushStroke, config::TerrainConfig, rendering::meshing::Mesh,
};

pub mod chunk_iteration;

/// Integer coordinate of a chunk in the chunk grid.
pub type ChunkCoord = Point3<i32>;

/// Lower clamp for stored densities.
pub const DENSITY_MIN: f32 = -2.0;
/// Upper clamp for stored densities.
pub const DENSITY_MAX: f32 = 2.0;
/// World height over which the generation bias changes by one.
pub const HEIGHT_BIAS_SCALE: f32 = 50.0;

/// Lifecycle stage of a chunk, as seen by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// No chunk exists at this coordinate.
    Unloaded,
    /// Densities generated, never extracted.
    Generated,
    /// Edited since the last extraction; waiting in the extraction queue.
    Dirty,
    /// Geometry is up to date.
    Extracted,
    /// Idle long enough that its geometry is fading out.
    Fading,
}

/// A cubic region of the density field together with its extracted geometry.
pub struct DensityChunk {
    /// Position of this chunk in chunk coordinates.
    pub coord: ChunkCoord,
    origin: Point3<f32>,
    size: f32,
    resolution: f32,
    samples_per_axis: usize,
    densities: Vec<f32>,
    dirty: bool,
    state: ChunkState,
    last_touched: Instant,
    fade_progress: f32,
    mesh: Option<Arc<Mesh>>,
}

impl DensityChunk {
    /// Creates a chunk at `coord` with every sample at the neutral density `0.0`.
    ///
    /// # Arguments
    /// * `coord` - Chunk coordinates of the new chunk
    /// * `config` - Supplies the chunk edge length and sample spacing
    /// * `now` - Initial last-touched time
    pub fn new(coord: ChunkCoord, config: &TerrainConfig, now: Instant) -> Self {
        let samples_per_axis = config.samples_per_axis();
        let size = config.chunk_size;

        DensityChunk {
            coord,
            origin: Point3::new(
                coord.x as f32 * size,
                coord.y as f32 * size,
                coord.z as f32 * size,
            ),
            size,
            resolution: config.voxel_resolution,
            samples_per_axis,
            densities: vec![0.0; samples_per_axis * samples_per_axis * samples_per_axis],
            dirty: false,
            state: ChunkState::Generated,
            last_touched: now,
            fade_progress: 0.0,
            mesh: None,
        }
    }

    /// Fills the grid from `noise` sampled at each world position, offset by the
    /// height bias `y / 50 - 1`.
    ///
    /// The bias makes density trend negative (solid) below `y = 50` and positive
    /// (air) above it, with the noise carving hills and caves around that level.
    pub fn generate(&mut self, noise: &impl NoiseFn<f64, 3>) {
        self.fill_with(|p| {
            let sample = noise.get([p.x as f64, p.y as f64, p.z as f64]) as f32;
            sample + (p.y / HEIGHT_BIAS_SCALE - 1.0)
        });
    }

    /// Sets every sample to `density_at(world_position)`, clamped.
    ///
    /// Generation does not dirty the chunk.
    pub fn fill_with(&mut self, mut density_at: impl FnMut(Point3<f32>) -> f32) {
        for (local, index) in ChunkLatticeIterator::new(self.samples_per_axis) {
            let world = self.world_position(local);
            self.densities[index] = density_at(world).clamp(DENSITY_MIN, DENSITY_MAX);
        }
    }

    /// World-space position of the sample at local grid coordinates.
    pub fn world_position(&self, local: Point3<usize>) -> Point3<f32> {
        Point3::new(
            self.origin.x + local.x as f32 * self.resolution,
            self.origin.y + local.y as f32 * self.resolution,
            self.origin.z + local.z as f32 * self.resolution,
        )
    }

    /// World-space position of the chunk's minimum corner.
    pub fn origin(&self) -> Point3<f32> {
        self.origin
    }

    /// Edge length in world units.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Spacing between samples in world units.
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Number of samples along each axis.
    pub fn samples_per_axis(&self) -> usize {
        self.samples_per_axis
    }

    /// The flat density grid, in storage order.
    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    fn index(&self, lx: i32, ly: i32, lz: i32) -> Option<usize> {
        let n = self.samples_per_axis as i32;
        if (0..n).contains(&lx) && (0..n).contains(&ly) && (0..n).contains(&lz) {
            Some((lx + n * ly + n * n * lz) as usize)
        } else {
            None
        }
    }

    /// Reads the sample at local coordinates, or `0.0` outside the grid.
    pub fn get_density(&self, lx: i32, ly: i32, lz: i32) -> f32 {
        self.index(lx, ly, lz)
            .map(|i| self.densities[i])
            .unwrap_or(0.0)
    }

    /// Writes a clamped sample at local coordinates and marks the chunk dirty.
    ///
    /// Writes outside the grid are ignored.
    pub fn set_density(&mut self, lx: i32, ly: i32, lz: i32, value: f32) {
        if let Some(i) = self.index(lx, ly, lz) {
            self.densities[i] = value.clamp(DENSITY_MIN, DENSITY_MAX);
            self.mark_dirty();
        }
    }

    /// Applies `stroke` to every sample of this chunk within its radius.
    ///
    /// Only the samples inside the stroke's bounding box are visited. Each one
    /// changes by `stroke.delta_at(distance)` and is clamped back into `[-2, 2]`.
    /// Samples on the rim, where the falloff reaches zero, are left alone. If any
    /// sample received a non-zero delta, the chunk is marked dirty and its
    /// last-touched time moves to `now`, cancelling any fade.
    ///
    /// # Returns
    /// The number of samples the stroke changed.
    pub fn deform(&mut self, stroke: &BrushStroke, now: Instant) -> usize {
        if stroke.is_degenerate() {
            return 0;
        }

        let bounds = stroke.bounds();
        let last = self.samples_per_axis as i32 - 1;
        let to_local_lo = |world: f32, origin: f32| {
            (((world - origin) / self.resolution).ceil() as i32).clamp(0, last + 1)
        };
        let to_local_hi = |world: f32, origin: f32| {
            (((world - origin) / self.resolution).floor() as i32).clamp(-1, last)
        };

        let lo = Point3::new(
            to_local_lo(bounds.min.x, self.origin.x),
            to_local_lo(bounds.min.y, self.origin.y),
            to_local_lo(bounds.min.z, self.origin.z),
        );
        let hi = Point3::new(
            to_local_hi(bounds.max.x, self.origin.x),
            to_local_hi(bounds.max.y, self.origin.y),
            to_local_hi(bounds.max.z, self.origin.z),
        );

        let mut affected = 0;
        for lz in lo.z..=hi.z {
            for ly in lo.y..=hi.y {
                for lx in lo.x..=hi.x {
                    let local = Point3::new(lx as usize, ly as usize, lz as usize);
                    let distance = self.world_position(local).distance(stroke.center);
                    let delta = stroke.delta_at(distance);
                    if delta == 0.0 {
                        continue;
                    }

                    let i = (lx + (last + 1) * ly + (last + 1) * (last + 1) * lz) as usize;
                    self.densities[i] = (self.densities[i] + delta).clamp(DENSITY_MIN, DENSITY_MAX);
                    affected += 1;
                }
            }
        }

        if affected > 0 {
            self.mark_dirty();
            self.touch(now);
        }
        affected
    }

    /// Whether the chunk changed since its geometry was last extracted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag without extracting.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Flags the chunk for re-extraction.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.state = ChunkState::Dirty;
    }

    /// Moves the last-touched time to `now` and cancels any fade in progress.
    pub fn touch(&mut self, now: Instant) {
        self.last_touched = now;
        self.fade_progress = 0.0;
        if self.state == ChunkState::Fading {
            self.state = ChunkState::Extracted;
        }
    }

    /// Time of the most recent edit.
    pub fn last_touched(&self) -> Instant {
        self.last_touched
    }

    /// Lifecycle stage of this chunk.
    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// How far the geometry has faded, `0.0` (opaque) to `1.0` (gone).
    pub fn fade_progress(&self) -> f32 {
        self.fade_progress
    }

    /// Records fade progress; any non-zero progress puts the chunk in `Fading`.
    pub fn set_fade_progress(&mut self, progress: f32) {
        self.fade_progress = progress.clamp(0.0, 1.0);
        if self.fade_progress > 0.0 && !self.dirty {
            self.state = ChunkState::Fading;
        }
    }

    /// The chunk's current geometry, if any.
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Installs freshly extracted geometry and clears the dirty flag.
    ///
    /// # Returns
    /// The geometry it replaces, if any.
    pub fn finish_extraction(&mut self, mesh: Option<Arc<Mesh>>) -> Option<Arc<Mesh>> {
        self.dirty = false;
        self.state = ChunkState::Extracted;
        std::mem::replace(&mut self.mesh, mesh)
    }

    /// Removes and returns the chunk's geometry.
    pub fn take_mesh(&mut self) -> Option<Arc<Mesh>> {
        self.mesh.take()
    }
}
