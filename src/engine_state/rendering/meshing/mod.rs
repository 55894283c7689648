//! Surface extraction for density chunks.
//!
//! This module turns the density grid of a dirty chunk into triangle geometry the
//! host renderer can upload. Extraction looks at one chunk at a time: the samples
//! chunks share on their common faces are what keeps neighbouring surfaces
//! aligned.
//!
//! # Architecture
//! - `SurfaceExtractor`: Holds the surface threshold and runs extraction with logging
//! - `mesh/`: The mesh type and the marching cubes implementation

use log::trace;
use web_time::Instant;

use crate::engine_state::voxels::chunk::DensityChunk;

mod mesh;

pub use mesh::*;

/// Extracts the surface `density = threshold` from chunks.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceExtractor {
    threshold: f32,
}

impl SurfaceExtractor {
    /// Creates an extractor for the given surface threshold.
    pub fn new(threshold: f32) -> Self {
        SurfaceExtractor { threshold }
    }

    /// The density value the surface is drawn at.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Triangulates the surface inside `chunk`.
    ///
    /// # Returns
    /// `None` if the chunk has no sign change across the threshold, meaning it is
    /// entirely solid or entirely air.
    pub fn extract(&self, chunk: &DensityChunk) -> Option<Mesh> {
        let start = Instant::now();
        let mesh = marching_cubes(chunk, self.threshold);
        trace!(
            "Extracted chunk {:?}: {} triangles in {:?}",
            chunk.coord,
            mesh.as_ref().map_or(0, Mesh::triangle_count),
            start.elapsed()
        );
        mesh
    }
}
