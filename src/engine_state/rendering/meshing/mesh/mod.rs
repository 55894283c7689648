//! Mesh generation for density chunks.
//!
//! This module converts a chunk's density grid into an indexed triangle mesh using
//! marching cubes.
//!
//! # Architecture
//! - [`Mesh`]: Vertex and index buffers for one chunk
//! - [`marching_cubes`]: Isosurface extraction over a single chunk
//! - `tables`: The marching cubes edge and triangle lookup tables
//!
//! # Usage
//! ```no_run
//! use voxel_sculpt::{DensityChunk, TerrainConfig, marching_cubes};
//! use cgmath::Point3;
//! use web_time::Instant;
//!
//! let config = TerrainConfig::default();
//! let mut chunk = DensityChunk::new(Point3::new(0, 0, 0), &config, Instant::now());
//! chunk.fill_with(|p| p.y - 8.0);
//! let mesh = marching_cubes(&chunk, config.surface_threshold);
//! ```

mod marching_cubes;
mod mesh;
mod tables;

pub use marching_cubes::marching_cubes;
pub use mesh::*;
