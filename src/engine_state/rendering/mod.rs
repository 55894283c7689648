//! Rendering interface for the terrain engine.
//!
//! The engine does not draw anything itself. It produces per-chunk geometry and
//! lifetime updates and hands them to a host-supplied [`ChunkRenderer`] as a
//! stream of [`ChunkRenderCommand`]s. The host owns every on-screen object; the
//! engine only assumes that a mesh can be created, updated and destroyed.

use std::{collections::HashSet, sync::Arc};

use log::{debug, trace};

use super::voxels::chunk::ChunkCoord;

pub mod meshing;
mod vertex;

// Re-export commonly used types
pub use meshing::{Mesh, SurfaceExtractor};
pub use vertex::Vertex;

/// One update for the host's representation of a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkRenderCommand {
    /// Discard whatever the chunk currently shows and display `mesh` instead.
    /// `None` means the chunk has no surface and should show nothing.
    Replace {
        /// Chunk being updated
        chunk: ChunkCoord,
        /// New geometry, shared with the chunk that owns it
        mesh: Option<Arc<Mesh>>,
    },
    /// Set the chunk's fade, from `0.0` (opaque) towards `1.0` (gone).
    Fade {
        /// Chunk being faded
        chunk: ChunkCoord,
        /// Fraction of the fade completed
        progress: f32,
    },
    /// The chunk was evicted; release its render objects.
    Destroy {
        /// Chunk that no longer exists
        chunk: ChunkCoord,
    },
}

impl ChunkRenderCommand {
    /// The chunk this command refers to.
    pub fn chunk(&self) -> ChunkCoord {
        match self {
            ChunkRenderCommand::Replace { chunk, .. }
            | ChunkRenderCommand::Fade { chunk, .. }
            | ChunkRenderCommand::Destroy { chunk } => *chunk,
        }
    }
}

/// Receiver for the engine's render commands.
pub trait ChunkRenderer {
    /// Applies one command. Commands arrive in the order the engine issued them.
    fn submit(&mut self, command: ChunkRenderCommand);
}

/// Collects commands in order, which is all a test or a deferred consumer needs.
impl ChunkRenderer for Vec<ChunkRenderCommand> {
    fn submit(&mut self, command: ChunkRenderCommand) {
        self.push(command);
    }
}

/// Renderer that only logs what it is asked to do and counts live meshes.
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    live_meshes: HashSet<ChunkCoord>,
    triangles_submitted: usize,
}

impl LoggingRenderer {
    /// Creates a renderer with nothing on screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunks currently showing geometry.
    pub fn live_meshes(&self) -> usize {
        self.live_meshes.len()
    }

    /// Total triangles received across all replacements.
    pub fn triangles_submitted(&self) -> usize {
        self.triangles_submitted
    }
}

impl ChunkRenderer for LoggingRenderer {
    fn submit(&mut self, command: ChunkRenderCommand) {
        match command {
            ChunkRenderCommand::Replace { chunk, mesh } => match mesh {
                Some(mesh) => {
                    self.live_meshes.insert(chunk);
                    self.triangles_submitted += mesh.triangle_count();
                    debug!("Mesh for chunk {:?}: {} triangles", chunk, mesh.triangle_count());
                }
                None => {
                    self.live_meshes.remove(&chunk);
                    trace!("Chunk {:?} has no surface", chunk);
                }
            },
            ChunkRenderCommand::Fade { chunk, progress } => {
                trace!("Chunk {:?} fade {:.2}", chunk, progress);
            }
            ChunkRenderCommand::Destroy { chunk } => {
                self.live_meshes.remove(&chunk);
                debug!("Destroyed mesh for chunk {:?}", chunk);
            }
        }
    }
}
