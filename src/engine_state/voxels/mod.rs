//! # Voxel Storage
//!
//! This module holds the density field and the structures that organize it in space.
//!
//! ## Architecture
//!
//! * **Noise field**: Seeded gradient noise that supplies initial densities
//! * **Chunk**: A fixed-size cube of density samples plus its lifecycle state
//! * **World**: The sparse chunk map and octree that route edits to chunks
//! * **Octree**: Bounded region index refined around sculpted areas
//! * **Bounds**: Axis-aligned boxes shared by the pieces above
//!
//! ## Data Flow
//!
//! 1. A brush stroke is converted to a world-space box
//! 2. The world lists every chunk overlapping that box, generating missing ones
//! 3. Each chunk applies the stroke to its own samples and marks itself dirty
//! 4. Dirty chunks are handed to surface extraction by the engine

pub mod bounds;
pub mod chunk;
pub mod noise_field;
pub mod octree;
pub mod world;
