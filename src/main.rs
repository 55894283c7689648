//! # Voxel Sculpt Entry Point
//!
//! Runs the library's headless sculpting session.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info TERRAIN_SEED=7 cargo run --release -- terrain.json
//! ```

fn main() {
    voxel_sculpt::run();
}
