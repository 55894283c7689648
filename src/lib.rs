#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Sculpt
//!
//! A real-time engine for procedurally generated, interactively sculpted voxel
//! terrain.
//!
//! The crate covers the density side of a terrain system: seeded gradient noise,
//! chunked density storage, brush deformation, frame-budgeted surface extraction
//! and time-based eviction of idle chunks. Drawing, windowing and pointer
//! raycasting stay with the host, which talks to the engine through
//! [`BrushInput`] values and a [`ChunkRenderer`] implementation.
//!
//! ## Key Modules
//!
//! * `engine_state` - [`TerrainEngine`] and everything it coordinates
//! * `engine_state::voxels` - Noise, density chunks, the chunk map and the octree
//! * `engine_state::rendering` - Marching cubes extraction and render commands
//!
//! ## Usage
//!
//! ```rust
//! use voxel_sculpt::{BrushInput, LoggingRenderer, TerrainConfig, TerrainEngine};
//! use cgmath::Point3;
//!
//! let mut engine = TerrainEngine::new(TerrainConfig::default(), 42).unwrap();
//! let mut renderer = LoggingRenderer::new();
//!
//! // Once per frame
//! engine.apply_input(&BrushInput {
//!     point: Point3::new(0.0, 60.0, 0.0),
//!     active: true,
//!     additive: false,
//! });
//! engine.tick(&mut renderer);
//! ```
//!
//! The `voxel-sculpt` binary runs a short headless sculpting session; see [`run`].

use std::sync::Arc;

use cgmath::Point3;
use log::{error, info, warn};
use web_time::{Duration, Instant};

mod engine_state;

pub use engine_state::{
    brush::{BrushInput, BrushInputTracker, BrushMode, BrushStroke, ButtonState},
    config::{BrushSettings, ConfigError, NoiseSettings, Result, TerrainConfig, OCTREE_MAX_DEPTH},
    rendering::{
        meshing::marching_cubes, ChunkRenderCommand, ChunkRenderer, LoggingRenderer, Mesh,
        SurfaceExtractor, Vertex,
    },
    task_management::ExtractionQueue,
    voxels::{
        bounds::Aabb,
        chunk::{
            chunk_iteration::ChunkLatticeIterator, ChunkCoord, ChunkState, DensityChunk,
            DENSITY_MAX, DENSITY_MIN, HEIGHT_BIAS_SCALE,
        },
        noise_field::{FractalNoise, NoiseField},
        octree::{Octree, OctreeNode},
        world::SpatialIndex,
    },
    TerrainEngine, TickReport, MAX_STROKE_CHUNKS,
};

/// Environment variable holding the noise seed for [`run`].
pub const SEED_ENV_VAR: &str = "TERRAIN_SEED";

/// Simulated frame length used by [`run`].
const FRAME: Duration = Duration::from_micros(16_667);
/// Number of frames [`run`] simulates.
const SESSION_FRAMES: u32 = 600;
/// Approximate height of undisturbed ground at the default surface threshold.
const GROUND_HEIGHT: f32 = 75.0;
/// Frames during which the simulated sculpt button is held.
const SCULPT_FRAMES: std::ops::Range<u32> = 60..240;

/// Runs a headless sculpting session and logs what the engine does.
///
/// The first command line argument, if any, names a JSON configuration file. The
/// noise seed comes from `TERRAIN_SEED`, or from entropy when unset. The session
/// preloads terrain around the origin, sculpts along a circle for a few simulated
/// seconds and then idles until the untouched chunks fade out and are evicted.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match TerrainConfig::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring configuration {}: {}", path, e);
                TerrainConfig::default()
            }
        },
        None => TerrainConfig::default(),
    };

    let noise = match std::env::var(SEED_ENV_VAR).ok().and_then(|s| s.parse().ok()) {
        Some(seed) => NoiseField::new(seed),
        None => NoiseField::from_entropy(),
    };

    let mut engine = match TerrainEngine::with_noise(config, Arc::new(noise)) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Invalid terrain configuration: {}", e);
            return;
        }
    };

    let mut renderer = LoggingRenderer::new();
    let start = Instant::now();

    let surface_layer = (GROUND_HEIGHT / engine.config().chunk_size).floor() as i32;
    let created = engine.generate_region_at(
        start,
        Point3::new(-2, surface_layer - 1, -2),
        Point3::new(1, surface_layer, 1),
    );
    info!("Preloaded {} chunks", created);

    let mut totals = TickReport::default();
    for frame in 0..SESSION_FRAMES {
        let now = start + FRAME * frame;
        let angle = frame as f32 * 0.05;
        let input = BrushInput {
            point: Point3::new(12.0 * angle.cos(), GROUND_HEIGHT, 12.0 * angle.sin()),
            active: SCULPT_FRAMES.contains(&frame),
            additive: (frame / 60) % 2 == 0,
        };
        engine.apply_input_at(now, &input);

        let report = engine.tick_at(now, &mut renderer);
        totals.extracted += report.extracted;
        totals.empty += report.empty;
        totals.faded += report.faded;
        totals.evicted += report.evicted;
        totals.pending = report.pending;

        if frame % 60 == 0 {
            info!(
                "t = {:.1}s: {} chunks loaded, {} meshes live, {} pending",
                (now - start).as_secs_f32(),
                engine.chunk_count(),
                renderer.live_meshes(),
                report.pending
            );
        }
    }

    info!(
        "Session done: {} extractions ({} empty), {} fade updates, {} evictions, \
         {} triangles submitted, {} octree leaves",
        totals.extracted,
        totals.empty,
        totals.faded,
        totals.evicted,
        renderer.triangles_submitted(),
        engine.octree().leaf_count()
    );

    engine.shutdown(&mut renderer);
}
