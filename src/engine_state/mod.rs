//! # Engine State Module
//!
//! The core engine module that owns the terrain and drives it frame by frame.
//!
//! ## Key Components
//!
//! * `TerrainEngine` - The main state container and the only entry point hosts call
//! * `brush` - Brush strokes and per-frame input classification
//! * `config` - Validated engine configuration
//! * `rendering` - Surface extraction and the renderer command interface
//! * `task_management` - The extraction queue drained under a per-tick budget
//! * `voxels` - Noise, density chunks and spatial indexing
//!
//! ## Frame Lifecycle
//!
//! Hosts call into the engine on a single logical timeline:
//!
//! 1. Zero or more edits (`deform*`, `apply_input*`, `generate_region*`) mutate
//!    density grids and queue the affected chunks
//! 2. One `tick*` call per frame extracts at most `extraction_budget` queued
//!    chunks, then ages idle chunks, fading and finally evicting them
//! 3. Every visible change is reported to the host's [`ChunkRenderer`]
//!
//! Each time-dependent operation has an `_at` variant taking an explicit
//! [`Instant`], so a host with its own frame clock (or a test) can drive the
//! engine deterministically.
//!
//! ## Chunk States
//!
//! `Unloaded → Generated → Dirty → Extracted → Fading → (evicted)`. An edit moves
//! a chunk back to `Dirty` from any loaded state and restarts its lifetime.

use std::{collections::HashSet, sync::Arc};

use brush::{BrushInput, BrushInputTracker, BrushMode, BrushStroke};
use cgmath::Point3;
use config::TerrainConfig;
use log::{debug, info, trace, warn};
use lru::LruCache;
use rendering::{ChunkRenderCommand, ChunkRenderer, SurfaceExtractor};
use task_management::ExtractionQueue;
use voxels::{
    chunk::{ChunkCoord, ChunkState, DensityChunk},
    noise_field::NoiseField,
    octree::Octree,
    world::SpatialIndex,
};
use web_time::{Duration, Instant};

pub mod brush;
pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Most chunks a single brush stroke may reach. Wider strokes are ignored.
pub const MAX_STROKE_CHUNKS: u64 = 4096;

/// What one [`TerrainEngine::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Chunks taken off the queue and run through surface extraction.
    pub extracted: usize,
    /// How many of those produced no geometry.
    pub empty: usize,
    /// Chunks whose geometry received a non-zero fade.
    pub faded: usize,
    /// Chunks removed from the index.
    pub evicted: usize,
    /// Chunks still waiting for extraction after this tick.
    pub pending: usize,
}

impl TickReport {
    /// Whether the tick changed nothing.
    pub fn is_idle(&self) -> bool {
        self.extracted == 0 && self.faded == 0 && self.evicted == 0
    }
}

/// The terrain engine: chunk storage, sculpting, extraction scheduling and
/// lifetime management behind one value.
///
/// # Examples
///
/// ```
/// use voxel_sculpt::{ChunkRenderCommand, TerrainConfig, TerrainEngine};
/// use cgmath::Point3;
///
/// let mut engine = TerrainEngine::new(TerrainConfig::default(), 7).unwrap();
/// let mut commands: Vec<ChunkRenderCommand> = Vec::new();
///
/// // Main loop
/// engine.deform_point(Point3::new(0.0, 50.0, 0.0), 4.0, 0.5, true);
/// let report = engine.tick(&mut commands);
/// assert_eq!(report.pending, 0);
/// ```
pub struct TerrainEngine {
    /// Validated configuration
    config: TerrainConfig,
    /// Shared read-only noise tables
    noise: Arc<NoiseField>,
    /// Chunk map and octree
    world: SpatialIndex,
    /// Chunks awaiting extraction
    queue: ExtractionQueue,
    /// Every loaded chunk, most recently touched first
    touch_order: LruCache<ChunkCoord, ()>,
    /// Chunks whose fade was cancelled since the last tick
    fade_resets: HashSet<ChunkCoord>,
    /// Previous frame's sculpt button
    input: BrushInputTracker,
    extractor: SurfaceExtractor,
    fade_delay: Duration,
    fade_duration: Duration,
}

impl TerrainEngine {
    /// Creates an engine whose noise tables are seeded with `seed`.
    ///
    /// # Errors
    /// Returns the first problem [`TerrainConfig::validate`] finds.
    pub fn new(config: TerrainConfig, seed: u64) -> config::Result<Self> {
        config.validate()?;
        Self::with_noise(config, Arc::new(NoiseField::new(seed)))
    }

    /// Creates an engine around an existing noise field.
    ///
    /// # Errors
    /// Returns the first problem [`TerrainConfig::validate`] finds.
    pub fn with_noise(config: TerrainConfig, noise: Arc<NoiseField>) -> config::Result<Self> {
        config.validate()?;

        info!(
            "Terrain engine: chunk size {}, resolution {}, {} samples per axis, seed {}",
            config.chunk_size,
            config.voxel_resolution,
            config.samples_per_axis(),
            noise.seed()
        );

        Ok(TerrainEngine {
            world: SpatialIndex::new(&config),
            queue: ExtractionQueue::new(),
            touch_order: LruCache::unbounded(),
            fade_resets: HashSet::new(),
            input: BrushInputTracker::default(),
            extractor: SurfaceExtractor::new(config.surface_threshold),
            fade_delay: seconds(config.fade_delay_secs),
            fade_duration: seconds(config.fade_duration_secs),
            noise,
            config,
        })
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// The noise field chunks are generated from.
    pub fn noise(&self) -> &Arc<NoiseField> {
        &self.noise
    }

    /// The octree view, refined around every brush centre so far.
    pub fn octree(&self) -> &Octree {
        self.world.octree()
    }

    /// The chunk map and octree.
    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.world
    }

    /// The chunk at `coord`, if loaded.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&DensityChunk> {
        self.world.get(coord)
    }

    /// Lifecycle stage of the chunk at `coord`.
    pub fn chunk_state(&self, coord: ChunkCoord) -> ChunkState {
        self.world
            .get(coord)
            .map_or(ChunkState::Unloaded, DensityChunk::state)
    }

    /// Number of loaded chunks.
    pub fn chunk_count(&self) -> usize {
        self.world.len()
    }

    /// Number of chunks waiting for extraction.
    pub fn pending_extractions(&self) -> usize {
        self.queue.len()
    }

    /// Loads every chunk in the inclusive box `min_coord..=max_coord` and queues the
    /// new ones for their first extraction.
    ///
    /// # Returns
    /// The number of chunks created.
    pub fn generate_region(&mut self, min_coord: ChunkCoord, max_coord: ChunkCoord) -> usize {
        self.generate_region_at(Instant::now(), min_coord, max_coord)
    }

    /// [`generate_region`](Self::generate_region) at an explicit time.
    pub fn generate_region_at(
        &mut self,
        now: Instant,
        min_coord: ChunkCoord,
        max_coord: ChunkCoord,
    ) -> usize {
        let mut created = 0;
        for z in min_coord.z..=max_coord.z {
            for y in min_coord.y..=max_coord.y {
                for x in min_coord.x..=max_coord.x {
                    if self.load_chunk(Point3::new(x, y, z), now) {
                        created += 1;
                    }
                }
            }
        }
        debug!("Generated {} chunks in {:?}..={:?}", created, min_coord, max_coord);
        created
    }

    /// Creates the chunk at `coord` if missing, queueing it for extraction.
    fn load_chunk(&mut self, coord: ChunkCoord, now: Instant) -> bool {
        let generator = self.noise.fractal_view(self.config.noise);
        let (_, created) = self.world.get_or_generate(coord, &self.config, &generator, now);
        if created {
            trace!("Created chunk {:?}", coord);
            self.touch_order.put(coord, ());
            self.queue.push(coord);
        }
        created
    }

    /// Applies `stroke` now. See [`deform_at`](Self::deform_at).
    pub fn deform(&mut self, stroke: &BrushStroke) -> usize {
        self.deform_at(Instant::now(), stroke)
    }

    /// Applies a brush with the configured falloff at `point`.
    ///
    /// `additive` raises density, carving terrain away; otherwise density is
    /// lowered and terrain is added.
    pub fn deform_point(
        &mut self,
        point: Point3<f32>,
        radius: f32,
        strength: f32,
        additive: bool,
    ) -> usize {
        let stroke = BrushStroke::new(point, radius, strength, BrushMode::from_additive(additive))
            .with_falloff(self.config.brush.falloff_power);
        self.deform(&stroke)
    }

    /// Routes `stroke` into every chunk its bounding box overlaps.
    ///
    /// Missing chunks are generated first. Each chunk applies the stroke to its own
    /// samples in world space, so a stroke across a chunk boundary changes the
    /// shared samples identically on both sides. Every chunk that actually changed
    /// is marked dirty, queued for extraction and has its lifetime restarted.
    ///
    /// Degenerate strokes (no positive radius or strength) change nothing. So do
    /// strokes reaching past the range of chunk coordinates or spanning more than
    /// [`MAX_STROKE_CHUNKS`] chunks.
    ///
    /// # Returns
    /// The number of chunks whose densities changed.
    pub fn deform_at(&mut self, now: Instant, stroke: &BrushStroke) -> usize {
        if stroke.is_degenerate() {
            trace!("Ignoring degenerate brush stroke {:?}", stroke);
            return 0;
        }

        let bounds = stroke.bounds();
        let span = self.world.overlap_count(&bounds);
        if span == 0 || span > MAX_STROKE_CHUNKS {
            warn!("Ignoring brush stroke at {:?} spanning {} chunks", stroke.center, span);
            return 0;
        }

        let generator = self.noise.fractal_view(self.config.noise);
        let mut edited = 0;

        for coord in self.world.chunks_overlapping(&bounds) {
            let (chunk, created) = self.world.get_or_generate(coord, &self.config, &generator, now);
            if created {
                trace!("Created chunk {:?} for brush at {:?}", coord, stroke.center);
                self.touch_order.put(coord, ());
                self.queue.push(coord);
            }

            let was_fading = chunk.fade_progress() > 0.0;
            if chunk.deform(stroke, now) == 0 {
                continue;
            }

            edited += 1;
            self.touch_order.promote(&coord);
            self.queue.push(coord);
            if was_fading {
                self.fade_resets.insert(coord);
            }
        }

        self.world.octree_mut().refine_at(stroke.center);
        edited
    }

    /// Feeds one frame of pointer input now. See [`apply_input_at`](Self::apply_input_at).
    pub fn apply_input(&mut self, input: &BrushInput) -> usize {
        self.apply_input_at(Instant::now(), input)
    }

    /// Feeds one frame of pointer input, sculpting with the configured brush when
    /// the button state calls for it.
    ///
    /// With `edge_triggered` set the brush is applied only on the frame the button
    /// goes down; otherwise on every frame it is held.
    ///
    /// # Returns
    /// The number of chunks whose densities changed.
    pub fn apply_input_at(&mut self, now: Instant, input: &BrushInput) -> usize {
        let state = self.input.update(input);
        if !BrushInputTracker::should_apply(state, &self.config.brush) {
            return 0;
        }

        let stroke = BrushStroke::from_settings(
            input.point,
            &self.config.brush,
            BrushMode::from_additive(input.additive),
        );
        self.deform_at(now, &stroke)
    }

    /// Advances the engine by one frame now. See [`tick_at`](Self::tick_at).
    pub fn tick(&mut self, renderer: &mut dyn ChunkRenderer) -> TickReport {
        self.tick_at(Instant::now(), renderer)
    }

    /// Advances the engine by one frame.
    ///
    /// First up to `extraction_budget` queued chunks are extracted, oldest first,
    /// and their new geometry is sent to `renderer`; the rest stay queued. Then
    /// every idle chunk is aged: after `fade_delay_secs` without an edit its
    /// geometry fades linearly over `fade_duration_secs`, after which the chunk is
    /// evicted and its geometry destroyed.
    pub fn tick_at(&mut self, now: Instant, renderer: &mut dyn ChunkRenderer) -> TickReport {
        let mut report = TickReport::default();

        self.extract_pending(renderer, &mut report);

        for coord in self.fade_resets.drain() {
            if self.world.get(coord).is_some_and(|c| c.mesh().is_some()) {
                renderer.submit(ChunkRenderCommand::Fade {
                    chunk: coord,
                    progress: 0.0,
                });
            }
        }

        self.sweep_lifetimes(now, renderer, &mut report);

        report.pending = self.queue.len();
        if !report.is_idle() {
            debug!("Tick: {:?}", report);
        }
        report
    }

    fn extract_pending(&mut self, renderer: &mut dyn ChunkRenderer, report: &mut TickReport) {
        for coord in self.queue.drain_up_to(self.config.extraction_budget) {
            let Some(chunk) = self.world.get_mut(coord) else {
                continue;
            };

            let mesh = self.extractor.extract(chunk).map(Arc::new);
            report.extracted += 1;
            if mesh.is_none() {
                report.empty += 1;
                trace!("Chunk {:?} has no surface", coord);
            }

            let previous = chunk.finish_extraction(mesh.clone());
            if mesh.is_some() || previous.is_some() {
                renderer.submit(ChunkRenderCommand::Replace { chunk: coord, mesh });
            }
        }
    }

    fn sweep_lifetimes(
        &mut self,
        now: Instant,
        renderer: &mut dyn ChunkRenderer,
        report: &mut TickReport,
    ) {
        // Oldest first; everything after the first young chunk is younger still.
        let mut aged = Vec::new();
        for (coord, _) in self.touch_order.iter().rev() {
            let Some(chunk) = self.world.get(*coord) else {
                continue;
            };
            let age = now.saturating_duration_since(chunk.last_touched());
            if age < self.fade_delay {
                break;
            }
            if chunk.is_dirty() || self.queue.contains(*coord) {
                continue;
            }
            aged.push((*coord, age - self.fade_delay));
        }

        for (coord, over) in aged {
            let progress = if self.fade_duration.is_zero() {
                1.0
            } else {
                over.as_secs_f64() / self.fade_duration.as_secs_f64()
            };

            if progress >= 1.0 {
                self.evict(coord, renderer);
                report.evicted += 1;
                continue;
            }

            if let Some(chunk) = self.world.get_mut(coord) {
                chunk.set_fade_progress(progress as f32);
                if progress > 0.0 && chunk.mesh().is_some() {
                    renderer.submit(ChunkRenderCommand::Fade {
                        chunk: coord,
                        progress: progress as f32,
                    });
                    report.faded += 1;
                }
            }
        }
    }

    fn evict(&mut self, coord: ChunkCoord, renderer: &mut dyn ChunkRenderer) {
        self.touch_order.pop(&coord);
        self.fade_resets.remove(&coord);
        if let Some(mut chunk) = self.world.remove(coord) {
            if chunk.take_mesh().is_some() {
                renderer.submit(ChunkRenderCommand::Destroy { chunk: coord });
            }
            debug!("Evicted chunk {:?}", coord);
        }
    }

    /// Destroys every chunk's geometry and drops all state.
    pub fn shutdown(&mut self, renderer: &mut dyn ChunkRenderer) {
        let mut destroyed = 0;
        for chunk in self.world.iter_mut() {
            if chunk.take_mesh().is_some() {
                renderer.submit(ChunkRenderCommand::Destroy { chunk: chunk.coord });
                destroyed += 1;
            }
        }

        info!(
            "Terrain engine shut down: {} chunks dropped, {} meshes destroyed",
            self.world.len(),
            destroyed
        );

        self.world.clear();
        self.queue.clear();
        self.touch_order.clear();
        self.fade_resets.clear();
        self.input = BrushInputTracker::default();
    }
}

/// Converts validated, non-negative seconds to a duration, saturating on overflow.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
