//! # Terrain Configuration
//!
//! Every tunable constant of the engine lives in `TerrainConfig`. A config is
//! validated once, when the engine is built; after that no engine operation can
//! fail because of a bad constant.
//!
//! Configs are plain serde structs. Missing fields fall back to the defaults
//! below, so a JSON file only needs to name the values it changes:
//!
//! ```json
//! { "chunk_size": 32.0, "noise": { "octaves": 6 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on octree depth, whatever the configuration asks for.
pub const OCTREE_MAX_DEPTH: u32 = 10;

/// Relative slack allowed when checking that a chunk holds whole cells.
const CELL_TOLERANCE: f32 = 1e-4;

/// Reasons a configuration is rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Chunk edge length must be a positive, finite number of world units.
    #[error("chunk size must be positive and finite, got {0}")]
    ChunkSize(f32),

    /// Voxel spacing must be a positive, finite number of world units.
    #[error("voxel resolution must be positive and finite, got {0}")]
    VoxelResolution(f32),

    /// The chunk must hold at least one cell of voxels.
    #[error("chunk size {chunk_size} holds no whole cell at resolution {voxel_resolution}")]
    EmptyChunkGrid {
        /// Configured chunk edge length.
        chunk_size: f32,
        /// Configured voxel spacing.
        voxel_resolution: f32,
    },

    /// Chunk size must be a whole number of voxel cells, so neighbouring chunk
    /// grids meet on a shared face.
    #[error("chunk size {chunk_size} is not a whole multiple of resolution {voxel_resolution}")]
    PartialCell {
        /// Configured chunk edge length.
        chunk_size: f32,
        /// Configured voxel spacing.
        voxel_resolution: f32,
    },

    /// Octree depth must lie in `1..=OCTREE_MAX_DEPTH`.
    #[error("octree depth must be between 1 and {max}, got {0}", max = OCTREE_MAX_DEPTH)]
    OctreeDepth(u32),

    /// Octree root half size must be a positive, finite number.
    #[error("octree half size must be positive and finite, got {0}")]
    OctreeHalfSize(f32),

    /// The surface threshold must be finite.
    #[error("surface threshold must be finite, got {0}")]
    SurfaceThreshold(f32),

    /// At least one chunk must be extractable per tick.
    #[error("extraction budget must be at least 1")]
    ExtractionBudget,

    /// Noise parameters are out of range.
    #[error("invalid noise settings: {0}")]
    Noise(&'static str),

    /// Default brush parameters are out of range.
    #[error("invalid brush settings: {0}")]
    Brush(&'static str),

    /// Fade delay and duration must be non-negative and finite.
    #[error("fade timings must be non-negative and finite (delay {delay}, duration {duration})")]
    FadeTiming {
        /// Configured delay before fading starts, in seconds.
        delay: f64,
        /// Configured fade length, in seconds.
        duration: f64,
    },

    /// The configuration text could not be parsed.
    #[error("failed to parse terrain configuration")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read terrain configuration")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration loading and validation.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Parameters of the fractal noise used to generate chunk densities.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Multiplier applied to world coordinates before sampling.
    pub scale: f64,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        NoiseSettings {
            scale: 0.05,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Default brush applied when input arrives through [`crate::BrushInput`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Radius of influence in world units.
    pub radius: f32,
    /// Density change at the brush centre.
    pub strength: f32,
    /// Exponent of the `1 - (d / r)^p` falloff.
    pub falloff_power: f32,
    /// Apply only on the frame the button goes down, instead of every held frame.
    pub edge_triggered: bool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        BrushSettings {
            radius: 4.0,
            strength: 0.5,
            falloff_power: 2.0,
            edge_triggered: false,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Edge length of a cubic chunk, in world units.
    pub chunk_size: f32,
    /// Spacing between density samples, in world units.
    pub voxel_resolution: f32,
    /// Maximum subdivision depth of the octree view.
    pub octree_max_depth: u32,
    /// Half edge length of the octree root volume, centred on the origin.
    pub octree_half_size: f32,
    /// Density value the extracted surface follows.
    pub surface_threshold: f32,
    /// Maximum number of chunks re-extracted per tick.
    pub extraction_budget: usize,
    /// Terrain noise parameters.
    pub noise: NoiseSettings,
    /// Default sculpting brush.
    pub brush: BrushSettings,
    /// Seconds a chunk stays fully visible after its last edit.
    pub fade_delay_secs: f64,
    /// Seconds a chunk takes to fade out once the delay has passed.
    pub fade_duration_secs: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            chunk_size: 16.0,
            voxel_resolution: 1.0,
            octree_max_depth: 6,
            octree_half_size: 256.0,
            surface_threshold: 0.5,
            extraction_budget: 8,
            noise: NoiseSettings::default(),
            brush: BrushSettings::default(),
            fade_delay_secs: 5.0,
            fade_duration_secs: 2.0,
        }
    }
}

impl TerrainConfig {
    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: TerrainConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Number of density samples along each chunk axis (`size / resolution + 1`).
    pub fn samples_per_axis(&self) -> usize {
        (self.chunk_size / self.voxel_resolution + 1e-4).floor() as usize + 1
    }

    /// Checks every constant, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if !(self.voxel_resolution.is_finite() && self.voxel_resolution > 0.0) {
            return Err(ConfigError::VoxelResolution(self.voxel_resolution));
        }
        if self.samples_per_axis() < 2 {
            return Err(ConfigError::EmptyChunkGrid {
                chunk_size: self.chunk_size,
                voxel_resolution: self.voxel_resolution,
            });
        }
        let cells = self.chunk_size / self.voxel_resolution;
        if (cells - cells.round()).abs() > CELL_TOLERANCE * cells.max(1.0) {
            return Err(ConfigError::PartialCell {
                chunk_size: self.chunk_size,
                voxel_resolution: self.voxel_resolution,
            });
        }
        if self.octree_max_depth == 0 || self.octree_max_depth > OCTREE_MAX_DEPTH {
            return Err(ConfigError::OctreeDepth(self.octree_max_depth));
        }
        if !(self.octree_half_size.is_finite() && self.octree_half_size > 0.0) {
            return Err(ConfigError::OctreeHalfSize(self.octree_half_size));
        }
        if !self.surface_threshold.is_finite() {
            return Err(ConfigError::SurfaceThreshold(self.surface_threshold));
        }
        if self.extraction_budget == 0 {
            return Err(ConfigError::ExtractionBudget);
        }

        let noise = &self.noise;
        if !(noise.scale.is_finite() && noise.scale > 0.0) {
            return Err(ConfigError::Noise("scale must be positive"));
        }
        if noise.octaves == 0 {
            return Err(ConfigError::Noise("at least one octave is required"));
        }
        if !(noise.persistence.is_finite() && noise.persistence > 0.0) {
            return Err(ConfigError::Noise("persistence must be positive"));
        }
        if !(noise.lacunarity.is_finite() && noise.lacunarity > 0.0) {
            return Err(ConfigError::Noise("lacunarity must be positive"));
        }

        let brush = &self.brush;
        if !(brush.radius.is_finite() && brush.radius > 0.0) {
            return Err(ConfigError::Brush("radius must be positive"));
        }
        if !(brush.strength.is_finite() && brush.strength >= 0.0) {
            return Err(ConfigError::Brush("strength must be non-negative"));
        }
        if !(brush.falloff_power.is_finite() && brush.falloff_power > 0.0) {
            return Err(ConfigError::Brush("falloff power must be positive"));
        }

        let timings_ok = [self.fade_delay_secs, self.fade_duration_secs]
            .iter()
            .all(|t| t.is_finite() && *t >= 0.0);
        if !timings_ok {
            return Err(ConfigError::FadeTiming {
                delay: self.fade_delay_secs,
                duration: self.fade_duration_secs,
            });
        }

        Ok(())
    }
}
