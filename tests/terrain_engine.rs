use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use cgmath::{MetricSpace, Point3};
use voxel_sculpt::{
    BrushInput, BrushMode, BrushSettings, BrushStroke, ChunkLatticeIterator, ChunkRenderCommand,
    ChunkState, DensityChunk, SurfaceExtractor, TerrainConfig, TerrainEngine, DENSITY_MAX,
    DENSITY_MIN,
};
use web_time::{Duration, Instant};

const SEED: u64 = 0x5eed;

fn engine() -> TerrainEngine {
    TerrainEngine::new(TerrainConfig::default(), SEED).unwrap()
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

/// Deep inside chunk (0, 0, 0), well below the ground.
fn buried_point() -> Point3<f32> {
    Point3::new(8.0, 8.0, 8.0)
}

/// Carves an air pocket in chunk (0, 0, 0) so it is guaranteed to have a surface,
/// then extracts it.
fn carve_pocket(engine: &mut TerrainEngine, now: Instant) -> Vec<ChunkRenderCommand> {
    let stroke = BrushStroke::new(buried_point(), 3.0, 2.0, BrushMode::Additive);
    assert_eq!(engine.deform_at(now, &stroke), 1);
    assert_eq!(engine.deform_at(now, &stroke), 1);

    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    engine.tick_at(now, &mut commands);
    commands
}

fn fades(commands: &[ChunkRenderCommand]) -> Vec<f32> {
    commands
        .iter()
        .filter_map(|c| match c {
            ChunkRenderCommand::Fade { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

#[test]
fn queue_budget_drains_twenty_chunks_in_three_ticks() {
    let mut engine = engine();
    let now = Instant::now();
    let created = engine.generate_region_at(now, Point3::new(0, 0, 0), Point3::new(4, 1, 1));
    assert_eq!(created, 20);
    assert_eq!(engine.pending_extractions(), 20);

    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    let budgets: Vec<_> = (0..4)
        .map(|_| {
            let report = engine.tick_at(now, &mut commands);
            (report.extracted, report.pending)
        })
        .collect();
    assert_eq!(budgets, vec![(8, 12), (8, 4), (4, 0), (0, 0)]);

    // Each chunk was replaced at most once.
    let mut replaced: HashMap<_, usize> = HashMap::new();
    for command in &commands {
        if let ChunkRenderCommand::Replace { chunk, .. } = command {
            *replaced.entry(*chunk).or_default() += 1;
        }
    }
    assert!(replaced.values().all(|n| *n == 1));

    for x in 0..5 {
        for y in 0..2 {
            for z in 0..2 {
                assert_eq!(engine.chunk_state(Point3::new(x, y, z)), ChunkState::Extracted);
            }
        }
    }
}

#[test]
fn re_dirtied_chunk_is_extracted_again() {
    let mut engine = engine();
    let now = Instant::now();
    carve_pocket(&mut engine, now);
    assert_eq!(engine.pending_extractions(), 0);

    engine.deform_point(buried_point(), 2.0, 0.3, false);
    assert_eq!(engine.pending_extractions(), 1);
    let report = engine.tick_at(now, &mut Vec::<ChunkRenderCommand>::new());
    assert_eq!(report.extracted, 1);
}

#[test]
fn chunk_fades_after_five_seconds_and_is_evicted_after_seven() {
    let mut engine = engine();
    let coord = Point3::new(0, 0, 0);
    let t0 = Instant::now();

    let commands = carve_pocket(&mut engine, t0);
    assert!(matches!(
        commands.as_slice(),
        [ChunkRenderCommand::Replace { mesh: Some(_), .. }]
    ));

    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    let report = engine.tick_at(t0 + secs(4.9), &mut commands);
    assert!(commands.is_empty());
    assert_eq!(report.faded, 0);
    assert_eq!(engine.chunk_state(coord), ChunkState::Extracted);

    let report = engine.tick_at(t0 + secs(6.0), &mut commands);
    assert_eq!(report.faded, 1);
    assert_eq!(fades(&commands).len(), 1);
    assert_abs_diff_eq!(fades(&commands)[0], 0.5, epsilon = 1e-4);
    assert_eq!(engine.chunk_state(coord), ChunkState::Fading);

    commands.clear();
    let report = engine.tick_at(t0 + secs(7.0), &mut commands);
    assert_eq!(report.evicted, 1);
    assert_eq!(commands, vec![ChunkRenderCommand::Destroy { chunk: coord }]);
    assert_eq!(engine.chunk_state(coord), ChunkState::Unloaded);
    assert_eq!(engine.chunk_count(), 0);
}

#[test]
fn deform_restarts_lifetime_and_cancels_fade() {
    let mut engine = engine();
    let coord = Point3::new(0, 0, 0);
    let t0 = Instant::now();
    carve_pocket(&mut engine, t0);

    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    engine.tick_at(t0 + secs(6.0), &mut commands);
    assert_eq!(engine.chunk_state(coord), ChunkState::Fading);

    let t1 = t0 + secs(6.5);
    let stroke = BrushStroke::new(buried_point(), 2.0, 0.2, BrushMode::Additive);
    assert_eq!(engine.deform_at(t1, &stroke), 1);
    assert_eq!(engine.chunk_state(coord), ChunkState::Dirty);

    commands.clear();
    engine.tick_at(t1, &mut commands);
    assert!(commands
        .iter()
        .any(|c| matches!(c, ChunkRenderCommand::Replace { mesh: Some(_), .. })));
    assert_eq!(fades(&commands), vec![0.0]);
    assert_eq!(engine.chunk_state(coord), ChunkState::Extracted);

    // The old deadline has passed but the clock restarted at t1.
    commands.clear();
    engine.tick_at(t1 + secs(4.5), &mut commands);
    assert!(commands.is_empty());
    assert_eq!(engine.chunk_state(coord), ChunkState::Extracted);

    engine.tick_at(t1 + secs(6.0), &mut commands);
    assert_abs_diff_eq!(fades(&commands)[0], 0.5, epsilon = 1e-4);

    let report = engine.tick_at(t1 + secs(7.0), &mut commands);
    assert_eq!(report.evicted, 1);
    assert_eq!(engine.chunk_state(coord), ChunkState::Unloaded);
}

#[test]
fn queued_chunks_are_not_evicted() {
    let mut engine = TerrainEngine::new(
        TerrainConfig {
            extraction_budget: 1,
            ..Default::default()
        },
        SEED,
    )
    .unwrap();
    let t0 = Instant::now();
    engine.generate_region_at(t0, Point3::new(0, 0, 0), Point3::new(2, 0, 0));

    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    let report = engine.tick_at(t0 + secs(10.0), &mut commands);
    assert_eq!(report.extracted, 1);
    // The extracted chunk is old enough to go; the two still queued stay.
    assert_eq!(report.evicted, 1);
    assert_eq!(engine.chunk_count(), 2);
    assert_eq!(report.pending, 2);
}

#[test]
fn stroke_on_chunk_boundary_changes_both_sides_identically() {
    let mut engine = engine();
    let now = Instant::now();
    let left = Point3::new(0, 0, 0);
    let right = Point3::new(1, 0, 0);
    engine.generate_region_at(now, left, right);

    let before: HashMap<_, Vec<f32>> = [left, right]
        .into_iter()
        .map(|c| (c, engine.chunk(c).unwrap().densities().to_vec()))
        .collect();

    let stroke = BrushStroke::new(Point3::new(16.0, 8.0, 8.0), 3.0, 0.7, BrushMode::Subtractive);
    assert_eq!(engine.deform_at(now, &stroke), 2);
    assert_eq!(engine.chunk_count(), 2);

    // Every sample changed by exactly the brush delta at its own world position.
    for coord in [left, right] {
        let chunk = engine.chunk(coord).unwrap();
        let n = chunk.samples_per_axis();
        for (local, index) in ChunkLatticeIterator::new(n) {
            let distance = chunk.world_position(local).distance(stroke.center);
            let expected = (before[&coord][index] + stroke.delta_at(distance))
                .clamp(DENSITY_MIN, DENSITY_MAX);
            assert_abs_diff_eq!(chunk.densities()[index], expected, epsilon = 1e-6);
        }
    }

    // The shared face holds the same values on both sides.
    let a = engine.chunk(left).unwrap();
    let b = engine.chunk(right).unwrap();
    let last = a.samples_per_axis() as i32 - 1;
    for z in 0..=last {
        for y in 0..=last {
            assert_eq!(a.get_density(last, y, z), b.get_density(0, y, z));
        }
    }

    // The brush centre sits on that face and lost density.
    let n = a.samples_per_axis() as i32;
    let centre_index = (last + n * 8 + n * n * 8) as usize;
    assert!(a.get_density(last, 8, 8) < before[&left][centre_index]);
}

#[test]
fn stroke_grazing_a_neighbour_leaves_it_alone() {
    let mut engine = engine();
    let now = Instant::now();
    engine.generate_region_at(now, Point3::new(0, 0, 0), Point3::new(1, 0, 0));
    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    engine.tick_at(now, &mut commands);
    assert_eq!(engine.pending_extractions(), 0);

    let left = Point3::new(0, 0, 0);
    let before = engine.chunk(left).unwrap().densities().to_vec();

    // Reaches x = 16 exactly, where the falloff is zero.
    let later = now + secs(1.0);
    let stroke = BrushStroke::new(Point3::new(20.0, 8.0, 8.0), 4.0, 1.0, BrushMode::Additive);
    assert_eq!(engine.deform_at(later, &stroke), 1);

    let chunk = engine.chunk(left).unwrap();
    assert_eq!(chunk.densities(), &before[..]);
    assert_eq!(chunk.last_touched(), now);
    assert_eq!(engine.chunk_state(left), ChunkState::Extracted);
    assert_eq!(engine.chunk_state(Point3::new(1, 0, 0)), ChunkState::Dirty);
    assert_eq!(engine.pending_extractions(), 1);
}

#[test]
fn far_and_oversized_strokes_are_ignored() {
    let mut engine = engine();
    assert_eq!(engine.deform_point(Point3::new(-4.0e10, 0.0, 0.0), 1.0, 0.5, true), 0);
    assert_eq!(engine.deform_point(Point3::new(0.0, 0.0, 4.0e10), 1.0, 0.5, false), 0);
    assert_eq!(engine.deform_point(Point3::new(0.0, 0.0, 0.0), 1.0e6, 0.5, true), 0);
    assert_eq!(engine.chunk_count(), 0);
    assert_eq!(engine.pending_extractions(), 0);
}

#[test]
fn zero_strength_brush_is_a_no_op() {
    let mut engine = engine();
    let now = Instant::now();
    let coord = Point3::new(0, 0, 0);
    engine.generate_region_at(now, coord, coord);
    engine.tick_at(now, &mut Vec::<ChunkRenderCommand>::new());
    let before = engine.chunk(coord).unwrap().densities().to_vec();

    assert_eq!(engine.deform_point(buried_point(), 4.0, 0.0, true), 0);
    assert_eq!(engine.chunk(coord).unwrap().densities(), &before[..]);
    assert_eq!(engine.chunk_state(coord), ChunkState::Extracted);
    assert_eq!(engine.pending_extractions(), 0);
}

#[test]
fn repeated_strokes_stay_clamped() {
    let mut engine = engine();
    let now = Instant::now();
    let add = BrushStroke::new(buried_point(), 4.0, 0.9, BrushMode::Additive);
    for _ in 0..10 {
        engine.deform_at(now, &add);
    }
    let chunk = engine.chunk(Point3::new(0, 0, 0)).unwrap();
    assert_eq!(chunk.get_density(8, 8, 8), DENSITY_MAX);

    let sub = BrushStroke::new(buried_point(), 4.0, 0.9, BrushMode::Subtractive);
    for _ in 0..20 {
        engine.deform_at(now, &sub);
    }
    let chunk = engine.chunk(Point3::new(0, 0, 0)).unwrap();
    assert_eq!(chunk.get_density(8, 8, 8), DENSITY_MIN);
    assert!(chunk
        .densities()
        .iter()
        .all(|d| (DENSITY_MIN..=DENSITY_MAX).contains(d)));
}

#[test]
fn edge_triggered_input_sculpts_once_per_press() {
    let config = TerrainConfig {
        brush: BrushSettings {
            edge_triggered: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut engine = TerrainEngine::new(config, SEED).unwrap();
    let now = Instant::now();
    let mut input = BrushInput {
        point: buried_point(),
        active: true,
        additive: true,
    };

    assert!(engine.apply_input_at(now, &input) > 0);
    assert_eq!(engine.apply_input_at(now, &input), 0);
    assert_eq!(engine.apply_input_at(now, &input), 0);

    input.active = false;
    assert_eq!(engine.apply_input_at(now, &input), 0);
    input.active = true;
    assert!(engine.apply_input_at(now, &input) > 0);
}

#[test]
fn held_input_sculpts_every_frame() {
    let mut engine = engine();
    let now = Instant::now();
    let input = BrushInput {
        point: buried_point(),
        active: true,
        additive: false,
    };
    for _ in 0..3 {
        assert!(engine.apply_input_at(now, &input) > 0);
    }

    let released = BrushInput {
        active: false,
        ..input
    };
    assert_eq!(engine.apply_input_at(now, &released), 0);
}

#[test]
fn small_chunk_extraction_scenarios() {
    let config = TerrainConfig {
        chunk_size: 12.0,
        voxel_resolution: 3.0,
        ..Default::default()
    };
    let extractor = SurfaceExtractor::new(config.surface_threshold);
    let now = Instant::now();

    // With noise disabled, +1 high above the ground is air everywhere.
    let mut air = DensityChunk::new(Point3::new(0, 5, 0), &config, now);
    air.generate(&noise::Constant::new(1.0));
    assert!(air.densities().iter().all(|d| *d > config.surface_threshold));
    assert!(extractor.extract(&air).is_none());

    // And -1 near the bottom of the bias is solid everywhere.
    let mut solid = DensityChunk::new(Point3::new(0, 0, 0), &config, now);
    solid.generate(&noise::Constant::new(-1.0));
    assert!(solid.densities().iter().all(|d| *d < config.surface_threshold));
    assert!(extractor.extract(&solid).is_none());

    let mut chunk = DensityChunk::new(Point3::new(0, 0, 0), &config, now);
    assert_eq!(chunk.densities().len(), 125);

    chunk.fill_with(|_| 1.0);
    assert!(extractor.extract(&chunk).is_none());
    chunk.fill_with(|_| -1.0);
    assert!(extractor.extract(&chunk).is_none());

    let centre = Point3::new(6.0, 6.0, 6.0);
    chunk.fill_with(|p| if p == centre { -1.0 } else { 1.0 });
    let mesh = extractor.extract(&chunk).unwrap();
    assert!(!mesh.is_empty());

    let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
    for [a, b, c] in mesh.triangles() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            *edges.entry((u.min(v), u.max(v))).or_default() += 1;
        }
    }
    assert!(edges.values().all(|n| *n == 2), "surface is not closed");
}

#[test]
fn shutdown_clears_everything() {
    let mut engine = engine();
    let now = Instant::now();
    carve_pocket(&mut engine, now);
    engine.generate_region_at(now, Point3::new(3, 0, 0), Point3::new(3, 0, 0));

    let mut commands: Vec<ChunkRenderCommand> = Vec::new();
    engine.shutdown(&mut commands);
    assert_eq!(
        commands,
        vec![ChunkRenderCommand::Destroy {
            chunk: Point3::new(0, 0, 0)
        }]
    );
    assert_eq!(engine.chunk_count(), 0);
    assert_eq!(engine.pending_extractions(), 0);
    assert!(engine.tick_at(now + secs(60.0), &mut commands).is_idle());
}
