//! # Noise Field Module
//!
//! This module provides `NoiseField`, the deterministic gradient-noise source that
//! every density chunk is generated from, plus `FractalNoise`, a multi-octave view
//! over it configured by `NoiseSettings`.
//!
//! ## Tables
//!
//! A field owns a shuffled permutation of `0..256` and 256 random unit gradient
//! vectors. Both tables are stored twice over (512 entries) so that the nested
//! `perm[perm[x] + y] + z` lookups never leave the table, which lets the sampler
//! accept any finite coordinate without bounds checks or overflow.
//!
//! ## Thread Safety
//!
//! A field is immutable once built. Wrap it in an `Arc` and hand clones to
//! whichever component needs to sample it.

use noise::NoiseFn;

use crate::engine_state::config::NoiseSettings;

/// Number of distinct lattice hashes.
pub const TABLE_SIZE: usize = 256;
/// Length of the duplicated lookup tables.
const EXTENDED_TABLE_SIZE: usize = TABLE_SIZE * 2;
const TABLE_MASK: i64 = TABLE_SIZE as i64 - 1;

/// A seeded, read-only 3D gradient noise function.
///
/// # Examples
///
/// ```
/// use voxel_sculpt::NoiseField;
///
/// let field = NoiseField::new(7);
/// let a = field.sample3(1.25, -3.5, 8.0);
/// assert_eq!(a, NoiseField::new(7).sample3(1.25, -3.5, 8.0));
/// assert!((-1.0..=1.0).contains(&a));
/// ```
pub struct NoiseField {
    seed: u64,
    permutation: [usize; EXTENDED_TABLE_SIZE],
    gradients: [[f64; 3]; EXTENDED_TABLE_SIZE],
}

impl NoiseField {
    /// Builds the permutation and gradient tables from `seed`.
    ///
    /// The same seed always produces the same tables, and therefore the same field.
    pub fn new(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);

        let mut shuffled: Vec<usize> = (0..TABLE_SIZE).collect();
        rng.shuffle(&mut shuffled);

        let mut permutation = [0usize; EXTENDED_TABLE_SIZE];
        let mut gradients = [[0.0f64; 3]; EXTENDED_TABLE_SIZE];

        for i in 0..TABLE_SIZE {
            let gradient = random_unit_vector(&mut rng);

            permutation[i] = shuffled[i];
            permutation[i + TABLE_SIZE] = shuffled[i];
            gradients[i] = gradient;
            gradients[i + TABLE_SIZE] = gradient;
        }

        NoiseField {
            seed,
            permutation,
            gradients,
        }
    }

    /// Builds a field from a seed drawn from the process entropy source.
    pub fn from_entropy() -> Self {
        Self::new(fastrand::u64(..))
    }

    /// The seed this field was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Samples classic gradient noise at `(x, y, z)`.
    ///
    /// The result is continuous in every axis, exactly zero on integer lattice
    /// points, and always within `[-1, 1]`. Coordinates of any magnitude are
    /// accepted; lattice indices wrap every 256 units.
    pub fn sample3(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xi, xf) = lattice_cell(x);
        let (yi, yf) = lattice_cell(y);
        let (zi, zf) = lattice_cell(z);

        let u = smootherstep(xf);
        let v = smootherstep(yf);
        let w = smootherstep(zf);

        let p = &self.permutation;
        let a = p[xi] + yi;
        let aa = p[a] + zi;
        let ab = p[a + 1] + zi;
        let b = p[xi + 1] + yi;
        let ba = p[b] + zi;
        let bb = p[b + 1] + zi;

        let x00 = lerp(
            u,
            self.corner(p[aa], xf, yf, zf),
            self.corner(p[ba], xf - 1.0, yf, zf),
        );
        let x10 = lerp(
            u,
            self.corner(p[ab], xf, yf - 1.0, zf),
            self.corner(p[bb], xf - 1.0, yf - 1.0, zf),
        );
        let x01 = lerp(
            u,
            self.corner(p[aa + 1], xf, yf, zf - 1.0),
            self.corner(p[ba + 1], xf - 1.0, yf, zf - 1.0),
        );
        let x11 = lerp(
            u,
            self.corner(p[ab + 1], xf, yf - 1.0, zf - 1.0),
            self.corner(p[bb + 1], xf - 1.0, yf - 1.0, zf - 1.0),
        );

        let value = lerp(w, lerp(v, x00, x10), lerp(v, x01, x11));
        value.clamp(-1.0, 1.0)
    }

    /// Sums `octaves` samples of [`NoiseField::sample3`], scaling frequency by
    /// `lacunarity` and amplitude by `persistence` at each step.
    ///
    /// The sum is divided by the total absolute amplitude, so the result stays
    /// within `[-1, 1]` whatever the octave count. Zero octaves yield `0.0`.
    pub fn fractal(
        &self,
        x: f64,
        y: f64,
        z: f64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut amplitude_sum = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;

        for _ in 0..octaves {
            total += self.sample3(x * frequency, y * frequency, z * frequency) * amplitude;
            amplitude_sum += f64::abs(amplitude);
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if amplitude_sum > 0.0 {
            total / amplitude_sum
        } else {
            0.0
        }
    }

    /// Returns a multi-octave view over this field configured by `settings`.
    pub fn fractal_view(&self, settings: NoiseSettings) -> FractalNoise<'_> {
        FractalNoise {
            field: self,
            settings,
        }
    }

    fn corner(&self, hash: usize, dx: f64, dy: f64, dz: f64) -> f64 {
        let g = self.gradients[hash];
        g[0] * dx + g[1] * dy + g[2] * dz
    }
}

impl NoiseFn<f64, 3> for NoiseField {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.sample3(point[0], point[1], point[2])
    }
}

/// Fractal (fBm) noise over a [`NoiseField`], sampled in world units.
///
/// World coordinates are multiplied by `settings.scale` before the octave sum,
/// so a chunk generator can hand world positions straight to [`NoiseFn::get`].
#[derive(Clone, Copy)]
pub struct FractalNoise<'a> {
    field: &'a NoiseField,
    settings: NoiseSettings,
}

impl NoiseFn<f64, 3> for FractalNoise<'_> {
    fn get(&self, point: [f64; 3]) -> f64 {
        let s = self.settings;
        self.field.fractal(
            point[0] * s.scale,
            point[1] * s.scale,
            point[2] * s.scale,
            s.octaves,
            s.persistence,
            s.lacunarity,
        )
    }
}

/// Splits a coordinate into its wrapped lattice index and fractional offset.
fn lattice_cell(value: f64) -> (usize, f64) {
    let floor = value.floor();
    let index = ((floor as i64) & TABLE_MASK) as usize;
    (index, value - floor)
}

/// `6t^5 - 15t^4 + 10t^3`
fn smootherstep(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Uniformly distributed direction on the unit sphere.
fn random_unit_vector(rng: &mut fastrand::Rng) -> [f64; 3] {
    let z = rng.f64() * 2.0 - 1.0;
    let theta = rng.f64() * std::f64::consts::TAU;
    let r = (1.0 - z * z).sqrt();
    [r * theta.cos(), r * theta.sin(), z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn permutation_is_a_bijection_and_duplicated() {
        let field = NoiseField::new(42);
        let mut seen = [false; TABLE_SIZE];
        for i in 0..TABLE_SIZE {
            assert!(!seen[field.permutation[i]]);
            seen[field.permutation[i]] = true;
            assert_eq!(field.permutation[i], field.permutation[i + TABLE_SIZE]);
            assert_eq!(field.gradients[i], field.gradients[i + TABLE_SIZE]);
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn gradients_are_unit_length() {
        let field = NoiseField::new(3);
        for g in field.gradients.iter() {
            let len = (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt();
            assert_abs_diff_eq!(len, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn same_seed_gives_identical_samples() {
        let a = NoiseField::new(1234);
        let b = NoiseField::new(1234);
        for i in 0..200 {
            let t = i as f64 * 0.173;
            assert_eq!(a.sample3(t, -t * 0.5, t * 2.1), b.sample3(t, -t * 0.5, t * 2.1));
            assert_eq!(
                a.fractal(t, t, -t, 5, 0.5, 2.0),
                b.fractal(t, t, -t, 5, 0.5, 2.0)
            );
        }
    }

    #[test]
    fn different_seeds_give_different_fields() {
        let a = NoiseField::new(1);
        let b = NoiseField::new(2);
        let differs = (0..50).any(|i| {
            let t = i as f64 * 0.37 + 0.11;
            a.sample3(t, t * 0.7, t * 1.3) != b.sample3(t, t * 0.7, t * 1.3)
        });
        assert!(differs);
    }

    #[test]
    fn integer_lattice_points_sample_to_zero() {
        let field = NoiseField::new(9);
        for (x, y, z) in [(0.0, 0.0, 0.0), (3.0, -7.0, 12.0), (255.0, 256.0, -1.0)] {
            assert_abs_diff_eq!(field.sample3(x, y, z), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn sampling_is_continuous_across_integer_crossings() {
        let field = NoiseField::new(77);
        let eps = 1e-6;
        for crossing in -3..=3 {
            let c = crossing as f64;
            for &(y, z) in &[(0.31, 0.72), (5.5, -2.25), (-9.9, 100.1)] {
                let below = field.sample3(c - eps, y, z);
                let above = field.sample3(c + eps, y, z);
                assert!((above - below).abs() < 1e-4);

                let below = field.sample3(y, c - eps, z);
                let above = field.sample3(y, c + eps, z);
                assert!((above - below).abs() < 1e-4);

                let below = field.sample3(y, z, c - eps);
                let above = field.sample3(y, z, c + eps);
                assert!((above - below).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn large_coordinates_wrap_without_panicking() {
        let field = NoiseField::new(5);
        for &v in &[1.0e9 + 0.5, -1.0e12 - 0.25, 4.0e15, f64::MAX / 2.0] {
            let s = field.sample3(v, -v, v * 0.5);
            assert!((-1.0..=1.0).contains(&s));
        }
        // One full table period apart samples the same cell.
        assert_abs_diff_eq!(
            field.sample3(0.3, 0.6, 0.9),
            field.sample3(256.3, 256.6, 256.9),
            epsilon = 1e-9
        );
    }

    #[test]
    fn fractal_stays_bounded() {
        let field = NoiseField::new(2024);
        for octaves in 1..=8 {
            for &persistence in &[0.25, 0.5, 0.75, 1.0] {
                for i in 0..300 {
                    let t = i as f64 * 0.913;
                    let v = field.fractal(t, t * 0.37 - 4.0, -t * 1.7, octaves, persistence, 2.0);
                    assert!((-1.2..=1.2).contains(&v), "{v} out of range");
                }
            }
        }
    }

    #[test]
    fn zero_octaves_is_flat() {
        let field = NoiseField::new(8);
        assert_eq!(field.fractal(1.5, 2.5, 3.5, 0, 0.5, 2.0), 0.0);
    }

    #[test]
    fn single_octave_fractal_matches_plain_sample() {
        let field = NoiseField::new(10);
        assert_abs_diff_eq!(
            field.fractal(0.4, 1.7, -2.2, 1, 0.5, 2.0),
            field.sample3(0.4, 1.7, -2.2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn fractal_view_applies_scale() {
        let field = NoiseField::new(11);
        let settings = NoiseSettings {
            scale: 0.1,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
        };
        let view = field.fractal_view(settings);
        assert_abs_diff_eq!(
            view.get([13.0, 4.0, -7.0]),
            field.fractal(1.3, 0.4, -0.7, 3, 0.5, 2.0),
            epsilon = 1e-12
        );
        assert_eq!(field.get([0.2, 0.3, 0.4]), field.sample3(0.2, 0.3, 0.4));
    }
}
