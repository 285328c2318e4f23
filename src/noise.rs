//! 3D simplex noise and its rotated four-octave fractal sum.
//!
//! The lattice hash is a `sin`-based scramble, so the field is a pure function
//! of its input: the same point always produces the same bits on a given
//! platform. The WGSL copy in [`crate::shaders::NOISE_WGSL`] mirrors this code
//! line for line.

use glam::{Mat3, Vec3, Vec3Swizzles, Vec4};

// Skew constants for the tetrahedral lattice
pub const F3: f32 = 0.333_333_3;
pub const G3: f32 = 0.166_666_7;
pub const SURFLET_RADIUS: f32 = 0.6;
pub const NORMALIZATION: f32 = 52.0;

pub const OCTAVE_WEIGHTS: [f32; 4] = [0.533_333_3, 0.266_666_7, 0.133_333_3, 0.066_666_7];

// Column-major, one per octave. The fourth octave is unrotated.
const ROT1: Mat3 = Mat3::from_cols_array(&[-0.37, 0.36, 0.85, -0.14, -0.93, 0.34, 0.92, 0.01, 0.4]);
const ROT2: Mat3 = Mat3::from_cols_array(&[-0.55, -0.39, 0.74, 0.33, -0.91, -0.24, 0.77, 0.12, 0.63]);
const ROT3: Mat3 = Mat3::from_cols_array(&[-0.71, 0.52, -0.47, -0.08, -0.72, -0.68, -0.7, -0.45, 0.56]);

/// A scalar field over 3D space.
///
/// Implementors only provide the single-octave `sample`; the fractal sums are
/// derived from it. Tests substitute constant sources to pin density.
pub trait NoiseSource {
    /// Single octave, nominally in [-1, 1].
    fn sample(&self, p: Vec3) -> f32;

    /// Four octaves at doubling frequency, each rotated to break up axis-aligned artifacts.
    fn fractal(&self, m: Vec3) -> f32 {
        OCTAVE_WEIGHTS[0] * self.sample(rotate(m, ROT1))
            + OCTAVE_WEIGHTS[1] * self.sample(rotate(2.0 * m, ROT2))
            + OCTAVE_WEIGHTS[2] * self.sample(rotate(4.0 * m, ROT3))
            + OCTAVE_WEIGHTS[3] * self.sample(8.0 * m)
    }

    /// `fractal` remapped from [-1, 1] to [0, 1]. Density math downstream assumes this range.
    fn fractal01(&self, m: Vec3) -> f32 {
        0.5 + 0.5 * self.fractal(m)
    }
}

impl<N: NoiseSource + ?Sized> NoiseSource for &N {
    fn sample(&self, p: Vec3) -> f32 {
        (**self).sample(p)
    }

    fn fractal(&self, m: Vec3) -> f32 {
        (**self).fractal(m)
    }

    fn fractal01(&self, m: Vec3) -> f32 {
        (**self).fractal01(m)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplexNoise;

impl NoiseSource for SimplexNoise {
    #[inline]
    fn sample(&self, p: Vec3) -> f32 {
        simplex3d(p)
    }
}

/// GLSL-style `fract`: always in [0, 1), also for negative input.
#[inline(always)]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Row-vector times matrix, `m * rot` in shader notation.
#[inline(always)]
fn rotate(m: Vec3, rot: Mat3) -> Vec3 {
    Vec3::new(m.dot(rot.x_axis), m.dot(rot.y_axis), m.dot(rot.z_axis))
}

/// Pseudo-random gradient in [-0.5, 0.5)^3 for a lattice corner.
pub fn random3(c: Vec3) -> Vec3 {
    let mut j = 4096.0 * c.dot(Vec3::new(17.0, 59.4, 15.0)).sin();
    let z = fract(512.0 * j);
    j *= 0.125;
    let x = fract(512.0 * j);
    j *= 0.125;
    let y = fract(512.0 * j);
    Vec3::new(x, y, z) - 0.5
}

pub fn simplex3d(p: Vec3) -> f32 {
    // Skewed cell origin and offset of p from it
    let s = (p + p.dot(Vec3::splat(F3))).floor();
    let x = p - s + s.dot(Vec3::splat(G3));

    // Axis ordering of the offset picks the tetrahedron
    let e = Vec3::select((x - x.yzx()).cmpge(Vec3::ZERO), Vec3::ONE, Vec3::ZERO);
    let i1 = e * (Vec3::ONE - e.zxy());
    let i2 = Vec3::ONE - e.zxy() * (Vec3::ONE - e);

    let x1 = x - i1 + G3;
    let x2 = x - i2 + 2.0 * G3;
    let x3 = x - 1.0 + 3.0 * G3;

    let w = Vec4::new(x.dot(x), x1.dot(x1), x2.dot(x2), x3.dot(x3));
    let w = (Vec4::splat(SURFLET_RADIUS) - w).max(Vec4::ZERO);

    let d = Vec4::new(
        random3(s).dot(x),
        random3(s + i1).dot(x1),
        random3(s + i2).dot(x2),
        random3(s + 1.0).dot(x3),
    );

    let w = w * w;
    let w = w * w;
    (d * w).dot(Vec4::splat(NORMALIZATION))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Returns the same value for every query, in both conventions.
    pub(crate) struct FixedNoise(pub f32);

    impl NoiseSource for FixedNoise {
        fn sample(&self, _p: Vec3) -> f32 {
            self.0 * 2.0 - 1.0
        }

        fn fractal(&self, _m: Vec3) -> f32 {
            self.0 * 2.0 - 1.0
        }

        fn fractal01(&self, _m: Vec3) -> f32 {
            self.0
        }
    }

    fn random_points(count: usize) -> Vec<Vec3> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        (0..count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                )
            })
            .collect()
    }

    #[test]
    fn fract_matches_shader_semantics() {
        assert_eq!(fract(1.25), 0.25);
        assert_eq!(fract(-0.25), 0.75);
        assert_eq!(fract(-3.0), 0.0);
    }

    #[test]
    fn noise_is_deterministic() {
        for p in random_points(500) {
            let a = SimplexNoise.fractal(p);
            let b = SimplexNoise.fractal(p);
            assert_eq!(a.to_bits(), b.to_bits(), "noise changed between calls at {p}");
        }
    }

    #[test]
    fn gradients_are_centered() {
        for p in random_points(200) {
            let g = random3(p.floor());
            assert!(g.cmpge(Vec3::splat(-0.5)).all() && g.cmplt(Vec3::splat(0.5)).all());
        }
    }

    #[test]
    fn fractal_stays_bounded() {
        for p in random_points(10_000) {
            let v = SimplexNoise.fractal(p);
            assert!((-1.05..=1.05).contains(&v), "fractal out of range at {p}: {v}");
            let r = SimplexNoise.fractal01(p);
            assert!((-0.05..=1.05).contains(&r), "remapped fractal out of range at {p}: {r}");
        }
    }

    #[test]
    fn field_varies_smoothly() {
        let p = Vec3::new(1.3, 2.7, -0.4);
        let eps = 1e-3;
        let here = SimplexNoise.fractal(p);
        let there = SimplexNoise.fractal(p + Vec3::splat(eps));
        assert!((here - there).abs() < 0.05);
    }
}
