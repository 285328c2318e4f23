//! Boundary of a box-shaped fog volume whose top face undulates with noise.
//!
//! The value returned by [`VolumeBounds::signed_distance`] is negative inside
//! and non-negative outside. Its magnitude is only a coarse distance estimate:
//! outside the footprint it reports the offset to the nearest violated plane,
//! inside it reports the height above or below the noisy ceiling.

use glam::Vec3;

use crate::noise::NoiseSource;

pub const CEILING_FRACTION: f32 = 0.8;
pub const CEILING_AMPLITUDE: f32 = 0.8;
pub const CEILING_NOISE_SCALE: f32 = 0.1;
pub const CEILING_DRIFT: f32 = 0.02;
/// Width of the tapering band, as a fraction of the shorter horizontal extent.
pub const EDGE_FRACTION: f32 = 0.2;

#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Axis-aligned box, inclusive on all faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl VolumeBounds {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_intervals(x: (f32, f32), y: (f32, f32), z: (f32, f32)) -> Self {
        Self::new(Vec3::new(x.0, y.0, z.0), Vec3::new(x.1, y.1, z.1))
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Height of the volume's top surface above the footprint point `(p.x, p.z)`.
    ///
    /// Flat at `min.y` on the footprint border, rising smoothly over the edge
    /// band to the noise-perturbed ceiling at `CEILING_FRACTION` of the height.
    pub fn ceiling<N: NoiseSource + ?Sized>(&self, p: Vec3, noise: &N, time: f32) -> f32 {
        let extent = self.extent();
        let base = self.min.y + CEILING_FRACTION * extent.y;

        let drift = Vec3::new(1.0, 0.0, 1.0) * (CEILING_DRIFT * time);
        let sample = Vec3::new(p.x, base, p.z) * CEILING_NOISE_SCALE + drift;
        let undulating = base + CEILING_AMPLITUDE * (noise.fractal01(sample) - 0.5);

        let margin = EDGE_FRACTION * extent.x.min(extent.z);
        let edge = (p.x - self.min.x)
            .min(self.max.x - p.x)
            .min(p.z - self.min.z)
            .min(self.max.z - p.z);
        let blend = if margin > 0.0 {
            smoothstep(0.0, margin, edge)
        } else {
            1.0
        };

        mix(self.min.y, undulating, blend)
    }

    pub fn signed_distance<N: NoiseSource + ?Sized>(&self, p: Vec3, noise: &N, time: f32) -> f32 {
        if p.y < self.min.y || p.x < self.min.x || p.z < self.min.z {
            return nearest_violation(&[
                self.min.y - p.y,
                self.min.x - p.x,
                self.min.z - p.z,
            ]);
        }

        if p.x > self.max.x || p.z > self.max.z {
            return nearest_violation(&[p.x - self.max.x, p.z - self.max.z]);
        }

        p.y - self.ceiling(p, noise, time)
    }
}

/// Smallest positive plane offset. At least one offset is positive on every call site.
fn nearest_violation(offsets: &[f32]) -> f32 {
    offsets
        .iter()
        .copied()
        .filter(|d| *d > 0.0)
        .fold(f32::INFINITY, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::SimplexNoise;
    use crate::noise::tests::FixedNoise;

    fn unit_box() -> VolumeBounds {
        VolumeBounds::from_intervals((-5.0, 5.0), (0.0, 10.0), (-5.0, 5.0))
    }

    #[test]
    fn below_the_floor_is_outside() {
        let d = unit_box().signed_distance(Vec3::new(0.0, -1.0, 0.0), &SimplexNoise, 0.0);
        assert!(d >= 0.0);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn deep_inside_is_negative() {
        for t in [0.0, 3.5, 100.0] {
            let d = unit_box().signed_distance(Vec3::new(0.0, 5.0, 0.0), &SimplexNoise, t);
            assert!(d < 0.0, "expected inside at t={t}, got {d}");
        }
    }

    #[test]
    fn beyond_upper_faces_reports_the_nearest_offset() {
        let bounds = unit_box();
        let d = bounds.signed_distance(Vec3::new(7.0, 5.0, 6.0), &SimplexNoise, 0.0);
        assert!((d - 1.0).abs() < 1e-6);

        let d = bounds.signed_distance(Vec3::new(0.0, 5.0, 5.5), &SimplexNoise, 0.0);
        assert!((d - 0.5).abs() < 1e-6);
    }

    #[test]
    fn above_the_ceiling_is_outside() {
        let d = unit_box().signed_distance(Vec3::new(0.0, 9.5, 0.0), &SimplexNoise, 0.0);
        assert!(d > 0.0);
    }

    #[test]
    fn neutral_noise_gives_the_flat_ceiling() {
        let bounds = unit_box();
        let ceiling = bounds.ceiling(Vec3::new(0.0, 5.0, 0.0), &FixedNoise(0.5), 0.0);
        assert!((ceiling - 8.0).abs() < 1e-5);
    }

    #[test]
    fn noise_moves_the_ceiling_by_its_amplitude() {
        let bounds = unit_box();
        let p = Vec3::new(1.0, 5.0, -1.0);
        let high = bounds.ceiling(p, &FixedNoise(1.0), 0.0);
        let low = bounds.ceiling(p, &FixedNoise(0.0), 0.0);
        assert!((high - 8.4).abs() < 1e-5);
        assert!((low - 7.6).abs() < 1e-5);
    }

    #[test]
    fn ceiling_tapers_towards_the_footprint_edge() {
        let bounds = unit_box();
        let noise = FixedNoise(0.5);
        let heights: Vec<f32> = [5.0, 4.5, 4.0, 3.5, 3.0, 0.0]
            .iter()
            .map(|x| bounds.ceiling(Vec3::new(*x, 0.0, 0.0), &noise, 0.0))
            .collect();

        assert!(heights[0].abs() < 1e-6, "edge should sit on the floor");
        for pair in heights.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        // The band is 2 units wide; past it the ceiling is flat.
        assert!((heights[4] - 8.0).abs() < 1e-5);
        assert!((heights[5] - 8.0).abs() < 1e-5);
    }

    #[test]
    fn contains_is_inclusive() {
        let bounds = VolumeBounds::from_intervals((-1.0, 1.0), (0.0, 1.0), (-1.0, 1.0));
        assert!(bounds.contains(Vec3::ZERO));
        assert!(bounds.contains(Vec3::new(1.0, 1.0, -1.0)));
        assert!(!bounds.contains(Vec3::new(0.0, -0.01, 0.0)));
    }

    #[test]
    fn bounds_are_normalized() {
        let bounds = VolumeBounds::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
    }
}
