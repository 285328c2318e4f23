//! Per-fragment fog compositor.
//!
//! The march starts where the view ray meets the volume's far surface (the
//! rasterized fragment) and walks back towards the eye in fixed steps. Each
//! step inside the volume absorbs part of the remaining transmittance and adds
//! the noise value as emitted luminance, weighted by what is still visible.
//! The result is premultiplied: `rgb` is the scattered light, `a = 1 - T`.

use glam::{Vec3, Vec4};

use crate::config::FogSettings;
use crate::noise::NoiseSource;
use crate::volume::VolumeBounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raymarcher {
    pub settings: FogSettings,
}

impl Default for Raymarcher {
    fn default() -> Self {
        Self::new(FogSettings::default())
    }
}

impl Raymarcher {
    pub fn new(settings: FogSettings) -> Self {
        Self { settings }
    }

    /// Composited fog colour for the ray from `origin` (the eye) through `target`.
    pub fn march<N: NoiseSource + ?Sized>(
        &self,
        origin: Vec3,
        target: Vec3,
        bounds: &VolumeBounds,
        time: f32,
        noise: &N,
    ) -> Vec4 {
        self.integrate(origin, target, bounds, time, noise, None)
    }

    /// Same as [`march`](Self::march), also returning the running alpha after every step taken.
    pub fn march_traced<N: NoiseSource + ?Sized>(
        &self,
        origin: Vec3,
        target: Vec3,
        bounds: &VolumeBounds,
        time: f32,
        noise: &N,
    ) -> (Vec4, Vec<f32>) {
        let mut trace = Vec::with_capacity(self.settings.step_count as usize);
        let color = self.integrate(origin, target, bounds, time, noise, Some(&mut trace));
        (color, trace)
    }

    /// Where the density noise is sampled for a world position at `time`.
    #[inline]
    pub fn density_coord(&self, p: Vec3, time: f32) -> Vec3 {
        p * self.settings.noise_scale + self.settings.drift * time
    }

    fn integrate<N: NoiseSource + ?Sized>(
        &self,
        origin: Vec3,
        target: Vec3,
        bounds: &VolumeBounds,
        time: f32,
        noise: &N,
        mut trace: Option<&mut Vec<f32>>,
    ) -> Vec4 {
        let s = &self.settings;
        let step = (origin - target).normalize_or_zero() * s.step_size;

        let mut p = target;
        let mut alpha = 1.0_f32;
        let mut color = Vec3::ZERO;

        for _ in 0..s.step_count {
            if bounds.contains(p) {
                let d = bounds.signed_distance(p, noise, time);
                if d < 0.0 {
                    let luminance = noise.fractal01(self.density_coord(p, time));
                    let extinction = (-d).max(0.0) * s.extinction_scale * luminance;
                    let transmittance = (-extinction * s.step_size).exp();

                    color += Vec3::splat(luminance * (1.0 - transmittance) * alpha);
                    alpha *= transmittance;
                }
            }

            if let Some(trace) = trace.as_mut() {
                trace.push(alpha);
            }

            if s.early_exit && alpha < s.alpha_cutoff {
                alpha = 0.0;
                break;
            }

            p += step;
        }

        color.extend(1.0 - alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::SimplexNoise;
    use crate::noise::tests::FixedNoise;

    fn tall_box() -> VolumeBounds {
        VolumeBounds::from_intervals((-5.0, 5.0), (0.0, 10.0), (-5.0, 5.0))
    }

    #[test]
    fn empty_density_is_transparent() {
        let bounds = VolumeBounds::from_intervals((-1.0, 1.0), (0.0, 1.0), (-1.0, 1.0));
        let marcher = Raymarcher::new(FogSettings::default().with_steps(0.5, 4));
        let (color, trace) = marcher.march_traced(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::ZERO,
            &bounds,
            0.0,
            &FixedNoise(0.0),
        );

        assert_eq!(color.w, 0.0);
        assert_eq!(color.truncate(), Vec3::ZERO);
        assert_eq!(trace, vec![1.0; 4]);
    }

    #[test]
    fn ray_outside_the_box_contributes_nothing() {
        let marcher = Raymarcher::default();
        let color = marcher.march(
            Vec3::new(0.0, 50.0, 40.0),
            Vec3::new(0.0, 20.0, 30.0),
            &tall_box(),
            1.0,
            &SimplexNoise,
        );
        assert_eq!(color, Vec4::ZERO);
    }

    #[test]
    fn running_alpha_never_increases() {
        let marcher = Raymarcher::new(FogSettings::default().with_early_exit(false));
        for t in [0.0, 1.7, 42.0] {
            let (color, trace) = marcher.march_traced(
                Vec3::new(3.0, 12.0, 2.0),
                Vec3::new(0.5, 1.0, -0.5),
                &tall_box(),
                t,
                &SimplexNoise,
            );
            assert_eq!(trace.len(), 20);
            assert!(trace[0] <= 1.0);
            for pair in trace.windows(2) {
                assert!(pair[1] <= pair[0], "alpha rose from {} to {}", pair[0], pair[1]);
            }
            assert!(color.truncate().cmpge(Vec3::ZERO).all());
            assert!((0.0..=1.0).contains(&color.w));
        }
    }

    #[test]
    fn scattered_color_accumulates_monotonically() {
        let bounds = tall_box();
        let origin = Vec3::new(0.0, 20.0, 0.0);
        let target = Vec3::new(0.0, 1.0, 0.0);
        let mut previous = Vec4::ZERO;
        for steps in 1..=20 {
            let marcher = Raymarcher::new(
                FogSettings::default().with_steps(0.1, steps).with_early_exit(false),
            );
            let color = marcher.march(origin, target, &bounds, 0.0, &SimplexNoise);
            assert!(color.x >= previous.x);
            assert!(color.w >= previous.w);
            previous = color;
        }
    }

    #[test]
    fn early_exit_matches_the_full_march() {
        let bounds = tall_box();
        let origin = Vec3::new(0.0, 20.0, 0.0);
        let target = Vec3::new(0.0, 1.0, 0.0);
        let noise = FixedNoise(1.0);

        let full = Raymarcher::new(FogSettings::default().with_early_exit(false));
        let (full_color, full_trace) = full.march_traced(origin, target, &bounds, 0.0, &noise);
        assert!(full_trace[9] < 0.003, "ray must saturate within ten steps");

        let early = Raymarcher::default();
        let (early_color, early_trace) = early.march_traced(origin, target, &bounds, 0.0, &noise);
        assert!(early_trace.len() < full_trace.len());

        assert!((full_color - early_color).abs().max_element() < 1e-3);
        assert_eq!(early_color.w, 1.0);
    }

    #[test]
    fn early_exit_mid_march_matches_the_full_march() {
        let bounds = tall_box();
        // Thin enough that varying density takes several steps to saturate
        let mut settings = FogSettings::default().with_steps(0.1, 40).with_early_exit(false);
        settings.extinction_scale = 3.0;
        let full = Raymarcher::new(settings);
        let early = Raymarcher::new(settings.with_early_exit(true));

        for x in [-2.5, 0.0, 1.5, 2.5] {
            let origin = Vec3::new(x, 20.0, 0.0);
            let target = Vec3::new(x, 1.0, 0.0);
            let (full_color, full_trace) = full.march_traced(origin, target, &bounds, 3.0, &SimplexNoise);
            let (early_color, early_trace) = early.march_traced(origin, target, &bounds, 3.0, &SimplexNoise);

            let crossing = full_trace
                .iter()
                .position(|a| *a < settings.alpha_cutoff)
                .expect("ray should saturate inside the box");
            assert!(crossing > 0, "x = {x}: saturated on the first step");
            assert!(crossing < full_trace.len() - 1, "x = {x}: saturated on the last step");

            assert_eq!(early_trace.len(), crossing + 1);
            assert_eq!(early_trace[..crossing], full_trace[..crossing]);
            assert_eq!(early_color.w, 1.0);
            // What the full march still adds is scaled by the alpha left at the cutoff
            assert!(
                (full_color - early_color).abs().max_element() < 2.0 * settings.alpha_cutoff,
                "x = {x}: {full_color} vs {early_color}"
            );
        }
    }

    #[test]
    fn saturation_snaps_alpha_to_zero() {
        let marcher = Raymarcher::default();
        let color = marcher.march(
            Vec3::new(0.0, 20.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            &tall_box(),
            0.0,
            &FixedNoise(1.0),
        );
        assert_eq!(color.w, 1.0);
        assert!(color.x > 0.99);
    }

    #[test]
    fn marching_is_pure() {
        let marcher = Raymarcher::default();
        let args = (Vec3::new(2.0, 9.0, 1.0), Vec3::new(0.0, 2.0, 0.0));
        let a = marcher.march(args.0, args.1, &tall_box(), 3.0, &SimplexNoise);
        let b = marcher.march(args.0, args.1, &tall_box(), 3.0, &SimplexNoise);
        assert_eq!(a, b);
    }

    #[test]
    fn coincident_origin_and_target_do_not_produce_nan() {
        let marcher = Raymarcher::default();
        let p = Vec3::new(0.0, 2.0, 0.0);
        let color = marcher.march(p, p, &tall_box(), 0.0, &SimplexNoise);
        assert!(color.is_finite());
    }
}
