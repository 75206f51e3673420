use std::f64::consts::PI;

use crate::color::Color;
use crate::direction::{faceforward, orthonormal_system};
use crate::geometry::{IntersectionInfo, Ray, RF_DIFFUSE};
use crate::random::Sampler;
use crate::scene::Scene;
use crate::shading::SpawnResult;
use crate::trace::raytrace;

/// Mirror reflection, perfect at glossiness 1 and increasingly blurred
/// below it.
#[derive(Debug, Clone)]
pub struct Refl {
    pub multiplier: f64,
    /// 1 is a perfect mirror; lower values widen the reflection cone.
    pub glossiness: f64,
    pub num_samples: usize,
}

impl Refl {
    pub fn new(multiplier: f64) -> Refl {
        Refl {
            multiplier,
            glossiness: 1.0,
            num_samples: 32,
        }
    }

    pub fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        info: &IntersectionInfo,
        sampler: &mut Sampler,
    ) -> Color {
        let n = faceforward(ray.dir, info.normal);

        if self.glossiness == 1.0 {
            let mut new_ray = ray
                .restarted_at(info.ip + n * 1e-6)
                .redirected(ray.dir.reflect(n).normalize());
            new_ray.depth += 1;

            raytrace(scene, &new_ray, sampler) * self.multiplier
        } else {
            // sample count drops on secondary bounces; the blur is barely
            // visible there anyway
            let count = if ray.depth > 0 { 2 } else { self.num_samples };
            let scaling = ((1.0 - self.glossiness) * PI / 2.0).tan();

            let mut result = Color::black();
            for _ in 0..count {
                let (a, b) = orthonormal_system(n);
                let (x, y) = sampler.unit_disc_sample();
                let modified_normal = n + a * (x * scaling) + b * (y * scaling);

                let mut new_ray = ray
                    .restarted_at(info.ip + n * 1e-6)
                    .redirected(ray.dir.reflect(modified_normal).normalize());
                new_ray.depth += 1;

                result += raytrace(scene, &new_ray, sampler) * self.multiplier;
            }
            result / count as f64
        }
    }

    pub fn spawn_ray(&self, info: &IntersectionInfo, incoming: &Ray) -> SpawnResult {
        if self.glossiness != 1.0 {
            return SpawnResult::NotImplemented;
        }

        let n = faceforward(incoming.dir, info.normal);
        let mut ray = incoming
            .restarted_at(info.ip + n * 1e-6)
            .redirected(incoming.dir.reflect(n).normalize());
        // a mirror bounce is not a diffuse scatter
        ray.flags &= !RF_DIFFUSE;

        SpawnResult::Sampled {
            ray,
            color: Color::new(self.multiplier, self.multiplier, self.multiplier),
            pdf: 1.0,
        }
    }
}
