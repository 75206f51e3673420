use crate::color::Color;
use crate::direction::{faceforward, refract, Dot};
use crate::geometry::{IntersectionInfo, Ray, RF_DIFFUSE};
use crate::random::Sampler;
use crate::scene::Scene;
use crate::shading::SpawnResult;
use crate::trace::raytrace;

/// Ideal refraction. `ior` is the ratio eta2 / eta1 of the media on the two
/// sides of the surface.
#[derive(Debug, Clone)]
pub struct Refr {
    pub ior: f64,
    pub multiplier: f64,
}

impl Refr {
    pub fn new(ior: f64, multiplier: f64) -> Refr {
        Refr { ior, multiplier }
    }

    fn refracted(&self, incoming: &Ray, info: &IntersectionInfo) -> Option<Ray> {
        let refr = if incoming.dir.dot(info.normal) < 0.0 {
            // entering the geometry
            refract(incoming.dir, info.normal, 1.0 / self.ior)
        } else {
            // leaving the geometry
            refract(incoming.dir, -info.normal, self.ior)
        };
        if refr.length_squared() == 0.0 {
            // total internal reflection
            return None;
        }
        Some(
            incoming
                .restarted_at(info.ip - faceforward(incoming.dir, info.normal) * 1e-6)
                .redirected(refr),
        )
    }

    pub fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        info: &IntersectionInfo,
        sampler: &mut Sampler,
    ) -> Color {
        match self.refracted(ray, info) {
            Some(mut new_ray) => {
                new_ray.depth += 1;
                raytrace(scene, &new_ray, sampler) * self.multiplier
            }
            None => Color::black(),
        }
    }

    pub fn spawn_ray(&self, info: &IntersectionInfo, incoming: &Ray) -> SpawnResult {
        match self.refracted(incoming, info) {
            Some(mut ray) => {
                ray.flags &= !RF_DIFFUSE;
                SpawnResult::Sampled {
                    ray,
                    color: Color::new(self.multiplier, self.multiplier, self.multiplier),
                    pdf: 1.0,
                }
            }
            None => SpawnResult::Absorbed,
        }
    }
}
