use std::f64::consts::PI;
use std::sync::Arc;

use crate::color::Color;
use crate::direction::{faceforward, Direction, Dot};
use crate::geometry::{IntersectionInfo, Ray, RF_DIFFUSE};
use crate::random::Sampler;
use crate::scene::Scene;
use crate::shading::{get_light_contrib, SpawnResult, Texture};

/// Ideal diffuse surface.
#[derive(Clone)]
pub struct Lambert {
    pub color: Color,
    pub texture: Option<Arc<Texture>>,
}

impl Lambert {
    pub fn new(color: Color) -> Lambert {
        Lambert {
            color,
            texture: None,
        }
    }

    fn diffuse(&self, info: &IntersectionInfo) -> Color {
        match &self.texture {
            Some(t) => t.sample(info),
            None => self.color,
        }
    }

    pub fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        info: &IntersectionInfo,
        sampler: &mut Sampler,
    ) -> Color {
        let diffuse = self.diffuse(info);

        let mut result = Color::black();
        for light in &scene.lights {
            let n = light.num_samples();
            let mut sum = Color::black();
            for i in 0..n {
                let (light_pos, light_color) = light.nth_sample(i, info.ip, sampler);
                // from the light towards the intersection point
                let v2 = (info.ip - light_pos).normalize();
                // surface orientation towards the light
                let v1 = faceforward(ray.dir, info.normal);
                let lambert_coeff = v1.dot(-v2);
                sum += diffuse * lambert_coeff * get_light_contrib(scene, info, light_pos, light_color);
            }
            result += sum / n as f64;
        }
        result += scene.settings.ambient_light * diffuse;
        result
    }

    pub fn eval(&self, info: &IntersectionInfo, w_in: Direction, w_out: Direction) -> Color {
        let n = faceforward(w_in, info.normal);
        self.diffuse(info) * (1.0 / PI) * w_out.dot(n).max(0.0)
    }

    pub fn spawn_ray(
        &self,
        info: &IntersectionInfo,
        incoming: &Ray,
        sampler: &mut Sampler,
    ) -> SpawnResult {
        let n = faceforward(incoming.dir, info.normal);
        let dir = sampler.hemisphere_sample(n);

        let mut ray = incoming
            .restarted_at(info.ip + n * 1e-6)
            .redirected(dir);
        ray.flags |= RF_DIFFUSE;

        SpawnResult::Sampled {
            ray,
            color: self.diffuse(info) * (1.0 / PI) * dir.dot(n).max(0.0),
            pdf: 1.0 / (2.0 * PI),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;
    use crate::random::{init_random, Sampler};

    fn flat_hit() -> IntersectionInfo {
        let mut info = IntersectionInfo::new();
        info.ip = Point::zero();
        info.normal = Direction::new(0.0, 1.0, 0.0);
        info.distance = 1.0;
        info
    }

    #[test]
    fn eval_zero_below_horizon() {
        let s = Lambert::new(Color::white());
        let info = flat_hit();
        let w_in = Direction::new(0.0, -1.0, 0.0);
        let below = Direction::new(0.0, -1.0, 0.0);
        assert_eq!(s.eval(&info, w_in, below), Color::black());
    }

    #[test]
    fn eval_hemisphere_integral_recovers_albedo() {
        // Monte Carlo integrate eval over the hemisphere; with uniform
        // sampling (pdf = 1/2pi) the estimate converges to the albedo
        init_random(42);
        let mut sampler = Sampler::new(1);
        let albedo = Color::new(0.8, 0.5, 0.3);
        let s = Lambert::new(albedo);
        let info = flat_hit();
        let w_in = Direction::new(0.3, -0.8, 0.2).normalize();
        let n = faceforward(w_in, info.normal);

        let samples = 200_000;
        let mut sum = Color::black();
        for _ in 0..samples {
            let w_out = sampler.hemisphere_sample(n);
            sum += s.eval(&info, w_in, w_out) * (2.0 * PI);
        }
        let estimate = sum / samples as f64;
        assert!((estimate.r - albedo.r).abs() < 0.02);
        assert!((estimate.g - albedo.g).abs() < 0.02);
        assert!((estimate.b - albedo.b).abs() < 0.02);
    }

    #[test]
    fn spawned_rays_carry_the_diffuse_flag() {
        init_random(42);
        let mut sampler = Sampler::new(0);
        let s = Lambert::new(Color::white());
        let info = flat_hit();
        let incoming = Ray::new(Point::new(0.0, 1.0, -1.0), Direction::new(0.0, -1.0, 1.0).normalize());

        for _ in 0..64 {
            match s.spawn_ray(&info, &incoming, &mut sampler) {
                SpawnResult::Sampled { ray, color, pdf } => {
                    assert_ne!(ray.flags & RF_DIFFUSE, 0);
                    assert!((pdf - 1.0 / (2.0 * PI)).abs() < 1e-12);
                    assert!(ray.dir.dot(info.normal) >= 0.0);
                    assert!(color.intensity() >= 0.0);
                    // origin nudged off the surface along the normal
                    assert!(ray.start.y > 0.0);
                }
                _ => panic!("lambert must always sample"),
            }
        }
    }
}
