use std::sync::Arc;

use crate::color::Color;
use crate::direction::{faceforward, Dot};
use crate::geometry::{IntersectionInfo, Ray};
use crate::random::Sampler;
use crate::scene::Scene;
use crate::shading::{get_light_contrib, Texture};

/// Lambert plus a specular lobe. Whitted-only: the path tracer reports it
/// as unimplemented.
#[derive(Clone)]
pub struct Phong {
    pub color: Color,
    pub specular_exponent: f64,
    pub specular_multiplier: f64,
    pub texture: Option<Arc<Texture>>,
}

impl Phong {
    pub fn new(color: Color, specular_exponent: f64, specular_multiplier: f64) -> Phong {
        Phong {
            color,
            specular_exponent,
            specular_multiplier,
            texture: None,
        }
    }

    pub fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        info: &IntersectionInfo,
        sampler: &mut Sampler,
    ) -> Color {
        let diffuse = match &self.texture {
            Some(t) => t.sample(info),
            None => self.color,
        };

        let mut result = Color::black();
        for light in &scene.lights {
            let n = light.num_samples();
            let mut sum = Color::black();
            for i in 0..n {
                let (light_pos, light_color) = light.nth_sample(i, info.ip, sampler);
                let v2 = (info.ip - light_pos).normalize();
                let v1 = faceforward(ray.dir, info.normal);
                let lambert_coeff = v1.dot(-v2);
                let from_light = get_light_contrib(scene, info, light_pos, light_color);

                // specular: angle between the mirror of the light direction
                // and the viewer
                let r = v2.reflect(v1).normalize();
                let to_camera = -ray.dir;
                let cos_gamma = to_camera.dot(r);
                let phong_coeff = if cos_gamma > 0.0 {
                    cos_gamma.powf(self.specular_exponent)
                } else {
                    0.0
                };

                sum += diffuse * lambert_coeff * from_light
                    + phong_coeff * self.specular_multiplier * from_light;
            }
            result += sum / n as f64;
        }
        result += scene.settings.ambient_light * diffuse;
        result
    }
}
