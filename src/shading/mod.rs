use crate::color::Color;
use crate::direction::Direction;
use crate::geometry::{IntersectionInfo, Ray};
use crate::point::Point;
use crate::random::Sampler;
use crate::scene::Scene;
use crate::trace::visibility_check;

mod lambert;
mod layered;
mod phong;
mod refl;
mod refr;
mod texture;

pub use self::lambert::*;
pub use self::layered::*;
pub use self::phong::*;
pub use self::refl::*;
pub use self::refr::*;
pub use self::texture::*;

/// Outcome of sampling a new path direction from a BRDF.
pub enum SpawnResult {
    Sampled {
        ray: Ray,
        /// BRDF value with the cosine term absorbed.
        color: Color,
        pdf: f64,
    },
    /// The path ends here (for example total internal reflection).
    Absorbed,
    /// This BRDF has no path-tracing strategy; the integrator paints a
    /// diagnostic colour so the omission is visually obvious.
    NotImplemented,
}

/// Flat emitter used for debug surfaces and fixed-colour fills.
#[derive(Debug, Clone)]
pub struct ConstShader {
    pub color: Color,
}

/// The closed set of BRDFs, dispatched as a tagged sum like the geometry.
pub enum Shader {
    Lambert(Lambert),
    Phong(Phong),
    Refl(Refl),
    Refr(Refr),
    Layered(Layered),
    Const(ConstShader),
}

impl Shader {
    /// Whitted-integrator entry: direct lighting, plus recursion for the
    /// specular shaders.
    pub fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        info: &IntersectionInfo,
        sampler: &mut Sampler,
    ) -> Color {
        match self {
            Shader::Lambert(s) => s.shade(scene, ray, info, sampler),
            Shader::Phong(s) => s.shade(scene, ray, info, sampler),
            Shader::Refl(s) => s.shade(scene, ray, info, sampler),
            Shader::Refr(s) => s.shade(scene, ray, info, sampler),
            Shader::Layered(s) => s.shade(scene, ray, info, sampler),
            Shader::Const(s) => s.color,
        }
    }

    /// BRDF value for an explicit light sample. Specular and unimplemented
    /// shaders evaluate to black, which the path tracer reads as "skip".
    pub fn eval(&self, info: &IntersectionInfo, w_in: Direction, w_out: Direction) -> Color {
        match self {
            Shader::Lambert(s) => s.eval(info, w_in, w_out),
            _ => Color::black(),
        }
    }

    /// Samples a continuation ray for the path tracer.
    pub fn spawn_ray(
        &self,
        info: &IntersectionInfo,
        incoming: &Ray,
        sampler: &mut Sampler,
    ) -> SpawnResult {
        match self {
            Shader::Lambert(s) => s.spawn_ray(info, incoming, sampler),
            Shader::Refl(s) => s.spawn_ray(info, incoming),
            Shader::Refr(s) => s.spawn_ray(info, incoming),
            Shader::Const(_) => SpawnResult::Absorbed,
            _ => SpawnResult::NotImplemented,
        }
    }
}

/// Light arriving at `info.ip` from a sample position, with the inverse
/// square falloff; black when the segment is occluded.
pub(crate) fn get_light_contrib(
    scene: &Scene,
    info: &IntersectionInfo,
    light_pos: Point,
    light_color: Color,
) -> Color {
    let distance_to_light_sqr = (info.ip - light_pos).length_squared();

    if !visibility_check(scene, info.ip + info.normal * 1e-6, light_pos) {
        Color::black()
    } else {
        light_color / distance_to_light_sqr
    }
}
