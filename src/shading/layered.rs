use std::sync::Arc;

use crate::color::Color;
use crate::geometry::{IntersectionInfo, Ray};
use crate::random::Sampler;
use crate::scene::Scene;
use crate::shading::{Shader, Texture};

const MAX_LAYERS: usize = 32;

#[derive(Clone)]
pub struct Layer {
    pub shader: Arc<Shader>,
    pub blend: Color,
    pub tex: Option<Arc<Texture>>,
}

/// Composes up to 32 shaders in addition order; later layers blend over the
/// result of the earlier ones.
#[derive(Clone, Default)]
pub struct Layered {
    layers: Vec<Layer>,
}

impl Layered {
    pub fn new() -> Layered {
        Layered { layers: Vec::new() }
    }

    pub fn add_layer(&mut self, shader: Arc<Shader>, blend: Color, tex: Option<Arc<Texture>>) {
        if self.layers.len() == MAX_LAYERS {
            return;
        }
        self.layers.push(Layer { shader, blend, tex });
    }

    pub fn shade(
        &self,
        scene: &Scene,
        ray: &Ray,
        info: &IntersectionInfo,
        sampler: &mut Sampler,
    ) -> Color {
        let mut result = Color::black();
        for layer in &self.layers {
            let from_layer = layer.shader.shade(scene, ray, info, sampler);
            let mut blend_amount = layer.blend;
            if let Some(tex) = &layer.tex {
                blend_amount = blend_amount * tex.sample(info);
            }
            result = blend_amount * from_layer + (Color::white() - blend_amount) * result;
        }
        result
    }
}
