use std::sync::Arc;

use crate::camera::{Camera, CameraEye};
use crate::color::Color;
use crate::direction::Direction;
use crate::geometry::{Geometry, IntersectionInfo, Ray};
use crate::lights::Light;
use crate::shading::{Shader, Texture};
use crate::transform::Transform;

/// A renderable (geometry, shader) pairing with its placement and an
/// optional bump texture. Geometry is owned exclusively; shaders and
/// textures are shared.
pub struct Node {
    pub geometry: Geometry,
    pub shader: Arc<Shader>,
    pub transform: Transform,
    pub bump: Option<Arc<Texture>>,
}

impl Node {
    pub fn new(geometry: Geometry, shader: Arc<Shader>) -> Node {
        Node {
            geometry,
            shader,
            transform: Transform::identity(),
            bump: None,
        }
    }

    /// Intersects in object space, then maps the hit back to world space.
    pub fn intersect(&self, ray: &Ray, info: &mut IntersectionInfo) -> bool {
        let local_ray = self.transform.undo_ray(ray);
        if !self.geometry.intersect(&local_ray, info) {
            return false;
        }
        info.ip = self.transform.point(info.ip);
        info.normal = self.transform.normal(info.normal).normalize();
        info.distance = (info.ip - ray.start).length();
        true
    }
}

#[derive(Debug, Clone)]
pub enum Environment {
    Constant(Color),
    /// Vertical gradient between a zenith and a horizon colour.
    Gradient { top: Color, bottom: Color },
}

impl Environment {
    pub fn sample(&self, dir: Direction) -> Color {
        match self {
            Environment::Constant(c) => *c,
            Environment::Gradient { top, bottom } => {
                let t = 0.5 * (dir.y / dir.length() + 1.0);
                *bottom * (1.0 - t) + *top * t
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub frame_width: usize,
    pub frame_height: usize,
    /// 0 means "use all logical CPUs".
    pub num_threads: usize,
    pub max_trace_depth: u16,
    pub want_aa: bool,
    pub want_prepass: bool,
    pub gi: bool,
    /// Paths per pixel when `gi` is on.
    pub num_paths: usize,
    pub saturation: f64,
    pub ambient_light: Color,
    pub fullscreen: bool,
    pub interactive: bool,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            frame_width: 640,
            frame_height: 480,
            num_threads: 0,
            max_trace_depth: 4,
            want_aa: true,
            want_prepass: false,
            gi: false,
            num_paths: 40,
            saturation: 1.0,
            ambient_light: Color::black(),
            fullscreen: false,
            interactive: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new()
    }
}

pub struct Scene {
    pub settings: Settings,
    pub camera: Camera,
    pub nodes: Vec<Node>,
    pub lights: Vec<Light>,
    pub environment: Option<Environment>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            settings: Settings::new(),
            camera: Camera::new(),
            nodes: Vec::new(),
            lights: Vec::new(),
            environment: None,
        }
    }

    /// Edge anti-aliasing runs only when it is not implicit in the per-pixel
    /// multisampling of depth-of-field or path tracing.
    pub fn need_aa_pass(&self) -> bool {
        self.settings.want_aa && !self.camera.dof && !self.settings.gi
    }

    /// One-time preparation: KD-trees and smooth-normal defaults.
    pub fn begin_render(&mut self) {
        for node in &mut self.nodes {
            node.geometry.begin_render();
        }
    }

    /// Per-frame preparation: camera basis, light areas, autofocus.
    pub fn begin_frame(&mut self) {
        for light in &mut self.lights {
            light.begin_frame();
        }
        self.camera
            .begin_frame(self.settings.frame_width, self.settings.frame_height);

        if self.camera.auto_focus {
            let ray = self.camera.get_screen_ray(
                self.settings.frame_width as f64 / 2.0,
                self.settings.frame_height as f64 / 2.0,
                CameraEye::Central,
            );
            let mut closest: f64 = 1e99;
            let mut info = IntersectionInfo::new();
            for node in &self.nodes {
                if node.intersect(&ray, &mut info) {
                    closest = closest.min(info.distance);
                }
            }
            println!("Autofocus: found distance: {:.2}", closest);
            self.camera.focal_plane_dist = closest;
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}
