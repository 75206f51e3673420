use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::camera::Camera;
use crate::color::Color;
use crate::direction::Direction;
use crate::geometry::{CsgKind, CsgOp, Cube, Geometry, Mesh, Plane, Sphere, Triangle};
use crate::lights::{Light, PointLight, RectLight};
use crate::point::Point;
use crate::scene::{Environment, Node, Scene, Settings};
use crate::shading::{
    Bumps, BumpTexture, BitmapTexture, CheckerTexture, ConstShader, Fresnel, Lambert, Layered,
    Phong, Refl, Refr, Shader, Texture,
};
use crate::transform::Transform;
use crate::vector::Vector2f;

const UNBOUNDED: f64 = 1e99;

#[derive(Debug)]
pub enum SceneError {
    Io(std::io::Error),
    Syntax { line: usize, message: String },
    MissingProp { block: String, prop: String },
    UnknownElement { line: usize, class: String },
    Obj { file: String, message: String },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Io(e) => write!(f, "cannot read scene: {}", e),
            SceneError::Syntax { line, message } => write!(f, "line {}: {}", line, message),
            SceneError::MissingProp { block, prop } => {
                write!(f, "block `{}': missing required property `{}'", block, prop)
            }
            SceneError::UnknownElement { line, class } => {
                write!(f, "line {}: unknown element type `{}'", line, class)
            }
            SceneError::Obj { file, message } => {
                write!(f, "cannot load mesh `{}': {}", file, message)
            }
        }
    }
}

impl std::error::Error for SceneError {}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        SceneError::Io(e)
    }
}

/// What a block header names; the parser routes `fill_properties` on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Camera,
    Geometry,
    Shader,
    Texture,
    Light,
    Node,
    Environment,
    Settings,
}

fn element_kind(class: &str) -> Option<ElementKind> {
    match class {
        "GlobalSettings" => Some(ElementKind::Settings),
        "Camera" => Some(ElementKind::Camera),
        "Plane" | "Sphere" | "Cube" | "Mesh" | "CsgAnd" | "CsgPlus" | "CsgOr" | "CsgMinus" => {
            Some(ElementKind::Geometry)
        }
        "Lambert" | "Phong" | "Refl" | "Refr" | "Layered" | "Const" => Some(ElementKind::Shader),
        "CheckerTexture" | "BitmapTexture" | "BumpTexture" | "Fresnel" | "Bumps" => {
            Some(ElementKind::Texture)
        }
        "PointLight" | "RectLight" => Some(ElementKind::Light),
        "Node" => Some(ElementKind::Node),
        "Environment" => Some(ElementKind::Environment),
        _ => None,
    }
}

#[derive(Default)]
struct Registry {
    geometries: HashMap<String, Geometry>,
    shaders: HashMap<String, Arc<Shader>>,
    textures: HashMap<String, Arc<Texture>>,
}

struct PropLine {
    line: usize,
    name: String,
    value: String,
}

/// A parsed scene-file block: the property bag every element fills itself
/// from. Typed getters return `Ok(false)` for absent optional properties and
/// fail with a line-numbered error on malformed values.
pub struct ParsedBlock<'a> {
    class: String,
    name: String,
    props: Vec<PropLine>,
    registry: &'a Registry,
    base_dir: &'a Path,
}

impl<'a> ParsedBlock<'a> {
    fn find(&self, name: &str) -> Option<&PropLine> {
        self.props.iter().find(|p| p.name == name)
    }

    pub fn signal_error(&self, line: usize, message: &str) -> SceneError {
        SceneError::Syntax {
            line,
            message: message.to_string(),
        }
    }

    pub fn required_prop(&self, prop: &str) -> SceneError {
        SceneError::MissingProp {
            block: format!("{} {}", self.class, self.name),
            prop: prop.to_string(),
        }
    }

    pub fn get_double_prop(
        &self,
        name: &str,
        out: &mut f64,
        min: f64,
        max: f64,
    ) -> Result<bool, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(false),
        };
        let value: f64 = prop
            .value
            .parse()
            .map_err(|_| self.signal_error(prop.line, "invalid number"))?;
        if value < min || value > max {
            return Err(self.signal_error(prop.line, "value out of range"));
        }
        *out = value;
        Ok(true)
    }

    pub fn get_float_prop(
        &self,
        name: &str,
        out: &mut f64,
        min: f64,
        max: f64,
    ) -> Result<bool, SceneError> {
        self.get_double_prop(name, out, min, max)
    }

    pub fn get_int_prop(
        &self,
        name: &str,
        out: &mut i64,
        min: i64,
        max: i64,
    ) -> Result<bool, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(false),
        };
        let value: i64 = prop
            .value
            .parse()
            .map_err(|_| self.signal_error(prop.line, "invalid integer"))?;
        if value < min || value > max {
            return Err(self.signal_error(prop.line, "value out of range"));
        }
        *out = value;
        Ok(true)
    }

    pub fn get_bool_prop(&self, name: &str, out: &mut bool) -> Result<bool, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(false),
        };
        *out = match prop.value.as_str() {
            "true" | "on" | "yes" | "1" => true,
            "false" | "off" | "no" | "0" => false,
            _ => return Err(self.signal_error(prop.line, "invalid boolean")),
        };
        Ok(true)
    }

    fn get_triple(&self, name: &str) -> Result<Option<(f64, f64, f64)>, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(None),
        };
        let triple = parse_triple(&prop.value)
            .ok_or_else(|| self.signal_error(prop.line, "expected a (x, y, z) triple"))?;
        Ok(Some(triple))
    }

    pub fn get_vector_prop(&self, name: &str, out: &mut Point) -> Result<bool, SceneError> {
        if let Some((x, y, z)) = self.get_triple(name)? {
            *out = Point::new(x, y, z);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn get_color_prop(&self, name: &str, out: &mut Color) -> Result<bool, SceneError> {
        if let Some((r, g, b)) = self.get_triple(name)? {
            *out = Color::new(r, g, b);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn get_texture_prop(
        &self,
        name: &str,
        out: &mut Option<Arc<Texture>>,
    ) -> Result<bool, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(false),
        };
        let texture = self
            .registry
            .textures
            .get(prop.value.as_str())
            .ok_or_else(|| self.signal_error(prop.line, "no texture with that name"))?;
        *out = Some(texture.clone());
        Ok(true)
    }

    pub fn get_shader_prop(
        &self,
        name: &str,
        out: &mut Option<Arc<Shader>>,
    ) -> Result<bool, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(false),
        };
        let shader = self
            .registry
            .shaders
            .get(prop.value.as_str())
            .ok_or_else(|| self.signal_error(prop.line, "no shader with that name"))?;
        *out = Some(shader.clone());
        Ok(true)
    }

    /// Geometries are cloned out of the registry: every node owns its
    /// geometry exclusively.
    pub fn get_geometry_prop(
        &self,
        name: &str,
        out: &mut Option<Geometry>,
    ) -> Result<bool, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(false),
        };
        let geometry = self
            .registry
            .geometries
            .get(prop.value.as_str())
            .ok_or_else(|| self.signal_error(prop.line, "no geometry with that name"))?;
        *out = Some(geometry.clone());
        Ok(true)
    }

    /// Accumulates `scale`, `rotate` and `translate` lines in the order they
    /// appear in the block.
    pub fn get_transform_prop(&self, out: &mut Transform) -> Result<(), SceneError> {
        for prop in &self.props {
            match prop.name.as_str() {
                "scale" => {
                    let (x, y, z) = parse_triple(&prop.value)
                        .ok_or_else(|| self.signal_error(prop.line, "expected a triple"))?;
                    out.scale(x, y, z);
                }
                "rotate" => {
                    let (yaw, pitch, roll) = parse_triple(&prop.value)
                        .ok_or_else(|| self.signal_error(prop.line, "expected a triple"))?;
                    out.rotate(yaw, pitch, roll);
                }
                "translate" => {
                    let (x, y, z) = parse_triple(&prop.value)
                        .ok_or_else(|| self.signal_error(prop.line, "expected a triple"))?;
                    out.translate(Direction::new(x, y, z));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn get_filename_prop(&self, name: &str) -> Result<Option<PathBuf>, SceneError> {
        let prop = match self.find(name) {
            Some(p) => p,
            None => return Ok(None),
        };
        let raw = prop.value.trim_matches('"');
        let path = self.base_dir.join(raw);
        if !path.exists() {
            return Err(self.signal_error(prop.line, "file not found"));
        }
        Ok(Some(path))
    }

    pub fn get_bitmap_file_prop(
        &self,
        name: &str,
        assumed_gamma: f64,
    ) -> Result<Option<Bitmap>, SceneError> {
        let path = match self.get_filename_prop(name)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let line = self.find(name).map(|p| p.line).unwrap_or(0);
        Bitmap::load(&path, assumed_gamma)
            .map(Some)
            .map_err(|e| self.signal_error(line, &format!("cannot decode bitmap: {}", e)))
    }
}

fn parse_triple(value: &str) -> Option<(f64, f64, f64)> {
    let cleaned = value.trim().trim_start_matches('(').trim_end_matches(')');
    let parts: Vec<&str> = cleaned
        .split(|c| c == ',' || char::is_whitespace(c))
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    Some((
        parts[0].parse().ok()?,
        parts[1].parse().ok()?,
        parts[2].parse().ok()?,
    ))
}

// --- element assembly ------------------------------------------------------

fn fill_settings(settings: &mut Settings, pb: &ParsedBlock) -> Result<(), SceneError> {
    let mut v: i64 = 0;
    if pb.get_int_prop("frameWidth", &mut v, 1, 8192)? {
        settings.frame_width = v as usize;
    }
    if pb.get_int_prop("frameHeight", &mut v, 1, 8192)? {
        settings.frame_height = v as usize;
    }
    if pb.get_int_prop("numThreads", &mut v, 0, 1024)? {
        settings.num_threads = v as usize;
    }
    if pb.get_int_prop("maxTraceDepth", &mut v, 0, 200)? {
        settings.max_trace_depth = v as u16;
    }
    if pb.get_int_prop("numPaths", &mut v, 1, 1 << 20)? {
        settings.num_paths = v as usize;
    }
    pb.get_bool_prop("wantAA", &mut settings.want_aa)?;
    pb.get_bool_prop("wantPrepass", &mut settings.want_prepass)?;
    pb.get_bool_prop("gi", &mut settings.gi)?;
    pb.get_bool_prop("fullscreen", &mut settings.fullscreen)?;
    pb.get_bool_prop("interactive", &mut settings.interactive)?;
    pb.get_double_prop("saturation", &mut settings.saturation, 0.0, 2.0)?;
    pb.get_color_prop("ambientLight", &mut settings.ambient_light)?;
    Ok(())
}

fn fill_camera(camera: &mut Camera, pb: &ParsedBlock) -> Result<(), SceneError> {
    if !pb.get_vector_prop("position", &mut camera.position)? {
        return Err(pb.required_prop("position"));
    }
    pb.get_double_prop("aspectRatio", &mut camera.aspect_ratio, 1e-6, UNBOUNDED)?;
    pb.get_double_prop("fov", &mut camera.fov, 0.0001, 179.0)?;
    pb.get_double_prop("yaw", &mut camera.yaw, -UNBOUNDED, UNBOUNDED)?;
    pb.get_double_prop("pitch", &mut camera.pitch, -90.0, 90.0)?;
    pb.get_double_prop("roll", &mut camera.roll, -UNBOUNDED, UNBOUNDED)?;
    pb.get_bool_prop("dof", &mut camera.dof)?;
    pb.get_double_prop("fNumber", &mut camera.f_number, 1e-6, UNBOUNDED)?;
    let mut v: i64 = 0;
    if pb.get_int_prop("numSamples", &mut v, 1, 1 << 20)? {
        camera.num_samples = v as usize;
    }
    pb.get_double_prop("focalPlaneDist", &mut camera.focal_plane_dist, 0.1, UNBOUNDED)?;
    pb.get_bool_prop("autofocus", &mut camera.auto_focus)?;
    pb.get_double_prop("stereoSeparation", &mut camera.stereo_separation, 0.0, UNBOUNDED)?;
    pb.get_color_prop("leftMask", &mut camera.left_mask)?;
    pb.get_color_prop("rightMask", &mut camera.right_mask)?;
    Ok(())
}

fn build_geometry(pb: &ParsedBlock) -> Result<Geometry, SceneError> {
    match pb.class.as_str() {
        "Plane" => {
            let mut plane = Plane::new(0.0);
            pb.get_double_prop("y", &mut plane.y, -UNBOUNDED, UNBOUNDED)?;
            pb.get_double_prop("limit", &mut plane.limit, 0.0, UNBOUNDED)?;
            Ok(Geometry::Plane(plane))
        }
        "Sphere" => {
            let mut sphere = Sphere::new(Point::zero(), 1.0);
            pb.get_vector_prop("O", &mut sphere.center)?;
            pb.get_double_prop("R", &mut sphere.radius, 0.0, UNBOUNDED)?;
            Ok(Geometry::Sphere(sphere))
        }
        "Cube" => {
            let mut cube = Cube::new(Point::zero(), 0.5);
            pb.get_vector_prop("O", &mut cube.center)?;
            pb.get_double_prop("halfSide", &mut cube.half_side, 0.0, UNBOUNDED)?;
            Ok(Geometry::Cube(cube))
        }
        "Mesh" => {
            let path = pb
                .get_filename_prop("file")?
                .ok_or_else(|| pb.required_prop("file"))?;
            let mut mesh = load_mesh_obj(&path)?;
            pb.get_bool_prop("faceted", &mut mesh.faceted)?;
            pb.get_bool_prop("backfaceCulling", &mut mesh.back_face_culling)?;
            pb.get_bool_prop("useKDTree", &mut mesh.use_kd_tree)?;
            pb.get_bool_prop("autoSmooth", &mut mesh.auto_smooth)?;
            Ok(Geometry::Mesh(mesh))
        }
        "CsgAnd" | "CsgPlus" | "CsgOr" | "CsgMinus" => {
            let kind = match pb.class.as_str() {
                "CsgAnd" => CsgKind::And,
                "CsgMinus" => CsgKind::Minus,
                _ => CsgKind::Or,
            };
            let mut left = None;
            let mut right = None;
            if !pb.get_geometry_prop("left", &mut left)? {
                return Err(pb.required_prop("left"));
            }
            if !pb.get_geometry_prop("right", &mut right)? {
                return Err(pb.required_prop("right"));
            }
            Ok(Geometry::Csg(CsgOp::new(
                kind,
                left.unwrap(),
                right.unwrap(),
            )))
        }
        _ => unreachable!("routed by element_kind"),
    }
}

fn build_shader(pb: &ParsedBlock) -> Result<Shader, SceneError> {
    match pb.class.as_str() {
        "Lambert" => {
            let mut shader = Lambert::new(Color::black());
            pb.get_color_prop("color", &mut shader.color)?;
            pb.get_texture_prop("texture", &mut shader.texture)?;
            Ok(Shader::Lambert(shader))
        }
        "Phong" => {
            let mut shader = Phong::new(Color::new(0.5, 0.5, 0.5), 10.0, 0.4);
            pb.get_color_prop("color", &mut shader.color)?;
            pb.get_texture_prop("texture", &mut shader.texture)?;
            pb.get_double_prop("specularExponent", &mut shader.specular_exponent, 1e-6, UNBOUNDED)?;
            pb.get_double_prop("specularMultiplier", &mut shader.specular_multiplier, 0.0, UNBOUNDED)?;
            Ok(Shader::Phong(shader))
        }
        "Refl" => {
            let mut shader = Refl::new(0.99);
            pb.get_double_prop("multiplier", &mut shader.multiplier, 0.0, UNBOUNDED)?;
            pb.get_double_prop("glossiness", &mut shader.glossiness, 0.0, 1.0)?;
            let mut v: i64 = 0;
            if pb.get_int_prop("numSamples", &mut v, 1, 1 << 20)? {
                shader.num_samples = v as usize;
            }
            Ok(Shader::Refl(shader))
        }
        "Refr" => {
            let mut shader = Refr::new(1.33, 0.99);
            pb.get_double_prop("multiplier", &mut shader.multiplier, 0.0, UNBOUNDED)?;
            pb.get_double_prop("ior", &mut shader.ior, 1e-6, 10.0)?;
            Ok(Shader::Refr(shader))
        }
        "Const" => {
            let mut color = Color::white();
            pb.get_color_prop("color", &mut color)?;
            Ok(Shader::Const(ConstShader { color }))
        }
        "Layered" => {
            let mut layered = Layered::new();
            for prop in &pb.props {
                if prop.name != "layer" {
                    continue;
                }
                // layer <shader>, (r, g, b)[, <texture>]
                let parts: Vec<&str> = prop.value.split(',').map(str::trim).collect();
                let parse = || -> Option<(String, Color, Option<String>)> {
                    if parts.len() < 4 {
                        return None;
                    }
                    let shader_name = parts[0].to_string();
                    let r: f64 = parts[1].trim_start_matches('(').trim().parse().ok()?;
                    let g: f64 = parts[2].parse().ok()?;
                    let b: f64 = parts[3].trim_end_matches(')').trim().parse().ok()?;
                    let tex = parts.get(4).map(|s| s.to_string());
                    Some((shader_name, Color::new(r, g, b), tex))
                };
                let (shader_name, blend, tex_name) = parse().ok_or_else(|| {
                    pb.signal_error(
                        prop.line,
                        "expected a line like `layer <shader>, <color>[, <texture>]'",
                    )
                })?;
                let shader = pb
                    .registry
                    .shaders
                    .get(&shader_name)
                    .ok_or_else(|| pb.signal_error(prop.line, "no shader with that name"))?
                    .clone();
                let tex = match tex_name {
                    Some(name) if name != "NULL" => Some(
                        pb.registry
                            .textures
                            .get(&name)
                            .ok_or_else(|| {
                                pb.signal_error(prop.line, "no texture with that name")
                            })?
                            .clone(),
                    ),
                    _ => None,
                };
                layered.add_layer(shader, blend, tex);
            }
            Ok(Shader::Layered(layered))
        }
        _ => unreachable!("routed by element_kind"),
    }
}

fn build_texture(pb: &ParsedBlock) -> Result<Texture, SceneError> {
    match pb.class.as_str() {
        "CheckerTexture" => {
            let mut tex = CheckerTexture::new(Color::black(), Color::black());
            pb.get_color_prop("color1", &mut tex.color1)?;
            pb.get_color_prop("color2", &mut tex.color2)?;
            pb.get_double_prop("scaling", &mut tex.scaling, 0.0, UNBOUNDED)?;
            Ok(Texture::Checker(tex))
        }
        "BitmapTexture" => {
            let mut scaling = 1.0;
            pb.get_double_prop("scaling", &mut scaling, 1e-12, UNBOUNDED)?;
            let mut assumed_gamma = 1.0;
            pb.get_double_prop("assumedGamma", &mut assumed_gamma, 1e-6, UNBOUNDED)?;
            let bitmap = pb
                .get_bitmap_file_prop("file", assumed_gamma)?
                .ok_or_else(|| pb.required_prop("file"))?;
            // the scene file specifies texels per uv unit; sampling wants
            // the reciprocal
            Ok(Texture::Bitmap(BitmapTexture::new(bitmap, 1.0 / scaling)))
        }
        "BumpTexture" => {
            let mut strength = 1.0;
            let mut scaling = 1.0;
            pb.get_double_prop("strength", &mut strength, 0.0, UNBOUNDED)?;
            pb.get_double_prop("scaling", &mut scaling, 1e-12, UNBOUNDED)?;
            let bitmap = pb
                .get_bitmap_file_prop("file", 1.0)?
                .ok_or_else(|| pb.required_prop("file"))?;
            Ok(Texture::Bump(BumpTexture::new(bitmap, strength, scaling)))
        }
        "Fresnel" => {
            let mut tex = Fresnel::new(1.33);
            pb.get_double_prop("ior", &mut tex.ior, 1e-6, 10.0)?;
            Ok(Texture::Fresnel(tex))
        }
        "Bumps" => {
            let mut tex = Bumps::new(0.0);
            pb.get_double_prop("strength", &mut tex.strength, 0.0, UNBOUNDED)?;
            Ok(Texture::Bumps(tex))
        }
        _ => unreachable!("routed by element_kind"),
    }
}

fn build_light(pb: &ParsedBlock) -> Result<Light, SceneError> {
    let mut color = Color::white();
    let mut power = 1.0;
    pb.get_color_prop("color", &mut color)?;
    pb.get_float_prop("power", &mut power, 0.0, UNBOUNDED)?;

    match pb.class.as_str() {
        "PointLight" => {
            let mut pos = Point::zero();
            if !pb.get_vector_prop("pos", &mut pos)? {
                return Err(pb.required_prop("pos"));
            }
            Ok(Light::Point(PointLight { pos, color, power }))
        }
        "RectLight" => {
            let mut x_subd: i64 = 2;
            let mut y_subd: i64 = 2;
            pb.get_int_prop("xSubd", &mut x_subd, 1, 1 << 16)?;
            pb.get_int_prop("ySubd", &mut y_subd, 1, 1 << 16)?;
            let mut transform = Transform::identity();
            pb.get_transform_prop(&mut transform)?;
            Ok(Light::Rect(RectLight::new(
                transform,
                x_subd as usize,
                y_subd as usize,
                color,
                power,
            )))
        }
        _ => unreachable!("routed by element_kind"),
    }
}

fn build_node(pb: &ParsedBlock) -> Result<Node, SceneError> {
    let mut geometry = None;
    if !pb.get_geometry_prop("geometry", &mut geometry)? {
        return Err(pb.required_prop("geometry"));
    }
    let mut shader = None;
    if !pb.get_shader_prop("shader", &mut shader)? {
        return Err(pb.required_prop("shader"));
    }

    let mut node = Node::new(geometry.unwrap(), shader.unwrap());
    pb.get_texture_prop("bump", &mut node.bump)?;
    pb.get_transform_prop(&mut node.transform)?;
    Ok(node)
}

fn build_environment(pb: &ParsedBlock) -> Result<Environment, SceneError> {
    let mut top = Color::black();
    let mut bottom = Color::black();
    let has_top = pb.get_color_prop("top", &mut top)?;
    let has_bottom = pb.get_color_prop("bottom", &mut bottom)?;
    if has_top || has_bottom {
        return Ok(Environment::Gradient { top, bottom });
    }

    let mut color = Color::black();
    if !pb.get_color_prop("color", &mut color)? {
        return Err(pb.required_prop("color"));
    }
    Ok(Environment::Constant(color))
}

fn load_mesh_obj(path: &Path) -> Result<Mesh, SceneError> {
    let file = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| SceneError::Obj {
        file: file.clone(),
        message: e.to_string(),
    })?;
    let obj_set = wavefront_obj::obj::parse(text).map_err(|e| SceneError::Obj {
        file: file.clone(),
        message: format!("{:?}", e),
    })?;

    let mut vertices: Vec<Point> = Vec::new();
    let mut normals: Vec<Direction> = Vec::new();
    let mut uvs: Vec<Vector2f> = Vec::new();
    let mut triangles: Vec<Triangle> = Vec::new();

    for object in &obj_set.objects {
        let v_off = vertices.len();
        let n_off = normals.len();
        let t_off = uvs.len();

        vertices.extend(object.vertices.iter().map(|v| Point::new(v.x, v.y, v.z)));
        normals.extend(
            object
                .normals
                .iter()
                .map(|n| Direction::new(n.x, n.y, n.z)),
        );
        uvs.extend(object.tex_vertices.iter().map(|t| Vector2f(t.u, t.v)));

        for shape in object.geometry.iter().flat_map(|g| &g.shapes) {
            if let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive {
                triangles.push(Triangle::new(
                    [a.0 + v_off, b.0 + v_off, c.0 + v_off],
                    [
                        a.2.map_or(0, |i| i + n_off),
                        b.2.map_or(0, |i| i + n_off),
                        c.2.map_or(0, |i| i + n_off),
                    ],
                    [
                        a.1.map_or(0, |i| i + t_off),
                        b.1.map_or(0, |i| i + t_off),
                        c.1.map_or(0, |i| i + t_off),
                    ],
                ));
            }
        }
    }

    if triangles.is_empty() {
        return Err(SceneError::Obj {
            file,
            message: "no triangles found".to_string(),
        });
    }

    Ok(Mesh::new(vertices, normals, uvs, triangles))
}

// --- block tokenizer -------------------------------------------------------

struct RawBlock {
    line: usize,
    class: String,
    name: String,
    props: Vec<PropLine>,
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn tokenize_blocks(text: &str) -> Result<Vec<RawBlock>, SceneError> {
    let mut blocks = Vec::new();
    let mut current: Option<RawBlock> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if current.is_some() {
            if line == "}" {
                blocks.push(current.take().unwrap());
                continue;
            }
            let (name, value) = match line.split_once(char::is_whitespace) {
                Some((n, v)) => (n.to_string(), v.trim().to_string()),
                None => (line.to_string(), String::new()),
            };
            current.as_mut().unwrap().props.push(PropLine {
                line: line_no,
                name,
                value,
            });
        } else {
            // expect `ClassName [name] {`
            if !line.ends_with('{') {
                return Err(SceneError::Syntax {
                    line: line_no,
                    message: "expected a block header ending with `{'".to_string(),
                });
            }
            let header: Vec<&str> = line[..line.len() - 1].split_whitespace().collect();
            let (class, name) = match header.as_slice() {
                [class] => (class.to_string(), String::new()),
                [class, name] => (class.to_string(), name.to_string()),
                _ => {
                    return Err(SceneError::Syntax {
                        line: line_no,
                        message: "malformed block header".to_string(),
                    })
                }
            };
            current = Some(RawBlock {
                line: line_no,
                class,
                name,
                props: Vec::new(),
            });
        }
    }

    if let Some(block) = current {
        return Err(SceneError::Syntax {
            line: block.line,
            message: "unterminated block".to_string(),
        });
    }
    Ok(blocks)
}

/// Parses a scene description, resolving file references relative to
/// `base_dir`.
pub fn parse_scene(text: &str, base_dir: &Path) -> Result<Scene, SceneError> {
    let mut registry = Registry::default();
    let mut scene = Scene::new();

    for raw in tokenize_blocks(text)? {
        let kind = element_kind(&raw.class).ok_or(SceneError::UnknownElement {
            line: raw.line,
            class: raw.class.clone(),
        })?;
        let pb = ParsedBlock {
            class: raw.class,
            name: raw.name,
            props: raw.props,
            registry: &registry,
            base_dir,
        };

        match kind {
            ElementKind::Settings => fill_settings(&mut scene.settings, &pb)?,
            ElementKind::Camera => fill_camera(&mut scene.camera, &pb)?,
            ElementKind::Geometry => {
                let geometry = build_geometry(&pb)?;
                registry.geometries.insert(pb.name.clone(), geometry);
            }
            ElementKind::Shader => {
                let shader = build_shader(&pb)?;
                registry.shaders.insert(pb.name.clone(), Arc::new(shader));
            }
            ElementKind::Texture => {
                let texture = build_texture(&pb)?;
                registry.textures.insert(pb.name.clone(), Arc::new(texture));
            }
            ElementKind::Light => scene.lights.push(build_light(&pb)?),
            ElementKind::Node => scene.nodes.push(build_node(&pb)?),
            ElementKind::Environment => scene.environment = Some(build_environment(&pb)?),
        }
    }

    Ok(scene)
}

/// Loads and parses a scene file.
pub fn parse_file(path: &str) -> Result<Scene, SceneError> {
    let text = fs::read_to_string(path)?;
    let base_dir = Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    parse_scene(&text, &base_dir)
}
