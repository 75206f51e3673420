use crate::color::Color;
use crate::geometry::{IntersectionInfo, Ray, INF, RF_DIFFUSE};
use crate::point::Point;
use crate::random::Sampler;
use crate::scene::{Node, Scene};
use crate::shading::SpawnResult;

/// Finds the nearest node hit along the ray, if any.
fn trace_nodes<'a>(scene: &'a Scene, ray: &Ray) -> Option<(&'a Node, IntersectionInfo)> {
    let mut closest: Option<(&Node, IntersectionInfo)> = None;
    let mut closest_dist = INF;

    for node in &scene.nodes {
        let mut info = IntersectionInfo::new();
        if !node.intersect(ray, &mut info) {
            continue;
        }
        if info.distance < closest_dist {
            closest_dist = info.distance;
            closest = Some((node, info));
        }
    }
    closest
}

/// Checks whether any light's surface occludes the geometry hit; the
/// distance shrinks to the nearest light hit.
fn trace_lights<'a>(
    scene: &'a Scene,
    ray: &Ray,
    closest_dist: &mut f64,
) -> Option<&'a crate::lights::Light> {
    let mut hit_light = None;
    for light in &scene.lights {
        if light.intersect(ray, closest_dist) {
            hit_light = Some(light);
        }
    }
    hit_light
}

/// The recursive Whitted integrator.
pub fn raytrace(scene: &Scene, ray: &Ray, sampler: &mut Sampler) -> Color {
    if ray.depth > scene.settings.max_trace_depth {
        return Color::black();
    }

    let closest = trace_nodes(scene, ray);

    let mut closest_dist = closest.as_ref().map_or(INF, |(_, info)| info.distance);
    if let Some(light) = trace_lights(scene, ray, &mut closest_dist) {
        return light.color();
    }

    match closest {
        Some((node, mut info)) => {
            info.ray_dir = ray.dir;
            if let Some(bump) = &node.bump {
                bump.modify_normal(&mut info);
            }
            node.shader.shade(scene, ray, &info, sampler)
        }
        None => match &scene.environment {
            Some(env) => env.sample(ray.dir),
            None => Color::black(),
        },
    }
}

/// Explicit light sampling at a path vertex: picks one light, one of its
/// stratified samples, and weighs the visible contribution by the BRDF and
/// the sampling probabilities.
fn explicit_light_sample(
    scene: &Scene,
    ray: &Ray,
    info: &IntersectionInfo,
    shader: &crate::shading::Shader,
    path_multiplier: Color,
    sampler: &mut Sampler,
) -> Color {
    if scene.lights.is_empty() {
        return Color::black();
    }

    let light_idx = sampler.randint(scene.lights.len());
    let light = &scene.lights[light_idx];

    let solid_angle = light.solid_angle(info.ip);
    if solid_angle == 0.0 {
        return Color::black();
    }

    let sample_idx = sampler.randint(light.num_samples());
    let (light_pos, light_color) = light.nth_sample(sample_idx, info.ip, sampler);
    if light_color.intensity() == 0.0 {
        return Color::black();
    }
    if !visibility_check(scene, info.ip + info.normal * 1e-6, light_pos) {
        return Color::black();
    }

    let w_out = (light_pos - info.ip).normalize();
    let brdf = shader.eval(info, ray.dir, w_out);
    if brdf.intensity() == 0.0 {
        return Color::black();
    }

    let prob_pick_light = 1.0 / scene.lights.len() as f64;
    let prob_pick_point_on_light = 1.0 / solid_angle;
    light_color * path_multiplier * brdf / (prob_pick_light * prob_pick_point_on_light)
}

/// Unidirectional Monte Carlo integrator with next-event estimation.
pub fn pathtrace(scene: &Scene, ray: &Ray, path_multiplier: Color, sampler: &mut Sampler) -> Color {
    if ray.depth > scene.settings.max_trace_depth {
        return Color::black();
    }
    if path_multiplier.intensity() < 1e-3 {
        return Color::black();
    }

    let closest = trace_nodes(scene, ray);

    let mut closest_dist = closest.as_ref().map_or(INF, |(_, info)| info.distance);
    if let Some(light) = trace_lights(scene, ray, &mut closest_dist) {
        // light hits after a diffuse scatter are already accounted for by
        // next-event estimation
        if ray.flags & RF_DIFFUSE != 0 {
            return Color::black();
        }
        return light.color() * path_multiplier;
    }

    let (node, mut info) = match closest {
        Some(hit) => hit,
        None => {
            return match &scene.environment {
                Some(env) => env.sample(ray.dir) * path_multiplier,
                None => Color::black(),
            }
        }
    };

    info.ray_dir = ray.dir;
    if let Some(bump) = &node.bump {
        bump.modify_normal(&mut info);
    }

    let result_direct =
        explicit_light_sample(scene, ray, &info, &node.shader, path_multiplier, sampler);

    let result_gi = match node.shader.spawn_ray(&info, ray, sampler) {
        SpawnResult::NotImplemented => return Color::red(),
        SpawnResult::Absorbed => Color::black(),
        SpawnResult::Sampled { mut ray, color, pdf } => {
            ray.depth += 1;
            pathtrace(scene, &ray, path_multiplier * color / pdf, sampler)
        }
    };

    result_direct + result_gi
}

/// True when the segment from `start` to `end` is unobstructed by scene
/// geometry.
pub fn visibility_check(scene: &Scene, start: Point, end: Point) -> bool {
    let ray = Ray::new(start, (end - start).normalize());
    let target_dist = (end - start).length();

    for node in &scene.nodes {
        let mut info = IntersectionInfo::new();
        if !node.intersect(&ray, &mut info) {
            continue;
        }
        if info.distance < target_dist {
            return false;
        }
    }
    true
}
