use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::camera::CameraEye;
use crate::color::Color;
use crate::random::Sampler;
use crate::scene::Scene;
use crate::trace::{pathtrace, raytrace};

const BUCKET_SIZE: usize = 64;
const PREPASS_BLOCK: usize = 16;
/// Per-channel difference between neighbours that flags a pixel for edge
/// anti-aliasing.
const AA_THRESHOLD: f64 = 0.1;
/// Sub-pixel offsets of the four refinement samples; together with the
/// original centre sample they average with weight 1/5.
const AA_KERNEL: [(f64, f64); 4] = [(0.6, 0.0), (0.0, 0.6), (0.3, 0.3), (0.6, 0.6)];

#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    /// exclusive
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }
}

/// Splits the frame into a stable, row-major list of tiles.
pub fn make_buckets(frame_width: usize, frame_height: usize) -> Vec<Rect> {
    let mut buckets = Vec::new();
    let mut y = 0;
    while y < frame_height {
        let mut x = 0;
        while x < frame_width {
            buckets.push(Rect {
                x0: x,
                y0: y,
                x1: (x + BUCKET_SIZE).min(frame_width),
                y1: (y + BUCKET_SIZE).min(frame_height),
            });
            x += BUCKET_SIZE;
        }
        y += BUCKET_SIZE;
    }
    buckets
}

/// The display surface the renderer blits into. Implementations may
/// synchronise internally; any `false` return means "the user wants out" and
/// workers stop claiming buckets.
pub trait FrameSink: Sync {
    fn display_rect(&self, _rect: Rect, _vfb: &[Vec<Color>]) -> bool {
        true
    }

    fn draw_rect(&self, _rect: Rect, _color: Color) -> bool {
        true
    }

    fn mark_region(&self, _rect: Rect) -> bool {
        true
    }

    fn mark_aa_pixels(&self, _mask: &[Vec<bool>]) {}

    fn set_caption(&self, _caption: &str) {}
}

/// Sink that displays nothing; rendering then only fills the framebuffer.
pub struct NullSink;

impl FrameSink for NullSink {}

fn effective_threads(scene: &Scene) -> usize {
    if scene.settings.num_threads == 0 {
        num_cpus::get()
    } else {
        scene.settings.num_threads
    }
}

/// One Whitted sample through the pixel grid, combining both stereo eyes
/// when stereo rendering is on.
fn whitted_sample(scene: &Scene, x: f64, y: f64, sampler: &mut Sampler) -> Color {
    let camera = &scene.camera;
    let color = if camera.stereo_separation == 0.0 {
        raytrace(
            scene,
            &camera.get_screen_ray(x, y, CameraEye::Central),
            sampler,
        )
    } else {
        let left = raytrace(scene, &camera.get_screen_ray(x, y, CameraEye::Left), sampler);
        let right = raytrace(
            scene,
            &camera.get_screen_ray(x, y, CameraEye::Right),
            sampler,
        );
        camera.left_mask * left + camera.right_mask * right
    };
    saturate(scene, color)
}

fn saturate(scene: &Scene, color: Color) -> Color {
    if scene.settings.saturation != 1.0 {
        color.saturated(scene.settings.saturation)
    } else {
        color
    }
}

/// Renders one pixel according to the scene settings: thin-lens
/// multisampling, path tracing, or a single Whitted sample.
pub fn render_pixel(scene: &Scene, x: usize, y: usize, sampler: &mut Sampler) -> Color {
    let camera = &scene.camera;
    if camera.dof {
        let mut average = Color::black();
        for _ in 0..camera.num_samples {
            let sx = x as f64 + sampler.randfloat();
            let sy = y as f64 + sampler.randfloat();
            if camera.stereo_separation == 0.0 {
                let ray = camera.get_dof_ray(sx, sy, CameraEye::Central, sampler);
                average += raytrace(scene, &ray, sampler);
            } else {
                let left_ray = camera.get_dof_ray(sx, sy, CameraEye::Left, sampler);
                let right_ray = camera.get_dof_ray(sx, sy, CameraEye::Right, sampler);
                average += camera.left_mask * raytrace(scene, &left_ray, sampler)
                    + camera.right_mask * raytrace(scene, &right_ray, sampler);
            }
        }
        saturate(scene, average / camera.num_samples as f64)
    } else if scene.settings.gi {
        let mut average = Color::black();
        for _ in 0..scene.settings.num_paths {
            let sx = x as f64 + sampler.randfloat();
            let sy = y as f64 + sampler.randfloat();
            let ray = camera.get_screen_ray(sx, sy, CameraEye::Central);
            average += pathtrace(scene, &ray, Color::white(), sampler);
        }
        saturate(scene, average / scene.settings.num_paths as f64)
    } else {
        whitted_sample(scene, x as f64, y as f64, sampler)
    }
}

/// Coarse feedback pass: one ray per 16x16 block, painted flat.
fn render_prepass(
    scene: &Scene,
    sink: &dyn FrameSink,
    buckets: &[Rect],
    vfb: &Mutex<Vec<Vec<Color>>>,
    abandoned: &AtomicBool,
) {
    let mut sampler = Sampler::new(0xC0A2);
    'buckets: for bucket in buckets {
        let mut by = bucket.y0;
        while by < bucket.y1 {
            let mut bx = bucket.x0;
            while bx < bucket.x1 {
                let block = Rect {
                    x0: bx,
                    y0: by,
                    x1: (bx + PREPASS_BLOCK).min(bucket.x1),
                    y1: (by + PREPASS_BLOCK).min(bucket.y1),
                };
                let cx = block.x0 as f64 + block.width() as f64 / 2.0;
                let cy = block.y0 as f64 + block.height() as f64 / 2.0;
                let color = whitted_sample(scene, cx, cy, &mut sampler);

                {
                    let mut vfb = vfb.lock().unwrap();
                    for row in vfb.iter_mut().take(block.y1).skip(block.y0) {
                        for pixel in row.iter_mut().take(block.x1).skip(block.x0) {
                            *pixel = color;
                        }
                    }
                }
                if !sink.draw_rect(block, color) {
                    abandoned.store(true, Ordering::Relaxed);
                    break 'buckets;
                }
                bx += PREPASS_BLOCK;
            }
            by += PREPASS_BLOCK;
        }
    }
}

/// Runs the base pass: workers claim buckets off a shared atomic counter
/// and each renders its claim pixel by pixel.
fn render_main_pass(
    scene: &Scene,
    sink: &dyn FrameSink,
    buckets: &[Rect],
    vfb: &Mutex<Vec<Vec<Color>>>,
    abandoned: &AtomicBool,
    num_threads: usize,
) {
    let counter = AtomicUsize::new(0);

    rayon::scope(|s| {
        for worker_id in 0..num_threads {
            let counter = &counter;
            s.spawn(move |_| {
                let mut sampler = Sampler::new(worker_id as u64);
                loop {
                    if abandoned.load(Ordering::Relaxed) {
                        return;
                    }
                    let idx = counter.fetch_add(1, Ordering::Relaxed);
                    if idx >= buckets.len() {
                        return;
                    }
                    let bucket = buckets[idx];
                    if !sink.mark_region(bucket) {
                        abandoned.store(true, Ordering::Relaxed);
                        return;
                    }

                    let mut local =
                        vec![vec![Color::black(); bucket.width()]; bucket.height()];
                    for (j, y) in (bucket.y0..bucket.y1).enumerate() {
                        for (i, x) in (bucket.x0..bucket.x1).enumerate() {
                            local[j][i] = render_pixel(scene, x, y, &mut sampler);
                        }
                    }

                    let ok = {
                        let mut vfb = vfb.lock().unwrap();
                        for (j, row) in local.into_iter().enumerate() {
                            vfb[bucket.y0 + j][bucket.x0..bucket.x1].copy_from_slice(&row);
                        }
                        sink.display_rect(bucket, &vfb)
                    };
                    if !ok {
                        abandoned.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            });
        }
    });
}

/// A pixel needs refinement when any of its eight neighbours differs by
/// more than the threshold in any channel, after clamping to displayable
/// range.
pub fn compute_needs_aa(vfb: &[Vec<Color>]) -> Vec<Vec<bool>> {
    let height = vfb.len();
    let width = if height > 0 { vfb[0].len() } else { 0 };
    let mut needs_aa = vec![vec![false; width]; height];

    for y in 0..height {
        for x in 0..width {
            let me = vfb[y][x].clamped();
            'neighbours: for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let other = vfb[ny as usize][nx as usize].clamped();
                    if (me.r - other.r).abs() > AA_THRESHOLD
                        || (me.g - other.g).abs() > AA_THRESHOLD
                        || (me.b - other.b).abs() > AA_THRESHOLD
                    {
                        needs_aa[y][x] = true;
                        break 'neighbours;
                    }
                }
            }
        }
    }
    needs_aa
}

/// Adaptive refinement: flagged pixels get four more samples, averaged with
/// the original centre sample.
fn render_aa_pass(
    scene: &Scene,
    sink: &dyn FrameSink,
    buckets: &[Rect],
    vfb: &Mutex<Vec<Vec<Color>>>,
    needs_aa: &[Vec<bool>],
    abandoned: &AtomicBool,
    num_threads: usize,
) {
    let counter = AtomicUsize::new(0);

    rayon::scope(|s| {
        for worker_id in 0..num_threads {
            let counter = &counter;
            s.spawn(move |_| {
                let mut sampler = Sampler::new(num_threads as u64 + worker_id as u64);
                loop {
                    if abandoned.load(Ordering::Relaxed) {
                        return;
                    }
                    let idx = counter.fetch_add(1, Ordering::Relaxed);
                    if idx >= buckets.len() {
                        return;
                    }
                    let bucket = buckets[idx];
                    if !sink.mark_region(bucket) {
                        abandoned.store(true, Ordering::Relaxed);
                        return;
                    }

                    let mut local = {
                        let vfb = vfb.lock().unwrap();
                        (bucket.y0..bucket.y1)
                            .map(|y| vfb[y][bucket.x0..bucket.x1].to_vec())
                            .collect::<Vec<_>>()
                    };

                    for (j, y) in (bucket.y0..bucket.y1).enumerate() {
                        for (i, x) in (bucket.x0..bucket.x1).enumerate() {
                            if !needs_aa[y][x] {
                                continue;
                            }
                            let mut sum = local[j][i];
                            for &(dx, dy) in &AA_KERNEL {
                                sum += whitted_sample(
                                    scene,
                                    x as f64 + dx,
                                    y as f64 + dy,
                                    &mut sampler,
                                );
                            }
                            local[j][i] = sum / (AA_KERNEL.len() + 1) as f64;
                        }
                    }

                    let ok = {
                        let mut vfb = vfb.lock().unwrap();
                        for (j, row) in local.into_iter().enumerate() {
                            vfb[bucket.y0 + j][bucket.x0..bucket.x1].copy_from_slice(&row);
                        }
                        sink.display_rect(bucket, &vfb)
                    };
                    if !ok {
                        abandoned.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            });
        }
    });
}

/// Renders a full frame: optional coarse prepass, bucketed base pass, and
/// the adaptive AA refinement when the scene calls for it.
pub fn render_scene(scene: &Scene, sink: &dyn FrameSink) -> Vec<Vec<Color>> {
    let width = scene.settings.frame_width;
    let height = scene.settings.frame_height;
    let buckets = make_buckets(width, height);
    let num_threads = effective_threads(scene);

    let vfb = Mutex::new(vec![vec![Color::black(); width]; height]);
    let abandoned = AtomicBool::new(false);

    let wants_prepass = scene.settings.want_prepass || scene.settings.gi;
    if wants_prepass && !scene.settings.interactive {
        render_prepass(scene, sink, &buckets, &vfb, &abandoned);
    }

    if !abandoned.load(Ordering::Relaxed) {
        render_main_pass(scene, sink, &buckets, &vfb, &abandoned, num_threads);
    }

    if scene.need_aa_pass() && !abandoned.load(Ordering::Relaxed) {
        let needs_aa = compute_needs_aa(&vfb.lock().unwrap());
        sink.mark_aa_pixels(&needs_aa);
        render_aa_pass(
            scene,
            sink,
            &buckets,
            &vfb,
            &needs_aa,
            &abandoned,
            num_threads,
        );
    }

    vfb.into_inner().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::geometry::{Geometry, Sphere};
    use crate::lights::{Light, PointLight};
    use crate::point::Point;
    use crate::random::init_random;
    use crate::scene::{Node, Scene};
    use crate::shading::{Lambert, Shader};

    fn sphere_scene(width: usize, height: usize) -> Scene {
        let mut scene = Scene::new();
        scene.settings.frame_width = width;
        scene.settings.frame_height = height;
        scene.settings.num_threads = 1;
        scene.camera.position = Point::new(0.0, 0.0, -60.0);
        scene.nodes.push(Node::new(
            Geometry::Sphere(Sphere::new(Point::new(0.0, 0.0, 0.0), 15.0)),
            Arc::new(Shader::Lambert(Lambert::new(Color::white()))),
        ));
        scene.lights.push(Light::Point(PointLight {
            pos: Point::new(50.0, 80.0, -50.0),
            color: Color::white(),
            power: 20000.0,
        }));
        scene.begin_render();
        scene.begin_frame();
        scene
    }

    #[test]
    fn buckets_tile_the_frame_exactly() {
        let buckets = make_buckets(640, 480);
        let mut covered = vec![vec![0u8; 640]; 480];
        for b in &buckets {
            assert!(b.x1 <= 640 && b.y1 <= 480);
            for y in b.y0..b.y1 {
                for x in b.x0..b.x1 {
                    covered[y][x] += 1;
                }
            }
        }
        assert!(covered.iter().flatten().all(|&c| c == 1));
    }

    #[test]
    fn buckets_handle_non_multiple_sizes() {
        let buckets = make_buckets(100, 70);
        let area: usize = buckets.iter().map(|b| b.width() * b.height()).sum();
        assert_eq!(area, 100 * 70);
    }

    #[test]
    fn single_thread_render_is_deterministic() {
        let scene = sphere_scene(96, 72);

        init_random(42);
        let first = render_scene(&scene, &NullSink);
        init_random(42);
        let second = render_scene(&scene, &NullSink);

        for (row_a, row_b) in first.iter().zip(second.iter()) {
            for (a, b) in row_a.iter().zip(row_b.iter()) {
                assert_eq!(a.r.to_bits(), b.r.to_bits());
                assert_eq!(a.g.to_bits(), b.g.to_bits());
                assert_eq!(a.b.to_bits(), b.b.to_bits());
            }
        }
    }

    #[test]
    fn needs_aa_flags_the_silhouette_only() {
        init_random(42);
        let mut scene = sphere_scene(96, 72);
        scene.settings.want_aa = true;
        let vfb = render_scene(&scene, &NullSink);
        let mask = compute_needs_aa(&vfb);

        // background far from the sphere is smooth
        assert!(!mask[0][0]);
        // the silhouette band exists
        let flagged: usize = mask.iter().flatten().filter(|&&f| f).count();
        assert!(flagged > 0);
        // and is a band, not the whole frame
        assert!(flagged < 96 * 72 / 4);

        // every flagged pixel borders a differing neighbour
        for (y, row) in mask.iter().enumerate() {
            for (x, &f) in row.iter().enumerate() {
                if f {
                    let me = vfb[y][x].clamped();
                    let mut differs = false;
                    for dy in -1i64..=1 {
                        for dx in -1i64..=1 {
                            let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                            if nx < 0 || ny < 0 || nx >= 96 || ny >= 72 || (dx == 0 && dy == 0)
                            {
                                continue;
                            }
                            let o = vfb[ny as usize][nx as usize].clamped();
                            if (me.r - o.r).abs() > AA_THRESHOLD
                                || (me.g - o.g).abs() > AA_THRESHOLD
                                || (me.b - o.b).abs() > AA_THRESHOLD
                            {
                                differs = true;
                            }
                        }
                    }
                    assert!(differs);
                }
            }
        }
    }

    #[test]
    fn abort_stops_further_buckets() {
        struct AbortingSink {
            commits: AtomicUsize,
        }
        impl FrameSink for AbortingSink {
            fn display_rect(&self, _rect: Rect, _vfb: &[Vec<Color>]) -> bool {
                self.commits.fetch_add(1, Ordering::Relaxed);
                false
            }
        }

        init_random(42);
        let scene = sphere_scene(256, 192);
        let sink = AbortingSink {
            commits: AtomicUsize::new(0),
        };
        render_scene(&scene, &sink);
        // a single worker stops after the first refused commit, leaving
        // later buckets unclaimed
        assert_eq!(sink.commits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn gi_smoke_render_produces_finite_pixels() {
        init_random(42);
        let mut scene = sphere_scene(16, 12);
        scene.settings.gi = true;
        scene.settings.num_paths = 4;
        let vfb = render_scene(&scene, &NullSink);
        for row in &vfb {
            for c in row {
                assert!(c.r.is_finite() && c.g.is_finite() && c.b.is_finite());
            }
        }
    }
}
