#[cfg(test)]
#[macro_use]
mod test_utils;

mod bitmap;
mod camera;
mod color;
mod direction;
mod geometry;
mod lights;
mod matrix;
mod point;
mod random;
mod renderer;
mod scene;
mod sdl;
mod shading;
mod trace;
mod transform;
mod vector;

use std::io::Stdout;
use std::process;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use pbr::ProgressBar;
use rayon::ThreadPoolBuilder;

use crate::color::Color;
use crate::renderer::{make_buckets, FrameSink, Rect};

#[derive(Parser)]
#[command(version, about = "Physically-based ray/path tracer")]
struct CommandLineOptions {
    /// The scene description to render
    #[arg(default_value = "data/smallpt.qdmg")]
    scene: String,

    /// Output image path
    #[arg(short, long, default_value = "out.png")]
    output: String,

    /// Override the scene's render thread count (0 = all CPUs)
    #[arg(short('t'), long)]
    threads: Option<usize>,
}

struct CliSink {
    progress: Mutex<ProgressBar<Stdout>>,
}

impl FrameSink for CliSink {
    fn display_rect(&self, _rect: Rect, _vfb: &[Vec<Color>]) -> bool {
        self.progress.lock().unwrap().inc();
        true
    }

    fn set_caption(&self, caption: &str) {
        self.progress.lock().unwrap().message(caption);
    }
}

fn main() {
    let opts = CommandLineOptions::parse();

    random::init_random(42);

    let mut scene = match sdl::parse_file(&opts.scene) {
        Ok(scene) => scene,
        Err(err) => {
            eprintln!("{}: {}", opts.scene, err);
            process::exit(-1);
        }
    };
    if let Some(threads) = opts.threads {
        scene.settings.num_threads = threads;
    }

    scene.begin_render();
    scene.begin_frame();

    let num_threads = if scene.settings.num_threads == 0 {
        num_cpus::get()
    } else {
        scene.settings.num_threads
    };
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .expect("could not configure threadpool");

    let width = scene.settings.frame_width;
    let height = scene.settings.frame_height;
    println!(
        "Rendering {}x{} using {} threads.",
        width, height, num_threads
    );
    if scene.settings.interactive {
        println!("Interactive mode needs a windowed frontend; rendering a single frame.");
    }

    let buckets_per_pass = make_buckets(width, height).len();
    let passes = 1 + usize::from(scene.need_aa_pass());
    let mut progress = ProgressBar::new((buckets_per_pass * passes) as u64);
    progress.message("Buckets: ");
    let sink = CliSink {
        progress: Mutex::new(progress),
    };

    let started = Instant::now();
    let vfb = renderer::render_scene(&scene, &sink);
    let elapsed = started.elapsed().as_secs_f64();
    sink.progress
        .lock()
        .unwrap()
        .finish_print(&format!("Render took {:.2}s", elapsed));

    write_image(&opts.output, &vfb);
    println!("Saved `{}'", opts.output);
}

fn color_to_rgb(c: Color) -> image::Rgb<u8> {
    let c = c.clamped().gamma_2();
    image::Rgb([
        (c.r * 255.0).min(255.0) as u8,
        (c.g * 255.0).min(255.0) as u8,
        (c.b * 255.0).min(255.0) as u8,
    ])
}

fn write_image(filename: &str, vfb: &[Vec<Color>]) {
    let height = vfb.len();
    let width = if height > 0 { vfb[0].len() } else { 0 };
    let mut imgbuf = image::RgbImage::new(width as u32, height as u32);
    for (x, y, pixel) in imgbuf.enumerate_pixels_mut() {
        *pixel = color_to_rgb(vfb[y as usize][x as usize]);
    }
    imgbuf
        .save(filename)
        .expect("could not write render result to output file");
}
