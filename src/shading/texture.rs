use crate::bitmap::Bitmap;
use crate::color::Color;
use crate::direction::{faceforward, Direction, Dot};
use crate::geometry::IntersectionInfo;

/// Procedural and bitmap-backed texel sources. Bump variants perturb the
/// shading normal instead of producing a colour.
pub enum Texture {
    Checker(CheckerTexture),
    Bitmap(BitmapTexture),
    Bump(BumpTexture),
    Fresnel(Fresnel),
    Bumps(Bumps),
}

impl Texture {
    pub fn sample(&self, info: &IntersectionInfo) -> Color {
        match self {
            Texture::Checker(t) => t.sample(info),
            Texture::Bitmap(t) => t.sample(info),
            Texture::Fresnel(t) => t.sample(info),
            // bump textures have no colour of their own
            Texture::Bump(_) | Texture::Bumps(_) => Color::black(),
        }
    }

    pub fn modify_normal(&self, info: &mut IntersectionInfo) {
        match self {
            Texture::Bump(t) => t.modify_normal(info),
            Texture::Bumps(t) => t.modify_normal(info),
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckerTexture {
    pub color1: Color,
    pub color2: Color,
    pub scaling: f64,
}

impl CheckerTexture {
    pub fn new(color1: Color, color2: Color) -> CheckerTexture {
        CheckerTexture {
            color1,
            color2,
            scaling: 1.0,
        }
    }

    fn sample(&self, info: &IntersectionInfo) -> Color {
        let x = (info.u * self.scaling / 5.0).floor() as i64;
        let y = (info.v * self.scaling / 5.0).floor() as i64;

        if (x + y).rem_euclid(2) == 0 {
            self.color1
        } else {
            self.color2
        }
    }
}

pub struct BitmapTexture {
    pub bitmap: Bitmap,
    /// Stored as the reciprocal of the scene-file value.
    pub scaling: f64,
}

impl BitmapTexture {
    pub fn new(bitmap: Bitmap, scaling: f64) -> BitmapTexture {
        BitmapTexture { bitmap, scaling }
    }

    fn sample(&self, info: &IntersectionInfo) -> Color {
        let w = self.bitmap.width() as f64;
        let h = self.bitmap.height() as f64;
        let mut x = (info.u * self.scaling * w) % w;
        let mut y = (info.v * self.scaling * h) % h;
        if x < 0.0 {
            x += w;
        }
        if y < 0.0 {
            y += h;
        }

        // 0 <= x < width, 0 <= y < height
        self.bitmap.get_filtered_pixel(x, y)
    }
}

/// Height-map driven normal perturbation. The bitmap must be differentiated
/// (a slope map) before rendering starts.
pub struct BumpTexture {
    pub bitmap: Bitmap,
    pub strength: f64,
    pub scaling: f64,
}

impl BumpTexture {
    /// Takes the raw height map; the slope map is derived here, once.
    pub fn new(mut bitmap: Bitmap, strength: f64, scaling: f64) -> BumpTexture {
        bitmap.differentiate();
        BumpTexture {
            bitmap,
            strength,
            scaling,
        }
    }

    fn modify_normal(&self, info: &mut IntersectionInfo) {
        let w = self.bitmap.width() as f64;
        let h = self.bitmap.height() as f64;
        let mut x = (info.u * self.scaling * w) % w;
        let mut y = (info.v * self.scaling * h) % h;
        if x < 0.0 {
            x += w;
        }
        if y < 0.0 {
            y += h;
        }

        let bump = self.bitmap.get_filtered_pixel(x, y);
        let dx = bump.r;
        let dy = bump.g;

        info.normal += (info.dndx * dx + info.dndy * dy) * self.strength;
        info.normal = info.normal.normalize();
    }
}

/// Schlick approximation of the reflected fraction at a dielectric
/// boundary, usable as a Layered blend texture.
#[derive(Debug, Clone)]
pub struct Fresnel {
    pub ior: f64,
}

impl Fresnel {
    pub fn new(ior: f64) -> Fresnel {
        Fresnel { ior }
    }

    fn sample(&self, info: &IntersectionInfo) -> Color {
        let mut eta = self.ior;
        if info.normal.dot(info.ray_dir) > 0.0 {
            // striking the surface from the inside
            eta = 1.0 / eta;
        }
        let n = faceforward(info.ray_dir, info.normal);
        let fr = schlick_fresnel(info.ray_dir, n, eta);
        Color::new(fr, fr, fr)
    }
}

fn schlick_fresnel(i: Direction, n: Direction, ior: f64) -> f64 {
    let f = ((1.0 - ior) / (1.0 + ior)).powi(2);
    let n_dot_i = -n.dot(i);
    f + (1.0 - f) * (1.0 - n_dot_i).powi(5)
}

/// Procedural three-octave sine bumps.
#[derive(Debug, Clone)]
pub struct Bumps {
    pub strength: f64,
}

impl Bumps {
    pub fn new(strength: f64) -> Bumps {
        Bumps { strength }
    }

    fn modify_normal(&self, info: &mut IntersectionInfo) {
        if self.strength > 0.0 {
            let freq_x = [0.5, 1.21, 1.9];
            let freq_z = [0.4, 1.13, 1.81];
            let fm = 0.2;
            let intensity_x = [0.1, 0.08, 0.05];
            let intensity_z = [0.1, 0.08, 0.05];
            let mut dx = 0.0;
            let mut dy = 0.0;
            for i in 0..3 {
                dx += (fm * freq_x[i] * info.u).sin() * intensity_x[i] * self.strength;
                dy += (fm * freq_z[i] * info.v).sin() * intensity_z[i] * self.strength;
            }
            info.normal += info.dndx * dx + info.dndy * dy;
            info.normal = info.normal.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(u: f64, v: f64) -> IntersectionInfo {
        let mut info = IntersectionInfo::new();
        info.u = u;
        info.v = v;
        info
    }

    #[test]
    fn checker_alternates() {
        let t = CheckerTexture::new(Color::white(), Color::black());
        // scaling 1 gives 5-unit cells
        let a = t.sample(&hit_at(2.0, 2.0));
        let b = t.sample(&hit_at(7.0, 2.0));
        let c = t.sample(&hit_at(7.0, 7.0));
        assert_eq!(a, Color::white());
        assert_eq!(b, Color::black());
        assert_eq!(c, Color::white());
    }

    #[test]
    fn checker_consistent_across_origin() {
        let t = CheckerTexture::new(Color::white(), Color::black());
        // cells adjacent across u = 0 must differ
        let neg = t.sample(&hit_at(-2.0, 2.0));
        let pos = t.sample(&hit_at(2.0, 2.0));
        assert_ne!(neg, pos);
    }

    #[test]
    fn fresnel_grazing_brighter_than_head_on() {
        let t = Fresnel::new(1.33);
        let mut head_on = hit_at(0.0, 0.0);
        head_on.normal = Direction::new(0.0, 1.0, 0.0);
        head_on.ray_dir = Direction::new(0.0, -1.0, 0.0);

        let mut grazing = hit_at(0.0, 0.0);
        grazing.normal = Direction::new(0.0, 1.0, 0.0);
        grazing.ray_dir = Direction::new(0.995, -0.0998, 0.0).normalize();

        let f0 = t.sample(&head_on).r;
        let f1 = t.sample(&grazing).r;
        assert!(f1 > f0);
        assert!(f0 > 0.0 && f1 <= 1.0);
    }

    #[test]
    fn bumps_keep_normals_unit() {
        let t = Bumps::new(15.0);
        let mut info = hit_at(12.3, -4.5);
        info.normal = Direction::new(0.0, 1.0, 0.0);
        info.dndx = Direction::new(1.0, 0.0, 0.0);
        info.dndy = Direction::new(0.0, 0.0, 1.0);
        t.modify_normal(&mut info);
        assert!((info.normal.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bump_texture_reads_slope_map() {
        let mut height = Bitmap::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let v = x as f64 / 8.0;
                height.set_pixel(x, y, Color::new(v, v, v));
            }
        }
        let t = BumpTexture::new(height, 4.0, 1.0);
        let mut info = hit_at(0.25, 0.25);
        info.normal = Direction::new(0.0, 1.0, 0.0);
        info.dndx = Direction::new(1.0, 0.0, 0.0);
        info.dndy = Direction::new(0.0, 0.0, 1.0);
        t.modify_normal(&mut info);
        // the slope along u tilts the normal off vertical
        assert!(info.normal.x != 0.0);
        assert!((info.normal.length() - 1.0).abs() < 1e-9);
    }
}
