use std::f64::consts::PI;

use crate::direction::Dot;
use crate::geometry::{IntersectionInfo, Ray};
use crate::point::Point;

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Point,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point, radius: f64) -> Sphere {
        Sphere { center, radius }
    }

    pub fn intersect(&self, ray: &Ray, info: &mut IntersectionInfo) -> bool {
        // |start - center + p * dir|^2 == R^2, with dir unit so a == 1
        let h = ray.start - self.center;
        let b = 2.0 * h.dot(ray.dir);
        let c = h.length_squared() - self.radius * self.radius;

        let discr = b * b - 4.0 * c;
        if discr < 0.0 {
            return false;
        }

        let p1 = (-b - discr.sqrt()) / 2.0;
        let p2 = (-b + discr.sqrt()) / 2.0;
        // p1 <= p2; if only the far root is ahead, the ray starts inside the
        // sphere and the normal must face back at it
        let (p, back_normal) = if p1 > 0.0 {
            (p1, false)
        } else if p2 > 0.0 {
            (p2, true)
        } else {
            return false;
        };

        info.distance = p;
        info.ip = ray.start + ray.dir * p;
        info.normal = (info.ip - self.center).normalize();
        if back_normal {
            info.normal = -info.normal;
        }

        let pos_relative = info.ip - self.center;
        let u = pos_relative.z.atan2(pos_relative.x);
        let v = (pos_relative.y / self.radius).clamp(-1.0, 1.0).asin();
        // remap [(-PI..PI)x(-PI/2..PI/2)] -> [(0..1)x(0..1)]
        info.u = (u + PI) / (2.0 * PI);
        info.v = (v + PI / 2.0) / PI;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;
    use crate::test_utils::*;

    #[test]
    fn outside_hit_takes_near_root() {
        let s = Sphere::new(Point::zero(), 1.0);
        let r = Ray::new(Point::new(0.0, 0.0, -3.0), Direction::new(0.0, 0.0, 1.0));
        let mut info = IntersectionInfo::new();
        assert!(s.intersect(&r, &mut info));
        assert_approx_eq!(info.distance, 2.0);
        assert_approx_eq!(info.normal, Direction::new(0.0, 0.0, -1.0));
        assert_approx_eq!(info.normal.length(), 1.0);
    }

    #[test]
    fn inside_hit_flips_normal() {
        let s = Sphere::new(Point::zero(), 1.0);
        let r = Ray::new(Point::new(0.0, 0.0, 0.0), Direction::new(0.0, 0.0, 1.0));
        let mut info = IntersectionInfo::new();
        assert!(s.intersect(&r, &mut info));
        assert_approx_eq!(info.distance, 1.0);
        // surface normal points outwards (+z) but is inverted for the
        // inside observer
        assert_approx_eq!(info.normal, Direction::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn behind_ray_misses() {
        let s = Sphere::new(Point::zero(), 1.0);
        let r = Ray::new(Point::new(0.0, 0.0, 3.0), Direction::new(0.0, 0.0, 1.0));
        let mut info = IntersectionInfo::new();
        assert!(!s.intersect(&r, &mut info));
    }

    #[test]
    fn grazing_miss() {
        let s = Sphere::new(Point::zero(), 1.0);
        let r = Ray::new(Point::new(0.0, 2.0, -3.0), Direction::new(0.0, 0.0, 1.0));
        let mut info = IntersectionInfo::new();
        assert!(!s.intersect(&r, &mut info));
    }

    #[test]
    fn uv_in_unit_square() {
        let s = Sphere::new(Point::new(1.0, 2.0, 3.0), 2.0);
        let dirs = [
            Direction::new(0.3, -0.4, 0.86).normalize(),
            Direction::new(-0.7, 0.1, 0.7).normalize(),
            Direction::new(0.0, -1.0, 0.0),
        ];
        for dir in dirs {
            let r = Ray::new(Point::new(1.0, 12.0, 3.0), dir);
            let mut info = IntersectionInfo::new();
            if s.intersect(&r, &mut info) {
                assert!(info.u >= 0.0 && info.u <= 1.0);
                assert!(info.v >= 0.0 && info.v <= 1.0);
                assert!(info.distance > 0.0);
            }
        }
    }
}
