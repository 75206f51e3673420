use crate::direction::Direction;
use crate::geometry::{IntersectionInfo, Ray, INF};
use crate::point::Point;

/// Axis-aligned cube described by its center and half side.
#[derive(Debug, Clone, Copy)]
pub struct Cube {
    pub center: Point,
    pub half_side: f64,
}

impl Cube {
    pub fn new(center: Point, half_side: f64) -> Cube {
        Cube { center, half_side }
    }

    fn intersect_side(
        &self,
        level: f64,
        start: f64,
        dir: f64,
        ray: &Ray,
        normal: Direction,
        info: &mut IntersectionInfo,
    ) -> bool {
        if start > level && dir >= 0.0 {
            return false;
        }
        if start < level && dir <= 0.0 {
            return false;
        }

        let scale_factor = (level - start) / dir;
        let ip = ray.start + ray.dir * scale_factor;
        if ip.y > self.center.y + self.half_side + 1e-6 {
            return false;
        }
        if ip.y < self.center.y - self.half_side - 1e-6 {
            return false;
        }

        if ip.x > self.center.x + self.half_side + 1e-6 {
            return false;
        }
        if ip.x < self.center.x - self.half_side - 1e-6 {
            return false;
        }

        if ip.z > self.center.z + self.half_side + 1e-6 {
            return false;
        }
        if ip.z < self.center.z - self.half_side - 1e-6 {
            return false;
        }

        let distance = scale_factor;
        if distance < info.distance {
            info.ip = ip;
            info.distance = distance;
            info.normal = normal;
            info.u = info.ip.x + info.ip.z;
            info.v = info.ip.y;
            return true;
        }
        false
    }

    pub fn intersect(&self, ray: &Ray, info: &mut IntersectionInfo) -> bool {
        let o = self.center;
        let h = self.half_side;
        info.distance = INF;
        self.intersect_side(o.x - h, ray.start.x, ray.dir.x, ray, Direction::new(-1.0, 0.0, 0.0), info);
        self.intersect_side(o.x + h, ray.start.x, ray.dir.x, ray, Direction::new(1.0, 0.0, 0.0), info);
        self.intersect_side(o.y - h, ray.start.y, ray.dir.y, ray, Direction::new(0.0, -1.0, 0.0), info);
        self.intersect_side(o.y + h, ray.start.y, ray.dir.y, ray, Direction::new(0.0, 1.0, 0.0), info);
        self.intersect_side(o.z - h, ray.start.z, ray.dir.z, ray, Direction::new(0.0, 0.0, -1.0), info);
        self.intersect_side(o.z + h, ray.start.z, ray.dir.z, ray, Direction::new(0.0, 0.0, 1.0), info);

        info.distance < INF
    }
}
