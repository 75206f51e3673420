use crate::direction::Direction;
use crate::geometry::Ray;
use crate::matrix::Matrix44f;
use crate::point::Point;

/// Accumulated object-to-world placement: a linear part (rotation and scale)
/// plus a translation offset. The inverse and the normal matrix are kept in
/// step with every edit.
#[derive(Debug, Clone)]
pub struct Transform {
    transform: Matrix44f,
    inverse_transform: Matrix44f,
    normal_transform: Matrix44f,
    offset: Direction,
}

impl Transform {
    pub fn identity() -> Transform {
        Transform {
            transform: Matrix44f::identity(),
            inverse_transform: Matrix44f::identity(),
            normal_transform: Matrix44f::identity(),
            offset: Direction::zero(),
        }
    }

    fn apply(&mut self, m: Matrix44f) {
        self.transform = self.transform * m;
        self.inverse_transform = self.transform.inverse();
        self.normal_transform = self.inverse_transform.transposed();
    }

    pub fn scale(&mut self, x: f64, y: f64, z: f64) {
        self.apply(Matrix44f::scaling(Direction::new(x, y, z)));
    }

    /// Angles in degrees, composed roll, pitch, yaw like the camera.
    pub fn rotate(&mut self, yaw: f64, pitch: f64, roll: f64) {
        self.apply(
            Matrix44f::rotation_z(roll) * Matrix44f::rotation_x(pitch) * Matrix44f::rotation_y(yaw),
        );
    }

    pub fn translate(&mut self, v: Direction) {
        self.offset += v;
    }

    pub fn point(&self, p: Point) -> Point {
        p * self.transform + self.offset
    }

    pub fn undo_point(&self, p: Point) -> Point {
        (p - self.offset) * self.inverse_transform
    }

    pub fn direction(&self, d: Direction) -> Direction {
        d * self.transform
    }

    pub fn undo_direction(&self, d: Direction) -> Direction {
        d * self.inverse_transform
    }

    /// Normals move by the inverse transpose, so non-uniform scaling keeps
    /// them perpendicular; callers renormalise.
    pub fn normal(&self, n: Direction) -> Direction {
        n * self.normal_transform
    }

    /// Brings a world ray into object space. The direction is renormalised;
    /// whoever needs a world-space distance recomputes it from world points.
    pub fn undo_ray(&self, ray: &Ray) -> Ray {
        let mut local = Ray::new(
            self.undo_point(ray.start),
            self.undo_direction(ray.dir).normalize(),
        );
        local.depth = ray.depth;
        local.flags = ray.flags;
        local
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}
