use crate::color::Color;
use crate::direction::{Direction, Dot};
use crate::geometry::Ray;
use crate::matrix::Matrix44f;
use crate::point::Point;
use crate::random::Sampler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEye {
    Central,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point,
    /// Orientation in degrees.
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub aspect_ratio: f64,
    /// Diagonal field of view, degrees.
    pub fov: f64,
    pub dof: bool,
    pub f_number: f64,
    pub focal_plane_dist: f64,
    pub num_samples: usize,
    pub auto_focus: bool,
    pub stereo_separation: f64,
    pub left_mask: Color,
    pub right_mask: Color,

    // derived at beginFrame
    aperture_size: f64,
    top_left: Point,
    top_right: Point,
    bottom_left: Point,
    front_dir: Direction,
    up_dir: Direction,
    right_dir: Direction,
    frame_width: f64,
    frame_height: f64,
}

impl Camera {
    pub fn new() -> Camera {
        Camera {
            position: Point::zero(),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            aspect_ratio: 4.0 / 3.0,
            fov: 90.0,
            dof: false,
            f_number: 2.0,
            focal_plane_dist: 100.0,
            num_samples: 32,
            auto_focus: false,
            stereo_separation: 0.0,
            left_mask: Color::new(1.0, 0.0, 0.0),
            right_mask: Color::new(0.0, 1.0, 1.0),
            aperture_size: 4.5 / 2.0,
            top_left: Point::zero(),
            top_right: Point::zero(),
            bottom_left: Point::zero(),
            front_dir: Direction::new(0.0, 0.0, 1.0),
            up_dir: Direction::new(0.0, 1.0, 0.0),
            right_dir: Direction::new(1.0, 0.0, 0.0),
            frame_width: 0.0,
            frame_height: 0.0,
        }
    }

    /// Rebuilds the screen-plane corners and the orientation basis. The
    /// screen plane sits one unit in front of the camera, scaled so that the
    /// *diagonal* angle of view equals `fov`.
    pub fn begin_frame(&mut self, frame_width: usize, frame_height: usize) {
        self.frame_width = frame_width as f64;
        self.frame_height = frame_height as f64;
        self.aperture_size = 4.5 / self.f_number;

        let wanted_angle = (self.fov / 2.0).to_radians();
        let wanted_length = wanted_angle.tan();
        let hypot_length = (self.aspect_ratio * self.aspect_ratio + 1.0).sqrt();
        let scale_factor = wanted_length / hypot_length;

        let x2d = self.aspect_ratio * scale_factor;
        let y2d = scale_factor;

        let rotation = Matrix44f::rotation_z(self.roll)
            * Matrix44f::rotation_x(self.pitch)
            * Matrix44f::rotation_y(self.yaw);

        self.top_left = Point::new(-x2d, y2d, 1.0) * rotation + self.position.to_dir();
        self.top_right = Point::new(x2d, y2d, 1.0) * rotation + self.position.to_dir();
        self.bottom_left = Point::new(-x2d, -y2d, 1.0) * rotation + self.position.to_dir();

        self.front_dir = Direction::new(0.0, 0.0, 1.0) * rotation;
        self.up_dir = Direction::new(0.0, 1.0, 0.0) * rotation;
        self.right_dir = Direction::new(1.0, 0.0, 0.0) * rotation;
    }

    pub fn get_screen_ray(&self, x_screen: f64, y_screen: f64, eye: CameraEye) -> Ray {
        let through_point = self.top_left
            + (self.top_right - self.top_left) * (x_screen / self.frame_width)
            + (self.bottom_left - self.top_left) * (y_screen / self.frame_height);

        let mut start = self.position;
        match eye {
            CameraEye::Central => {}
            CameraEye::Left => start -= self.right_dir * self.stereo_separation,
            CameraEye::Right => start += self.right_dir * self.stereo_separation,
        }
        Ray::new(start, (through_point - self.position).normalize())
    }

    /// Thin-lens variant: keeps the focal-plane point of the pinhole ray
    /// fixed and jitters the origin over the aperture disc.
    pub fn get_dof_ray(
        &self,
        x_screen: f64,
        y_screen: f64,
        eye: CameraEye,
        sampler: &mut Sampler,
    ) -> Ray {
        let ray = self.get_screen_ray(x_screen, y_screen, eye);
        let cos_theta = ray.dir.dot(self.front_dir);
        let m = self.focal_plane_dist / cos_theta;
        let target = ray.start + ray.dir * m;

        let (u, v) = sampler.unit_disc_sample();
        let u = u * self.aperture_size;
        let v = v * self.aperture_size;

        let start = ray.start + self.up_dir * u + self.right_dir * v;
        Ray::new(start, (target - start).normalize())
    }

    /// Interactive helpers: motion in the view plane and yaw/pitch turns.
    pub fn move_rel(&mut self, sideways: f64, front_back: f64) {
        self.position += self.right_dir * sideways + self.front_dir * front_back;
    }

    pub fn rotate(&mut self, yaw_diff: f64, pitch_diff: f64) {
        self.yaw += yaw_diff;
        self.pitch = (self.pitch + pitch_diff).clamp(-90.0, 90.0);
    }

    pub fn front_dir(&self) -> Direction {
        self.front_dir
    }

    pub fn right_dir(&self) -> Direction {
        self.right_dir
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::init_random;
    use crate::test_utils::*;

    fn test_camera() -> Camera {
        let mut c = Camera::new();
        c.position = Point::new(0.0, 60.0, -100.0);
        c.pitch = -30.0;
        c.begin_frame(640, 480);
        c
    }

    #[test]
    fn screen_ray_round_trip() {
        // project the primary ray back onto the screen plane and recover
        // the pixel coordinates
        let c = test_camera();
        for &(x, y) in &[(0.0, 0.0), (320.0, 240.0), (639.0, 479.0), (17.5, 401.25)] {
            let ray = c.get_screen_ray(x, y, CameraEye::Central);

            // screen plane through top_left spanned by the two edges
            let ex = c.top_right - c.top_left;
            let ey = c.bottom_left - c.top_left;
            let n = ex.cross(ey);
            let t = (c.top_left - ray.start).dot(n) / ray.dir.dot(n);
            let on_plane = ray.start + ray.dir * t;
            let rel = on_plane - c.top_left;

            // solve rel = a * ex + b * ey via normal equations
            let (exx, exy) = (ex.dot(ex), ex.dot(ey));
            let eyy = ey.dot(ey);
            let (bx, by) = (rel.dot(ex), rel.dot(ey));
            let det = exx * eyy - exy * exy;
            let a = (bx * eyy - by * exy) / det;
            let b = (exx * by - exy * bx) / det;

            assert_approx_eq!(a * 640.0, x);
            assert_approx_eq!(b * 480.0, y);
        }
    }

    #[test]
    fn central_ray_looks_down_with_negative_pitch() {
        let c = test_camera();
        let ray = c.get_screen_ray(320.0, 240.0, CameraEye::Central);
        assert!(ray.dir.y < 0.0);
        assert_approx_eq!(ray.dir.length(), 1.0);
    }

    #[test]
    fn stereo_eyes_straddle_the_center() {
        let mut c = test_camera();
        c.stereo_separation = 2.0;
        let left = c.get_screen_ray(320.0, 240.0, CameraEye::Left);
        let right = c.get_screen_ray(320.0, 240.0, CameraEye::Right);
        let offset = right.start - left.start;
        assert_approx_eq!(offset.length(), 4.0);
        assert!(offset.dot(c.right_dir()) > 0.0);
    }

    #[test]
    fn dof_ray_targets_the_focal_plane() {
        init_random(42);
        let mut sampler = Sampler::new(0);
        let mut c = test_camera();
        c.dof = true;
        c.focal_plane_dist = 150.0;
        c.begin_frame(640, 480);

        let pinhole = c.get_screen_ray(200.0, 100.0, CameraEye::Central);
        let cos_theta = pinhole.dir.dot(c.front_dir());
        let target = pinhole.start + pinhole.dir * (150.0 / cos_theta);

        for _ in 0..8 {
            let ray = c.get_dof_ray(200.0, 100.0, CameraEye::Central, &mut sampler);
            // every aperture sample passes through the same focal point
            let t = (target - ray.start).dot(ray.dir);
            let closest = ray.start + ray.dir * t;
            assert_approx_eq!(closest, target);
        }
    }

    #[test]
    fn move_rel_follows_the_basis() {
        let mut c = test_camera();
        let before = c.position;
        c.move_rel(0.0, 10.0);
        let delta = c.position - before;
        assert_approx_eq!(delta.normalize(), c.front_dir());
    }
}
