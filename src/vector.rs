use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2f(pub f64, pub f64);

impl Vector2f {
    pub fn zero() -> Vector2f {
        Vector2f(0.0, 0.0)
    }
}

impl Add for Vector2f {
    type Output = Vector2f;

    fn add(self, rhs: Vector2f) -> Self::Output {
        Vector2f(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Sub for Vector2f {
    type Output = Vector2f;

    fn sub(self, rhs: Vector2f) -> Self::Output {
        Vector2f(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl Mul<f64> for Vector2f {
    type Output = Vector2f;

    fn mul(self, rhs: f64) -> Self::Output {
        Vector2f(self.0 * rhs, self.1 * rhs)
    }
}
