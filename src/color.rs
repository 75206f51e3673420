use std::ops::{Add, AddAssign, Div, Mul, Sub};

#[derive(Debug, Copy, Clone)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b }
    }

    pub fn black() -> Color {
        Color::new(0.0, 0.0, 0.0)
    }

    pub fn white() -> Color {
        Color::new(1.0, 1.0, 1.0)
    }

    pub fn red() -> Color {
        Color::new(1.0, 0.0, 0.0)
    }

    /// Mean of the three channels; the path tracer uses this to cut off
    /// near-black path multipliers.
    pub fn intensity(&self) -> f64 {
        (self.r + self.g + self.b) / 3.0
    }

    pub fn clamped(&self) -> Color {
        Color::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    /// Scales chroma about the luma axis; 1 leaves the color unchanged,
    /// 0 yields pure grey.
    pub fn saturated(&self, amount: f64) -> Color {
        let luma = self.r * 0.299 + self.g * 0.587 + self.b * 0.114;
        let grey = Color::new(luma, luma, luma);
        grey + (*self - grey) * amount
    }

    pub fn gamma_2(&self) -> Color {
        Color::new(
            self.r.max(0.0).sqrt(),
            self.g.max(0.0).sqrt(),
            self.b.max(0.0).sqrt(),
        )
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Self::Output {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Sub for Color {
    type Output = Color;

    fn sub(self, rhs: Color) -> Self::Output {
        Color::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl Mul for Color {
    type Output = Color;

    fn mul(self, rhs: Color) -> Self::Output {
        Color::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, rhs: f64) -> Self::Output {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl Mul<Color> for f64 {
    type Output = Color;

    fn mul(self, rhs: Color) -> Self::Output {
        Color::new(self * rhs.r, self * rhs.g, self * rhs.b)
    }
}

impl Div<f64> for Color {
    type Output = Color;

    fn div(self, rhs: f64) -> Self::Output {
        Color::new(self.r / rhs, self.g / rhs, self.b / rhs)
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Color) -> bool {
        (self.r - other.r).abs() <= f64::EPSILON
            && (self.g - other.g).abs() <= f64::EPSILON
            && (self.b - other.b).abs() <= f64::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add() {
        let a = Color::new(0.1, 0.2, 0.3);
        let b = Color::new(0.4, 0.5, 0.6);
        let r = a + b;
        assert_eq!(Color::new(0.1 + 0.4, 0.2 + 0.5, 0.3 + 0.6), r);
    }

    #[test]
    fn add_assign() {
        let mut r = Color::new(0.1, 0.2, 0.3);
        r += Color::new(0.4, 0.5, 0.6);
        assert_eq!(Color::new(0.5, 0.7, 0.9), r);
    }

    #[test]
    fn mul_color() {
        let a = Color::new(0.1, 0.2, 0.3);
        let b = Color::new(0.4, 0.5, 0.6);
        let r = a * b;
        assert_eq!(Color::new(0.1 * 0.4, 0.2 * 0.5, 0.3 * 0.6), r);
    }

    #[test]
    fn mul_f64() {
        let c = Color::new(0.1, 0.2, 0.3);
        let r = c * 2.0;
        assert_eq!(Color::new(0.1 * 2.0, 0.2 * 2.0, 0.3 * 2.0), r);
    }

    #[test]
    fn div_f64() {
        let c = Color::new(0.1, 0.2, 0.3);
        let r = c / 2.0;
        assert_eq!(Color::new(0.1 / 2.0, 0.2 / 2.0, 0.3 / 2.0), r);
    }

    #[test]
    fn intensity() {
        let c = Color::new(0.3, 0.6, 0.9);
        assert!((c.intensity() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn clamped() {
        let c = Color::new(-0.5, 0.5, 1.5).clamped();
        assert_eq!(c, Color::new(0.0, 0.5, 1.0));
    }

    #[test]
    fn saturated_identity() {
        let c = Color::new(0.2, 0.4, 0.8);
        assert_eq!(c.saturated(1.0), c);
    }

    #[test]
    fn saturated_grey() {
        let c = Color::new(0.2, 0.4, 0.8).saturated(0.0);
        assert!((c.r - c.g).abs() < 1e-12 && (c.g - c.b).abs() < 1e-12);
    }
}
