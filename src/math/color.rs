//! RGBA 颜色值类型

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use super::{Vector3, Vector4};

/// 颜色类型（RGBA，范围 0.0-1.0）
///
/// 与 `Vector4` 内存布局一致，可直接作为 uniform 上传。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    // 预定义颜色
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    pub const BROWN: Color = Color::rgb(0.6, 0.3, 0.1);

    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 灰度颜色（r = g = b = factor，alpha = 1.0）
    pub const fn gray(factor: f32) -> Self {
        Self::rgb(factor, factor, factor)
    }

    /// 从整数值创建颜色（0-255）
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// 转换为 Vector4
    pub fn to_vec4(&self) -> Vector4 {
        Vector4::new(self.r, self.g, self.b, self.a)
    }

    /// 转换为 Vector3（忽略 alpha）
    pub fn to_vec3(&self) -> Vector3 {
        Vector3::new(self.r, self.g, self.b)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl From<Vector3> for Color {
    fn from(v: Vector3) -> Self {
        Color::rgb(v.x, v.y, v.z)
    }
}

impl From<Vector4> for Color {
    fn from(v: Vector4) -> Self {
        Color::new(v.x, v.y, v.z, v.w)
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Color::new(c[0], c[1], c[2], c[3])
    }
}

impl From<Color> for Vector4 {
    fn from(c: Color) -> Self {
        c.to_vec4()
    }
}

impl From<Color> for Vector3 {
    fn from(c: Color) -> Self {
        c.to_vec3()
    }
}

// 分量运算
impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
        self.a += rhs.a;
    }
}

impl SubAssign for Color {
    fn sub_assign(&mut self, rhs: Color) {
        self.r -= rhs.r;
        self.g -= rhs.g;
        self.b -= rhs.b;
        self.a -= rhs.a;
    }
}

impl MulAssign for Color {
    fn mul_assign(&mut self, rhs: Color) {
        self.r *= rhs.r;
        self.g *= rhs.g;
        self.b *= rhs.b;
        self.a *= rhs.a;
    }
}

impl MulAssign<f32> for Color {
    fn mul_assign(&mut self, factor: f32) {
        self.r *= factor;
        self.g *= factor;
        self.b *= factor;
        self.a *= factor;
    }
}

impl Add for Color {
    type Output = Color;

    fn add(mut self, rhs: Color) -> Color {
        self += rhs;
        self
    }
}

impl Sub for Color {
    type Output = Color;

    fn sub(mut self, rhs: Color) -> Color {
        self -= rhs;
        self
    }
}

impl Mul for Color {
    type Output = Color;

    fn mul(mut self, rhs: Color) -> Color {
        self *= rhs;
        self
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(mut self, factor: f32) -> Color {
        self *= factor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_creation() {
        let color = Color::rgb(1.0, 0.5, 0.0);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.a, 1.0);
        assert_eq!(Color::gray(0.2), Color::new(0.2, 0.2, 0.2, 1.0));
    }

    #[test]
    fn test_color_arithmetic() {
        let a = Color::new(0.5, 0.25, 0.0, 1.0);
        let b = Color::new(0.25, 0.25, 0.5, 0.0);

        assert_eq!(a + b, Color::new(0.75, 0.5, 0.5, 1.0));
        assert_eq!(a - b, Color::new(0.25, 0.0, -0.5, 1.0));
        assert_eq!(a * b, Color::new(0.125, 0.0625, 0.0, 0.0));
        assert_eq!(a * 2.0, Color::new(1.0, 0.5, 0.0, 2.0));
    }

    #[test]
    fn test_vector_conversion() {
        let c = Color::from(Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(c.a, 1.0);
        assert_eq!(Vector4::from(c), Vector4::new(0.1, 0.2, 0.3, 1.0));
    }
}
