//! 统一的数学库模块
//!
//! 基于 `nalgebra`，提供图形编程常用的类型别名和变换矩阵构造函数。
//! 所有矩阵遵循 OpenGL 约定：右手坐标系、列主序、裁剪空间深度范围 [-1, 1]。
//!
//! # 模块组织
//!
//! - **基础类型**：Vector2/3/4, Matrix3/4
//! - **变换**：translate, rotate, rotate_vector, scale, scale_uniform
//! - **投影与视图**：perspective, ortho, look_at
//! - **角度换算**：radians, degrees
//! - **颜色**：Color（见 color 子模块）

pub use nalgebra::{
    Matrix3 as Mat3, Matrix4 as Mat4, Point3, Unit,
    Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix3 = Mat3<f32>;
pub type Matrix4 = Mat4<f32>;

pub mod color;
pub use color::Color;

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 弧度转角度的系数
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 平移矩阵
pub fn translate(offset: &Vector3) -> Matrix4 {
    Matrix4::new_translation(offset)
}

/// 绕任意轴旋转的矩阵（`angle` 为弧度，轴无需归一化）
pub fn rotate(axis: &Vector3, angle: f32) -> Matrix4 {
    Matrix4::from_axis_angle(&Unit::new_normalize(*axis), angle)
}

/// 将向量绕任意轴旋转（`angle` 为弧度）
pub fn rotate_vector(vec: &Vector3, axis: &Vector3, angle: f32) -> Vector3 {
    nalgebra::Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle) * vec
}

/// 统一缩放矩阵
pub fn scale_uniform(factor: f32) -> Matrix4 {
    Matrix4::new_scaling(factor)
}

/// 非统一缩放矩阵
pub fn scale(factor: &Vector3) -> Matrix4 {
    Matrix4::new_nonuniform_scaling(factor)
}

/// 透视投影矩阵
///
/// `fov_degrees` 为垂直视场角（度）。
pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
    Matrix4::new_perspective(aspect, radians(fov_degrees), near, far)
}

/// 正交投影矩阵
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4 {
    Matrix4::new_orthographic(left, right, bottom, top, near, far)
}

/// 右手系 Look-At 视图矩阵
pub fn look_at(eye: &Vector3, center: &Vector3, up: &Vector3) -> Matrix4 {
    Matrix4::look_at_rh(&Point3::from(*eye), &Point3::from(*center), up)
}

/// 角度转弧度
pub fn radians(degrees: f32) -> f32 {
    degrees * constants::DEG_TO_RAD
}

/// 弧度转角度
pub fn degrees(radians: f32) -> f32 {
    radians * constants::RAD_TO_DEG
}

/// 检查两个浮点数是否近似相等
pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_translation() {
        let mat = translate(&Vector3::new(1.0, 2.0, 3.0));
        let result = mat * Vector4::new(0.0, 0.0, 0.0, 1.0);

        assert_relative_eq!(result, Vector4::new(1.0, 2.0, 3.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_vector_quarter_turn() {
        let v = rotate_vector(&Vector3::x(), &Vector3::y(), radians(90.0));
        assert_relative_eq!(v, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);

        let m = rotate(&Vector3::y(), radians(90.0));
        let p = m * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.xyz(), v, epsilon = 1e-6);
    }

    #[test]
    fn test_scale() {
        let p = scale(&Vector3::new(2.0, 3.0, 4.0)) * Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert_relative_eq!(p, Vector4::new(2.0, 3.0, 4.0, 1.0));

        let p = scale_uniform(0.5) * Vector4::new(2.0, 2.0, 2.0, 1.0);
        assert_relative_eq!(p, Vector4::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn test_perspective_maps_near_plane_to_minus_one() {
        let proj = perspective(90.0, 1.0, 0.5, 10.0);
        let clip = proj * Vector4::new(0.0, 0.0, -0.5, 1.0);
        assert_relative_eq!(clip.z / clip.w, -1.0, epsilon = 1e-5);

        let clip = proj * Vector4::new(0.0, 0.0, -10.0, 1.0);
        assert_relative_eq!(clip.z / clip.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let view = look_at(
            &Vector3::new(0.0, 0.0, 5.0),
            &Vector3::zeros(),
            &Vector3::y(),
        );
        let eye = view * Vector4::new(0.0, 0.0, 5.0, 1.0);
        assert_relative_eq!(eye, Vector4::new(0.0, 0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_angle_conversion() {
        assert!(approx_eq(radians(180.0), constants::PI, constants::EPSILON));
        assert!(approx_eq(degrees(constants::PI / 2.0), 90.0, 1e-4));
    }
}
