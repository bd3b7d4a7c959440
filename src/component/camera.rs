//! 相机组件
//!
//! 三种相机共用一个 `Camera` 结构，差别只在 `CameraKind`：
//!
//! - `Orthographic`：正交投影（例如模拟方向光的光源相机）
//! - `Perspective`：透视投影
//! - `Free`：透视投影 + WASD/鼠标控制，朝向由 yaw/pitch/roll 决定
//!
//! 任何修改位置、朝向、旋转或投影参数的调用都会立即重算
//! `view`、`proj` 和 `view_proj`，并保证 `view_proj == proj * view`。

use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::core::config::CameraConfig;
use crate::core::Input;
use crate::math::{self, degrees, radians, Matrix4, Vector3};

/// 俯仰角限制（度），避免方向与上向量共线
pub const PITCH_LIMIT: f32 = 89.0;

/// 每一格滚轮对移动速度的缩放倍数
const WHEEL_SPEED_FACTOR: f32 = 1.1;

/// `|direction × up|` 低于此值时视为共线
const PARALLEL_EPSILON: f32 = 1e-4;

/// 相机种类及其投影参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraKind {
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
    Perspective {
        /// 垂直视场角（度）
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Free {
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
        /// 欧拉角（度）
        yaw: f32,
        pitch: f32,
        roll: f32,
        /// 移动速度（单位/秒）
        speed: f32,
        /// 鼠标灵敏度（度/像素/秒）
        sensitivity: f32,
    },
}

/// 由 yaw/pitch（度）计算单位方向向量
fn direction_from_angles(yaw: f32, pitch: f32) -> Vector3 {
    let (yaw, pitch) = (radians(yaw), radians(pitch));
    Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
}

/// `direction_from_angles` 的逆运算，返回 (yaw, pitch)（度）
fn angles_from_direction(direction: &Vector3) -> (f32, f32) {
    let d = direction.normalize();
    let pitch = degrees(d.y.clamp(-1.0, 1.0).asin());
    let yaw = degrees(d.z.atan2(d.x));
    (yaw, pitch)
}

/// 与方向不共线的上向量：优先保留 `up`，其次世界 Y，最后 ±Z
fn non_parallel_up(direction: &Vector3, up: &Vector3) -> Vector3 {
    let parallel = |u: &Vector3| direction.cross(u).norm() <= PARALLEL_EPSILON;
    if !parallel(up) {
        *up
    } else if !parallel(&Vector3::y()) {
        Vector3::y()
    } else if direction.y >= 0.0 {
        Vector3::z()
    } else {
        -Vector3::z()
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    kind: CameraKind,
    position: Vector3,
    direction: Vector3,
    up: Vector3,

    view: Matrix4,
    proj: Matrix4,
    view_proj: Matrix4,
}

impl Camera {
    fn with_kind(kind: CameraKind) -> Self {
        let mut camera = Self {
            kind,
            position: Vector3::new(0.0, 0.0, 1.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::y(),
            view: Matrix4::identity(),
            proj: Matrix4::identity(),
            view_proj: Matrix4::identity(),
        };
        camera.compute_view_projection();
        camera
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::with_kind(CameraKind::Orthographic { left, right, bottom, top, near, far })
    }

    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_kind(CameraKind::Perspective { fov, aspect, near, far })
    }

    /// 自由相机，初始朝向 -Z（yaw = -90°）
    pub fn free(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_kind(CameraKind::Free {
            fov,
            aspect,
            near,
            far,
            yaw: -90.0,
            pitch: 0.0,
            roll: 0.0,
            speed: 5.0,
            sensitivity: 200.0,
        })
    }

    /// 按配置创建自由相机
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::free(config.fov, aspect, config.near, config.far);
        if let CameraKind::Free { speed, sensitivity, .. } = &mut camera.kind {
            *speed = config.move_speed;
            *sensitivity = config.mouse_sensitivity;
        }
        camera.compute_view_projection();
        camera
    }

    /// 按当前状态重算视图与投影矩阵
    fn compute_view_projection(&mut self) {
        if let CameraKind::Free { yaw, pitch, roll, .. } = self.kind {
            self.direction = direction_from_angles(yaw, pitch);
            self.up = math::rotate_vector(&Vector3::y(), &self.direction, radians(roll));
        }
        self.up = non_parallel_up(&self.direction, &self.up);

        self.view = math::look_at(&self.position, &(self.position + self.direction), &self.up);
        self.proj = match self.kind {
            CameraKind::Orthographic { left, right, bottom, top, near, far } => {
                math::ortho(left, right, bottom, top, near, far)
            }
            CameraKind::Perspective { fov, aspect, near, far }
            | CameraKind::Free { fov, aspect, near, far, .. } => math::perspective(fov, aspect, near, far),
        };
        self.view_proj = self.proj * self.view;
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.compute_view_projection();
    }

    /// 设置朝向；自由相机会反推 yaw/pitch（pitch 被限制在 ±89°）
    pub fn set_direction(&mut self, direction: Vector3) {
        if direction.norm() <= math::constants::EPSILON {
            return;
        }
        match &mut self.kind {
            CameraKind::Free { yaw, pitch, .. } => {
                let (y, p) = angles_from_direction(&direction);
                *yaw = y;
                *pitch = p.clamp(-PITCH_LIMIT, PITCH_LIMIT);
            }
            _ => self.direction = direction.normalize(),
        }
        self.compute_view_projection();
    }

    /// 以欧拉角（度）设置旋转
    ///
    /// - `pitch`：绕右向量
    /// - `yaw`：绕上向量
    /// - `roll`：绕方向向量
    pub fn set_rotation(&mut self, pitch: f32, yaw: f32, roll: f32) {
        match &mut self.kind {
            CameraKind::Free { yaw: y, pitch: p, roll: r, .. } => {
                *y = yaw;
                *p = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
                *r = roll;
            }
            _ => {
                self.direction = direction_from_angles(yaw, pitch);
                self.up = math::rotate_vector(&Vector3::y(), &self.direction, radians(roll));
            }
        }
        self.compute_view_projection();
    }

    /// 修改透视参数
    ///
    /// 对正交相机只更新近远裁剪面。
    pub fn set_projection(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        match &mut self.kind {
            CameraKind::Perspective { fov: f, aspect: a, near: n, far: fa }
            | CameraKind::Free { fov: f, aspect: a, near: n, far: fa, .. } => {
                *f = fov;
                *a = aspect;
                *n = near;
                *fa = far;
            }
            CameraKind::Orthographic { near: n, far: fa, .. } => {
                *n = near;
                *fa = far;
            }
        }
        self.compute_view_projection();
    }

    /// 修改正交投影的边界；对透视相机无效
    pub fn set_ortho_bounds(&mut self, left: f32, right: f32, bottom: f32, top: f32) {
        if let CameraKind::Orthographic { left: l, right: r, bottom: b, top: t, .. } = &mut self.kind {
            *l = left;
            *r = right;
            *b = bottom;
            *t = top;
            self.compute_view_projection();
        }
    }

    /// 修改宽高比
    ///
    /// 正交相机保持高度和水平中心不变，按新宽高比调整左右边界。
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if !new_aspect.is_finite() || new_aspect <= 0.0 {
            return;
        }
        match &mut self.kind {
            CameraKind::Perspective { aspect, .. } | CameraKind::Free { aspect, .. } => *aspect = new_aspect,
            CameraKind::Orthographic { left, right, bottom, top, .. } => {
                let center = 0.5 * (*left + *right);
                let half_width = 0.5 * (*top - *bottom) * new_aspect;
                *left = center - half_width;
                *right = center + half_width;
            }
        }
        self.compute_view_projection();
    }

    /// 朝向世界空间中的一点
    pub fn look_at(&mut self, target: Vector3) {
        self.set_direction(target - self.position);
    }

    /// 自由相机的逐帧控制
    ///
    /// - W/S：沿方向前后移动，A/D：沿 `direction × up` 左右移动，R/F：沿世界上方向升降
    /// - 按住鼠标左键拖动：调整 yaw/pitch
    /// - 滚轮：缩放移动速度
    ///
    /// 其他相机忽略输入。
    pub fn on_update(&mut self, input: &Input, dt: f32) {
        let CameraKind::Free { yaw, pitch, speed, sensitivity, .. } = &mut self.kind else {
            return;
        };

        let wheel = input.wheel_delta();
        if wheel != 0.0 {
            *speed *= WHEEL_SPEED_FACTOR.powf(wheel);
        }

        let world_up = Vector3::y();
        let direction = self.direction;
        let right = direction.cross(&world_up).normalize();
        let step = *speed * dt;

        let mut offset = Vector3::zeros();
        if input.is_key_pressed(KeyCode::KeyW) {
            offset += direction;
        }
        if input.is_key_pressed(KeyCode::KeyS) {
            offset -= direction;
        }
        if input.is_key_pressed(KeyCode::KeyD) {
            offset += right;
        }
        if input.is_key_pressed(KeyCode::KeyA) {
            offset -= right;
        }
        if input.is_key_pressed(KeyCode::KeyR) {
            offset += world_up;
        }
        if input.is_key_pressed(KeyCode::KeyF) {
            offset -= world_up;
        }
        self.position += offset * step;

        if input.is_mouse_button_pressed(MouseButton::Left) {
            let (dx, dy) = input.mouse_delta();
            *yaw += dx * *sensitivity * dt;
            // 屏幕 y 轴向下
            *pitch = (*pitch - dy * *sensitivity * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.compute_view_projection();
    }

    pub fn kind(&self) -> &CameraKind {
        &self.kind
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    pub fn up(&self) -> Vector3 {
        self.up
    }

    pub fn view(&self) -> &Matrix4 {
        &self.view
    }

    pub fn proj(&self) -> &Matrix4 {
        &self.proj
    }

    pub fn view_proj(&self) -> &Matrix4 {
        &self.view_proj
    }

    /// 自由相机的 (yaw, pitch)（度）
    pub fn yaw_pitch(&self) -> Option<(f32, f32)> {
        match self.kind {
            CameraKind::Free { yaw, pitch, .. } => Some((yaw, pitch)),
            _ => None,
        }
    }

    /// 自由相机的移动速度
    pub fn speed(&self) -> Option<f32> {
        match self.kind {
            CameraKind::Free { speed, .. } => Some(speed),
            _ => None,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::free(90.0, 16.0 / 9.0, 0.3, 100.0)
    }
}
