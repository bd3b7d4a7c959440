//! 场景组件模块
//!
//! 目前只有相机：正交、透视和可由键鼠控制的自由相机。

mod camera;

pub use camera::{Camera, CameraKind, PITCH_LIMIT};
