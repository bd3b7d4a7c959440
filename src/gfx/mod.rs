//! 图形设备模块
//!
//! 本模块封装了原生图形 API 的调用层，包括：
//! - `GlDevice`：基于 glow 的 OpenGL 4.5+ 实现
//! - `HeadlessDevice`：CPU 模拟实现，记录调用序列，用于测试和无窗口运行
//!
//! 两者都实现了统一的 `GraphicsDevice` trait，渲染器层的所有包装对象
//! 只依赖该 trait，不直接接触 GL。

pub mod backend;
pub mod gl;
pub mod headless;
pub mod types;

pub use backend::{GraphicsDevice, Gpu};
pub use gl::GlDevice;
pub use headless::{DeviceCall, HeadlessDevice};
pub use types::*;
