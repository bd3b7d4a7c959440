//! minigl - 面向对象的 OpenGL 轻量封装
//!
//! 把 OpenGL 4.5+ 的缓冲区、顶点数组、纹理、帧缓冲、着色器程序、
//! Fence 和相机包装成拥有所有权的 Rust 对象，并提供一个最小的应用
//! 帧循环，用于快速编写图形演示程序。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理、输入状态）
//! - `math`: 向量/矩阵别名、变换与投影辅助函数、颜色
//! - `gfx`: 图形设备层（glow 实现与无头实现）
//! - `renderer`: GPU 对象包装（缓冲区、顶点数组、纹理、帧缓冲、着色器、绘制命令）
//! - `geometry`: 顶点、网格与 OBJ 加载器
//! - `component`: 相机
//! - `app`: 窗口与帧循环
//!
//! # 使用示例
//!
//! ```no_run
//! use minigl::app::{App, AppContext, Application};
//! use minigl::core::{Config, Result};
//! use minigl::gfx::Gpu;
//! use minigl::renderer::ShaderProgram;
//!
//! struct Demo {
//!     shader: ShaderProgram,
//! }
//!
//! impl Application for Demo {
//!     fn init(gpu: &Gpu, _ctx: &AppContext) -> Result<Self> {
//!         let shader = ShaderProgram::from_file(gpu, "demos/res/triangle.glsl")?;
//!         Ok(Self { shader })
//!     }
//!
//!     fn render(&mut self, _gpu: &Gpu, _ctx: &AppContext) -> Result<()> {
//!         self.shader.bind();
//!         Ok(())
//!     }
//! }
//!
//! App::run::<Demo>(Config::default())?;
//! # Ok::<(), minigl::core::MiniGlError>(())
//! ```

pub mod app;
pub mod component;
pub mod core;
pub mod geometry;
pub mod gfx;
pub mod math;
pub mod renderer;
