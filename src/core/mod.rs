//! 核心功能模块
//!
//! 本模块提供框架的基础功能：日志系统、配置管理、错误处理和输入状态。
//! 这些模块不依赖 GL 上下文，可以在无头环境中使用。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载框架设置
//! - `error`：错误处理，定义统一的错误类型
//! - `input`：由窗口事件驱动的键盘/鼠标状态

pub mod log;
pub mod config;
pub mod error;
pub mod input;

// 重新导出常用类型，方便使用
pub use config::{Config, LogLevel};
pub use error::{ConfigError, GraphicsError, MeshLoadError, MiniGlError, Result, TextureError};
pub use input::Input;
