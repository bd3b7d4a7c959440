//! 配置管理模块
//!
//! 提供框架配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "minigl"
//! resizable = true
//! vsync = true
//!
//! [graphics]
//! gl_major = 4
//! gl_minor = 6
//! debug_output = true
//! clear_color = [0.2, 0.2, 0.2, 1.0]
//!
//! [camera]
//! fov = 90.0
//! near = 0.3
//! far = 100.0
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 框架配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 相机配置（App3D 使用）
    #[serde(default)]
    pub camera: CameraConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 不创建窗口，在无头设备上运行帧循环
    #[serde(default)]
    pub headless: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 请求的 OpenGL 主版本号
    #[serde(default = "default_gl_major")]
    pub gl_major: u8,

    /// 请求的 OpenGL 次版本号
    #[serde(default = "default_gl_minor")]
    pub gl_minor: u8,

    /// 是否将驱动调试消息转发到日志
    #[serde(default = "default_debug_output")]
    pub debug_output: bool,

    /// 每帧开始时的清屏颜色（RGBA）
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    /// 启动时开启深度测试
    #[serde(default = "default_true")]
    pub depth_test: bool,

    /// 启动时开启深度钳制
    #[serde(default = "default_true")]
    pub depth_clamp: bool,
}

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 垂直视场角（度）
    #[serde(default = "default_fov")]
    pub fov: f32,

    /// 近裁剪面
    #[serde(default = "default_near")]
    pub near: f32,

    /// 远裁剪面
    #[serde(default = "default_far")]
    pub far: f32,

    /// 移动速度（单位/秒）
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,

    /// 鼠标灵敏度（度/像素/秒）
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "minigl".to_string() }
fn default_resizable() -> bool { true }
fn default_vsync() -> bool { true }
fn default_gl_major() -> u8 { 4 }
fn default_gl_minor() -> u8 { 6 }
fn default_debug_output() -> bool { true }
fn default_clear_color() -> [f32; 4] { [0.2, 0.2, 0.2, 1.0] }
fn default_true() -> bool { true }
fn default_fov() -> f32 { 90.0 }
fn default_near() -> f32 { 0.3 }
fn default_far() -> f32 { 100.0 }
fn default_move_speed() -> f32 { 5.0 }
fn default_mouse_sensitivity() -> f32 { 200.0 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "minigl.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
            vsync: default_vsync(),
            headless: false,
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            gl_major: default_gl_major(),
            gl_minor: default_gl_minor(),
            debug_output: default_debug_output(),
            clear_color: default_clear_color(),
            depth_test: true,
            depth_clamp: true,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            move_speed: default_move_speed(),
            mouse_sensitivity: default_mouse_sensitivity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use minigl::core::Config;
    ///
    /// let config = Config::from_file("config.toml")?;
    /// # Ok::<(), minigl::core::MiniGlError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--width <value>`: 设置窗口宽度
    /// - `--height <value>`: 设置窗口高度
    /// - `--no-vsync`: 关闭垂直同步
    /// - `--headless`: 在无头设备上运行
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--no-vsync") {
            self.window.vsync = false;
        }

        if args.iter().any(|a| a == "--headless") {
            self.window.headless = true;
        }

        // 检查窗口尺寸
        if let Some(width) = parse_flag_value(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = parse_flag_value(&args, "--height") {
            self.window.height = height;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid(
                "window.width/height",
                "Window dimensions must be greater than 0",
            ));
        }

        // DSA、计算着色器和间接绘制都需要 4.5 以上
        if (self.graphics.gl_major, self.graphics.gl_minor) < (4, 5) {
            return Err(invalid(
                "graphics.gl_major/gl_minor",
                "OpenGL 4.5 or newer is required",
            ));
        }

        let camera = &self.camera;
        if camera.near <= 0.0 || camera.far <= camera.near {
            return Err(invalid(
                "camera.near/far",
                "Clip planes must satisfy 0 < near < far",
            ));
        }

        if camera.fov <= 0.0 || camera.fov >= 180.0 {
            return Err(invalid("camera.fov", "Field of view must be in (0, 180) degrees"));
        }

        Ok(())
    }

    /// 窗口宽高比
    pub fn aspect_ratio(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<u32> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

fn invalid(field: &str, reason: &str) -> super::error::MiniGlError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.graphics.clear_color, [0.2, 0.2, 0.2, 1.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.gl_minor = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.camera.far = config.camera.near;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [window]
            width = 1024

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.camera.fov, 90.0);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["minigl", "--width", "1280", "--height", "720", "--headless", "--no-vsync"]);

        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert!(config.window.headless);
        assert!(!config.window.vsync);
    }

    #[test]
    fn test_apply_args_ignores_garbage() {
        let mut config = Config::default();
        config.apply_args(["--width", "wide"]);
        assert_eq!(config.window.width, 800);
    }
}
