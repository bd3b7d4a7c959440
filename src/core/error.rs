//! 错误处理模块
//!
//! 定义了框架中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - **初始化失败**：窗口/GL 上下文创建、着色器编译链接、纹理格式不支持，
//!   一律向上传播，由 `App::run` 记录日志后返回给 `main`
//! - **契约违反**：缓冲区越界写入、未映射的缓冲区访问，返回带类型的错误，
//!   绝不静默破坏内存
//! - **静默忽略**：未知的 uniform 名称，按 OpenGL 惯例不视为错误

use std::fmt;
use std::path::PathBuf;

/// 框架统一的 Result 类型
pub type Result<T> = std::result::Result<T, MiniGlError>;

/// minigl 的错误类型
#[derive(Debug)]
pub enum MiniGlError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// 网格加载错误
    MeshLoading(MeshLoadError),

    /// 纹理加载错误
    Texture(TextureError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误（窗口、GL 上下文）
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// 原生对象创建失败
    ResourceCreation(String),

    /// 着色器源码无法拆分为有效的阶段集合
    ShaderSource(String),

    /// 着色器编译或链接失败（携带驱动的诊断信息）
    ShaderCompilation(String),

    /// 写入超出了缓冲区创建时的分配大小
    BufferOverflow { requested: usize, capacity: usize },

    /// 缓冲区的使用模式不允许该操作
    InvalidUsage(String),

    /// 在没有对应映射标志的情况下访问映射内存
    InvalidAccess(String),

    /// 帧缓冲不完整
    IncompleteFramebuffer(u32),

    /// Fence 等待失败
    SyncFailed,
}

/// 网格加载相关的错误
#[derive(Debug)]
pub enum MeshLoadError {
    /// 文件不存在
    FileNotFound(PathBuf),

    /// 解析失败
    ParseError(String),

    /// 几何数据无效
    InvalidGeometry(String),
}

/// 纹理加载相关的错误
#[derive(Debug)]
pub enum TextureError {
    /// 图像解码失败（文件不存在或格式损坏）
    Decode { path: PathBuf, reason: String },

    /// 不支持的通道数（仅支持 3 和 4）
    UnsupportedChannels { path: PathBuf, channels: u8 },
}

impl fmt::Display for MiniGlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiniGlError::Config(e) => write!(f, "Configuration error: {}", e),
            MiniGlError::Graphics(e) => write!(f, "Graphics error: {}", e),
            MiniGlError::MeshLoading(e) => write!(f, "Mesh loading error: {}", e),
            MiniGlError::Texture(e) => write!(f, "Texture error: {}", e),
            MiniGlError::Io(e) => write!(f, "IO error: {}", e),
            MiniGlError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            MiniGlError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::ShaderSource(msg) => write!(f, "Invalid shader source: {}", msg),
            GraphicsError::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            GraphicsError::BufferOverflow { requested, capacity } => write!(
                f,
                "Buffer overflow: {} bytes requested, {} bytes allocated",
                requested, capacity
            ),
            GraphicsError::InvalidUsage(msg) => write!(f, "Invalid buffer usage: {}", msg),
            GraphicsError::InvalidAccess(msg) => write!(f, "Invalid mapped access: {}", msg),
            GraphicsError::IncompleteFramebuffer(status) => {
                write!(f, "Framebuffer incomplete (status 0x{:X})", status)
            }
            GraphicsError::SyncFailed => write!(f, "Fence wait failed"),
        }
    }
}

impl fmt::Display for MeshLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshLoadError::FileNotFound(path) => write!(f, "Mesh file not found: {}", path.display()),
            MeshLoadError::ParseError(msg) => write!(f, "Failed to parse mesh: {}", msg),
            MeshLoadError::InvalidGeometry(msg) => write!(f, "Invalid geometry data: {}", msg),
        }
    }
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Decode { path, reason } => {
                write!(f, "Texture at path '{}' could not be decoded: {}", path.display(), reason)
            }
            TextureError::UnsupportedChannels { path, channels } => write!(
                f,
                "Texture at path '{}': {} channels not supported (expected 3 or 4)",
                path.display(),
                channels
            ),
        }
    }
}

impl std::error::Error for MiniGlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MiniGlError::Io(e) => Some(e),
            MiniGlError::Config(e) => Some(e),
            MiniGlError::Graphics(e) => Some(e),
            MiniGlError::MeshLoading(e) => Some(e),
            MiniGlError::Texture(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for MeshLoadError {}
impl std::error::Error for TextureError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for MiniGlError {
    fn from(err: std::io::Error) -> Self {
        MiniGlError::Io(err)
    }
}

impl From<ConfigError> for MiniGlError {
    fn from(err: ConfigError) -> Self {
        MiniGlError::Config(err)
    }
}

impl From<GraphicsError> for MiniGlError {
    fn from(err: GraphicsError) -> Self {
        MiniGlError::Graphics(err)
    }
}

impl From<MeshLoadError> for MiniGlError {
    fn from(err: MeshLoadError) -> Self {
        MiniGlError::MeshLoading(err)
    }
}

impl From<TextureError> for MiniGlError {
    fn from(err: TextureError) -> Self {
        MiniGlError::Texture(err)
    }
}
