//! 设备层共享的句柄与枚举类型
//!
//! 这些类型只描述“做什么”，不携带任何原生 API 的常量；
//! 具体设备负责把它们翻译为自己的枚举值。

use bitflags::bitflags;

use crate::math::{Color, Matrix3, Matrix4, Vector2, Vector3, Vector4};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// 原生对象 ID
            pub fn raw(&self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// 缓冲区对象句柄
    BufferHandle
);
handle!(
    /// 顶点数组对象句柄
    VertexArrayHandle
);
handle!(
    /// 纹理对象句柄
    TextureHandle
);
handle!(
    /// 帧缓冲对象句柄
    FramebufferHandle
);
handle!(
    /// 着色器程序句柄
    ProgramHandle
);
handle!(
    /// GPU 同步对象句柄
    SyncHandle
);

/// 缓冲区绑定目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
    ShaderStorage,
    DrawIndirect,
}

/// 缓冲区使用模式，创建时确定，之后不可更改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataUsage {
    /// 写入一次，多次绘制
    #[default]
    Static,
    /// 经常更新
    Dynamic,
    /// 每帧更新
    Stream,
    /// 持久映射，CPU 只读
    MapRead,
    /// 持久映射，CPU 只写（需要显式 flush）
    MapWrite,
    /// 持久映射，CPU 读写
    MapReadWrite,
}

impl DataUsage {
    /// 是否为持久映射的缓冲区
    pub fn is_mapped(&self) -> bool {
        matches!(self, DataUsage::MapRead | DataUsage::MapWrite | DataUsage::MapReadWrite)
    }

    pub fn can_read(&self) -> bool {
        matches!(self, DataUsage::MapRead | DataUsage::MapReadWrite)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, DataUsage::MapWrite | DataUsage::MapReadWrite)
    }
}

/// 纹理存储格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
    Rgba32F,
    Depth,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth)
    }
}

/// 像素上传格式（每像素 8 位无符号通道）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// 纹理作为着色器图像绑定时的访问模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// 从 `#type` 标记名解析（`pixel` 是 `fragment` 的别名）
    pub fn from_marker(name: &str) -> Option<Self> {
        match name {
            "vertex" => Some(ShaderStage::Vertex),
            "fragment" | "pixel" => Some(ShaderStage::Fragment),
            "geometry" => Some(ShaderStage::Geometry),
            "compute" => Some(ShaderStage::Compute),
            _ => None,
        }
    }

    /// `#ifdef` 风格源码使用的宏名
    pub fn define(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Geometry => "GEOMETRY",
            ShaderStage::Fragment => "FRAGMENT",
            ShaderStage::Compute => "COMPUTE",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

/// 可上传的 uniform 值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
    Vec2(Vector2),
    Vec3(Vector3),
    Vec4(Vector4),
    Mat3(Matrix3),
    Mat4(Matrix4),
}

macro_rules! uniform_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(v: $ty) -> Self {
                    UniformValue::$variant(v)
                }
            }
        )*
    };
}

uniform_from!(
    bool => Bool,
    i32 => Int,
    u32 => Uint,
    f32 => Float,
    Vector2 => Vec2,
    Vector3 => Vec3,
    Vector4 => Vec4,
    Matrix3 => Mat3,
    Matrix4 => Mat4,
);

impl From<Color> for UniformValue {
    fn from(c: Color) -> Self {
        UniformValue::Vec4(c.to_vec4())
    }
}

impl From<&Matrix4> for UniformValue {
    fn from(m: &Matrix4) -> Self {
        UniformValue::Mat4(*m)
    }
}

impl From<&Vector3> for UniformValue {
    fn from(v: &Vector3) -> Self {
        UniformValue::Vec3(*v)
    }
}

/// 图元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    Points,
    Lines,
    LineStrip,
}

/// 可开关的固定管线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    DepthTest,
    DepthClamp,
    CullFace,
}

/// 多边形光栅化模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
}

bitflags! {
    /// 清屏 / blit 的缓冲区掩码
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferBit: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// 内存屏障类型
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Barrier: u32 {
        const VERTEX_ATTRIB = 1 << 0;
        const ELEMENT_ARRAY = 1 << 1;
        const UNIFORM = 1 << 2;
        const TEXTURE_FETCH = 1 << 3;
        const SHADER_IMAGE_ACCESS = 1 << 4;
        const COMMAND = 1 << 5;
        const TEXTURE_UPDATE = 1 << 6;
        const BUFFER_UPDATE = 1 << 7;
        const FRAMEBUFFER = 1 << 8;
        const SHADER_STORAGE = 1 << 9;
        const CLIENT_MAPPED_BUFFER = 1 << 10;
    }
}

/// 帧缓冲附件点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color(u32),
    Depth,
}

/// 像素矩形：`(x0, y0)` 到 `(x1, y1)`，右上角不包含
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// 以原点为左下角、给定宽高的矩形
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }
}

/// blit 缩放时的采样方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitFilter {
    Nearest,
    Linear,
}

/// 单个顶点属性的指针描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribPointer {
    pub location: u32,
    /// 分量数（1-4）
    pub components: i32,
    /// 整型属性走整型通道，不做浮点转换
    pub integer: bool,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

/// `client_wait_sync` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    AlreadySignaled,
    ConditionSatisfied,
    TimeoutExpired,
    WaitFailed,
}

/// 帧缓冲完整状态（与 GL 的 `GL_FRAMEBUFFER_COMPLETE` 数值一致）
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;
/// 帧缓冲没有任何附件
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;

/// 驱动信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
}

/// 计算着色器工作组上限
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeLimits {
    pub work_group_count: [i32; 3],
    pub work_group_size: [i32; 3],
    pub work_group_invocations: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_markers() {
        assert_eq!(ShaderStage::from_marker("pixel"), Some(ShaderStage::Fragment));
        assert_eq!(ShaderStage::from_marker("compute"), Some(ShaderStage::Compute));
        assert_eq!(ShaderStage::from_marker("tessellation"), None);
    }

    #[test]
    fn test_usage_flags() {
        assert!(!DataUsage::Static.is_mapped());
        assert!(DataUsage::MapWrite.can_write());
        assert!(!DataUsage::MapWrite.can_read());
        assert!(DataUsage::MapReadWrite.can_read() && DataUsage::MapReadWrite.can_write());
    }

    #[test]
    fn test_uniform_conversion() {
        assert_eq!(UniformValue::from(Color::RED), UniformValue::Vec4(Vector4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(UniformValue::from(3u32), UniformValue::Uint(3));
    }
}
