//! 渲染器模块
//!
//! 本模块把 `gfx` 设备层的原生调用包装成一一对应的 GPU 对象：
//!
//! - `VertexBuffer` / `IndexBuffer` / `VertexArray`：顶点输入
//! - `UniformBuffer` / `ShaderStorageBuffer` / `IndirectBuffer`：按元素寻址的缓冲区
//! - `Texture` / `FrameBuffer`：图像与离屏渲染目标
//! - `ShaderProgram`：着色器阶段拆分、编译与 uniform 上传
//! - `RenderCommand` / `Fence`：立即模式命令与 CPU/GPU 同步
//!
//! 每个对象在构造时创建原生句柄，在 `Drop` 时删除，且只删除一次。
//! 所有对象都持有同一个 `Gpu`，因此只能在渲染线程上使用。

pub mod buffer;
pub mod command;
pub mod framebuffer;
pub mod layout;
pub mod mapped;
pub mod shader;
pub mod texture;
pub mod vertex_array;

pub use buffer::{IndexBuffer, VertexBuffer};
pub use command::{Fence, RenderCommand};
pub use framebuffer::FrameBuffer;
pub use layout::{BufferElement, BufferLayout, DataType};
pub use mapped::{DrawElementsIndirectCommand, IndirectBuffer, ShaderStorageBuffer, UniformBuffer};
pub use shader::{split_stages, ShaderProgram};
pub use texture::Texture;
pub use vertex_array::VertexArray;
