//! 图形设备的统一抽象接口
//!
//! 所有 GPU 包装对象（缓冲区、纹理、帧缓冲、着色器……）都只通过此 trait
//! 与底层交互。`GlDevice` 把调用转发给 OpenGL，`HeadlessDevice` 在 CPU 上
//! 模拟并记录调用，用于测试和无窗口运行。
//!
//! # 设计理念
//!
//! - **立即模式**：每个方法对应一次原生调用，不做排队或批处理
//! - **显式上下文**：设备以 `Gpu`（`Rc<dyn GraphicsDevice>`）的形式传给每个构造函数
//! - **单线程**：`Rc` 使所有包装对象为 `!Send`，在编译期固定在渲染线程上

use std::rc::Rc;

use crate::core::error::Result;
use crate::math::Color;

use super::types::*;

/// 进程生命周期内共享的设备上下文
pub type Gpu = Rc<dyn GraphicsDevice>;

/// 图形设备接口
///
/// 方法都接受 `&self`：原生 API 本身就是一个全局状态机，
/// 设备内部需要的可变状态自行用 `RefCell` 管理。
pub trait GraphicsDevice {
    /// 设备名称，用于日志输出
    fn name(&self) -> &str;

    /// 驱动信息
    fn info(&self) -> DeviceInfo;

    /// 计算着色器工作组上限
    fn compute_limits(&self) -> ComputeLimits;

    // ---- 缓冲区 ----

    /// 创建缓冲区并上传初始数据；`size` 为分配大小（`data` 可以更短）
    fn create_buffer(
        &self,
        target: BufferTarget,
        size: usize,
        data: &[u8],
        usage: DataUsage,
    ) -> Result<BufferHandle>;

    /// 原地覆盖缓冲区内容，不重新分配
    fn buffer_sub_data(&self, buffer: BufferHandle, target: BufferTarget, offset: usize, data: &[u8]);

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);

    /// 绑定到索引绑定点（uniform / shader storage）
    fn bind_buffer_base(&self, target: BufferTarget, index: u32, buffer: BufferHandle);

    /// 写入持久映射的内存
    fn write_mapped(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()>;

    /// 读取持久映射的内存
    fn read_mapped(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<()>;

    /// 将映射内存的一段修改发布给 GPU
    fn flush_mapped(&self, buffer: BufferHandle, target: BufferTarget, offset: usize, len: usize);

    fn delete_buffer(&self, buffer: BufferHandle);

    // ---- 顶点数组 ----

    fn create_vertex_array(&self) -> Result<VertexArrayHandle>;

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>);

    /// 在当前绑定的顶点数组上，为当前绑定的顶点缓冲区声明一个属性
    fn vertex_attrib_pointer(&self, attrib: AttribPointer);

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32);

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);

    // ---- 纹理 ----

    /// 分配单层 mip 的 2D 纹理存储（线性过滤）
    fn create_texture(&self, width: u32, height: u32, format: TextureFormat) -> Result<TextureHandle>;

    fn texture_sub_image(
        &self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    );

    fn bind_texture_unit(&self, unit: u32, texture: TextureHandle);

    fn bind_image_texture(&self, unit: u32, texture: TextureHandle, access: ImageAccess, format: TextureFormat);

    fn delete_texture(&self, texture: TextureHandle);

    // ---- 帧缓冲 ----

    fn create_framebuffer(&self) -> Result<FramebufferHandle>;

    fn framebuffer_texture(&self, framebuffer: FramebufferHandle, attachment: Attachment, texture: TextureHandle);

    /// 设置绘制目标为颜色附件 `0..count`；`count == 0` 表示不写颜色
    fn framebuffer_draw_buffers(&self, framebuffer: FramebufferHandle, count: u32);

    fn check_framebuffer_status(&self, framebuffer: FramebufferHandle) -> u32;

    /// `None` 表示窗口的默认帧缓冲
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>);

    fn blit_framebuffer(
        &self,
        src: Option<FramebufferHandle>,
        dst: Option<FramebufferHandle>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: BufferBit,
        filter: BlitFilter,
    );

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);

    // ---- 着色器 ----

    /// 编译各阶段并链接为程序；失败时不留下任何原生对象
    fn create_program(&self, stages: &[(ShaderStage, String)]) -> Result<ProgramHandle>;

    fn use_program(&self, program: Option<ProgramHandle>);

    /// 按名字查找 uniform 并上传；名字不存在时静默忽略
    fn set_uniform(&self, program: ProgramHandle, name: &str, value: UniformValue);

    fn delete_program(&self, program: ProgramHandle);

    // ---- 命令 ----

    fn clear(&self, mask: BufferBit);

    fn clear_color(&self, color: Color);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    fn set_capability(&self, capability: Capability, enabled: bool);

    fn polygon_mode(&self, mode: PolygonMode);

    /// 以 `u32` 索引绘制当前顶点数组；`instances == 1` 时为普通绘制
    fn draw_elements(&self, primitive: Primitive, count: u32, instances: u32);

    /// 从当前绑定的间接缓冲区读取 `draw_count` 条绘制命令
    fn draw_elements_indirect(&self, primitive: Primitive, draw_count: u32, stride: u32);

    fn dispatch_compute(&self, x: u32, y: u32, z: u32);

    fn memory_barrier(&self, barrier: Barrier);

    // ---- 同步 ----

    fn fence_sync(&self) -> Result<SyncHandle>;

    /// 非阻塞地查询同步对象；`flush` 为真时先刷新命令队列
    fn client_wait_sync(&self, sync: SyncHandle, flush: bool) -> SyncStatus;

    fn delete_sync(&self, sync: SyncHandle);
}
