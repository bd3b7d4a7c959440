//! 渲染命令与 CPU/GPU 同步
//!
//! `RenderCommand` 是一组无状态的立即模式调用：每个函数直接对当前绑定的
//! 着色器、帧缓冲和顶点数组发出一次原生调用，不做任何排队或批处理。

use crate::core::error::{GraphicsError, Result};
use crate::engine_trace;
use crate::gfx::{Barrier, BufferBit, Capability, Gpu, PolygonMode, Primitive, SyncHandle, SyncStatus};
use crate::math::Color;

use super::mapped::IndirectBuffer;
use super::vertex_array::VertexArray;

pub struct RenderCommand;

impl RenderCommand {
    /// 清除指定的缓冲区
    pub fn clear(gpu: &Gpu, mask: BufferBit) {
        gpu.clear(mask);
    }

    /// 清除颜色和深度
    pub fn clear_all(gpu: &Gpu) {
        gpu.clear(BufferBit::COLOR | BufferBit::DEPTH);
    }

    pub fn set_clear_color(gpu: &Gpu, color: Color) {
        gpu.clear_color(color);
    }

    /// 设置视口，`(x, y)` 为左下角
    pub fn set_viewport(gpu: &Gpu, x: u32, y: u32, width: u32, height: u32) {
        gpu.viewport(x as i32, y as i32, width as i32, height as i32);
    }

    pub fn set_depth_test(gpu: &Gpu, enabled: bool) {
        gpu.set_capability(Capability::DepthTest, enabled);
    }

    pub fn set_depth_clamp(gpu: &Gpu, enabled: bool) {
        gpu.set_capability(Capability::DepthClamp, enabled);
    }

    pub fn set_face_culling(gpu: &Gpu, enabled: bool) {
        gpu.set_capability(Capability::CullFace, enabled);
    }

    /// 线框模式
    pub fn wireframe(gpu: &Gpu, enabled: bool) {
        gpu.polygon_mode(if enabled { PolygonMode::Line } else { PolygonMode::Fill });
    }

    /// 按顶点数组的全部索引绘制（顶点数组需已绑定）
    pub fn draw_indexed(gpu: &Gpu, vertex_array: &VertexArray, primitive: Primitive) {
        gpu.draw_elements(primitive, vertex_array.index_count(), 1);
    }

    /// 实例化绘制 `instances` 份
    pub fn draw_instanced(gpu: &Gpu, vertex_array: &VertexArray, instances: u32, primitive: Primitive) {
        gpu.draw_elements(primitive, vertex_array.index_count(), instances);
    }

    /// 按间接缓冲区中的命令绘制（间接缓冲区和顶点数组需已绑定）
    pub fn draw_indirect(gpu: &Gpu, commands: &IndirectBuffer, primitive: Primitive) {
        gpu.draw_elements_indirect(primitive, commands.len() as u32, commands.stride());
    }

    /// 启动 `x * y * z` 个计算工作组
    pub fn dispatch_compute(gpu: &Gpu, x: u32, y: u32, z: u32) {
        gpu.dispatch_compute(x, y, z);
    }

    /// 内存屏障；`Barrier::all()` 等价于 `GL_ALL_BARRIER_BITS`
    pub fn memory_barrier(gpu: &Gpu, barrier: Barrier) {
        gpu.memory_barrier(barrier);
    }
}

/// GPU 完成点
///
/// `reset` 在命令流中插入一个新的同步对象，`wait` 阻塞到它被 signal。
pub struct Fence {
    gpu: Gpu,
    sync: Option<SyncHandle>,
}

impl Fence {
    pub fn new(gpu: &Gpu) -> Self {
        Self { gpu: gpu.clone(), sync: None }
    }

    /// 在当前位置插入新的完成点，删除之前的
    pub fn reset(&mut self) -> Result<()> {
        if let Some(old) = self.sync.take() {
            self.gpu.delete_sync(old);
        }
        self.sync = Some(self.gpu.fence_sync()?);
        Ok(())
    }

    /// 等待完成点被 signal；从未 `reset` 过时立即返回
    pub fn wait(&self) -> Result<()> {
        let Some(sync) = self.sync else {
            return Ok(());
        };

        // 第一次查询时 flush，确保同步对象已提交
        let mut flush = true;
        let mut polls = 0u32;
        loop {
            match self.gpu.client_wait_sync(sync, flush) {
                SyncStatus::AlreadySignaled | SyncStatus::ConditionSatisfied => break,
                SyncStatus::TimeoutExpired => {
                    flush = false;
                    polls += 1;
                }
                SyncStatus::WaitFailed => return Err(GraphicsError::SyncFailed.into()),
            }
        }

        engine_trace!(sync = sync.raw(), polls, "fence signaled");
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.sync.is_some()
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        if let Some(sync) = self.sync.take() {
            self.gpu.delete_sync(sync);
        }
    }
}
