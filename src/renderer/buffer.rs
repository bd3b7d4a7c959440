//! GPU 缓冲区
//!
//! 所有缓冲区类型共享同一个 `RawBuffer`：它持有原生句柄、绑定目标、分配大小和
//! 使用模式，并负责检查每一次写入/读取是否合法：
//!
//! - 写入超出分配大小 → `GraphicsError::BufferOverflow`
//! - 以 `Static` 创建的缓冲区被更新 → `GraphicsError::InvalidUsage`
//! - 访问映射内存但缺少对应的映射标志 → `GraphicsError::InvalidAccess`
//!
//! 原生句柄在 `Drop` 中删除，且只删除一次。

use bytemuck::Pod;

use crate::core::error::{GraphicsError, Result};
use crate::engine_trace;
use crate::gfx::{BufferHandle, BufferTarget, DataUsage, Gpu};

use super::layout::BufferLayout;

/// 单个原生缓冲区
pub(crate) struct RawBuffer {
    gpu: Gpu,
    handle: BufferHandle,
    target: BufferTarget,
    size: usize,
    usage: DataUsage,
}

impl RawBuffer {
    /// 分配 `size` 字节并上传 `data`（不足部分补零）
    pub(crate) fn new(
        gpu: &Gpu,
        target: BufferTarget,
        size: usize,
        data: &[u8],
        usage: DataUsage,
    ) -> Result<Self> {
        if data.len() > size {
            return Err(GraphicsError::BufferOverflow { requested: data.len(), capacity: size }.into());
        }

        let handle = gpu.create_buffer(target, size, data, usage)?;
        engine_trace!(id = handle.raw(), ?target, size, ?usage, "buffer created");

        Ok(Self { gpu: gpu.clone(), handle, target, size, usage })
    }

    pub(crate) fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn usage(&self) -> DataUsage {
        self.usage
    }

    pub(crate) fn bind(&self) {
        self.gpu.bind_buffer(self.target, Some(self.handle));
    }

    pub(crate) fn unbind(&self) {
        self.gpu.bind_buffer(self.target, None);
    }

    pub(crate) fn bind_base(&self, index: u32) {
        self.gpu.bind_buffer_base(self.target, index, self.handle);
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset.checked_add(len).unwrap_or(usize::MAX);
        if end > self.size {
            return Err(GraphicsError::BufferOverflow { requested: end, capacity: self.size }.into());
        }
        Ok(())
    }

    /// 原地覆盖 `[offset, offset + data.len())`，不重新分配
    pub(crate) fn update(&self, offset: usize, data: &[u8]) -> Result<()> {
        match self.usage {
            DataUsage::Static => Err(GraphicsError::InvalidUsage(format!(
                "buffer {} was created with static usage and cannot be updated",
                self.handle.raw()
            ))
            .into()),
            DataUsage::Dynamic | DataUsage::Stream => {
                self.check_range(offset, data.len())?;
                self.gpu.buffer_sub_data(self.handle, self.target, offset, data);
                Ok(())
            }
            // 不可变存储只能经由映射内存更新
            _ => {
                self.write(offset, data)?;
                self.flush(offset, data.len())
            }
        }
    }

    /// 写入映射内存
    pub(crate) fn write(&self, offset: usize, data: &[u8]) -> Result<()> {
        if !self.usage.can_write() {
            return Err(GraphicsError::InvalidAccess(format!(
                "buffer {} is not mapped for writing ({:?})",
                self.handle.raw(),
                self.usage
            ))
            .into());
        }
        self.check_range(offset, data.len())?;
        self.gpu.write_mapped(self.handle, offset, data)
    }

    /// 读取映射内存
    pub(crate) fn read(&self, offset: usize, out: &mut [u8]) -> Result<()> {
        if !self.usage.can_read() {
            return Err(GraphicsError::InvalidAccess(format!(
                "buffer {} is not mapped for reading ({:?})",
                self.handle.raw(),
                self.usage
            ))
            .into());
        }
        self.check_range(offset, out.len())?;
        self.gpu.read_mapped(self.handle, offset, out)
    }

    /// 将映射内存的一段修改发布给 GPU
    pub(crate) fn flush(&self, offset: usize, len: usize) -> Result<()> {
        if !self.usage.can_write() {
            return Err(GraphicsError::InvalidAccess(format!(
                "buffer {} has no writable mapping to flush",
                self.handle.raw()
            ))
            .into());
        }
        self.check_range(offset, len)?;
        self.gpu.flush_mapped(self.handle, self.target, offset, len);
        Ok(())
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        self.gpu.delete_buffer(self.handle);
    }
}

/// 顶点缓冲区（VBO）
///
/// 持有一块顶点数据和描述它的唯一布局。使用模式在创建时确定。
pub struct VertexBuffer {
    raw: RawBuffer,
    layout: BufferLayout,
}

impl VertexBuffer {
    /// 从任意 `Pod` 顶点切片创建，分配大小等于数据大小
    pub fn new<T: Pod>(gpu: &Gpu, vertices: &[T], layout: BufferLayout, usage: DataUsage) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let raw = RawBuffer::new(gpu, BufferTarget::Vertex, bytes.len(), bytes, usage)?;
        Ok(Self { raw, layout })
    }

    /// 分配 `size` 字节的空缓冲区，稍后用 `update_vertices` 填充
    pub fn with_capacity(gpu: &Gpu, size: usize, layout: BufferLayout, usage: DataUsage) -> Result<Self> {
        let raw = RawBuffer::new(gpu, BufferTarget::Vertex, size, &[], usage)?;
        Ok(Self { raw, layout })
    }

    pub fn bind(&self) {
        self.raw.bind();
    }

    pub fn unbind(&self) {
        self.raw.unbind();
    }

    /// 从头覆盖缓冲区内容
    ///
    /// 数据不能超过创建时的分配大小；`Static` 缓冲区不可更新。
    pub fn update_vertices<T: Pod>(&self, vertices: &[T]) -> Result<()> {
        self.raw.update(0, bytemuck::cast_slice(vertices))
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: BufferLayout) {
        self.layout = layout;
    }

    /// 分配的字节数
    pub fn size(&self) -> usize {
        self.raw.size()
    }

    pub fn usage(&self) -> DataUsage {
        self.raw.usage()
    }

    pub fn handle(&self) -> BufferHandle {
        self.raw.handle()
    }
}

/// 索引缓冲区（IBO），`u32` 索引，数量不可变
pub struct IndexBuffer {
    raw: RawBuffer,
    count: u32,
}

impl IndexBuffer {
    pub fn new(gpu: &Gpu, indices: &[u32]) -> Result<Self> {
        Self::with_usage(gpu, indices, DataUsage::Static)
    }

    pub fn with_usage(gpu: &Gpu, indices: &[u32], usage: DataUsage) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let raw = RawBuffer::new(gpu, BufferTarget::Index, bytes.len(), bytes, usage)?;
        Ok(Self { raw, count: indices.len() as u32 })
    }

    pub fn bind(&self) {
        self.raw.bind();
    }

    pub fn unbind(&self) {
        self.raw.unbind();
    }

    /// 覆盖索引内容（数量必须与创建时一致或更少）
    pub fn update_indices(&self, indices: &[u32]) -> Result<()> {
        self.raw.update(0, bytemuck::cast_slice(indices))
    }

    /// 索引数量
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn handle(&self) -> BufferHandle {
        self.raw.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiniGlError;
    use crate::gfx::{DeviceCall, HeadlessDevice};
    use crate::renderer::layout::{BufferElement, DataType};
    use std::rc::Rc;

    fn setup() -> (Rc<HeadlessDevice>, Gpu) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        (device, gpu)
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn pos_layout() -> BufferLayout {
        BufferLayout::new([BufferElement::new(DataType::Float3, "a_pos")])
    }

    #[test]
    fn test_update_in_place() {
        let (device, gpu) = setup();
        let vb = VertexBuffer::new(&gpu, &[0.0f32; 6], pos_layout(), DataUsage::Dynamic).unwrap();

        vb.update_vertices(&[1.0f32, 2.0, 3.0]).unwrap();

        let bytes = device.buffer_data(vb.handle()).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(floats(&bytes), vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_update_overflow_is_rejected() {
        let (device, gpu) = setup();
        let vb = VertexBuffer::new(&gpu, &[0.0f32; 3], pos_layout(), DataUsage::Dynamic).unwrap();
        device.take_calls();

        let err = vb.update_vertices(&[0.0f32; 4]).unwrap_err();
        assert!(matches!(
            err,
            MiniGlError::Graphics(GraphicsError::BufferOverflow { requested: 16, capacity: 12 })
        ));
        // 没有任何写入到达设备
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_static_buffer_cannot_be_updated() {
        let (_device, gpu) = setup();
        let vb = VertexBuffer::new(&gpu, &[0.0f32; 3], pos_layout(), DataUsage::Static).unwrap();

        let err = vb.update_vertices(&[1.0f32]).unwrap_err();
        assert!(matches!(err, MiniGlError::Graphics(GraphicsError::InvalidUsage(_))));
    }

    #[test]
    fn test_mapped_update_writes_then_flushes() {
        let (device, gpu) = setup();
        let vb = VertexBuffer::new(&gpu, &[0.0f32; 6], pos_layout(), DataUsage::MapWrite).unwrap();
        device.take_calls();

        vb.update_vertices(&[1.0f32, 2.0, 3.0]).unwrap();

        assert_eq!(floats(&device.buffer_data(vb.handle()).unwrap()), vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        // 映射内存直接写入，不走 buffer_sub_data
        assert_eq!(
            device.take_calls(),
            vec![DeviceCall::FlushMapped { id: vb.handle().raw(), offset: 0, len: 12 }]
        );

        let err = vb.update_vertices(&[0.0f32; 7]).unwrap_err();
        assert!(matches!(
            err,
            MiniGlError::Graphics(GraphicsError::BufferOverflow { requested: 28, capacity: 24 })
        ));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_read_only_mapping_cannot_be_updated() {
        let (device, gpu) = setup();
        let vb = VertexBuffer::new(&gpu, &[0.0f32; 3], pos_layout(), DataUsage::MapRead).unwrap();
        device.take_calls();

        let err = vb.update_vertices(&[1.0f32]).unwrap_err();
        assert!(matches!(err, MiniGlError::Graphics(GraphicsError::InvalidAccess(_))));
        assert!(device.calls().is_empty());
        assert_eq!(floats(&device.buffer_data(vb.handle()).unwrap()), vec![0.0; 3]);
    }

    #[test]
    fn test_with_capacity_then_fill() {
        let (device, gpu) = setup();
        let vb = VertexBuffer::with_capacity(&gpu, 64, pos_layout(), DataUsage::Stream).unwrap();
        assert_eq!(vb.size(), 64);

        vb.update_vertices(&[7u32; 16]).unwrap();
        let bytes = device.buffer_data(vb.handle()).unwrap();
        assert!(bytes.chunks_exact(4).all(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]) == 7));
    }

    #[test]
    fn test_index_count_and_drop() {
        let (device, gpu) = setup();
        {
            let ib = IndexBuffer::new(&gpu, &[0, 1, 2, 2, 3, 0]).unwrap();
            assert_eq!(ib.count(), 6);
            assert_eq!(device.live_objects(), 1);
        }
        assert_eq!(device.live_objects(), 0);

        let deletes = device
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::DeleteBuffer(_)))
            .count();
        assert_eq!(deletes, 1);
    }

    #[test]
    fn test_bind_targets() {
        let (device, gpu) = setup();
        let ib = IndexBuffer::new(&gpu, &[0, 1, 2]).unwrap();
        device.take_calls();

        ib.bind();
        ib.unbind();
        assert_eq!(
            device.take_calls(),
            vec![
                DeviceCall::BindBuffer { target: BufferTarget::Index, id: Some(ib.handle().raw()) },
                DeviceCall::BindBuffer { target: BufferTarget::Index, id: None },
            ]
        );
    }
}
