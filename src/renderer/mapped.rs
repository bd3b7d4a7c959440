//! 按元素寻址的缓冲区：uniform、shader storage、间接绘制
//!
//! 这些缓冲区存放一组同类型的 `Pod` 元素。以 `Map*` 模式创建时，
//! CPU 可以直接按索引读写持久映射的内存：
//!
//! ```no_run
//! # use minigl::renderer::ShaderStorageBuffer;
//! # use minigl::gfx::{DataUsage, Gpu};
//! # fn demo(gpu: &Gpu) -> minigl::core::Result<()> {
//! let ssbo = ShaderStorageBuffer::new(gpu, &[0.0f32; 4], 0, DataUsage::MapWrite)?;
//! ssbo.write(2, &1.5)?;
//! ssbo.flush()?; // MapWrite 需要显式发布
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::{BufferHandle, BufferTarget, DataUsage, Gpu};

use super::buffer::RawBuffer;

/// 元素类型为 `T` 的缓冲区
struct TypedBuffer<T: Pod> {
    raw: RawBuffer,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> TypedBuffer<T> {
    fn new(gpu: &Gpu, target: BufferTarget, data: &[T], usage: DataUsage) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let raw = RawBuffer::new(gpu, target, bytes.len(), bytes, usage)?;
        Ok(Self { raw, len: data.len(), _marker: PhantomData })
    }

    /// 元素索引对应的字节偏移；溢出视为越界
    fn offset(&self, index: usize) -> Result<usize> {
        index.checked_mul(size_of::<T>()).ok_or_else(|| {
            GraphicsError::BufferOverflow { requested: usize::MAX, capacity: self.raw.size() }.into()
        })
    }

    fn write(&self, index: usize, value: &T) -> Result<()> {
        self.raw.write(self.offset(index)?, bytemuck::bytes_of(value))
    }

    fn write_slice(&self, start: usize, values: &[T]) -> Result<()> {
        self.raw.write(self.offset(start)?, bytemuck::cast_slice(values))
    }

    fn read(&self, index: usize) -> Result<T> {
        let mut bytes = vec![0u8; size_of::<T>()];
        self.raw.read(self.offset(index)?, &mut bytes)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    fn update(&self, start: usize, values: &[T]) -> Result<()> {
        self.raw.update(self.offset(start)?, bytemuck::cast_slice(values))
    }

    fn flush(&self) -> Result<()> {
        self.raw.flush(0, self.raw.size())
    }
}

macro_rules! typed_accessors {
    ($t:ty) => {
        /// 写入第 `index` 个元素（需要 `MapWrite` / `MapReadWrite`）
        pub fn write(&self, index: usize, value: &$t) -> Result<()> {
            self.buffer.write(index, value)
        }

        /// 从第 `start` 个元素开始连续写入
        pub fn write_slice(&self, start: usize, values: &[$t]) -> Result<()> {
            self.buffer.write_slice(start, values)
        }

        /// 读取第 `index` 个元素（需要 `MapRead` / `MapReadWrite`）
        pub fn read(&self, index: usize) -> Result<$t> {
            self.buffer.read(index)
        }

        /// 非映射缓冲区的原地更新（`Dynamic` / `Stream`），映射缓冲区则写入并 flush
        pub fn update(&self, start: usize, values: &[$t]) -> Result<()> {
            self.buffer.update(start, values)
        }

        /// 将映射内存中的修改发布给 GPU
        pub fn flush(&self) -> Result<()> {
            self.buffer.flush()
        }

        /// 元素个数
        pub fn len(&self) -> usize {
            self.buffer.len
        }

        pub fn is_empty(&self) -> bool {
            self.buffer.len == 0
        }

        pub fn usage(&self) -> DataUsage {
            self.buffer.raw.usage()
        }

        pub fn handle(&self) -> BufferHandle {
            self.buffer.raw.handle()
        }
    };
}

/// Uniform 缓冲区（UBO），绑定到固定的 uniform 绑定点
pub struct UniformBuffer<T: Pod> {
    buffer: TypedBuffer<T>,
    binding: u32,
}

impl<T: Pod> UniformBuffer<T> {
    /// 创建并绑定到 `binding`
    pub fn new(gpu: &Gpu, data: &[T], binding: u32, usage: DataUsage) -> Result<Self> {
        let buffer = TypedBuffer::new(gpu, BufferTarget::Uniform, data, usage)?;
        buffer.raw.bind_base(binding);
        Ok(Self { buffer, binding })
    }

    /// 重新绑定到创建时的绑定点
    pub fn bind(&self) {
        self.buffer.raw.bind_base(self.binding);
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    typed_accessors!(T);
}

/// 着色器存储缓冲区（SSBO），绑定到固定的 storage 绑定点
pub struct ShaderStorageBuffer<T: Pod> {
    buffer: TypedBuffer<T>,
    binding: u32,
}

impl<T: Pod> ShaderStorageBuffer<T> {
    /// 创建并绑定到 `binding`
    pub fn new(gpu: &Gpu, data: &[T], binding: u32, usage: DataUsage) -> Result<Self> {
        let buffer = TypedBuffer::new(gpu, BufferTarget::ShaderStorage, data, usage)?;
        buffer.raw.bind_base(binding);
        Ok(Self { buffer, binding })
    }

    pub fn bind(&self) {
        self.buffer.raw.bind_base(self.binding);
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    typed_accessors!(T);
}

/// 一条 `glMultiDrawElementsIndirect` 命令
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawElementsIndirectCommand {
    /// 索引数量
    pub count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub base_instance: u32,
}

/// 间接绘制命令缓冲区
pub struct IndirectBuffer {
    buffer: TypedBuffer<DrawElementsIndirectCommand>,
}

impl IndirectBuffer {
    pub fn new(gpu: &Gpu, commands: &[DrawElementsIndirectCommand], usage: DataUsage) -> Result<Self> {
        let buffer = TypedBuffer::new(gpu, BufferTarget::DrawIndirect, commands, usage)?;
        Ok(Self { buffer })
    }

    /// 绑定为间接绘制的参数来源
    pub fn bind(&self) {
        self.buffer.raw.bind();
    }

    pub fn unbind(&self) {
        self.buffer.raw.unbind();
    }

    /// 相邻两条命令之间的字节距离
    pub fn stride(&self) -> u32 {
        size_of::<DrawElementsIndirectCommand>() as u32
    }

    typed_accessors!(DrawElementsIndirectCommand);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GraphicsError, MiniGlError};
    use crate::gfx::{DeviceCall, HeadlessDevice};
    use std::rc::Rc;

    fn setup() -> (Rc<HeadlessDevice>, Gpu) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        (device, gpu)
    }

    #[test]
    fn test_mapped_write_read_flush() {
        let (device, gpu) = setup();
        let ssbo = ShaderStorageBuffer::new(&gpu, &[0u32; 4], 3, DataUsage::MapReadWrite).unwrap();

        ssbo.write(2, &42).unwrap();
        assert_eq!(ssbo.read(2).unwrap(), 42);
        assert_eq!(ssbo.read(0).unwrap(), 0);

        device.take_calls();
        ssbo.flush().unwrap();
        assert_eq!(
            device.take_calls(),
            vec![DeviceCall::FlushMapped { id: ssbo.handle().raw(), offset: 0, len: 16 }]
        );
    }

    #[test]
    fn test_binding_point_on_creation() {
        let (device, gpu) = setup();
        let ubo = UniformBuffer::new(&gpu, &[[0.0f32; 4]], 1, DataUsage::Dynamic).unwrap();

        assert!(device.calls().contains(&DeviceCall::BindBufferBase {
            target: BufferTarget::Uniform,
            index: 1,
            id: ubo.handle().raw(),
        }));
    }

    #[test]
    fn test_access_without_map_flag() {
        let (_device, gpu) = setup();

        let write_only = ShaderStorageBuffer::new(&gpu, &[0u32; 2], 0, DataUsage::MapWrite).unwrap();
        assert!(matches!(
            write_only.read(0),
            Err(MiniGlError::Graphics(GraphicsError::InvalidAccess(_)))
        ));

        let read_only = ShaderStorageBuffer::new(&gpu, &[0u32; 2], 0, DataUsage::MapRead).unwrap();
        assert!(matches!(
            read_only.write(0, &1),
            Err(MiniGlError::Graphics(GraphicsError::InvalidAccess(_)))
        ));

        let unmapped = UniformBuffer::new(&gpu, &[0u32; 2], 0, DataUsage::Dynamic).unwrap();
        assert!(matches!(
            unmapped.write(0, &1),
            Err(MiniGlError::Graphics(GraphicsError::InvalidAccess(_)))
        ));
        assert!(unmapped.update(0, &[5, 6]).is_ok());
    }

    #[test]
    fn test_index_out_of_range() {
        let (_device, gpu) = setup();
        let ssbo = ShaderStorageBuffer::new(&gpu, &[0u32; 2], 0, DataUsage::MapReadWrite).unwrap();

        assert!(matches!(
            ssbo.write(2, &1),
            Err(MiniGlError::Graphics(GraphicsError::BufferOverflow { requested: 12, capacity: 8 }))
        ));
    }

    #[test]
    fn test_huge_index_is_rejected_without_wrapping() {
        let (device, gpu) = setup();
        let ssbo = ShaderStorageBuffer::new(&gpu, &[0u32; 4], 0, DataUsage::MapReadWrite).unwrap();
        device.take_calls();

        assert!(matches!(
            ssbo.write(usize::MAX / 2, &7),
            Err(MiniGlError::Graphics(GraphicsError::BufferOverflow { capacity: 16, .. }))
        ));
        assert!(matches!(
            ssbo.read(usize::MAX / 4 + 1),
            Err(MiniGlError::Graphics(GraphicsError::BufferOverflow { capacity: 16, .. }))
        ));
        // 偏移刚好不溢出、但加上长度后溢出的情况
        assert!(matches!(
            ssbo.write_slice(usize::MAX / 4, &[1, 2]),
            Err(MiniGlError::Graphics(GraphicsError::BufferOverflow { capacity: 16, .. }))
        ));
        assert!(device.calls().is_empty());
        assert_eq!(ssbo.read(0).unwrap(), 0);
    }

    #[test]
    fn test_indirect_commands() {
        let (device, gpu) = setup();
        let command = DrawElementsIndirectCommand { count: 36, instance_count: 10, ..Default::default() };
        let indirect = IndirectBuffer::new(&gpu, &[command; 2], DataUsage::MapReadWrite).unwrap();

        assert_eq!(indirect.len(), 2);
        assert_eq!(indirect.stride(), 20);

        let mut second = indirect.read(1).unwrap();
        second.instance_count = 3;
        indirect.write(1, &second).unwrap();
        assert_eq!(indirect.read(1).unwrap().instance_count, 3);

        device.take_calls();
        indirect.bind();
        assert_eq!(
            device.take_calls(),
            vec![DeviceCall::BindBuffer { target: BufferTarget::DrawIndirect, id: Some(indirect.handle().raw()) }]
        );
    }
}
