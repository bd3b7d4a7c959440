//! 顶点数组对象（VAO）
//!
//! 一个 `VertexArray` 拥有若干 `VertexBuffer` 和至多一个 `IndexBuffer`。
//! 每加入一个顶点缓冲区，就从当前已占用的属性位置之后依次分配槽位：
//! 第 k 个缓冲区的起始槽位等于前 k 个缓冲区 `attribute_count()` 之和。
//! 槽位一旦分配就不会被复用或重排。
//!
//! 修改 VAO 状态的方法返回前都会解除绑定，之后创建或绑定的缓冲区不会
//! 被记录到这个顶点数组里。

use crate::core::error::{GraphicsError, Result};
use crate::engine_trace;
use crate::gfx::{AttribPointer, Gpu, VertexArrayHandle};

use super::buffer::{IndexBuffer, VertexBuffer};

pub struct VertexArray {
    gpu: Gpu,
    handle: VertexArrayHandle,
    vertex_buffers: Vec<VertexBuffer>,
    index_buffer: Option<IndexBuffer>,
    next_location: u32,
}

impl VertexArray {
    /// 创建空的顶点数组
    pub fn new(gpu: &Gpu) -> Result<Self> {
        let handle = gpu.create_vertex_array()?;
        engine_trace!(id = handle.raw(), "vertex array created");

        Ok(Self {
            gpu: gpu.clone(),
            handle,
            vertex_buffers: Vec::new(),
            index_buffer: None,
            next_location: 0,
        })
    }

    /// 用一个顶点缓冲区和一个索引缓冲区创建
    pub fn with_buffers(gpu: &Gpu, vertex_buffer: VertexBuffer, index_buffer: IndexBuffer) -> Result<Self> {
        let mut vertex_array = Self::new(gpu)?;
        vertex_array.add_vertex_buffer(vertex_buffer)?;
        vertex_array.set_index_buffer(index_buffer);
        Ok(vertex_array)
    }

    /// 加入一个顶点缓冲区，返回分配给它的起始属性槽位
    ///
    /// 布局为空的缓冲区会被拒绝（`GraphicsError::InvalidUsage`）。
    pub fn add_vertex_buffer(&mut self, vertex_buffer: VertexBuffer) -> Result<u32> {
        let layout = vertex_buffer.layout();
        if layout.is_empty() {
            return Err(GraphicsError::InvalidUsage(format!(
                "vertex buffer {} has no layout",
                vertex_buffer.handle().raw()
            ))
            .into());
        }

        self.bind();
        vertex_buffer.bind();

        let base = self.next_location;
        let stride = layout.stride() as i32;
        let mut location = base;

        for element in layout {
            let data_type = element.data_type;
            let components = data_type.component_count() as i32;

            // 矩阵每列占一个位置
            for column in 0..data_type.location_count() {
                let offset = element.offset as i32 + column as i32 * 4 * components;
                self.gpu.vertex_attrib_pointer(AttribPointer {
                    location,
                    components,
                    integer: data_type.is_integer(),
                    normalized: element.normalized,
                    stride,
                    offset,
                });
                if element.divisor != 0 {
                    self.gpu.vertex_attrib_divisor(location, element.divisor);
                }
                location += 1;
            }
        }

        engine_trace!(
            vertex_array = self.handle.raw(),
            buffer = vertex_buffer.handle().raw(),
            base,
            count = location - base,
            "vertex buffer attached"
        );

        self.unbind();
        self.next_location = location;
        self.vertex_buffers.push(vertex_buffer);
        Ok(base)
    }

    /// 设置索引缓冲区，替换之前的那个
    pub fn set_index_buffer(&mut self, index_buffer: IndexBuffer) {
        self.bind();
        index_buffer.bind();
        self.unbind();
        self.index_buffer = Some(index_buffer);
    }

    pub fn bind(&self) {
        self.gpu.bind_vertex_array(Some(self.handle));
    }

    pub fn unbind(&self) {
        self.gpu.bind_vertex_array(None);
    }

    /// 索引数量；没有索引缓冲区时为 0
    pub fn index_count(&self) -> u32 {
        self.index_buffer.as_ref().map_or(0, IndexBuffer::count)
    }

    pub fn vertex_buffers(&self) -> &[VertexBuffer] {
        &self.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.index_buffer.as_ref()
    }

    /// 下一个可用的属性槽位
    pub fn next_location(&self) -> u32 {
        self.next_location
    }

    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.gpu.delete_vertex_array(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiniGlError;
    use crate::gfx::{DataUsage, DeviceCall, HeadlessDevice};
    use crate::renderer::layout::{BufferElement, BufferLayout, DataType};
    use std::rc::Rc;

    fn setup() -> (Rc<HeadlessDevice>, Gpu) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        (device, gpu)
    }

    fn attrib_pointers(device: &HeadlessDevice) -> Vec<AttribPointer> {
        device
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::VertexAttribPointer(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_quad_with_two_attributes() {
        let (device, gpu) = setup();

        #[rustfmt::skip]
        let vertices: [f32; 4 * 7] = [
            -0.5, -0.5, 0.0,   1.0, 0.0, 0.0, 1.0,
             0.5, -0.5, 0.0,   0.0, 1.0, 0.0, 1.0,
             0.5,  0.5, 0.0,   0.0, 0.0, 1.0, 1.0,
            -0.5,  0.5, 0.0,   1.0, 1.0, 1.0, 1.0,
        ];
        let layout = BufferLayout::new([
            BufferElement::new(DataType::Float3, "a_pos"),
            BufferElement::new(DataType::Float4, "a_color"),
        ]);
        let vb = VertexBuffer::new(&gpu, &vertices, layout, DataUsage::Static).unwrap();
        let ib = IndexBuffer::new(&gpu, &[0, 1, 2, 2, 3, 0]).unwrap();

        let vao = VertexArray::with_buffers(&gpu, vb, ib).unwrap();

        assert_eq!(vao.index_count(), 6);
        assert_eq!(vao.next_location(), 2);

        let pointers = attrib_pointers(&device);
        assert_eq!(pointers.len(), 2);
        assert_eq!((pointers[0].location, pointers[0].components, pointers[0].offset), (0, 3, 0));
        assert_eq!((pointers[1].location, pointers[1].components, pointers[1].offset), (1, 4, 12));
        assert!(pointers.iter().all(|p| p.stride == 28));
    }

    #[test]
    fn test_slots_continue_across_buffers() {
        let (device, gpu) = setup();
        let mut vao = VertexArray::new(&gpu).unwrap();

        let per_vertex = BufferLayout::new([
            BufferElement::new(DataType::Float3, "a_pos"),
            BufferElement::new(DataType::Float3, "a_normal"),
            BufferElement::new(DataType::Float2, "a_tex"),
        ]);
        let per_instance = BufferLayout::new([
            BufferElement::new(DataType::Mat4, "a_model").per_instance(1),
            BufferElement::new(DataType::Int, "a_id").per_instance(1),
        ]);

        let first = VertexBuffer::with_capacity(&gpu, 256, per_vertex, DataUsage::Static).unwrap();
        let second = VertexBuffer::with_capacity(&gpu, 256, per_instance, DataUsage::Dynamic).unwrap();

        assert_eq!(vao.add_vertex_buffer(first).unwrap(), 0);
        assert_eq!(vao.add_vertex_buffer(second).unwrap(), 3);
        assert_eq!(vao.next_location(), 8);
        assert_eq!(vao.vertex_buffers().len(), 2);

        let pointers = attrib_pointers(&device);
        let model_columns: Vec<i32> = pointers[3..7].iter().map(|p| p.offset).collect();
        assert_eq!(model_columns, vec![0, 16, 32, 48]);
        assert!(pointers[7].integer);

        let divisors = device
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::VertexAttribDivisor { divisor: 1, .. }))
            .count();
        assert_eq!(divisors, 5);
    }

    #[test]
    fn test_empty_layout_is_rejected() {
        let (_device, gpu) = setup();
        let mut vao = VertexArray::new(&gpu).unwrap();
        let vb = VertexBuffer::with_capacity(&gpu, 16, BufferLayout::default(), DataUsage::Static).unwrap();

        let err = vao.add_vertex_buffer(vb).unwrap_err();
        assert!(matches!(err, MiniGlError::Graphics(GraphicsError::InvalidUsage(_))));
        assert_eq!(vao.next_location(), 0);
    }

    #[test]
    fn test_each_vertex_array_keeps_its_index_buffer() {
        let (device, gpu) = setup();
        let layout = || BufferLayout::new([BufferElement::new(DataType::Float3, "a_pos")]);

        let vb = VertexBuffer::new(&gpu, &[0.0f32; 12], layout(), DataUsage::Static).unwrap();
        let ib = IndexBuffer::new(&gpu, &[0, 1, 2, 2, 3, 0]).unwrap();
        let ground = VertexArray::with_buffers(&gpu, vb, ib).unwrap();
        assert_eq!(device.bound_vertex_array(), None);

        // 之后创建并重新绑定的索引缓冲区不能跑进上一个 VAO
        let vb = VertexBuffer::new(&gpu, &[0.0f32; 9], layout(), DataUsage::Static).unwrap();
        let ib = IndexBuffer::with_usage(&gpu, &[0, 1, 2], DataUsage::Dynamic).unwrap();
        ib.bind();
        ib.update_indices(&[2, 1, 0]).unwrap();
        let cube = VertexArray::with_buffers(&gpu, vb, ib).unwrap();

        let ground_ib = ground.index_buffer().unwrap().handle().raw();
        let cube_ib = cube.index_buffer().unwrap().handle().raw();
        assert_ne!(ground_ib, cube_ib);
        assert_eq!(device.element_buffer(ground.handle()), Some(ground_ib));
        assert_eq!(device.element_buffer(cube.handle()), Some(cube_ib));
        assert_eq!(device.bound_vertex_array(), None);
    }

    #[test]
    fn test_add_vertex_buffer_leaves_nothing_bound() {
        let (device, gpu) = setup();
        let mut vao = VertexArray::new(&gpu).unwrap();
        let layout = BufferLayout::new([BufferElement::new(DataType::Float2, "a_uv")]);
        let vb = VertexBuffer::with_capacity(&gpu, 32, layout, DataUsage::Dynamic).unwrap();

        vao.add_vertex_buffer(vb).unwrap();
        assert_eq!(device.bound_vertex_array(), None);
        assert_eq!(device.calls().last(), Some(&DeviceCall::BindVertexArray(None)));
    }

    #[test]
    fn test_drop_releases_children() {
        let (device, gpu) = setup();
        {
            let layout = BufferLayout::new([BufferElement::new(DataType::Float2, "a_pos")]);
            let vb = VertexBuffer::new(&gpu, &[0.0f32; 6], layout, DataUsage::Static).unwrap();
            let ib = IndexBuffer::new(&gpu, &[0, 1, 2]).unwrap();
            let _vao = VertexArray::with_buffers(&gpu, vb, ib).unwrap();
            assert_eq!(device.live_objects(), 3);
        }
        assert_eq!(device.live_objects(), 0);
    }
}
