//! 无头设备
//!
//! 在 CPU 上模拟设备状态（缓冲区字节、纹理尺寸、帧缓冲附件、程序的 uniform 名），
//! 并按顺序记录每一次调用。单元测试通过它断言 GPU 包装对象发出的调用序列，
//! `App::run_headless` 用它在没有显示器的环境中跑完整的帧循环。

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::core::error::{GraphicsError, Result};
use crate::math::Color;
use crate::engine_trace;

use super::backend::GraphicsDevice;
use super::types::*;

/// 一次被记录的设备调用
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer { id: u32, target: BufferTarget, size: usize, usage: DataUsage },
    BufferSubData { id: u32, offset: usize, len: usize },
    BindBuffer { target: BufferTarget, id: Option<u32> },
    BindBufferBase { target: BufferTarget, index: u32, id: u32 },
    FlushMapped { id: u32, offset: usize, len: usize },
    DeleteBuffer(u32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    VertexAttribPointer(AttribPointer),
    VertexAttribDivisor { location: u32, divisor: u32 },
    DeleteVertexArray(u32),
    CreateTexture { id: u32, width: u32, height: u32, format: TextureFormat },
    TextureSubImage { id: u32, width: u32, height: u32, format: PixelFormat },
    BindTextureUnit { unit: u32, id: u32 },
    BindImageTexture { unit: u32, id: u32, access: ImageAccess },
    DeleteTexture(u32),
    CreateFramebuffer(u32),
    FramebufferTexture { id: u32, attachment: Attachment, texture: u32 },
    DrawBuffers { id: u32, count: u32 },
    BindFramebuffer(Option<u32>),
    Blit {
        src: Option<u32>,
        dst: Option<u32>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: BufferBit,
        filter: BlitFilter,
    },
    DeleteFramebuffer(u32),
    CreateProgram { id: u32, stages: Vec<ShaderStage> },
    UseProgram(Option<u32>),
    Uniform { program: u32, name: String, value: UniformValue },
    DeleteProgram(u32),
    Clear(BufferBit),
    ClearColor(Color),
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    Capability { capability: Capability, enabled: bool },
    PolygonMode(PolygonMode),
    DrawElements { primitive: Primitive, count: u32, instances: u32 },
    DrawElementsIndirect { primitive: Primitive, draw_count: u32, stride: u32 },
    DispatchCompute { x: u32, y: u32, z: u32 },
    MemoryBarrier(Barrier),
    FenceSync(u32),
    ClientWaitSync { id: u32, flush: bool },
    DeleteSync(u32),
}

#[derive(Debug)]
struct BufferState {
    bytes: Vec<u8>,
    usage: DataUsage,
}

/// CPU 模拟的图形设备
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: Cell<u32>,
    calls: RefCell<Vec<DeviceCall>>,

    buffers: RefCell<HashMap<u32, BufferState>>,
    vertex_arrays: RefCell<HashSet<u32>>,
    /// 当前绑定的 VAO，以及每个 VAO 记住的索引缓冲区
    bound_vertex_array: Cell<Option<u32>>,
    element_buffers: RefCell<HashMap<u32, u32>>,
    textures: RefCell<HashMap<u32, (u32, u32, TextureFormat)>>,
    framebuffers: RefCell<HashMap<u32, Vec<Attachment>>>,
    programs: RefCell<HashMap<u32, HashSet<String>>>,

    /// 每个同步对象还需要超时几次才会 signal
    syncs: RefCell<HashMap<u32, u32>>,
    fence_latency: Cell<u32>,
    sync_failure: Cell<bool>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn record(&self, call: DeviceCall) {
        self.calls.borrow_mut().push(call);
    }

    /// 到目前为止记录的全部调用
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.borrow().clone()
    }

    /// 取出并清空调用记录
    pub fn take_calls(&self) -> Vec<DeviceCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// 缓冲区当前的字节内容
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.buffers.borrow().get(&buffer.0).map(|b| b.bytes.clone())
    }

    /// 当前绑定的顶点数组
    pub fn bound_vertex_array(&self) -> Option<u32> {
        self.bound_vertex_array.get()
    }

    /// 顶点数组记住的索引缓冲区
    ///
    /// 与 GL 一致：索引缓冲区的绑定属于当前 VAO，只有在某个 VAO 处于绑定状态时
    /// `bind_buffer(Index, ..)` 才会改变它。创建和上传不经过索引绑定点。
    pub fn element_buffer(&self, vertex_array: VertexArrayHandle) -> Option<u32> {
        self.element_buffers.borrow().get(&vertex_array.0).copied()
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.borrow().get(&texture.0).map(|&(w, h, _)| (w, h))
    }

    /// 仍然存活（未删除）的原生对象数量
    pub fn live_objects(&self) -> usize {
        self.buffers.borrow().len()
            + self.vertex_arrays.borrow().len()
            + self.textures.borrow().len()
            + self.framebuffers.borrow().len()
            + self.programs.borrow().len()
            + self.syncs.borrow().len()
    }

    /// 让之后创建的同步对象先超时 `polls` 次再 signal
    pub fn set_fence_latency(&self, polls: u32) {
        self.fence_latency.set(polls);
    }

    /// 让等待同步对象的调用返回失败
    pub fn set_sync_failure(&self, fail: bool) {
        self.sync_failure.set(fail);
    }
}

/// 从 GLSL 源码中提取 `uniform <type> <name>;` 声明的名字
fn uniform_names(source: &str) -> impl Iterator<Item = String> + '_ {
    source.lines().filter_map(|line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let idx = tokens.iter().position(|t| *t == "uniform")?;
        let raw = tokens.get(idx + 2)?;
        let name: String = raw
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        (!name.is_empty()).then_some(name)
    })
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            vendor: "minigl".to_string(),
            renderer: "headless".to_string(),
            version: "4.6 (emulated)".to_string(),
        }
    }

    fn compute_limits(&self) -> ComputeLimits {
        ComputeLimits {
            work_group_count: [65535, 65535, 65535],
            work_group_size: [1024, 1024, 64],
            work_group_invocations: 1024,
        }
    }

    fn create_buffer(
        &self,
        target: BufferTarget,
        size: usize,
        data: &[u8],
        usage: DataUsage,
    ) -> Result<BufferHandle> {
        let id = self.alloc_id();
        let mut bytes = vec![0u8; size];
        let n = data.len().min(size);
        bytes[..n].copy_from_slice(&data[..n]);

        self.buffers.borrow_mut().insert(id, BufferState { bytes, usage });
        self.record(DeviceCall::CreateBuffer { id, target, size, usage });
        Ok(BufferHandle(id))
    }

    fn buffer_sub_data(&self, buffer: BufferHandle, _target: BufferTarget, offset: usize, data: &[u8]) {
        if let Some(state) = self.buffers.borrow_mut().get_mut(&buffer.0) {
            let end = offset.saturating_add(data.len()).min(state.bytes.len());
            if offset < end {
                state.bytes[offset..end].copy_from_slice(&data[..end - offset]);
            }
        }
        self.record(DeviceCall::BufferSubData { id: buffer.0, offset, len: data.len() });
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        if target == BufferTarget::Index {
            if let Some(vao) = self.bound_vertex_array.get() {
                let mut elements = self.element_buffers.borrow_mut();
                match buffer {
                    Some(b) => elements.insert(vao, b.0),
                    None => elements.remove(&vao),
                };
            }
        }
        self.record(DeviceCall::BindBuffer { target, id: buffer.map(|b| b.0) });
    }

    fn bind_buffer_base(&self, target: BufferTarget, index: u32, buffer: BufferHandle) {
        self.record(DeviceCall::BindBufferBase { target, index, id: buffer.0 });
    }

    fn write_mapped(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
        let mut buffers = self.buffers.borrow_mut();
        let state = buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| GraphicsError::InvalidAccess(format!("buffer {} does not exist", buffer.0)))?;

        if !state.usage.is_mapped() {
            return Err(GraphicsError::InvalidAccess(format!("buffer {} is not mapped", buffer.0)).into());
        }

        let end = offset.checked_add(data.len()).unwrap_or(usize::MAX);
        if end > state.bytes.len() {
            return Err(GraphicsError::BufferOverflow { requested: end, capacity: state.bytes.len() }.into());
        }

        state.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn read_mapped(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<()> {
        let buffers = self.buffers.borrow();
        let state = buffers
            .get(&buffer.0)
            .ok_or_else(|| GraphicsError::InvalidAccess(format!("buffer {} does not exist", buffer.0)))?;

        if !state.usage.is_mapped() {
            return Err(GraphicsError::InvalidAccess(format!("buffer {} is not mapped", buffer.0)).into());
        }

        let end = offset.checked_add(out.len()).unwrap_or(usize::MAX);
        if end > state.bytes.len() {
            return Err(GraphicsError::BufferOverflow { requested: end, capacity: state.bytes.len() }.into());
        }

        out.copy_from_slice(&state.bytes[offset..end]);
        Ok(())
    }

    fn flush_mapped(&self, buffer: BufferHandle, _target: BufferTarget, offset: usize, len: usize) {
        self.record(DeviceCall::FlushMapped { id: buffer.0, offset, len });
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        self.buffers.borrow_mut().remove(&buffer.0);
        self.record(DeviceCall::DeleteBuffer(buffer.0));
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle> {
        let id = self.alloc_id();
        self.vertex_arrays.borrow_mut().insert(id);
        self.record(DeviceCall::CreateVertexArray(id));
        Ok(VertexArrayHandle(id))
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        self.bound_vertex_array.set(vertex_array.map(|v| v.0));
        self.record(DeviceCall::BindVertexArray(vertex_array.map(|v| v.0)));
    }

    fn vertex_attrib_pointer(&self, attrib: AttribPointer) {
        self.record(DeviceCall::VertexAttribPointer(attrib));
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        self.record(DeviceCall::VertexAttribDivisor { location, divisor });
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.borrow_mut().remove(&vertex_array.0);
        self.element_buffers.borrow_mut().remove(&vertex_array.0);
        if self.bound_vertex_array.get() == Some(vertex_array.0) {
            self.bound_vertex_array.set(None);
        }
        self.record(DeviceCall::DeleteVertexArray(vertex_array.0));
    }

    fn create_texture(&self, width: u32, height: u32, format: TextureFormat) -> Result<TextureHandle> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "texture storage must be non-empty, got {}x{}",
                width, height
            ))
            .into());
        }

        let id = self.alloc_id();
        self.textures.borrow_mut().insert(id, (width, height, format));
        self.record(DeviceCall::CreateTexture { id, width, height, format });
        Ok(TextureHandle(id))
    }

    fn texture_sub_image(
        &self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
        _pixels: &[u8],
    ) {
        self.record(DeviceCall::TextureSubImage { id: texture.0, width, height, format });
    }

    fn bind_texture_unit(&self, unit: u32, texture: TextureHandle) {
        self.record(DeviceCall::BindTextureUnit { unit, id: texture.0 });
    }

    fn bind_image_texture(&self, unit: u32, texture: TextureHandle, access: ImageAccess, _format: TextureFormat) {
        self.record(DeviceCall::BindImageTexture { unit, id: texture.0, access });
    }

    fn delete_texture(&self, texture: TextureHandle) {
        self.textures.borrow_mut().remove(&texture.0);
        self.record(DeviceCall::DeleteTexture(texture.0));
    }

    fn create_framebuffer(&self) -> Result<FramebufferHandle> {
        let id = self.alloc_id();
        self.framebuffers.borrow_mut().insert(id, Vec::new());
        self.record(DeviceCall::CreateFramebuffer(id));
        Ok(FramebufferHandle(id))
    }

    fn framebuffer_texture(&self, framebuffer: FramebufferHandle, attachment: Attachment, texture: TextureHandle) {
        if let Some(attachments) = self.framebuffers.borrow_mut().get_mut(&framebuffer.0) {
            if !attachments.contains(&attachment) {
                attachments.push(attachment);
            }
        }
        self.record(DeviceCall::FramebufferTexture { id: framebuffer.0, attachment, texture: texture.0 });
    }

    fn framebuffer_draw_buffers(&self, framebuffer: FramebufferHandle, count: u32) {
        self.record(DeviceCall::DrawBuffers { id: framebuffer.0, count });
    }

    fn check_framebuffer_status(&self, framebuffer: FramebufferHandle) -> u32 {
        match self.framebuffers.borrow().get(&framebuffer.0) {
            Some(attachments) if !attachments.is_empty() => FRAMEBUFFER_COMPLETE,
            _ => FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        self.record(DeviceCall::BindFramebuffer(framebuffer.map(|f| f.0)));
    }

    fn blit_framebuffer(
        &self,
        src: Option<FramebufferHandle>,
        dst: Option<FramebufferHandle>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: BufferBit,
        filter: BlitFilter,
    ) {
        self.record(DeviceCall::Blit {
            src: src.map(|f| f.0),
            dst: dst.map(|f| f.0),
            src_rect,
            dst_rect,
            mask,
            filter,
        });
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        self.framebuffers.borrow_mut().remove(&framebuffer.0);
        self.record(DeviceCall::DeleteFramebuffer(framebuffer.0));
    }

    fn create_program(&self, stages: &[(ShaderStage, String)]) -> Result<ProgramHandle> {
        // 模拟编译：每个阶段都必须有入口函数
        if let Some((stage, _)) = stages.iter().find(|(_, src)| !src.contains("main")) {
            return Err(GraphicsError::ShaderCompilation(format!(
                "{} shader: 0:1(1): error: function `main' is not defined",
                stage.name()
            ))
            .into());
        }

        let id = self.alloc_id();
        let names = stages.iter().flat_map(|(_, src)| uniform_names(src)).collect();
        self.programs.borrow_mut().insert(id, names);
        self.record(DeviceCall::CreateProgram { id, stages: stages.iter().map(|(s, _)| *s).collect() });
        Ok(ProgramHandle(id))
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        self.record(DeviceCall::UseProgram(program.map(|p| p.0)));
    }

    fn set_uniform(&self, program: ProgramHandle, name: &str, value: UniformValue) {
        let known = self
            .programs
            .borrow()
            .get(&program.0)
            .map_or(false, |names| names.contains(name));

        if known {
            self.record(DeviceCall::Uniform { program: program.0, name: name.to_string(), value });
        } else {
            engine_trace!(program = program.0, name, "uniform not found, ignored");
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        self.programs.borrow_mut().remove(&program.0);
        self.record(DeviceCall::DeleteProgram(program.0));
    }

    fn clear(&self, mask: BufferBit) {
        self.record(DeviceCall::Clear(mask));
    }

    fn clear_color(&self, color: Color) {
        self.record(DeviceCall::ClearColor(color));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(DeviceCall::Viewport { x, y, width, height });
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.record(DeviceCall::Capability { capability, enabled });
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        self.record(DeviceCall::PolygonMode(mode));
    }

    fn draw_elements(&self, primitive: Primitive, count: u32, instances: u32) {
        self.record(DeviceCall::DrawElements { primitive, count, instances });
    }

    fn draw_elements_indirect(&self, primitive: Primitive, draw_count: u32, stride: u32) {
        self.record(DeviceCall::DrawElementsIndirect { primitive, draw_count, stride });
    }

    fn dispatch_compute(&self, x: u32, y: u32, z: u32) {
        self.record(DeviceCall::DispatchCompute { x, y, z });
    }

    fn memory_barrier(&self, barrier: Barrier) {
        self.record(DeviceCall::MemoryBarrier(barrier));
    }

    fn fence_sync(&self) -> Result<SyncHandle> {
        let id = self.alloc_id();
        self.syncs.borrow_mut().insert(id, self.fence_latency.get());
        self.record(DeviceCall::FenceSync(id));
        Ok(SyncHandle(id))
    }

    fn client_wait_sync(&self, sync: SyncHandle, flush: bool) -> SyncStatus {
        self.record(DeviceCall::ClientWaitSync { id: sync.0, flush });

        if self.sync_failure.get() {
            return SyncStatus::WaitFailed;
        }

        let mut syncs = self.syncs.borrow_mut();
        match syncs.get_mut(&sync.0) {
            None => SyncStatus::WaitFailed,
            Some(0) => SyncStatus::AlreadySignaled,
            Some(remaining) => {
                *remaining -= 1;
                if *remaining == 0 {
                    SyncStatus::ConditionSatisfied
                } else {
                    SyncStatus::TimeoutExpired
                }
            }
        }
    }

    fn delete_sync(&self, sync: SyncHandle) {
        self.syncs.borrow_mut().remove(&sync.0);
        self.record(DeviceCall::DeleteSync(sync.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_name_parsing() {
        let src = "uniform mat4 u_viewProj;\nlayout(binding = 0) uniform sampler2D u_tex;\nuniform vec3 u_lights[4];\nuniform Block {\n";
        let names: Vec<String> = uniform_names(src).collect();
        assert_eq!(names, vec!["u_viewProj", "u_tex", "u_lights"]);
    }

    #[test]
    fn test_buffer_round_trip() {
        let device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(BufferTarget::Vertex, 8, &[1, 2, 3, 4], DataUsage::Dynamic)
            .unwrap();
        device.buffer_sub_data(buffer, BufferTarget::Vertex, 4, &[9, 9]);

        assert_eq!(device.buffer_data(buffer).unwrap(), vec![1, 2, 3, 4, 9, 9, 0, 0]);
    }

    #[test]
    fn test_element_binding_belongs_to_vertex_array() {
        let device = HeadlessDevice::new();
        let first = device.create_vertex_array().unwrap();
        let second = device.create_vertex_array().unwrap();
        let ib = device.create_buffer(BufferTarget::Index, 12, &[], DataUsage::Static).unwrap();
        let other = device.create_buffer(BufferTarget::Index, 12, &[], DataUsage::Dynamic).unwrap();

        // 没有 VAO 时绑定不落到任何顶点数组上
        device.bind_buffer(BufferTarget::Index, Some(ib));
        assert_eq!(device.element_buffer(first), None);

        device.bind_vertex_array(Some(first));
        device.bind_buffer(BufferTarget::Index, Some(ib));
        device.bind_vertex_array(Some(second));
        device.bind_buffer(BufferTarget::Index, Some(other));
        device.buffer_sub_data(ib, BufferTarget::Index, 0, &[1, 2, 3, 4]);

        assert_eq!(device.element_buffer(first), Some(ib.0));
        assert_eq!(device.element_buffer(second), Some(other.0));

        device.delete_vertex_array(second);
        assert_eq!(device.element_buffer(second), None);
        assert_eq!(device.bound_vertex_array(), None);
    }

    #[test]
    fn test_fence_latency() {
        let device = HeadlessDevice::new();
        device.set_fence_latency(2);
        let sync = device.fence_sync().unwrap();

        assert_eq!(device.client_wait_sync(sync, true), SyncStatus::TimeoutExpired);
        assert_eq!(device.client_wait_sync(sync, false), SyncStatus::ConditionSatisfied);
        assert_eq!(device.client_wait_sync(sync, false), SyncStatus::AlreadySignaled);
    }

    #[test]
    fn test_program_requires_main() {
        let device = HeadlessDevice::new();
        let result = device.create_program(&[(ShaderStage::Vertex, "void foo() {}".to_string())]);
        assert!(matches!(
            result,
            Err(crate::core::MiniGlError::Graphics(GraphicsError::ShaderCompilation(_)))
        ));
        assert_eq!(device.live_objects(), 0);
    }
}
