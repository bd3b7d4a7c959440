//! OpenGL 设备实现
//!
//! 基于 `glow` 将 `GraphicsDevice` 的每个调用转发为一次 GL 调用。
//! 需要 OpenGL 4.5+（DSA 风格的纹理存储、计算着色器、间接绘制、持久映射）。
//!
//! 所有 `unsafe` 块都只是 FFI 调用本身；调用前提（上下文为当前线程所持有）
//! 由 `Window` 在创建设备时保证，而 `Gpu` 是 `!Send`，无法被带到其他线程。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::num::NonZeroU32;

use glow::HasContext;

use crate::core::error::{GraphicsError, Result};
use crate::math::Color;
use crate::{engine_error, engine_info, engine_trace, engine_warn};

use super::backend::GraphicsDevice;
use super::types::*;

/// 一段持久映射的内存
#[derive(Debug, Clone, Copy)]
struct MappedRange {
    ptr: *mut u8,
    len: usize,
}

/// OpenGL 设备
pub struct GlDevice {
    gl: glow::Context,
    mapped: RefCell<HashMap<u32, MappedRange>>,
    syncs: RefCell<HashMap<u32, glow::Fence>>,
    next_sync: Cell<u32>,
}

impl GlDevice {
    /// 包装一个已经成为当前上下文的 `glow::Context`
    ///
    /// `debug_output` 为真时安装驱动调试消息回调，按严重程度转发到日志。
    pub fn new(mut gl: glow::Context, debug_output: bool) -> Self {
        if debug_output && gl.supports_debug() {
            unsafe {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
                gl.debug_message_callback(debug_callback);
            }
            engine_info!("OpenGL debug output enabled");
        }

        Self {
            gl,
            mapped: RefCell::new(HashMap::new()),
            syncs: RefCell::new(HashMap::new()),
            next_sync: Cell::new(0),
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

fn debug_callback(source: u32, kind: u32, id: u32, severity: u32, message: &str) {
    let src = match source {
        glow::DEBUG_SOURCE_API => "API",
        glow::DEBUG_SOURCE_WINDOW_SYSTEM => "WINDOW SYSTEM",
        glow::DEBUG_SOURCE_SHADER_COMPILER => "SHADER COMPILER",
        glow::DEBUG_SOURCE_THIRD_PARTY => "THIRD PARTY",
        glow::DEBUG_SOURCE_APPLICATION => "APPLICATION",
        _ => "OTHER",
    };

    let kind = match kind {
        glow::DEBUG_TYPE_ERROR => "ERROR",
        glow::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "DEPRECATED_BEHAVIOR",
        glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "UNDEFINED_BEHAVIOR",
        glow::DEBUG_TYPE_PORTABILITY => "PORTABILITY",
        glow::DEBUG_TYPE_PERFORMANCE => "PERFORMANCE",
        glow::DEBUG_TYPE_MARKER => "MARKER",
        _ => "OTHER",
    };

    match severity {
        glow::DEBUG_SEVERITY_HIGH => engine_error!(source = src, kind, id, "{}", message),
        glow::DEBUG_SEVERITY_MEDIUM => engine_warn!(source = src, kind, id, "{}", message),
        glow::DEBUG_SEVERITY_LOW => engine_info!(source = src, kind, id, "{}", message),
        _ => engine_trace!(source = src, kind, id, "{}", message),
    }
}

// ---- 枚举翻译 ----

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::Uniform => glow::UNIFORM_BUFFER,
        BufferTarget::ShaderStorage => glow::SHADER_STORAGE_BUFFER,
        BufferTarget::DrawIndirect => glow::DRAW_INDIRECT_BUFFER,
    }
}

/// 创建、上传和刷新时使用的绑定点
///
/// 索引缓冲区的绑定属于当前 VAO，编辑时改走 `COPY_WRITE_BUFFER`，
/// 避免把它挂到恰好处于绑定状态的顶点数组上。
fn edit_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Index => glow::COPY_WRITE_BUFFER,
        other => buffer_target(other),
    }
}

fn usage_hint(usage: DataUsage) -> u32 {
    match usage {
        DataUsage::Static => glow::STATIC_DRAW,
        DataUsage::Dynamic => glow::DYNAMIC_DRAW,
        _ => glow::STREAM_DRAW,
    }
}

/// 持久映射的 (存储标志, 映射标志)
fn persistent_flags(usage: DataUsage) -> (u32, u32) {
    match usage {
        DataUsage::MapWrite => {
            let storage = glow::MAP_WRITE_BIT | glow::MAP_PERSISTENT_BIT;
            (storage, storage | glow::MAP_FLUSH_EXPLICIT_BIT)
        }
        DataUsage::MapRead => {
            let storage = glow::MAP_READ_BIT | glow::MAP_PERSISTENT_BIT | glow::MAP_COHERENT_BIT;
            (storage, storage)
        }
        _ => {
            let storage = glow::MAP_READ_BIT
                | glow::MAP_WRITE_BIT
                | glow::MAP_PERSISTENT_BIT
                | glow::MAP_COHERENT_BIT;
            (storage, storage)
        }
    }
}

fn internal_format(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Rgb8 => glow::RGB8,
        TextureFormat::Rgba8 => glow::RGBA8,
        TextureFormat::Rgba32F => glow::RGBA32F,
        TextureFormat::Depth => glow::DEPTH_COMPONENT32F,
    }
}

fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
    }
}

fn image_access(access: ImageAccess) -> u32 {
    match access {
        ImageAccess::ReadOnly => glow::READ_ONLY,
        ImageAccess::WriteOnly => glow::WRITE_ONLY,
        ImageAccess::ReadWrite => glow::READ_WRITE,
    }
}

fn shader_kind(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
    }
}

fn primitive_mode(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::Points => glow::POINTS,
        Primitive::Lines => glow::LINES,
        Primitive::LineStrip => glow::LINE_STRIP,
    }
}

fn capability(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::DepthClamp => glow::DEPTH_CLAMP,
        Capability::CullFace => glow::CULL_FACE,
    }
}

fn buffer_mask(mask: BufferBit) -> u32 {
    let mut bits = 0;
    if mask.contains(BufferBit::COLOR) {
        bits |= glow::COLOR_BUFFER_BIT;
    }
    if mask.contains(BufferBit::DEPTH) {
        bits |= glow::DEPTH_BUFFER_BIT;
    }
    if mask.contains(BufferBit::STENCIL) {
        bits |= glow::STENCIL_BUFFER_BIT;
    }
    bits
}

fn barrier_bits(barrier: Barrier) -> u32 {
    if barrier == Barrier::all() {
        return glow::ALL_BARRIER_BITS;
    }

    const TABLE: [(Barrier, u32); 11] = [
        (Barrier::VERTEX_ATTRIB, glow::VERTEX_ATTRIB_ARRAY_BARRIER_BIT),
        (Barrier::ELEMENT_ARRAY, glow::ELEMENT_ARRAY_BARRIER_BIT),
        (Barrier::UNIFORM, glow::UNIFORM_BARRIER_BIT),
        (Barrier::TEXTURE_FETCH, glow::TEXTURE_FETCH_BARRIER_BIT),
        (Barrier::SHADER_IMAGE_ACCESS, glow::SHADER_IMAGE_ACCESS_BARRIER_BIT),
        (Barrier::COMMAND, glow::COMMAND_BARRIER_BIT),
        (Barrier::TEXTURE_UPDATE, glow::TEXTURE_UPDATE_BARRIER_BIT),
        (Barrier::BUFFER_UPDATE, glow::BUFFER_UPDATE_BARRIER_BIT),
        (Barrier::FRAMEBUFFER, glow::FRAMEBUFFER_BARRIER_BIT),
        (Barrier::SHADER_STORAGE, glow::SHADER_STORAGE_BARRIER_BIT),
        (Barrier::CLIENT_MAPPED_BUFFER, glow::CLIENT_MAPPED_BUFFER_BARRIER_BIT),
    ];

    TABLE
        .iter()
        .filter(|(flag, _)| barrier.contains(*flag))
        .fold(0, |bits, (_, gl_bit)| bits | gl_bit)
}

// ---- 句柄转换 ----

fn native_buffer(handle: BufferHandle) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(handle.0).map(glow::NativeBuffer)
}

fn native_vertex_array(handle: VertexArrayHandle) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(handle.0).map(glow::NativeVertexArray)
}

fn native_texture(handle: TextureHandle) -> Option<glow::NativeTexture> {
    NonZeroU32::new(handle.0).map(glow::NativeTexture)
}

fn native_framebuffer(handle: FramebufferHandle) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(handle.0).map(glow::NativeFramebuffer)
}

fn native_program(handle: ProgramHandle) -> Option<glow::NativeProgram> {
    NonZeroU32::new(handle.0).map(glow::NativeProgram)
}

fn creation_error(what: &str, err: String) -> crate::core::MiniGlError {
    GraphicsError::ResourceCreation(format!("{}: {}", what, err)).into()
}

impl GraphicsDevice for GlDevice {
    fn name(&self) -> &str {
        "OpenGL"
    }

    fn info(&self) -> DeviceInfo {
        unsafe {
            DeviceInfo {
                vendor: self.gl.get_parameter_string(glow::VENDOR),
                renderer: self.gl.get_parameter_string(glow::RENDERER),
                version: self.gl.get_parameter_string(glow::VERSION),
            }
        }
    }

    fn compute_limits(&self) -> ComputeLimits {
        let mut limits = ComputeLimits::default();
        unsafe {
            for i in 0..3u32 {
                limits.work_group_count[i as usize] =
                    self.gl.get_parameter_indexed_i32(glow::MAX_COMPUTE_WORK_GROUP_COUNT, i);
                limits.work_group_size[i as usize] =
                    self.gl.get_parameter_indexed_i32(glow::MAX_COMPUTE_WORK_GROUP_SIZE, i);
            }
            limits.work_group_invocations =
                self.gl.get_parameter_i32(glow::MAX_COMPUTE_WORK_GROUP_INVOCATIONS);
        }
        limits
    }

    fn create_buffer(
        &self,
        target: BufferTarget,
        size: usize,
        data: &[u8],
        usage: DataUsage,
    ) -> Result<BufferHandle> {
        let gl_target = edit_target(target);

        unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(|e| creation_error("buffer", e))?;
            self.gl.bind_buffer(gl_target, Some(buffer));

            // 初始数据可能比分配大小短，不足部分补零
            let mut initial = data.to_vec();
            initial.resize(size, 0);

            if usage.is_mapped() {
                let (storage, access) = persistent_flags(usage);
                self.gl.buffer_storage(gl_target, size as i32, Some(&initial), storage);

                let ptr = self.gl.map_buffer_range(gl_target, 0, size as i32, access);
                if ptr.is_null() {
                    self.gl.delete_buffer(buffer);
                    return Err(GraphicsError::ResourceCreation(
                        "persistent buffer mapping failed".to_string(),
                    )
                    .into());
                }
                self.mapped.borrow_mut().insert(buffer.0.get(), MappedRange { ptr, len: size });
            } else {
                self.gl.buffer_data_u8_slice(gl_target, &initial, usage_hint(usage));
            }

            Ok(BufferHandle(buffer.0.get()))
        }
    }

    fn buffer_sub_data(&self, buffer: BufferHandle, target: BufferTarget, offset: usize, data: &[u8]) {
        let gl_target = edit_target(target);
        unsafe {
            self.gl.bind_buffer(gl_target, native_buffer(buffer));
            self.gl.buffer_sub_data_u8_slice(gl_target, offset as i32, data);
        }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        unsafe {
            self.gl.bind_buffer(buffer_target(target), buffer.and_then(native_buffer));
        }
    }

    fn bind_buffer_base(&self, target: BufferTarget, index: u32, buffer: BufferHandle) {
        unsafe {
            self.gl.bind_buffer_base(buffer_target(target), index, native_buffer(buffer));
        }
    }

    fn write_mapped(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
        let range = self
            .mapped
            .borrow()
            .get(&buffer.0)
            .copied()
            .ok_or_else(|| GraphicsError::InvalidAccess(format!("buffer {} is not mapped", buffer.0)))?;

        let end = offset.checked_add(data.len()).unwrap_or(usize::MAX);
        if end > range.len {
            return Err(GraphicsError::BufferOverflow { requested: end, capacity: range.len }.into());
        }

        // 范围已在上面检查，映射在缓冲区删除前一直有效
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), range.ptr.add(offset), data.len());
        }
        Ok(())
    }

    fn read_mapped(&self, buffer: BufferHandle, offset: usize, out: &mut [u8]) -> Result<()> {
        let range = self
            .mapped
            .borrow()
            .get(&buffer.0)
            .copied()
            .ok_or_else(|| GraphicsError::InvalidAccess(format!("buffer {} is not mapped", buffer.0)))?;

        let end = offset.checked_add(out.len()).unwrap_or(usize::MAX);
        if end > range.len {
            return Err(GraphicsError::BufferOverflow { requested: end, capacity: range.len }.into());
        }

        unsafe {
            std::ptr::copy_nonoverlapping(range.ptr.add(offset), out.as_mut_ptr(), out.len());
        }
        Ok(())
    }

    fn flush_mapped(&self, buffer: BufferHandle, target: BufferTarget, offset: usize, len: usize) {
        let gl_target = edit_target(target);
        unsafe {
            self.gl.bind_buffer(gl_target, native_buffer(buffer));
            self.gl.flush_mapped_buffer_range(gl_target, offset as i32, len as i32);
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        // 删除缓冲区会隐式解除映射
        self.mapped.borrow_mut().remove(&buffer.0);
        if let Some(native) = native_buffer(buffer) {
            unsafe { self.gl.delete_buffer(native) };
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle> {
        unsafe {
            let vao = self
                .gl
                .create_vertex_array()
                .map_err(|e| creation_error("vertex array", e))?;
            Ok(VertexArrayHandle(vao.0.get()))
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        unsafe {
            self.gl.bind_vertex_array(vertex_array.and_then(native_vertex_array));
        }
    }

    fn vertex_attrib_pointer(&self, attrib: AttribPointer) {
        unsafe {
            self.gl.enable_vertex_attrib_array(attrib.location);
            if attrib.integer {
                self.gl.vertex_attrib_pointer_i32(
                    attrib.location,
                    attrib.components,
                    glow::INT,
                    attrib.stride,
                    attrib.offset,
                );
            } else {
                self.gl.vertex_attrib_pointer_f32(
                    attrib.location,
                    attrib.components,
                    glow::FLOAT,
                    attrib.normalized,
                    attrib.stride,
                    attrib.offset,
                );
            }
        }
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) };
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        if let Some(native) = native_vertex_array(vertex_array) {
            unsafe { self.gl.delete_vertex_array(native) };
        }
    }

    fn create_texture(&self, width: u32, height: u32, format: TextureFormat) -> Result<TextureHandle> {
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| creation_error("texture", e))?;

            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_storage_2d(
                glow::TEXTURE_2D,
                1,
                internal_format(format),
                width as i32,
                height as i32,
            );
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            self.gl.bind_texture(glow::TEXTURE_2D, None);

            Ok(TextureHandle(texture.0.get()))
        }
    }

    fn texture_sub_image(
        &self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(texture));
            // RGB8 行宽不一定是 4 的倍数
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                width as i32,
                height as i32,
                pixel_format(format),
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    fn bind_texture_unit(&self, unit: u32, texture: TextureHandle) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(texture));
        }
    }

    fn bind_image_texture(&self, unit: u32, texture: TextureHandle, access: ImageAccess, format: TextureFormat) {
        if let Some(native) = native_texture(texture) {
            unsafe {
                self.gl.bind_image_texture(
                    unit,
                    native,
                    0,
                    false,
                    0,
                    image_access(access),
                    internal_format(format),
                );
            }
        }
    }

    fn delete_texture(&self, texture: TextureHandle) {
        if let Some(native) = native_texture(texture) {
            unsafe { self.gl.delete_texture(native) };
        }
    }

    fn create_framebuffer(&self) -> Result<FramebufferHandle> {
        unsafe {
            let fbo = self
                .gl
                .create_framebuffer()
                .map_err(|e| creation_error("framebuffer", e))?;
            Ok(FramebufferHandle(fbo.0.get()))
        }
    }

    fn framebuffer_texture(&self, framebuffer: FramebufferHandle, attachment: Attachment, texture: TextureHandle) {
        let point = match attachment {
            Attachment::Color(i) => glow::COLOR_ATTACHMENT0 + i,
            Attachment::Depth => glow::DEPTH_ATTACHMENT,
        };

        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                point,
                glow::TEXTURE_2D,
                native_texture(texture),
                0,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn framebuffer_draw_buffers(&self, framebuffer: FramebufferHandle, count: u32) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(framebuffer));
            if count == 0 {
                self.gl.draw_buffer(glow::NONE);
                self.gl.read_buffer(glow::NONE);
            } else {
                let buffers: Vec<u32> = (0..count).map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
                self.gl.draw_buffers(&buffers);
            }
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn check_framebuffer_status(&self, framebuffer: FramebufferHandle) -> u32 {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(framebuffer));
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            status
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer.and_then(native_framebuffer));
        }
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
        let filter = match filter {
            BlitFilter::Nearest => glow::NEAREST,
            BlitFilter::Linear => glow::LINEAR,
        };

        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, src.and_then(native_framebuffer));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, dst.and_then(native_framebuffer));
            self.gl.blit_framebuffer(
                src_rect.x0,
                src_rect.y0,
                src_rect.x1,
                src_rect.y1,
                dst_rect.x0,
                dst_rect.y0,
                dst_rect.x1,
                dst_rect.y1,
                buffer_mask(mask),
                filter,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        if let Some(native) = native_framebuffer(framebuffer) {
            unsafe { self.gl.delete_framebuffer(native) };
        }
    }

    fn create_program(&self, stages: &[(ShaderStage, String)]) -> Result<ProgramHandle> {
        unsafe {
            let program = self
                .gl
                .create_program()
                .map_err(|e| creation_error("program", e))?;

            let mut shaders = Vec::with_capacity(stages.len());
            for (stage, source) in stages {
                let shader = match self.gl.create_shader(shader_kind(*stage)) {
                    Ok(shader) => shader,
                    Err(e) => {
                        shaders.into_iter().for_each(|s| self.gl.delete_shader(s));
                        self.gl.delete_program(program);
                        return Err(creation_error("shader", e));
                    }
                };

                self.gl.shader_source(shader, source);
                self.gl.compile_shader(shader);

                if !self.gl.get_shader_compile_status(shader) {
                    let log = self.gl.get_shader_info_log(shader);
                    self.gl.delete_shader(shader);
                    shaders.into_iter().for_each(|s| self.gl.delete_shader(s));
                    self.gl.delete_program(program);
                    return Err(GraphicsError::ShaderCompilation(format!(
                        "{} shader: {}",
                        stage.name(),
                        log.trim_end()
                    ))
                    .into());
                }

                self.gl.attach_shader(program, shader);
                shaders.push(shader);
            }

            self.gl.link_program(program);
            let linked = self.gl.get_program_link_status(program);
            let log = if linked { String::new() } else { self.gl.get_program_info_log(program) };

            // 链接完成后着色器对象不再需要
            for shader in shaders {
                self.gl.detach_shader(program, shader);
                self.gl.delete_shader(shader);
            }

            if !linked {
                self.gl.delete_program(program);
                return Err(GraphicsError::ShaderCompilation(format!("link: {}", log.trim_end())).into());
            }

            Ok(ProgramHandle(program.0.get()))
        }
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(program.and_then(native_program)) };
    }

    fn set_uniform(&self, program: ProgramHandle, name: &str, value: UniformValue) {
        let Some(native) = native_program(program) else {
            return;
        };

        unsafe {
            // 位置每次按名字查询；找不到时 location 为 None，GL 会忽略该调用
            let location = self.gl.get_uniform_location(native, name);
            let location = location.as_ref();

            match value {
                UniformValue::Bool(v) => self.gl.uniform_1_i32(location, v as i32),
                UniformValue::Int(v) => self.gl.uniform_1_i32(location, v),
                UniformValue::Uint(v) => self.gl.uniform_1_u32(location, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(location, v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => self.gl.uniform_matrix_3_f32_slice(location, false, m.as_slice()),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(location, false, m.as_slice()),
            }
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        if let Some(native) = native_program(program) {
            unsafe { self.gl.delete_program(native) };
        }
    }

    fn clear(&self, mask: BufferBit) {
        unsafe { self.gl.clear(buffer_mask(mask)) };
    }

    fn clear_color(&self, color: Color) {
        unsafe { self.gl.clear_color(color.r, color.g, color.b, color.a) };
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    fn set_capability(&self, cap: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability(cap));
            } else {
                self.gl.disable(capability(cap));
            }
        }
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        let mode = match mode {
            PolygonMode::Fill => glow::FILL,
            PolygonMode::Line => glow::LINE,
        };
        unsafe { self.gl.polygon_mode(glow::FRONT_AND_BACK, mode) };
    }

    fn draw_elements(&self, primitive: Primitive, count: u32, instances: u32) {
        unsafe {
            if instances <= 1 {
                self.gl.draw_elements(primitive_mode(primitive), count as i32, glow::UNSIGNED_INT, 0);
            } else {
                self.gl.draw_elements_instanced(
                    primitive_mode(primitive),
                    count as i32,
                    glow::UNSIGNED_INT,
                    0,
                    instances as i32,
                );
            }
        }
    }

    fn draw_elements_indirect(&self, primitive: Primitive, draw_count: u32, stride: u32) {
        let mode = primitive_mode(primitive);
        for i in 0..draw_count {
            let offset = (i as usize * stride as usize) as i32;
            unsafe { self.gl.draw_elements_indirect_offset(mode, glow::UNSIGNED_INT, offset) };
        }
    }

    fn dispatch_compute(&self, x: u32, y: u32, z: u32) {
        unsafe { self.gl.dispatch_compute(x, y, z) };
    }

    fn memory_barrier(&self, barrier: Barrier) {
        unsafe { self.gl.memory_barrier(barrier_bits(barrier)) };
    }

    fn fence_sync(&self) -> Result<SyncHandle> {
        let fence = unsafe {
            self.gl
                .fence_sync(glow::SYNC_GPU_COMMANDS_COMPLETE, 0)
                .map_err(|e| creation_error("fence", e))?
        };

        let id = self.next_sync.get() + 1;
        self.next_sync.set(id);
        self.syncs.borrow_mut().insert(id, fence);
        Ok(SyncHandle(id))
    }

    fn client_wait_sync(&self, sync: SyncHandle, flush: bool) -> SyncStatus {
        let Some(fence) = self.syncs.borrow().get(&sync.0).copied() else {
            return SyncStatus::WaitFailed;
        };

        let flags = if flush { glow::SYNC_FLUSH_COMMANDS_BIT } else { 0 };
        match unsafe { self.gl.client_wait_sync(fence, flags, 0) } {
            glow::ALREADY_SIGNALED => SyncStatus::AlreadySignaled,
            glow::CONDITION_SATISFIED => SyncStatus::ConditionSatisfied,
            glow::TIMEOUT_EXPIRED => SyncStatus::TimeoutExpired,
            _ => SyncStatus::WaitFailed,
        }
    }

    fn delete_sync(&self, sync: SyncHandle) {
        if let Some(fence) = self.syncs.borrow_mut().remove(&sync.0) {
            unsafe { self.gl.delete_sync(fence) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_translation() {
        assert_eq!(barrier_bits(Barrier::all()), glow::ALL_BARRIER_BITS);
        assert_eq!(
            barrier_bits(Barrier::SHADER_IMAGE_ACCESS | Barrier::SHADER_STORAGE),
            glow::SHADER_IMAGE_ACCESS_BARRIER_BIT | glow::SHADER_STORAGE_BARRIER_BIT
        );
    }

    #[test]
    fn test_buffer_mask_translation() {
        assert_eq!(
            buffer_mask(BufferBit::COLOR | BufferBit::DEPTH),
            glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT
        );
    }

    #[test]
    fn test_write_only_mapping_flushes_explicitly() {
        let (storage, access) = persistent_flags(DataUsage::MapWrite);
        assert_eq!(storage & glow::MAP_FLUSH_EXPLICIT_BIT, 0);
        assert_ne!(access & glow::MAP_FLUSH_EXPLICIT_BIT, 0);
    }
}
