//! 帧缓冲对象（FBO）
//!
//! 颜色附件按顺序排列，下标即 draw buffer 槽位；深度附件至多一个。
//! 帧缓冲的有效尺寸是所有附件尺寸的逐分量最小值，没有附件时为 `(0, 0)`。
//!
//! Blit 时帧缓冲一侧总是使用有效尺寸；只拷贝颜色时使用线性过滤，
//! 包含深度或模板时使用最近邻过滤。

use crate::core::error::{GraphicsError, Result};
use crate::engine_trace;
use crate::gfx::{
    Attachment, BlitFilter, BufferBit, FramebufferHandle, Gpu, Rect, FRAMEBUFFER_COMPLETE,
};

use super::texture::Texture;

pub struct FrameBuffer {
    gpu: Gpu,
    handle: FramebufferHandle,
    color_attachments: Vec<Texture>,
    depth_attachment: Option<Texture>,
}

impl FrameBuffer {
    pub fn new(gpu: &Gpu) -> Result<Self> {
        let handle = gpu.create_framebuffer()?;
        engine_trace!(id = handle.raw(), "framebuffer created");
        Ok(Self { gpu: gpu.clone(), handle, color_attachments: Vec::new(), depth_attachment: None })
    }

    /// 追加一个颜色附件，返回它的槽位
    pub fn attach_color_texture(&mut self, texture: Texture) -> u32 {
        let slot = self.color_attachments.len() as u32;
        self.gpu.framebuffer_texture(self.handle, Attachment::Color(slot), texture.handle());
        self.color_attachments.push(texture);
        self.refresh_draw_buffers();
        slot
    }

    /// 设置深度附件，返回被替换的旧附件
    pub fn attach_depth_texture(&mut self, texture: Texture) -> Option<Texture> {
        self.gpu.framebuffer_texture(self.handle, Attachment::Depth, texture.handle());
        let previous = self.depth_attachment.replace(texture);
        // 只有深度附件时不写任何颜色
        self.refresh_draw_buffers();
        previous
    }

    /// 用 `textures` 替换全部颜色附件，返回旧的附件
    pub fn set_color_attachments(&mut self, textures: Vec<Texture>) -> Vec<Texture> {
        for (slot, texture) in textures.iter().enumerate() {
            self.gpu.framebuffer_texture(self.handle, Attachment::Color(slot as u32), texture.handle());
        }
        let previous = std::mem::replace(&mut self.color_attachments, textures);
        self.refresh_draw_buffers();
        previous
    }

    fn refresh_draw_buffers(&self) {
        self.gpu.framebuffer_draw_buffers(self.handle, self.color_attachments.len() as u32);
    }

    pub fn color_attachment(&self, slot: usize) -> Option<&Texture> {
        self.color_attachments.get(slot)
    }

    pub fn color_attachments(&self) -> &[Texture] {
        &self.color_attachments
    }

    pub fn depth_attachment(&self) -> Option<&Texture> {
        self.depth_attachment.as_ref()
    }

    /// 有效尺寸：所有附件尺寸的逐分量最小值
    pub fn size(&self) -> (u32, u32) {
        self.color_attachments
            .iter()
            .chain(self.depth_attachment.iter())
            .map(Texture::size)
            .reduce(|(w0, h0), (w1, h1)| (w0.min(w1), h0.min(h1)))
            .unwrap_or((0, 0))
    }

    /// 检查完整性
    pub fn check_status(&self) -> Result<()> {
        let status = self.gpu.check_framebuffer_status(self.handle);
        if status != FRAMEBUFFER_COMPLETE {
            return Err(GraphicsError::IncompleteFramebuffer(status).into());
        }
        Ok(())
    }

    /// 之后的绘制与清屏都写入本帧缓冲
    pub fn bind(&self) {
        self.gpu.bind_framebuffer(Some(self.handle));
    }

    /// 恢复到窗口的默认帧缓冲
    pub fn unbind(&self) {
        self.gpu.bind_framebuffer(None);
    }

    fn full_rect(&self) -> Rect {
        let (width, height) = self.size();
        Rect::from_size(width, height)
    }

    /// 拷贝到默认帧缓冲的 `(0, 0, width, height)` 区域
    pub fn blit_to_default(&self, mask: BufferBit, width: u32, height: u32) {
        blit_raw(
            &self.gpu,
            Some(self.handle),
            None,
            self.full_rect(),
            Rect::from_size(width, height),
            mask,
        );
    }

    /// 从默认帧缓冲的 `(0, 0, width, height)` 区域拷贝过来
    pub fn blit_from_default(&self, mask: BufferBit, width: u32, height: u32) {
        blit_raw(
            &self.gpu,
            None,
            Some(self.handle),
            Rect::from_size(width, height),
            self.full_rect(),
            mask,
        );
    }

    /// 整体拷贝到另一个帧缓冲
    pub fn blit(&self, dst: &FrameBuffer, mask: BufferBit) {
        blit_raw(&self.gpu, Some(self.handle), Some(dst.handle), self.full_rect(), dst.full_rect(), mask);
    }

    /// 任意两个帧缓冲（`None` 为默认帧缓冲）之间按区域拷贝
    pub fn blit_region(
        gpu: &Gpu,
        src: Option<&FrameBuffer>,
        dst: Option<&FrameBuffer>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: BufferBit,
    ) {
        blit_raw(gpu, src.map(|f| f.handle), dst.map(|f| f.handle), src_rect, dst_rect, mask);
    }

    pub fn handle(&self) -> FramebufferHandle {
        self.handle
    }
}

/// 线性过滤只对颜色有效
fn blit_filter(mask: BufferBit) -> BlitFilter {
    if mask == BufferBit::COLOR {
        BlitFilter::Linear
    } else {
        BlitFilter::Nearest
    }
}

fn blit_raw(
    gpu: &Gpu,
    src: Option<FramebufferHandle>,
    dst: Option<FramebufferHandle>,
    src_rect: Rect,
    dst_rect: Rect,
    mask: BufferBit,
) {
    gpu.blit_framebuffer(src, dst, src_rect, dst_rect, mask, blit_filter(mask));
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.gpu.delete_framebuffer(self.handle);
    }
}
